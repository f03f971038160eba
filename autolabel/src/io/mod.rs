//! I/O adapters: config file, git, GitHub, and the Actions environment.

pub mod config;
pub mod context;
pub mod git;
pub mod github;
