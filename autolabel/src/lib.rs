//! Automatic pull request labeling from file-path glob rules.
//!
//! Given `.github/auto-label.json` rules, a pull request's changed files and
//! its current labels, autolabel adds every label whose rule matches and
//! removes ruled labels that no longer match. Labels without a rule are never
//! touched. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (glob classification, label
//!   policy). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (config file, git, GitHub GraphQL,
//!   Actions environment) behind traits so they can be faked in tests.
//!
//! Orchestration modules ([`reconcile`], [`plan`]) coordinate core logic with
//! I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod plan;
pub mod reconcile;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
