//! Deterministic, pure logic for the labeling policy.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod glob;
pub mod policy;
pub mod types;
