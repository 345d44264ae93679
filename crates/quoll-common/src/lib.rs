//! Common utilities for the quoll HTML toolkit.
//!
//! This crate provides shared infrastructure used by all components:
//! - **Warning System** - colored terminal output for recoverable faults

pub mod warning;
