//! Common test utilities for settle-core
//!
//! - An in-memory search daemon that applies changes with a delay
//! - Fixtures for plugins, results and policies

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_daemon;
pub mod fixtures;

pub use fake_daemon::*;
pub use fixtures::*;
