//! Common test utilities and helpers
//!
//! This module provides shared test infrastructure including:
//! - Test fixtures and factories
//! - An in-memory remote store
//! - HTTP test client

pub mod factories;
pub mod fixtures;
pub mod mocks;
pub mod test_app;

pub use factories::*;
pub use fixtures::*;
pub use mocks::*;
pub use test_app::*;
