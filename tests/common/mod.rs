//! Common test utilities and helpers
//!
//! Shared by the integration tests: a scripted process executor, a small
//! in-test provider and working-copy fixtures.

#![allow(dead_code)]

pub mod mock_services;
pub mod test_fixtures;
