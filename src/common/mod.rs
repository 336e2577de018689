//! Shared error handling utilities

pub mod error;
pub mod result;
