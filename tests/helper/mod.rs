//! Shared helpers for integration tests

pub mod registry;

pub use registry::{mock_json, mock_status, options_for};
