//! Helpers shared by integration tests and benchmarks

pub mod test_utils;

pub use test_utils::{request_timeout, start_fixture_server};
