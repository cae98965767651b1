//! API integration tests (run against a live server)

#[path = "integration/api_tests.rs"]
mod api_tests;
