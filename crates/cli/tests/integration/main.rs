//! CLI integration tests.

mod common;
mod delete_tests;
mod invoke_tests;
mod plan_tests;
