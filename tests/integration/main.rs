//! Integration test harness.

mod mocks;
mod workflows;
