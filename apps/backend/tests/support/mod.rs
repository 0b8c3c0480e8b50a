#![allow(dead_code)]

pub mod app_builder;
pub mod test_state;

pub use app_builder::create_test_app;
pub use memory_repo::{Fault, FlakyRepository, MemoryEmployeeRepository};
pub use test_state::{build_test_state, fast_policy, state_with_repo, test_state_builder};
