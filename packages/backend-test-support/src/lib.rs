//! Backend test support utilities
//!
//! Logging initialization, unique data helpers, problem-details assertions
//! and the container-backed test database harness.

pub mod logging;
pub mod problem_details;
pub mod test_db;
pub mod unique_helpers;

pub use test_db::{
    shared_postgres, test_db_target, HarnessError, HarnessState, PostgresContainer,
    ProvisionedDb, Provisioner, TestDatabase, TestDbKind,
};
pub use unique_helpers::{unique_email, unique_name, unique_str};
