//! Domain rules, independent of HTTP and persistence.

pub mod employees;

pub use employees::{EmployeeInput, ListParams};
