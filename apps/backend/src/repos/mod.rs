//! Repository seams for the domain layer.

pub mod employees;

pub use employees::{
    Employee, EmployeeChanges, EmployeeQuery, EmployeeRepository, NewEmployee,
    SeaEmployeeRepository, UnavailableRepository,
};
