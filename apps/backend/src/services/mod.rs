pub mod employees;

pub use employees::EmployeeService;
