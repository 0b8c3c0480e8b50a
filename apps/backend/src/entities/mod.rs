pub mod employees;
pub mod mapping;

pub use employees::Entity as Employees;
pub use employees::Model as EmployeeRow;
