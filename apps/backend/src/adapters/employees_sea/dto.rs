//! DTOs for employees_sea adapter.

/// DTO for inserting a new employee. Values are already normalized.
#[derive(Debug, Clone)]
pub struct EmployeeCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl EmployeeCreate {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }
}

/// DTO for replacing an employee's editable fields.
#[derive(Debug, Clone)]
pub struct EmployeeUpdate {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl EmployeeUpdate {
    pub fn new(
        id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }
}

/// Equality predicates and paging for list queries. Unset predicates match all rows.
#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

impl EmployeeFilter {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }
}
