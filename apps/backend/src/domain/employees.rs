//! Employee input rules: trimming, email normalization and length limits.
//!
//! Pure functions, no I/O. The service runs every write and list query
//! through here before touching the repository.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::domain::{DomainError, ValidationKind};
use crate::repos::employees::{EmployeeChanges, EmployeeQuery, NewEmployee};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_EMAIL_CHARS: usize = 254;

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(
        r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}$",
    )
    .unwrap()
});

/// Raw employee fields as they arrive from a client. Absent fields are `None`
/// so a missing field and an empty one report the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Raw list query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Trim and bound a name. `label` is the client-facing field name.
pub fn normalize_name(label: &str, raw: Option<&str>) -> Result<String, DomainError> {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(DomainError::validation(
            ValidationKind::MissingField,
            format!("{label} is required"),
        ));
    }
    if value.chars().count() > MAX_NAME_CHARS {
        return Err(DomainError::validation(
            ValidationKind::FieldTooLong,
            format!("{label} must be at most {MAX_NAME_CHARS} characters"),
        ));
    }
    Ok(value.to_string())
}

/// Trim, lowercase and shape-check an email address.
pub fn normalize_email(raw: Option<&str>) -> Result<String, DomainError> {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(DomainError::validation(
            ValidationKind::MissingField,
            "email is required",
        ));
    }
    if value.chars().count() > MAX_EMAIL_CHARS {
        return Err(DomainError::validation(
            ValidationKind::InvalidEmail,
            format!("email must be at most {MAX_EMAIL_CHARS} characters"),
        ));
    }
    let lowered = value.to_lowercase();
    if !EMAIL_SHAPE.is_match(&lowered) {
        return Err(DomainError::validation(
            ValidationKind::InvalidEmail,
            "email is not a valid address",
        ));
    }
    Ok(lowered)
}

impl EmployeeInput {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            email: Some(email.into()),
        }
    }

    fn normalized(&self) -> Result<(String, String, String), DomainError> {
        Ok((
            normalize_name("firstName", self.first_name.as_deref())?,
            normalize_name("lastName", self.last_name.as_deref())?,
            normalize_email(self.email.as_deref())?,
        ))
    }

    pub fn into_new(self) -> Result<NewEmployee, DomainError> {
        let (first_name, last_name, email) = self.normalized()?;
        Ok(NewEmployee {
            first_name,
            last_name,
            email,
        })
    }

    pub fn into_changes(self) -> Result<EmployeeChanges, DomainError> {
        let (first_name, last_name, email) = self.normalized()?;
        Ok(EmployeeChanges {
            first_name,
            last_name,
            email,
        })
    }
}

fn optional_name(label: &str, raw: Option<&str>) -> Result<Option<String>, DomainError> {
    match raw {
        None => Ok(None),
        Some(v) => normalize_name(label, Some(v)).map(Some).map_err(query_error),
    }
}

fn query_error(e: DomainError) -> DomainError {
    match e {
        DomainError::Validation(_, detail) => {
            DomainError::validation(ValidationKind::InvalidQuery, detail)
        }
        other => other,
    }
}

impl ListParams {
    pub fn into_query(self) -> Result<EmployeeQuery, DomainError> {
        let limit = self.limit.unwrap_or(EmployeeQuery::DEFAULT_LIMIT);
        if !(1..=EmployeeQuery::MAX_LIMIT).contains(&limit) {
            return Err(DomainError::validation(
                ValidationKind::InvalidQuery,
                format!("limit must be between 1 and {}", EmployeeQuery::MAX_LIMIT),
            ));
        }

        let offset = self.offset.unwrap_or(0);
        if offset > EmployeeQuery::MAX_OFFSET {
            return Err(DomainError::validation(
                ValidationKind::InvalidQuery,
                format!("offset must be at most {}", EmployeeQuery::MAX_OFFSET),
            ));
        }

        let email = match self.email.as_deref() {
            None => None,
            Some(raw) => Some(normalize_email(Some(raw)).map_err(query_error)?),
        };

        Ok(EmployeeQuery {
            email,
            first_name: optional_name("firstName", self.first_name.as_deref())?,
            last_name: optional_name("lastName", self.last_name.as_deref())?,
            limit,
            offset,
        })
    }
}
