//! Employee business rules on top of an injected `EmployeeRepository`.
//!
//! Errors are `DomainError`; handlers turn them into problem details. Every
//! repository call goes through the service's `CallPolicy`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::db::retry::CallPolicy;
use crate::domain::employees::{EmployeeInput, ListParams};
use crate::errors::domain::{ConflictKind, DomainError};
use crate::logging::pii::Redacted;
use crate::repos::employees::{Employee, EmployeeRepository};

const EMAIL_TAKEN: &str = "An employee with this email already exists";

pub struct EmployeeService {
    repo: Arc<dyn EmployeeRepository>,
    policy: CallPolicy,
}

impl EmployeeService {
    pub fn new(repo: Arc<dyn EmployeeRepository>, policy: CallPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> CallPolicy {
        self.policy
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, DomainError> {
        let repo = &self.repo;
        self.policy
            .read("employees.find_by_email", move || repo.find_by_email(email))
            .await
    }

    /// Validate, reject duplicate emails, insert.
    ///
    /// The pre-check gives a clean 409 in the common case; a concurrent insert
    /// that slips past it is caught by the unique index and maps to the same
    /// conflict.
    pub async fn create(&self, input: EmployeeInput) -> Result<Employee, DomainError> {
        let new = input.into_new()?;

        if self.find_by_email(&new.email).await?.is_some() {
            debug!(email = %Redacted(&new.email), "create rejected, email taken");
            return Err(DomainError::conflict(ConflictKind::UniqueEmail, EMAIL_TAKEN));
        }

        let repo = &self.repo;
        let new = &new;
        let created = self
            .policy
            .write("employees.create", move || repo.create(new.clone()))
            .await?;

        info!(employee_id = created.id, email = %Redacted(&created.email), "employee created");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Employee, DomainError> {
        let repo = &self.repo;
        self.policy
            .read("employees.find_by_id", move || repo.find_by_id(id))
            .await?
            .ok_or_else(|| DomainError::employee_not_found(id))
    }

    pub async fn list(&self, params: ListParams) -> Result<Vec<Employee>, DomainError> {
        let query = params.into_query()?;
        let repo = &self.repo;
        let query = &query;
        self.policy
            .read("employees.list", move || repo.list(query))
            .await
    }

    /// Replace names and email of an existing employee.
    pub async fn update(&self, id: i64, input: EmployeeInput) -> Result<Employee, DomainError> {
        let changes = input.into_changes()?;

        self.get(id).await?;

        if let Some(holder) = self.find_by_email(&changes.email).await? {
            if holder.id != id {
                debug!(employee_id = id, holder_id = holder.id, "update rejected, email taken");
                return Err(DomainError::conflict(ConflictKind::UniqueEmail, EMAIL_TAKEN));
            }
        }

        let repo = &self.repo;
        let changes = &changes;
        let updated = self
            .policy
            .write("employees.update", move || repo.update(id, changes.clone()))
            .await?
            .ok_or_else(|| DomainError::employee_not_found(id))?;

        info!(employee_id = id, "employee updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let repo = &self.repo;
        let removed = self
            .policy
            .write("employees.delete", move || repo.delete(id))
            .await?;

        if !removed {
            return Err(DomainError::employee_not_found(id));
        }

        info!(employee_id = id, "employee deleted");
        Ok(())
    }
}
