//! Employee repository: domain models, the `EmployeeRepository` seam and its
//! SeaORM implementation.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use time::OffsetDateTime;

use crate::adapters::employees_sea as employees_adapter;
use crate::adapters::employees_sea::{EmployeeCreate, EmployeeFilter, EmployeeUpdate};
use crate::db::txn::with_txn;
use crate::entities::employees;
use crate::errors::domain::{DomainError, InfraErrorKind};

/// Employee domain model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated, normalized fields for a new employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Validated, normalized replacement values for an existing employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeChanges {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Validated list query. Predicates are exact matches on normalized values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeQuery {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

impl EmployeeQuery {
    pub const DEFAULT_LIMIT: u64 = 100;
    pub const MAX_LIMIT: u64 = 500;
    /// Largest offset the SQL drivers can bind (signed 64-bit).
    pub const MAX_OFFSET: u64 = i64::MAX as u64;
}

impl Default for EmployeeQuery {
    fn default() -> Self {
        Self {
            email: None,
            first_name: None,
            last_name: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn create(&self, new: NewEmployee) -> Result<Employee, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Employee>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, DomainError>;
    async fn list(&self, query: &EmployeeQuery) -> Result<Vec<Employee>, DomainError>;
    /// `None` when no employee has `id`.
    async fn update(&self, id: i64, changes: EmployeeChanges)
        -> Result<Option<Employee>, DomainError>;
    /// `false` when no employee has `id`.
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
}

/// Pool-backed repository. Reads go straight to the pool; each write runs in
/// its own transaction.
#[derive(Clone)]
pub struct SeaEmployeeRepository {
    db: DatabaseConnection,
}

impl SeaEmployeeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EmployeeRepository for SeaEmployeeRepository {
    async fn create(&self, new: NewEmployee) -> Result<Employee, DomainError> {
        let dto = EmployeeCreate::new(new.first_name, new.last_name, new.email);
        with_txn::<_, _, DomainError, _>(&self.db, |txn| {
            Box::pin(async move {
                let row = employees_adapter::insert_employee(txn, dto).await?;
                Ok(Employee::from(row))
            })
        })
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Employee>, DomainError> {
        let row = employees_adapter::find_by_id(&self.db, id).await?;
        Ok(row.map(Employee::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, DomainError> {
        let row = employees_adapter::find_by_email(&self.db, email).await?;
        Ok(row.map(Employee::from))
    }

    async fn list(&self, query: &EmployeeQuery) -> Result<Vec<Employee>, DomainError> {
        let rows = employees_adapter::list(&self.db, EmployeeFilter::from(query)).await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn update(
        &self,
        id: i64,
        changes: EmployeeChanges,
    ) -> Result<Option<Employee>, DomainError> {
        let dto = EmployeeUpdate::new(id, changes.first_name, changes.last_name, changes.email);
        with_txn::<_, _, DomainError, _>(&self.db, |txn| {
            Box::pin(async move {
                let row = employees_adapter::update_employee(txn, dto).await?;
                Ok(row.map(Employee::from))
            })
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        with_txn::<_, _, DomainError, _>(&self.db, |txn| {
            Box::pin(async move { Ok(employees_adapter::delete_employee(txn, id).await?) })
        })
        .await
    }
}

/// Stand-in used when the process runs without a database: every call fails
/// with `DbUnavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRepository;

impl UnavailableRepository {
    fn err() -> DomainError {
        DomainError::infra(InfraErrorKind::DbUnavailable, "Database is not configured")
    }
}

#[async_trait]
impl EmployeeRepository for UnavailableRepository {
    async fn create(&self, _new: NewEmployee) -> Result<Employee, DomainError> {
        Err(Self::err())
    }

    async fn find_by_id(&self, _id: i64) -> Result<Option<Employee>, DomainError> {
        Err(Self::err())
    }

    async fn find_by_email(&self, _email: &str) -> Result<Option<Employee>, DomainError> {
        Err(Self::err())
    }

    async fn list(&self, _query: &EmployeeQuery) -> Result<Vec<Employee>, DomainError> {
        Err(Self::err())
    }

    async fn update(
        &self,
        _id: i64,
        _changes: EmployeeChanges,
    ) -> Result<Option<Employee>, DomainError> {
        Err(Self::err())
    }

    async fn delete(&self, _id: i64) -> Result<bool, DomainError> {
        Err(Self::err())
    }
}

// Conversions between SeaORM models and domain models

impl From<employees::Model> for Employee {
    fn from(model: employees::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&EmployeeQuery> for EmployeeFilter {
    fn from(q: &EmployeeQuery) -> Self {
        let mut filter = EmployeeFilter::new(q.limit, q.offset);
        if let Some(email) = &q.email {
            filter = filter.with_email(email.clone());
        }
        if let Some(first_name) = &q.first_name {
            filter = filter.with_first_name(first_name.clone());
        }
        if let Some(last_name) = &q.last_name {
            filter = filter.with_last_name(last_name.clone());
        }
        filter
    }
}
