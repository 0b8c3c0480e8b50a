use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::db::retry::CallPolicy;
use crate::repos::employees::{EmployeeRepository, UnavailableRepository};
use crate::services::employees::EmployeeService;

/// Application state shared by all workers through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    /// Process pool. `None` when running without a database.
    pub db: Option<DatabaseConnection>,
    pub employees: Arc<EmployeeService>,
}

impl AppState {
    pub fn new(db: Option<DatabaseConnection>, employees: Arc<EmployeeService>) -> Self {
        Self { db, employees }
    }

    /// State whose repository fails every call with `DB_UNAVAILABLE`.
    pub fn without_db() -> Self {
        let repo: Arc<dyn EmployeeRepository> = Arc::new(UnavailableRepository);
        Self::new(
            None,
            Arc::new(EmployeeService::new(repo, CallPolicy::default())),
        )
    }

    pub fn db(&self) -> Option<&DatabaseConnection> {
        self.db.as_ref()
    }

    pub fn employees(&self) -> &EmployeeService {
        &self.employees
    }

    /// Close the pool, if any. Called once at shutdown.
    pub async fn close(self) -> Result<(), sea_orm::DbErr> {
        match self.db {
            Some(db) => db.close().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db.is_some())
            .finish_non_exhaustive()
    }
}
