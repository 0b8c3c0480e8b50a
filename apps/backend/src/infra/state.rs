use std::sync::Arc;

use migration::MigrationCommand;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::config::db::{DbConfig, DbKind, DbOwner, RuntimeEnv};
use crate::db::retry::CallPolicy;
use crate::error::AppError;
use crate::infra::db::bootstrap_db;
use crate::infra::schema_guard::verify_schema;
use crate::repos::employees::{EmployeeRepository, SeaEmployeeRepository, UnavailableRepository};
use crate::services::employees::EmployeeService;
use crate::state::app_state::AppState;

enum DbSource {
    None,
    Kind(DbKind),
    Config(DbConfig),
    Connection(DatabaseConnection),
}

/// Builder for `AppState`, used by `main` and by tests.
///
/// Without a database source the state answers every employee call with
/// `DB_UNAVAILABLE`. An explicit repository overrides the SeaORM one.
pub struct StateBuilder {
    env: RuntimeEnv,
    source: DbSource,
    run_migrations: bool,
    policy: CallPolicy,
    repo: Option<Arc<dyn EmployeeRepository>>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            env: RuntimeEnv::Prod,
            source: DbSource::None,
            run_migrations: false,
            policy: CallPolicy::default(),
            repo: None,
        }
    }

    pub fn with_env(mut self, env: RuntimeEnv) -> Self {
        self.env = env;
        self
    }

    /// Connect to `kind` using the environment's settings for the builder's profile.
    pub fn with_db(mut self, kind: DbKind) -> Self {
        self.source = DbSource::Kind(kind);
        self
    }

    pub fn with_db_config(mut self, cfg: DbConfig) -> Self {
        self.source = DbSource::Config(cfg);
        self
    }

    /// Reuse an open pool (tests sharing one database).
    pub fn with_connection(mut self, conn: DatabaseConnection) -> Self {
        self.source = DbSource::Connection(conn);
        self
    }

    pub fn with_repository(mut self, repo: Arc<dyn EmployeeRepository>) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn with_call_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let db = match self.source {
            DbSource::None => None,
            DbSource::Kind(kind) => {
                let cfg = DbConfig::from_env(self.env, kind, DbOwner::App)?;
                Some(bootstrap_db(&cfg, self.run_migrations).await?)
            }
            DbSource::Config(cfg) => Some(bootstrap_db(&cfg, self.run_migrations).await?),
            DbSource::Connection(conn) => {
                if self.run_migrations {
                    db_infra::run_migration(&conn, MigrationCommand::Up, &CancellationToken::new())
                        .await?;
                }
                verify_schema(&conn).await?;
                Some(conn)
            }
        };

        let repo: Arc<dyn EmployeeRepository> = match (self.repo, &db) {
            (Some(repo), _) => repo,
            (None, Some(conn)) => Arc::new(SeaEmployeeRepository::new(conn.clone())),
            (None, None) => Arc::new(UnavailableRepository),
        };

        let service = EmployeeService::new(repo, self.policy);
        Ok(AppState::new(db, Arc::new(service)))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}
