//! Disposable databases for integration tests.
//!
//! [`TestDatabase`] drives a [`Provisioner`] through a fixed lifecycle:
//!
//! ```text
//! NotStarted -> Starting -> Ready -> InUse -> TearingDown -> Stopped
//! ```
//!
//! `Stopped` is reachable from every state, including a failed start.
//! [`shared_postgres`] keeps one migrated Postgres container per test binary.

mod harness;
mod postgres;
mod shared;

use std::time::Duration;

use async_trait::async_trait;
use db_infra::db::DbTarget;
use thiserror::Error;

pub use harness::TestDatabase;
pub use postgres::PostgresContainer;
pub use shared::{shared_postgres, test_db_target, TestDbKind};

/// Default bound on container provisioning plus readiness.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(120);

/// Lifecycle of a test database instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    NotStarted,
    Starting,
    Ready,
    InUse,
    TearingDown,
    Stopped,
}

impl HarnessState {
    pub fn can_transition_to(self, next: HarnessState) -> bool {
        use HarnessState::{InUse, NotStarted, Ready, Starting, Stopped, TearingDown};

        matches!(
            (self, next),
            (NotStarted, Starting)
                | (Starting, Ready)
                | (Ready, InUse)
                | (InUse, InUse)
                | (Ready, TearingDown)
                | (InUse, TearingDown)
                | (_, Stopped)
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HarnessError {
    #[error("test database did not become ready within {timeout:?}")]
    StartupTimeout { timeout: Duration },
    #[error("failed to provision test database: {0}")]
    Provisioning(String),
    #[error("test database is not ready (state {0:?})")]
    NotReady(HarnessState),
    #[error("failed to migrate test database: {0}")]
    Migration(String),
    #[error("failed to tear down test database: {0}")]
    Teardown(String),
}

/// Starts database instances.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Start an instance. `startup_timeout` is forwarded to the underlying
    /// engine; the harness enforces its own bound around the whole call.
    async fn start(&self, startup_timeout: Duration)
        -> Result<Box<dyn ProvisionedDb>, HarnessError>;
}

/// A running instance.
#[async_trait]
pub trait ProvisionedDb: Send + Sync {
    fn target(&self) -> DbTarget;

    async fn shutdown(self: Box<Self>) -> Result<(), HarnessError>;
}

/// `TEST_DB_STARTUP_TIMEOUT_SECS`, falling back to [`DEFAULT_STARTUP_TIMEOUT`].
pub fn startup_timeout_from_env() -> Duration {
    std::env::var("TEST_DB_STARTUP_TIMEOUT_SECS")
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_STARTUP_TIMEOUT)
}
