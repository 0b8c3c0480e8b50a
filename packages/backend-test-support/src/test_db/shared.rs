use std::path::Path;
use std::sync::{mpsc, Mutex, OnceLock};
use std::thread::JoinHandle;

use db_infra::db::{DbConfig, DbTarget, RuntimeEnv};
use migration::MigrationCommand;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{startup_timeout_from_env, HarnessError, PostgresContainer, TestDatabase};

/// Engine the integration tests run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestDbKind {
    Postgres,
    SqliteMemory,
}

impl TestDbKind {
    /// `EMPLOYEES_TEST_DB_KIND` when set, otherwise Postgres if a Docker
    /// endpoint is visible and in-memory SQLite if not.
    pub fn from_env() -> Self {
        match std::env::var("EMPLOYEES_TEST_DB_KIND")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            Ok("postgres") | Ok("pg") => TestDbKind::Postgres,
            Ok("sqlite-memory") | Ok("sqlite") | Ok("memory") => TestDbKind::SqliteMemory,
            _ if docker_available() => TestDbKind::Postgres,
            _ => TestDbKind::SqliteMemory,
        }
    }
}

fn docker_available() -> bool {
    std::env::var_os("DOCKER_HOST").is_some() || Path::new("/var/run/docker.sock").exists()
}

/// Target for a test app state. In-memory SQLite targets are fresh per pool.
pub fn test_db_target() -> Result<DbTarget, HarnessError> {
    match TestDbKind::from_env() {
        TestDbKind::Postgres => shared_postgres(),
        TestDbKind::SqliteMemory => Ok(DbTarget::SqliteMemory),
    }
}

struct SharedPostgres {
    target: DbTarget,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

static SHARED: OnceLock<Result<SharedPostgres, HarnessError>> = OnceLock::new();

/// One migrated Postgres container for the whole test binary.
///
/// The container lives on a dedicated runtime thread so it outlives the
/// per-test runtimes, and is removed by a process-exit hook.
pub fn shared_postgres() -> Result<DbTarget, HarnessError> {
    match SHARED.get_or_init(start_shared) {
        Ok(shared) => Ok(shared.target.clone()),
        Err(e) => Err(e.clone()),
    }
}

fn start_shared() -> Result<SharedPostgres, HarnessError> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<DbTarget, HarnessError>>();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let thread = std::thread::Builder::new()
        .name("shared-postgres".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = ready_tx.send(Err(HarnessError::Provisioning(e.to_string())));
                    return;
                }
            };

            runtime.block_on(async move {
                let mut db = TestDatabase::new(PostgresContainer::new(), startup_timeout_from_env());

                let started = match db.start().await {
                    Ok(target) => migrate(&target).await.map(|_| target),
                    Err(e) => Err(e),
                };
                let failed = started.is_err();
                let _ = ready_tx.send(started);

                if !failed {
                    // Dropped sender (process exit without the hook) also ends the wait.
                    let _ = shutdown_rx.await;
                }
                if let Err(e) = db.teardown().await {
                    warn!(error = %e, "shared_postgres=teardown_failed");
                }
            });
        })
        .map_err(|e| HarnessError::Provisioning(e.to_string()))?;

    let target = ready_rx
        .recv()
        .map_err(|_| HarnessError::Provisioning("shared postgres thread exited".into()))?;

    match target {
        Ok(target) => Ok(SharedPostgres {
            target,
            shutdown: Mutex::new(Some(shutdown_tx)),
            thread: Mutex::new(Some(thread)),
        }),
        Err(e) => {
            let _ = thread.join();
            Err(e)
        }
    }
}

async fn migrate(target: &DbTarget) -> Result<(), HarnessError> {
    let mut cfg = DbConfig::for_target(RuntimeEnv::Test, target.clone());
    cfg.pool.max_connections = 1;
    let conn = db_infra::connect_once(&cfg)
        .await
        .map_err(|e| HarnessError::Migration(e.to_string()))?;
    let result = db_infra::run_migration(&conn, MigrationCommand::Up, &CancellationToken::new())
        .await
        .map_err(|e| HarnessError::Migration(e.to_string()));
    if let Err(e) = conn.close().await {
        debug!(error = %e, "shared_postgres=migration_pool_close_failed");
    }
    info!(ok = result.is_ok(), "shared_postgres=migrated");
    result
}

#[ctor::dtor]
fn teardown_shared_postgres() {
    let Some(Ok(shared)) = SHARED.get() else {
        return;
    };
    if let Some(tx) = shared.shutdown.lock().ok().and_then(|mut s| s.take()) {
        let _ = tx.send(());
    }
    if let Some(handle) = shared.thread.lock().ok().and_then(|mut t| t.take()) {
        let _ = handle.join();
    }
}
