use std::future::Future;
use std::time::{Duration, Instant};

use migration::{migrate, MigrationCommand, Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::config::db::{
    build_session_statements, validate_db_config, DbConfig, DbKind, DbOwner, RuntimeEnv,
};
use crate::error::DbInfraError;

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_INTERVAL_MS: u64 = 500;
const MIGRATION_BODY_TIMEOUT_MS: u64 = 120_000;
/// Lifetime and idle limit for the single in-memory SQLite connection. The
/// pool would otherwise recycle it and hand out an empty database.
const MEMORY_CONN_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365);

async fn retry_connection<T, F, Fut>(
    mut connect_fn: F,
    max_attempts: u32,
    interval_ms: u64,
) -> Result<T, DbInfraError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbInfraError>>,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match connect_fn().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(
                        "connection_retry=success attempts={} interval_ms={}",
                        attempt, interval_ms
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt < max_attempts {
                    warn!(
                        error = %e,
                        "connection_retry=failed attempt={} max_attempts={} interval_ms={}",
                        attempt, max_attempts, interval_ms
                    );
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| DbInfraError::connect("no connection attempt was made (max_attempts = 0)")))
}

fn connect_options(cfg: &DbConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(cfg.target.url());
    opt.max_connections(cfg.pool.max_connections)
        .min_connections(cfg.pool.min_connections)
        .acquire_timeout(cfg.pool.acquire_timeout)
        .connect_timeout(cfg.pool.connect_timeout)
        .idle_timeout(cfg.pool.idle_timeout)
        .sqlx_logging(false);
    if cfg.kind() == DbKind::SqliteMemory {
        opt.max_lifetime(MEMORY_CONN_LIFETIME)
            .idle_timeout(MEMORY_CONN_LIFETIME);
    }
    opt
}

/// Opens a pool with a single attempt and applies session statements.
pub async fn connect_once(cfg: &DbConfig) -> Result<DatabaseConnection, DbInfraError> {
    let conn = Database::connect(connect_options(cfg)).await.map_err(|e| {
        DbInfraError::connect(format!(
            "failed to connect to {}: {e}",
            cfg.target.redacted_url()
        ))
    })?;
    apply_session_statements(&conn, cfg.kind()).await?;
    Ok(conn)
}

/// Opens the process pool. Server-backed targets are retried a few times
/// so a database that is still starting does not abort the process.
pub async fn connect(cfg: &DbConfig) -> Result<DatabaseConnection, DbInfraError> {
    info!(
        env = ?cfg.env,
        db_kind = ?cfg.kind(),
        url = %cfg.target.redacted_url(),
        max_connections = cfg.pool.max_connections,
        "db_connect=start"
    );

    let conn = match cfg.kind() {
        DbKind::Postgres => {
            retry_connection(|| connect_once(cfg), CONNECT_ATTEMPTS, CONNECT_INTERVAL_MS).await?
        }
        DbKind::SqliteFile | DbKind::SqliteMemory => connect_once(cfg).await?,
    };

    info!(db_kind = ?cfg.kind(), "db_connect=ready");
    Ok(conn)
}

/// Single-connection pool with owner credentials, used for migrations.
pub async fn build_admin_pool(
    env: RuntimeEnv,
    db_kind: DbKind,
) -> Result<DatabaseConnection, DbInfraError> {
    let mut cfg = DbConfig::from_env(env, db_kind, DbOwner::Owner)?;
    cfg.pool.max_connections = 1;
    cfg.pool.min_connections = 1;
    cfg.pool.acquire_timeout = Duration::from_secs(2);
    connect(&cfg).await
}

async fn apply_session_statements(
    conn: &DatabaseConnection,
    db_kind: DbKind,
) -> Result<(), DbInfraError> {
    let backend = sea_orm::DatabaseBackend::from(db_kind);
    for stmt in build_session_statements(db_kind) {
        conn.execute(Statement::from_string(backend, stmt))
            .await
            .map_err(|e| DbInfraError::config(format!("failed to apply db settings: {e}")))?;
    }
    Ok(())
}

/// True when every defined migration is applied and the latest names match.
pub async fn fast_path_schema_check(conn: &DatabaseConnection) -> Result<bool, DbInfraError> {
    let expected_count = Migrator::migrations().len();
    let expected_last = Migrator::migrations()
        .last()
        .map(|m| m.name().to_string())
        .unwrap_or_default();

    let (current_count, current_last) = match Migrator::get_applied_migrations(conn).await {
        Ok(migrations) => {
            let last = migrations.last().map(|m| m.name().to_string());
            (migrations.len(), last)
        }
        Err(DbErr::Exec(_)) => {
            trace!(fastpath = "miss", reason = "migration_table_missing");
            return Ok(false);
        }
        Err(e) => {
            return Err(DbInfraError::migration(format!(
                "failed to get applied migrations: {e}"
            )));
        }
    };

    let up_to_date = current_count == expected_count
        && !expected_last.is_empty()
        && current_last.as_deref() == Some(expected_last.as_str());

    trace!(
        fastpath = if up_to_date { "hit" } else { "miss" },
        current_count,
        expected_count,
        current_last = %current_last.as_deref().unwrap_or(""),
        expected_last = %expected_last
    );

    Ok(up_to_date)
}

/// Runs a migration command on an open pool, bounded by a body timeout and
/// abandoned when `cancel` fires. `Up` on an up-to-date schema is a no-op.
pub async fn run_migration(
    pool: &DatabaseConnection,
    command: MigrationCommand,
    cancel: &CancellationToken,
) -> Result<(), DbInfraError> {
    if command == MigrationCommand::Up && fast_path_schema_check(pool).await? {
        info!("migrate=skipped up_to_date=true");
        return Ok(());
    }

    let start = Instant::now();
    let pool_clone = pool.clone();
    let mut task = tokio::spawn(async move { migrate(&pool_clone, command).await });

    let outcome = tokio::select! {
        biased;

        joined = &mut task => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DbInfraError::migration(format!("migration execution failed: {e}"))),
            Err(join_err) if join_err.is_panic() => {
                Err(DbInfraError::migration("migration task panicked during execution"))
            }
            Err(_) => Err(DbInfraError::migration("migration task was aborted before completion")),
        },
        _ = tokio::time::sleep(Duration::from_millis(MIGRATION_BODY_TIMEOUT_MS)) => {
            task.abort();
            let _ = task.await;
            Err(DbInfraError::migration(format!(
                "migration body execution timed out after {MIGRATION_BODY_TIMEOUT_MS}ms"
            )))
        }
        _ = cancel.cancelled() => {
            task.abort();
            let _ = task.await;
            Err(DbInfraError::migration(format!(
                "migration cancelled after {}ms",
                start.elapsed().as_millis()
            )))
        }
    };
    outcome?;

    verify_applied(pool, command).await?;
    info!(cmd = ?command, elapsed_ms = start.elapsed().as_millis(), "migrate=done");
    Ok(())
}

async fn verify_applied(pool: &DatabaseConnection, command: MigrationCommand) -> Result<(), DbInfraError> {
    let expected = Migrator::migrations().len();
    let applied = migration::count_applied_migrations(pool)
        .await
        .map_err(|e| DbInfraError::migration(format!("failed to count migrations: {e}")))?;

    match command {
        MigrationCommand::Reset if applied != 0 => Err(DbInfraError::migration(format!(
            "reset should leave 0 migrations applied, but {applied} were found"
        ))),
        MigrationCommand::Up | MigrationCommand::Fresh | MigrationCommand::Refresh
            if applied != expected =>
        {
            Err(DbInfraError::migration(format!(
                "expected {expected} migrations, but {applied} were applied"
            )))
        }
        _ => Ok(()),
    }
}

/// Connects with owner credentials and runs `command`. Entry point for the CLI.
pub async fn orchestrate_migration(
    env: RuntimeEnv,
    db_kind: DbKind,
    command: MigrationCommand,
    cancel: CancellationToken,
) -> Result<(), DbInfraError> {
    validate_db_config(env, db_kind)?;
    if db_kind == DbKind::SqliteMemory {
        return Err(DbInfraError::config(
            "in-memory SQLite cannot be migrated out of process",
        ));
    }

    info!(env = ?env, db_kind = ?db_kind, cmd = ?command, "migrate=start");

    let admin_pool = build_admin_pool(env, db_kind).await?;
    let result = run_migration(&admin_pool, command, &cancel).await;

    if let Err(e) = admin_pool.close().await {
        warn!(error = %e, "failed to close admin pool");
    }

    result
}
