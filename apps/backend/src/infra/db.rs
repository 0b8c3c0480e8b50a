use migration::MigrationCommand;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::db::{DbConfig, DbKind};
use crate::error::AppError;
use crate::infra::schema_guard::verify_schema;

/// Open the process pool, optionally migrate, then verify the schema.
///
/// In-memory SQLite is always migrated: every such pool starts empty.
pub async fn bootstrap_db(cfg: &DbConfig, migrate: bool) -> Result<DatabaseConnection, AppError> {
    let conn = db_infra::connect(cfg).await?;

    if migrate || cfg.kind() == DbKind::SqliteMemory {
        info!(db_kind = ?cfg.kind(), "bootstrap migrate=up");
        db_infra::run_migration(&conn, MigrationCommand::Up, &CancellationToken::new()).await?;
    }

    verify_schema(&conn).await?;
    Ok(conn)
}
