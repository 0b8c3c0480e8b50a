use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use actix_web::{web, HttpResponse};
use migration::get_latest_migration_version;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::time::timeout;

use crate::db::require_db;
use crate::error::AppError;
use crate::logging::pii::Redacted;
use crate::state::app_state::AppState;

pub const BANNER: &str = "Employee API is running";

pub async fn root() -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(BANNER))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app_version: &'static str,
    db: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    db_error: Option<String>,
    migrations: String,
    time: String,
}

/// Run one health query, giving up after `limit`.
async fn bounded<T, E, F>(limit: Duration, what: &str, fut: F) -> Result<T, String>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(val)) => Ok(val),
        Ok(Err(e)) => Err(format!("{what} failed: {}", Redacted(&e.to_string()))),
        Err(_) => Err(format!("{what} timed out after {}ms", limit.as_millis())),
    }
}

async fn check_db(conn: &DatabaseConnection, limit: Duration) -> (&'static str, Option<String>, String) {
    let ping = bounded(
        limit,
        "DB query",
        conn.query_one(Statement::from_string(
            conn.get_database_backend(),
            "SELECT 1 AS health_check",
        )),
    )
    .await;
    if let Err(e) = ping {
        return ("error", Some(e), "unknown".to_string());
    }

    let migrations = match bounded(limit, "migration lookup", get_latest_migration_version(conn)).await {
        Ok(Some(version)) => version,
        Ok(None) => "no_migrations".to_string(),
        Err(_) => "unknown".to_string(),
    };
    ("ok", None, migrations)
}

/// Liveness plus database reachability. Always 200; `db` reports the check,
/// which is bounded by the service's per-call timeout.
pub async fn health(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let time = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    let (db, db_error, migrations) = match require_db(&app_state) {
        Ok(conn) => check_db(conn, app_state.employees().policy().op_timeout).await,
        Err(e) => ("unavailable", Some(e.detail().to_string()), "unknown".to_string()),
    };

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        app_version: env!("CARGO_PKG_VERSION"),
        db,
        db_error,
        migrations,
        time,
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .route("/health", web::get().to(health));
}
