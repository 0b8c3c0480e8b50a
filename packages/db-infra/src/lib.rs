//! Shared database configuration, connection bootstrap and migration orchestration.
//! Used by the backend, the migration CLI and the test harness.

pub mod config;
pub mod error;
pub mod infra;

pub use config::db;
pub use config::db::sanitize_db_url;
pub use error::DbInfraError;
pub use infra::db::core::{
    build_admin_pool, connect, connect_once, fast_path_schema_check, orchestrate_migration,
    run_migration,
};
