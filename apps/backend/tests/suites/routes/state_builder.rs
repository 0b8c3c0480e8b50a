use std::env;

use employee_api::config::db::{DbConfig, DbKind, DbTarget, RuntimeEnv};
use employee_api::domain::employees::EmployeeInput;
use employee_api::infra::state::build_state;
use employee_api::AppError;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_profile_rejects_database_without_test_suffix() {
    env::set_var("TEST_DB", "employees");
    env::set_var("APP_DB_USER", "app");
    env::set_var("APP_DB_PASSWORD", "secret");

    let err = build_state()
        .with_env(RuntimeEnv::Test)
        .with_db(DbKind::Postgres)
        .build()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Config { .. }), "{err:?}");
    assert!(err.to_string().contains("_test"), "{err}");

    for name in ["TEST_DB", "APP_DB_USER", "APP_DB_PASSWORD"] {
        env::remove_var(name);
    }
}

#[tokio::test]
#[serial]
async fn missing_credentials_are_a_config_error() {
    env::set_var("PROD_DB", "employees");
    env::remove_var("APP_DB_USER");
    env::remove_var("APP_DB_PASSWORD");

    let err = build_state()
        .with_db(DbKind::Postgres)
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Config { .. }), "{err:?}");
    assert!(err.to_string().contains("APP_DB_USER"), "{err}");

    env::remove_var("PROD_DB");
}

#[tokio::test]
async fn unmigrated_connection_fails_schema_check() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = DbConfig::for_target(RuntimeEnv::Test, DbTarget::SqliteMemory);
    let conn = db_infra::connect_once(&cfg).await?;

    let err = build_state()
        .with_env(RuntimeEnv::Test)
        .with_connection(conn)
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Config { .. }), "{err:?}");
    assert!(err.to_string().contains("employees"), "{err}");
    Ok(())
}

#[tokio::test]
async fn shared_connection_with_migrations_serves_requests() -> Result<(), Box<dyn std::error::Error>>
{
    let cfg = DbConfig::for_target(RuntimeEnv::Test, DbTarget::SqliteMemory);
    let conn = db_infra::connect_once(&cfg).await?;

    let state = build_state()
        .with_env(RuntimeEnv::Test)
        .with_connection(conn)
        .run_migrations(true)
        .build()
        .await?;
    assert!(state.db().is_some());

    let created = state
        .employees()
        .create(EmployeeInput::new("Shared", "Pool", "shared.pool@example.com"))
        .await?;
    assert_eq!(state.employees().get(created.id).await?, created);

    state.close().await?;
    Ok(())
}
