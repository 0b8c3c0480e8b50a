use std::sync::Arc;
use std::time::Duration;

use backend_test_support::test_db_target;
use employee_api::config::db::{DbConfig, RuntimeEnv};
use employee_api::db::retry::{CallPolicy, RetryPolicy};
use employee_api::infra::state::{build_state, StateBuilder};
use employee_api::repos::employees::EmployeeRepository;
use employee_api::state::app_state::AppState;

/// Retries fast enough that failure-injection tests stay quick.
pub fn fast_policy() -> CallPolicy {
    CallPolicy::new(
        Duration::from_millis(500),
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)),
    )
}

/// Builder pointed at the test database: the binary's shared Postgres
/// container, or a fresh in-memory SQLite when Docker is unavailable.
pub fn test_state_builder() -> Result<StateBuilder, Box<dyn std::error::Error>> {
    let target = test_db_target()?;
    Ok(build_state()
        .with_env(RuntimeEnv::Test)
        .with_db_config(DbConfig::for_target(RuntimeEnv::Test, target)))
}

pub async fn build_test_state() -> Result<AppState, Box<dyn std::error::Error>> {
    Ok(test_state_builder()?.build().await?)
}

/// State without a database, serving the given repository.
pub async fn state_with_repo(repo: Arc<dyn EmployeeRepository>, policy: CallPolicy) -> AppState {
    build_state()
        .with_repository(repo)
        .with_call_policy(policy)
        .build()
        .await
        .expect("state without a database always builds")
}
