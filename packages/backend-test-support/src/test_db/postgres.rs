use std::time::Duration;

use async_trait::async_trait;
use db_infra::db::{ConnParams, DbTarget};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;

use super::{HarnessError, ProvisionedDb, Provisioner};
use crate::unique_helpers::unique_str;

const POSTGRES_PORT: u16 = 5432;
const POSTGRES_TAG: &str = "16-alpine";

/// Postgres in a throwaway container with generated credentials.
#[derive(Debug, Clone)]
pub struct PostgresContainer {
    tag: String,
}

impl PostgresContainer {
    pub fn new() -> Self {
        Self {
            tag: POSTGRES_TAG.to_string(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

impl Default for PostgresContainer {
    fn default() -> Self {
        Self::new()
    }
}

struct RunningPostgres {
    container: ContainerAsync<Postgres>,
    params: ConnParams,
}

#[async_trait]
impl Provisioner for PostgresContainer {
    async fn start(
        &self,
        startup_timeout: Duration,
    ) -> Result<Box<dyn ProvisionedDb>, HarnessError> {
        // Test profile names must end in `_test`.
        let database = format!("{}_test", unique_str("employees").replace('-', "_"));
        let username = "employees_test".to_string();
        let password = unique_str("pw");

        let container = Postgres::default()
            .with_db_name(&database)
            .with_user(&username)
            .with_password(&password)
            .with_tag(self.tag.clone())
            .with_startup_timeout(startup_timeout)
            .start()
            .await
            .map_err(|e| HarnessError::Provisioning(e.to_string()))?;

        let host = container
            .get_host()
            .await
            .map_err(|e| HarnessError::Provisioning(e.to_string()))?;
        let port = container
            .get_host_port_ipv4(POSTGRES_PORT)
            .await
            .map_err(|e| HarnessError::Provisioning(e.to_string()))?;

        info!(container = %container.id(), host = %host, port, database = %database, "test_db=container_started");

        Ok(Box::new(RunningPostgres {
            container,
            params: ConnParams {
                host: host.to_string(),
                port,
                database,
                username,
                password,
            },
        }))
    }
}

#[async_trait]
impl ProvisionedDb for RunningPostgres {
    fn target(&self) -> DbTarget {
        DbTarget::Postgres(self.params.clone())
    }

    async fn shutdown(self: Box<Self>) -> Result<(), HarnessError> {
        let id = self.container.id().to_string();
        self.container
            .rm()
            .await
            .map_err(|e| HarnessError::Teardown(e.to_string()))?;
        info!(container = %id, "test_db=container_removed");
        Ok(())
    }
}
