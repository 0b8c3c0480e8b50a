use std::time::Duration;

use db_infra::db::{DbConfig, DbTarget, RuntimeEnv};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::{HarnessError, HarnessState, ProvisionedDb, Provisioner};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One test database instance and its lifecycle.
pub struct TestDatabase<P: Provisioner> {
    provisioner: P,
    startup_timeout: Duration,
    state: HarnessState,
    instance: Option<Box<dyn ProvisionedDb>>,
    target: Option<DbTarget>,
    teardowns: usize,
}

impl<P: Provisioner> TestDatabase<P> {
    pub fn new(provisioner: P, startup_timeout: Duration) -> Self {
        Self {
            provisioner,
            startup_timeout,
            state: HarnessState::NotStarted,
            instance: None,
            target: None,
            teardowns: 0,
        }
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    /// Number of times an instance was actually shut down. Never exceeds one.
    pub fn teardown_count(&self) -> usize {
        self.teardowns
    }

    /// Provision the instance and wait until it accepts connections, all
    /// within the startup timeout. On failure a partially started instance
    /// is shut down and the harness ends in `Stopped`.
    pub async fn start(&mut self) -> Result<DbTarget, HarnessError> {
        if self.state != HarnessState::NotStarted {
            return Err(HarnessError::NotReady(self.state));
        }
        self.state = HarnessState::Starting;

        let deadline = Instant::now() + self.startup_timeout;
        let started = Instant::now();

        let instance = match timeout(
            self.startup_timeout,
            self.provisioner.start(self.startup_timeout),
        )
        .await
        {
            Ok(Ok(instance)) => instance,
            Ok(Err(e)) => {
                warn!(error = %e, "test_db=provision_failed");
                self.state = HarnessState::Stopped;
                return Err(e);
            }
            Err(_) => {
                warn!(timeout = ?self.startup_timeout, "test_db=provision_timeout");
                self.state = HarnessState::Stopped;
                return Err(HarnessError::StartupTimeout {
                    timeout: self.startup_timeout,
                });
            }
        };

        let target = instance.target();
        self.instance = Some(instance);

        if let Err(e) = wait_ready(&target, deadline, self.startup_timeout).await {
            warn!(error = %e, "test_db=readiness_failed");
            if let Err(shutdown_err) = self.shutdown_instance().await {
                warn!(error = %shutdown_err, "test_db=cleanup_failed");
            }
            self.state = HarnessState::Stopped;
            return Err(e);
        }

        info!(
            url = %target.redacted_url(),
            elapsed_ms = started.elapsed().as_millis(),
            "test_db=ready"
        );
        self.target = Some(target.clone());
        self.state = HarnessState::Ready;
        Ok(target)
    }

    /// Hand out the connection target of a ready instance.
    pub fn acquire(&mut self) -> Result<DbTarget, HarnessError> {
        match (&self.target, self.state) {
            (Some(target), HarnessState::Ready | HarnessState::InUse) => {
                self.state = HarnessState::InUse;
                Ok(target.clone())
            }
            (_, state) => Err(HarnessError::NotReady(state)),
        }
    }

    /// Shut the instance down. Calling it again, or after a failed start, is a no-op.
    pub async fn teardown(&mut self) -> Result<(), HarnessError> {
        if self.state == HarnessState::Stopped {
            return Ok(());
        }
        if self.state.can_transition_to(HarnessState::TearingDown) {
            self.state = HarnessState::TearingDown;
        }
        let result = self.shutdown_instance().await;
        self.target = None;
        self.state = HarnessState::Stopped;
        result
    }

    async fn shutdown_instance(&mut self) -> Result<(), HarnessError> {
        match self.instance.take() {
            Some(instance) => {
                self.teardowns += 1;
                debug!("test_db=shutdown");
                instance.shutdown().await
            }
            None => Ok(()),
        }
    }
}

/// Connect and ping until success or `deadline`.
async fn wait_ready(
    target: &DbTarget,
    deadline: Instant,
    startup_timeout: Duration,
) -> Result<(), HarnessError> {
    let mut cfg = DbConfig::for_target(RuntimeEnv::Test, target.clone());
    cfg.pool.max_connections = 1;
    cfg.pool.min_connections = 1;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(HarnessError::StartupTimeout {
                timeout: startup_timeout,
            });
        }

        let attempt = timeout(remaining, async {
            let conn = db_infra::connect_once(&cfg)
                .await
                .map_err(|e| e.to_string())?;
            let pinged = conn.ping().await.map_err(|e| e.to_string());
            if let Err(e) = conn.close().await {
                debug!(error = %e, "test_db=ready_check_close_failed");
            }
            pinged
        })
        .await;

        match attempt {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => debug!(error = %e, "test_db=not_ready"),
            Err(_) => {
                return Err(HarnessError::StartupTimeout {
                    timeout: startup_timeout,
                })
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        sleep(READY_POLL_INTERVAL.min(remaining)).await;
    }
}
