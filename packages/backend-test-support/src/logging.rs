//! Shared test logging initialization for unit and integration tests.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install the test subscriber once per process.
///
/// Filter precedence: `TEST_LOG`, then `RUST_LOG`, then `"warn"`.
/// `TEST_LOG_FORMAT=json` switches to the JSON formatter the server uses,
/// which helps when asserting on field names while debugging a test.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let json = std::env::var("TEST_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        // try_init: something else may already own the global subscriber
        if json {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_test_writer()
                .without_time()
                .try_init()
                .ok();
        } else {
            fmt()
                .with_env_filter(filter)
                .with_test_writer()
                .without_time()
                .try_init()
                .ok();
        }
    });
}
