// crates/test-utils/src/lib.rs

//! Shared helpers for the `treetask` integration tests.

pub mod builders;
pub mod fake_runner;

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use treetask::logging::{build_filter, LOG_ENV_VAR};

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: OnceLock<()> = OnceLock::new();

/// Send `tracing` output to the harness's captured writer, so it only shows
/// up for failing tests (or with `--nocapture`).
///
/// Reads `TREETASK_LOG` the same way the binary does, e.g.
/// `TREETASK_LOG=treetask::walk=trace cargo test`.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let env = std::env::var(LOG_ENV_VAR).ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(build_filter(None, env.as_deref()))
            .with_test_writer()
            .try_init();
    });
}

/// Await `fut`, failing the test if it runs past [`TEST_TIMEOUT`].
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(TEST_TIMEOUT, fut).await {
        Ok(out) => out,
        Err(_) => panic!("test step did not finish within {TEST_TIMEOUT:?}"),
    }
}

/// Re-check `condition` every few milliseconds until it holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    with_timeout(async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}
