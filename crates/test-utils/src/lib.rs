//! Shared helpers for the integration tests: project fixtures, recording
//! notifiers and compressors, and an executor that never touches the disk.

pub mod builders;
pub mod fake_executor;
pub mod recorders;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Route `tracing` into the test harness's captured output.
///
/// Filtered by `ASSETPIPE_LOG` like the binary; defaults to `debug` for the
/// crate under test so failing runs show scheduling decisions.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("ASSETPIPE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn,assetpipe=debug"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Upper bound for anything a test awaits; a hung runtime fails instead of
/// blocking the suite.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("gave up after {TEST_TIMEOUT:?}"),
    }
}
