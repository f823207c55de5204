pub mod builders;
pub mod fake_executor;
pub mod recording;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{
    git_group, test_repo, BatchConfigBuilder, GroupConfigBuilder, TaskConfigBuilder,
};
pub use fake_executor::{ExecutorProbe, ScriptedExecutor};
pub use recording::{RecordingReporter, ReportEvent, ScriptedDecisions, SharedBuffer};

static INIT: Once = Once::new();

/// Install a per-test tracing subscriber once per test binary.
///
/// Output goes through the test writer, so it only shows up for failing
/// tests. `RUST_LOG` overrides the default filter, which keeps the engine
/// at `debug` and everything else at `warn`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,repobatch=debug"));

        // Another test harness may already have installed a subscriber.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than `secs` seconds.
pub async fn within<F, T>(secs: u64, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(std::time::Duration::from_secs(secs), f).await {
        Ok(value) => value,
        Err(_) => panic!("batch did not settle within {secs}s"),
    }
}

/// [`within`] with the default 5 second budget.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    within(5, f).await
}
