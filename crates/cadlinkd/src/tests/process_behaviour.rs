//! Launch supervision: bootstrap, wait for the shutdown signal, drain.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rstest::rstest;
use serde_json::json;

use cadlink_config::EngineKind;

use super::support::{
    FailingConfigLoader, HealthEvent, LineClient, RecordingHealthReporter, TestConfigLoader,
    TestShutdownSignal,
};
use crate::kernel::AnalyticKernel;
use crate::process::LaunchError;
use crate::process::launch::{LaunchPlan, run_engine_with};

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn wait_for_ready(reporter: &RecordingHealthReporter) -> std::net::SocketAddr {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    loop {
        if let Some(address) = reporter.ready_address() {
            return address;
        }
        assert!(Instant::now() < deadline, "engine never became ready");
        thread::sleep(POLL_INTERVAL);
    }
}

#[rstest]
#[case(EngineKind::Mesh)]
#[case(EngineKind::Solid)]
fn serves_until_the_shutdown_signal(#[case] kind: EngineKind) {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let shutdown = TestShutdownSignal::default();
    let plan = LaunchPlan {
        loader: TestConfigLoader::new(kind),
        reporter: Arc::clone(&reporter) as Arc<dyn crate::health::HealthReporter>,
        kernel: Arc::new(AnalyticKernel::new()),
        shutdown: shutdown.clone(),
    };
    let handle = thread::spawn(move || run_engine_with(plan));

    let address = wait_for_ready(&reporter);
    let mut client = LineClient::connect(address);
    let pong = client.call("1", "ping", json!({}));
    assert_eq!(pong["result"]["engine"], kind.to_string());
    drop(client);

    shutdown.trigger();
    let report = handle
        .join()
        .expect("launch thread")
        .expect("engine run succeeds");
    assert_eq!(report.forced, 0);
    assert!(
        reporter
            .events()
            .contains(&HealthEvent::EngineStopped { kind, forced: 0 })
    );
}

#[rstest]
fn configuration_errors_abort_the_launch() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let shutdown = TestShutdownSignal::default();
    let plan = LaunchPlan {
        loader: FailingConfigLoader::new(),
        reporter: Arc::clone(&reporter) as Arc<dyn crate::health::HealthReporter>,
        kernel: Arc::new(AnalyticKernel::new()),
        shutdown,
    };

    let error = run_engine_with(plan).expect_err("launch must fail");
    assert!(matches!(error, LaunchError::Bootstrap { .. }));
    assert!(reporter.ready_address().is_none());
}
