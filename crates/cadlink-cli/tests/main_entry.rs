//! Integration tests for the `cadlink` binary against a live engine.

use std::sync::Arc;

use anyhow::{Context, Result};
use assert_cmd::cargo::cargo_bin_cmd;
use camino::Utf8PathBuf;
use predicates::str::contains;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use cadlink_config::{EngineConfig, EngineKind, SocketEndpoint};
use cadlinkd::{AnalyticKernel, EngineRuntime};

struct LiveEngine {
    _workspace: TempDir,
    runtime: Option<EngineRuntime>,
    endpoint: String,
}

impl Drop for LiveEngine {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            drop(runtime.shutdown());
        }
    }
}

fn start(kind: EngineKind) -> Result<LiveEngine> {
    let workspace = TempDir::new().context("temporary workspace")?;
    let workspace_dir = Utf8PathBuf::from_path_buf(workspace.path().to_path_buf())
        .map_err(|path| anyhow::anyhow!("non UTF-8 workspace {}", path.display()))?;
    let config = EngineConfig {
        listen: Some(SocketEndpoint::tcp("127.0.0.1", 0)),
        shutdown_grace_ms: 200,
        workspace_dir,
        ..EngineConfig::for_engine(kind)
    };
    let runtime = EngineRuntime::start(&config, Arc::new(AnalyticKernel::new()))
        .context("engine starts")?;
    let endpoint = format!("tcp://127.0.0.1:{}", runtime.local_addr().port());
    Ok(LiveEngine {
        _workspace: workspace,
        runtime: Some(runtime),
        endpoint,
    })
}

#[fixture]
fn solid() -> LiveEngine {
    start(EngineKind::Solid).expect("solid engine")
}

#[test]
fn missing_subcommand_exits_with_failure() {
    let mut command = cargo_bin_cmd!("cadlink");
    command.assert().failure().stderr(contains("Usage"));
}

#[rstest]
fn call_prints_the_engine_response(solid: LiveEngine) {
    let mut command = cargo_bin_cmd!("cadlink");
    command.args([
        "--solid-endpoint",
        solid.endpoint.as_str(),
        "call",
        "solid",
        "create_box",
        "--params",
        r#"{"name":"Crate","length":4}"#,
    ]);
    command
        .assert()
        .success()
        .stdout(contains("\"status\":\"success\""))
        .stdout(contains("Crate"));
}

#[rstest]
fn domain_errors_exit_with_failure(solid: LiveEngine) {
    let mut command = cargo_bin_cmd!("cadlink");
    command.args([
        "--solid-endpoint",
        solid.endpoint.as_str(),
        "call",
        "solid",
        "get_object",
        "--params",
        r#"{"name":"Nowhere"}"#,
    ]);
    command
        .assert()
        .failure()
        .stdout(contains("OBJECT_NOT_FOUND"));
}

#[rstest]
fn http_mode_maps_unknown_methods_to_not_found(solid: LiveEngine) {
    let mut command = cargo_bin_cmd!("cadlink");
    command.args([
        "--solid-endpoint",
        solid.endpoint.as_str(),
        "call",
        "solid",
        "teleport",
        "--http",
    ]);
    command
        .assert()
        .failure()
        .stdout(contains("\"status\":404"));
}

#[rstest]
fn health_reports_a_running_engine(solid: LiveEngine) {
    let mut command = cargo_bin_cmd!("cadlink");
    command.args(["--solid-endpoint", solid.endpoint.as_str(), "health", "solid"]);
    command
        .assert()
        .success()
        .stdout(contains("\"status\":\"healthy\""));
}
