//! Real engine processes hosted in the test process.

use std::sync::Arc;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use cadlink_config::{EngineConfig, EngineKind, SocketEndpoint};
use cadlinkd::{AnalyticKernel, EngineRuntime};

/// A `cadlinkd` runtime on an ephemeral loopback port.
pub(crate) struct RealEngine {
    _workspace: TempDir,
    runtime: Option<EngineRuntime>,
}

impl RealEngine {
    pub(crate) fn start(kind: EngineKind) -> Self {
        let workspace = TempDir::new().expect("temporary workspace");
        let workspace_dir = Utf8PathBuf::from_path_buf(workspace.path().to_path_buf())
            .expect("temporary workspace path was not valid UTF-8");
        let config = EngineConfig {
            listen: Some(SocketEndpoint::tcp("127.0.0.1", 0)),
            shutdown_grace_ms: 200,
            tick_interval_ms: 2,
            workspace_dir,
            ..EngineConfig::for_engine(kind)
        };
        let runtime =
            EngineRuntime::start(&config, Arc::new(AnalyticKernel::new())).expect("engine starts");
        Self {
            _workspace: workspace,
            runtime: Some(runtime),
        }
    }

    pub(crate) fn endpoint(&self) -> SocketEndpoint {
        let port = self
            .runtime
            .as_ref()
            .map_or(0, |runtime| runtime.local_addr().port());
        SocketEndpoint::tcp("127.0.0.1", port)
    }

    pub(crate) fn stop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            drop(runtime.shutdown());
        }
    }
}

impl Drop for RealEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
