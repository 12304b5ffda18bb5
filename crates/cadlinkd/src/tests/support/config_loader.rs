//! Configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use cadlink_config::{EngineConfig, EngineKind, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that binds an ephemeral loopback port and keeps files in a
/// temporary workspace.
#[derive(Clone)]
pub struct TestConfigLoader {
    kind: EngineKind,
    workspace: Arc<TempDir>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new(kind: EngineKind) -> Self {
        let workspace = TempDir::new().expect("failed to create temporary workspace");
        Self {
            kind,
            workspace: Arc::new(workspace),
        }
    }

    /// Configuration handed out by [`ConfigLoader::load`].
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        let workspace_dir = Utf8PathBuf::from_path_buf(self.workspace.path().to_path_buf())
            .expect("temporary workspace path was not valid UTF-8");
        EngineConfig {
            listen: Some(SocketEndpoint::tcp("127.0.0.1", 0)),
            shutdown_grace_ms: 500,
            tick_interval_ms: 2,
            workspace_dir,
            log_filter: "warn".to_owned(),
            ..EngineConfig::for_engine(self.kind)
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<EngineConfig, Arc<OrthoError>> {
        Ok(self.config())
    }
}

/// Loader that fails by reading a configuration file naming an unknown
/// engine.
pub struct FailingConfigLoader {
    dir: TempDir,
}

impl FailingConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        fs::write(dir.path().join("cadlinkd.toml"), "engine = \"voxel\"\n")
            .expect("failed to write configuration");
        Self { dir }
    }
}

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<EngineConfig, Arc<OrthoError>> {
        let args = vec![
            OsString::from("cadlinkd"),
            OsString::from("--config-path"),
            self.dir.path().join("cadlinkd.toml").into_os_string(),
        ];
        EngineConfig::load_from_iter(args)
    }
}
