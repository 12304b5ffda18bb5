use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::{DEFAULT_MESH_PORT, DEFAULT_SOLID_PORT};
use crate::socket::SocketEndpoint;

/// Flavour of engine a `cadlinkd` process hosts.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EngineKind {
    /// Mesh modelling and rendering engine driven by a cooperative main loop.
    #[default]
    Mesh,
    /// Solid modelling engine whose API tolerates calls from any thread.
    Solid,
}

impl EngineKind {
    /// Port an engine of this kind listens on unless configured otherwise.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Mesh => DEFAULT_MESH_PORT,
            Self::Solid => DEFAULT_SOLID_PORT,
        }
    }

    /// Loopback endpoint on the default port.
    #[must_use]
    pub fn default_endpoint(self) -> SocketEndpoint {
        SocketEndpoint::tcp("127.0.0.1", self.default_port())
    }

    /// Execution model the engine's scripting API requires.
    #[must_use]
    pub const fn native_execution_model(self) -> ExecutionModel {
        match self {
            Self::Mesh => ExecutionModel::MainLoop,
            Self::Solid => ExecutionModel::Lock,
        }
    }
}

/// How commands reach the engine's single execution context.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ExecutionModel {
    /// Use whatever the engine kind requires.
    #[default]
    Native,
    /// Queue commands for the engine's main loop to drain.
    MainLoop,
    /// Run commands on the connection thread under one session lock.
    Lock,
}

impl ExecutionModel {
    /// Resolves [`ExecutionModel::Native`] against an engine kind.
    #[must_use]
    pub const fn resolve(self, kind: EngineKind) -> Self {
        match self {
            Self::Native => kind.native_execution_model(),
            other => other,
        }
    }
}
