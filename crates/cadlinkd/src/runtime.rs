//! Assembles a running engine from its configuration.
//!
//! Startup binds the socket first, so a port clash fails before any thread is
//! spawned. Shutdown runs in a fixed order: the listener stops accepting and
//! connections get the grace period to finish, then the scheduler is closed
//! and the main loop (if any) drains whatever was accepted before returning.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use cadlink_config::{EngineConfig, EngineKind, ExecutionModel};

use crate::dispatch::{Dispatcher, RegistryError};
use crate::handlers::registry_for;
use crate::kernel::GeometryKernel;
use crate::scheduler::{LockScheduler, Scheduler, main_loop};
use crate::session::EngineSession;
use crate::transport::{
    CommandConnectionHandler, ListenerError, ListenerHandle, ShutdownReport, SocketListener,
};

const RUNTIME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runtime");

/// Errors raised while starting or stopping an engine.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The method table could not be assembled.
    #[error("failed to build method registry: {source}")]
    Registry {
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },
    /// Binding or running the listener failed.
    #[error("engine listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
    /// The main loop thread could not be spawned.
    #[error("failed to spawn main loop thread: {source}")]
    MainLoopSpawn {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The main loop thread panicked.
    #[error("main loop thread panicked")]
    MainLoopPanicked,
}

impl From<RegistryError> for RuntimeError {
    fn from(source: RegistryError) -> Self {
        Self::Registry { source }
    }
}

impl From<ListenerError> for RuntimeError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}

/// A started engine: listener, scheduler and, for main-loop engines, the
/// thread that owns the session.
pub struct EngineRuntime {
    kind: EngineKind,
    model: ExecutionModel,
    local_addr: SocketAddr,
    grace: Duration,
    listener: ListenerHandle,
    scheduler: Arc<dyn Scheduler>,
    main_loop: Option<JoinHandle<EngineSession>>,
}

impl std::fmt::Debug for EngineRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRuntime")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("local_addr", &self.local_addr)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

impl EngineRuntime {
    /// Binds the configured endpoint and starts serving commands.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Listener`] when the endpoint cannot be bound,
    /// or another variant if the registry or main loop cannot be set up.
    pub fn start(
        config: &EngineConfig,
        kernel: Arc<dyn GeometryKernel>,
    ) -> Result<Self, RuntimeError> {
        let listener = SocketListener::bind(&config.listen_endpoint())?;
        let local_addr = listener.local_addr()?;
        let registry = Arc::new(registry_for(config.engine)?);
        let session = EngineSession::new(config.engine, kernel, config.workspace_dir.clone());

        let model = config.resolved_execution_model();
        let (scheduler, loop_thread): (Arc<dyn Scheduler>, _) = match model {
            ExecutionModel::Lock | ExecutionModel::Native => {
                (Arc::new(LockScheduler::new(session)), None)
            }
            ExecutionModel::MainLoop => {
                let (scheduler, engine_loop) = main_loop(session);
                let interval = config.tick_interval();
                let handle = thread::Builder::new()
                    .name(format!("{}-main-loop", config.engine))
                    .spawn(move || engine_loop.run(interval))
                    .map_err(|source| RuntimeError::MainLoopSpawn { source })?;
                (Arc::new(scheduler), Some(handle))
            }
        };

        let dispatcher = Dispatcher::new(registry, Arc::clone(&scheduler))
            .with_internal_errors(config.expose_internal_errors);
        let handler = Arc::new(CommandConnectionHandler::new(
            dispatcher,
            config.idle_timeout(),
            config.max_request_bytes,
        ));
        let listener = listener.start(handler)?;
        info!(
            target: RUNTIME_TARGET,
            engine = %config.engine,
            model = %model,
            address = %local_addr,
            "engine ready"
        );
        Ok(Self {
            kind: config.engine,
            model,
            local_addr,
            grace: config.shutdown_grace(),
            listener,
            scheduler,
            main_loop: loop_thread,
        })
    }

    /// Engine flavour being served.
    #[must_use]
    pub const fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Execution model in effect.
    #[must_use]
    pub const fn model(&self) -> ExecutionModel {
        self.model
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connection threads currently running.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.listener.active_connections()
    }

    /// Stops the engine and waits for accepted work to finish.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Listener`] if the accept loop panicked and
    /// [`RuntimeError::MainLoopPanicked`] if the main loop did.
    pub fn shutdown(self) -> Result<ShutdownReport, RuntimeError> {
        let Self {
            kind,
            grace,
            listener,
            scheduler,
            main_loop,
            ..
        } = self;
        info!(target: RUNTIME_TARGET, engine = %kind, "engine shutting down");
        let listener_result = listener.join(grace);
        scheduler.close();
        if let Some(handle) = main_loop {
            handle.join().map_err(|_| RuntimeError::MainLoopPanicked)?;
        }
        let report = listener_result?;
        info!(
            target: RUNTIME_TARGET,
            engine = %kind,
            forced = report.forced,
            "engine stopped"
        );
        Ok(report)
    }
}
