//! Bounded pool of connections to one engine.
//!
//! The pool never holds more than `max_size` open sockets. Callers borrow a
//! [`PooledConnection`] for one exchange and hand it back with
//! [`PooledConnection::release`]; a borrow that is dropped instead is treated
//! as unhealthy and its socket closed, which frees the slot for a new dial.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use cadlink_config::{EngineKind, GatewayConfig, SocketEndpoint};
use cadlink_protocol::{Command, Frame, Params, Response, encode_line};

use crate::error::GatewayError;
use crate::transport::{Connection, ReadError};

const POOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pool");

/// Limits applied by a [`ConnectionPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum open connections.
    pub max_size: usize,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Longest wait for a free connection.
    pub acquire_timeout: Duration,
    /// Idle connections older than this are closed instead of reused.
    pub max_idle: Duration,
}

impl PoolSettings {
    /// Derives pool limits from the gateway configuration.
    ///
    /// A configured size of zero is raised to one.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_size: config.pool_size.max(1),
            connect_timeout: config.connect_timeout(),
            acquire_timeout: config.acquire_timeout(),
            max_idle: config.max_idle(),
        }
    }
}

#[derive(Debug, Default)]
struct PoolState {
    idle: Vec<Connection>,
    open: usize,
}

/// Connections to one engine endpoint.
#[derive(Debug)]
pub struct ConnectionPool {
    engine: EngineKind,
    endpoint: SocketEndpoint,
    settings: PoolSettings,
    state: Mutex<PoolState>,
    available: Condvar,
    next_id: AtomicU64,
}

impl ConnectionPool {
    /// Creates an empty pool; sockets are opened lazily on acquire.
    #[must_use]
    pub fn new(engine: EngineKind, endpoint: SocketEndpoint, settings: PoolSettings) -> Self {
        Self {
            engine,
            endpoint,
            settings,
            state: Mutex::new(PoolState::default()),
            available: Condvar::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Engine served by the pool.
    #[must_use]
    pub const fn engine(&self) -> EngineKind {
        self.engine
    }

    /// Endpoint the pool dials.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Sockets currently open, borrowed or idle.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.lock().open
    }

    /// Sockets waiting in the pool for a borrower.
    #[must_use]
    pub fn idle_connections(&self) -> usize {
        self.lock().idle.len()
    }

    /// Borrows a connection, dialling a new one while below the size limit.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Connection`] when a new socket cannot be
    /// opened and [`GatewayError::PoolExhausted`] when the pool stays full for
    /// the whole acquire timeout.
    pub fn acquire(self: &Arc<Self>) -> Result<PooledConnection, GatewayError> {
        let started = Instant::now();
        let deadline = started + self.settings.acquire_timeout;
        let mut state = self.lock();
        loop {
            while let Some(connection) = state.idle.pop() {
                if connection.idle_for() > self.settings.max_idle {
                    debug!(
                        target: POOL_TARGET,
                        engine = %self.engine,
                        "closing stale idle connection"
                    );
                    connection.close();
                    state.open = state.open.saturating_sub(1);
                    continue;
                }
                return Ok(PooledConnection::new(Arc::clone(self), connection));
            }

            if state.open < self.settings.max_size {
                state.open += 1;
                drop(state);
                return self.dial();
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    target: POOL_TARGET,
                    engine = %self.engine,
                    size = self.settings.max_size,
                    "connection pool exhausted"
                );
                return Err(GatewayError::PoolExhausted {
                    engine: self.engine,
                    waited: now.duration_since(started),
                });
            }
            let (guard, _) = self
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Opens a socket for a slot already counted in `open`.
    fn dial(self: &Arc<Self>) -> Result<PooledConnection, GatewayError> {
        match Connection::open(&self.endpoint, self.settings.connect_timeout) {
            Ok(connection) => {
                debug!(
                    target: POOL_TARGET,
                    engine = %self.engine,
                    endpoint = %self.endpoint,
                    "opened engine connection"
                );
                Ok(PooledConnection::new(Arc::clone(self), connection))
            }
            Err(source) => {
                self.forget_slot();
                Err(self.connection_error(source))
            }
        }
    }

    fn put_back(&self, mut connection: Connection) {
        connection.touch();
        self.lock().idle.push(connection);
        self.available.notify_one();
    }

    fn discard(&self, connection: &Connection) {
        connection.close();
        self.forget_slot();
    }

    fn forget_slot(&self) {
        let mut state = self.lock();
        state.open = state.open.saturating_sub(1);
        drop(state);
        self.available.notify_one();
    }

    fn next_command_id(&self) -> String {
        format!("gw-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn connection_error(&self, source: io::Error) -> GatewayError {
        GatewayError::Connection {
            engine: self.engine,
            endpoint: self.endpoint.to_string(),
            source,
        }
    }

    fn protocol_error(&self, message: impl Into<String>) -> GatewayError {
        GatewayError::Protocol {
            engine: self.engine,
            message: message.into(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A borrowed connection.
///
/// Commands may be pipelined with [`submit`](Self::submit) and collected in
/// any order with [`wait_for`](Self::wait_for); responses for other
/// in-flight commands are held until asked for.
#[derive(Debug)]
pub struct PooledConnection {
    pool: Arc<ConnectionPool>,
    connection: Option<Connection>,
    healthy: bool,
    in_flight: HashMap<String, String>,
    stash: HashMap<String, Response>,
}

impl PooledConnection {
    fn new(pool: Arc<ConnectionPool>, connection: Connection) -> Self {
        Self {
            pool,
            connection: Some(connection),
            healthy: true,
            in_flight: HashMap::new(),
            stash: HashMap::new(),
        }
    }

    /// Returns `false` once an exchange failed on this socket.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Sends one command and waits for its response.
    ///
    /// # Errors
    ///
    /// See [`submit`](Self::submit) and [`wait_for`](Self::wait_for).
    pub fn send_command(
        &mut self,
        method: &str,
        params: Params,
        timeout: Duration,
    ) -> Result<Response, GatewayError> {
        let id = self.submit(method, params)?;
        self.wait_for(&id, timeout)
    }

    /// Writes a command without waiting and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Connection`] if the write fails.
    pub fn submit(&mut self, method: &str, params: Params) -> Result<String, GatewayError> {
        let id = self.pool.next_command_id();
        let command = Command::new(id.clone(), method, params);
        let frame = encode_line(&command).map_err(|error| {
            self.pool
                .protocol_error(format!("failed to encode '{method}': {error}"))
        })?;
        let written = self.connection()?.write_frame(&frame);
        if let Err(source) = written {
            self.healthy = false;
            return Err(self.pool.connection_error(source));
        }
        self.in_flight.insert(id.clone(), method.to_owned());
        Ok(id)
    }

    /// Waits for the response to a submitted command.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Timeout`] when nothing matching arrives in
    /// time, [`GatewayError::Connection`] when the socket fails or closes and
    /// [`GatewayError::Protocol`] for unusable frames or ids never submitted.
    /// Every error leaves the connection unhealthy.
    pub fn wait_for(&mut self, id: &str, timeout: Duration) -> Result<Response, GatewayError> {
        if let Some(response) = self.stash.remove(id) {
            self.in_flight.remove(id);
            return Ok(response);
        }
        let Some(method) = self.in_flight.get(id).cloned() else {
            return Err(self
                .pool
                .protocol_error(format!("no command '{id}' is in flight")));
        };

        let deadline = Instant::now() + timeout;
        loop {
            let frame = self.connection()?.read_frame(deadline);
            let line = match frame {
                Ok(Frame::Line(line)) => line,
                Ok(Frame::Oversized { limit }) => {
                    return Err(self.broken(format!("response exceeds {limit} byte limit")));
                }
                Err(ReadError::Timeout) => {
                    self.healthy = false;
                    return Err(GatewayError::Timeout {
                        engine: self.pool.engine,
                        method,
                        timeout,
                    });
                }
                Err(ReadError::Closed) => {
                    self.healthy = false;
                    return Err(self.pool.connection_error(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "engine closed the connection",
                    )));
                }
                Err(ReadError::Io(source)) => {
                    self.healthy = false;
                    return Err(self.pool.connection_error(source));
                }
            };

            let response = match Response::parse(&line) {
                Ok(response) => response,
                Err(error) => return Err(self.broken(error.to_string())),
            };
            match response.id.clone() {
                Some(received) if received == id => {
                    self.in_flight.remove(id);
                    return Ok(response);
                }
                Some(received) if self.in_flight.contains_key(&received) => {
                    self.stash.insert(received, response);
                }
                Some(received) => {
                    debug!(
                        target: POOL_TARGET,
                        engine = %self.pool.engine,
                        id = %received,
                        "discarding response nobody is waiting for"
                    );
                }
                None => {
                    let code = response.error_code().unwrap_or("unknown").to_owned();
                    return Err(self.broken(format!("engine rejected a frame with {code}")));
                }
            }
        }
    }

    /// Hands the connection back, or closes it when `healthy` is `false` or
    /// an earlier exchange failed.
    pub fn release(mut self, healthy: bool) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        if healthy && self.healthy {
            self.pool.put_back(connection);
        } else {
            debug!(
                target: POOL_TARGET,
                engine = %self.pool.engine,
                "discarding unhealthy connection"
            );
            self.pool.discard(&connection);
        }
    }

    fn connection(&mut self) -> Result<&mut Connection, GatewayError> {
        let Self {
            pool, connection, ..
        } = self;
        connection
            .as_mut()
            .ok_or_else(|| pool.protocol_error("connection already released"))
    }

    fn broken(&mut self, message: String) -> GatewayError {
        self.healthy = false;
        self.pool.protocol_error(message)
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.discard(&connection);
        }
    }
}
