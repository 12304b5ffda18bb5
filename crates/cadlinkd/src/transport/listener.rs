//! Listener implementation for engine sockets.

use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use cadlink_config::SocketEndpoint;

use super::{ConnectionContext, ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Listener bound to a TCP endpoint but not yet accepting.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: SocketEndpoint,
    listener: TcpListener,
}

impl SocketListener {
    /// Binds the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::AddressInUse`] when the port is taken, or
    /// another variant when resolution or binding fails.
    pub fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let listener = bind_tcp(endpoint.host(), endpoint.port())?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Address actually bound, useful when the configured port was `0`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::LocalAddr`] if the socket cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        self.listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })
    }

    /// Starts accepting connections on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::NonBlocking`] if the socket cannot be polled.
    pub fn start(self, handler: Arc<dyn ConnectionHandler>) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let tracker = Arc::new(ConnectionTracker::default());
        let shutdown_flag = Arc::clone(&shutdown);
        let loop_tracker = Arc::clone(&tracker);
        let handle =
            thread::spawn(move || run_accept_loop(&self, &shutdown_flag, &loop_tracker, &handler));
        Ok(ListenerHandle {
            shutdown,
            tracker,
            handle: Some(handle),
        })
    }
}

/// Outcome of [`ListenerHandle::join`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Connections still open when the grace period ran out.
    pub forced: usize,
}

/// Handle to the background listener thread.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    tracker: Arc<ConnectionTracker>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Stops accepting and asks connection handlers to wind down.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Number of connection threads still running.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.tracker.active()
    }

    /// Stops the listener and waits up to `grace` for connections to close,
    /// then shuts down whatever is left.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] if the accept loop panicked.
    pub fn join(mut self, grace: Duration) -> Result<ShutdownReport, ListenerError> {
        self.shutdown();
        let accept_loop = match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        };

        let deadline = Instant::now() + grace;
        while self.tracker.active() > 0 && Instant::now() < deadline {
            thread::sleep(DRAIN_POLL);
        }
        let forced = self.tracker.force_close();
        if forced > 0 {
            warn!(
                target: LISTENER_TARGET,
                forced,
                grace_ms = grace.as_millis(),
                "closed connections still open after grace period"
            );
        }
        accept_loop?;
        Ok(ShutdownReport { forced })
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Keeps a second handle on every open connection so shutdown can close
/// sockets whose threads are blocked.
#[derive(Debug, Default)]
struct ConnectionTracker {
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, TcpStream>>,
}

impl ConnectionTracker {
    fn register(self: &Arc<Self>, stream: &TcpStream) -> io::Result<TrackedConnection> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let shadow = stream.try_clone()?;
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, shadow);
        Ok(TrackedConnection {
            id,
            tracker: Arc::clone(self),
        })
    }

    fn active(&self) -> usize {
        self.open.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn force_close(&self) -> usize {
        let open: Vec<_> = self
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (id, stream) in &open {
            if let Err(error) = stream.shutdown(Shutdown::Both) {
                debug!(target: LISTENER_TARGET, connection = id, %error, "forced close failed");
            }
        }
        open.len()
    }
}

/// Deregisters its connection when the connection thread ends.
struct TrackedConnection {
    id: u64,
    tracker: Arc<ConnectionTracker>,
}

impl Drop for TrackedConnection {
    fn drop(&mut self) {
        self.tracker
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &Arc<AtomicBool>,
    tracker: &Arc<ConnectionTracker>,
    handler: &Arc<dyn ConnectionHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener, tracker) {
            Ok(Some((stream, peer, tracked))) => {
                last_error = None;
                let handler = Arc::clone(handler);
                let context = ConnectionContext::new(tracked.id, Some(peer), Arc::clone(shutdown));
                debug!(target: LISTENER_TARGET, connection = tracked.id, %peer, "connection accepted");
                thread::spawn(move || {
                    let _tracked = tracked;
                    handler.handle(stream, &context);
                });
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "socket listener stopped"
    );
}

fn accept_connection(
    listener: &SocketListener,
    tracker: &Arc<ConnectionTracker>,
) -> Result<Option<(TcpStream, SocketAddr, TrackedConnection)>, io::Error> {
    match listener.listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            let tracked = tracker.register(&stream)?;
            Ok(Some((stream, peer, tracked)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| match source.kind() {
        io::ErrorKind::AddrInUse => ListenerError::AddressInUse { addr },
        _ => ListenerError::BindTcp { addr, source },
    })
}
