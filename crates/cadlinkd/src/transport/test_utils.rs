//! Test helpers for the transport module.

use std::io::Read;
use std::net::TcpStream;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde_json::json;

use cadlink_config::EngineKind;

use super::{ConnectionContext, ConnectionHandler};
use crate::dispatch::{Dispatcher, ParamKind, ParamSchema, ParamsExt, RegistryBuilder};
use crate::kernel::AnalyticKernel;
use crate::scheduler::LockScheduler;
use crate::session::EngineSession;

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: TcpStream, _context: &ConnectionContext) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Reads until the peer or the listener closes the socket, ignoring the
/// shutdown flag.
pub(crate) struct HoldingHandler {
    finished: Arc<AtomicUsize>,
}

impl HoldingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let finished = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            finished: Arc::clone(&finished),
        });
        (finished, handler)
    }
}

impl ConnectionHandler for HoldingHandler {
    fn handle(&self, mut stream: TcpStream, _context: &ConnectionContext) {
        let mut buffer = [0_u8; 64];
        while matches!(stream.read(&mut buffer), Ok(read) if read > 0) {}
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Dispatcher with a single `echo` method backed by a lock scheduler.
pub(crate) fn echo_dispatcher() -> Dispatcher {
    let mut builder = RegistryBuilder::new();
    builder
        .register(
            "echo",
            ParamSchema::new().required("text", ParamKind::String),
            |_, params| Ok(json!(params.str_param("text")?)),
        )
        .expect("register echo");
    builder
        .register(
            "sleep",
            ParamSchema::new().required("ms", ParamKind::Integer),
            |_, params| {
                let millis = params.opt_u64("ms").unwrap_or_default();
                thread::sleep(Duration::from_millis(millis));
                Ok(json!(millis))
            },
        )
        .expect("register sleep");
    let session = EngineSession::new(
        EngineKind::Solid,
        Arc::new(AnalyticKernel::new()),
        Utf8PathBuf::from("."),
    );
    Dispatcher::new(
        Arc::new(builder.build()),
        Arc::new(LockScheduler::new(session)),
    )
}
