//! Connection handling for engine sockets.

use std::io::{self, BufWriter, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use strum::Display;
use tracing::{debug, warn};

use cadlink_protocol::{Frame, LineBuffer, encode_line};

use super::LISTENER_TARGET;
use crate::dispatch::Dispatcher;

/// How long a blocking read waits before the handler re-checks the idle
/// deadline and the shutdown flag.
const READ_POLL: Duration = Duration::from_millis(50);
const READ_CHUNK: usize = 8 * 1024;

/// Per-connection facts handed to a [`ConnectionHandler`].
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Listener-assigned connection number.
    pub id: u64,
    /// Remote address, when known.
    pub peer: Option<SocketAddr>,
    shutdown: Arc<AtomicBool>,
}

impl ConnectionContext {
    /// Builds a context sharing the listener's shutdown flag.
    #[must_use]
    pub const fn new(id: u64, peer: Option<SocketAddr>, shutdown: Arc<AtomicBool>) -> Self {
        Self { id, peer, shutdown }
    }

    /// Returns `true` once the listener is shutting down.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection until it closes. Implementations should
    /// avoid panicking.
    fn handle(&self, stream: TcpStream, context: &ConnectionContext);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
enum CloseReason {
    PeerClosed,
    IdleTimeout,
    Shutdown,
}

/// Reads newline-delimited commands and writes one response per frame.
///
/// Frames are answered in the order they arrive, so pipelined commands on one
/// connection complete in order. The connection stays open after malformed
/// or oversized lines.
#[derive(Debug)]
pub struct CommandConnectionHandler {
    dispatcher: Dispatcher,
    idle_timeout: Duration,
    max_request_bytes: usize,
}

impl CommandConnectionHandler {
    /// Creates a handler.
    #[must_use]
    pub const fn new(dispatcher: Dispatcher, idle_timeout: Duration, max_request_bytes: usize) -> Self {
        Self {
            dispatcher,
            idle_timeout,
            max_request_bytes,
        }
    }

    fn serve(&self, stream: TcpStream, context: &ConnectionContext) -> io::Result<CloseReason> {
        stream.set_read_timeout(Some(READ_POLL))?;
        let mut reader = stream.try_clone()?;
        let mut writer = BufWriter::new(stream);
        let mut buffer = LineBuffer::new(self.max_request_bytes);
        let mut chunk = vec![0_u8; READ_CHUNK];
        let mut last_activity = Instant::now();

        loop {
            if context.is_shutting_down() {
                return Ok(CloseReason::Shutdown);
            }
            match reader.read(&mut chunk) {
                Ok(0) => {
                    if let Some(frame) = buffer.finish() {
                        self.respond(&mut writer, frame, context)?;
                        writer.flush()?;
                    }
                    return Ok(CloseReason::PeerClosed);
                }
                Ok(read) => {
                    let received = chunk.get(..read).unwrap_or_default();
                    for frame in buffer.push(received) {
                        self.respond(&mut writer, frame, context)?;
                    }
                    writer.flush()?;
                    // Idle time counts from the last reply, not the request.
                    last_activity = Instant::now();
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    if last_activity.elapsed() >= self.idle_timeout {
                        return Ok(CloseReason::IdleTimeout);
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn respond(
        &self,
        writer: &mut impl Write,
        frame: Frame,
        context: &ConnectionContext,
    ) -> io::Result<()> {
        let response = self.dispatcher.handle_frame(frame, context.id);
        match encode_line(&response) {
            Ok(line) => writer.write_all(&line),
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    connection = context.id,
                    %error,
                    "failed to encode response"
                );
                Ok(())
            }
        }
    }
}

impl ConnectionHandler for CommandConnectionHandler {
    fn handle(&self, stream: TcpStream, context: &ConnectionContext) {
        match self.serve(stream, context) {
            Ok(reason) => debug!(
                target: LISTENER_TARGET,
                connection = context.id,
                %reason,
                "connection closed"
            ),
            Err(error) => warn!(
                target: LISTENER_TARGET,
                connection = context.id,
                error = %error,
                "connection handler error"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use rstest::{fixture, rstest};
    use serde_json::json;

    use cadlink_protocol::{Response, codes};

    use super::*;
    use crate::transport::echo_dispatcher;

    /// Server/client pair with the command handler on the server side.
    struct HandlerHarness {
        client: TcpStream,
        reader: BufReader<TcpStream>,
        shutdown: Arc<AtomicBool>,
        server: JoinHandle<()>,
    }

    impl HandlerHarness {
        fn start(idle_timeout: Duration, max_request_bytes: usize) -> Self {
            let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
            let addr = listener.local_addr().expect("listener address");
            let shutdown = Arc::new(AtomicBool::new(false));
            let context = ConnectionContext::new(1, None, Arc::clone(&shutdown));
            let handler =
                CommandConnectionHandler::new(echo_dispatcher(), idle_timeout, max_request_bytes);
            let server = thread::spawn(move || {
                let (stream, _) = listener.accept().expect("accept connection");
                handler.handle(stream, &context);
            });
            let client = TcpStream::connect(addr).expect("connect client");
            let reader = BufReader::new(client.try_clone().expect("clone client"));
            Self {
                client,
                reader,
                shutdown,
                server,
            }
        }

        fn send(&mut self, bytes: &[u8]) {
            self.client.write_all(bytes).expect("write request");
            self.client.flush().expect("flush request");
        }

        fn receive(&mut self) -> Response {
            let mut line = String::new();
            self.reader.read_line(&mut line).expect("read response");
            Response::parse(line.as_bytes()).expect("parse response")
        }

        fn at_eof(&mut self) -> bool {
            let mut line = String::new();
            matches!(self.reader.read_line(&mut line), Ok(0))
        }
    }

    #[fixture]
    fn harness() -> HandlerHarness {
        HandlerHarness::start(Duration::from_secs(5), 1024)
    }

    #[rstest]
    fn pipelined_commands_are_answered_in_order(mut harness: HandlerHarness) {
        harness.send(
            b"{\"id\":\"1\",\"method\":\"echo\",\"params\":{\"text\":\"a\"}}\n\
              {\"id\":\"2\",\"method\":\"echo\",\"params\":{\"text\":\"b\"}}\n\
              {\"id\":\"3\",\"method\":\"echo\",\"params\":{\"text\":\"c\"}}\n",
        );
        for (id, text) in [("1", "a"), ("2", "b"), ("3", "c")] {
            let response = harness.receive();
            assert_eq!(response.id.as_deref(), Some(id));
            assert_eq!(response.result, Some(json!(text)));
        }
    }

    #[rstest]
    fn frames_split_across_writes_are_reassembled(mut harness: HandlerHarness) {
        harness.send(b"{\"id\":\"s\",\"meth");
        thread::sleep(Duration::from_millis(20));
        harness.send(b"od\":\"echo\",\"params\":{\"text\":\"joined\"}}\n");
        let response = harness.receive();
        assert_eq!(response.result, Some(json!("joined")));
    }

    #[rstest]
    fn malformed_lines_do_not_close_the_connection(mut harness: HandlerHarness) {
        harness.send(b"this is not json\n");
        let response = harness.receive();
        assert_eq!(response.id, None);
        assert_eq!(response.error_code(), Some(codes::PARSE_ERROR));

        harness.send(b"{\"id\":\"ok\",\"method\":\"echo\",\"params\":{\"text\":\"still here\"}}\n");
        let response = harness.receive();
        assert_eq!(response.id.as_deref(), Some("ok"));
        assert!(response.is_success());
    }

    #[rstest]
    fn oversized_lines_are_rejected_once(mut harness: HandlerHarness) {
        let mut oversized = vec![b'x'; 4096];
        oversized.push(b'\n');
        harness.send(&oversized);
        let response = harness.receive();
        assert_eq!(response.error_code(), Some(codes::INVALID_REQUEST));

        harness.send(b"{\"id\":\"after\",\"method\":\"echo\",\"params\":{\"text\":\"t\"}}\n");
        let response = harness.receive();
        assert_eq!(response.id.as_deref(), Some("after"));
    }

    #[rstest]
    fn trailing_line_without_newline_is_answered_at_eof(mut harness: HandlerHarness) {
        harness.send(b"{\"id\":\"tail\",\"method\":\"echo\",\"params\":{\"text\":\"t\"}}");
        harness
            .client
            .shutdown(std::net::Shutdown::Write)
            .expect("half-close client");
        let response = harness.receive();
        assert_eq!(response.id.as_deref(), Some("tail"));
        assert!(harness.at_eof());
        harness.server.join().expect("server thread");
    }

    #[rstest]
    fn idle_connections_are_closed() {
        let mut harness = HandlerHarness::start(Duration::from_millis(100), 1024);
        assert!(harness.at_eof(), "server should close an idle connection");
        harness.server.join().expect("server thread");
    }

    #[rstest]
    fn idle_time_counts_from_the_last_reply() {
        let mut harness = HandlerHarness::start(Duration::from_millis(150), 1024);
        harness.send(b"{\"id\":\"slow\",\"method\":\"sleep\",\"params\":{\"ms\":300}}\n");
        assert_eq!(harness.receive().id.as_deref(), Some("slow"));

        thread::sleep(Duration::from_millis(80));
        harness.send(b"{\"id\":\"next\",\"method\":\"echo\",\"params\":{\"text\":\"t\"}}\n");
        let response = harness.receive();
        assert_eq!(response.id.as_deref(), Some("next"));
        assert!(response.is_success());
    }

    #[rstest]
    fn shutdown_flag_closes_the_connection(mut harness: HandlerHarness) {
        harness.send(b"{\"id\":\"before\",\"method\":\"echo\",\"params\":{\"text\":\"t\"}}\n");
        assert!(harness.receive().is_success());
        harness.shutdown.store(true, Ordering::SeqCst);
        assert!(harness.at_eof());
        harness.server.join().expect("server thread");
    }
}
