//! Socket plumbing for a single engine connection.
//!
//! A [`Connection`] owns one TCP stream plus the line buffer that turns its
//! byte stream into frames. Reads are bounded by an absolute deadline so a
//! caller's timeout covers however many partial reads a response needs.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use cadlink_config::SocketEndpoint;
use cadlink_protocol::{Frame, LineBuffer};

/// Largest response line accepted from an engine.
pub(crate) const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
const READ_CHUNK: usize = 8 * 1024;

/// Why a read ended without a frame.
#[derive(Debug)]
pub(crate) enum ReadError {
    /// The deadline passed.
    Timeout,
    /// The engine closed the stream.
    Closed,
    /// The socket failed.
    Io(io::Error),
}

pub(crate) struct Connection {
    stream: TcpStream,
    buffer: LineBuffer,
    ready: VecDeque<Frame>,
    last_used: Instant,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.stream.peer_addr().ok())
            .field("last_used", &self.last_used)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Dials the endpoint, trying every resolved address in turn.
    pub(crate) fn open(endpoint: &SocketEndpoint, timeout: Duration) -> io::Result<Self> {
        let mut last_error = None;
        for address in resolve(endpoint)? {
            match TcpStream::connect_timeout(&address, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(Self {
                        stream,
                        buffer: LineBuffer::new(MAX_RESPONSE_BYTES),
                        ready: VecDeque::new(),
                        last_used: Instant::now(),
                    });
                }
                Err(error) => last_error = Some(error),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses")
        }))
    }

    /// Time since the connection last finished an exchange.
    pub(crate) fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    pub(crate) fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Writes one encoded frame, newline included.
    pub(crate) fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame)?;
        self.stream.flush()
    }

    /// Returns the next frame, reading from the socket until `deadline`.
    pub(crate) fn read_frame(&mut self, deadline: Instant) -> Result<Frame, ReadError> {
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(frame);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ReadError::Timeout);
            }
            self.stream
                .set_read_timeout(Some(remaining))
                .map_err(ReadError::Io)?;
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return self.buffer.finish().ok_or(ReadError::Closed);
                }
                Ok(read) => {
                    let bytes = chunk.get(..read).unwrap_or_default();
                    self.ready.extend(self.buffer.push(bytes));
                }
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(error) => return Err(ReadError::Io(error)),
            }
        }
    }

    /// Closes both halves of the socket.
    pub(crate) fn close(&self) {
        if let Err(error) = self.stream.shutdown(Shutdown::Both) {
            tracing::trace!(%error, "engine socket already closed");
        }
    }
}

fn resolve(endpoint: &SocketEndpoint) -> io::Result<Vec<SocketAddr>> {
    Ok((endpoint.host(), endpoint.port()).to_socket_addrs()?.collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::net::TcpListener;
    use std::thread;

    use rstest::rstest;

    use super::*;

    fn pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let accept = thread::spawn(move || listener.accept().expect("accept").0);
        let connection = Connection::open(
            &SocketEndpoint::tcp("127.0.0.1", port),
            Duration::from_secs(1),
        )
        .expect("connect");
        (connection, accept.join().expect("accept thread"))
    }

    #[rstest]
    fn reassembles_lines_split_across_writes() {
        let (mut connection, mut server) = pair();
        let writer = thread::spawn(move || {
            server.write_all(b"{\"id\":").expect("write");
            thread::sleep(Duration::from_millis(20));
            server.write_all(b"\"a\"}\n{\"id\":\"b\"}\n").expect("write");
            server
        });
        let deadline = Instant::now() + Duration::from_secs(2);
        let first = connection.read_frame(deadline).expect("first frame");
        let second = connection.read_frame(deadline).expect("second frame");
        assert_eq!(first, Frame::Line(b"{\"id\":\"a\"}".to_vec()));
        assert_eq!(second, Frame::Line(b"{\"id\":\"b\"}".to_vec()));
        drop(writer.join().expect("writer"));
    }

    #[rstest]
    fn silent_peers_time_out() {
        let (mut connection, _server) = pair();
        let deadline = Instant::now() + Duration::from_millis(50);
        assert!(matches!(
            connection.read_frame(deadline),
            Err(ReadError::Timeout)
        ));
    }

    #[rstest]
    fn closed_peers_are_reported() {
        let (mut connection, server) = pair();
        drop(server);
        let deadline = Instant::now() + Duration::from_secs(2);
        assert!(matches!(
            connection.read_frame(deadline),
            Err(ReadError::Closed | ReadError::Io(_))
        ));
    }
}
