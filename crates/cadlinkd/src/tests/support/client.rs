//! Minimal line-oriented client for talking to a running engine.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use serde_json::{Value, json};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LineClient {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl LineClient {
    #[must_use]
    pub fn connect(address: SocketAddr) -> Self {
        let stream = TcpStream::connect(address).expect("connect to engine");
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .expect("set read timeout");
        let reader = BufReader::new(stream.try_clone().expect("clone stream"));
        Self {
            writer: stream,
            reader,
        }
    }

    /// Writes one raw line without waiting for an answer.
    pub fn send_line(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).expect("write line");
        self.writer.write_all(b"\n").expect("write newline");
        self.writer.flush().expect("flush");
    }

    /// Writes a command envelope without waiting for an answer.
    pub fn send(&mut self, id: &str, method: &str, params: Value) {
        let line = json!({"id": id, "method": method, "params": params}).to_string();
        self.send_line(&line);
    }

    /// Reads the next response line.
    pub fn read_response(&mut self) -> Value {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).expect("read response");
        assert!(read > 0, "engine closed the connection");
        serde_json::from_str(&line).expect("response is JSON")
    }

    /// Sends one command and returns its response.
    pub fn call(&mut self, id: &str, method: &str, params: Value) -> Value {
        self.send(id, method, params);
        self.read_response()
    }
}
