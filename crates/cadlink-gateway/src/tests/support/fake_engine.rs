//! Scripted engine used to exercise the client against misbehaving peers.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::json;

use cadlink_config::SocketEndpoint;
use cadlink_protocol::{Command, Response, decode_command, encode_line};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const ACCEPT_WAIT: Duration = Duration::from_secs(2);

/// How the fake engine answers.
#[derive(Debug, Clone)]
pub(crate) enum Mode {
    /// Echo the method back in a success response.
    Echo,
    /// Echo after sleeping.
    Slow(Duration),
    /// Read two commands, then answer the second before the first.
    Reversed,
    /// Close every connection as soon as it is accepted.
    Hangup,
    /// Send this line in reply to every command.
    Raw(String),
}

#[derive(Default)]
struct Journal {
    accepted: Vec<Instant>,
    commands: Vec<Command>,
}

pub(crate) struct FakeEngine {
    port: u16,
    journal: Arc<Mutex<Journal>>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeEngine {
    pub(crate) fn spawn(mode: Mode) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake engine")?;
        let port = listener.local_addr().context("local addr")?.port();
        let journal = Arc::new(Mutex::new(Journal::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let journal = Arc::clone(&journal);
            let stop = Arc::clone(&stop);
            thread::spawn(move || accept_loop(&listener, &mode, &journal, &stop))
        };
        Ok(Self {
            port,
            journal,
            stop,
            handle: Some(handle),
        })
    }

    pub(crate) fn endpoint(&self) -> SocketEndpoint {
        SocketEndpoint::tcp("127.0.0.1", self.port)
    }

    pub(crate) fn accepted(&self) -> Vec<Instant> {
        self.journal.lock().expect("journal lock").accepted.clone()
    }

    /// Waits until at least `expected` connections were accepted, then
    /// returns every accept time seen so far.
    pub(crate) fn accepted_at_least(&self, expected: usize) -> Vec<Instant> {
        let deadline = Instant::now() + ACCEPT_WAIT;
        loop {
            let accepted = self.accepted();
            if accepted.len() >= expected || Instant::now() >= deadline {
                return accepted;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub(crate) fn commands(&self) -> Vec<Command> {
        self.journal.lock().expect("journal lock").commands.clone()
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Wakes the blocking accept so the loop sees the stop flag.
        drop(TcpStream::connect(("127.0.0.1", self.port)));
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

fn accept_loop(
    listener: &TcpListener,
    mode: &Mode,
    journal: &Arc<Mutex<Journal>>,
    stop: &AtomicBool,
) {
    loop {
        match listener.accept() {
            Ok(_) if stop.load(Ordering::SeqCst) => return,
            Ok((stream, _)) => {
                journal.lock().expect("journal lock").accepted.push(Instant::now());
                if matches!(mode, Mode::Hangup) {
                    drop(stream);
                    continue;
                }
                let mode = mode.clone();
                let journal = Arc::clone(journal);
                thread::spawn(move || drop(serve(stream, &mode, &journal)));
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(_) => return,
        }
    }
}

fn serve(stream: TcpStream, mode: &Mode, journal: &Mutex<Journal>) -> Result<()> {
    stream.set_nonblocking(false)?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut held: Option<Command> = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let command = decode_command(line.trim_end().as_bytes()).map_err(|error| {
            anyhow::anyhow!("fake engine received an invalid frame: {error:?}")
        })?;
        journal
            .lock()
            .expect("journal lock")
            .commands
            .push(command.clone());
        match mode {
            Mode::Echo => write_echo(&mut writer, &command)?,
            Mode::Slow(delay) => {
                thread::sleep(*delay);
                write_echo(&mut writer, &command)?;
            }
            Mode::Reversed => match held.take() {
                None => held = Some(command),
                Some(first) => {
                    write_echo(&mut writer, &command)?;
                    write_echo(&mut writer, &first)?;
                }
            },
            Mode::Raw(reply) => {
                writer.write_all(reply.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            Mode::Hangup => return Ok(()),
        }
    }
}

fn write_echo(writer: &mut TcpStream, command: &Command) -> Result<()> {
    let response = Response::success(command.id.clone(), json!({ "method": command.method }));
    writer.write_all(&encode_line(&response)?)?;
    Ok(())
}
