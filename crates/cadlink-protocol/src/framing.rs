//! Incremental line framing over a byte stream.
//!
//! Socket reads may deliver part of a line, exactly one line, or several
//! lines at once. [`LineBuffer`] accumulates bytes and yields one [`Frame`]
//! per complete non-blank line, in arrival order.

/// Default upper bound on a single frame, in bytes.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Item produced by [`LineBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line without its terminating newline.
    Line(Vec<u8>),
    /// A line exceeded the size limit. Emitted once per oversized line; the
    /// remainder of that line is discarded.
    Oversized {
        /// Configured limit in bytes.
        limit: usize,
    },
}

/// Accumulates bytes until full lines are available.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    limit: usize,
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    /// Creates a buffer that rejects lines longer than `limit` bytes.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
            discarding: false,
        }
    }

    /// Feeds freshly read bytes and returns every frame they complete.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadlink_protocol::{Frame, LineBuffer};
    ///
    /// let mut buffer = LineBuffer::default();
    /// assert!(buffer.push(b"{\"id\":").is_empty());
    /// let frames = buffer.push(b"\"a\"}\n\n{}\n");
    /// assert_eq!(
    ///     frames,
    ///     vec![Frame::Line(b"{\"id\":\"a\"}".to_vec()), Frame::Line(b"{}".to_vec())]
    /// );
    /// ```
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut remaining = bytes;
        while let Some(position) = remaining.iter().position(|byte| *byte == b'\n') {
            let (head, tail) = remaining.split_at(position);
            self.absorb(head, &mut frames);
            self.complete_line(&mut frames);
            remaining = tail.get(1..).unwrap_or_default();
        }
        self.absorb(remaining, &mut frames);
        frames
    }

    /// Flushes an unterminated trailing line at end of stream.
    pub fn finish(&mut self) -> Option<Frame> {
        let mut frames = Vec::with_capacity(1);
        self.complete_line(&mut frames);
        frames.pop()
    }

    /// Returns `true` when no partial line is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && !self.discarding
    }

    fn absorb(&mut self, bytes: &[u8], frames: &mut Vec<Frame>) {
        if self.discarding || bytes.is_empty() {
            return;
        }
        if self.pending.len().saturating_add(bytes.len()) > self.limit {
            self.pending.clear();
            self.discarding = true;
            frames.push(Frame::Oversized { limit: self.limit });
            return;
        }
        self.pending.extend_from_slice(bytes);
    }

    fn complete_line(&mut self, frames: &mut Vec<Frame>) {
        if self.discarding {
            self.discarding = false;
            return;
        }
        let line = std::mem::take(&mut self.pending);
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        frames.push(Frame::Line(line));
    }
}
