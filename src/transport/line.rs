//! Line assembly over a blocking byte stream
//!
//! Bytes of an unfinished line survive read timeouts. A line longer than the
//! limit is cut at the limit and handed up as-is (it will not parse), and the
//! rest of it is skipped up to the next newline.

use super::{LineRead, TransportError};
use std::io::{BufRead, ErrorKind};
use tracing::debug;

/// Longest line kept in memory
pub const MAX_LINE_LEN: usize = 4096;

#[derive(Debug)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
    limit: usize,
    /// Skipping the tail of an oversized line
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub(crate) fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
            discarding: false,
        }
    }

    /// Read until one full line is available, the reader times out, or the
    /// stream ends. A final line without terminator is returned before
    /// [`TransportError::Closed`].
    pub(crate) fn read_line<R: BufRead>(&mut self, reader: &mut R) -> Result<LineRead, TransportError> {
        loop {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(e) if is_timeout(e.kind()) => return Ok(LineRead::Timeout),
                Err(e) => return Err(TransportError::Io(e)),
            };

            if available.is_empty() {
                self.discarding = false;
                if self.pending.is_empty() {
                    return Err(TransportError::Closed);
                }
                return Ok(LineRead::Line(self.take_line()));
            }

            let (used, terminated) = match available.iter().position(|&b| b == b'\n') {
                Some(idx) => (idx + 1, true),
                None => (available.len(), false),
            };

            let mut overflowed = false;
            if !self.discarding {
                let room = self.limit - self.pending.len();
                if used > room {
                    self.pending.extend_from_slice(&available[..room]);
                    overflowed = true;
                } else {
                    self.pending.extend_from_slice(&available[..used]);
                }
            }
            reader.consume(used);

            if overflowed {
                debug!(limit = self.limit, "Line exceeds limit, dropping the remainder");
                self.discarding = !terminated;
                return Ok(LineRead::Line(self.take_line()));
            }

            if self.discarding {
                if terminated {
                    self.discarding = false;
                    continue;
                }
                // Give the caller a chance to notice cancellation
                return Ok(LineRead::Timeout);
            }

            if terminated {
                return Ok(LineRead::Line(self.take_line()));
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes)
            .trim_end_matches(&['\r', '\n'][..])
            .to_string()
    }
}

fn is_timeout(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}
