//! Non-blocking line assembly from a raw byte stream.

use crate::config::{MAX_LINE_LEN, RX_BUFFER_CAPACITY};
use heapless::{Deque, String};

/// Outcome of extracting one line from the receive ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineResult {
    /// A complete line, terminators excluded.
    Line(String<MAX_LINE_LEN>),
    /// A span exceeded the line length limit and was discarded.
    ///
    /// The caller is expected to report `line_too_long` exactly once per
    /// overflow result.
    Overflow,
}

/// Accumulates transport bytes into delimited text lines.
///
/// Backed by a fixed-capacity ring; never blocks and never grows. CR and LF
/// are interchangeable terminators, and consecutive terminator bytes are
/// coalesced so `\r\n` yields a single line.
#[derive(Default)]
pub struct LineAssembler {
    ring: Deque<u8, RX_BUFFER_CAPACITY>,
}

impl LineAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self { ring: Deque::new() }
    }

    /// Appends one byte. Bytes arriving while the ring is full are dropped.
    pub fn feed(&mut self, byte: u8) {
        let _ = self.ring.push_back(byte);
    }

    /// Number of bytes currently buffered.
    pub fn pending(&self) -> usize {
        self.ring.len()
    }

    /// Tries to extract the next complete line.
    ///
    /// Returns `None` when no terminator has arrived yet and the pending
    /// span is still within the line length limit. Once the unterminated
    /// span reaches [`MAX_LINE_LEN`] bytes, exactly that many bytes are
    /// discarded and [`LineResult::Overflow`] is returned, so a missing
    /// terminator can never stall the loop or exhaust the ring.
    pub fn try_extract_line(&mut self) -> Option<LineResult> {
        let terminator_at = self.ring.iter().position(|&b| is_terminator(b));

        let Some(len) = terminator_at else {
            if self.ring.len() >= MAX_LINE_LEN {
                self.discard(MAX_LINE_LEN);
                return Some(LineResult::Overflow);
            }
            return None;
        };

        let mut line: String<MAX_LINE_LEN> = String::new();
        let mut overflow = false;
        for _ in 0..len {
            if let Some(byte) = self.ring.pop_front() {
                if line.push(byte as char).is_err() {
                    overflow = true;
                }
            }
        }

        // Consume the terminator and coalesce any run of CR/LF after it.
        self.ring.pop_front();
        while matches!(self.ring.front(), Some(&b) if is_terminator(b)) {
            self.ring.pop_front();
        }

        if overflow {
            Some(LineResult::Overflow)
        } else {
            Some(LineResult::Line(line))
        }
    }

    fn discard(&mut self, count: usize) {
        for _ in 0..count {
            self.ring.pop_front();
        }
    }
}

#[inline]
fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}
