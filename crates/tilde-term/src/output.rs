// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Output buffering.
//
// A frame is a few dozen escape sequences interleaved with text. Sent as
// many small writes, the terminal repaints in between and the user sees
// the cursor dart across the screen. `OutputBuffer` accumulates the whole
// frame in memory so it reaches the terminal in one `write()`.
//
// `RawStdout` exists for the same reason: `io::stdout()` is line-buffered
// and would split a frame at every `\r\n`.

use std::io::{self, Write};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates one frame of output.
///
/// Default capacity: 16 KB — enough for a full screen of text without
/// reallocation on typical terminal sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// Create an empty buffer with default capacity (16 KB).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a string.
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Append `n` copies of `byte`.
    pub fn push_repeated(&mut self, byte: u8, n: usize) {
        self.buf.resize(self.buf.len() + n, byte);
    }

    /// Write the whole frame to `w` in a single `write_all`, then consume
    /// the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing goes through flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RawStdout ───────────────────────────────────────────────────────────────

/// Unbuffered writer over file descriptor 1.
///
/// Each `write` is one `write(2)` syscall; `flush` is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawStdout;

impl Write for RawStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(libc::STDOUT_FILENO, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Writer that counts `write` calls.
    #[derive(Default)]
    struct CountingWriter {
        writes: usize,
        bytes: Vec<u8>,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn new_is_empty() {
        assert_eq!(OutputBuffer::new().as_bytes(), b"");
    }

    #[test]
    fn push_accumulates_in_order() {
        let mut buf = OutputBuffer::new();
        buf.write_all(b"\x1b[H").unwrap();
        buf.push_str("hello");
        buf.push_repeated(b' ', 3);
        assert_eq!(buf.as_bytes(), b"\x1b[Hhello   ");
    }

    #[test]
    fn push_repeated_zero_is_noop() {
        let mut buf = OutputBuffer::new();
        buf.push_repeated(b'~', 0);
        assert_eq!(buf.as_bytes(), b"");
    }

    #[test]
    fn write_trait_appends() {
        let mut buf = OutputBuffer::new();
        write!(buf, "\x1b[{};{}H", 3, 7).unwrap();
        assert_eq!(buf.as_bytes(), b"\x1b[3;7H");
    }

    #[test]
    fn flush_to_is_one_write() {
        let mut buf = OutputBuffer::new();
        buf.push_str("line one\r\n");
        buf.push_str("line two\r\n");
        buf.push_str("\x1b[?25h");
        let mut out = CountingWriter::default();
        buf.flush_to(&mut out).unwrap();
        assert_eq!(out.writes, 1);
        assert_eq!(out.bytes, b"line one\r\nline two\r\n\x1b[?25h");
    }

    #[test]
    fn flush_empty_writes_nothing() {
        let mut out = CountingWriter::default();
        OutputBuffer::new().flush_to(&mut out).unwrap();
        assert_eq!(out.writes, 0);
    }
}
