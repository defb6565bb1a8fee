// SPDX-License-Identifier: MIT
//
// Screen geometry — how big the terminal is, and where the cursor sits in it.
//
// Resolution prefers the direct `ioctl(TIOCGWINSZ)` query. When that is
// unavailable (not a TTY, a serial console, some multiplexers) or reports
// zero columns, we fall back to asking the terminal itself:
//
//   1. `ESC [ 999 C` + `ESC [ 999 B` — saturating moves that park the cursor
//      in the bottom-right corner from wherever it started. CUF/CUD stop at
//      the margins, unlike CUP, which some terminals clamp inconsistently.
//   2. `ESC [ 6 n` — Device Status Report. The terminal answers on stdin
//      with `ESC [ rows ; cols R`, and the cursor position *is* the size.
//
// The reply is read byte-by-byte into a fixed 32-byte buffer until `R`.
// A full buffer without `R`, a missing `ESC [` prefix, or anything that
// isn't two decimal numbers is a hard error — we never guess a default,
// because a wrong size draws garbage.
#![allow(unsafe_code)]

use std::io::{self, Read, Write};

use tracing::debug;

use crate::ansi;
use crate::error::{Result, TermError};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
///
/// Resolved once at startup. Both values are non-zero once they come out of
/// [`resolve`] or [`resolve_stdio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

impl Size {
    /// Create a size from rows and columns.
    #[inline]
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { cols, rows }
    }

    /// Whether either dimension is zero (nothing can be drawn).
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.cols == 0 || self.rows == 0
    }
}

// ─── Position ───────────────────────────────────────────────────────────────

/// Cursor position on the visible grid: column `x`, row `y`, both 0-indexed.
///
/// The terminal wants 1-indexed coordinates; [`ansi::cursor_to`] does that
/// conversion, never this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Position {
    /// Column, `0..cols`.
    pub x: u16,
    /// Row, `0..rows`.
    pub y: u16,
}

impl Position {
    /// The top-left corner.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Create a position.
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Clamp into `0..cols` × `0..rows`. An empty size clamps to the origin.
    #[must_use]
    pub fn clamp_to(self, size: Size) -> Self {
        Self {
            x: self.x.min(size.cols.saturating_sub(1)),
            y: self.y.min(size.rows.saturating_sub(1)),
        }
    }

    /// Whether this position lies inside the grid.
    #[inline]
    #[must_use]
    pub const fn is_within(self, size: Size) -> bool {
        self.x < size.cols && self.y < size.rows
    }
}

// ─── Direct query ───────────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if stdout is not a terminal, the query fails, or it
/// reports a zero dimension.
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

// ─── Resolver ───────────────────────────────────────────────────────────────

/// Longest DSR reply we accept, including `ESC [` and `R`.
///
/// `ESC [ 65535 ; 65535 R` is 15 bytes, so anything that fills this buffer
/// without a terminator is not a cursor report.
pub const REPORT_BUF_LEN: usize = 32;

/// Resolve the screen size, probing the terminal if `direct` is unusable.
///
/// `direct` is the result of the OS query (normally [`get_size`]); a `None`
/// or zero-column answer triggers the cursor-position probe over `input`
/// and `output`. Raw mode must already be active so the reply isn't
/// echoed or line-buffered.
///
/// # Errors
///
/// Returns [`TermError::Write`] / [`TermError::Read`] if the probe I/O
/// fails, [`TermError::MalformedReport`] if the reply can't be parsed, and
/// [`TermError::EmptyScreen`] if the terminal reports a zero dimension.
pub fn resolve(
    direct: Option<Size>,
    input: &mut impl Read,
    output: &mut impl Write,
) -> Result<Size> {
    if let Some(size) = direct.filter(|s| s.cols > 0) {
        debug!(rows = size.rows, cols = size.cols, "geometry from ioctl");
        return ensure_non_empty(size);
    }

    debug!("ioctl size unavailable, probing with cursor position report");
    let size = probe(input, output)?;
    debug!(rows = size.rows, cols = size.cols, "geometry from DSR probe");
    ensure_non_empty(size)
}

/// Resolve the size of the process's controlling terminal (stdin/stdout).
///
/// # Errors
///
/// See [`resolve`].
pub fn resolve_stdio() -> Result<Size> {
    resolve(
        get_size(),
        &mut crate::reader::RawStdin,
        &mut crate::output::RawStdout,
    )
}

/// Park the cursor bottom-right and read back its position.
///
/// # Errors
///
/// See [`resolve`].
pub fn probe(input: &mut impl Read, output: &mut impl Write) -> Result<Size> {
    let mut query = Vec::with_capacity(16);
    ansi::cursor_forward(&mut query, 999).map_err(TermError::Write)?;
    ansi::cursor_down(&mut query, 999).map_err(TermError::Write)?;
    ansi::request_cursor_position(&mut query).map_err(TermError::Write)?;
    output.write_all(&query).map_err(TermError::Write)?;
    output.flush().map_err(TermError::Write)?;

    let report = read_report(input)?;
    parse_cursor_report(&report)
}

/// Read a DSR reply one byte at a time until `R`, a timeout, or a full
/// buffer. The terminator is not included in the returned bytes.
fn read_report(input: &mut impl Read) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(REPORT_BUF_LEN);
    let mut byte = [0u8; 1];

    while buf.len() < REPORT_BUF_LEN - 1 {
        match input.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                if byte[0] == b'R' {
                    return Ok(buf);
                }
                buf.push(byte[0]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(TermError::Read(e)),
        }
    }

    // No terminator: timed out or overflowed.
    Err(TermError::malformed(&buf))
}

/// Parse the body of a cursor position report: `ESC [ rows ; cols`
/// (terminator already stripped).
///
/// # Errors
///
/// Returns [`TermError::MalformedReport`] if the prefix is missing or the
/// body isn't exactly two decimal numbers separated by `;`.
pub fn parse_cursor_report(report: &[u8]) -> Result<Size> {
    let body = report
        .strip_prefix(b"\x1b[")
        .ok_or_else(|| TermError::malformed(report))?;

    let mut fields = body.split(|&b| b == b';');
    let rows = fields.next().and_then(parse_u16);
    let cols = fields.next().and_then(parse_u16);

    match (rows, cols, fields.next()) {
        (Some(rows), Some(cols), None) => Ok(Size { cols, rows }),
        _ => Err(TermError::malformed(report)),
    }
}

/// Parse a non-empty run of ASCII digits into a `u16`. Overflow fails.
fn parse_u16(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    digits.iter().try_fold(0u16, |acc, &d| {
        acc.checked_mul(10)?.checked_add(u16::from(d - b'0'))
    })
}

fn ensure_non_empty(size: Size) -> Result<Size> {
    if size.is_empty() {
        Err(TermError::EmptyScreen {
            rows: size.rows,
            cols: size.cols,
        })
    } else {
        Ok(size)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Reader that fails with a fixed error kind.
    struct FailingReader(io::ErrorKind);

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(self.0))
        }
    }

    /// Writer that always fails.
    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn resolve_with(direct: Option<Size>, reply: &[u8]) -> (Result<Size>, Vec<u8>) {
        let mut input = reply;
        let mut output = Vec::new();
        let result = resolve(direct, &mut input, &mut output);
        (result, output)
    }

    // ── Size / Position ─────────────────────────────────────────────────

    #[test]
    fn size_new_is_rows_then_cols() {
        let s = Size::new(40, 130);
        assert_eq!(s.rows, 40);
        assert_eq!(s.cols, 130);
    }

    #[test]
    fn size_empty() {
        assert!(Size::new(0, 80).is_empty());
        assert!(Size::new(24, 0).is_empty());
        assert!(!Size::new(1, 1).is_empty());
    }

    #[test]
    fn position_clamps_not_wraps() {
        let size = Size::new(24, 80);
        assert_eq!(Position::new(200, 5).clamp_to(size), Position::new(79, 5));
        assert_eq!(Position::new(3, 99).clamp_to(size), Position::new(3, 23));
        assert_eq!(Position::new(4, 4).clamp_to(size), Position::new(4, 4));
    }

    #[test]
    fn position_clamp_to_empty_is_origin() {
        assert_eq!(
            Position::new(5, 5).clamp_to(Size::new(0, 0)),
            Position::ORIGIN
        );
    }

    #[test]
    fn position_within() {
        let size = Size::new(24, 80);
        assert!(Position::new(79, 23).is_within(size));
        assert!(!Position::new(80, 0).is_within(size));
        assert!(!Position::new(0, 24).is_within(size));
    }

    // ── Direct query ───────────────────────────────────────────────────

    #[test]
    fn get_size_does_not_panic() {
        let _ = get_size();
    }

    #[test]
    fn direct_size_skips_probe() {
        let (result, output) = resolve_with(Some(Size::new(24, 80)), b"");
        assert_eq!(result.unwrap(), Size::new(24, 80));
        assert!(output.is_empty(), "no probe bytes should be written");
    }

    #[test]
    fn zero_column_direct_size_falls_back() {
        let (result, output) = resolve_with(Some(Size::new(24, 0)), b"\x1b[40;130R");
        assert_eq!(result.unwrap(), Size::new(40, 130));
        assert!(!output.is_empty());
    }

    #[test]
    fn zero_row_direct_size_is_an_error() {
        let (result, _) = resolve_with(Some(Size::new(0, 80)), b"");
        assert!(matches!(
            result,
            Err(TermError::EmptyScreen { rows: 0, cols: 80 })
        ));
    }

    // ── Probe ──────────────────────────────────────────────────────────

    #[test]
    fn fallback_parses_dsr_reply() {
        let (result, _) = resolve_with(None, b"\x1b[40;130R");
        assert_eq!(result.unwrap(), Size::new(40, 130));
    }

    #[test]
    fn probe_writes_saturating_moves_then_dsr() {
        let (_, output) = resolve_with(None, b"\x1b[40;130R");
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "\x1b[999C\x1b[999B\x1b[6n"
        );
    }

    #[test]
    fn probe_stops_at_terminator() {
        let mut input: &[u8] = b"\x1b[24;80Rxyz";
        let mut output = Vec::new();
        assert_eq!(probe(&mut input, &mut output).unwrap(), Size::new(24, 80));
        assert_eq!(input, b"xyz", "bytes after R must stay unread");
    }

    #[test]
    fn truncated_reply_is_an_error() {
        let (result, _) = resolve_with(None, b"\x1b[40;13");
        assert!(matches!(result, Err(TermError::MalformedReport(_))));
    }

    #[test]
    fn overlong_reply_is_an_error() {
        let reply = [b'9'; 64];
        let (result, _) = resolve_with(None, &reply);
        assert!(matches!(result, Err(TermError::MalformedReport(_))));
    }

    #[test]
    fn zero_size_reply_is_an_error() {
        let (result, _) = resolve_with(None, b"\x1b[0;0R");
        assert!(matches!(result, Err(TermError::EmptyScreen { .. })));
    }

    #[test]
    fn read_failure_is_fatal() {
        let mut input = FailingReader(io::ErrorKind::BrokenPipe);
        let mut output = Vec::new();
        let result = resolve(None, &mut input, &mut output);
        assert!(matches!(result, Err(TermError::Read(_))));
    }

    #[test]
    fn would_block_ends_the_read() {
        let mut input = FailingReader(io::ErrorKind::WouldBlock);
        let mut output = Vec::new();
        let result = resolve(None, &mut input, &mut output);
        assert!(matches!(result, Err(TermError::MalformedReport(_))));
    }

    #[test]
    fn write_failure_is_fatal() {
        let mut input: &[u8] = b"\x1b[40;130R";
        let result = resolve(None, &mut input, &mut FailingWriter);
        assert!(matches!(result, Err(TermError::Write(_))));
    }

    // ── Report parsing ─────────────────────────────────────────────────

    #[test]
    fn parse_report_ok() {
        assert_eq!(
            parse_cursor_report(b"\x1b[24;80").unwrap(),
            Size::new(24, 80)
        );
    }

    #[test]
    fn parse_report_requires_prefix() {
        assert!(parse_cursor_report(b"24;80").is_err());
        assert!(parse_cursor_report(b"\x1b24;80").is_err());
        assert!(parse_cursor_report(b"[24;80").is_err());
    }

    #[test]
    fn parse_report_rejects_garbage() {
        assert!(parse_cursor_report(b"\x1b[").is_err());
        assert!(parse_cursor_report(b"\x1b[24").is_err());
        assert!(parse_cursor_report(b"\x1b[24;").is_err());
        assert!(parse_cursor_report(b"\x1b[;80").is_err());
        assert!(parse_cursor_report(b"\x1b[2a;80").is_err());
        assert!(parse_cursor_report(b"\x1b[24;80;1").is_err());
    }

    #[test]
    fn parse_report_rejects_overflow() {
        assert!(parse_cursor_report(b"\x1b[70000;80").is_err());
        assert_eq!(
            parse_cursor_report(b"\x1b[65535;65535").unwrap(),
            Size::new(65535, 65535)
        );
    }
}
