// SPDX-License-Identifier: MIT
//
// Frame compositor — one screen, one write.
//
// Every frame is rebuilt from scratch: hide the cursor, home it, draw each
// row, erase whatever the previous frame left to the right of it, put the
// cursor back where the editor wants it, show it. No diffing — at these
// sizes the full frame is a few kilobytes, and because it goes out in a
// single write the terminal never displays a half-drawn screen.
//
// Row layout:
//
//   - rows backed by a document line show that line, cut to the screen width;
//     tabs are expanded and control characters replaced, so a file can't
//     smuggle escape sequences into the frame
//   - rows past the end of the document show the `~` placeholder
//   - on an empty document, the row one third of the way down shows the
//     welcome banner, centered, led by the placeholder
//
// The last row gets no trailing `\r\n`: a line break on the bottom row
// scrolls the whole screen up by one.

use std::borrow::Cow;
use std::io::{self, Write};
use std::iter;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::ansi;
use crate::error::{Result, TermError};
use crate::geometry::{Position, Size};
use crate::output::OutputBuffer;

/// Marker drawn on rows past the end of the document.
pub const PLACEHOLDER: &str = "~";

/// Columns between tab stops.
pub const TAB_STOP: usize = 8;

/// Drawn in place of each control character in a document line.
const CONTROL_SUBSTITUTE: char = '?';

/// Everything the compositor needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Screen dimensions.
    pub size: Size,
    /// Where the cursor should end up (0-indexed, clamped on output).
    pub cursor: Position,
    /// Document lines, top to bottom. Row `y` shows `lines[y]`.
    pub lines: &'a [String],
    /// Banner for an empty document.
    pub welcome: &'a str,
}

/// Row that carries the welcome banner.
#[inline]
#[must_use]
pub const fn welcome_row(rows: u16) -> u16 {
    rows / 3
}

/// Build the frame's bytes into `out`.
///
/// Pure: the same frame always yields the same bytes.
///
/// # Errors
///
/// Propagates errors from `out`; an [`OutputBuffer`] never fails.
pub fn compose(frame: &Frame<'_>, out: &mut OutputBuffer) -> io::Result<()> {
    ansi::cursor_hide(out)?;
    ansi::cursor_home(out)?;

    draw_rows(frame, out)?;

    let cursor = frame.cursor.clamp_to(frame.size);
    ansi::cursor_to(out, cursor.x, cursor.y)?;
    ansi::cursor_show(out)
}

/// Compose a frame and send it to `w` in a single write.
///
/// # Errors
///
/// Returns [`TermError::Write`] if the write fails.
pub fn render(frame: &Frame<'_>, w: &mut impl Write) -> Result<()> {
    let mut buf = OutputBuffer::new();
    compose(frame, &mut buf).map_err(TermError::Write)?;
    buf.flush_to(w).map_err(TermError::Write)
}

fn draw_rows(frame: &Frame<'_>, out: &mut OutputBuffer) -> io::Result<()> {
    let rows = frame.size.rows;
    let cols = usize::from(frame.size.cols);
    let banner_row = frame.lines.is_empty().then(|| welcome_row(rows));

    // The bottom row is drawn too. It is the only row without a trailing
    // separator, so it can't scroll the screen.
    for y in 0..rows {
        if let Some(line) = frame.lines.get(usize::from(y)) {
            out.push_str(fit_width(&displayable(line), cols).0);
        } else if banner_row == Some(y) {
            draw_welcome(frame.welcome, cols, out);
        } else {
            out.push_str(PLACEHOLDER);
        }

        ansi::clear_line(out)?;
        if y + 1 < rows {
            ansi::newline(out)?;
        }
    }
    Ok(())
}

/// Centered banner: `~`, then spaces, then the text. The marker takes the
/// first padding column, so `padding - 1` spaces follow it.
fn draw_welcome(welcome: &str, cols: usize, out: &mut OutputBuffer) {
    let (text, width) = fit_width(welcome, cols);
    let mut padding = (cols - width) / 2;
    if padding > 0 {
        out.push_str(PLACEHOLDER);
        padding -= 1;
    }
    out.push_repeated(b' ', padding);
    out.push_str(text);
}

/// `line` as it appears on screen: tabs expanded to the next multiple of
/// [`TAB_STOP`], every other control character (C0, DEL, C1) replaced by
/// `?`. Lines with neither come back borrowed.
fn displayable(line: &str) -> Cow<'_, str> {
    if !line.chars().any(char::is_control) {
        return Cow::Borrowed(line);
    }

    let mut shown = String::with_capacity(line.len() + TAB_STOP);
    let mut col = 0;
    for grapheme in line.graphemes(true) {
        if grapheme == "\t" {
            let spaces = TAB_STOP - col % TAB_STOP;
            shown.extend(iter::repeat_n(' ', spaces));
            col += spaces;
        } else if grapheme.starts_with(char::is_control) {
            for _ in grapheme.chars() {
                shown.push(CONTROL_SUBSTITUTE);
                col += 1;
            }
        } else {
            shown.push_str(grapheme);
            col += grapheme.width();
        }
    }
    Cow::Owned(shown)
}

/// Longest prefix of `s` that fits in `cols` display columns, split on
/// grapheme boundaries. Returns the prefix and its width.
fn fit_width(s: &str, cols: usize) -> (&str, usize) {
    let mut width = 0;
    let mut end = 0;
    for (idx, grapheme) in s.grapheme_indices(true) {
        let w = grapheme.width();
        if width + w > cols {
            break;
        }
        width += w;
        end = idx + grapheme.len();
    }
    (&s[..end], width)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
