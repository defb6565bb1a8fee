// SPDX-License-Identifier: MIT
//
// Error types for terminal control.
//
// Two classes of failure surface here, and both are fatal to the editor:
// the device refused to report or accept its attributes, or a read/write on
// the terminal streams failed for a reason other than "would block". The
// geometry probe adds two more (malformed cursor report, empty screen),
// which are fatal at startup because nothing can be drawn without bounds.
//
// Malformed key sequences are deliberately absent: the key decoder absorbs
// them into a bare Escape event and never reports them.

use std::io;

use thiserror::Error;

/// Terminal control error.
#[derive(Debug, Error)]
pub enum TermError {
    /// `tcgetattr` failed: the original attributes could not be captured.
    #[error("tcgetattr: {0}")]
    GetAttributes(#[source] io::Error),

    /// `tcsetattr` failed: raw mode could not be applied or cooked mode
    /// could not be restored.
    #[error("tcsetattr: {0}")]
    SetAttributes(#[source] io::Error),

    /// Reading from the input device failed.
    #[error("read: {0}")]
    Read(#[source] io::Error),

    /// Writing to the output device failed.
    #[error("write: {0}")]
    Write(#[source] io::Error),

    /// The cursor position report was truncated or did not parse as
    /// `ESC [ rows ; cols R`.
    #[error("malformed cursor position report: {0}")]
    MalformedReport(String),

    /// The terminal reported a zero-sized screen.
    #[error("terminal reported an empty screen ({rows} rows × {cols} cols)")]
    EmptyScreen {
        /// Reported row count.
        rows: u16,
        /// Reported column count.
        cols: u16,
    },
}

impl TermError {
    /// Build a [`MalformedReport`](Self::MalformedReport) from raw bytes,
    /// escaping control characters so the message stays printable.
    #[must_use]
    pub fn malformed(raw: &[u8]) -> Self {
        Self::MalformedReport(raw.escape_ascii().to_string())
    }
}

/// Result alias for terminal operations.
pub type Result<T> = std::result::Result<T, TermError>;

// ─── Tests ───────────────────────────────────────────────────────────────────
