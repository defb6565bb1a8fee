// SPDX-License-Identifier: MIT
//
// Terminal input decoder.
//
// Turns raw stdin bytes into logical keys. Everything outside an escape
// sequence passes through verbatim as `Key::Byte`; the only sequences we
// recognize are the VT100/xterm navigation and editing keys:
//
//   ESC [ A/B/C/D        arrows
//   ESC [ H / ESC [ F    Home / End
//   ESC O H / ESC O F    Home / End (SS3 form, application cursor mode)
//   ESC [ n ~            1/7 Home, 3 Delete, 4/8 End, 5 PageUp, 6 PageDown
//
// # Design
//
// The decoder is an explicit state machine fed one byte at a time, so it
// is indifferent to how the terminal fragments a sequence across reads.
// When a read times out mid-sequence the caller invokes
// [`Decoder::timeout`], which resolves whatever prefix is pending into a
// bare `Escape`. Unrecognized sequences are swallowed the same way — the
// editor sees `Escape`, never the stray bytes.

use tracing::trace;

// ─── Key ────────────────────────────────────────────────────────────────────

/// The escape byte (0x1B).
pub const ESC: u8 = 0x1B;

/// A decoded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable or control byte, passed through unchanged.
    Byte(u8),
    // ── Navigation ──────────────────────────────────────────────
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    // ── Editing ─────────────────────────────────────────────────
    Delete,
    /// A lone ESC, or any escape sequence we don't recognize.
    Escape,
}

/// The byte a terminal sends for Ctrl + `key` (strips bits 5–7).
///
/// `ctrl(b'q')` is 0x11.
#[inline]
#[must_use]
pub const fn ctrl(key: u8) -> u8 {
    key & 0x1f
}

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Position inside an escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Between keys.
    #[default]
    Normal,
    /// Saw `ESC`.
    SawEscape,
    /// Saw `ESC O`.
    SawSs3,
    /// Saw `ESC [`.
    SawBracket,
    /// Saw `ESC [ digit`; waiting for `~`.
    SawBracketDigit(u8),
}

/// Byte-at-a-time key decoder.
///
/// # Example
///
/// ```
/// use tilde_term::input::{Decoder, Key};
///
/// let mut decoder = Decoder::new();
/// let keys: Vec<Key> = b"\x1b[3~".iter().filter_map(|&b| decoder.feed(b)).collect();
/// assert_eq!(keys, [Key::Delete]);
/// assert!(decoder.is_idle());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    state: State,
}

impl Decoder {
    /// Create a decoder in the [`Normal`](State::Normal) state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: State::Normal,
        }
    }

    /// Current state (for diagnostics and tests).
    #[inline]
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// True when no sequence is in progress.
    #[inline]
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, State::Normal)
    }

    /// Feed one byte. Returns a key when the byte completes one.
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        let (next, key) = match (self.state, byte) {
            (State::Normal, ESC) => (State::SawEscape, None),
            (State::Normal, b) => (State::Normal, Some(Key::Byte(b))),

            (State::SawEscape, b'[') => (State::SawBracket, None),
            (State::SawEscape, b'O') => (State::SawSs3, None),

            (State::SawSs3, b'H') => (State::Normal, Some(Key::Home)),
            (State::SawSs3, b'F') => (State::Normal, Some(Key::End)),

            (State::SawBracket, b'A') => (State::Normal, Some(Key::ArrowUp)),
            (State::SawBracket, b'B') => (State::Normal, Some(Key::ArrowDown)),
            (State::SawBracket, b'C') => (State::Normal, Some(Key::ArrowRight)),
            (State::SawBracket, b'D') => (State::Normal, Some(Key::ArrowLeft)),
            (State::SawBracket, b'H') => (State::Normal, Some(Key::Home)),
            (State::SawBracket, b'F') => (State::Normal, Some(Key::End)),
            (State::SawBracket, d @ b'0'..=b'9') => (State::SawBracketDigit(d), None),

            (State::SawBracketDigit(d), b'~') => {
                (State::Normal, Some(tilde_key(d).unwrap_or(Key::Escape)))
            }

            (state, b) => {
                trace!(?state, byte = b, "unrecognized escape sequence");
                (State::Normal, Some(Key::Escape))
            }
        };

        self.state = next;
        key
    }

    /// Resolve a pending prefix after a read timed out.
    ///
    /// Returns `Escape` if a sequence was in progress (a lone ESC keypress
    /// or a truncated sequence), `None` if the decoder was idle.
    pub fn timeout(&mut self) -> Option<Key> {
        if self.is_idle() {
            return None;
        }
        trace!(state = ?self.state, "escape sequence timed out");
        self.state = State::Normal;
        Some(Key::Escape)
    }
}

/// Map the digit of an `ESC [ n ~` sequence to its key.
const fn tilde_key(digit: u8) -> Option<Key> {
    match digit {
        b'1' | b'7' => Some(Key::Home),
        b'3' => Some(Key::Delete),
        b'4' | b'8' => Some(Key::End),
        b'5' => Some(Key::PageUp),
        b'6' => Some(Key::PageDown),
        _ => None,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
