// SPDX-License-Identifier: MIT
//
// tilde-term — the terminal core beneath the tilde editor.
//
// Four pieces, leaves first: `terminal` switches the TTY between cooked
// and raw mode and guarantees the switch back; `geometry` works out how
// many rows and columns there are, asking the terminal itself when the OS
// won't say; `input` decodes the raw byte stream into keys, and `reader`
// drives it with timed reads; `render` composes each frame into one buffer
// and hands it to the terminal in a single write. `event_loop` alternates
// the last two until the application asks to quit.
//
// No TUI framework underneath: termios through libc, VT100 sequences
// written by hand.

#[cfg(not(unix))]
compile_error!("tilde-term drives the terminal through termios and needs a Unix target");

pub mod ansi;
pub mod error;
pub mod event_loop;
pub mod geometry;
pub mod input;
pub mod output;
pub mod reader;
pub mod render;
pub mod terminal;

pub use error::{Result, TermError};
