// SPDX-License-Identifier: MIT
//
// Event loop — draw, read, repeat.
//
// Single-threaded and strictly alternating: one full frame goes out, then
// one timed read/decode cycle runs, then control returns to drawing. The
// only place the thread waits is the VTIME-bounded read, so the loop comes
// back around at least every ~100 ms even when no key arrives, and a lone
// ESC is resolved by the same timeout.
//
// There is nothing asynchronous to cancel. Quitting means writing the
// clear-screen sequence synchronously and returning; the caller's
// `Terminal` guard then restores cooked mode on its way out of scope.

use std::io::{Read, Write};

use tracing::debug;

use crate::error::{Result, TermError};
use crate::input::Key;
use crate::reader::KeyReader;
use crate::render::{self, Frame};
use crate::terminal;

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after handling a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Exit the event loop cleanly.
    Quit,
}

/// Application interface for the event loop.
///
/// Each iteration the loop asks for a [`frame`](App::frame), draws it, then
/// delivers at most one key to [`on_key`](App::on_key).
pub trait App {
    /// Handle one decoded key. Return [`Action::Quit`] to exit the loop.
    fn on_key(&mut self, key: Key) -> Action;

    /// Describe the next frame.
    fn frame(&self) -> Frame<'_>;
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The render/decode loop over an input and an output stream.
///
/// # Example
///
/// ```no_run
/// use tilde_term::event_loop::EventLoop;
/// # use tilde_term::event_loop::{Action, App};
/// # use tilde_term::input::Key;
/// # use tilde_term::render::Frame;
/// # struct MyApp;
/// # impl App for MyApp {
/// #     fn on_key(&mut self, _key: Key) -> Action { Action::Quit }
/// #     fn frame(&self) -> Frame<'_> { unimplemented!() }
/// # }
///
/// let mut event_loop = EventLoop::stdio();
/// event_loop.run(&mut MyApp)?;
/// # Ok::<(), tilde_term::error::TermError>(())
/// ```
#[derive(Debug)]
pub struct EventLoop<R, W> {
    keys: KeyReader<R>,
    output: W,
}

impl EventLoop<crate::reader::RawStdin, crate::output::RawStdout> {
    /// Event loop over the process's stdin and stdout.
    #[must_use]
    pub const fn stdio() -> Self {
        Self::new(crate::reader::RawStdin, crate::output::RawStdout)
    }
}

impl<R: Read, W: Write> EventLoop<R, W> {
    /// Create an event loop over arbitrary streams.
    pub const fn new(input: R, output: W) -> Self {
        Self {
            keys: KeyReader::new(input),
            output,
        }
    }

    /// The output stream (for inspecting what was drawn).
    #[inline]
    #[must_use]
    pub const fn output(&self) -> &W {
        &self.output
    }

    /// Run until the application returns [`Action::Quit`].
    ///
    /// On quit the screen is cleared and the cursor homed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Write`] if a frame can't be written and
    /// [`TermError::Read`] if the input fails. Either is fatal; the caller
    /// should restore the terminal and exit.
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        let mut frames: u64 = 0;
        loop {
            render::render(&app.frame(), &mut self.output)?;
            frames += 1;

            if let Some(key) = self.keys.read_key()? {
                if app.on_key(key) == Action::Quit {
                    debug!(frames, "quit requested");
                    return terminal::clear_for_exit(&mut self.output).map_err(TermError::Write);
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
