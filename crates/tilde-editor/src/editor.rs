//! Editor state and key dispatch.
//!
//! [`Editor`] is the one piece of mutable state in the program: screen
//! size, cursor, and the document lines being shown. The main loop owns it
//! and passes it around explicitly; there is no process-wide singleton.
//! Each frame it hands the compositor a [`Frame`] borrowed from this state;
//! each decoded key goes through [`Editor::handle_key`].

use tilde_term::event_loop::{Action, App};
use tilde_term::geometry::{Position, Size};
use tilde_term::input::{Key, ctrl};
use tilde_term::render::Frame;
use tracing::trace;

use crate::cursor::Motion;

/// The key that quits the editor (Ctrl-Q).
pub const QUIT: Key = Key::Byte(ctrl(b'q'));

/// Editor state.
#[derive(Debug, Clone)]
pub struct Editor {
    size: Size,
    cursor: Position,
    lines: Vec<String>,
    welcome: String,
}

impl Editor {
    /// An empty document on a screen of `size`.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self::with_lines(size, Vec::new())
    }

    /// A document of `lines` on a screen of `size`.
    #[must_use]
    pub fn with_lines(size: Size, lines: Vec<String>) -> Self {
        Self {
            size,
            cursor: Position::ORIGIN,
            lines,
            welcome: format!("Tilde editor -- version {}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Screen size.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Cursor position on the screen.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> Position {
        self.cursor
    }

    /// Document lines.
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The banner shown on an empty document.
    #[inline]
    #[must_use]
    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    /// React to one key.
    pub fn handle_key(&mut self, key: Key) -> Action {
        if key == QUIT {
            return Action::Quit;
        }
        if let Some(motion) = Motion::from_key(key) {
            self.cursor = motion.apply(self.cursor, self.size);
            trace!(?motion, x = self.cursor.x, y = self.cursor.y, "cursor moved");
        }
        Action::Continue
    }

    /// Everything the compositor needs for the next frame.
    #[must_use]
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            size: self.size,
            cursor: self.cursor,
            lines: &self.lines,
            welcome: &self.welcome,
        }
    }
}

impl App for Editor {
    fn on_key(&mut self, key: Key) -> Action {
        self.handle_key(key)
    }

    fn frame(&self) -> Frame<'_> {
        Self::frame(self)
    }
}
