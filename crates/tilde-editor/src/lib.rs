//! # tilde-editor — Editor layer for tilde
//!
//! Sits on top of `tilde-term` and decides what the keys mean:
//!
//! - **[`cursor`]** — `Motion`: arrow/Home/End/Page keys as clamped cursor moves
//! - **[`editor`]** — `Editor`: screen size, cursor, document lines, key dispatch
//!
//! The document is read-only; there is no insertion, deletion, or saving.

pub mod cursor;
pub mod editor;

pub use editor::{Editor, QUIT};
pub use tilde_term::event_loop::Action;
