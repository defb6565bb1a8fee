// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Key reader — timed reads from stdin, decoded into keys.
//
// Raw mode is configured with VMIN=0 / VTIME=n, so `read()` on stdin
// returns after at most n deciseconds, possibly with zero bytes. That turns
// a blocking read into a cooperative poll: the single-threaded main loop
// gets control back at a bounded interval whether or not a key arrived.
//
// `RawStdin` reads the file descriptor directly rather than through
// `io::stdin()`, whose internal buffer would swallow bytes the geometry
// probe and the key reader both need to see.

use std::io::{self, Read};

use crate::error::{Result, TermError};
use crate::input::{Decoder, Key};

// ─── RawStdin ────────────────────────────────────────────────────────────────

/// Unbuffered reader over file descriptor 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawStdin;

impl Read for RawStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }
}

// ─── KeyReader ───────────────────────────────────────────────────────────────

/// Reads one key at a time from a timed input source.
///
/// Pairs an input stream with a [`Decoder`]. Each [`read_key`](Self::read_key)
/// performs at most one idle wait: if the source yields nothing and no
/// sequence is in progress, it returns `Ok(None)` so the caller can redraw.
///
/// # Example
///
/// ```
/// use tilde_term::input::Key;
/// use tilde_term::reader::KeyReader;
///
/// let mut reader = KeyReader::new(&b"\x1b[Aq"[..]);
/// assert_eq!(reader.read_key()?, Some(Key::ArrowUp));
/// assert_eq!(reader.read_key()?, Some(Key::Byte(b'q')));
/// assert_eq!(reader.read_key()?, None);
/// # Ok::<(), tilde_term::error::TermError>(())
/// ```
#[derive(Debug)]
pub struct KeyReader<R> {
    input: R,
    decoder: Decoder,
}

impl KeyReader<RawStdin> {
    /// Key reader over the process's stdin.
    #[must_use]
    pub const fn stdin() -> Self {
        Self::new(RawStdin)
    }
}

impl<R: Read> KeyReader<R> {
    /// Wrap an input source.
    pub const fn new(input: R) -> Self {
        Self {
            input,
            decoder: Decoder::new(),
        }
    }

    /// The decoder (for inspecting pending state).
    #[inline]
    #[must_use]
    pub const fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Read until one key is decoded or the input goes quiet.
    ///
    /// Returns `Ok(None)` when a read times out with nothing pending. A
    /// timeout in the middle of an escape sequence yields `Key::Escape`
    /// rather than blocking or dropping the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Read`] if the underlying read fails with
    /// anything other than `WouldBlock` or `Interrupted`.
    pub fn read_key(&mut self) -> Result<Option<Key>> {
        loop {
            match self.read_byte()? {
                Some(byte) => {
                    if let Some(key) = self.decoder.feed(byte) {
                        return Ok(Some(key));
                    }
                }
                None => return Ok(self.decoder.timeout()),
            }
        }
    }

    /// One byte, or `None` if the read timed out.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(TermError::Read(e)),
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
