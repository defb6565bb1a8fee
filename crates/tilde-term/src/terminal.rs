// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode and RAII restore.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), isatty, and raw fd writes. These are the standard POSIX
// interfaces for terminal control — there is no safe alternative. Each
// unsafe block is minimal.
#![allow(unsafe_code)]
//
// `Terminal` owns the device's raw state. `enter` captures the original
// attributes (once per handle) and applies raw mode; `leave` puts the
// originals back. Drop calls `leave`, so every exit path that unwinds the
// stack — normal return, `?` on a fatal error, an explicit quit — restores
// the terminal without a registered global callback.
//
// Panics are the one path that may not run Drop cleanly (panic=abort, or a
// panic while stdout is locked), so `enter` on the real device also
// installs a panic hook and refreshes a global backup of the originals. The
// hook writes a pre-built reset sequence straight to fd 1 and re-applies
// the backup, then hands over to the previous hook so the message lands on
// a sane screen.
//
// A restore that fails in Drop has nobody to return an error to, so the
// device reports it. `finish` is the explicit alternative: the caller gets
// the error and Drop stays quiet.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use tracing::{debug, error};

use crate::ansi;
use crate::error::{Result, TermError};
use crate::output::RawStdout;

/// Terminal attributes as the OS stores them.
pub type Attributes = libc::termios;

// ─── Configuration ──────────────────────────────────────────────────────────

/// Raw mode read policy.
///
/// Reads use VMIN=0 / VTIME=`read_timeout_ds`: a `read()` returns as soon
/// as one byte is available, or with zero bytes after the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawModeConfig {
    /// Read timeout in deciseconds (VTIME). Default: 1 (≈100 ms).
    pub read_timeout_ds: u8,
}

impl Default for RawModeConfig {
    fn default() -> Self {
        Self { read_timeout_ds: 1 }
    }
}

/// Derive raw-mode attributes from `original`.
///
/// Input: no CR→NL translation, no XON/XOFF, no parity check, no 8th-bit
/// strip, BREAK doesn't raise SIGINT. Local: no echo, no canonical line
/// editing, no signals from ^C/^Z. Output: no post-processing (we send
/// `\r\n` ourselves). Control: 8-bit characters.
#[must_use]
pub fn raw_attributes(original: &Attributes, config: RawModeConfig) -> Attributes {
    let mut raw = *original;
    raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
    raw.c_oflag &= !libc::OPOST;
    raw.c_cflag |= libc::CS8;
    raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::ISIG);
    raw.c_cc[libc::VMIN] = 0;
    raw.c_cc[libc::VTIME] = config.read_timeout_ds;
    raw
}

// ─── Device ─────────────────────────────────────────────────────────────────

/// A terminal device whose attributes can be read and written.
///
/// Implemented by [`Stdin`] for the real TTY; tests substitute an
/// in-memory device.
pub trait Device {
    /// Read the device's current attributes.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the attributes can't be read.
    fn get_attributes(&self) -> io::Result<Attributes>;

    /// Apply attributes, flushing pending input first.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the attributes can't be applied.
    fn set_attributes(&mut self, attrs: &Attributes) -> io::Result<()>;

    /// Called each time raw mode is about to be applied, with the
    /// attributes a restore will put back.
    fn arming(&mut self, _original: &Attributes) {}

    /// Called once the original attributes have been restored.
    fn restored(&mut self) {}

    /// Called when a dropped [`Terminal`] couldn't restore the original
    /// attributes. The default clears the screen and reports on stderr.
    fn restore_failed(&mut self, err: &TermError) {
        let _ = report_restore_failure(&mut RawStdout, &mut io::stderr(), err);
    }
}

/// The process's controlling terminal, via file descriptor 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stdin;

impl Device for Stdin {
    fn get_attributes(&self) -> io::Result<Attributes> {
        let mut termios: Attributes = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(termios)
    }

    fn set_attributes(&mut self, attrs: &Attributes) -> io::Result<()> {
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, attrs) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn arming(&mut self, original: &Attributes) {
        install_panic_hook();
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(*original);
        }
    }

    fn restored(&mut self) {
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
    }
}

/// Check whether stdin is connected to a terminal (TTY).
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of the original termios for the panic hook.
///
/// The [`Terminal`] owns its own copy, but the panic hook can't reach it.
static TERMIOS_BACKUP: Mutex<Option<Attributes>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original);
            }
        }
    }
}

/// Reset sequence for emergencies: show cursor, clear screen, home cursor.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[?25h\x1b[2J\x1b[H";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            restore_termios_from_backup();
            original(info);
        }));
    });
}

/// Write [`EMERGENCY_RESTORE`] directly to stdout's file descriptor,
/// bypassing Rust's stdout lock.
fn emergency_restore() {
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }
}

/// Clear the screen and home the cursor, so a diagnostic printed next
/// starts at the top of a clean screen.
///
/// # Errors
///
/// Returns an error if writing to `w` fails.
pub fn clear_for_exit(w: &mut impl Write) -> io::Result<()> {
    let mut seq = Vec::with_capacity(8);
    ansi::clear_screen(&mut seq)?;
    ansi::cursor_home(&mut seq)?;
    w.write_all(&seq)?;
    w.flush()
}

/// Clear `screen`, then write `tilde: <err>` to `diagnostics`.
///
/// The line ends in `\r\n`: output post-processing may still be off.
///
/// # Errors
///
/// Returns an error if either write fails.
pub fn report_restore_failure(
    screen: &mut impl Write,
    diagnostics: &mut impl Write,
    err: &TermError,
) -> io::Result<()> {
    clear_for_exit(screen)?;
    write!(diagnostics, "tilde: {err}\r\n")?;
    diagnostics.flush()
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Terminal handle with RAII restore.
///
/// # Example
///
/// ```no_run
/// use tilde_term::terminal::{RawModeConfig, Terminal};
///
/// let mut term = Terminal::stdin(RawModeConfig::default());
/// term.enter()?;
/// // ... render frames, read keys ...
/// // Cooked mode is restored automatically on drop.
/// # Ok::<(), tilde_term::error::TermError>(())
/// ```
pub struct Terminal<D: Device = Stdin> {
    device: D,

    /// Attributes captured by the first successful [`enter`](Self::enter).
    original: Option<Attributes>,

    config: RawModeConfig,

    /// Whether raw mode is currently applied.
    active: bool,
}

impl Terminal<Stdin> {
    /// Handle on the process's controlling terminal.
    #[must_use]
    pub const fn stdin(config: RawModeConfig) -> Self {
        Self::new(Stdin, config)
    }
}

impl<D: Device> Terminal<D> {
    /// Wrap a device. Does **not** enter raw mode.
    pub const fn new(device: D, config: RawModeConfig) -> Self {
        Self {
            device,
            original: None,
            config,
            active: false,
        }
    }

    /// Whether raw mode is currently applied.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// The attributes captured before raw mode was first applied.
    #[inline]
    #[must_use]
    pub const fn original(&self) -> Option<&Attributes> {
        self.original.as_ref()
    }

    /// The underlying device.
    #[inline]
    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Enter raw mode.
    ///
    /// The original attributes are captured on the first call only, so
    /// re-entering after a [`leave`](Self::leave) can never overwrite them
    /// with raw ones. Calling `enter` while already active is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::GetAttributes`] if the original attributes
    /// can't be read, [`TermError::SetAttributes`] if raw mode can't be
    /// applied.
    pub fn enter(&mut self) -> Result<()> {
        if self.active {
            return Ok(());
        }

        let original = match self.original {
            Some(original) => original,
            None => {
                let original = self
                    .device
                    .get_attributes()
                    .map_err(TermError::GetAttributes)?;
                self.original = Some(original);
                original
            }
        };
        self.device.arming(&original);

        let raw = raw_attributes(&original, self.config);
        self.device
            .set_attributes(&raw)
            .map_err(TermError::SetAttributes)?;

        self.active = true;
        debug!(read_timeout_ds = self.config.read_timeout_ds, "entered raw mode");
        Ok(())
    }

    /// Restore the original attributes.
    ///
    /// Idempotent: calling `leave` while inactive is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::SetAttributes`] if the originals can't be
    /// re-applied. The handle stays active so a later call (or Drop) can
    /// retry.
    pub fn leave(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        if let Some(original) = self.original {
            self.device
                .set_attributes(&original)
                .map_err(TermError::SetAttributes)?;
            self.device.restored();
        }

        self.active = false;
        debug!("restored original terminal mode");
        Ok(())
    }

    /// Leave raw mode for good.
    ///
    /// Unlike dropping the handle, a failure here is returned rather than
    /// reported, and Drop neither retries nor reports it again.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::SetAttributes`] if the originals can't be
    /// re-applied.
    pub fn finish(mut self) -> Result<()> {
        let result = self.leave();
        self.active = false;
        result
    }
}

impl<D: Device> Drop for Terminal<D> {
    fn drop(&mut self) {
        if let Err(err) = self.leave() {
            // The terminal may be half-configured: clear what we can and
            // say why.
            error!(%err, "failed to restore terminal mode");
            self.device.restore_failed(&err);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
