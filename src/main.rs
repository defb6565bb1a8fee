// SPDX-License-Identifier: MIT
//
// tilde — a minimal visual text editor.
//
// This is the main binary that wires the two crates together:
//
//   tilde-term   → raw mode, geometry, key decoding, frame rendering, event loop
//   tilde-editor → cursor motions, key dispatch, the document on screen
//
// Startup runs in a fixed order. The document is read first, so a bad path
// fails before the screen is touched. Raw mode goes on next: the geometry
// probe's cursor report can only be read byte by byte once canonical mode
// is off. Then the event loop runs until Ctrl-Q.
//
// Shutdown is the `Terminal` guard's job. On a normal quit `finish` puts
// cooked mode back and hands any failure up to `main`, which reports it
// once. On an early `?` the guard drops on the way out and restores before
// `main` prints anything to stderr.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tilde_editor::Editor;
use tilde_term::TermError;
use tilde_term::event_loop::EventLoop;
use tilde_term::geometry;
use tilde_term::output::RawStdout;
use tilde_term::terminal::{self, RawModeConfig, Terminal};
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;

// ─── CLI ─────────────────────────────────────────────────────────────────────

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "tilde", version, about = "A minimal visual text editor")]
struct Args {
    /// Text file to show (read-only). Without one, an empty document.
    path: Option<PathBuf>,

    /// Read timeout in deciseconds. Also how long a lone ESC waits before
    /// it counts as the Escape key.
    #[arg(
        long = "read-timeout",
        value_name = "DECISECONDS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..)
    )]
    read_timeout: u8,

    /// Append diagnostics to FILE. Nothing is logged without it.
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Most verbose level written to the log.
    #[arg(long = "log-level", value_name = "LEVEL", default_value_t = Level::INFO)]
    log_level: Level,
}

impl Args {
    const fn raw_mode(&self) -> RawModeConfig {
        RawModeConfig {
            read_timeout_ds: self.read_timeout,
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Term(#[from] TermError),

    #[error("can't open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("not a usable log file path: {}", .0.display())]
    LogPath(PathBuf),

    #[error("stdin is not a terminal")]
    NotATty,
}

impl Error {
    /// Whether the error happened after the screen was taken over.
    const fn touched_screen(&self) -> bool {
        matches!(self, Self::Term(_))
    }
}

// ─── Startup ─────────────────────────────────────────────────────────────────

/// Install a file-backed subscriber if `--log` was given.
///
/// The returned guard flushes the background writer when dropped and must
/// outlive every event.
fn init_logging(path: Option<&Path>, level: Level) -> Result<Option<WorkerGuard>, Error> {
    let Some(path) = path else {
        return Ok(None);
    };
    let Some(file_name) = path.file_name() else {
        return Err(Error::LogPath(path.to_path_buf()));
    };
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Stdout and stderr belong to the screen; the log goes to the file only.
    if tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_max_level(level)
        .try_init()
        .is_err()
    {
        return Ok(None);
    }
    Ok(Some(guard))
}

/// Read a document as lines. Invalid UTF-8 is replaced, `\r\n` endings
/// are accepted.
fn load_lines(path: &Path) -> Result<Vec<String>, Error> {
    let bytes = fs::read(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_owned)
        .collect())
}

fn run(args: &Args) -> Result<(), Error> {
    let lines = match &args.path {
        Some(path) => load_lines(path)?,
        None => Vec::new(),
    };

    if !terminal::is_tty() {
        return Err(Error::NotATty);
    }

    let mut term = Terminal::stdin(args.raw_mode());
    term.enter()?;

    let size = geometry::resolve_stdio()?;
    info!(rows = size.rows, cols = size.cols, lines = lines.len(), "editor started");

    let mut editor = Editor::with_lines(size, lines);
    EventLoop::stdio().run(&mut editor)?;

    term.finish()?;
    info!("editor exited");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match init_logging(args.log.as_deref(), args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("tilde: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "fatal");
            if err.touched_screen() {
                let _ = terminal::clear_for_exit(&mut RawStdout);
            }
            eprintln!("tilde: {err}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("tilde").chain(argv.iter().copied()))
    }

    /// A file in the system temp dir, removed on drop.
    struct TempFile(PathBuf);

    impl TempFile {
        fn new(name: &str, contents: &[u8]) -> Self {
            let path = std::env::temp_dir().join(format!("tilde-{}-{name}", std::process::id()));
            fs::write(&path, contents).unwrap();
            Self(path)
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    // ── CLI ─────────────────────────────────────────────────────────

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = parse(&[]).unwrap();
        assert!(args.path.is_none());
        assert!(args.log.is_none());
        assert_eq!(args.log_level, Level::INFO);
        assert_eq!(args.raw_mode(), RawModeConfig::default());
    }

    #[test]
    fn all_options() {
        let args = parse(&[
            "notes.txt",
            "--read-timeout",
            "3",
            "--log",
            "/tmp/tilde.log",
            "--log-level",
            "trace",
        ])
        .unwrap();
        assert_eq!(args.path.as_deref(), Some(Path::new("notes.txt")));
        assert_eq!(args.raw_mode().read_timeout_ds, 3);
        assert_eq!(args.log.as_deref(), Some(Path::new("/tmp/tilde.log")));
        assert_eq!(args.log_level, Level::TRACE);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(parse(&["--read-timeout", "0"]).is_err());
    }

    #[test]
    fn oversized_timeout_is_rejected() {
        assert!(parse(&["--read-timeout", "256"]).is_err());
    }

    #[test]
    fn bad_log_level_is_rejected() {
        assert!(parse(&["--log-level", "loud"]).is_err());
    }

    // ── Documents ───────────────────────────────────────────────────

    #[test]
    fn load_splits_lines() {
        let file = TempFile::new("split", b"one\ntwo\r\nthree\n");
        assert_eq!(load_lines(&file.0).unwrap(), ["one", "two", "three"]);
    }

    #[test]
    fn load_empty_file() {
        let file = TempFile::new("empty", b"");
        assert!(load_lines(&file.0).unwrap().is_empty());
    }

    #[test]
    fn load_replaces_invalid_utf8() {
        let file = TempFile::new("lossy", b"ok\xff\n");
        assert_eq!(load_lines(&file.0).unwrap(), ["ok\u{fffd}"]);
    }

    #[test]
    fn load_missing_file_names_path() {
        let path = std::env::temp_dir().join("tilde-definitely-missing.txt");
        let err = load_lines(&path).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
        assert!(err.to_string().contains("tilde-definitely-missing.txt"));
        assert!(!err.touched_screen());
    }

    // ── Errors ──────────────────────────────────────────────────────

    #[test]
    fn term_errors_pass_through() {
        let err = Error::from(TermError::EmptyScreen { rows: 0, cols: 0 });
        assert!(err.touched_screen());
        assert_eq!(err.to_string(), TermError::EmptyScreen { rows: 0, cols: 0 }.to_string());
    }

    #[test]
    fn not_a_tty_message() {
        assert_eq!(Error::NotATty.to_string(), "stdin is not a terminal");
        assert!(!Error::NotATty.touched_screen());
    }

    #[test]
    fn log_path_without_file_name() {
        let err = init_logging(Some(Path::new("/")), Level::INFO).unwrap_err();
        assert!(matches!(err, Error::LogPath(_)));
    }

    #[test]
    fn no_log_flag_installs_nothing() {
        assert!(init_logging(None, Level::INFO).unwrap().is_none());
    }
}
