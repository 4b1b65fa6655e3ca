//! Session log for the editor and the batch painter.
//!
//! One file per run, truncated on [`init`]:
//!   Windows:  `%APPDATA%\PaintCore\paintcore.log`
//!   Linux:    `~/.local/share/PaintCore/paintcore.log`
//!   macOS:    `~/Library/Application Support/PaintCore/paintcore.log`
//!
//! Use the `log_info!` / `log_warn!` / `log_err!` macros. Before [`init`]
//! they write nothing, so an embedded editor (or a test) never touches disk.
//! [`set_echo`] additionally mirrors records at or above a level to stderr,
//! which is how `--verbose` batch runs surface warnings such as a missing font.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

struct SessionLog {
    path: PathBuf,
    file: Mutex<File>,
}

static SESSION: OnceLock<SessionLog> = OnceLock::new();

/// Lowest level echoed to stderr; 0 disables echo.
static ECHO_FROM: AtomicU8 = AtomicU8::new(0);

/// Path of this run's log file, once [`init`] succeeded.
pub fn log_path() -> Option<&'static Path> {
    SESSION.get().map(|s| s.path.as_path())
}

/// Mirror records at `level` and above to stderr. `None` turns echo off.
pub fn set_echo(level: Option<Level>) {
    ECHO_FROM.store(level.map_or(0, |l| l as u8), Ordering::Relaxed);
}

fn echo_enabled(level: Level) -> bool {
    let from = ECHO_FROM.load(Ordering::Relaxed);
    from != 0 && level as u8 >= from
}

/// Record one message. Used by the logging macros.
pub fn record(level: Level, msg: &str) {
    if echo_enabled(level) {
        eprintln!("[{}] {}", level, msg);
    }
    if SESSION.get().is_some() {
        append(&format!("[{}] [{}] {}", timestamp(), level, msg));
    }
}

fn append(line: &str) {
    if let Some(session) = SESSION.get()
        && let Ok(mut file) = session.file.lock()
    {
        // A failed log write is dropped rather than surfaced.
        let _ = writeln!(file, "{}", line);
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::record($crate::logger::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::record($crate::logger::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::record($crate::logger::Level::Error, &format!($($arg)*))
    };
}

/// Open (truncating) the session log and hook panics into it.
/// Calling it again after a successful open does nothing.
pub fn init() {
    if SESSION.get().is_some() {
        return;
    }
    let path = data_dir().join("PaintCore").join("paintcore.log");
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] cannot open {}: {}", path.display(), e);
            return;
        }
    };
    if SESSION.set(SessionLog { path: path.clone(), file: Mutex::new(file) }).is_err() {
        return;
    }

    append(&format!("=== PaintCore {} session {} ===", env!("CARGO_PKG_VERSION"), unix_seconds()));
    append(&format!("Log file: {}", path.display()));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        append(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

/// HH:MM:SS (UTC).
fn timestamp() -> String {
    let secs = unix_seconds();
    format!("{:02}:{:02}:{:02}", (secs % 86400) / 3600, (secs % 3600) / 60, secs % 60)
}
