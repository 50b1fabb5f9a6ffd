//! Line rendering shared by the console and the log file, and where the log
//! file lives.
use std::borrow::Cow;
use std::path::PathBuf;

/// Target of [`Logger::stage`](super::Logger::stage) events.
pub(super) const STAGE_TARGET: &str = "molerat::stage";

/// How an event is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LineKind {
    Stage,
    Error,
    Warn,
    Info,
    Debug,
}

impl LineKind {
    pub(super) fn of(metadata: &tracing::Metadata<'_>) -> Self {
        match *metadata.level() {
            tracing::Level::ERROR => Self::Error,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::INFO if metadata.target() == STAGE_TARGET => Self::Stage,
            tracing::Level::INFO => Self::Info,
            _ => Self::Debug,
        }
    }

    const fn tag(self) -> &'static str {
        match self {
            Self::Stage => "==>",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

/// One log-file line: `2026-01-31 12:00:00 WARN  message`.
pub(super) fn file_line(kind: LineKind, timestamp: &str, msg: &str) -> String {
    format!("{timestamp} {:<5} {}", kind.tag(), escape_control(msg))
}

fn needs_escape(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}

/// Escape control characters (other than newline and tab) in `msg`.
///
/// Watched file names end up in log lines verbatim; an escape byte in a
/// name must not reach the terminal or the log file raw.
pub(super) fn escape_control(msg: &str) -> Cow<'_, str> {
    if !msg.chars().any(needs_escape) {
        return Cow::Borrowed(msg);
    }
    let mut out = String::with_capacity(msg.len() + 8);
    for c in msg.chars() {
        if needs_escape(c) {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`.
pub(super) fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Local wall-clock time, `HH:MM:SS`.
pub(super) fn clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// `<cache home>/molerat/<command>.log`, where the cache home is
/// `$XDG_CACHE_HOME` or `~/.cache`. The directory is created on demand;
/// `None` when there is no home or it cannot be created.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let cache_home = std::env::var_os("XDG_CACHE_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".cache"))
        })?;
    let dir = cache_home.join("molerat");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}
