//! Running external programs, chiefly the Python interpreter.
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Whether the program exited successfully.
    pub success: bool,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Run a program and return its output. Fails if it exits non-zero.
pub fn run(program: &Path, args: &[&str]) -> Result<ExecResult> {
    let label = program.display().to_string();
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

/// Locate `program` on `PATH`, or accept it as given when it is a path.
#[must_use]
pub fn find_program(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

/// Locate the first available Python interpreter.
///
/// An explicit `preferred` program is used as-is when it resolves; otherwise
/// `python3` and then `python` are tried.
#[must_use]
pub fn find_python(preferred: Option<&str>) -> Option<PathBuf> {
    match preferred {
        Some(program) => find_program(program),
        None => find_program("python3").or_else(|| find_program("python")),
    }
}

/// Print one `sys.path` entry per line.
const SYS_PATH_SCRIPT: &str = "import sys\nfor p in sys.path:\n    print(p)";

/// Query `python` for its import search path.
///
/// Empty entries (the interpreter's working directory) and entries that are
/// not directories are dropped.
///
/// # Errors
///
/// Returns an error if the interpreter cannot be executed or exits non-zero.
pub fn python_sys_path(python: &Path) -> Result<Vec<PathBuf>> {
    let result = run(python, &["-c", SYS_PATH_SCRIPT])
        .with_context(|| format!("querying sys.path from {}", python.display()))?;
    Ok(result
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.is_dir())
        .collect())
}
