//! # tool-locate
//!
//! Find an external executable on the search path before spawning it, so a
//! missing `pdftk` or `node` is reported up front instead of surfacing as an
//! opaque spawn failure halfway through a run.
//!
//! ## How it works
//!
//! On each call to [`locate`]:
//!
//! 1. A program containing a path separator (`./bin/pdftk`, `/usr/bin/node`)
//!    is checked in place; the search path is not consulted.
//! 2. Otherwise every directory of `PATH` is searched in order, and the first
//!    candidate that is an executable regular file wins.
//! 3. On Windows each lookup also tries the `PATHEXT` extensions
//!    (`.EXE`, `.CMD`, …).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tool_locate::{is_available, locate};
//!
//! if !is_available("pdftk") {
//!     eprintln!("install pdftk first");
//! }
//! let node = locate("node").expect("node on PATH");
//! println!("using {}", node.display());
//! ```

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by executable lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// The program name was empty.
    #[error("Empty program name")]
    EmptyName,

    /// `PATH` is unset or empty, so bare program names cannot be resolved.
    #[error("PATH is not set; cannot search for '{program}'")]
    NoSearchPath { program: String },

    /// No directory of the search path holds the program.
    #[error("'{program}' not found in {searched} search-path entries")]
    NotFound { program: String, searched: usize },

    /// The path exists but is a directory or lacks execute permission.
    #[error("'{}' exists but is not an executable file", path.display())]
    NotExecutable { path: PathBuf },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

/// Extensions tried after the bare name. Empty on Unix.
fn executable_extensions() -> Vec<OsString> {
    if cfg!(windows) {
        let raw = std::env::var_os("PATHEXT")
            .unwrap_or_else(|| OsString::from(".COM;.EXE;.BAT;.CMD"));
        raw.to_string_lossy()
            .split(';')
            .filter(|e| !e.is_empty())
            .map(OsString::from)
            .collect()
    } else {
        Vec::new()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn has_separator(program: &str) -> bool {
    program.contains('/') || (cfg!(windows) && program.contains('\\'))
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolves `program` against the process `PATH`.
pub fn locate(program: &str) -> Result<PathBuf, LocateError> {
    let search_path = std::env::var_os("PATH").unwrap_or_default();
    locate_in(program, &search_path)
}

/// Resolves `program` against an explicit search path (same syntax as `PATH`).
///
/// Does not read the environment except for `PATHEXT` on Windows.
pub fn locate_in(program: &str, search_path: &OsStr) -> Result<PathBuf, LocateError> {
    if program.trim().is_empty() {
        return Err(LocateError::EmptyName);
    }

    if has_separator(program) {
        let path = PathBuf::from(program);
        return executable_at(&path).ok_or(LocateError::NotExecutable { path });
    }

    if search_path.is_empty() {
        return Err(LocateError::NoSearchPath {
            program: program.to_string(),
        });
    }

    let mut searched = 0;
    for dir in std::env::split_paths(search_path) {
        searched += 1;
        // An empty PATH entry means the current directory.
        let dir = if dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dir
        };
        if let Some(found) = executable_at(&dir.join(program)) {
            return Ok(found);
        }
    }

    Err(LocateError::NotFound {
        program: program.to_string(),
        searched,
    })
}

/// Returns `true` when [`locate`] would succeed.
pub fn is_available(program: &str) -> bool {
    locate(program).is_ok()
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn executable_at(candidate: &Path) -> Option<PathBuf> {
    if is_executable(candidate) {
        return Some(candidate.to_path_buf());
    }
    for ext in executable_extensions() {
        let mut name = candidate.as_os_str().to_os_string();
        name.push(&ext);
        let with_ext = PathBuf::from(name);
        if is_executable(&with_ext) {
            return Some(with_ext);
        }
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
