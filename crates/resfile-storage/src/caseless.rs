//! Case-insensitive path fallback
//!
//! Container files shipped for case-insensitive filesystems are often
//! referenced with the wrong letter case. When a direct open fails, the
//! path is rebuilt component by component from real directory listings,
//! matching names ASCII-case-insensitively. On platforms whose filesystem is
//! already case-insensitive this degrades to a plain existence check.

use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// What kind of filesystem entry a resolved path must name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WantKind {
    /// Must be a regular file (or anything that is not a directory)
    File,
    /// Must be a directory
    Directory,
    /// Either
    Any,
}

impl WantKind {
    const fn accepts(self, is_dir: bool) -> bool {
        match self {
            Self::File => !is_dir,
            Self::Directory => is_dir,
            Self::Any => true,
        }
    }
}

/// Find an existing path that differs from `path` only in letter case.
///
/// A path ending in a separator must name a directory; asking for
/// [`WantKind::File`] with such a path always fails. Returns `None` when no
/// matching entry exists, never a partially resolved path.
pub fn caseless_path(path: &Path, want: WantKind) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }

    let trailing_separator = ends_with_separator(path);
    let want = if trailing_separator {
        if want == WantKind::File {
            return None;
        }
        WantKind::Directory
    } else {
        want
    };

    // Cheap check first, the case may already be right
    if let Ok(meta) = fs::metadata(path) {
        return want.accepts(meta.is_dir()).then(|| path.to_path_buf());
    }

    let mut resolved = resolve_components(path)?;
    let meta = fs::metadata(&resolved).ok()?;
    if !want.accepts(meta.is_dir()) {
        return None;
    }
    if trailing_separator {
        resolved.push("");
    }
    Some(resolved)
}

/// Open `path`, retrying once through [`caseless_path`] if the direct open fails.
///
/// Returns the file together with the path that was actually opened.
///
/// # Errors
///
/// Returns the error of the direct open when no case variant exists, or the
/// error of the retried open otherwise.
pub fn open_caseless(path: &Path, options: &OpenOptions) -> io::Result<(File, PathBuf)> {
    match options.open(path) {
        Ok(file) => Ok((file, path.to_path_buf())),
        Err(err) => match caseless_path(path, WantKind::File) {
            Some(fixed) if fixed != path => {
                debug!("Retrying {} as {}", path.display(), fixed.display());
                options.open(&fixed).map(|file| (file, fixed))
            }
            _ => Err(err),
        },
    }
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .as_encoded_bytes()
        .last()
        .is_some_and(|&b| std::path::is_separator(char::from(b)))
}

#[cfg(unix)]
fn resolve_components(path: &Path) -> Option<PathBuf> {
    let mut resolved = PathBuf::new();
    for (index, component) in path.components().enumerate() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            // Only a leading "./" is kept, interior ones are noise
            Component::CurDir if index == 0 => resolved.push("."),
            Component::CurDir => {}
            Component::ParentDir => resolved.push(".."),
            Component::Normal(name) => {
                let dir = if resolved.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    resolved.as_path()
                };
                let matched = find_entry(dir, name)?;
                resolved.push(matched);
            }
        }
    }
    Some(resolved)
}

#[cfg(not(unix))]
fn resolve_components(_path: &Path) -> Option<PathBuf> {
    None
}

/// First entry of `dir` whose name equals `name` ignoring ASCII case
#[cfg(unix)]
fn find_entry(dir: &Path, name: &OsStr) -> Option<std::ffi::OsString> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.file_name())
        .find(|candidate| candidate.eq_ignore_ascii_case(name))
}
