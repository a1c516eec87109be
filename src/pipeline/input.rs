//! Input resolution: turn a stored location or inline bytes into a readable file.
//!
//! ## Why try several roots?
//!
//! Hosts often record upload paths relative to whatever working directory the
//! writing process had. A worker started elsewhere sees the same relative
//! path pointing nowhere. Resolution therefore tries, in order: the path as
//! given, the host's canonical upload base, and each well-known subdirectory
//! under that base (first with the full relative path, then with just the
//! file name).
//!
//! ## Why a temp file for bytes?
//!
//! Some engines only open paths. Writing inline content to a
//! [`NamedTempFile`] gives them one, and the file is removed when the
//! [`Materialized`] guard drops, on every exit path including panics.

use crate::config::ExtractionConfig;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Resolve a stored location to an existing file, or `None` if no candidate exists.
pub fn resolve_path(location: &Path, config: &ExtractionConfig) -> Option<PathBuf> {
    candidates(location, config).into_iter().find(|p| p.is_file())
}

/// Every path tried by [`resolve_path`], in order.
pub fn candidates(location: &Path, config: &ExtractionConfig) -> Vec<PathBuf> {
    let mut out = vec![location.to_path_buf()];
    if location.is_absolute() {
        return out;
    }
    let Some(base) = config.storage_base.as_deref() else {
        return out;
    };
    out.push(base.join(location));
    let file_name = location.file_name().map(Path::new);
    for sub in &config.storage_subdirs {
        let dir = base.join(sub);
        out.push(dir.join(location));
        if let Some(name) = file_name {
            if name != location {
                out.push(dir.join(name));
            }
        }
    }
    out.dedup();
    out
}

/// Inline content written to a temp file for the lifetime of this guard.
pub struct Materialized {
    file: NamedTempFile,
}

impl Materialized {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Write `bytes` to a fresh temp file carrying `extension` as suffix.
pub fn materialize(bytes: &[u8], extension: &str) -> std::io::Result<Materialized> {
    let suffix = if extension.is_empty() {
        String::new()
    } else {
        format!(".{extension}")
    };
    let mut file = tempfile::Builder::new()
        .prefix("coursemind-")
        .suffix(&suffix)
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    debug!("Materialized {} bytes at {}", bytes.len(), file.path().display());
    Ok(Materialized { file })
}
