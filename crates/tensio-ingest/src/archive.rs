//! Archival of the canonical dataset before replacement.
//!
//! The prior input is never silently lost: the existing file is renamed into
//! the archive directory with a timestamp suffix. Nothing is ever deleted.

use std::{
  fs,
  path::{Path, PathBuf},
};

use chrono::Local;

use crate::Result;

/// Move the canonical dataset aside, if one exists.
///
/// Returns the archive path, or `None` on a first run where there is
/// nothing to preserve. The archive directory is created on demand. A
/// same-second collision gets a `_N` counter suffix rather than
/// overwriting the earlier archive.
pub fn archive_existing(canonical: &Path, archive_dir: &Path) -> Result<Option<PathBuf>> {
  if !canonical.exists() {
    return Ok(None);
  }

  fs::create_dir_all(archive_dir)?;

  let stem = canonical
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "dataset".to_string());
  let ext = canonical
    .extension()
    .map(|e| format!(".{}", e.to_string_lossy()))
    .unwrap_or_default();
  let stamp = Local::now().format("%Y%m%d_%H%M%S");

  let mut dest = archive_dir.join(format!("{stem}_{stamp}{ext}"));
  let mut counter = 1u32;
  while dest.exists() {
    dest = archive_dir.join(format!("{stem}_{stamp}_{counter}{ext}"));
    counter += 1;
  }

  fs::rename(canonical, &dest)?;
  tracing::info!(archived = %dest.display(), "previous canonical dataset archived");
  Ok(Some(dest))
}
