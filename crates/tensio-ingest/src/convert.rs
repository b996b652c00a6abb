//! Source normalization — uploaded file to canonical delimited CSV.
//!
//! A CSV upload is copied byte-for-byte; a spreadsheet upload has its first
//! (active) worksheet converted, other sheets ignored. Conversion always
//! lands in the destination the caller names — the pipeline stages it next
//! to the canonical location so nothing is overwritten before archival has
//! run.

use std::{fs, path::Path};

use calamine::{Data, Reader as _};

use crate::{Error, Result};

/// Declared type of an uploaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
  /// Already in the canonical delimited format.
  Csv,
  /// An Excel-style workbook (`.xlsx`, `.xls`, `.ods`).
  Spreadsheet,
}

impl DatasetKind {
  /// Guess the kind from a file extension; unknown extensions are treated
  /// as delimited text.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some(ext) if ext.eq_ignore_ascii_case("xlsx")
        || ext.eq_ignore_ascii_case("xls")
        || ext.eq_ignore_ascii_case("ods") => Self::Spreadsheet,
      _ => Self::Csv,
    }
  }
}

/// Normalize `source` into a delimited dataset at `dest`.
///
/// Fails with [`Error::FileNotFound`] if `source` does not exist and
/// [`Error::ConversionError`] if a workbook is malformed; in both cases
/// `dest` is left untouched.
pub fn normalize_to(source: &Path, kind: DatasetKind, dest: &Path) -> Result<()> {
  if !source.exists() {
    return Err(Error::FileNotFound(source.to_path_buf()));
  }

  match kind {
    DatasetKind::Csv => {
      fs::copy(source, dest)?;
    }
    DatasetKind::Spreadsheet => {
      spreadsheet_to_csv(source, dest)?;
    }
  }
  Ok(())
}

/// Convert the first worksheet of a workbook to CSV.
fn spreadsheet_to_csv(source: &Path, dest: &Path) -> Result<()> {
  let conversion_err = |reason: String| Error::ConversionError {
    path:   source.to_path_buf(),
    reason,
  };

  let mut workbook =
    calamine::open_workbook_auto(source).map_err(|e| conversion_err(e.to_string()))?;

  let range = workbook
    .worksheet_range_at(0)
    .ok_or_else(|| conversion_err("workbook has no worksheets".into()))?
    .map_err(|e| conversion_err(e.to_string()))?;

  let mut writer = csv::Writer::from_path(dest)?;
  for row in range.rows() {
    let cells: Vec<String> = row.iter().map(cell_to_string).collect();
    writer.write_record(&cells)?;
  }
  writer.flush()?;
  Ok(())
}

fn cell_to_string(cell: &Data) -> String {
  match cell {
    Data::Empty => String::new(),
    // Display collapses integral floats ("2024" rather than "2024.0").
    other => other.to_string(),
  }
}
