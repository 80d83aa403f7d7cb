//! CSV input frames and metadata files.
//!
//! - [`read_csv_frame`] loads a CSV file into a [`StringFrame`]; empty fields
//!   become absent cells.
//! - [`write_metadata_csv`] / [`read_metadata_csv`] persist a transform's
//!   `token·id` metadata table, one CSV column per encoded column.
//!
//! Compressed files (`.gz`, `.zst`) are handled transparently through
//! [`crate::io::compression`].

use crate::frame::{CellSource, StringFrame};
use crate::io::compression::{auto_detect_reader, auto_detect_writer};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::{File, create_dir_all};
use std::path::Path;

/// Read a CSV file into a column-major frame of optional strings.
///
/// With `has_headers` the first record is skipped. Rows may be ragged;
/// missing trailing fields are absent cells.
///
/// # Errors
/// Fails if the file cannot be opened or a record cannot be parsed.
pub fn read_csv_frame(path: impl AsRef<Path>, has_headers: bool) -> Result<StringFrame> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(rdr);

    let mut rows = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parse CSV record #{} in {}", i + 1, path.display()))?;
        rows.push(
            rec.iter()
                .map(|field| (!field.is_empty()).then(|| field.to_owned()))
                .collect::<Vec<_>>(),
        );
    }
    let frame = StringFrame::from_rows(rows);
    log::debug!(
        "read {} rows x {} columns from {}",
        frame.num_rows(),
        frame.num_columns(),
        path.display()
    );
    Ok(frame)
}

/// Write a metadata table without a header. Absent cells become empty fields.
///
/// Creates parent directories as needed and returns the number of rows
/// written.
///
/// # Errors
/// Fails on file-system or serialization errors.
pub fn write_metadata_csv(path: impl AsRef<Path>, meta: &StringFrame) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let w = auto_detect_writer(f, path)
        .with_context(|| format!("setup compression for {}", path.display()))?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(w);
    for row in 0..meta.num_rows() {
        let record = (0..meta.num_columns()).map(|col| meta.cell_str(row, col).unwrap_or(""));
        wtr.write_record(record)
            .with_context(|| format!("write metadata row #{}", row + 1))?;
    }
    wtr.flush()?;
    Ok(meta.num_rows())
}

/// Read a metadata table written by [`write_metadata_csv`].
///
/// # Errors
/// See [`read_csv_frame`].
pub fn read_metadata_csv(path: impl AsRef<Path>) -> Result<StringFrame> {
    read_csv_frame(path, false)
}
