// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CSV table codec.
//!
//! One delimited-text file per entity kind. Column headers equal the
//! entity's field names in declared order; absent values serialize as
//! empty fields and read back as `None`. Writes are atomic (temp file +
//! rename), matching the rest of the store.

use std::fs::{self, File};
use std::path::Path;

use crate::error::CoreResult;
use crate::models::Record;

/// Decode every row of a table into typed records.
///
/// A missing file is the empty table, not an error.
pub fn read_rows<R: Record>(path: &Path) -> CoreResult<Vec<R>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Write a full table, header first, in declared column order.
pub fn write_rows<R: Record>(path: &Path, rows: &[R]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Write to temp file first, then rename for atomicity
    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(R::KIND.field_names())?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
