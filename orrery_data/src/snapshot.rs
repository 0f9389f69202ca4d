use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde_json::Value;

use crate::schema::{Customization, RawHolderRow};

/// Loads one holder snapshot file: a JSON array of raw rows. Rows that do not
/// match the expected shape are skipped with a warning instead of failing the
/// whole file.
pub fn load_snapshot_file(path: &Path) -> Result<Vec<RawHolderRow>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading holder snapshot {}", path.display()))?;
    let values: Vec<Value> = serde_json::from_str(&text)
        .with_context(|| format!("parsing holder snapshot {}", path.display()))?;

    let mut rows = Vec::with_capacity(values.len());
    let mut skipped = 0usize;
    for value in values {
        match serde_json::from_value::<RawHolderRow>(value) {
            Ok(row) => rows.push(row),
            Err(err) => {
                skipped += 1;
                warn!("skipping malformed holder row in {}: {err}", path.display());
            }
        }
    }
    if skipped > 0 {
        warn!(
            "{skipped} of {} rows in {} were unusable",
            skipped + rows.len(),
            path.display()
        );
    }
    Ok(rows)
}

/// Loads per-wallet customizations from a JSON array file. Entries without a
/// wallet key are dropped.
pub fn load_customizations_file(path: &Path) -> Result<Vec<Customization>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading customizations {}", path.display()))?;
    let values: Vec<Value> = serde_json::from_str(&text)
        .with_context(|| format!("parsing customizations {}", path.display()))?;

    let mut entries = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<Customization>(value) {
            Ok(entry) => {
                if let Some(entry) = entry.sanitized() {
                    entries.push(entry);
                } else {
                    warn!("dropping customization without a wallet in {}", path.display());
                }
            }
            Err(err) => {
                warn!(
                    "skipping malformed customization in {}: {err}",
                    path.display()
                );
            }
        }
    }
    Ok(entries)
}
