// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Inventory consistency engine.
//!
//! Keeps stock counters synchronized with the set of active kit
//! assignments. A kit assignment is never committed unless every line it
//! requires is available, and every adjustment is validate-then-apply:
//! the first pass resolves each required line to its stock row and
//! recomputes the resulting quantities, the second pass commits all
//! writes. No partial adjustment ever reaches the store.

use crate::error::{CoreError, CoreResult};
use crate::models::{KitRow, StockItem};

/// One resolved requirement line of a kit for a candidate shirt size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredLine {
    pub item_name: String,
    /// `Some` for garment lines; stock matching then requires the size.
    pub size: Option<String>,
    pub qty: u32,
}

/// Garment-type items are size-sensitive: a kit line naming one only
/// applies when its recorded size equals the candidate shirt size.
fn is_garment(item_name: &str) -> bool {
    let lower = item_name.to_lowercase();
    lower.contains("shirt") || lower.contains("camisa")
}

/// Resolve the required line items of `kit_id` for a candidate shirt size.
///
/// Garment lines count only when their recorded size equals the candidate
/// size (case-insensitive); non-garment lines count unconditionally.
pub fn resolve_kit_lines(
    kit_rows: &[KitRow],
    kit_id: &str,
    shirt_size: Option<&str>,
) -> Vec<RequiredLine> {
    let mut lines = Vec::new();
    for row in kit_rows {
        if row.kit_id.as_deref().map(str::trim) != Some(kit_id) {
            continue;
        }
        let item_name = row.item_name.trim();
        if item_name.is_empty() {
            continue;
        }

        if is_garment(item_name) {
            let row_size = row.size.as_deref().unwrap_or("").trim();
            let wanted = shirt_size.unwrap_or("").trim();
            if row_size.is_empty() || wanted.is_empty() {
                continue;
            }
            if !row_size.eq_ignore_ascii_case(wanted) {
                continue;
            }
            lines.push(RequiredLine {
                item_name: item_name.to_string(),
                size: Some(row_size.to_string()),
                qty: row.qty(),
            });
        } else {
            lines.push(RequiredLine {
                item_name: item_name.to_string(),
                size: None,
                qty: row.qty(),
            });
        }
    }
    lines
}

/// Locate the stock row backing a required line: same kit, same item name
/// (case-insensitive), and the same size when the line specifies one.
fn stock_index(stock: &[StockItem], kit_id: &str, line: &RequiredLine) -> Option<usize> {
    stock.iter().position(|item| {
        item.kit_id.as_deref().map(str::trim) == Some(kit_id)
            && item.item_name.trim().to_lowercase() == line.item_name.to_lowercase()
            && line.size.as_deref().map_or(true, |size| {
                item.size
                    .as_deref()
                    .unwrap_or("")
                    .trim()
                    .eq_ignore_ascii_case(size)
            })
    })
}

/// Plan an adjustment: resolve every line, accumulate the per-row deltas
/// and verify no quantity goes negative. Returns the planned
/// `(stock index, new quantity)` writes without committing anything.
fn plan(
    kit_rows: &[KitRow],
    stock: &[StockItem],
    kit_id: &str,
    shirt_size: Option<&str>,
    delta: i64,
) -> CoreResult<Vec<(usize, u32)>> {
    let insufficient = || CoreError::InsufficientStock {
        kit_id: kit_id.to_string(),
        shirt_size: shirt_size.unwrap_or("-").to_string(),
    };

    let lines = resolve_kit_lines(kit_rows, kit_id, shirt_size);
    if lines.is_empty() {
        // Unknown kit, or a garment-only kit with no matching size line:
        // nothing resolvable to reserve or release.
        return Err(insufficient());
    }

    let mut working: Vec<i64> = stock.iter().map(|item| i64::from(item.quantity())).collect();
    let mut touched = Vec::with_capacity(lines.len());
    for line in &lines {
        let index = stock_index(stock, kit_id, line).ok_or_else(insufficient)?;
        working[index] += delta * i64::from(line.qty);
        if working[index] < 0 {
            return Err(insufficient());
        }
        touched.push(index);
    }

    Ok(touched
        .into_iter()
        .map(|index| (index, working[index] as u32))
        .collect())
}

/// Whether every line `kit_id` requires for `shirt_size` is in stock.
///
/// A `true` here guarantees the immediately following reservation
/// ([`adjust_stock`] with `delta = -1`) does not raise.
pub fn validate_stock(
    kit_rows: &[KitRow],
    stock: &[StockItem],
    kit_id: &str,
    shirt_size: Option<&str>,
) -> bool {
    plan(kit_rows, stock, kit_id, shirt_size, -1).is_ok()
}

/// Apply `delta` (`-1` reserves, `+1` releases) times each line's required
/// quantity to the matching stock rows.
///
/// Aborts with [`CoreError::InsufficientStock`] before any write when a
/// line has no matching stock row or a resulting quantity would go
/// negative.
pub fn adjust_stock(
    kit_rows: &[KitRow],
    stock: &mut [StockItem],
    kit_id: &str,
    shirt_size: Option<&str>,
    delta: i64,
) -> CoreResult<()> {
    let writes = plan(kit_rows, stock, kit_id, shirt_size, delta)?;
    for (index, quantity) in writes {
        stock[index].set_quantity(quantity);
    }
    Ok(())
}
