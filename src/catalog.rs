// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only catalog projections for the presentation layer.
//!
//! Pure functions over repository data; nothing here mutates the store.

use std::collections::BTreeMap;

use crate::models::{KitRow, User};

/// Garment size rank. Anything not listed sorts after these, then
/// alphabetically.
pub const SIZE_ORDER: [&str; 8] = ["PP", "P", "M", "G", "GG", "XG", "XXG", "XXL"];

/// Default role set used when no user row carries a class yet.
const DEFAULT_CLASSES: [(&str, &str); 4] = [
    ("Administrator", "0001"),
    ("Manager", "0002"),
    ("Warehouse", "0003"),
    ("HR", "0004"),
];

/// One kit in the catalog: its id and, per item, the sizes on offer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KitCatalogEntry {
    pub kit_id: String,
    pub items: BTreeMap<String, Vec<String>>,
}

fn size_key(size: &str) -> (usize, String) {
    let rank = SIZE_ORDER
        .iter()
        .position(|known| *known == size)
        .unwrap_or(SIZE_ORDER.len());
    (rank, size.to_string())
}

/// Build the kit catalog from kit definition rows.
///
/// Returns the catalog keyed by kit name plus the kit names sorted
/// case-insensitively. Sizes per item are deduplicated and sorted by
/// [`SIZE_ORDER`].
pub fn build_kit_catalog(rows: &[KitRow]) -> (BTreeMap<String, KitCatalogEntry>, Vec<String>) {
    let mut catalog: BTreeMap<String, KitCatalogEntry> = BTreeMap::new();

    for row in rows {
        let kit_name = row.kit_name.trim();
        if kit_name.is_empty() {
            continue;
        }
        let entry = catalog.entry(kit_name.to_string()).or_default();

        let kit_id = row.kit_id.as_deref().unwrap_or("").trim();
        if entry.kit_id.is_empty() && !kit_id.is_empty() {
            entry.kit_id = kit_id.to_string();
        }

        let item_name = row.item_name.trim();
        if item_name.is_empty() {
            continue;
        }
        let sizes = entry.items.entry(item_name.to_string()).or_default();
        if let Some(size) = row.size.as_deref().map(str::trim) {
            if !size.is_empty() && !sizes.iter().any(|known| known == size) {
                sizes.push(size.to_string());
            }
        }
    }

    for entry in catalog.values_mut() {
        for sizes in entry.items.values_mut() {
            sizes.sort_by_key(|size| size_key(size));
        }
    }

    let mut names: Vec<String> = catalog.keys().cloned().collect();
    names.sort_by_key(|name| name.to_lowercase());
    (catalog, names)
}

/// Learn the `class_name -> class_id` mapping from existing users,
/// falling back to the fixed default role set when none carries one.
pub fn build_class_map(users: &[User]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for user in users {
        let name = user.class_name.as_deref().unwrap_or("").trim();
        let id = user.class_id.as_deref().unwrap_or("").trim();
        if !name.is_empty() && !id.is_empty() && !map.contains_key(name) {
            map.insert(name.to_string(), id.to_string());
        }
    }

    if map.is_empty() {
        for (name, id) in DEFAULT_CLASSES {
            map.insert(name.to_string(), id.to_string());
        }
    }
    map
}
