// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encrypted Tabular Storage
//!
//! The store is a directory of flat CSV tables (one per entity kind plus
//! the audit log) that only exists in plaintext while a logical operation
//! is in flight. Every operation is bracketed by the [`StoreVault`]
//! gateway: restore (decrypt + expand the backup blob), run, backup
//! (archive + encrypt + delete plaintext).
//!
//! ## Storage Layout
//!
//! ```text
//! data/
//!   backup.enc         # AES-256-GCM blob: nonce || ciphertext(tar.gz)
//!   .secret.key        # 32-byte symmetric key, generated on first use
//!   # transient, only while an operation runs:
//!   agencies.csv
//!   kits.csv
//!   stock.csv
//!   users.csv
//!   collaborators.csv
//!   audit_log.csv
//! ```
//!
//! ## Concurrency Model
//!
//! Single-process, single-threaded, synchronous. The per-operation
//! encrypt/decrypt cycle bounds the plaintext window but is not a locking
//! protocol: overlapping operations from multiple processes can race on
//! the plaintext files. External request serialization (one worker) is
//! required until a transactional store replaces this layout.

pub mod audit;
pub mod inventory;
pub mod paths;
pub mod repository;
pub mod table;
pub mod vault;

pub use audit::{AuditEntry, AuditLog};
pub use paths::StoragePaths;
pub use repository::{paginate, patch_from, Patch, RecordStore};
pub use vault::StoreVault;
