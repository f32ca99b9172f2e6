// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Core error taxonomy.
//!
//! Validation failures (insufficient stock, dangling references) are raised
//! before any write reaches the store. Store I/O failures are fatal for the
//! operation that hit them. A missing key on update/remove is NOT an error:
//! those operations return an empty [`crate::models::Mutation`] which
//! callers treat as a no-op.

/// Errors surfaced by the storage core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("encryption error: {0}")]
    Crypto(String),

    /// The backup blob exists but cannot be decrypted. Raised loudly so a
    /// tampered or corrupt store never reads back as empty data.
    #[error("corrupt backup blob: {0}")]
    CorruptBackup(String),

    /// A kit assignment could not be covered by the current stock.
    #[error("insufficient stock for kit {kit_id} (shirt size {shirt_size})")]
    InsufficientStock { kit_id: String, shirt_size: String },

    /// A record references another record that does not exist.
    #[error("{entity} references unknown {reference} '{value}'")]
    MissingReference {
        entity: &'static str,
        reference: &'static str,
        value: String,
    },
}

/// Result type for storage operations.
pub type CoreResult<T> = Result<T, CoreError>;
