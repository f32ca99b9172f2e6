// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for record mutations.
//!
//! Every mutation appends one before/after row to the append-only log
//! file. The log is a CSV inside the data directory, so each append is
//! bracketed by the encrypted store gateway and the log rides the same
//! backup archive as the entity tables.

use std::fs::OpenOptions;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::models::{Mutation, MutationAction, Record};

use super::StoreVault;

/// Audit log columns, in declared order.
pub const AUDIT_FIELDS: [&str; 6] = ["actor", "date", "time", "action", "before", "after"];

/// One row of the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub actor: String,
    pub date: String,
    pub time: String,
    /// `CREATE`, `UPDATE` or `DELETE`.
    pub action: String,
    /// JSON snapshot of the record before the mutation; empty for CREATE.
    pub before: String,
    /// JSON snapshot after the mutation; empty for DELETE.
    pub after: String,
}

/// Append-only audit log over the encrypted store.
pub struct AuditLog<'a> {
    vault: &'a StoreVault,
}

impl<'a> AuditLog<'a> {
    pub fn new(vault: &'a StoreVault) -> Self {
        Self { vault }
    }

    /// Append one row. The header is written exactly once, on the first
    /// row ever appended.
    pub fn record(
        &self,
        actor: &str,
        action: MutationAction,
        before: Option<&str>,
        after: Option<&str>,
    ) -> CoreResult<()> {
        self.vault.with_store(|paths| {
            let path = paths.audit_log();
            let is_first_row = !path.exists();

            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            if is_first_row {
                writer.write_record(AUDIT_FIELDS)?;
            }

            let now = Utc::now();
            writer.serialize(AuditEntry {
                actor: actor.to_string(),
                date: now.format("%Y-%m-%d").to_string(),
                time: now.format("%H:%M:%S").to_string(),
                action: action.to_string(),
                before: before.unwrap_or_default().to_string(),
                after: after.unwrap_or_default().to_string(),
            })?;
            writer.flush()?;
            Ok(())
        })
    }

    /// Log a repository mutation result; a no-op mutation logs nothing.
    pub fn log_action<R: Record>(&self, actor: &str, mutation: &Mutation<R>) -> CoreResult<()> {
        let Some(action) = mutation.action() else {
            return Ok(());
        };
        let before = mutation
            .before
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let after = mutation
            .after
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.record(actor, action, before.as_deref(), after.as_deref())
    }

    /// Read back every row of the log.
    pub fn entries(&self) -> CoreResult<Vec<AuditEntry>> {
        self.vault.with_store(|paths| {
            let path = paths.audit_log();
            if !path.exists() {
                return Ok(Vec::new());
            }

            let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(&path)?;
            let mut entries = Vec::new();
            for entry in reader.deserialize() {
                entries.push(entry?);
            }
            Ok(entries)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Agency;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn vault() -> (TempDir, StoreVault) {
        let temp = TempDir::new().unwrap();
        let vault = StoreVault::new(StoragePaths::new(temp.path()));
        (temp, vault)
    }

    #[test]
    fn record_appends_rows_with_a_single_header() {
        let (_temp, vault) = vault();
        let log = AuditLog::new(&vault);

        log.record("maria", MutationAction::Create, None, Some("{\"id\":\"0001\"}"))
            .unwrap();
        log.record(
            "pedro",
            MutationAction::Delete,
            Some("{\"id\":\"0001\"}"),
            None,
        )
        .unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].actor, "maria");
        assert_eq!(entries[0].action, "CREATE");
        assert_eq!(entries[0].before, "");
        assert_eq!(entries[0].after, "{\"id\":\"0001\"}");
        assert_eq!(entries[1].actor, "pedro");
        assert_eq!(entries[1].action, "DELETE");
    }

    #[test]
    fn log_is_encrypted_at_rest() {
        let (_temp, vault) = vault();
        let log = AuditLog::new(&vault);
        log.record("maria", MutationAction::Create, None, Some("{}"))
            .unwrap();

        assert!(!vault.paths().audit_log().exists());
        assert!(vault.paths().backup_blob().exists());
    }

    #[test]
    fn log_action_derives_action_from_mutation_shape() {
        let (_temp, vault) = vault();
        let log = AuditLog::new(&vault);

        let agency = Agency {
            id: Some("0001".to_string()),
            name: "North".to_string(),
            shipping_location: "Dock 4".to_string(),
        };
        log.log_action("maria", &Mutation::created(agency.clone()))
            .unwrap();
        log.log_action("maria", &Mutation::updated(agency.clone(), agency.clone()))
            .unwrap();
        log.log_action("maria", &Mutation::deleted(agency)).unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].action, "CREATE");
        assert!(entries[0].after.contains("North"));
        assert_eq!(entries[1].action, "UPDATE");
        assert_eq!(entries[2].action, "DELETE");
        assert!(entries[2].before.contains("North"));
        assert_eq!(entries[2].after, "");
    }

    #[test]
    fn noop_mutation_logs_nothing() {
        let (_temp, vault) = vault();
        let log = AuditLog::new(&vault);

        let noop: Mutation<Agency> = Mutation::none();
        log.log_action("maria", &noop).unwrap();

        assert!(log.entries().unwrap().is_empty());
    }
}
