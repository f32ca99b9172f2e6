// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted store gateway.
//!
//! The tabular store only exists in plaintext while a logical operation is
//! in flight. Before any read the last backup blob is decrypted and its
//! archive (a gzipped tar of one CSV per entity kind plus the audit log)
//! expands into the data directory. After the operation, on every exit
//! path, the current CSV files are re-archived, re-encrypted with
//! AES-256-GCM, the blob is overwritten atomically, and the plaintext is
//! deleted.
//!
//! ## Residual Risk
//!
//! Plaintext files exist transiently on disk during each operation. The
//! cycle bounds the window but does not eliminate it; true concurrent
//! access requires external request serialization (one worker process)
//! until a transactional store replaces this layout.

use std::fs;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CoreError, CoreResult};

use super::StoragePaths;

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// 12-byte nonce for AES-GCM (96 bits is the standard).
pub const NONCE_SIZE: usize = 12;

/// Gateway wrapping the data directory with encryption at rest.
#[derive(Debug, Clone)]
pub struct StoreVault {
    paths: StoragePaths,
}

impl StoreVault {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    /// The storage paths this vault guards.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Run one logical operation against the decrypted store.
    ///
    /// Restores plaintext before `body`, backs up and deletes plaintext
    /// after it, on success and on failure alike. A backup failure after
    /// a failed body is logged, not surfaced, so the body's error wins.
    pub fn with_store<T>(
        &self,
        body: impl FnOnce(&StoragePaths) -> CoreResult<T>,
    ) -> CoreResult<T> {
        self.restore()?;
        let outcome = body(&self.paths);
        let backup = self.backup();
        match outcome {
            Ok(value) => backup.map(|()| value),
            Err(err) => {
                if let Err(backup_err) = backup {
                    tracing::warn!(
                        "backup after failed operation also failed: {backup_err}"
                    );
                }
                Err(err)
            }
        }
    }

    /// Expand the last backup blob into plaintext CSV files.
    ///
    /// A missing blob is the first-run case and a no-op. A blob that
    /// exists but fails to decrypt raises [`CoreError::CorruptBackup`],
    /// never silently-empty data.
    pub fn restore(&self) -> CoreResult<()> {
        let blob_path = self.paths.backup_blob();
        if !blob_path.exists() {
            return Ok(());
        }

        let key = self.load_or_generate_key()?;
        let blob = fs::read(&blob_path)?;
        if blob.len() <= NONCE_SIZE {
            return Err(CoreError::CorruptBackup(format!(
                "blob is {} bytes, shorter than the nonce",
                blob.len()
            )));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| CoreError::Crypto(format!("invalid key: {e}")))?;
        let archive = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| {
                CoreError::CorruptBackup(
                    "decryption failed (tampered blob or wrong key)".to_string(),
                )
            })?;

        tar::Archive::new(GzDecoder::new(&archive[..])).unpack(self.paths.root())?;
        Ok(())
    }

    /// Archive, encrypt and persist the current plaintext files, then
    /// delete them.
    ///
    /// With no plaintext CSV present there is nothing to back up and the
    /// existing blob is left untouched.
    pub fn backup(&self) -> CoreResult<()> {
        let files = self.plaintext_files()?;
        if files.is_empty() {
            return Ok(());
        }

        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for path in &files {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| CoreError::Crypto("non-UTF-8 table file name".to_string()))?;
            builder.append_path_with_name(path, name)?;
        }
        let archive = builder.into_inner()?.finish()?;

        let key = self.load_or_generate_key()?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| CoreError::Crypto(format!("invalid key: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), archive.as_slice())
            .map_err(|e| CoreError::Crypto(format!("encryption failed: {e}")))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);

        // Overwrite the blob atomically, then drop the plaintext.
        let blob_path = self.paths.backup_blob();
        let temp_path = blob_path.with_extension("enc.tmp");
        fs::write(&temp_path, &blob)?;
        fs::rename(&temp_path, &blob_path)?;

        for path in &files {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Load the symmetric key, generating and persisting it on first use.
    fn load_or_generate_key(&self) -> CoreResult<Zeroizing<[u8; KEY_SIZE]>> {
        let key_path = self.paths.key_file();
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);

        if key_path.exists() {
            let bytes = fs::read(&key_path)?;
            if bytes.len() != KEY_SIZE {
                return Err(CoreError::Crypto(format!(
                    "key file holds {} bytes, expected {KEY_SIZE}",
                    bytes.len()
                )));
            }
            key.copy_from_slice(&bytes);
        } else {
            fs::create_dir_all(self.paths.root())?;
            OsRng.fill_bytes(&mut key[..]);
            fs::write(&key_path, &key[..])?;
            tracing::info!("generated new store encryption key");
        }

        Ok(key)
    }

    /// The plaintext CSV files currently in the data directory, sorted for
    /// a deterministic archive layout.
    fn plaintext_files(&self) -> CoreResult<Vec<std::path::PathBuf>> {
        let root = self.paths.root();
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
