// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password verification.
//!
//! Stored passwords come in two shapes: werkzeug-style
//! `pbkdf2:sha256[:iterations]$salt$hexdigest` hashes written by the
//! original registration tool, and legacy plaintext rows imported from
//! hand-maintained CSVs. Verification tries the hash path first whenever
//! the stored value looks hash-shaped, then falls back to byte equality.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

/// Iteration count assumed when the method string omits one.
const DEFAULT_ITERATIONS: u32 = 260_000;

/// Whether a stored value looks like a hash rather than plaintext.
pub fn looks_hashed(stored: &str) -> bool {
    stored.starts_with("pbkdf2:") || stored.contains('$')
}

/// Verify `input` against a stored password of either shape.
///
/// An empty stored value never verifies.
pub fn matches(input: &str, stored: &str) -> bool {
    let input = input.trim();
    let stored = stored.trim();
    if stored.is_empty() {
        return false;
    }

    if looks_hashed(stored) {
        if let Some(verified) = check_pbkdf2_hash(input, stored) {
            return verified;
        }
    }

    input == stored
}

/// Verify against a `pbkdf2:sha256[:iterations]$salt$hexdigest` value.
///
/// Returns `None` when the stored value does not parse as that shape, so
/// the caller can fall back to plaintext equality.
fn check_pbkdf2_hash(input: &str, stored: &str) -> Option<bool> {
    let mut parts = stored.splitn(3, '$');
    let method = parts.next()?;
    let salt = parts.next()?;
    let expected_hex = parts.next()?;

    let mut method_parts = method.split(':');
    if method_parts.next()? != "pbkdf2" {
        return None;
    }
    if method_parts.next()? != "sha256" {
        return None;
    }
    let iterations = match method_parts.next() {
        Some(raw) => raw.parse::<u32>().ok()?,
        None => DEFAULT_ITERATIONS,
    };

    let expected = hex::decode(expected_hex).ok()?;
    if expected.is_empty() {
        return None;
    }

    let mut derived = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(input.as_bytes(), salt.as_bytes(), iterations, &mut derived);
    Some(derived == expected)
}
