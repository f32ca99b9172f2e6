// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential verification, roles and request-scoped identity.
//!
//! The core never holds a logged-in user in process-wide state: callers
//! authenticate against the user table and carry the resulting
//! [`RequestContext`] into every call that needs an actor.

pub mod context;
pub mod password;
pub mod roles;

pub use context::RequestContext;
pub use roles::Role;
