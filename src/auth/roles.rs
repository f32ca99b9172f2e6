// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};

/// User roles for authorization, parsed from a user's `class_name`.
///
/// ## Role Hierarchy
///
/// - `Administrator` - passes every access check
/// - `Manager` - manages their own collaborators
/// - `Warehouse` - stock operations
/// - `Hr` - user and collaborator registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Manager,
    Warehouse,
    Hr,
}

impl Role {
    /// Whether this role may use a surface restricted to `allowed` roles.
    /// Administrators always may.
    pub fn can_access(&self, allowed: &[Role]) -> bool {
        *self == Role::Administrator || allowed.contains(self)
    }

    /// Parse a role from a class name (case-insensitive). Accepts the
    /// legacy Portuguese class names still present in older user rows.
    pub fn parse(class_name: &str) -> Option<Role> {
        match class_name.trim().to_lowercase().as_str() {
            "administrator" | "administrador" | "admin" => Some(Role::Administrator),
            "manager" | "gestor" => Some(Role::Manager),
            "warehouse" | "almoxarifado" => Some(Role::Warehouse),
            "hr" | "rh" => Some(Role::Hr),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Administrator => write!(f, "Administrator"),
            Role::Manager => write!(f, "Manager"),
            Role::Warehouse => write!(f, "Warehouse"),
            Role::Hr => write!(f, "HR"),
        }
    }
}
