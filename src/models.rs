// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Entity Data Models
//!
//! One canonical struct per entity kind, serialized to and from the CSV
//! tables by serde. All fields are string-typed in the store; nullable
//! fields use `Option<String>` so an empty CSV field reads back as `None`
//! rather than `""`, and integer-semantics fields (`quantity`,
//! `required_qty`) carry typed accessors that normalize empty or invalid
//! text to their defaults.
//!
//! Entity dispatch goes through the tagged [`EntityKind`] enumeration,
//! which carries the per-kind capabilities (backing file, identifier field,
//! identifier prefix/padding, declared column order) instead of branching
//! on runtime types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// =============================================================================
// Entity Kind Capabilities
// =============================================================================

/// The five entity kinds persisted by the store.
///
/// Each variant carries the capability set the repository needs: which CSV
/// file backs the kind, which field is its identifier, and how generated
/// identifiers are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Agency,
    Kit,
    StockItem,
    User,
    Collaborator,
}

impl EntityKind {
    /// Backing CSV file name inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            EntityKind::Agency => "agencies.csv",
            EntityKind::Kit => "kits.csv",
            EntityKind::StockItem => "stock.csv",
            EntityKind::User => "users.csv",
            EntityKind::Collaborator => "collaborators.csv",
        }
    }

    /// The designated identifier field for this kind.
    pub fn id_field(&self) -> &'static str {
        match self {
            EntityKind::Agency => "id",
            EntityKind::Kit => "kit_id",
            EntityKind::StockItem => "item_id",
            EntityKind::User => "id",
            EntityKind::Collaborator => "id",
        }
    }

    /// Fixed prefix applied to generated identifiers.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Agency | EntityKind::StockItem => "",
            EntityKind::Kit => "K",
            EntityKind::User => "U",
            EntityKind::Collaborator => "C",
        }
    }

    /// Zero-padding width of the numeric part of generated identifiers.
    pub fn id_width(&self) -> usize {
        match self {
            EntityKind::Agency | EntityKind::StockItem => 4,
            EntityKind::Kit | EntityKind::User | EntityKind::Collaborator => 3,
        }
    }

    /// Column names of the backing CSV, in declared order.
    ///
    /// Patch merging allow-lists against this set; anything else in a patch
    /// is dropped.
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Agency => &["id", "name", "shipping_location"],
            EntityKind::Kit => &[
                "kit_id",
                "kit_name",
                "item_id",
                "item_name",
                "size",
                "required_qty",
            ],
            EntityKind::StockItem => &[
                "item_id",
                "item_name",
                "size",
                "kit_id",
                "kit_name",
                "quantity",
            ],
            EntityKind::User => &[
                "id",
                "login",
                "password",
                "name",
                "email",
                "class_id",
                "class_name",
            ],
            EntityKind::Collaborator => &[
                "id",
                "name",
                "email",
                "manager_id",
                "manager_name",
                "manager_email",
                "kit_id",
                "kit_name",
                "admission_date",
                "shirt_size",
                "agency_id",
                "agency_name",
                "shipping_location",
                "status",
            ],
        }
    }
}

/// A typed record persisted in one of the entity tables.
pub trait Record: Serialize + DeserializeOwned + Clone + std::fmt::Debug {
    /// The entity kind this record belongs to.
    const KIND: EntityKind;

    /// The value of the identifier field, if set.
    fn id(&self) -> Option<&str>;

    /// Overwrite the identifier field (used by server-side ID generation).
    fn set_id(&mut self, id: String);
}

// =============================================================================
// Entities
// =============================================================================

/// A destination agency for collaborator shipments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agency {
    pub id: Option<String>,
    pub name: String,
    pub shipping_location: String,
}

impl Record for Agency {
    const KIND: EntityKind = EntityKind::Agency;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// One line of a kit definition.
///
/// A kit is a named bundle represented as multiple rows sharing `kit_id`
/// and `kit_name`; each row contributes one required item line. The
/// `required_qty` of a line is consumed from stock on every assignment;
/// reservations never mutate the definition itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KitRow {
    pub kit_id: Option<String>,
    pub kit_name: String,
    pub item_id: Option<String>,
    pub item_name: String,
    /// Only meaningful for garment lines; empty otherwise.
    pub size: Option<String>,
    pub required_qty: Option<String>,
}

impl KitRow {
    /// Required quantity of this line, defaulting to 1 when the field is
    /// empty or unparseable.
    pub fn qty(&self) -> u32 {
        self.required_qty
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(1)
    }
}

impl Record for KitRow {
    const KIND: EntityKind = EntityKind::Kit;

    fn id(&self) -> Option<&str> {
        self.kit_id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.kit_id = Some(id);
    }
}

/// A warehouse stock row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockItem {
    pub item_id: Option<String>,
    pub item_name: String,
    /// Only meaningful for garment-like items.
    pub size: Option<String>,
    /// Provenance kit of this stock row.
    pub kit_id: Option<String>,
    pub kit_name: Option<String>,
    /// Stored as text like every other field; use [`StockItem::quantity`]
    /// and [`StockItem::set_quantity`]. Never negative.
    pub quantity: String,
}

impl StockItem {
    /// Current quantity, normalizing empty or invalid text to 0.
    pub fn quantity(&self) -> u32 {
        self.quantity.trim().parse().unwrap_or(0)
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity.to_string();
    }
}

impl Record for StockItem {
    const KIND: EntityKind = EntityKind::StockItem;

    fn id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.item_id = Some(id);
    }
}

/// A login account. `class_name` is the role driving access control.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Option<String>,
    pub login: String,
    /// Either a werkzeug-style `pbkdf2:sha256:...` hash or legacy
    /// plaintext; both verify through `auth::password::matches`.
    pub password: String,
    pub name: String,
    pub email: String,
    pub class_id: Option<String>,
    pub class_name: Option<String>,
}

impl Record for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// A collaborator (employee) record.
///
/// `kit_id` and `shirt_size` jointly determine which stock rows are
/// reserved for this collaborator; mutations that touch either go through
/// the inventory consistency engine before anything is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Collaborator {
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub manager_id: Option<String>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub kit_id: Option<String>,
    pub kit_name: Option<String>,
    pub admission_date: Option<String>,
    pub shirt_size: Option<String>,
    pub agency_id: Option<String>,
    pub agency_name: Option<String>,
    pub shipping_location: Option<String>,
    /// Free text, e.g. "Active" / "Inactive".
    pub status: Option<String>,
}

impl Record for Collaborator {
    const KIND: EntityKind = EntityKind::Collaborator;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

// =============================================================================
// Mutation Results
// =============================================================================

/// The action performed by a repository mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for MutationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationAction::Create => write!(f, "CREATE"),
            MutationAction::Update => write!(f, "UPDATE"),
            MutationAction::Delete => write!(f, "DELETE"),
        }
    }
}

/// Before/after snapshots of a repository mutation.
///
/// Update and remove on a key that matches nothing return the empty shape
/// (`before` and `after` both `None`): a no-op, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<R> {
    pub before: Option<R>,
    pub after: Option<R>,
}

impl<R> Mutation<R> {
    pub fn created(after: R) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    pub fn updated(before: R, after: R) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(before: R) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }

    /// The no-op shape returned when no row matched.
    pub fn none() -> Self {
        Self {
            before: None,
            after: None,
        }
    }

    /// Action implied by the before/after shape; `None` for a no-op.
    pub fn action(&self) -> Option<MutationAction> {
        match (&self.before, &self.after) {
            (None, Some(_)) => Some(MutationAction::Create),
            (Some(_), Some(_)) => Some(MutationAction::Update),
            (Some(_), None) => Some(MutationAction::Delete),
            (None, None) => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.action().is_none()
    }
}
