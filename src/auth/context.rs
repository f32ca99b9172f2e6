// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped identity.
//!
//! The presentation layer authenticates once per request and passes the
//! resulting context into core calls. Nothing here is process-wide
//! mutable state.

use crate::auth::{password, Role};
use crate::models::User;

/// The authenticated identity behind one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: String,
    pub login: String,
    pub name: String,
    pub email: String,
    pub class_id: String,
    pub class_name: String,
}

impl RequestContext {
    /// Look up `login` (case-insensitive) in the user table and verify the
    /// password. An unknown login and a failed check both return `None`;
    /// the login form treats them identically.
    pub fn authenticate(users: &[User], login: &str, password_input: &str) -> Option<Self> {
        let login = login.trim();
        let candidate = users
            .iter()
            .find(|user| user.login.trim().eq_ignore_ascii_case(login))?;

        if !password::matches(password_input, &candidate.password) {
            return None;
        }

        Some(Self {
            user_id: candidate.id.clone().unwrap_or_default(),
            login: candidate.login.trim().to_string(),
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            class_id: candidate.class_id.clone().unwrap_or_default(),
            class_name: candidate.class_name.clone().unwrap_or_default(),
        })
    }

    /// The role carried by this context, if its class name parses.
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.class_name)
    }

    /// Whether this context may use a surface restricted to `allowed`
    /// roles.
    pub fn can_access(&self, allowed: &[Role]) -> bool {
        self.role().is_some_and(|role| role.can_access(allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<User> {
        vec![
            User {
                id: Some("U001".to_string()),
                login: "maria".to_string(),
                password: "1234".to_string(),
                name: "Maria Silva".to_string(),
                email: "maria@example.com".to_string(),
                class_id: Some("0004".to_string()),
                class_name: Some("HR".to_string()),
            },
            User {
                id: Some("U002".to_string()),
                login: "Pedro".to_string(),
                password: "abcd".to_string(),
                name: "Pedro Souza".to_string(),
                email: "pedro@example.com".to_string(),
                class_id: Some("0001".to_string()),
                class_name: Some("Administrator".to_string()),
            },
        ]
    }

    #[test]
    fn authenticate_is_case_insensitive_on_login() {
        let users = users();
        let context = RequestContext::authenticate(&users, "MARIA", "1234").unwrap();
        assert_eq!(context.user_id, "U001");
        assert_eq!(context.class_name, "HR");
    }

    #[test]
    fn authenticate_rejects_wrong_password_and_unknown_login() {
        let users = users();
        assert!(RequestContext::authenticate(&users, "maria", "wrong").is_none());
        assert!(RequestContext::authenticate(&users, "nobody", "1234").is_none());
    }

    #[test]
    fn context_role_drives_access_checks() {
        let users = users();
        let hr = RequestContext::authenticate(&users, "maria", "1234").unwrap();
        assert_eq!(hr.role(), Some(Role::Hr));
        assert!(hr.can_access(&[Role::Hr]));
        assert!(!hr.can_access(&[Role::Warehouse]));

        let admin = RequestContext::authenticate(&users, "pedro", "abcd").unwrap();
        assert!(admin.can_access(&[Role::Warehouse]));
        assert!(admin.can_access(&[Role::Hr]));
    }

    #[test]
    fn unparseable_class_name_denies_access() {
        let mut users = users();
        users[0].class_name = Some("Intern".to_string());
        let context = RequestContext::authenticate(&users, "maria", "1234").unwrap();
        assert_eq!(context.role(), None);
        assert!(!context.can_access(&[Role::Hr]));
    }
}
