// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role sets for authorization.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Role name that grants administrative access to the users resource.
pub const ADMIN_ROLE: &str = "admin";

/// Role name carried by regular accounts.
pub const USER_ROLE: &str = "user";

/// Deduplicated set of role names held by an identity.
///
/// Roles are plain strings: identity providers are free to invent their own
/// group names and OAuth scopes, so nothing here is restricted to a fixed
/// enumeration. Comparison is exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role. Empty names are ignored.
    pub fn insert(&mut self, role: impl Into<String>) {
        let role = role.into();
        if !role.is_empty() {
            self.0.insert(role);
        }
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// True if at least one of `allowed` is held.
    pub fn intersects<'a, I>(&self, allowed: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        allowed.into_iter().any(|role| self.0.contains(role))
    }

    pub fn is_admin(&self) -> bool {
        self.contains(ADMIN_ROLE)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for RoleSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for role in iter {
            self.insert(role);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse() {
        let set: RoleSet = ["user", "editor", "user"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("user"));
        assert!(set.contains("editor"));
    }

    #[test]
    fn empty_names_are_dropped() {
        let set: RoleSet = ["", "admin"].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["admin"]);
    }

    #[test]
    fn intersects_requires_one_shared_role() {
        let set: RoleSet = ["user"].into_iter().collect();
        let admin_only = vec![ADMIN_ROLE.to_string()];
        let either = vec![ADMIN_ROLE.to_string(), USER_ROLE.to_string()];

        assert!(!set.intersects(&admin_only));
        assert!(set.intersects(&either));
        assert!(!RoleSet::new().intersects(&either));
    }

    #[test]
    fn role_matching_is_case_sensitive() {
        let set: RoleSet = ["Admin"].into_iter().collect();
        assert!(!set.is_admin());
    }

    #[test]
    fn serializes_as_sorted_list() {
        let set: RoleSet = ["user", "admin"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["admin","user"]"#);
    }
}
