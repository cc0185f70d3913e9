//! Permission names, the built-in role catalog, and the authorization check.

use std::collections::BTreeSet;

pub const VIEW_POST: &str = "view_post";
pub const CREATE_POST: &str = "create_post";
pub const EDIT_POST: &str = "edit_post";
pub const DELETE_POST: &str = "delete_post";
pub const MANAGE_ROLES: &str = "manage_roles";

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_USER: &str = "user";

/// Every permission known to the store, in catalog order.
pub const ALL_PERMISSIONS: &[&str] = &[VIEW_POST, CREATE_POST, EDIT_POST, DELETE_POST, MANAGE_ROLES];

/// Roles created with a fresh store and the permissions granted to each.
pub const BUILTIN_ROLES: &[(&str, &[&str])] = &[
    (ROLE_ADMIN, ALL_PERMISSIONS),
    (ROLE_EDITOR, &[CREATE_POST, EDIT_POST, VIEW_POST]),
    (ROLE_USER, &[VIEW_POST]),
];

/// Flattened permissions of a principal, computed once per request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Returns true when `permissions` grants `required`.
pub fn authorize(permissions: &PermissionSet, required: &str) -> bool {
    permissions.contains(required)
}
