//! In-process resource store implementing the repository traits.
//!
//! All state sits behind one lock that is never held across an await point.

mod posts;
mod roles;
mod users;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use time::OffsetDateTime;

use crate::domain::entities::{
    PermissionId, PermissionRecord, PostId, RoleId, RoleRecord, UserId, UserRecord,
};
use crate::domain::permissions::{ALL_PERMISSIONS, BUILTIN_ROLES};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::memory";

#[derive(Debug, Clone)]
struct StoredUser {
    record: UserRecord,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct StoredPost {
    id: PostId,
    title: String,
    content: String,
    user_id: UserId,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct ResourceState {
    next_user_id: UserId,
    next_post_id: PostId,
    users: BTreeMap<UserId, StoredUser>,
    posts: BTreeMap<PostId, StoredPost>,
    roles: BTreeMap<RoleId, RoleRecord>,
    permissions: BTreeMap<PermissionId, PermissionRecord>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
}

impl ResourceState {
    fn with_catalog() -> Self {
        let mut state = Self::default();

        for (index, name) in ALL_PERMISSIONS.iter().enumerate() {
            let id = index as PermissionId + 1;
            state.permissions.insert(
                id,
                PermissionRecord {
                    id,
                    name: (*name).to_string(),
                },
            );
        }

        for (index, (role, granted)) in BUILTIN_ROLES.iter().enumerate() {
            let role_id = index as RoleId + 1;
            state.roles.insert(
                role_id,
                RoleRecord {
                    id: role_id,
                    name: (*role).to_string(),
                },
            );
            for permission in granted.iter() {
                if let Some(permission_id) = state.permission_id(permission) {
                    state.role_permissions.insert((role_id, permission_id));
                }
            }
        }

        state
    }

    fn permission_id(&self, name: &str) -> Option<PermissionId> {
        self.permissions
            .values()
            .find(|permission| permission.name == name)
            .map(|permission| permission.id)
    }

    fn role_names_for(&self, user_id: UserId) -> Vec<String> {
        self.user_roles
            .iter()
            .filter(|(user, _)| *user == user_id)
            .filter_map(|(_, role_id)| self.roles.get(role_id))
            .map(|role| role.name.clone())
            .collect()
    }

    fn permission_names_for_role(&self, role_id: RoleId) -> Vec<String> {
        self.role_permissions
            .iter()
            .filter(|(role, _)| *role == role_id)
            .filter_map(|(_, permission_id)| self.permissions.get(permission_id))
            .map(|permission| permission.name.clone())
            .collect()
    }
}

/// Resource store living in process memory, seeded with the built-in role catalog.
#[derive(Debug)]
pub struct InMemoryRepositories {
    state: RwLock<ResourceState>,
}

impl Default for InMemoryRepositories {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ResourceState::with_catalog()),
        }
    }

    fn read(&self, op: &'static str) -> std::sync::RwLockReadGuard<'_, ResourceState> {
        rw_read(&self.state, SOURCE, op)
    }

    fn write(&self, op: &'static str) -> std::sync::RwLockWriteGuard<'_, ResourceState> {
        rw_write(&self.state, SOURCE, op)
    }
}
