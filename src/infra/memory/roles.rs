use async_trait::async_trait;

use crate::application::repos::{RepoError, RolesRepo};
use crate::domain::entities::{
    PermissionRecord, RoleId, RoleRecord, RoleWithPermissions, UserId,
};

use super::InMemoryRepositories;

#[async_trait]
impl RolesRepo for InMemoryRepositories {
    async fn list_roles_with_permissions(&self) -> Result<Vec<RoleWithPermissions>, RepoError> {
        let state = self.read("list_roles_with_permissions");
        Ok(state
            .roles
            .values()
            .map(|role| RoleWithPermissions {
                role: role.clone(),
                permissions: state.permission_names_for_role(role.id),
            })
            .collect())
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<RoleRecord>, RepoError> {
        Ok(self.read("find_role").roles.get(&id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleRecord>, RepoError> {
        let state = self.read("find_role_by_name");
        Ok(state.roles.values().find(|role| role.name == name).cloned())
    }

    async fn find_permission_by_name(
        &self,
        name: &str,
    ) -> Result<Option<PermissionRecord>, RepoError> {
        let state = self.read("find_permission_by_name");
        Ok(state
            .permissions
            .values()
            .find(|permission| permission.name == name)
            .cloned())
    }

    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<(), RepoError> {
        let mut state = self.write("assign_role");
        if !state.users.contains_key(&user_id) || !state.roles.contains_key(&role_id) {
            return Err(RepoError::NotFound);
        }
        state.user_roles.insert((user_id, role_id));
        Ok(())
    }

    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool, RepoError> {
        let mut state = self.write("remove_role");
        Ok(state.user_roles.remove(&(user_id, role_id)))
    }

    async fn assign_permission(
        &self,
        role_id: RoleId,
        permission_id: i64,
    ) -> Result<(), RepoError> {
        let mut state = self.write("assign_permission");
        if !state.roles.contains_key(&role_id) || !state.permissions.contains_key(&permission_id)
        {
            return Err(RepoError::NotFound);
        }
        state.role_permissions.insert((role_id, permission_id));
        Ok(())
    }

    async fn remove_permission(
        &self,
        role_id: RoleId,
        permission_id: i64,
    ) -> Result<bool, RepoError> {
        let mut state = self.write("remove_permission");
        Ok(state.role_permissions.remove(&(role_id, permission_id)))
    }

    async fn permissions_for_user(&self, user_id: UserId) -> Result<Vec<String>, RepoError> {
        let state = self.read("permissions_for_user");
        let mut names: Vec<String> = state
            .user_roles
            .iter()
            .filter(|(user, _)| *user == user_id)
            .flat_map(|(_, role_id)| state.permission_names_for_role(*role_id))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
