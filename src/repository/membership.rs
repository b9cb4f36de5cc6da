//! Role/membership repository

use crate::domain::{Role, StringUuid};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Every role the user holds in the community, one entry per membership.
    async fn find_member_roles(
        &self,
        user_id: StringUuid,
        community_id: StringUuid,
    ) -> Result<Vec<Role>>;
}

pub struct MembershipRepositoryImpl {
    pool: MySqlPool,
}

impl MembershipRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for MembershipRepositoryImpl {
    async fn find_member_roles(
        &self,
        user_id: StringUuid,
        community_id: StringUuid,
    ) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.community_id, r.name,
                   r.can_create_species, r.can_edit_species,
                   r.can_create_character, r.can_create_orphaned_character,
                   r.can_edit_character, r.can_edit_own_character,
                   r.can_manage_orphaned_characters, r.can_delete_character,
                   r.can_edit_media, r.can_edit_own_media,
                   r.can_create_role, r.can_edit_role,
                   r.can_manage_member_roles, r.can_remove_community_member,
                   r.can_create_invite_code, r.can_list_invite_codes,
                   r.can_edit_community
            FROM roles r
            INNER JOIN community_members m ON m.role_id = r.id
            WHERE m.user_id = ? AND m.community_id = ? AND r.community_id = m.community_id
            "#,
        )
        .bind(user_id)
        .bind(community_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }
}
