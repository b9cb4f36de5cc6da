//! Principal repository

use crate::domain::{Principal, StringUuid};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Principal>>;
}

pub struct PrincipalRepositoryImpl {
    pool: MySqlPool,
}

impl PrincipalRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalRepository for PrincipalRepositoryImpl {
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Principal>> {
        let principal = sqlx::query_as::<_, Principal>(
            r#"
            SELECT id, username, is_admin, can_create_community, can_list_users,
                   can_edit_users, can_delete_users
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }
}
