//! Permission aggregation across a principal's roles in a community

use crate::domain::{
    CommunityPermission, CommunityPermissions, GlobalPermission, Principal, Role,
    RolePermissions, StringUuid,
};
use crate::error::Result;
use crate::repository::MembershipRepository;
use std::sync::Arc;

pub struct PermissionAggregator<M: MembershipRepository> {
    repo: Arc<M>,
}

impl<M: MembershipRepository> Clone for PermissionAggregator<M> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<M: MembershipRepository> PermissionAggregator<M> {
    pub fn new(repo: Arc<M>) -> Self {
        Self { repo }
    }

    /// Effective permissions of the principal in the community.
    ///
    /// Unknown principals and communities simply hold no roles, so every flag
    /// comes back false and `has_membership` is false.
    pub async fn aggregate_community_permissions(
        &self,
        principal_id: StringUuid,
        community_id: StringUuid,
    ) -> Result<CommunityPermissions> {
        let roles = self
            .repo
            .find_member_roles(principal_id, community_id)
            .await?;
        let aggregate = aggregate_roles(&roles);
        tracing::trace!(
            principal_id = %principal_id,
            community_id = %community_id,
            roles = roles.len(),
            "aggregated community permissions"
        );
        Ok(aggregate)
    }

    pub async fn has_community_permission(
        &self,
        principal_id: StringUuid,
        community_id: StringUuid,
        flag: CommunityPermission,
    ) -> Result<bool> {
        let aggregate = self
            .aggregate_community_permissions(principal_id, community_id)
            .await?;
        Ok(aggregate.has(flag))
    }

    /// String-keyed variant for callers holding a flag name. Unknown names are false.
    pub async fn has_community_permission_named(
        &self,
        principal_id: StringUuid,
        community_id: StringUuid,
        flag: &str,
    ) -> Result<bool> {
        match flag.parse::<CommunityPermission>() {
            Ok(flag) => {
                self.has_community_permission(principal_id, community_id, flag)
                    .await
            }
            Err(_) => {
                tracing::warn!(flag, "Unknown community permission treated as absent");
                Ok(false)
            }
        }
    }
}

/// OR every role flag across `roles`. Membership is "at least one role".
pub fn aggregate_roles(roles: &[Role]) -> CommunityPermissions {
    let permissions = roles
        .iter()
        .fold(RolePermissions::default(), |acc, role| acc.union(&role.permissions));
    CommunityPermissions {
        permissions,
        has_membership: !roles.is_empty(),
    }
}

/// Site-wide flags are read straight off the principal.
pub fn has_global_permission(principal: &Principal, flag: GlobalPermission) -> bool {
    principal.permissions.get(flag)
}

pub fn has_global_permission_named(principal: &Principal, flag: &str) -> bool {
    match flag.parse::<GlobalPermission>() {
        Ok(flag) => has_global_permission(principal, flag),
        Err(_) => {
            tracing::warn!(flag, "Unknown global permission treated as absent");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::repository::membership::MockMembershipRepository;
    use mockall::predicate::*;
    use pretty_assertions::assert_eq;

    fn role(community_id: StringUuid, permissions: RolePermissions) -> Role {
        Role {
            community_id,
            permissions,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_aggregate_ors_flags_across_roles() {
        let mut mock = MockMembershipRepository::new();
        let user_id = StringUuid::new_v4();
        let community_id = StringUuid::new_v4();

        mock.expect_find_member_roles()
            .with(eq(user_id), eq(community_id))
            .returning(move |_, cid| {
                Ok(vec![
                    role(
                        cid,
                        RolePermissions::default().with(CommunityPermission::CanEditOwnCharacter),
                    ),
                    role(
                        cid,
                        RolePermissions::default().with(CommunityPermission::CanEditCharacter),
                    ),
                ])
            });

        let aggregator = PermissionAggregator::new(Arc::new(mock));
        let aggregate = aggregator
            .aggregate_community_permissions(user_id, community_id)
            .await
            .unwrap();

        let expected = CommunityPermissions {
            permissions: RolePermissions::default()
                .with(CommunityPermission::CanEditCharacter)
                .with(CommunityPermission::CanEditOwnCharacter),
            has_membership: true,
        };
        assert_eq!(aggregate, expected);
    }

    #[tokio::test]
    async fn test_no_roles_means_no_membership() {
        let mut mock = MockMembershipRepository::new();
        mock.expect_find_member_roles()
            .returning(|_, _| Ok(vec![]));

        let aggregator = PermissionAggregator::new(Arc::new(mock));
        let aggregate = aggregator
            .aggregate_community_permissions(StringUuid::new_v4(), StringUuid::new_v4())
            .await
            .unwrap();

        assert_eq!(aggregate, CommunityPermissions::default());
        assert!(!aggregate.has(CommunityPermission::AnyMembership));
    }

    #[tokio::test]
    async fn test_any_membership_answered_by_role_count() {
        let mut mock = MockMembershipRepository::new();
        mock.expect_find_member_roles()
            .returning(|_, cid| Ok(vec![role(cid, RolePermissions::default())]));

        let aggregator = PermissionAggregator::new(Arc::new(mock));
        let user_id = StringUuid::new_v4();
        let community_id = StringUuid::new_v4();

        assert!(aggregator
            .has_community_permission(user_id, community_id, CommunityPermission::AnyMembership)
            .await
            .unwrap());
        assert!(!aggregator
            .has_community_permission(user_id, community_id, CommunityPermission::CanEditRole)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unknown_flag_name_is_false_without_lookup() {
        let mut mock = MockMembershipRepository::new();
        mock.expect_find_member_roles().never();

        let aggregator = PermissionAggregator::new(Arc::new(mock));
        let result = aggregator
            .has_community_permission_named(
                StringUuid::new_v4(),
                StringUuid::new_v4(),
                "canSummonDragons",
            )
            .await
            .unwrap();
        assert!(!result);
    }

    #[tokio::test]
    async fn test_known_flag_name_is_looked_up() {
        let mut mock = MockMembershipRepository::new();
        mock.expect_find_member_roles().returning(|_, cid| {
            Ok(vec![role(
                cid,
                RolePermissions::default().with(CommunityPermission::CanListInviteCodes),
            )])
        });

        let aggregator = PermissionAggregator::new(Arc::new(mock));
        let result = aggregator
            .has_community_permission_named(
                StringUuid::new_v4(),
                StringUuid::new_v4(),
                "canListInviteCodes",
            )
            .await
            .unwrap();
        assert!(result);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut mock = MockMembershipRepository::new();
        mock.expect_find_member_roles()
            .returning(|_, _| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let aggregator = PermissionAggregator::new(Arc::new(mock));
        let result = aggregator
            .aggregate_community_permissions(StringUuid::new_v4(), StringUuid::new_v4())
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[test]
    fn test_global_permission_is_direct_read() {
        let principal = Principal::new(StringUuid::new_v4(), "alice")
            .with_permission(GlobalPermission::CanListUsers);

        assert!(has_global_permission(&principal, GlobalPermission::CanListUsers));
        assert!(!has_global_permission(&principal, GlobalPermission::IsAdmin));
        assert!(has_global_permission_named(&principal, "canListUsers"));
        assert!(!has_global_permission_named(&principal, "canListEverything"));
    }

    #[test]
    fn test_global_permission_does_not_imply_admin_grants() {
        let admin = Principal::new(StringUuid::new_v4(), "root")
            .with_permission(GlobalPermission::IsAdmin);
        // The admin bypass happens at policy level, not in the raw read.
        assert!(!has_global_permission(&admin, GlobalPermission::CanDeleteUsers));
    }
}
