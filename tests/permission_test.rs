//! Permission aggregation across memberships

use menagerie_authz::domain::{CommunityPermission, RolePermissions};
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

use common::{user, Fixture};

#[tokio::test]
async fn test_scenario_a_flags_are_ored_across_roles() {
    let fx = Fixture::new();
    let community = fx.community().await;
    let u = user("u");

    fx.grant(u.id, community, &[CommunityPermission::CanEditOwnCharacter])
        .await;
    fx.grant(u.id, community, &[CommunityPermission::CanEditCharacter])
        .await;

    let aggregate = fx
        .engine
        .permissions()
        .aggregate_community_permissions(u.id, community)
        .await
        .unwrap();

    assert!(aggregate.has(CommunityPermission::CanEditCharacter));
    assert!(aggregate.has(CommunityPermission::CanEditOwnCharacter));
    assert!(aggregate.has_membership);
    assert_eq!(
        aggregate.permissions,
        RolePermissions::default()
            .with(CommunityPermission::CanEditCharacter)
            .with(CommunityPermission::CanEditOwnCharacter)
    );
}

#[tokio::test]
async fn test_roles_in_other_communities_do_not_leak() {
    let fx = Fixture::new();
    let home = fx.community().await;
    let elsewhere = fx.community().await;
    let u = user("u");

    fx.grant(u.id, elsewhere, &[CommunityPermission::CanEditCommunity])
        .await;

    let aggregate = fx
        .engine
        .permissions()
        .aggregate_community_permissions(u.id, home)
        .await
        .unwrap();
    assert!(!aggregate.has_membership);
    assert!(!aggregate.has(CommunityPermission::CanEditCommunity));
}

#[rstest]
#[case::no_roles(vec![], false)]
#[case::empty_role(vec![vec![]], false)]
#[case::one_granting(vec![vec![CommunityPermission::CanCreateRole]], true)]
#[case::granting_among_others(
    vec![vec![CommunityPermission::CanEditRole], vec![], vec![CommunityPermission::CanCreateRole]],
    true
)]
#[case::only_unrelated(
    vec![vec![CommunityPermission::CanEditRole, CommunityPermission::CanListInviteCodes]],
    false
)]
#[tokio::test]
async fn test_flag_is_or_over_held_roles(
    #[case] roles: Vec<Vec<CommunityPermission>>,
    #[case] expected: bool,
) {
    let fx = Fixture::new();
    let community = fx.community().await;
    let u = user("u");
    for flags in &roles {
        fx.grant(u.id, community, flags).await;
    }

    let permissions = fx.engine.permissions();
    assert_eq!(
        permissions
            .has_community_permission(u.id, community, CommunityPermission::CanCreateRole)
            .await
            .unwrap(),
        expected
    );
    assert_eq!(
        permissions
            .has_community_permission(u.id, community, CommunityPermission::AnyMembership)
            .await
            .unwrap(),
        !roles.is_empty()
    );
}

#[tokio::test]
async fn test_unknown_principal_and_flag_are_false() {
    let fx = Fixture::new();
    let community = fx.community().await;
    let stranger = user("stranger");

    let permissions = fx.engine.permissions();
    assert!(!permissions
        .has_community_permission_named(stranger.id, community, "canEditCommunity")
        .await
        .unwrap());
    assert!(!permissions
        .has_community_permission_named(stranger.id, community, "canDoAnything")
        .await
        .unwrap());
}
