//! Field-level redaction at the response boundary

use menagerie_authz::domain::{CommunityPermission, StringUuid};
use menagerie_authz::policy::FieldValue;
use pretty_assertions::assert_eq;
use serde_json::json;

mod common;

use common::{user, Fixture};

#[tokio::test]
async fn test_scenario_e_denied_fields_take_their_empty_values() {
    let fx = Fixture::new();
    let c = fx.community().await;
    let s = fx.species(c).await;
    let x = fx.character(None, Some(s)).await;
    let viewer = user("viewer");
    fx.grant(viewer.id, c, &[CommunityPermission::CanEditCharacter])
        .await;

    let character = json!({
        "id": x.to_string(),
        "name": "Pip",
        "pendingOwnerEmail": "new-owner@example.com",
        "pendingOwnership": { "expiresAt": "2026-11-01T00:00:00Z" },
    });

    let redacted = fx
        .engine
        .redactor()
        .redact_object(Some(&viewer), "Character", &character)
        .await
        .unwrap();

    assert_eq!(
        redacted,
        json!({
            "id": x.to_string(),
            "name": "Pip",
            "pendingOwnerEmail": "",
            "pendingOwnership": null,
        })
    );
}

#[tokio::test]
async fn test_allowed_principal_sees_real_values() {
    let fx = Fixture::new();
    let c = fx.community().await;
    let s = fx.species(c).await;
    let x = fx.character(None, Some(s)).await;
    let keeper = user("keeper");
    fx.grant(keeper.id, c, &[CommunityPermission::CanCreateOrphanedCharacter])
        .await;

    let character = json!({
        "id": x.to_string(),
        "pendingOwnerEmail": "new-owner@example.com",
        "pendingOwnership": { "expiresAt": "2026-11-01T00:00:00Z" },
    });

    let redacted = fx
        .engine
        .redactor()
        .redact_object(Some(&keeper), "Character", &character)
        .await
        .unwrap();
    assert_eq!(redacted, character);
}

#[tokio::test]
async fn test_single_field_resolution() {
    let fx = Fixture::new();
    let c = fx.community().await;
    let member = user("member");
    fx.grant(member.id, c, &[]).await;
    let community = json!({ "id": c.to_string(), "inviteCodes": ["ABC123"] });

    let value = fx
        .engine
        .redactor()
        .resolve_field(
            Some(&member),
            "Community",
            "inviteCodes",
            &community,
            json!(["ABC123"]),
        )
        .await
        .unwrap();
    assert!(value.is_redacted());
    assert_eq!(value.into_value(), json!([]));

    fx.grant(member.id, c, &[CommunityPermission::CanListInviteCodes])
        .await;
    let value = fx
        .engine
        .redactor()
        .resolve_field(
            Some(&member),
            "Community",
            "inviteCodes",
            &community,
            json!(["ABC123"]),
        )
        .await
        .unwrap();
    assert_eq!(value, FieldValue::Visible(json!(["ABC123"])));
}

#[tokio::test]
async fn test_own_account_fields_visible_to_self_only() {
    let fx = Fixture::new();
    let me = user("me");
    let profile = json!({
        "id": me.id.to_string(),
        "email": "me@example.com",
        "isAdmin": true,
    });

    let own = fx
        .engine
        .redactor()
        .redact_object(Some(&me), "User", &profile)
        .await
        .unwrap();
    assert_eq!(
        own,
        json!({ "id": me.id.to_string(), "email": "me@example.com", "isAdmin": false })
    );

    let anonymous = fx
        .engine
        .redactor()
        .redact_object(None, "User", &profile)
        .await
        .unwrap();
    assert_eq!(
        anonymous,
        json!({ "id": me.id.to_string(), "email": "", "isAdmin": false })
    );
}

#[tokio::test]
async fn test_unregistered_type_passes_through() {
    let fx = Fixture::new();
    let object = json!({ "id": StringUuid::new_v4().to_string(), "secret": "kept" });
    let redacted = fx
        .engine
        .redactor()
        .redact_object(None, "Species", &object)
        .await
        .unwrap();
    assert_eq!(redacted, object);
}
