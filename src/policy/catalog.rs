//! The platform's operation and field policy table

use super::{
    FieldKind, OperationRegistry, OwnershipBranch, Policy, PolicyContext, PolicyOutcome,
};
use super::{ArgPath, CustomPolicy, DenyReason};
use crate::domain::{
    CommunityPermission as Perm, EntityKind, GlobalPermission, OwnershipKind,
};
use crate::error::Result;
use async_trait::async_trait;

/// Passes when the id at `path` is the principal's own id.
#[derive(Debug, Clone)]
pub struct SelfTarget {
    path: ArgPath,
}

impl SelfTarget {
    pub fn new(path: impl Into<ArgPath>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CustomPolicy for SelfTarget {
    fn name(&self) -> &str {
        "selfTarget"
    }

    async fn check(&self, ctx: &PolicyContext<'_>) -> Result<PolicyOutcome> {
        let target = super::extract_id(ctx.args, &self.path);
        Ok(PolicyOutcome::allow_if(
            target == Some(ctx.principal.id),
            DenyReason::Custom("Only your own account can be changed".to_string()),
        ))
    }
}

fn in_community(permission: Perm) -> Policy {
    Policy::community(permission, EntityKind::Community, "communityId")
}

fn edit_species_via(kind: EntityKind, path: &str) -> Policy {
    Policy::community(Perm::CanEditSpecies, kind, path)
}

fn edit_character(path: &str) -> Policy {
    Policy::own_or_any(
        OwnershipBranch::new(
            EntityKind::Character,
            path,
            Perm::CanEditOwnCharacter,
            Perm::CanEditCharacter,
        )
        .with_orphaned(Perm::CanManageOrphanedCharacters),
    )
}

fn edit_media(path: &str) -> Policy {
    Policy::own_or_any(OwnershipBranch::new(
        EntityKind::Media,
        path,
        Perm::CanEditOwnMedia,
        Perm::CanEditMedia,
    ))
}

/// Build the registry the service runs with.
pub fn default_registry() -> Result<OperationRegistry> {
    OperationRegistry::builder()
        // Communities
        .operation("createCommunity", vec![Policy::global(GlobalPermission::CanCreateCommunity)])
        .operation("updateCommunity", vec![in_community(Perm::CanEditCommunity)])
        .operation(
            "leaveCommunity",
            vec![Policy::member(EntityKind::Community, "communityId")],
        )
        .operation(
            "removeCommunityMember",
            vec![in_community(Perm::CanRemoveCommunityMember)],
        )
        // Roles
        .operation("createRole", vec![in_community(Perm::CanCreateRole)])
        .operation("updateRole", vec![in_community(Perm::CanEditRole)])
        .operation("deleteRole", vec![in_community(Perm::CanEditRole)])
        .operation("addRoleToMember", vec![in_community(Perm::CanManageMemberRoles)])
        .operation(
            "removeRoleFromMember",
            vec![in_community(Perm::CanManageMemberRoles)],
        )
        // Invitations and invite codes
        .operation("createInviteCode", vec![in_community(Perm::CanCreateInviteCode)])
        .operation("listInviteCodes", vec![in_community(Perm::CanListInviteCodes)])
        .operation("createInvitation", vec![in_community(Perm::CanCreateInviteCode)])
        .operation(
            "acceptInvitation",
            vec![Policy::owner(OwnershipKind::ReceivedInvitation, "invitationId")],
        )
        .operation(
            "declineInvitation",
            vec![Policy::owner(OwnershipKind::ReceivedInvitation, "invitationId")],
        )
        .operation(
            "deleteInvitation",
            vec![Policy::any([
                Policy::owner(OwnershipKind::Invitation, "invitationId"),
                Policy::community(
                    Perm::CanCreateInviteCode,
                    EntityKind::Invitation,
                    "invitationId",
                ),
            ])],
        )
        .operation(
            "viewInvitation",
            vec![Policy::owner_by_reference(
                "",
                [OwnershipKind::Invitation, OwnershipKind::ReceivedInvitation],
            )],
        )
        // Species and their trait structure
        .operation("createSpecies", vec![in_community(Perm::CanCreateSpecies)])
        .operation("updateSpecies", vec![edit_species_via(EntityKind::Species, "id")])
        .operation("deleteSpecies", vec![edit_species_via(EntityKind::Species, "id")])
        .operation(
            "createSpeciesVariant",
            vec![edit_species_via(EntityKind::Species, "speciesId")],
        )
        .operation(
            "updateSpeciesVariant",
            vec![edit_species_via(EntityKind::SpeciesVariant, "id")],
        )
        .operation(
            "deleteSpeciesVariant",
            vec![edit_species_via(EntityKind::SpeciesVariant, "id")],
        )
        .operation("createTrait", vec![edit_species_via(EntityKind::Species, "speciesId")])
        .operation("updateTrait", vec![edit_species_via(EntityKind::Trait, "id")])
        .operation("deleteTrait", vec![edit_species_via(EntityKind::Trait, "id")])
        .operation("createEnumValue", vec![edit_species_via(EntityKind::Trait, "traitId")])
        .operation("updateEnumValue", vec![edit_species_via(EntityKind::EnumValue, "id")])
        .operation("deleteEnumValue", vec![edit_species_via(EntityKind::EnumValue, "id")])
        .operation(
            "createEnumValueSetting",
            vec![
                edit_species_via(EntityKind::EnumValue, "enumValueId"),
                edit_species_via(EntityKind::SpeciesVariant, "speciesVariantId"),
            ],
        )
        .operation(
            "updateEnumValueSetting",
            vec![edit_species_via(EntityKind::EnumValueSetting, "id")],
        )
        .operation(
            "deleteEnumValueSetting",
            vec![edit_species_via(EntityKind::EnumValueSetting, "id")],
        )
        .operation(
            "createTraitListEntry",
            vec![
                edit_species_via(EntityKind::Trait, "traitId"),
                edit_species_via(EntityKind::SpeciesVariant, "speciesVariantId"),
            ],
        )
        .operation(
            "updateTraitListEntry",
            vec![edit_species_via(EntityKind::TraitListEntry, "id")],
        )
        .operation(
            "deleteTraitListEntry",
            vec![edit_species_via(EntityKind::TraitListEntry, "id")],
        )
        // Characters
        .operation("createPersonalCharacter", vec![Policy::Authenticated])
        .operation(
            "createCharacter",
            vec![Policy::community(
                Perm::CanCreateCharacter,
                EntityKind::Species,
                "speciesId",
            )],
        )
        .operation(
            "createOrphanedCharacter",
            vec![Policy::community(
                Perm::CanCreateOrphanedCharacter,
                EntityKind::Species,
                "speciesId",
            )],
        )
        .operation("updateCharacter", vec![edit_character("id")])
        .operation("transferCharacter", vec![edit_character("id")])
        .operation(
            "deleteCharacter",
            vec![Policy::any([
                Policy::owner(OwnershipKind::Character, "id"),
                Policy::community(Perm::CanDeleteCharacter, EntityKind::Character, "id"),
            ])],
        )
        // Media
        .operation("createMedia", vec![Policy::Authenticated])
        .operation("addMediaToCharacter", vec![edit_character("characterId"), edit_media("mediaId")])
        .operation("updateMedia", vec![edit_media("id")])
        .operation("deleteMedia", vec![edit_media("id")])
        // Personal content
        .operation("createGallery", vec![Policy::Authenticated])
        .operation("updateGallery", vec![Policy::owner(OwnershipKind::Gallery, "id")])
        .operation("deleteGallery", vec![Policy::owner(OwnershipKind::Gallery, "id")])
        .operation("uploadImage", vec![Policy::Authenticated])
        .operation("deleteImage", vec![Policy::owner(OwnershipKind::Image, "id")])
        .operation("createComment", vec![Policy::Authenticated])
        .operation("updateComment", vec![Policy::owner(OwnershipKind::Comment, "id")])
        .operation("deleteComment", vec![Policy::owner(OwnershipKind::Comment, "id")])
        // Users
        .operation("listUsers", vec![Policy::global(GlobalPermission::CanListUsers)])
        .operation(
            "updateUser",
            vec![Policy::any([
                Policy::custom(SelfTarget::new("id")),
                Policy::global(GlobalPermission::CanEditUsers),
            ])],
        )
        .operation("deleteUser", vec![Policy::global(GlobalPermission::CanDeleteUsers)])
        // Redactable fields
        .field(
            "Character",
            "pendingOwnership",
            FieldKind::Nullable,
            vec![Policy::community(
                Perm::CanCreateOrphanedCharacter,
                EntityKind::Character,
                "id",
            )],
        )
        .field(
            "Character",
            "pendingOwnerEmail",
            FieldKind::String,
            vec![Policy::community(
                Perm::CanCreateOrphanedCharacter,
                EntityKind::Character,
                "id",
            )],
        )
        .field(
            "Community",
            "inviteCodes",
            FieldKind::List,
            vec![Policy::community(
                Perm::CanListInviteCodes,
                EntityKind::Community,
                "id",
            )],
        )
        .field(
            "Invitation",
            "inviteeEmail",
            FieldKind::Nullable,
            vec![Policy::any([
                Policy::owner(OwnershipKind::Invitation, "id"),
                Policy::community(Perm::CanListInviteCodes, EntityKind::Invitation, "id"),
            ])],
        )
        .field(
            "User",
            "email",
            FieldKind::String,
            vec![Policy::any([
                Policy::custom(SelfTarget::new("id")),
                Policy::global(GlobalPermission::CanListUsers),
            ])],
        )
        .field(
            "User",
            "isAdmin",
            FieldKind::Boolean,
            vec![Policy::global(GlobalPermission::CanListUsers)],
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Principal, StringUuid};
    use serde_json::json;

    #[test]
    fn test_default_registry_builds() {
        let registry = default_registry().unwrap();
        assert!(registry.len() > 40);
        assert!(registry.policies("updateCharacter").is_some());
        assert_eq!(
            registry.field("Character", "pendingOwnerEmail").map(|f| f.kind),
            Some(FieldKind::String)
        );
        assert_eq!(
            registry.field("Character", "pendingOwnership").map(|f| f.kind),
            Some(FieldKind::Nullable)
        );
    }

    #[test]
    fn test_every_operation_declares_a_policy() {
        let registry = default_registry().unwrap();
        for (name, policies) in registry.operations() {
            assert!(!policies.is_empty(), "{} has no policies", name);
        }
    }

    #[tokio::test]
    async fn test_self_target() {
        let me = StringUuid::new_v4();
        let principal = Principal::new(me, "me");
        let policy = SelfTarget::new("id");

        let own = json!({ "id": me.to_string() });
        let ctx = PolicyContext {
            principal: &principal,
            args: &own,
        };
        assert!(policy.check(&ctx).await.unwrap().is_allow());

        let other = json!({ "id": StringUuid::new_v4().to_string() });
        let ctx = PolicyContext {
            principal: &principal,
            args: &other,
        };
        assert!(!policy.check(&ctx).await.unwrap().is_allow());
    }
}
