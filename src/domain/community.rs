//! Communities, roles and memberships

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Tenant boundary owning roles and scoped content
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Community {
    pub id: StringUuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Default for Community {
    fn default() -> Self {
        Self {
            id: StringUuid::new_v4(),
            name: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// Community-scoped permission flags carried by roles.
///
/// `AnyMembership` is a pseudo-flag: no role stores it. It holds whenever the
/// principal has at least one role in the community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommunityPermission {
    AnyMembership,
    CanCreateSpecies,
    CanEditSpecies,
    CanCreateCharacter,
    CanCreateOrphanedCharacter,
    CanEditCharacter,
    CanEditOwnCharacter,
    CanManageOrphanedCharacters,
    CanDeleteCharacter,
    CanEditMedia,
    CanEditOwnMedia,
    CanCreateRole,
    CanEditRole,
    CanManageMemberRoles,
    CanRemoveCommunityMember,
    CanCreateInviteCode,
    CanListInviteCodes,
    CanEditCommunity,
}

impl CommunityPermission {
    /// Flags stored on roles. Excludes the `AnyMembership` pseudo-flag.
    pub const ROLE_FLAGS: [CommunityPermission; 17] = [
        CommunityPermission::CanCreateSpecies,
        CommunityPermission::CanEditSpecies,
        CommunityPermission::CanCreateCharacter,
        CommunityPermission::CanCreateOrphanedCharacter,
        CommunityPermission::CanEditCharacter,
        CommunityPermission::CanEditOwnCharacter,
        CommunityPermission::CanManageOrphanedCharacters,
        CommunityPermission::CanDeleteCharacter,
        CommunityPermission::CanEditMedia,
        CommunityPermission::CanEditOwnMedia,
        CommunityPermission::CanCreateRole,
        CommunityPermission::CanEditRole,
        CommunityPermission::CanManageMemberRoles,
        CommunityPermission::CanRemoveCommunityMember,
        CommunityPermission::CanCreateInviteCode,
        CommunityPermission::CanListInviteCodes,
        CommunityPermission::CanEditCommunity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityPermission::AnyMembership => "anyMembership",
            CommunityPermission::CanCreateSpecies => "canCreateSpecies",
            CommunityPermission::CanEditSpecies => "canEditSpecies",
            CommunityPermission::CanCreateCharacter => "canCreateCharacter",
            CommunityPermission::CanCreateOrphanedCharacter => "canCreateOrphanedCharacter",
            CommunityPermission::CanEditCharacter => "canEditCharacter",
            CommunityPermission::CanEditOwnCharacter => "canEditOwnCharacter",
            CommunityPermission::CanManageOrphanedCharacters => "canManageOrphanedCharacters",
            CommunityPermission::CanDeleteCharacter => "canDeleteCharacter",
            CommunityPermission::CanEditMedia => "canEditMedia",
            CommunityPermission::CanEditOwnMedia => "canEditOwnMedia",
            CommunityPermission::CanCreateRole => "canCreateRole",
            CommunityPermission::CanEditRole => "canEditRole",
            CommunityPermission::CanManageMemberRoles => "canManageMemberRoles",
            CommunityPermission::CanRemoveCommunityMember => "canRemoveCommunityMember",
            CommunityPermission::CanCreateInviteCode => "canCreateInviteCode",
            CommunityPermission::CanListInviteCodes => "canListInviteCodes",
            CommunityPermission::CanEditCommunity => "canEditCommunity",
        }
    }

    pub fn is_pseudo(&self) -> bool {
        matches!(self, CommunityPermission::AnyMembership)
    }
}

impl std::fmt::Display for CommunityPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommunityPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == CommunityPermission::AnyMembership.as_str() {
            return Ok(CommunityPermission::AnyMembership);
        }
        Self::ROLE_FLAGS
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| format!("Unknown community permission: {}", s))
    }
}

/// Permission columns of a role row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissions {
    pub can_create_species: bool,
    pub can_edit_species: bool,
    pub can_create_character: bool,
    pub can_create_orphaned_character: bool,
    pub can_edit_character: bool,
    pub can_edit_own_character: bool,
    pub can_manage_orphaned_characters: bool,
    pub can_delete_character: bool,
    pub can_edit_media: bool,
    pub can_edit_own_media: bool,
    pub can_create_role: bool,
    pub can_edit_role: bool,
    pub can_manage_member_roles: bool,
    pub can_remove_community_member: bool,
    pub can_create_invite_code: bool,
    pub can_list_invite_codes: bool,
    pub can_edit_community: bool,
}

impl RolePermissions {
    /// Read a stored flag. `AnyMembership` is never stored and reads as false.
    pub fn get(&self, flag: CommunityPermission) -> bool {
        match flag {
            CommunityPermission::AnyMembership => false,
            CommunityPermission::CanCreateSpecies => self.can_create_species,
            CommunityPermission::CanEditSpecies => self.can_edit_species,
            CommunityPermission::CanCreateCharacter => self.can_create_character,
            CommunityPermission::CanCreateOrphanedCharacter => self.can_create_orphaned_character,
            CommunityPermission::CanEditCharacter => self.can_edit_character,
            CommunityPermission::CanEditOwnCharacter => self.can_edit_own_character,
            CommunityPermission::CanManageOrphanedCharacters => {
                self.can_manage_orphaned_characters
            }
            CommunityPermission::CanDeleteCharacter => self.can_delete_character,
            CommunityPermission::CanEditMedia => self.can_edit_media,
            CommunityPermission::CanEditOwnMedia => self.can_edit_own_media,
            CommunityPermission::CanCreateRole => self.can_create_role,
            CommunityPermission::CanEditRole => self.can_edit_role,
            CommunityPermission::CanManageMemberRoles => self.can_manage_member_roles,
            CommunityPermission::CanRemoveCommunityMember => self.can_remove_community_member,
            CommunityPermission::CanCreateInviteCode => self.can_create_invite_code,
            CommunityPermission::CanListInviteCodes => self.can_list_invite_codes,
            CommunityPermission::CanEditCommunity => self.can_edit_community,
        }
    }

    pub fn set(&mut self, flag: CommunityPermission, value: bool) {
        match flag {
            CommunityPermission::AnyMembership => {}
            CommunityPermission::CanCreateSpecies => self.can_create_species = value,
            CommunityPermission::CanEditSpecies => self.can_edit_species = value,
            CommunityPermission::CanCreateCharacter => self.can_create_character = value,
            CommunityPermission::CanCreateOrphanedCharacter => {
                self.can_create_orphaned_character = value
            }
            CommunityPermission::CanEditCharacter => self.can_edit_character = value,
            CommunityPermission::CanEditOwnCharacter => self.can_edit_own_character = value,
            CommunityPermission::CanManageOrphanedCharacters => {
                self.can_manage_orphaned_characters = value
            }
            CommunityPermission::CanDeleteCharacter => self.can_delete_character = value,
            CommunityPermission::CanEditMedia => self.can_edit_media = value,
            CommunityPermission::CanEditOwnMedia => self.can_edit_own_media = value,
            CommunityPermission::CanCreateRole => self.can_create_role = value,
            CommunityPermission::CanEditRole => self.can_edit_role = value,
            CommunityPermission::CanManageMemberRoles => self.can_manage_member_roles = value,
            CommunityPermission::CanRemoveCommunityMember => {
                self.can_remove_community_member = value
            }
            CommunityPermission::CanCreateInviteCode => self.can_create_invite_code = value,
            CommunityPermission::CanListInviteCodes => self.can_list_invite_codes = value,
            CommunityPermission::CanEditCommunity => self.can_edit_community = value,
        }
    }

    /// Flag-wise OR of two permission sets.
    pub fn union(self, other: &RolePermissions) -> RolePermissions {
        let mut out = self;
        for flag in CommunityPermission::ROLE_FLAGS {
            if other.get(flag) {
                out.set(flag, true);
            }
        }
        out
    }

    pub fn with(mut self, flag: CommunityPermission) -> Self {
        self.set(flag, true);
        self
    }

    /// Flags that are set, in declaration order.
    pub fn granted(&self) -> Vec<CommunityPermission> {
        CommunityPermission::ROLE_FLAGS
            .into_iter()
            .filter(|flag| self.get(*flag))
            .collect()
    }
}

/// Role entity. Belongs to exactly one community.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: StringUuid,
    pub community_id: StringUuid,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub permissions: RolePermissions,
}

impl Default for Role {
    fn default() -> Self {
        Self {
            id: StringUuid::new_v4(),
            community_id: StringUuid::nil(),
            name: String::new(),
            permissions: RolePermissions::default(),
        }
    }
}

/// Principal-to-role assignment inside a community.
/// A principal may hold several at once in the same community.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: StringUuid,
    pub user_id: StringUuid,
    pub community_id: StringUuid,
    pub role_id: StringUuid,
    pub joined_at: DateTime<Utc>,
}

/// Effective permissions of one principal in one community
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPermissions {
    #[serde(flatten)]
    pub permissions: RolePermissions,
    pub has_membership: bool,
}

impl CommunityPermissions {
    /// Answer for a single flag. The pseudo-flag is answered by membership.
    pub fn has(&self, flag: CommunityPermission) -> bool {
        match flag {
            CommunityPermission::AnyMembership => self.has_membership,
            other => self.permissions.get(other),
        }
    }
}
