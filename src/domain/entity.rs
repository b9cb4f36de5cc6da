//! Community-scoped content and the references policies use to point at it

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

// ==================== Resolution-chain entities ====================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Species {
    pub id: StringUuid,
    pub community_id: StringUuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SpeciesVariant {
    pub id: StringUuid,
    pub species_id: StringUuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trait {
    pub id: StringUuid,
    pub species_id: StringUuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnumValue {
    pub id: StringUuid,
    pub trait_id: StringUuid,
    pub name: String,
}

/// Per-variant setting of an enum value
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnumValueSetting {
    pub id: StringUuid,
    pub enum_value_id: StringUuid,
    pub species_variant_id: StringUuid,
}

/// A trait listed on a species variant
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TraitListEntry {
    pub id: StringUuid,
    pub trait_id: StringUuid,
    pub species_variant_id: StringUuid,
    pub order: i32,
}

// ==================== Owned content ====================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Character {
    pub id: StringUuid,
    pub name: String,
    /// None means the character is orphaned
    pub owner_id: Option<StringUuid>,
    /// None means the character is outside any community
    pub species_id: Option<StringUuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Media {
    pub id: StringUuid,
    pub owner_id: Option<StringUuid>,
    pub character_id: Option<StringUuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gallery {
    pub id: StringUuid,
    pub owner_id: Option<StringUuid>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: StringUuid,
    pub uploader_id: Option<StringUuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: StringUuid,
    pub author_id: Option<StringUuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: StringUuid,
    pub community_id: StringUuid,
    pub inviter_id: Option<StringUuid>,
    pub invitee_id: Option<StringUuid>,
    pub created_at: DateTime<Utc>,
}

// ==================== References ====================

/// Every kind of row a policy can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Community,
    Species,
    SpeciesVariant,
    Trait,
    EnumValue,
    EnumValueSetting,
    TraitListEntry,
    Character,
    Media,
    Gallery,
    Image,
    Comment,
    Invitation,
}

impl EntityKind {
    pub const ALL: [EntityKind; 13] = [
        EntityKind::Community,
        EntityKind::Species,
        EntityKind::SpeciesVariant,
        EntityKind::Trait,
        EntityKind::EnumValue,
        EntityKind::EnumValueSetting,
        EntityKind::TraitListEntry,
        EntityKind::Character,
        EntityKind::Media,
        EntityKind::Gallery,
        EntityKind::Image,
        EntityKind::Comment,
        EntityKind::Invitation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Community => "community",
            EntityKind::Species => "species",
            EntityKind::SpeciesVariant => "speciesVariant",
            EntityKind::Trait => "trait",
            EntityKind::EnumValue => "enumValue",
            EntityKind::EnumValueSetting => "enumValueSetting",
            EntityKind::TraitListEntry => "traitListEntry",
            EntityKind::Character => "character",
            EntityKind::Media => "media",
            EntityKind::Gallery => "gallery",
            EntityKind::Image => "image",
            EntityKind::Comment => "comment",
            EntityKind::Invitation => "invitation",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown entity kind: {}", s))
    }
}

/// Tagged reference to a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: StringUuid,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: StringUuid) -> Self {
        Self { kind, id }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// What "owning" means for a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OwnershipKind {
    /// `owner_id`
    Character,
    /// `owner_id`
    Media,
    /// `owner_id`
    Gallery,
    /// `uploader_id`
    Image,
    /// `author_id`
    Comment,
    /// Inviter or invitee
    Invitation,
    /// Invitee only
    ReceivedInvitation,
}

impl OwnershipKind {
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            OwnershipKind::Character => EntityKind::Character,
            OwnershipKind::Media => EntityKind::Media,
            OwnershipKind::Gallery => EntityKind::Gallery,
            OwnershipKind::Image => EntityKind::Image,
            OwnershipKind::Comment => EntityKind::Comment,
            OwnershipKind::Invitation | OwnershipKind::ReceivedInvitation => {
                EntityKind::Invitation
            }
        }
    }

    /// Key naming this kind inside a reference object.
    pub fn reference_key(&self) -> &'static str {
        match self {
            OwnershipKind::Character => "characterId",
            OwnershipKind::Media => "mediaId",
            OwnershipKind::Gallery => "galleryId",
            OwnershipKind::Image => "imageId",
            OwnershipKind::Comment => "commentId",
            OwnershipKind::Invitation => "invitationId",
            OwnershipKind::ReceivedInvitation => "receivedInvitationId",
        }
    }
}

/// What a reference object resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceMatch {
    /// No accepted key holds an id.
    Missing,
    Found(OwnershipRef),
    /// More than one accepted key holds an id.
    Ambiguous,
}

/// Reference to a row together with the ownership predicate to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnershipRef {
    pub kind: OwnershipKind,
    pub id: StringUuid,
}

impl OwnershipRef {
    pub fn new(kind: OwnershipKind, id: StringUuid) -> Self {
        Self { kind, id }
    }

    /// Pick the ownership predicate from the single accepted key that is set.
    ///
    /// Keys of kinds outside `accepted` are ignored. Keys holding `null` or a
    /// non-UUID count as unset.
    pub fn from_reference(value: &Value, accepted: &[OwnershipKind]) -> ReferenceMatch {
        let Some(object) = value.as_object() else {
            return ReferenceMatch::Missing;
        };
        let mut populated = accepted.iter().filter_map(|kind| {
            object
                .get(kind.reference_key())
                .and_then(StringUuid::from_json)
                .map(|id| OwnershipRef::new(*kind, id))
        });
        match (populated.next(), populated.next()) {
            (None, _) => ReferenceMatch::Missing,
            (Some(reference), None) => ReferenceMatch::Found(reference),
            (Some(_), Some(_)) => ReferenceMatch::Ambiguous,
        }
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.kind.entity_kind(), self.id)
    }
}
