//! Entity-to-community resolution
//!
//! Every entity kind maps to exactly one hop in [`CommunityResolver::step`].
//! Chain kinds hop to their parent until something names a community, hits a
//! null foreign key, or points at a row that does not exist.

use crate::domain::{EntityKind, EntityRef, StringUuid};
use crate::error::{AppError, Result};
use crate::repository::EntityRepository;
use serde::Serialize;
use std::sync::Arc;

/// Longest chain walked: EnumValueSetting -> EnumValue -> Trait -> Species.
pub const MAX_CHAIN_DEPTH: usize = 4;

/// Outcome of walking an entity's chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "communityId", rename_all = "camelCase")]
pub enum CommunityResolution {
    /// The entity lives inside this community.
    Scoped(StringUuid),
    /// The entity exists but sits outside any community.
    Unscoped,
    /// The entity, or a row on its chain, does not exist.
    NotFound,
}

impl CommunityResolution {
    pub fn community_id(&self) -> Option<StringUuid> {
        match self {
            CommunityResolution::Scoped(id) => Some(*id),
            _ => None,
        }
    }
}

/// Result of a single lookup on the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hop {
    Community(StringUuid),
    Parent(EntityRef),
    NoCommunity,
    Missing,
}

impl Hop {
    fn parent(kind: EntityKind, id: StringUuid) -> Self {
        Hop::Parent(EntityRef::new(kind, id))
    }

    fn parent_or_none(kind: EntityKind, id: Option<StringUuid>) -> Self {
        match id {
            Some(id) => Hop::parent(kind, id),
            None => Hop::NoCommunity,
        }
    }
}

pub struct CommunityResolver<E: EntityRepository> {
    repo: Arc<E>,
}

impl<E: EntityRepository> Clone for CommunityResolver<E> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<E: EntityRepository> CommunityResolver<E> {
    pub fn new(repo: Arc<E>) -> Self {
        Self { repo }
    }

    /// Walk `entity`'s chain up to its community.
    ///
    /// A null foreign key anywhere on the chain yields
    /// [`CommunityResolution::Unscoped`]; a dangling id yields
    /// [`CommunityResolution::NotFound`]. Store faults propagate.
    pub async fn resolve_community(&self, entity: EntityRef) -> Result<CommunityResolution> {
        let mut current = entity;
        for _ in 0..MAX_CHAIN_DEPTH {
            match self.step(current).await? {
                Hop::Community(id) => {
                    tracing::trace!(entity = %entity, community_id = %id, "resolved community");
                    return Ok(CommunityResolution::Scoped(id));
                }
                Hop::Parent(parent) => current = parent,
                Hop::NoCommunity => return Ok(CommunityResolution::Unscoped),
                Hop::Missing => {
                    tracing::debug!(entity = %entity, missing = %current, "chain hit a missing row");
                    return Ok(CommunityResolution::NotFound);
                }
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "community chain for {} exceeds {} hops",
            entity,
            MAX_CHAIN_DEPTH
        )))
    }

    /// The dispatch table: one lookup per entity kind.
    async fn step(&self, entity: EntityRef) -> Result<Hop> {
        let id = entity.id;
        let hop = match entity.kind {
            EntityKind::Community => self
                .repo
                .find_community(id)
                .await?
                .map(|community| Hop::Community(community.id)),
            EntityKind::Species => self
                .repo
                .find_species(id)
                .await?
                .map(|species| Hop::Community(species.community_id)),
            EntityKind::SpeciesVariant => self
                .repo
                .find_species_variant(id)
                .await?
                .map(|variant| Hop::parent(EntityKind::Species, variant.species_id)),
            EntityKind::Trait => self
                .repo
                .find_trait(id)
                .await?
                .map(|t| Hop::parent(EntityKind::Species, t.species_id)),
            EntityKind::EnumValue => self
                .repo
                .find_enum_value(id)
                .await?
                .map(|value| Hop::parent(EntityKind::Trait, value.trait_id)),
            EntityKind::EnumValueSetting => self
                .repo
                .find_enum_value_setting(id)
                .await?
                .map(|setting| Hop::parent(EntityKind::EnumValue, setting.enum_value_id)),
            EntityKind::TraitListEntry => self
                .repo
                .find_trait_list_entry(id)
                .await?
                .map(|entry| Hop::parent(EntityKind::Trait, entry.trait_id)),
            EntityKind::Character => self
                .repo
                .find_character(id)
                .await?
                .map(|character| Hop::parent_or_none(EntityKind::Species, character.species_id)),
            EntityKind::Media => self
                .repo
                .find_media(id)
                .await?
                .map(|media| Hop::parent_or_none(EntityKind::Character, media.character_id)),
            EntityKind::Invitation => self
                .repo
                .find_invitation(id)
                .await?
                .map(|invitation| Hop::Community(invitation.community_id)),
            EntityKind::Gallery => self.repo.find_gallery(id).await?.map(|_| Hop::NoCommunity),
            EntityKind::Image => self.repo.find_image(id).await?.map(|_| Hop::NoCommunity),
            EntityKind::Comment => self.repo.find_comment(id).await?.map(|_| Hop::NoCommunity),
        };

        Ok(hop.unwrap_or(Hop::Missing))
    }
}
