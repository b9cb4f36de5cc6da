//! Ownership resolution: direct foreign-key equality, never inherited

use crate::domain::{EntityKind, EntityRef, OwnershipKind, OwnershipRef, StringUuid};
use crate::error::{AppError, Result};
use crate::repository::EntityRepository;
use serde::Serialize;
use std::sync::Arc;

/// Owner of a single-owner entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "ownerId", rename_all = "camelCase")]
pub enum Ownership {
    Owned(StringUuid),
    /// The row exists but its owner column is null.
    Orphaned,
    NotFound,
}

impl From<Option<Option<StringUuid>>> for Ownership {
    fn from(row: Option<Option<StringUuid>>) -> Self {
        match row {
            Some(Some(owner)) => Ownership::Owned(owner),
            Some(None) => Ownership::Orphaned,
            None => Ownership::NotFound,
        }
    }
}

/// Kinds [`OwnershipResolver::owner_of`] can answer for.
pub const SINGLE_OWNER_KINDS: [EntityKind; 5] = [
    EntityKind::Character,
    EntityKind::Media,
    EntityKind::Gallery,
    EntityKind::Image,
    EntityKind::Comment,
];

pub fn has_single_owner(kind: EntityKind) -> bool {
    SINGLE_OWNER_KINDS.contains(&kind)
}

pub struct OwnershipResolver<E: EntityRepository> {
    repo: Arc<E>,
}

impl<E: EntityRepository> Clone for OwnershipResolver<E> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<E: EntityRepository> OwnershipResolver<E> {
    pub fn new(repo: Arc<E>) -> Self {
        Self { repo }
    }

    /// Whether `principal_id` owns the referenced row under the reference's
    /// predicate. Nonexistent rows are never owned.
    pub async fn is_owner(&self, target: OwnershipRef, principal_id: StringUuid) -> Result<bool> {
        let id = target.id;
        let owned = match target.kind {
            OwnershipKind::Invitation => self
                .repo
                .find_invitation(id)
                .await?
                .is_some_and(|invitation| {
                    invitation.inviter_id == Some(principal_id)
                        || invitation.invitee_id == Some(principal_id)
                }),
            OwnershipKind::ReceivedInvitation => self
                .repo
                .find_invitation(id)
                .await?
                .is_some_and(|invitation| invitation.invitee_id == Some(principal_id)),
            _ => matches!(
                self.owner_of(target.entity()).await?,
                Ownership::Owned(owner) if owner == principal_id
            ),
        };

        tracing::trace!(target_kind = ?target.kind, target_id = %id, principal_id = %principal_id, owned, "ownership check");
        Ok(owned)
    }

    /// Read the single owner of `entity`.
    ///
    /// Only kinds with one owner column qualify; anything else is a
    /// configuration error on the caller's side.
    pub async fn owner_of(&self, entity: EntityRef) -> Result<Ownership> {
        let id = entity.id;
        let ownership = match entity.kind {
            EntityKind::Character => self
                .repo
                .find_character(id)
                .await?
                .map(|character| character.owner_id),
            EntityKind::Media => self.repo.find_media(id).await?.map(|media| media.owner_id),
            EntityKind::Gallery => self
                .repo
                .find_gallery(id)
                .await?
                .map(|gallery| gallery.owner_id),
            EntityKind::Image => self
                .repo
                .find_image(id)
                .await?
                .map(|image| image.uploader_id),
            EntityKind::Comment => self
                .repo
                .find_comment(id)
                .await?
                .map(|comment| comment.author_id),
            other => {
                return Err(AppError::Misconfigured(format!(
                    "{} has no single owner",
                    other
                )))
            }
        };

        Ok(ownership.into())
    }
}
