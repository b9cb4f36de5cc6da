//! Entity repository: owner columns and chain foreign keys, by id

use crate::domain::{
    Character, Comment, Community, EnumValue, EnumValueSetting, Gallery, Image, Invitation,
    Media, Species, SpeciesVariant, StringUuid, Trait, TraitListEntry,
};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{FromRow, MySqlPool};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityRepository: Send + Sync {
    async fn find_community(&self, id: StringUuid) -> Result<Option<Community>>;
    async fn find_species(&self, id: StringUuid) -> Result<Option<Species>>;
    async fn find_species_variant(&self, id: StringUuid) -> Result<Option<SpeciesVariant>>;
    async fn find_trait(&self, id: StringUuid) -> Result<Option<Trait>>;
    async fn find_enum_value(&self, id: StringUuid) -> Result<Option<EnumValue>>;
    async fn find_enum_value_setting(&self, id: StringUuid) -> Result<Option<EnumValueSetting>>;
    async fn find_trait_list_entry(&self, id: StringUuid) -> Result<Option<TraitListEntry>>;
    async fn find_character(&self, id: StringUuid) -> Result<Option<Character>>;
    async fn find_media(&self, id: StringUuid) -> Result<Option<Media>>;
    async fn find_gallery(&self, id: StringUuid) -> Result<Option<Gallery>>;
    async fn find_image(&self, id: StringUuid) -> Result<Option<Image>>;
    async fn find_comment(&self, id: StringUuid) -> Result<Option<Comment>>;
    async fn find_invitation(&self, id: StringUuid) -> Result<Option<Invitation>>;
}

pub struct EntityRepositoryImpl {
    pool: MySqlPool,
}

impl EntityRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id<T>(&self, sql: &str, id: StringUuid) -> Result<Option<T>>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let row = sqlx::query_as::<_, T>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl EntityRepository for EntityRepositoryImpl {
    async fn find_community(&self, id: StringUuid) -> Result<Option<Community>> {
        self.fetch_by_id("SELECT id, name, created_at FROM communities WHERE id = ?", id)
            .await
    }

    async fn find_species(&self, id: StringUuid) -> Result<Option<Species>> {
        self.fetch_by_id(
            "SELECT id, community_id, name FROM species WHERE id = ?",
            id,
        )
        .await
    }

    async fn find_species_variant(&self, id: StringUuid) -> Result<Option<SpeciesVariant>> {
        self.fetch_by_id(
            "SELECT id, species_id, name FROM species_variants WHERE id = ?",
            id,
        )
        .await
    }

    async fn find_trait(&self, id: StringUuid) -> Result<Option<Trait>> {
        self.fetch_by_id("SELECT id, species_id, name FROM traits WHERE id = ?", id)
            .await
    }

    async fn find_enum_value(&self, id: StringUuid) -> Result<Option<EnumValue>> {
        self.fetch_by_id(
            "SELECT id, trait_id, name FROM enum_values WHERE id = ?",
            id,
        )
        .await
    }

    async fn find_enum_value_setting(&self, id: StringUuid) -> Result<Option<EnumValueSetting>> {
        self.fetch_by_id(
            "SELECT id, enum_value_id, species_variant_id FROM enum_value_settings WHERE id = ?",
            id,
        )
        .await
    }

    async fn find_trait_list_entry(&self, id: StringUuid) -> Result<Option<TraitListEntry>> {
        self.fetch_by_id(
            "SELECT id, trait_id, species_variant_id, `order` FROM trait_list_entries WHERE id = ?",
            id,
        )
        .await
    }

    async fn find_character(&self, id: StringUuid) -> Result<Option<Character>> {
        self.fetch_by_id(
            "SELECT id, name, owner_id, species_id, created_at FROM characters WHERE id = ?",
            id,
        )
        .await
    }

    async fn find_media(&self, id: StringUuid) -> Result<Option<Media>> {
        self.fetch_by_id(
            "SELECT id, owner_id, character_id, created_at FROM media WHERE id = ?",
            id,
        )
        .await
    }

    async fn find_gallery(&self, id: StringUuid) -> Result<Option<Gallery>> {
        self.fetch_by_id("SELECT id, owner_id, name FROM galleries WHERE id = ?", id)
            .await
    }

    async fn find_image(&self, id: StringUuid) -> Result<Option<Image>> {
        self.fetch_by_id(
            "SELECT id, uploader_id, created_at FROM images WHERE id = ?",
            id,
        )
        .await
    }

    async fn find_comment(&self, id: StringUuid) -> Result<Option<Comment>> {
        self.fetch_by_id(
            "SELECT id, author_id, created_at FROM comments WHERE id = ?",
            id,
        )
        .await
    }

    async fn find_invitation(&self, id: StringUuid) -> Result<Option<Invitation>> {
        self.fetch_by_id(
            "SELECT id, community_id, inviter_id, invitee_id, created_at FROM invitations WHERE id = ?",
            id,
        )
        .await
    }
}
