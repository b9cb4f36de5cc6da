//! Integration test infrastructure
//!
//! In-memory repositories standing in for the MySQL stores, plus a small
//! fixture that seeds communities, content and role grants.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use menagerie_authz::config::PolicyConfig;
use menagerie_authz::domain::{
    Character, Comment, Community, CommunityPermission, EnumValue, EnumValueSetting, Gallery,
    Image, Invitation, Media, Membership, Principal, Role, RolePermissions, Species,
    SpeciesVariant, StringUuid, Trait, TraitListEntry,
};
use menagerie_authz::error::Result;
use menagerie_authz::policy::{catalog, OperationRegistry, PolicyEngine};
use menagerie_authz::repository::{EntityRepository, MembershipRepository, PrincipalRepository};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Test Repository Implementations
// ============================================================================

#[derive(Default)]
pub struct TestMembershipRepository {
    roles: RwLock<Vec<Role>>,
    memberships: RwLock<Vec<Membership>>,
}

impl TestMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_role(&self, role: Role) {
        self.roles.write().await.push(role);
    }

    pub async fn add_membership(&self, membership: Membership) {
        self.memberships.write().await.push(membership);
    }

    pub async fn clear(&self) {
        self.roles.write().await.clear();
        self.memberships.write().await.clear();
    }
}

#[async_trait]
impl MembershipRepository for TestMembershipRepository {
    async fn find_member_roles(
        &self,
        user_id: StringUuid,
        community_id: StringUuid,
    ) -> Result<Vec<Role>> {
        let memberships = self.memberships.read().await;
        let roles = self.roles.read().await;
        Ok(memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.community_id == community_id)
            .filter_map(|m| {
                roles
                    .iter()
                    .find(|r| r.id == m.role_id && r.community_id == community_id)
                    .cloned()
            })
            .collect())
    }
}

#[derive(Default)]
pub struct TestEntityRepository {
    pub communities: RwLock<Vec<Community>>,
    pub species: RwLock<Vec<Species>>,
    pub species_variants: RwLock<Vec<SpeciesVariant>>,
    pub traits: RwLock<Vec<Trait>>,
    pub enum_values: RwLock<Vec<EnumValue>>,
    pub enum_value_settings: RwLock<Vec<EnumValueSetting>>,
    pub trait_list_entries: RwLock<Vec<TraitListEntry>>,
    pub characters: RwLock<Vec<Character>>,
    pub media: RwLock<Vec<Media>>,
    pub galleries: RwLock<Vec<Gallery>>,
    pub images: RwLock<Vec<Image>>,
    pub comments: RwLock<Vec<Comment>>,
    pub invitations: RwLock<Vec<Invitation>>,
}

impl TestEntityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

macro_rules! find_in {
    ($table:expr, $id:expr) => {
        Ok($table.read().await.iter().find(|row| row.id == $id).cloned())
    };
}

#[async_trait]
impl EntityRepository for TestEntityRepository {
    async fn find_community(&self, id: StringUuid) -> Result<Option<Community>> {
        find_in!(self.communities, id)
    }

    async fn find_species(&self, id: StringUuid) -> Result<Option<Species>> {
        find_in!(self.species, id)
    }

    async fn find_species_variant(&self, id: StringUuid) -> Result<Option<SpeciesVariant>> {
        find_in!(self.species_variants, id)
    }

    async fn find_trait(&self, id: StringUuid) -> Result<Option<Trait>> {
        find_in!(self.traits, id)
    }

    async fn find_enum_value(&self, id: StringUuid) -> Result<Option<EnumValue>> {
        find_in!(self.enum_values, id)
    }

    async fn find_enum_value_setting(&self, id: StringUuid) -> Result<Option<EnumValueSetting>> {
        find_in!(self.enum_value_settings, id)
    }

    async fn find_trait_list_entry(&self, id: StringUuid) -> Result<Option<TraitListEntry>> {
        find_in!(self.trait_list_entries, id)
    }

    async fn find_character(&self, id: StringUuid) -> Result<Option<Character>> {
        find_in!(self.characters, id)
    }

    async fn find_media(&self, id: StringUuid) -> Result<Option<Media>> {
        find_in!(self.media, id)
    }

    async fn find_gallery(&self, id: StringUuid) -> Result<Option<Gallery>> {
        find_in!(self.galleries, id)
    }

    async fn find_image(&self, id: StringUuid) -> Result<Option<Image>> {
        find_in!(self.images, id)
    }

    async fn find_comment(&self, id: StringUuid) -> Result<Option<Comment>> {
        find_in!(self.comments, id)
    }

    async fn find_invitation(&self, id: StringUuid) -> Result<Option<Invitation>> {
        find_in!(self.invitations, id)
    }
}

#[derive(Default)]
pub struct TestPrincipalRepository {
    principals: RwLock<Vec<Principal>>,
}

impl TestPrincipalRepository {
    pub async fn add(&self, principal: Principal) {
        self.principals.write().await.push(principal);
    }
}

#[async_trait]
impl PrincipalRepository for TestPrincipalRepository {
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Principal>> {
        find_in!(self.principals, id)
    }
}

// ============================================================================
// Fixture
// ============================================================================

pub type TestEngine = PolicyEngine<TestMembershipRepository, TestEntityRepository>;

pub struct Fixture {
    pub memberships: Arc<TestMembershipRepository>,
    pub entities: Arc<TestEntityRepository>,
    pub engine: TestEngine,
}

impl Fixture {
    /// Engine running the platform catalog in strict mode.
    pub fn new() -> Self {
        Self::with(
            catalog::default_registry().expect("catalog builds"),
            PolicyConfig::default(),
        )
    }

    pub fn with(registry: OperationRegistry, config: PolicyConfig) -> Self {
        let memberships = Arc::new(TestMembershipRepository::new());
        let entities = Arc::new(TestEntityRepository::new());
        let engine = PolicyEngine::new(
            memberships.clone(),
            entities.clone(),
            Arc::new(registry),
            config,
        );
        Self {
            memberships,
            entities,
            engine,
        }
    }

    pub async fn community(&self) -> StringUuid {
        let community = Community {
            name: "Gryphon Keepers".to_string(),
            ..Default::default()
        };
        let id = community.id;
        self.entities.communities.write().await.push(community);
        id
    }

    pub async fn species(&self, community_id: StringUuid) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities.species.write().await.push(Species {
            id,
            community_id,
            name: "Gryphon".to_string(),
        });
        id
    }

    pub async fn species_variant(&self, species_id: StringUuid) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities.species_variants.write().await.push(SpeciesVariant {
            id,
            species_id,
            name: "Snowy".to_string(),
        });
        id
    }

    pub async fn trait_of(&self, species_id: StringUuid) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities.traits.write().await.push(Trait {
            id,
            species_id,
            name: "Plumage".to_string(),
        });
        id
    }

    pub async fn enum_value(&self, trait_id: StringUuid) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities.enum_values.write().await.push(EnumValue {
            id,
            trait_id,
            name: "Speckled".to_string(),
        });
        id
    }

    pub async fn enum_value_setting(
        &self,
        enum_value_id: StringUuid,
        species_variant_id: StringUuid,
    ) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities
            .enum_value_settings
            .write()
            .await
            .push(EnumValueSetting {
                id,
                enum_value_id,
                species_variant_id,
            });
        id
    }

    pub async fn trait_list_entry(
        &self,
        trait_id: StringUuid,
        species_variant_id: StringUuid,
    ) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities
            .trait_list_entries
            .write()
            .await
            .push(TraitListEntry {
                id,
                trait_id,
                species_variant_id,
                order: 1,
            });
        id
    }

    pub async fn character(
        &self,
        owner_id: Option<StringUuid>,
        species_id: Option<StringUuid>,
    ) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities.characters.write().await.push(Character {
            id,
            name: "Pip".to_string(),
            owner_id,
            species_id,
            created_at: Utc::now(),
        });
        id
    }

    pub async fn media(
        &self,
        owner_id: Option<StringUuid>,
        character_id: Option<StringUuid>,
    ) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities.media.write().await.push(Media {
            id,
            owner_id,
            character_id,
            created_at: Utc::now(),
        });
        id
    }

    pub async fn gallery(&self, owner_id: Option<StringUuid>) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities.galleries.write().await.push(Gallery {
            id,
            owner_id,
            name: "Sketches".to_string(),
        });
        id
    }

    pub async fn invitation(
        &self,
        community_id: StringUuid,
        inviter_id: StringUuid,
        invitee_id: StringUuid,
    ) -> StringUuid {
        let id = StringUuid::new_v4();
        self.entities.invitations.write().await.push(Invitation {
            id,
            community_id,
            inviter_id: Some(inviter_id),
            invitee_id: Some(invitee_id),
            created_at: Utc::now(),
        });
        id
    }

    /// Give `user_id` a new role in `community_id` carrying `flags`.
    pub async fn grant(
        &self,
        user_id: StringUuid,
        community_id: StringUuid,
        flags: &[CommunityPermission],
    ) -> StringUuid {
        let permissions = flags
            .iter()
            .fold(RolePermissions::default(), |acc, flag| acc.with(*flag));
        let role = Role {
            community_id,
            name: "Keeper".to_string(),
            permissions,
            ..Default::default()
        };
        let role_id = role.id;
        self.memberships.add_role(role).await;
        self.memberships
            .add_membership(Membership {
                id: StringUuid::new_v4(),
                user_id,
                community_id,
                role_id,
                joined_at: Utc::now(),
            })
            .await;
        role_id
    }
}

pub fn user(name: &str) -> Principal {
    Principal::new(StringUuid::new_v4(), name)
}
