//! Read-only resolvers the policy layer is built from

pub mod community;
pub mod ownership;
pub mod permission;

pub use community::{CommunityResolution, CommunityResolver, MAX_CHAIN_DEPTH};
pub use ownership::{has_single_owner, Ownership, OwnershipResolver, SINGLE_OWNER_KINDS};
pub use permission::{
    aggregate_roles, has_global_permission, has_global_permission_named, PermissionAggregator,
};
