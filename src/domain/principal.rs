//! Authenticated principals and their site-wide permission flags

use super::common::StringUuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Site-wide permission flags. They live on the user row, not on roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlobalPermission {
    /// Satisfies every policy.
    IsAdmin,
    CanCreateCommunity,
    CanListUsers,
    CanEditUsers,
    CanDeleteUsers,
}

impl GlobalPermission {
    pub const ALL: [GlobalPermission; 5] = [
        GlobalPermission::IsAdmin,
        GlobalPermission::CanCreateCommunity,
        GlobalPermission::CanListUsers,
        GlobalPermission::CanEditUsers,
        GlobalPermission::CanDeleteUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalPermission::IsAdmin => "isAdmin",
            GlobalPermission::CanCreateCommunity => "canCreateCommunity",
            GlobalPermission::CanListUsers => "canListUsers",
            GlobalPermission::CanEditUsers => "canEditUsers",
            GlobalPermission::CanDeleteUsers => "canDeleteUsers",
        }
    }
}

impl std::fmt::Display for GlobalPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GlobalPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| format!("Unknown global permission: {}", s))
    }
}

/// Global permission columns of a user row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPermissions {
    pub is_admin: bool,
    pub can_create_community: bool,
    pub can_list_users: bool,
    pub can_edit_users: bool,
    pub can_delete_users: bool,
}

impl GlobalPermissions {
    pub fn get(&self, flag: GlobalPermission) -> bool {
        match flag {
            GlobalPermission::IsAdmin => self.is_admin,
            GlobalPermission::CanCreateCommunity => self.can_create_community,
            GlobalPermission::CanListUsers => self.can_list_users,
            GlobalPermission::CanEditUsers => self.can_edit_users,
            GlobalPermission::CanDeleteUsers => self.can_delete_users,
        }
    }

    pub fn set(&mut self, flag: GlobalPermission, value: bool) {
        match flag {
            GlobalPermission::IsAdmin => self.is_admin = value,
            GlobalPermission::CanCreateCommunity => self.can_create_community = value,
            GlobalPermission::CanListUsers => self.can_list_users = value,
            GlobalPermission::CanEditUsers => self.can_edit_users = value,
            GlobalPermission::CanDeleteUsers => self.can_delete_users = value,
        }
    }

    /// Builder-style helper, mostly for fixtures.
    pub fn with(mut self, flag: GlobalPermission) -> Self {
        self.set(flag, true);
        self
    }
}

/// The authenticated actor of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Principal {
    pub id: StringUuid,
    pub username: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub permissions: GlobalPermissions,
}

impl Principal {
    pub fn new(id: StringUuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            permissions: GlobalPermissions::default(),
        }
    }

    pub fn with_permission(mut self, flag: GlobalPermission) -> Self {
        self.permissions.set(flag, true);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.is_admin
    }
}
