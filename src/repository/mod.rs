//! Read-only data access layer (Repository pattern)
//!
//! The authorization core never writes. Each trait is the read contract one
//! resolver depends on.

pub mod entity;
pub mod membership;
pub mod principal;

pub use entity::EntityRepository;
pub use membership::MembershipRepository;
pub use principal::PrincipalRepository;

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;

/// Open the MySQL pool backing the sqlx repositories.
pub async fn connect(config: &DatabaseConfig) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await?;
    Ok(pool)
}
