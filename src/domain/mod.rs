//! Domain models for the authorization core

pub mod common;
pub mod community;
pub mod entity;
pub mod principal;

pub use common::StringUuid;
pub use community::*;
pub use entity::*;
pub use principal::*;
