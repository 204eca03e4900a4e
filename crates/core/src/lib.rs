//! `classifieds-core`: identifiers and error primitives shared by every layer.
//!
//! This crate contains no infrastructure or transport concerns.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{AdvertisementId, UserId};
