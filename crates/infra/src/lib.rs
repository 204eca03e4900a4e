//! Infrastructure layer: configuration and persistence.

pub mod config;
pub mod store;

pub use config::{AdminBootstrap, AppConfig, ConfigError};
pub use store::{
    Advertisement, AdvertisementChanges, AdvertisementFilter, AdvertisementRepository,
    InMemoryStore, NewAdvertisement, NewUser, PostgresStore, Store, StoreError, StoreResult,
    UserChanges, UserRecord, UserRepository,
};
