// Service exports
pub mod location_store;
pub mod memory;
pub mod postgres;
pub mod seed;

pub use location_store::{LocationStore, MatchDirectory, PrivacyDirectory};
pub use memory::{InMemoryDirectory, InMemoryLocationStore};
pub use postgres::PostgresClient;
pub use seed::SeedData;
