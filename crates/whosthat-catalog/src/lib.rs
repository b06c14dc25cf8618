// Remote catalog access: fetch one entity by id and map it into the domain.

pub mod client;
pub mod error;
pub mod payload;

pub use client::{CatalogClient, PokeApiClient};
pub use error::NetworkError;
