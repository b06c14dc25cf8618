// Transport shape of a catalog entry and its mapping into `GuessableEntity`.
//
// Only the fields the game needs are declared; serde ignores the rest of the
// (large) response. Keeping the wire shape here means changes to the remote
// API stop at this file.

use serde::Deserialize;
use whosthat_core::entity::GuessableEntity;

use crate::error::NetworkError;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogResponse {
    pub id: u32,
    pub name: String,
    pub sprites: Sprites,
    pub types: Vec<TypeSlot>,
    pub abilities: Vec<AbilitySlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sprites {
    pub other: OtherSprites,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork")]
    pub official_artwork: Artwork,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artwork {
    /// Null for a handful of entries upstream.
    pub front_default: Option<String>,
}

/// `{ "type": { "name": "fire" } }`
#[derive(Debug, Clone, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

/// `{ "ability": { "name": "blaze" } }`
#[derive(Debug, Clone, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
}

impl CatalogResponse {
    /// Parse a raw response body.
    pub fn parse(body: &str) -> Result<Self, NetworkError> {
        serde_json::from_str(body).map_err(|e| NetworkError::Malformed(e.to_string()))
    }

    /// Flatten the nested transport lists and build a hidden entity.
    pub fn into_entity(self) -> Result<GuessableEntity, NetworkError> {
        if self.id == 0 {
            return Err(NetworkError::Malformed("entity id is 0".into()));
        }
        if self.name.trim().is_empty() {
            return Err(NetworkError::Malformed(format!(
                "entity {} has an empty name",
                self.id
            )));
        }
        let image = self
            .sprites
            .other
            .official_artwork
            .front_default
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                NetworkError::Malformed(format!("entity {} has no official artwork", self.id))
            })?;

        let categories = self.types.into_iter().map(|t| t.kind.name).collect();
        let traits = self.abilities.into_iter().map(|a| a.ability.name).collect();

        Ok(GuessableEntity::new(self.id, self.name, image, categories, traits))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
