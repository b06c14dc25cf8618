// Catalog fetch failures.

use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong fetching an entity. The caller treats all of
/// these the same way (show a retry prompt); the variants exist for logs.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog returned status {0}")]
    Status(StatusCode),

    #[error("malformed catalog payload: {0}")]
    Malformed(String),

    #[error("id {id} is outside the catalog range 1..={max_id}")]
    IdOutOfRange { id: u32, max_id: u32 },
}
