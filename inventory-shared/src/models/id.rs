/// Document identifiers
///
/// Every stored document is keyed by a [`DocumentId`]: 12 bytes rendered as
/// 24 lowercase hex characters. The first 4 bytes are the big-endian creation
/// time in unix seconds, the remaining 8 are random, so ids sort roughly by
/// creation time.
///
/// # Example
///
/// ```
/// use inventory_shared::models::id::DocumentId;
///
/// let id = DocumentId::new();
/// let parsed: DocumentId = id.as_str().parse().unwrap();
/// assert_eq!(id, parsed);
///
/// assert!("not-an-id".parse::<DocumentId>().is_err());
/// ```
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Number of hex characters in a rendered id
pub const DOCUMENT_ID_LEN: usize = 24;

/// Error returned when a string is not a well-formed [`DocumentId`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid document id: {0:?}")]
pub struct InvalidDocumentId(pub String);

/// Opaque 24-hex-character document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generates a new id from the current time and 8 random bytes
    pub fn new() -> Self {
        let mut bytes = [0u8; 12];
        let seconds = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[4..]);

        Self(hex::encode(bytes))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = InvalidDocumentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == DOCUMENT_ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(InvalidDocumentId(s.to_string()))
        }
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
