/// Basic site settings
///
/// A singleton document: at most one row exists in `basic_settings`. The
/// table carries a `singleton BOOLEAN PRIMARY KEY CHECK (singleton)` column so
/// the database itself rejects a second row.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::DocumentId;

/// The site settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(rename = "_id")]
    pub id: DocumentId,

    pub website_name: String,

    /// Public path of the logo image
    pub logo: Option<String>,

    /// Public path of the favicon image
    pub favicon: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating the settings document
#[derive(Debug, Clone, Default)]
pub struct NewSettings {
    pub website_name: String,
    pub logo: Option<String>,
    pub favicon: Option<String>,
}

/// Partial update applied by an upsert
///
/// `None` leaves the stored value untouched. When no document exists yet the
/// missing fields take their empty defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub website_name: Option<String>,
    pub logo: Option<String>,
    pub favicon: Option<String>,
}

/// Result of an upsert: the new document plus the asset paths it no longer references
#[derive(Debug, Clone)]
pub struct SettingsReplacement {
    pub settings: Settings,
    pub superseded: Vec<String>,
}

impl Settings {
    /// Asset paths referenced by this document
    pub fn asset_paths(&self) -> Vec<String> {
        self.logo.iter().chain(self.favicon.iter()).cloned().collect()
    }

    /// Paths referenced here that a patch would replace with a different value
    pub fn superseded_by(&self, patch: &SettingsPatch) -> Vec<String> {
        let mut superseded = Vec::new();
        for (current, incoming) in [(&self.logo, &patch.logo), (&self.favicon, &patch.favicon)] {
            if let (Some(old), Some(new)) = (current, incoming) {
                if old != new {
                    superseded.push(old.clone());
                }
            }
        }
        superseded
    }
}
