//! Schema migration for persisted snapshots.
//!
//! Early versions of the application stored a categorical `resolutionType`
//! field (`"Presencial"` vs `"Remoto"`) instead of the boolean
//! `isPresencial`. Snapshots and backups written by those versions must be
//! accepted and migrated, not merely ignored; the legacy field name is part
//! of the external vocabulary.

use serde::{Deserialize, Serialize};

use crate::models::{Status, Ticket};

/// Legacy field name, kept in lockstep with previously persisted data.
pub const LEGACY_FIELD: &str = "resolutionType";

/// Legacy field value denoting on-site resolution.
pub const LEGACY_PRESENCIAL: &str = "Presencial";

/// A ticket as found on disk: the current schema plus the optional legacy
/// field. Records already in the new shape simply leave `resolution_type`
/// unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RawTicket {
    pub id: i64,
    pub wo: String,
    pub uf: String,
    pub status: Status,
    pub timestamp: String,
    #[serde(
        rename = "isPresencial",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_presencial: Option<bool>,
    #[serde(rename = "resolutionType", default)]
    pub resolution_type: Option<String>,
}

impl RawTicket {
    /// Maps a raw record into the current schema.
    ///
    /// When the collection is migrating (`migrating == true`), the legacy
    /// field is dropped from every record: `"Presencial"` becomes
    /// `isPresencial = true`, any other value leaves the record's own flag
    /// untouched. A record without the legacy field passes through as a
    /// no-op either way.
    pub(crate) fn into_current(self, migrating: bool) -> Ticket {
        let is_presencial = if migrating && self.resolution_type.as_deref() == Some(LEGACY_PRESENCIAL)
        {
            Some(true)
        } else {
            self.is_presencial
        };
        Ticket {
            id: self.id,
            wo: self.wo,
            uf: self.uf,
            status: self.status,
            timestamp: self.timestamp,
            is_presencial,
        }
    }
}

/// Upgrade a raw collection to the current schema.
///
/// Migration triggers on the presence of the legacy field on *any* record
/// and is then applied uniformly to *all* records. Running it over
/// already-migrated data is the identity.
pub(crate) fn migrate(raw: Vec<RawTicket>) -> Vec<Ticket> {
    let migrating = raw.iter().any(|t| t.resolution_type.is_some());
    raw.into_iter().map(|t| t.into_current(migrating)).collect()
}

/// Deserialize and migrate a persisted snapshot.
///
/// A snapshot that fails to deserialize yields an empty collection: the
/// failure is logged, never surfaced as a blocking error (the worst outcome
/// is an empty store, recoverable by re-importing a backup).
#[must_use]
pub fn load_snapshot(raw: &str) -> Vec<Ticket> {
    match serde_json::from_str::<Vec<RawTicket>>(raw) {
        Ok(parsed) => migrate(parsed),
        Err(err) => {
            tracing::warn!(error = %err, "corrupt snapshot, starting with an empty store");
            Vec::new()
        }
    }
}
