//! Data models for the chamado log.
//!
//! Serialized field names (`id`, `wo`, `uf`, `status`, `timestamp`,
//! `isPresencial`) and the four status labels are fixed external vocabulary:
//! previously persisted snapshots and exported backups use them verbatim, so
//! they MUST stay in lockstep with the legacy application.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp;

// =============================================================================
// Status
// =============================================================================

/// Resolution status of a ticket.
///
/// # Constraints
/// - Closed enum; the persisted labels are the exact Portuguese strings below.
/// - `Concluido` is the only status that may carry the on-site flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Concluído")]
    Concluido,
    #[serde(rename = "Diagnóstico")]
    Diagnostico,
    #[serde(rename = "Trabalhado")]
    Trabalhado,
    #[serde(rename = "Cancelado")]
    Cancelado,
}

/// All statuses, in the order the original form presented them.
pub const ALL_STATUSES: [Status; 4] = [
    Status::Concluido,
    Status::Diagnostico,
    Status::Trabalhado,
    Status::Cancelado,
];

impl Status {
    /// The persisted (and displayed) label for this status.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Concluido => "Concluído",
            Self::Diagnostico => "Diagnóstico",
            Self::Trabalhado => "Trabalhado",
            Self::Cancelado => "Cancelado",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    /// Accepts the exact label plus accent-free lowercase forms, so the CLI
    /// can take `concluido` as well as `Concluído`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concluído" | "concluido" => Ok(Self::Concluido),
            "diagnóstico" | "diagnostico" => Ok(Self::Diagnostico),
            "trabalhado" => Ok(Self::Trabalhado),
            "cancelado" => Ok(Self::Cancelado),
            other => Err(format!(
                "invalid status '{other}' (expected one of: Concluído, Diagnóstico, Trabalhado, Cancelado)"
            )),
        }
    }
}

// =============================================================================
// Ticket
// =============================================================================

/// One logged work item.
///
/// # Constraints
/// - `id`: unique within the store, derived from the creation instant
///   (epoch millis), so sorting by id approximates creation order.
/// - `wo`: work-order code, stored trimmed and upper-cased.
/// - `uf`: region code, at most 3 characters, trimmed and upper-cased.
/// - `timestamp`: canonical instant string; RFC 3339 UTC with milliseconds
///   on creation, but older snapshots may carry locale-formatted strings
///   (see `timestamp::parse_timestamp`).
/// - `is_presencial`: serialized as `isPresencial`, present only when true,
///   and true only while `status == Concluido`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
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
}

impl Ticket {
    /// Re-applies the on-site invariant: the flag survives only as
    /// `Some(true)` on a `Concluido` ticket, any other combination is
    /// stripped to `None`. Called by every write path, not just creation.
    pub fn enforce_presencial(&mut self) {
        if self.status != Status::Concluido || self.is_presencial != Some(true) {
            self.is_presencial = None;
        }
    }

    /// Whether the ticket was resolved on site.
    #[must_use]
    pub fn presencial(&self) -> bool {
        self.is_presencial == Some(true)
    }

    /// The normalized instant, or `None` when the stored timestamp is
    /// unparsable (such tickets are excluded from date-based views).
    #[must_use]
    pub fn parsed_timestamp_in<Tz: chrono::TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        timestamp::parse_timestamp_in(&self.timestamp, tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip_through_serde() {
        for status in ALL_STATUSES {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.label()));
            let back: Status = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn status_parses_accent_free_forms() {
        assert_eq!("concluido".parse::<Status>().unwrap(), Status::Concluido);
        assert_eq!("Diagnóstico".parse::<Status>().unwrap(), Status::Diagnostico);
        assert_eq!(" cancelado ".parse::<Status>().unwrap(), Status::Cancelado);
        assert!("done".parse::<Status>().is_err());
    }

    #[test]
    fn presencial_flag_is_stripped_for_non_completed() {
        let mut ticket = Ticket {
            id: 1,
            wo: "WO1".into(),
            uf: "SP".into(),
            status: Status::Diagnostico,
            timestamp: "2024-03-15T17:30:00.000Z".into(),
            is_presencial: Some(true),
        };
        ticket.enforce_presencial();
        assert_eq!(ticket.is_presencial, None);
    }

    #[test]
    fn presencial_false_normalizes_to_absent() {
        let mut ticket = Ticket {
            id: 1,
            wo: "WO1".into(),
            uf: "SP".into(),
            status: Status::Concluido,
            timestamp: "2024-03-15T17:30:00.000Z".into(),
            is_presencial: Some(false),
        };
        ticket.enforce_presencial();
        assert_eq!(ticket.is_presencial, None);

        let json = serde_json::to_string(&ticket).unwrap();
        assert!(!json.contains("isPresencial"));
    }

    #[test]
    fn serde_uses_legacy_field_names() {
        let ticket = Ticket {
            id: 1700000000000,
            wo: "12345".into(),
            uf: "RJ".into(),
            status: Status::Concluido,
            timestamp: "2024-03-15T17:30:00.000Z".into(),
            is_presencial: Some(true),
        };
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["wo"], "12345");
        assert_eq!(json["uf"], "RJ");
        assert_eq!(json["status"], "Concluído");
        assert_eq!(json["isPresencial"], true);
    }
}
