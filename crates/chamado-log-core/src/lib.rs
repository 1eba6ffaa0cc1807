//! Core engine for the chamado log: ticket records, persistence, filtering,
//! date bucketing and monthly reports.
//!
//! The crate is deliberately UI-free. Everything that touches the outside
//! world goes through two seams: the [`store::Persister`] trait for storage
//! and an explicit `chrono::TimeZone` parameter for every date-sensitive
//! computation, so behavior is reproducible in tests regardless of the host
//! timezone.

#![forbid(unsafe_code)]

pub mod bucket;
pub mod error;
pub mod filter;
pub mod migrate;
pub mod models;
pub mod report;
pub mod store;
pub mod timestamp;

pub use error::{Error, Result};
pub use models::{ALL_STATUSES, Status, Ticket};
pub use store::{
    BACKUP_FILE_NAME, ImportOutcome, JsonFilePersister, MemoryPersister, NewTicket, Persister,
    TicketPatch, TicketStore,
};
