//! Ticket store: the in-memory source of truth and its persistence port.
//!
//! The store is explicitly owned and dependency-injected (no module-level
//! singleton): the application opens it once at startup, mutates it through
//! the command API, and the full collection is re-persisted as a single
//! snapshot after every successful mutation.

use std::cell::RefCell;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::migrate::{self, LEGACY_FIELD, RawTicket};
use crate::models::{Status, Ticket};
use crate::timestamp;

/// Canonical backup file name used by export.
pub const BACKUP_FILE_NAME: &str = "backup_chamados.json";

/// Region codes are at most this many characters.
const UF_MAX_CHARS: usize = 3;

// =============================================================================
// Persistence port
// =============================================================================

/// Storage port for the snapshot: one named slot holding the entire
/// collection as serialized text, rewritten in full on every mutation.
pub trait Persister {
    /// Load the snapshot text, or `None` when no snapshot exists yet.
    fn load(&self) -> Result<Option<String>>;

    /// Overwrite the snapshot with `text`.
    fn save(&self, text: &str) -> Result<()>;
}

/// File-backed persister writing atomically (temp file + rename in the
/// target's directory, so the rename stays on one filesystem).
#[derive(Debug, Clone)]
pub struct JsonFilePersister {
    path: PathBuf,
}

impl JsonFilePersister {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persister for JsonFilePersister {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn save(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&self.path, text.as_bytes())
    }
}

/// Write bytes to a file atomically via a temp file + rename.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_name = format!(
        ".tmp-{}-{}",
        std::process::id(),
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    let tmp_path = parent.join(tmp_name);
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_data()?;
    fs::rename(&tmp_path, path).map_err(|err| {
        // Best-effort cleanup of the temp file on rename failure
        let _ = fs::remove_file(&tmp_path);
        err.into()
    })
}

/// In-memory persister for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    slot: RefCell<Option<String>>,
}

impl MemoryPersister {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with an existing snapshot, as if a previous session had
    /// written it.
    #[must_use]
    pub fn with_snapshot(text: impl Into<String>) -> Self {
        Self {
            slot: RefCell::new(Some(text.into())),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl Persister for MemoryPersister {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&self, text: &str) -> Result<()> {
        *self.slot.borrow_mut() = Some(text.to_string());
        Ok(())
    }
}

// =============================================================================
// Command inputs
// =============================================================================

/// Input for the add operation.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub wo: String,
    pub uf: String,
    pub status: Status,
    pub presencial: bool,
}

/// Partial update for the edit operation. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TicketPatch {
    pub wo: Option<String>,
    pub uf: Option<String>,
    pub status: Option<Status>,
    pub presencial: Option<bool>,
    pub timestamp: Option<String>,
}

/// Result of an import: how many records were restored and how many
/// malformed entries were skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
}

// =============================================================================
// TicketStore
// =============================================================================

/// Ordered in-memory collection of tickets, newest first.
pub struct TicketStore {
    tickets: Vec<Ticket>,
    persister: Box<dyn Persister>,
}

impl TicketStore {
    /// Open the store: load the snapshot through the persister and migrate
    /// it to the current schema. A missing or corrupt snapshot yields an
    /// empty store, never an error.
    pub fn open(persister: Box<dyn Persister>) -> Result<Self> {
        let tickets = match persister.load()? {
            Some(raw) => migrate::load_snapshot(&raw),
            None => Vec::new(),
        };
        Ok(Self { tickets, persister })
    }

    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    /// Create a ticket at `now` and prepend it (newest first).
    ///
    /// Rejects empty `wo`/`uf` after trimming with no mutation. The id
    /// derives from `now` in epoch millis and is bumped past any collision
    /// so ids stay unique for the lifetime of the process.
    pub fn add(&mut self, draft: &NewTicket, now: DateTime<Utc>) -> Result<&Ticket> {
        let wo = draft.wo.trim();
        if wo.is_empty() {
            return Err(Error::EmptyField("wo"));
        }
        let uf = draft.uf.trim();
        if uf.is_empty() {
            return Err(Error::EmptyField("uf"));
        }

        let mut id = now.timestamp_millis();
        while self.tickets.iter().any(|t| t.id == id) {
            id += 1;
        }

        let mut ticket = Ticket {
            id,
            wo: wo.to_uppercase(),
            uf: normalize_uf(uf),
            status: draft.status,
            timestamp: timestamp::to_canonical(&now),
            is_presencial: draft.presencial.then_some(true),
        };
        ticket.enforce_presencial();

        self.tickets.insert(0, ticket);
        self.persist()?;
        Ok(&self.tickets[0])
    }

    /// Merge `patch` over the ticket with `id`, then re-apply the on-site
    /// invariant. Returns `false` (no-op) when the id is absent.
    ///
    /// Field-level rejection: an empty `wo`/`uf` or an unparsable
    /// `timestamp` is dropped while the rest of the patch still applies.
    /// The id never changes.
    pub fn edit(&mut self, id: i64, patch: TicketPatch) -> Result<bool> {
        let Some(ticket) = self.tickets.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };

        if let Some(wo) = patch.wo {
            let wo = wo.trim();
            if !wo.is_empty() {
                ticket.wo = wo.to_uppercase();
            }
        }
        if let Some(uf) = patch.uf {
            let uf = uf.trim();
            if !uf.is_empty() {
                ticket.uf = normalize_uf(uf);
            }
        }
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(presencial) = patch.presencial {
            ticket.is_presencial = presencial.then_some(true);
        }
        if let Some(raw) = patch.timestamp {
            if timestamp::parse_timestamp_in(&raw, &Utc).is_some() {
                ticket.timestamp = raw;
            } else {
                tracing::debug!(ticket_id = id, raw, "rejected unparsable timestamp edit");
            }
        }
        ticket.enforce_presencial();

        self.persist()?;
        Ok(true)
    }

    /// Remove the ticket with `id`. Returns `false` (no-op) when absent.
    pub fn delete(&mut self, id: i64) -> Result<bool> {
        let before = self.tickets.len();
        self.tickets.retain(|t| t.id != id);
        if self.tickets.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Wholesale replacement, used by import.
    pub fn replace_all(&mut self, tickets: Vec<Ticket>) -> Result<()> {
        self.tickets = tickets;
        self.persist()
    }

    /// Restore a backup: the payload must be a JSON array or the import
    /// aborts with no state change. Elements go through the same legacy
    /// migration as the snapshot loader; elements that still don't fit the
    /// current schema are skipped and counted rather than aborting the
    /// import (and never partially applied — the store is only replaced
    /// once the whole payload has been read).
    pub fn import_json(&mut self, raw: &str) -> Result<ImportOutcome> {
        let payload: serde_json::Value = serde_json::from_str(raw)?;
        let Some(items) = payload.as_array() else {
            return Err(Error::ImportFormat);
        };

        let migrating = items.iter().any(|item| item.get(LEGACY_FIELD).is_some());
        let mut imported = Vec::with_capacity(items.len());
        let mut skipped = 0usize;
        for item in items {
            match serde_json::from_value::<RawTicket>(item.clone()) {
                Ok(parsed) => imported.push(parsed.into_current(migrating)),
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(error = %err, "skipping malformed record in import");
                }
            }
        }

        let outcome = ImportOutcome {
            imported: imported.len(),
            skipped,
        };
        self.replace_all(imported)?;
        Ok(outcome)
    }

    /// Serialize the full collection as the portable backup document
    /// (pretty-printed JSON).
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.tickets)?)
    }

    /// How many tickets fall on the given local calendar day (feeds the
    /// daily-goal display).
    #[must_use]
    pub fn count_on_day<Tz: TimeZone>(&self, day: NaiveDate, tz: &Tz) -> usize {
        self.tickets
            .iter()
            .filter_map(|t| t.parsed_timestamp_in(tz))
            .filter(|instant| timestamp::local_date(instant, tz) == day)
            .count()
    }

    /// Persist the whole collection as one compact snapshot.
    fn persist(&self) -> Result<()> {
        let snapshot = serde_json::to_string(&self.tickets)?;
        self.persister.save(&snapshot)
    }
}

/// Upper-case, truncated to the maximum region-code length.
fn normalize_uf(uf: &str) -> String {
    uf.to_uppercase().chars().take(UF_MAX_CHARS).collect()
}
