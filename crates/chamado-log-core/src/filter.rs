//! Filter and search over the ticket collection.
//!
//! All criteria compose with AND semantics and the result preserves the
//! store's order. Filtering is a pure read: it borrows the tickets, never
//! clones or mutates them.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, TimeZone};

use crate::models::{Status, Ticket};
use crate::timestamp;

/// Category selector: either everything, a single status, or the on-site
/// subset of completed tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selector {
    #[default]
    All,
    Status(Status),
    Presencial,
}

impl Selector {
    fn matches(self, ticket: &Ticket) -> bool {
        match self {
            Self::All => true,
            Self::Status(status) => ticket.status == status,
            // Checks the flag directly rather than assuming the write
            // invariant; snapshots edited outside the application may
            // carry the flag on other statuses.
            Self::Presencial => ticket.presencial(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("Todos"),
            Self::Status(status) => status.fmt(f),
            Self::Presencial => f.write_str("Presenciais"),
        }
    }
}

impl FromStr for Selector {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "todos" => Ok(Self::All),
            "presencial" | "presenciais" => Ok(Self::Presencial),
            other => other
                .parse::<Status>()
                .map(Self::Status)
                .map_err(|_| format!(
                    "invalid selector '{other}' (expected 'todos', 'presenciais' or a status)"
                )),
        }
    }
}

/// Composed filter criteria. The default matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub selector: Selector,
    /// Case-insensitive substring match against the work-order code.
    /// Empty means no text constraint.
    pub search: String,
    /// Exact local calendar day. Tickets whose timestamp cannot be parsed
    /// never match a date criterion.
    pub day: Option<NaiveDate>,
}

impl Filter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selector == Selector::All && self.search.trim().is_empty() && self.day.is_none()
    }
}

/// Apply `filter` over `tickets`, preserving order.
#[must_use]
pub fn filter_tickets<'a, Tz: TimeZone>(
    tickets: &'a [Ticket],
    filter: &Filter,
    tz: &Tz,
) -> Vec<&'a Ticket> {
    let needle = filter.search.trim().to_lowercase();
    tickets
        .iter()
        .filter(|t| filter.selector.matches(t))
        .filter(|t| needle.is_empty() || t.wo.to_lowercase().contains(&needle))
        .filter(|t| match filter.day {
            None => true,
            Some(day) => t
                .parsed_timestamp_in(tz)
                .is_some_and(|instant| timestamp::local_date(&instant, tz) == day),
        })
        .collect()
}
