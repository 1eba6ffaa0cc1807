//! Monthly report engine: aggregate statistics plus the CSV export.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, TimeZone};

use crate::models::{Status, Ticket};
use crate::timestamp;

/// UTF-8 byte-order mark prepended to CSV exports so spreadsheet tools
/// detect the encoding and render the accented labels correctly.
const CSV_BOM: &str = "\u{feff}";

/// A calendar month, as selected for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    /// Parses the `YYYY-MM` form used on the command line and in file names.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || format!("invalid month '{s}' (expected YYYY-MM)");
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        if !(1..=12).contains(&month) {
            return Err(err());
        }
        Ok(Self { year, month })
    }
}

/// Aggregate statistics for one month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyReport {
    pub key: MonthKey,
    pub total: usize,
    pub completed: usize,
    pub presencial: usize,
    pub remote: usize,
    /// Tickets per *active* day (days with at least one ticket), rounded to
    /// two decimals.
    pub average_per_day: f64,
}

/// Months that have at least one ticket, newest first.
#[must_use]
pub fn available_months<Tz: TimeZone>(tickets: &[Ticket], tz: &Tz) -> Vec<MonthKey> {
    let mut months: Vec<MonthKey> = tickets
        .iter()
        .filter_map(|t| t.parsed_timestamp_in(tz))
        .map(|instant| MonthKey::of(timestamp::local_date(&instant, tz)))
        .collect();
    months.sort_unstable();
    months.dedup();
    months.reverse();
    months
}

/// Tickets falling in `key`'s local month, in input order.
fn tickets_in_month<'a, Tz: TimeZone>(
    tickets: &'a [Ticket],
    key: MonthKey,
    tz: &Tz,
) -> Vec<(&'a Ticket, NaiveDate)> {
    tickets
        .iter()
        .filter_map(|t| {
            let instant = t.parsed_timestamp_in(tz)?;
            let date = timestamp::local_date(&instant, tz);
            (MonthKey::of(date) == key).then_some((t, date))
        })
        .collect()
}

/// Build the aggregate report for a month, or `None` when the month has no
/// tickets (callers render that as "no data" rather than a zero report).
#[must_use]
pub fn monthly_report<Tz: TimeZone>(
    tickets: &[Ticket],
    key: MonthKey,
    tz: &Tz,
) -> Option<MonthlyReport> {
    let in_month = tickets_in_month(tickets, key, tz);
    if in_month.is_empty() {
        return None;
    }

    let total = in_month.len();
    let completed = in_month
        .iter()
        .filter(|(t, _)| t.status == Status::Concluido)
        .count();
    // Counted within the completed subset so presencial/remote always
    // partition it, even when imported data bypassed the write invariant.
    let presencial = in_month
        .iter()
        .filter(|(t, _)| t.status == Status::Concluido && t.presencial())
        .count();

    let mut days: Vec<NaiveDate> = in_month.iter().map(|(_, date)| *date).collect();
    days.sort_unstable();
    days.dedup();
    let average = total as f64 / days.len().max(1) as f64;

    Some(MonthlyReport {
        key,
        total,
        completed,
        presencial,
        remote: completed - presencial,
        average_per_day: (average * 100.0).round() / 100.0,
    })
}

/// Render the month's tickets as CSV, or `None` when the month is empty.
///
/// The layout is fixed for downstream spreadsheets: UTF-8 BOM, quoted
/// header `"WO","UF","Status","Data","Presencial"`, dates in the locale
/// format and the on-site flag as `Sim`/`Não`.
#[must_use]
pub fn monthly_csv<Tz: TimeZone>(tickets: &[Ticket], key: MonthKey, tz: &Tz) -> Option<String> {
    let in_month = tickets_in_month(tickets, key, tz);
    if in_month.is_empty() {
        return None;
    }

    let mut out = String::from(CSV_BOM);
    out.push_str("\"WO\",\"UF\",\"Status\",\"Data\",\"Presencial\"\n");
    for (ticket, _) in in_month {
        let data = ticket
            .parsed_timestamp_in(tz)
            .map(|instant| timestamp::to_locale(&instant, tz))
            .unwrap_or_default();
        let presencial = if ticket.presencial() { "Sim" } else { "Não" };
        let row = [
            ticket.wo.as_str(),
            ticket.uf.as_str(),
            ticket.status.label(),
            data.as_str(),
            presencial,
        ];
        let quoted: Vec<String> = row.iter().map(|field| csv_quote(field)).collect();
        out.push_str(&quoted.join(","));
        out.push('\n');
    }
    Some(out)
}

/// Suggested file name for a month's CSV export.
#[must_use]
pub fn csv_file_name(key: MonthKey) -> String {
    format!("relatorio_chamados_{key}.csv")
}

/// Quote a CSV field, doubling embedded quotes.
fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
