//! Date bucketing: year / month / day grouping for the timeline view.
//!
//! Grouping keys off the *local* calendar day of each ticket's normalized
//! timestamp. Tickets with unparsable timestamps are skipped entirely; they
//! still exist in the store and in unfiltered listings, they just have no
//! place on a calendar.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, TimeZone};

use crate::models::Ticket;
use crate::timestamp;

/// pt-BR weekday names, Monday first (chrono's `num_days_from_monday`).
const WEEKDAYS: [&str; 7] = [
    "segunda-feira",
    "terça-feira",
    "quarta-feira",
    "quinta-feira",
    "sexta-feira",
    "sábado",
    "domingo",
];

/// pt-BR month names, 1-indexed via `month0`.
const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// One local calendar day and its tickets, newest first.
#[derive(Debug)]
pub struct DayBucket<'a> {
    pub date: NaiveDate,
    pub tickets: Vec<&'a Ticket>,
}

/// One month within a year, days newest first.
#[derive(Debug)]
pub struct MonthBucket<'a> {
    pub month: u32,
    pub days: Vec<DayBucket<'a>>,
}

impl MonthBucket<'_> {
    #[must_use]
    pub fn title(&self) -> String {
        capitalize(MONTHS[self.month as usize - 1])
    }
}

/// One year, months newest first.
#[derive(Debug)]
pub struct YearBucket<'a> {
    pub year: i32,
    pub months: Vec<MonthBucket<'a>>,
}

/// Group tickets by local calendar day into a year / month / day hierarchy,
/// every level ordered newest first. Within a day the input order (already
/// newest first in the store) is preserved.
#[must_use]
pub fn bucket_by_day<'a, Tz: TimeZone>(tickets: &'a [Ticket], tz: &Tz) -> Vec<YearBucket<'a>> {
    let mut grouped: BTreeMap<i32, BTreeMap<u32, BTreeMap<NaiveDate, Vec<&'a Ticket>>>> =
        BTreeMap::new();
    for ticket in tickets {
        let Some(instant) = ticket.parsed_timestamp_in(tz) else {
            continue;
        };
        let date = timestamp::local_date(&instant, tz);
        grouped
            .entry(date.year())
            .or_default()
            .entry(date.month())
            .or_default()
            .entry(date)
            .or_default()
            .push(ticket);
    }

    grouped
        .into_iter()
        .rev()
        .map(|(year, months)| YearBucket {
            year,
            months: months
                .into_iter()
                .rev()
                .map(|(month, days)| MonthBucket {
                    month,
                    days: days
                        .into_iter()
                        .rev()
                        .map(|(date, tickets)| DayBucket { date, tickets })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

/// Human label for a day relative to `today`: "Hoje", "Ontem", or the long
/// pt-BR form ("Sexta-feira, 15 de março").
#[must_use]
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        return "Hoje".to_string();
    }
    if today.pred_opt() == Some(date) {
        return "Ontem".to_string();
    }
    let weekday = WEEKDAYS[date.weekday().num_days_from_monday() as usize];
    let month = MONTHS[date.month() as usize - 1];
    capitalize(&format!("{weekday}, {} de {month}", date.day()))
}

/// Like [`day_label`], with the year appended for days outside the current
/// year ("Sexta-feira, 15 de março de 2024").
#[must_use]
pub fn day_label_with_year(date: NaiveDate, today: NaiveDate) -> String {
    let label = day_label(date, today);
    if date.year() == today.year() || label == "Hoje" || label == "Ontem" {
        label
    } else {
        format!("{label} de {}", date.year())
    }
}

/// Upper-cases the first character, pt-BR style for sentence-position names.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}
