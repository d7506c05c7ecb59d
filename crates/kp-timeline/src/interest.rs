//! Dates of interest: the days on which an item starts, ends, changes group
//! or booking, or enters and leaves a pause.
//!
//! End dates are inclusive in the records, so the change is reported on the
//! day after.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use kp_core::{day_after, format_iso};
use kp_project::{DataItem, ItemKind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ChangeKind {
    New,
    Departure,
    GroupChange,
    BookingChange,
    Pause,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::New => "Neu",
            ChangeKind::Departure => "Verabschiedung",
            ChangeKind::GroupChange => "Gruppenwechsel",
            ChangeKind::BookingChange => "Buchungsänderung",
            ChangeKind::Pause => "Pause",
        }
    }

    fn counted(self, count: usize) -> String {
        let suffix = match (self, count) {
            (_, 0 | 1) => "",
            (ChangeKind::New, _) => "e",
            (ChangeKind::Departure | ChangeKind::BookingChange | ChangeKind::Pause, _) => "en",
            (ChangeKind::GroupChange, _) => "",
        };
        format!("{} {}{}", count, self.label(), suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeTag {
    pub kind: ChangeKind,
    pub item_kind: ItemKind,
    pub name: String,
}

impl ChangeTag {
    /// `"Neu: Kind"`, `"Pause: Mitarbeiter"`, ...
    pub fn type_label(&self) -> String {
        format!("{}: {}", self.kind.label(), self.item_kind.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateOfInterest {
    pub date: NaiveDate,
    pub changes: Vec<ChangeTag>,
}

impl DateOfInterest {
    pub fn iso(&self) -> String {
        format_iso(self.date)
    }

    /// Number of changes per kind, in order of first appearance.
    pub fn summary(&self) -> Vec<(ChangeKind, usize)> {
        let mut counts: Vec<(ChangeKind, usize)> = Vec::new();
        for change in &self.changes {
            match counts.iter_mut().find(|(kind, _)| *kind == change.kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((change.kind, 1)),
            }
        }
        counts
    }

    /// `"2 Neue, 1 Verabschiedung"`
    pub fn summary_text(&self) -> String {
        self.summary()
            .into_iter()
            .map(|(kind, count)| kind.counted(count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Changes strictly after `reference`, grouped per day, ascending.
///
/// Unparseable dates are skipped. Pause bounds only count while the pause is
/// enabled.
pub fn extract_dates_of_interest<'a>(
    items: impl IntoIterator<Item = &'a DataItem>,
    reference: NaiveDate,
) -> Vec<DateOfInterest> {
    let mut by_day: BTreeMap<NaiveDate, Vec<ChangeTag>> = BTreeMap::new();

    let mut add = |date: Option<NaiveDate>, kind: ChangeKind, item: &DataItem, name: String| {
        if let Some(date) = date {
            by_day.entry(date).or_default().push(ChangeTag {
                kind,
                item_kind: item.kind,
                name,
            });
        }
    };
    let after = |date: Option<NaiveDate>| date.and_then(day_after);

    for item in items {
        let data = &item.parseddata;

        add(data.start_date(), ChangeKind::New, item, item.name.clone());
        add(after(data.end_date()), ChangeKind::Departure, item, item.name.clone());

        for group in &data.group {
            add(
                group.start_date(),
                ChangeKind::GroupChange,
                item,
                format!("{} → {}", item.name, group.name),
            );
            add(
                after(group.end_date()),
                ChangeKind::GroupChange,
                item,
                format!("{} verlässt {}", item.name, group.name),
            );
        }

        for booking in &data.booking {
            add(
                booking.start_date(),
                ChangeKind::BookingChange,
                item,
                format!("{} neue Zeiten", item.name),
            );
            add(
                after(booking.end_date()),
                ChangeKind::BookingChange,
                item,
                format!("{} Zeiten enden", item.name),
            );
        }

        if data.paused.enabled {
            add(
                data.paused.start_date(),
                ChangeKind::Pause,
                item,
                format!("{} beginnt Pause", item.name),
            );
            add(
                after(data.paused.end_date()),
                ChangeKind::Pause,
                item,
                format!("{} beendet Pause", item.name),
            );
        }
    }

    by_day
        .into_iter()
        .filter(|(date, _)| *date > reference)
        .map(|(date, changes)| DateOfInterest { date, changes })
        .collect()
}
