use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use icalendar::{Calendar, Component, Event, EventLike};
use serde::Serialize;
use tracing::info;

use crate::error::ScheduleError;
use crate::model::CollectionEvent;
use crate::waste::WasteType;
use crate::workspace::replace_file;

pub const TITLE_PREFIX: &str = "Śmieci";
pub const TRANSPARENCY: &str = "TRANSPARENT";
pub const STATUS: &str = "CONFIRMED";

const CALENDAR_NAME: &str = "Śmieci";
const CALENDAR_DESCRIPTION: &str = "Harmonogram wywozu śmieci";
const UID_DOMAIN: &str = "eko-harmonogram";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarRecord {
    pub uid: String,
    pub title: String,
    pub description: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub comment: String,
    pub color: &'static str,
    pub transparency: &'static str,
    pub status: &'static str,
    #[serde(skip)]
    pub waste_type: WasteType,
}

fn event_uid(event: &CollectionEvent) -> String {
    let tag = event.waste_type.tag().trim_start_matches('#');
    format!("{}-{tag}@{UID_DOMAIN}", event.date.format("%Y%m%d"))
}

#[must_use]
pub fn to_record(event: &CollectionEvent) -> CalendarRecord {
    let waste_type = event.waste_type;
    CalendarRecord {
        uid: event_uid(event),
        title: format!("{TITLE_PREFIX} {}", waste_type.name()),
        description: waste_type.tag().to_string(),
        start: event.date,
        end: event.date.succ_opt().unwrap_or(event.date),
        comment: event.note_text().to_string(),
        color: waste_type.color(),
        transparency: TRANSPARENCY,
        status: STATUS,
        waste_type,
    }
}

#[must_use]
pub fn export_events(events: &[CollectionEvent]) -> BTreeMap<i32, Vec<CalendarRecord>> {
    let mut years: BTreeMap<i32, Vec<CalendarRecord>> = BTreeMap::new();
    for event in events {
        years
            .entry(event.date.year())
            .or_default()
            .push(to_record(event));
    }
    for records in years.values_mut() {
        records.sort_by(|a, b| (a.start, a.waste_type).cmp(&(b.start, b.waste_type)));
    }
    years
}

#[must_use]
pub fn render_ics(records: &[CalendarRecord], stamp: DateTime<Utc>) -> String {
    let mut calendar = Calendar::new();
    calendar.name(CALENDAR_NAME).description(CALENDAR_DESCRIPTION);

    for record in records {
        calendar.push(
            Event::new()
                .uid(&record.uid)
                .summary(&record.title)
                .description(&record.description)
                .starts(record.start)
                .ends(record.end)
                .timestamp(stamp)
                .add_property("COMMENT", &record.comment)
                .add_property("COLOR", record.color)
                .add_property("TRANSP", record.transparency)
                .add_property("STATUS", record.status)
                .done(),
        );
    }

    calendar.done().to_string()
}

#[must_use]
pub fn calendar_file_name(year: i32) -> String {
    format!("Eko-Region-{year}.ics")
}

pub fn write_calendars(
    dir: &Path,
    events: &[CollectionEvent],
) -> Result<Vec<PathBuf>, ScheduleError> {
    fs::create_dir_all(dir)?;
    let stamp = Utc::now();

    let mut written = Vec::new();
    for (year, records) in export_events(events) {
        let path = dir.join(calendar_file_name(year));
        let body = render_ics(&records, stamp);
        replace_file(&path, |temp| {
            fs::write(temp, body.as_bytes())?;
            Ok(())
        })?;
        info!("wrote {} events to {}", records.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

pub fn records_to_json(events: &[CollectionEvent]) -> Result<String, ScheduleError> {
    let records = export_events(events).into_values().flatten().collect::<Vec<_>>();
    let mut json = serde_json::to_string_pretty(&records).map_err(|error| {
        ScheduleError::InvalidOption(format!("cannot serialize events: {error}"))
    })?;
    json.push('\n');
    Ok(json)
}
