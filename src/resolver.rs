use tracing::{info, warn};

use crate::dates::{compose_date, month_number, parse_date};
use crate::day_tokens::{annotation_for_day, parse_cell};
use crate::error::ScheduleError;
use crate::model::{CollectionEvent, ScheduleTable};
use crate::waste::WasteType;
use crate::warning::{ResolveWarning, WarningCode};

const MONTH_COLUMN: usize = 0;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub event_count: usize,
    pub warnings: Vec<ResolveWarning>,
}

impl ResolutionReport {
    fn warn(&mut self, warning: ResolveWarning) {
        warn!(
            row = warning.row,
            column = warning.column,
            "{}",
            warning.message
        );
        self.warnings.push(warning);
    }
}

pub fn resolve_header(header: &[String]) -> Result<Vec<WasteType>, ScheduleError> {
    if header.len() <= MONTH_COLUMN + 1 {
        return Err(ScheduleError::MissingColumn("waste type"));
    }
    header
        .iter()
        .skip(MONTH_COLUMN + 1)
        .map(|label| WasteType::from_header(label))
        .collect()
}

pub fn resolve_schedule(
    table: &ScheduleTable,
    year: i32,
    connector: &str,
) -> Result<(Vec<CollectionEvent>, ResolutionReport), ScheduleError> {
    let types = resolve_header(&table.header)?;
    let mut events = Vec::new();
    let mut report = ResolutionReport::default();

    for (row_index, row) in table.rows.iter().enumerate() {
        let month = row.get(MONTH_COLUMN).map_or("", |cell| cell.trim());
        if month.is_empty() {
            report.warn(
                ResolveWarning::new(WarningCode::EmptyMonth, "row has no month label; skipped")
                    .with_row(row_index),
            );
            continue;
        }

        for (offset, waste_type) in types.iter().enumerate() {
            let column = MONTH_COLUMN + 1 + offset;
            let Some(cell) = row.get(column).filter(|cell| !cell.trim().is_empty()) else {
                continue;
            };

            let (token, rejected) = parse_cell(cell, connector);
            for raw in rejected {
                report.warn(
                    ResolveWarning::new(
                        WarningCode::UndecomposableDigits,
                        format!("no day recovered from {raw:?} in {month} / {waste_type}"),
                    )
                    .with_row(row_index)
                    .with_column(column),
                );
            }

            for day in token.days {
                let text = compose_date(day, month, year);
                let Some(date) = parse_date(&text) else {
                    let code = if month_number(month).is_some() {
                        WarningCode::InvalidCalendarDate
                    } else {
                        WarningCode::UnparseableDate
                    };
                    report.warn(
                        ResolveWarning::new(code, format!("cannot parse date {text:?}; skipped"))
                            .with_row(row_index)
                            .with_column(column),
                    );
                    continue;
                };

                let event = CollectionEvent {
                    waste_type: *waste_type,
                    date,
                    note: annotation_for_day(day, &token.annotations),
                };
                info!("{} {} ({})", event.date, event.waste_type, event.note_text());
                events.push(event);
            }
        }
    }

    report.event_count = events.len();
    Ok((events, report))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::resolve_schedule;
    use crate::day_tokens::DATE_CHANGE_NOTE;
    use crate::error::ScheduleError;
    use crate::model::ScheduleTable;
    use crate::waste::WasteType;
    use crate::warning::WarningCode;

    fn to_row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| (*cell).to_string()).collect()
    }

    fn table(header: &[&str], rows: &[&[&str]]) -> ScheduleTable {
        ScheduleTable {
            header: to_row(header),
            rows: rows.iter().map(|row| to_row(row)).collect(),
        }
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).expect("valid test date")
    }

    #[test]
    fn resolves_days_with_footnotes() {
        let schedule = table(
            &["Miesiąc", "Zmieszane odpady komunalne", "Bio"],
            &[&["Marzec", "3, 17 i 31*", "+"]],
        );
        let (events, report) = resolve_schedule(&schedule, 2025, "i").expect("schedule resolves");

        assert_eq!(report.event_count, 3);
        assert!(report.warnings.is_empty());
        assert_eq!(
            events.iter().map(|event| event.date).collect::<Vec<_>>(),
            vec![date(3, 3), date(3, 17), date(3, 31)]
        );
        assert!(events.iter().all(|event| event.waste_type == WasteType::Mixed));
        assert_eq!(events[0].note_text(), "no note");
        assert_eq!(events[2].note.as_deref(), Some(DATE_CHANGE_NOTE));
    }

    #[test]
    fn impossible_dates_are_dropped_with_warning() {
        let schedule = table(&["Miesiąc", "Papier"], &[&["Luty", "14, 30"]]);
        let (events, report) = resolve_schedule(&schedule, 2025, "i").expect("schedule resolves");

        assert_eq!(events.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].code, WarningCode::InvalidCalendarDate);
        assert_eq!(report.warnings[0].column, Some(1));
    }

    #[test]
    fn unknown_month_is_a_warning_not_an_error() {
        let schedule = table(&["Miesiąc", "Szkło"], &[&["Smarch", "5"], &["", "9"]]);
        let (events, report) = resolve_schedule(&schedule, 2025, "i").expect("schedule resolves");

        assert!(events.is_empty());
        let codes = report.warnings.iter().map(|w| w.code).collect::<Vec<_>>();
        assert_eq!(codes, vec![WarningCode::UnparseableDate, WarningCode::EmptyMonth]);
    }

    #[test]
    fn undecomposable_runs_are_reported() {
        let schedule = table(&["Miesiąc", "Bio"], &[&["Kwiecień", "141"]]);
        let (events, report) = resolve_schedule(&schedule, 2025, "i").expect("schedule resolves");

        assert!(events.is_empty());
        assert_eq!(report.warnings[0].code, WarningCode::UndecomposableDigits);
    }

    #[test]
    fn unknown_header_fails_the_table() {
        let schedule = table(&["Miesiąc", "Bio", "Gabaryty"], &[&["Maj", "5", "6"]]);
        let err = resolve_schedule(&schedule, 2025, "i").expect_err("unknown type is fatal");
        assert!(matches!(err, ScheduleError::UnknownWasteType(ref header) if header == "Gabaryty"));
    }

    #[test]
    fn month_only_header_has_no_type_columns() {
        let schedule = table(&["Miesiąc"], &[]);
        let err = resolve_schedule(&schedule, 2025, "i").expect_err("no type columns");
        assert!(matches!(err, ScheduleError::MissingColumn(_)));
    }
}
