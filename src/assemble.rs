use tracing::warn;

use crate::model::{ScheduleTable, TableRow};
use crate::warning::{ResolveWarning, WarningCode};

#[must_use]
pub fn collapse_header(rows: &[TableRow]) -> TableRow {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|column| {
            rows.iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

pub(crate) fn normalize_rows(rows: &[TableRow], width: usize) -> (Vec<TableRow>, Vec<usize>) {
    let mut truncated = Vec::new();
    let normalized = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut row = row.clone();
            if row.iter().skip(width).any(|cell| !cell.trim().is_empty()) {
                truncated.push(index);
            }
            row.resize(width, String::new());
            row
        })
        .collect();
    (normalized, truncated)
}

pub(crate) fn build_schedule(
    header: TableRow,
    body: &[TableRow],
) -> (ScheduleTable, Vec<ResolveWarning>) {
    let (rows, truncated) = normalize_rows(body, header.len());
    let warnings = truncated
        .into_iter()
        .map(|row| {
            warn!(
                "row {row} is wider than the {}-column header; extra cells dropped",
                header.len()
            );
            ResolveWarning::new(
                WarningCode::RowTruncated,
                format!("row wider than the {}-column header", header.len()),
            )
            .with_row(row)
        })
        .collect();

    (ScheduleTable { header, rows }, warnings)
}

#[must_use]
pub fn assemble_schedule(
    header_rows: &[TableRow],
    body_rows: &[TableRow],
) -> (ScheduleTable, Vec<ResolveWarning>) {
    build_schedule(collapse_header(header_rows), body_rows)
}
