use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::assemble::build_schedule;
use crate::error::ScheduleError;
use crate::model::{ScheduleTable, TableRow};
use crate::warning::ResolveWarning;
use crate::workspace::replace_file;

fn write_records<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    rows: &[TableRow],
) -> Result<(), ScheduleError> {
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn write_rows(
    path: &Path,
    rows: &[TableRow],
    delimiter: u8,
) -> Result<(), ScheduleError> {
    replace_file(path, |temp| {
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(temp)?;
        write_records(&mut writer, rows)
    })?;
    info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub(crate) fn write_schedule(
    path: &Path,
    table: &ScheduleTable,
    delimiter: u8,
) -> Result<(), ScheduleError> {
    let mut rows = Vec::with_capacity(table.rows.len() + 1);
    rows.push(table.header.clone());
    rows.extend(table.rows.iter().cloned());
    write_rows(path, &rows, delimiter)
}

pub fn schedule_to_string(table: &ScheduleTable, delimiter: u8) -> Result<String, ScheduleError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    writer.write_record(&table.header)?;
    write_records(&mut writer, &table.rows)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| ScheduleError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| ScheduleError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}

pub(crate) fn read_rows(path: &Path, delimiter: u8) -> Result<Vec<TableRow>, ScheduleError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

pub fn read_schedule(
    path: &Path,
    delimiter: u8,
) -> Result<(ScheduleTable, Vec<ResolveWarning>), ScheduleError> {
    let mut rows = read_rows(path, delimiter)?.into_iter();
    let header = rows
        .next()
        .filter(|header| !header.is_empty())
        .ok_or(ScheduleError::MissingColumn("month"))?;
    let body = rows
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .collect::<Vec<_>>();

    Ok(build_schedule(header, &body))
}
