mod assemble;
mod calendar;
mod csv_io;
mod dates;
mod day_tokens;
mod error;
mod grid;
mod model;
mod normalize;
mod ocr;
mod options;
mod pdf_reader;
mod repair;
mod resolver;
mod segment;
mod waste;
mod warning;
mod workspace;

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;

pub use calendar::{
    CalendarRecord, calendar_file_name, export_events, records_to_json, render_ics,
    write_calendars,
};
pub use csv_io::{read_schedule, schedule_to_string};
pub use dates::{compose_date, parse_date};
pub use day_tokens::{DATE_CHANGE_NOTE, decompose_digits, parse_cell};
pub use error::{ScheduleError, Stage};
pub use model::{CollectionEvent, DayToken, ScheduleTable, TableCell, TableRow};
pub use normalize::{NormalizedTable, SENTINEL_GLYPH, normalize_page};
pub use ocr::{Detection, TextRecognizer, default_recognizer, reconstruct_table};
pub use options::{ColumnAnchors, PipelineOptions, RedFilter};
pub use pdf_reader::{detect_year, detect_year_on, fallback_year, load_page_image, year_from_text};
pub use repair::repair_cell_text;
pub use resolver::{ResolutionReport, resolve_schedule};
pub use segment::{TableStrips, split_header_body};
pub use waste::WasteType;
pub use warning::{ResolveWarning, WarningCode};
pub use workspace::{ArtifactPaths, WorkDir};

#[cfg(feature = "tesseract")]
pub use ocr::tesseract::TesseractRecognizer;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub year: i32,
    pub artifacts: ArtifactPaths,
    pub filled_cells: usize,
    pub header: TableRow,
    pub body_rows: usize,
    pub warnings: Vec<ResolveWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    pub scan: ScanReport,
    pub resolution: ResolutionReport,
    pub events: Vec<CollectionEvent>,
    pub calendars: Vec<PathBuf>,
}

fn validate(options: &PipelineOptions) -> Result<(), ScheduleError> {
    if !(options.dpi.is_finite() && options.dpi > 0.0) {
        return Err(ScheduleError::InvalidOption(format!(
            "dpi must be positive, got {}",
            options.dpi
        )));
    }
    for (name, value) in [
        ("row tolerance", options.row_tolerance),
        ("column tolerance", options.column_tolerance),
        ("merge tolerance", options.merge_tolerance),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ScheduleError::InvalidOption(format!(
                "{name} must be positive, got {value}"
            )));
        }
    }
    if !(0.0..=1.0).contains(&options.empty_cell_whiteness) {
        return Err(ScheduleError::InvalidOption(
            "empty cell whiteness must be within 0..=1".to_string(),
        ));
    }
    if options.connector.trim().is_empty() || options.connector.contains(char::is_whitespace) {
        return Err(ScheduleError::InvalidOption(
            "connector must be a single non-empty word".to_string(),
        ));
    }
    if options.connector.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ScheduleError::InvalidOption(format!(
            "connector must not be a number, got {:?}",
            options.connector
        )));
    }
    Ok(())
}

pub fn scan_page_image(
    page: &RgbImage,
    source: &Path,
    year: i32,
    work_dir: &WorkDir,
    recognizer: &mut dyn TextRecognizer,
    options: &PipelineOptions,
) -> Result<ScanReport, ScheduleError> {
    validate(options)?;
    let artifacts = work_dir.artifacts();

    let normalized =
        normalize_page(page, options).map_err(|error| error.at(Stage::Normalize, source))?;
    workspace::save_png(&artifacts.cropped, &normalized.cropped)?;
    workspace::save_png(&artifacts.redless, &normalized.redless)?;
    workspace::save_png(&artifacts.colorless, &normalized.colorless)?;
    workspace::save_png(&artifacts.filled, &normalized.filled)?;

    let strips = split_header_body(&normalized.filled, options.split_margin)
        .map_err(|error| error.at(Stage::Segment, &artifacts.filled))?;
    workspace::save_png(&artifacts.header_image, &strips.header)?;
    workspace::save_png(&artifacts.body_image, &strips.body)?;

    let header_rows = ocr::recognize_table(recognizer, &strips.header, options)
        .map_err(|error| error.at(Stage::Recognize, &artifacts.header_image))?;
    csv_io::write_rows(&artifacts.header_csv, &header_rows, options.intermediate_delimiter)?;
    let body_rows = ocr::recognize_table(recognizer, &strips.body, options)
        .map_err(|error| error.at(Stage::Recognize, &artifacts.body_image))?;
    csv_io::write_rows(&artifacts.body_csv, &body_rows, options.intermediate_delimiter)?;

    let (table, warnings) = assemble::assemble_schedule(&header_rows, &body_rows);
    csv_io::write_schedule(&artifacts.schedule_csv, &table, options.schedule_delimiter)
        .map_err(|error| error.at(Stage::Assemble, &artifacts.schedule_csv))?;
    info!(
        "schedule with {} columns and {} rows ready for review at {}",
        table.width(),
        table.rows.len(),
        artifacts.schedule_csv.display()
    );

    Ok(ScanReport {
        year,
        filled_cells: normalized.filled_cells,
        header: table.header,
        body_rows: table.rows.len(),
        artifacts,
        warnings,
    })
}

pub fn scan_pdf(
    input: &Path,
    year: Option<i32>,
    work_dir: &WorkDir,
    recognizer: &mut dyn TextRecognizer,
    options: &PipelineOptions,
) -> Result<ScanReport, ScheduleError> {
    validate(options)?;
    let year = year.unwrap_or_else(|| detect_year(input));
    let page =
        load_page_image(input, options.dpi).map_err(|error| error.at(Stage::Rasterize, input))?;
    scan_page_image(&page, input, year, work_dir, recognizer, options)
}

pub fn resolve_schedule_csv(
    schedule_csv: &Path,
    year: i32,
    options: &PipelineOptions,
) -> Result<(Vec<CollectionEvent>, ResolutionReport), ScheduleError> {
    let at_resolve = |error: ScheduleError| error.at(Stage::Resolve, schedule_csv);

    validate(options)?;
    let (table, mut warnings) =
        csv_io::read_schedule(schedule_csv, options.schedule_delimiter).map_err(at_resolve)?;
    let (events, mut report) =
        resolve_schedule(&table, year, &options.connector).map_err(at_resolve)?;

    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    Ok((events, report))
}

pub fn process_pdf(
    input: &Path,
    year: Option<i32>,
    work_dir: &WorkDir,
    output_dir: &Path,
    recognizer: &mut dyn TextRecognizer,
    options: &PipelineOptions,
) -> Result<ProcessReport, ScheduleError> {
    let scan = scan_pdf(input, year, work_dir, recognizer, options)?;
    let (events, mut resolution) =
        resolve_schedule_csv(&scan.artifacts.schedule_csv, scan.year, options)?;

    let mut warnings = scan.warnings.clone();
    warnings.append(&mut resolution.warnings);
    resolution.warnings = warnings;

    let calendars = write_calendars(output_dir, &events)
        .map_err(|error| error.at(Stage::Export, output_dir))?;

    Ok(ProcessReport {
        scan,
        resolution,
        events,
        calendars,
    })
}

#[cfg(test)]
mod tests {
    use super::validate;
    use crate::error::ScheduleError;
    use crate::options::PipelineOptions;

    #[test]
    fn default_options_are_valid() {
        assert!(validate(&PipelineOptions::default()).is_ok());
    }

    #[test]
    fn rejects_non_positive_tolerances_and_multiword_connector() {
        let options = PipelineOptions {
            row_tolerance: 0.0,
            ..PipelineOptions::default()
        };
        assert!(matches!(validate(&options), Err(ScheduleError::InvalidOption(_))));

        let options = PipelineOptions {
            connector: "i oraz".to_string(),
            ..PipelineOptions::default()
        };
        assert!(matches!(validate(&options), Err(ScheduleError::InvalidOption(_))));
    }

    #[test]
    fn rejects_numeric_connector() {
        let options = PipelineOptions {
            connector: "1".to_string(),
            ..PipelineOptions::default()
        };
        assert!(matches!(validate(&options), Err(ScheduleError::InvalidOption(_))));
    }
}
