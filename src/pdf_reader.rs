use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use encoding_rs::{ISO_8859_2, UTF_16BE, WINDOWS_1250};
use image::RgbImage;
use lopdf::content::Content;
use lopdf::{Document, Object};
use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::ScheduleError;

const POINTS_PER_INCH: f32 = 72.0;

static YEAR_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:KALENDARZ\s+ODBIORU\s+ODPAD[ÓO]W|WASTE\s+COLLECTION\s+CALENDAR)\s*(\d{4})",
    )
    .expect("hardcoded year label regex is valid")
});

fn looks_decoding_broken(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();
    replacement * 8 > total || control * 5 > total
}

fn decode_central_european(encoding: &str, bytes: &[u8]) -> Option<String> {
    let lower = encoding.to_ascii_lowercase();
    let legacy = if lower.contains("1250") || lower.contains("centraleuro") {
        WINDOWS_1250
    } else if lower.contains("8859-2") || lower.contains("latin2") {
        ISO_8859_2
    } else {
        return None;
    };

    let (text, _, had_errors) = legacy.decode(bytes);
    (!had_errors && !text.is_empty()).then(|| text.into_owned())
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    if bytes.starts_with(&[0xFE, 0xFF]) {
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(&bytes[2..]);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    if let Some(text) = encoding.and_then(|name| decode_central_european(name, bytes)) {
        return text;
    }

    String::from_utf8_lossy(bytes).to_string()
}

fn extract_text_from_page_content(document: &Document, page_id: lopdf::ObjectId) -> Option<String> {
    fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => text.push_str(&decode_pdf_bytes(encoding, bytes)),
                Object::Array(items) => {
                    collect_text(text, encoding, items);
                    text.push(' ');
                }
                Object::Integer(value) if *value < -100 => text.push(' '),
                _ => {}
            }
        }
    }

    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_encoding = None;
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                if let Some(font_name) = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                {
                    current_encoding = encodings.get(font_name).copied();
                }
            }
            "Tj" | "TJ" | "'" | "\"" => {
                collect_text(&mut current, current_encoding, &operation.operands);
            }
            "T*" | "Td" | "TD" | "ET" => {
                if !current.trim().is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
            }
            _ => {}
        }
    }
    if !current.trim().is_empty() {
        lines.push(current);
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

pub fn first_page_text_candidates(input_pdf: &Path) -> Result<Vec<String>, ScheduleError> {
    let document = Document::load(input_pdf)?;
    let mut candidates = Vec::new();

    match pdf_extract::extract_text(input_pdf) {
        Ok(text) => {
            if let Some(first) = text
                .split('\u{000C}')
                .next()
                .filter(|page| !page.trim().is_empty())
            {
                candidates.push(first.to_string());
            }
        }
        Err(error) => debug!("pdf-extract failed: {error}"),
    }

    if let Some((&page_no, &page_id)) = document.get_pages().iter().next() {
        if let Some(text) = extract_text_from_page_content(&document, page_id) {
            candidates.push(text);
        }
        if let Some(text) = document
            .extract_text(&[page_no])
            .ok()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }
    }

    Ok(candidates)
}

#[must_use]
pub fn year_from_text(text: &str) -> Option<i32> {
    YEAR_LABEL_RE
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|year| year.as_str().parse().ok())
}

#[must_use]
pub fn fallback_year(today: NaiveDate) -> i32 {
    if today.month() == 12 {
        today.year() + 1
    } else {
        today.year()
    }
}

#[must_use]
pub fn detect_year_on(input_pdf: &Path, today: NaiveDate) -> i32 {
    let candidates = match first_page_text_candidates(input_pdf) {
        Ok(candidates) => candidates,
        Err(error) => {
            warn!("cannot read text from {}: {error}", input_pdf.display());
            Vec::new()
        }
    };

    if let Some(year) = candidates.iter().find_map(|text| year_from_text(text)) {
        info!("schedule year {year} found in {}", input_pdf.display());
        return year;
    }

    let year = fallback_year(today);
    warn!("no year label in {}; assuming {year}", input_pdf.display());
    year
}

#[must_use]
pub fn detect_year(input_pdf: &Path) -> i32 {
    detect_year_on(input_pdf, Local::now().date_naive())
}

pub fn render_first_page(input_pdf: &Path, dpi: f32) -> Result<RgbImage, ScheduleError> {
    let render_error =
        |error: pdfium_render::prelude::PdfiumError| ScheduleError::PdfRender(error.to_string());

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(render_error)?;
    let pdfium = Pdfium::new(bindings);
    let document = pdfium.load_pdf_from_file(input_pdf, None).map_err(render_error)?;
    let page = document.pages().get(0).map_err(render_error)?;

    let scale = dpi / POINTS_PER_INCH;
    #[allow(clippy::cast_possible_truncation)]
    let (width, height) = (
        (page.width().value * scale).round() as i32,
        (page.height().value * scale).round() as i32,
    );
    debug!("rendering first page at {width}x{height}");

    let config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_target_height(height)
        .render_form_data(true)
        .render_annotations(true);
    let bitmap = page.render_with_config(&config).map_err(render_error)?;

    Ok(bitmap.as_image().to_rgb8())
}

pub fn load_page_image(input: &Path, dpi: f32) -> Result<RgbImage, ScheduleError> {
    let is_pdf = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        render_first_page(input, dpi)
    } else {
        Ok(image::open(input)?.to_rgb8())
    }
}
