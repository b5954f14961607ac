use image::imageops::{crop_imm, grayscale};
use image::{GrayImage, RgbImage};
use tracing::debug;

use crate::error::ScheduleError;
use crate::grid;

const LINE_PROFILE_RATIO: f64 = 0.3;
const LINE_GAP: u32 = 5;
const LINE_THICKNESS: u32 = 2;

#[derive(Debug, Clone)]
pub struct TableStrips {
    pub header: GrayImage,
    pub body: GrayImage,
    pub lines: Vec<u32>,
}

#[must_use]
pub fn horizontal_lines(gray: &GrayImage) -> Vec<u32> {
    let ink = grid::binarize(&grid::invert(gray), |value| value > 128);
    let opened = grid::open_rect(&ink, (gray.width() / 2).max(1), LINE_THICKNESS);
    grid::line_positions(&grid::row_profile(&opened), LINE_PROFILE_RATIO, LINE_GAP)
}

pub fn split_header_body(image: &RgbImage, margin: u32) -> Result<TableStrips, ScheduleError> {
    let gray = grayscale(image);
    let lines = horizontal_lines(&gray);
    let (top, split) = match lines.as_slice() {
        [top, split, ..] => (*top, *split),
        _ => return Err(ScheduleError::InsufficientGridLines { found: lines.len() }),
    };
    debug!("table top at y={top}, header ends at y={split}");

    let height = gray.height();
    let header_top = top.saturating_sub(margin);
    let header_bottom = (split + margin).min(height);
    let body_top = split.saturating_sub(margin);

    let header =
        crop_imm(&gray, 0, header_top, gray.width(), header_bottom - header_top).to_image();
    let body = crop_imm(&gray, 0, body_top, gray.width(), height - body_top).to_image();

    Ok(TableStrips {
        header,
        body,
        lines,
    })
}
