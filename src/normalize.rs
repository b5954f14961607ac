use image::imageops::{crop_imm, grayscale};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::filter::box_filter;
use imageproc::morphology::dilate;
use imageproc::rect::Rect;
use tracing::{debug, info};

use crate::error::ScheduleError;
use crate::grid::{self, Region};
use crate::options::{PipelineOptions, RedFilter};

pub const SENTINEL_GLYPH: char = '+';

const INK_THRESHOLD: u8 = 50;
const ADAPTIVE_RADIUS: u32 = 7;
const ADAPTIVE_OFFSET: i16 = 2;
const LINE_FRACTION: u32 = 30;
const MIN_COLOR_CELL: u32 = 20;
const RULING_KERNEL: u32 = 79;
const MIN_CELL_WIDTH: u32 = 40;
const MIN_CELL_HEIGHT: u32 = 20;
const MAX_CELL_WIDTH_SHARE: f64 = 0.95;
const CELL_INSET: u32 = 3;
const SENTINEL_ARM: u32 = 8;
const SENTINEL_STROKE: u32 = 3;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub cropped: RgbImage,
    pub redless: RgbImage,
    pub colorless: RgbImage,
    pub filled: RgbImage,
    pub filled_cells: usize,
}

pub fn normalize_page(
    page: &RgbImage,
    options: &PipelineOptions,
) -> Result<NormalizedTable, ScheduleError> {
    let cropped = crop_table(page, options.crop_margin)?;

    let mut redless = cropped.clone();
    let recolored = replace_red(&mut redless, options.red_filter);
    debug!("replaced {recolored} red pixels");

    let colorless = strip_background_colors(&redless, options);

    let mut filled = colorless.clone();
    let filled_cells = fill_empty_cells(&mut filled, options.empty_cell_whiteness);
    info!("marked {filled_cells} empty cells with '{SENTINEL_GLYPH}'");

    Ok(NormalizedTable {
        cropped,
        redless,
        colorless,
        filled,
        filled_cells,
    })
}

pub fn crop_table(page: &RgbImage, margin: u32) -> Result<RgbImage, ScheduleError> {
    let ink = grid::binarize(&grayscale(page), |value| value <= INK_THRESHOLD);
    let region = grid::largest_outer_region(&ink).ok_or(ScheduleError::NoTableFound)?;

    let left = region.x.saturating_sub(margin);
    let top = region.y.saturating_sub(margin);
    let right = (region.x + region.width + margin).min(page.width());
    let bottom = (region.y + region.height + margin).min(page.height());
    debug!("table bounds x={left}..{right} y={top}..{bottom}");

    Ok(crop_imm(page, left, top, right - left, bottom - top).to_image())
}

pub(crate) fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { delta / max } else { 0.0 };
    if delta <= f32::EPSILON {
        return (0.0, saturation, max);
    }

    let hue = if (max - r).abs() <= f32::EPSILON {
        ((g - b) / delta).rem_euclid(6.0)
    } else if (max - g).abs() <= f32::EPSILON {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    (hue / 6.0, saturation, max)
}

pub fn replace_red(image: &mut RgbImage, filter: RedFilter) -> usize {
    let mut changed = 0;
    for pixel in image.pixels_mut() {
        let (hue, saturation, _) = rgb_to_hsv(*pixel);
        let red_hue = hue < filter.hue_tolerance || hue > 1.0 - filter.hue_tolerance;
        if red_hue && saturation > filter.min_saturation {
            *pixel = BLACK;
            changed += 1;
        }
    }
    changed
}

fn adaptive_foreground(gray: &GrayImage) -> GrayImage {
    let inverted = grid::invert(gray);
    let mean = box_filter(&inverted, ADAPTIVE_RADIUS, ADAPTIVE_RADIUS);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = i16::from(inverted.get_pixel(x, y)[0]);
        let threshold = i16::from(mean.get_pixel(x, y)[0]) + ADAPTIVE_OFFSET;
        image::Luma([if value > threshold { grid::FOREGROUND } else { 0 }])
    })
}

fn ruling_lines(mask: &GrayImage, horizontal: u32, vertical: u32) -> GrayImage {
    let rows = grid::open_rect(mask, horizontal.max(1), 1);
    let columns = grid::open_rect(mask, 1, vertical.max(1));
    grid::union(&rows, &columns)
}

fn mean_color(image: &RgbImage, region: Region) -> [f64; 3] {
    let mut sums = [0_u64; 3];
    let mut count = 0_u64;
    for (x, y) in region.pixels() {
        let Rgb(channels) = *image.get_pixel(x, y);
        for (sum, channel) in sums.iter_mut().zip(channels) {
            *sum += u64::from(channel);
        }
        count += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let means = sums.map(|sum| sum as f64 / count.max(1) as f64);
    means
}

fn within(pixel: Rgb<u8>, center: [f64; 3], tolerance: u8) -> bool {
    pixel
        .0
        .iter()
        .zip(center)
        .all(|(channel, mean)| (f64::from(*channel) - mean).abs() <= f64::from(tolerance))
}

fn is_saturated_bright(pixel: Rgb<u8>, options: &PipelineOptions) -> bool {
    let (_, saturation, value) = rgb_to_hsv(pixel);
    saturation * 255.0 >= f32::from(options.saturated_min_saturation)
        && value * 255.0 >= f32::from(options.saturated_min_value)
}

#[must_use]
pub fn strip_background_colors(image: &RgbImage, options: &PipelineOptions) -> RgbImage {
    let gray = grayscale(image);
    let foreground = adaptive_foreground(&gray);
    let lines = ruling_lines(
        &foreground,
        image.width() / LINE_FRACTION,
        image.height() / LINE_FRACTION,
    );

    let mut output = image.clone();
    let mut stripped = 0_usize;
    for region in grid::contour_regions(&lines) {
        if region.width < MIN_COLOR_CELL || region.height < MIN_COLOR_CELL {
            continue;
        }

        let background = mean_color(&output, region);
        for (x, y) in region.pixels() {
            let current = *output.get_pixel(x, y);
            if within(current, background, options.cell_color_tolerance)
                || is_saturated_bright(*image.get_pixel(x, y), options)
            {
                output.put_pixel(x, y, WHITE);
            }
        }
        stripped += 1;
    }
    debug!("stripped background colour from {stripped} regions");

    output
}

fn draw_sentinel(image: &mut RgbImage, region: Region) {
    let (cx, cy) = region.center();
    let (Ok(cx), Ok(cy)) = (i32::try_from(cx), i32::try_from(cy)) else {
        return;
    };
    let arm = SENTINEL_ARM as i32;
    let half_stroke = (SENTINEL_STROKE / 2) as i32;
    let span = SENTINEL_ARM * 2 + 1;

    draw_filled_rect_mut(
        image,
        Rect::at(cx - arm, cy - half_stroke).of_size(span, SENTINEL_STROKE),
        BLACK,
    );
    draw_filled_rect_mut(
        image,
        Rect::at(cx - half_stroke, cy - arm).of_size(SENTINEL_STROKE, span),
        BLACK,
    );
}

pub fn fill_empty_cells(image: &mut RgbImage, whiteness: f32) -> usize {
    let inverted = grid::invert(&grayscale(image));
    let ink = grid::binarize(&inverted, |value| value > 128);
    let lines = dilate(
        &ruling_lines(&ink, RULING_KERNEL, RULING_KERNEL),
        Norm::LInf,
        1,
    );

    #[allow(clippy::cast_precision_loss)]
    let max_width = f64::from(image.width()) * MAX_CELL_WIDTH_SHARE;
    let mut marked = 0;
    for region in grid::contour_regions(&lines) {
        if region.width < MIN_CELL_WIDTH
            || region.height < MIN_CELL_HEIGHT
            || f64::from(region.width) > max_width
        {
            continue;
        }
        let Some(interior) = region.inset(CELL_INSET) else {
            continue;
        };

        let total = u64::from(interior.width) * u64::from(interior.height);
        let blank = interior
            .pixels()
            .filter(|&(x, y)| inverted.get_pixel(x, y)[0] == 0)
            .count() as u64;
        #[allow(clippy::cast_precision_loss)]
        let ratio = blank as f64 / total as f64;
        if ratio > f64::from(whiteness) {
            draw_sentinel(image, region);
            marked += 1;
        }
    }

    marked
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::{crop_table, fill_empty_cells, replace_red, rgb_to_hsv, strip_background_colors};
    use crate::error::ScheduleError;
    use crate::options::{PipelineOptions, RedFilter};

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    fn draw_frame(image: &mut RgbImage, left: u32, top: u32, right: u32, bottom: u32) {
        for x in left..=right {
            for y in [top, top + 1, bottom - 1, bottom] {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        for y in top..=bottom {
            for x in [left, left + 1, right - 1, right] {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
    }

    fn shaded_cell(background: Rgb<u8>, ink: Rgb<u8>) -> RgbImage {
        let mut image = blank(200, 150);
        for y in 12..138 {
            for x in 12..188 {
                image.put_pixel(x, y, background);
            }
        }
        for y in 69..81 {
            for x in 98..102 {
                image.put_pixel(x, y, ink);
            }
        }
        draw_frame(&mut image, 10, 10, 189, 139);
        image
    }

    #[test]
    fn saturated_background_is_whitened_around_thin_stroke() {
        let image = shaded_cell(Rgb([255, 220, 0]), Rgb([0, 0, 0]));
        let stripped = strip_background_colors(&image, &PipelineOptions::default());

        assert_eq!(*stripped.get_pixel(30, 30), Rgb([255, 255, 255]));
        assert_eq!(*stripped.get_pixel(150, 120), Rgb([255, 255, 255]));
        assert_eq!(*stripped.get_pixel(99, 70), Rgb([0, 0, 0]), "stroke");
        assert_eq!(*stripped.get_pixel(101, 80), Rgb([0, 0, 0]), "stroke");
        assert_eq!(*stripped.get_pixel(10, 70), Rgb([0, 0, 0]), "ruling line");
    }

    #[test]
    fn pale_grey_background_is_whitened_and_dark_ink_kept() {
        let image = shaded_cell(Rgb([225, 225, 225]), Rgb([60, 60, 60]));
        let stripped = strip_background_colors(&image, &PipelineOptions::default());

        assert_eq!(*stripped.get_pixel(30, 30), Rgb([255, 255, 255]));
        assert_eq!(*stripped.get_pixel(99, 75), Rgb([60, 60, 60]), "stroke");
        assert_eq!(*stripped.get_pixel(189, 70), Rgb([0, 0, 0]), "ruling line");
    }

    #[test]
    fn hsv_of_primary_colors() {
        let (hue, saturation, value) = rgb_to_hsv(Rgb([255, 0, 0]));
        assert!(hue.abs() < 1e-6);
        assert!((saturation - 1.0).abs() < 1e-6);
        assert!((value - 1.0).abs() < 1e-6);

        let (hue, _, _) = rgb_to_hsv(Rgb([0, 0, 255]));
        assert!((hue - 2.0 / 3.0).abs() < 1e-6, "blue hue {hue}");
    }

    #[test]
    fn crop_keeps_frame_and_margin() {
        let mut page = blank(200, 150);
        draw_frame(&mut page, 40, 30, 139, 99);

        let cropped = crop_table(&page, 5).expect("frame should be cropped");
        assert_eq!(cropped.dimensions(), (110, 80));
    }

    #[test]
    fn crop_fails_on_blank_page() {
        let err = crop_table(&blank(50, 50), 5).expect_err("blank page has no table");
        assert!(matches!(err, ScheduleError::NoTableFound));
    }

    #[test]
    fn red_marks_become_black_and_blue_stays() {
        let mut image = blank(3, 1);
        image.put_pixel(0, 0, Rgb([220, 30, 40]));
        image.put_pixel(1, 0, Rgb([30, 60, 220]));

        let changed = replace_red(&mut image, RedFilter::default());
        assert_eq!(changed, 1);
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(1, 0), Rgb([30, 60, 220]));
        assert_eq!(*image.get_pixel(2, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn only_blank_cells_get_the_sentinel() {
        let mut image = blank(400, 200);
        draw_frame(&mut image, 10, 10, 389, 189);
        for y in 10..=189 {
            for x in [199, 200] {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        for y in 90..110 {
            for x in 90..110 {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }

        let marked = fill_empty_cells(&mut image, 0.998);
        assert_eq!(marked, 1);
        assert_eq!(*image.get_pixel(295, 100), Rgb([0, 0, 0]), "sentinel center");
    }
}
