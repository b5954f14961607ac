use image::{GrayImage, Luma};
use imageproc::contours::find_contours;
use imageproc::point::Point;

pub(crate) const FOREGROUND: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub(crate) fn center(self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub(crate) fn inset(self, inset: u32) -> Option<Self> {
        let width = self.width.checked_sub(inset * 2).filter(|w| *w > 0)?;
        let height = self.height.checked_sub(inset * 2).filter(|h| *h > 0)?;
        Some(Self {
            x: self.x + inset,
            y: self.y + inset,
            width,
            height,
        })
    }

    pub(crate) fn pixels(self) -> impl Iterator<Item = (u32, u32)> {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

pub(crate) fn binarize(gray: &GrayImage, is_foreground: impl Fn(u8) -> bool) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if is_foreground(gray.get_pixel(x, y)[0]) {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

pub(crate) fn invert(gray: &GrayImage) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([255 - gray.get_pixel(x, y)[0]])
    })
}

pub(crate) fn union(left: &GrayImage, right: &GrayImage) -> GrayImage {
    GrayImage::from_fn(left.width(), left.height(), |x, y| {
        Luma([left.get_pixel(x, y)[0].max(right.get_pixel(x, y)[0])])
    })
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

fn window_pass(mask: &GrayImage, size: u32, axis: Axis, erode: bool) -> GrayImage {
    let (width, height) = mask.dimensions();
    let size = size.max(1);
    let mut out = GrayImage::new(width, height);

    let (lanes, length) = match axis {
        Axis::Horizontal => (height, width),
        Axis::Vertical => (width, height),
    };
    let at = |lane: u32, offset: u32| match axis {
        Axis::Horizontal => (offset, lane),
        Axis::Vertical => (lane, offset),
    };

    let mut prefix = vec![0_u32; length as usize + 1];
    for lane in 0..lanes {
        for offset in 0..length {
            let (x, y) = at(lane, offset);
            let set = u32::from(mask.get_pixel(x, y)[0] > 0);
            prefix[offset as usize + 1] = prefix[offset as usize] + set;
        }

        for offset in 0..length {
            let keep = if erode {
                let end = offset + size;
                end <= length && prefix[end as usize] - prefix[offset as usize] == size
            } else {
                let start = (offset + 1).saturating_sub(size);
                prefix[offset as usize + 1] - prefix[start as usize] > 0
            };
            if keep {
                let (x, y) = at(lane, offset);
                out.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    out
}

pub(crate) fn open_rect(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    let eroded = window_pass(
        &window_pass(mask, width, Axis::Horizontal, true),
        height,
        Axis::Vertical,
        true,
    );
    window_pass(
        &window_pass(&eroded, width, Axis::Horizontal, false),
        height,
        Axis::Vertical,
        false,
    )
}

pub(crate) fn row_profile(mask: &GrayImage) -> Vec<u64> {
    mask.rows()
        .map(|row| row.filter(|pixel| pixel[0] > 0).count() as u64)
        .collect()
}

pub(crate) fn line_positions(profile: &[u64], ratio: f64, max_gap: u32) -> Vec<u32> {
    let Some(&max) = profile.iter().max() else {
        return Vec::new();
    };
    if max == 0 {
        return Vec::new();
    }

    #[allow(clippy::cast_precision_loss)]
    let threshold = max as f64 * ratio;
    let positions = profile
        .iter()
        .enumerate()
        .filter(|(_, value)| {
            #[allow(clippy::cast_precision_loss)]
            let value = **value as f64;
            value > threshold
        })
        .filter_map(|(index, _)| u32::try_from(index).ok())
        .collect::<Vec<_>>();

    group_positions(&positions, max_gap)
}

pub(crate) fn group_positions(positions: &[u32], max_gap: u32) -> Vec<u32> {
    let mut lines = Vec::new();
    let mut current: Vec<u32> = Vec::new();

    for &position in positions {
        if let Some(&last) = current.last() {
            if position - last > max_gap {
                lines.push(mean_position(&current));
                current.clear();
            }
        }
        current.push(position);
    }
    if !current.is_empty() {
        lines.push(mean_position(&current));
    }

    lines
}

fn mean_position(values: &[u32]) -> u32 {
    let sum: u64 = values.iter().map(|value| u64::from(*value)).sum();
    u32::try_from(sum / values.len().max(1) as u64).unwrap_or(u32::MAX)
}

fn bounding_region(points: &[Point<u32>]) -> Option<Region> {
    let min_x = points.iter().map(|point| point.x).min()?;
    let max_x = points.iter().map(|point| point.x).max()?;
    let min_y = points.iter().map(|point| point.y).min()?;
    let max_y = points.iter().map(|point| point.y).max()?;
    Some(Region {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

fn polygon_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| {
            i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let area = twice_area.unsigned_abs() as f64 / 2.0;
    area
}

pub(crate) fn largest_outer_region(mask: &GrayImage) -> Option<Region> {
    find_contours::<u32>(mask)
        .into_iter()
        .filter(|contour| contour.parent.is_none())
        .map(|contour| (polygon_area(&contour.points), contour.points))
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .and_then(|(_, points)| bounding_region(&points))
}

pub(crate) fn contour_regions(mask: &GrayImage) -> Vec<Region> {
    let mut regions = Vec::new();
    for contour in find_contours::<u32>(mask) {
        if let Some(region) = bounding_region(&contour.points) {
            if !regions.contains(&region) {
                regions.push(region);
            }
        }
    }
    regions
}
