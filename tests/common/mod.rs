#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;

use eko_harmonogram::{Detection, ScheduleError, TextRecognizer};
use image::{GrayImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

pub fn create_test_pdf(path: &Path, lines: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![16.into()]),
        Operation::new("Td", vec![50.into(), 780.into()]),
    ];
    for (index, line) in lines.iter().enumerate() {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        if index + 1 < lines.len() {
            operations.push(Operation::new("T*", vec![]));
        }
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path)?;
    Ok(())
}

pub const ROW_LINES: [u32; 5] = [50, 150, 300, 450, 650];
pub const COLUMN_LINES: [u32; 4] = [50, 250, 600, 950];

fn fill(image: &mut RgbImage, left: u32, top: u32, width: u32, height: u32, color: Rgb<u8>) {
    for y in top..top + height {
        for x in left..left + width {
            image.put_pixel(x, y, color);
        }
    }
}

pub fn draw_schedule_page(empty: &[(usize, usize)]) -> RgbImage {
    let mut page = RgbImage::from_pixel(1000, 720, Rgb([255, 255, 255]));
    let black = Rgb([0, 0, 0]);

    let (top, bottom) = (ROW_LINES[0], ROW_LINES[ROW_LINES.len() - 1]);
    let (left, right) = (COLUMN_LINES[0], COLUMN_LINES[COLUMN_LINES.len() - 1]);

    let shaded = (ROW_LINES[1], COLUMN_LINES[1]);
    fill(
        &mut page,
        shaded.1 + 3,
        shaded.0 + 3,
        COLUMN_LINES[2] - COLUMN_LINES[1] - 3,
        ROW_LINES[2] - ROW_LINES[1] - 3,
        Rgb([255, 240, 150]),
    );

    for row in 0..ROW_LINES.len() - 1 {
        for column in 0..COLUMN_LINES.len() - 1 {
            if empty.contains(&(row, column)) {
                continue;
            }
            let center_x = (COLUMN_LINES[column] + COLUMN_LINES[column + 1]) / 2;
            let center_y = (ROW_LINES[row] + ROW_LINES[row + 1]) / 2;
            fill(&mut page, center_x - 12, center_y - 8, 24, 16, black);
        }
    }

    for &y in &ROW_LINES {
        fill(&mut page, left, y, right - left + 3, 3, black);
    }
    for &x in &COLUMN_LINES {
        fill(&mut page, x, top, 3, bottom - top + 3, black);
    }

    page
}

pub fn word(x: f32, y: f32, text: &str) -> Detection {
    Detection::from_box(x, y, 60.0, 24.0, text, 0.95)
}

pub struct ScriptedRecognizer {
    batches: VecDeque<Vec<Detection>>,
    pub calls: usize,
}

impl ScriptedRecognizer {
    pub fn new(batches: Vec<Vec<Detection>>) -> Self {
        Self {
            batches: batches.into(),
            calls: 0,
        }
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(&mut self, image: &GrayImage) -> Result<Vec<Detection>, ScheduleError> {
        assert!(image.width() > 0 && image.height() > 0, "strip should not be empty");
        self.calls += 1;
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

pub fn header_detections() -> Vec<Detection> {
    vec![
        word(100.0, 30.0, "Miesiąc"),
        word(380.0, 30.0, "Zmieszane"),
        word(380.0, 52.0, "odpady komunalne"),
        word(730.0, 30.0, "Bio"),
    ]
}

pub fn body_detections() -> Vec<Detection> {
    vec![
        word(100.0, 60.0, "Styczeń"),
        word(380.0, 60.0, "3, 17 i"),
        word(380.0, 84.0, "31*"),
        word(730.0, 62.0, "+"),
        word(100.0, 210.0, "Luty"),
        word(380.0, 211.0, "14"),
        word(730.0, 209.0, "91 23"),
        word(100.0, 360.0, "Marzec"),
        word(380.0, 360.0, "141"),
    ]
}
