use std::path::Path;

use image::GrayImage;
use tracing::debug;

use crate::error::ScheduleError;
use crate::model::{TableCell, TableRow};
use crate::options::PipelineOptions;
use crate::repair::repair_cell_text;

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub quad: [(f32, f32); 4],
    pub text: String,
    pub confidence: f32,
}

impl Detection {
    #[must_use]
    pub fn from_box(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        text: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            quad: [
                (x, y),
                (x + width, y),
                (x + width, y + height),
                (x, y + height),
            ],
            text: text.into(),
            confidence,
        }
    }

    #[must_use]
    pub fn center_x(&self) -> f32 {
        self.quad.iter().map(|(x, _)| x).sum::<f32>() / 4.0
    }

    #[must_use]
    pub fn baseline(&self) -> f32 {
        self.quad
            .iter()
            .map(|(_, y)| *y)
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

pub trait TextRecognizer {
    fn recognize(&mut self, image: &GrayImage) -> Result<Vec<Detection>, ScheduleError>;
}

fn group_rows(detections: &[Detection], row_tolerance: f32) -> Vec<TableCell> {
    let mut ordered = detections
        .iter()
        .filter_map(|detection| {
            let text = detection.text.trim();
            (!text.is_empty()).then(|| (detection.center_x(), detection.baseline(), text))
        })
        .collect::<Vec<_>>();
    ordered.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.total_cmp(&b.0)));

    let mut cells = Vec::with_capacity(ordered.len());
    let mut row = 0;
    let mut last_baseline: Option<f32> = None;
    for (x, y, text) in ordered {
        if let Some(previous) = last_baseline {
            if (y - previous).abs() >= row_tolerance {
                row += 1;
            }
        }
        last_baseline = Some(y);
        cells.push(TableCell {
            text: text.to_string(),
            x,
            y,
            row,
        });
    }

    cells
}

#[must_use]
pub fn column_anchors(centers: &[f32], tolerance: f32) -> Vec<f32> {
    let mut sorted = centers.to_vec();
    sorted.sort_by(f32::total_cmp);

    let mut anchors = Vec::new();
    let mut group: Vec<f32> = Vec::new();
    for x in sorted {
        if let Some(&last) = group.last() {
            if (x - last).abs() >= tolerance {
                anchors.push(mean(&group));
                group.clear();
            }
        }
        group.push(x);
    }
    if !group.is_empty() {
        anchors.push(mean(&group));
    }

    anchors
}

fn mean(values: &[f32]) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let count = values.len().max(1) as f32;
    values.iter().sum::<f32>() / count
}

fn nearest_column(x: f32, anchors: &[f32]) -> usize {
    anchors
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (x - **a).abs().total_cmp(&(x - **b).abs()))
        .map_or(0, |(index, _)| index)
}

fn merge_fragments(mut fragments: Vec<&TableCell>, merge_tolerance: f32) -> String {
    fragments.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut lines: Vec<Vec<&TableCell>> = Vec::new();
    let mut last_y: Option<f32> = None;
    for fragment in fragments {
        match (lines.last_mut(), last_y) {
            (Some(line), Some(previous)) if (fragment.y - previous).abs() < merge_tolerance => {
                line.push(fragment);
            }
            _ => lines.push(vec![fragment]),
        }
        last_y = Some(fragment.y);
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            line.iter()
                .map(|fragment| fragment.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn reconstruct_table(
    detections: &[Detection],
    options: &PipelineOptions,
) -> Result<Vec<TableRow>, ScheduleError> {
    let cells = group_rows(detections, options.row_tolerance);
    if cells.is_empty() {
        return Err(ScheduleError::EmptyScan);
    }

    let anchors = match &options.column_anchors {
        Some(anchors) => anchors.centers().to_vec(),
        None => column_anchors(
            &cells.iter().map(|cell| cell.x).collect::<Vec<_>>(),
            options.column_tolerance,
        ),
    };
    debug!("column anchors: {anchors:?}");

    let row_count = cells.last().map_or(0, |cell| cell.row + 1);
    let mut rows = Vec::with_capacity(row_count);
    for row in 0..row_count {
        let mut buckets: Vec<Vec<&TableCell>> = vec![Vec::new(); anchors.len()];
        for cell in cells.iter().filter(|cell| cell.row == row) {
            buckets[nearest_column(cell.x, &anchors)].push(cell);
        }

        let texts = buckets
            .into_iter()
            .map(|bucket| {
                if bucket.is_empty() {
                    String::new()
                } else {
                    let merged = merge_fragments(bucket, options.merge_tolerance);
                    repair_cell_text(&merged, &options.connector)
                }
            })
            .collect::<TableRow>();
        rows.push(texts);
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, String::new());
    }

    Ok(rows)
}

pub fn recognize_table(
    recognizer: &mut dyn TextRecognizer,
    image: &GrayImage,
    options: &PipelineOptions,
) -> Result<Vec<TableRow>, ScheduleError> {
    let detections = recognizer.recognize(image)?;
    debug!("{} detections", detections.len());
    reconstruct_table(&detections, options)
}

#[cfg(feature = "tesseract")]
pub fn default_recognizer(
    model_dir: Option<&Path>,
    language: &str,
    dpi: f32,
) -> Result<Box<dyn TextRecognizer>, ScheduleError> {
    Ok(Box::new(tesseract::TesseractRecognizer::new(model_dir, language, dpi)?))
}

#[cfg(not(feature = "tesseract"))]
pub fn default_recognizer(
    _model_dir: Option<&Path>,
    _language: &str,
    _dpi: f32,
) -> Result<Box<dyn TextRecognizer>, ScheduleError> {
    Err(ScheduleError::OcrEngine(
        "no OCR backend in this build; rebuild with `--features tesseract`".to_string(),
    ))
}

#[cfg(feature = "tesseract")]
pub mod tesseract {
    use std::io::Cursor;
    use std::path::Path;

    use image::{GrayImage, ImageFormat};
    use leptess::LepTess;
    use tracing::info;

    use super::{Detection, TextRecognizer};
    use crate::error::ScheduleError;

    const WORD_LEVEL: &str = "5";

    pub struct TesseractRecognizer {
        engine: LepTess,
        dpi: i32,
    }

    fn has_models(dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .any(|entry| entry.path().extension().is_some_and(|ext| ext == "traineddata"))
            })
            .unwrap_or(false)
    }

    impl TesseractRecognizer {
        pub fn new(
            model_dir: Option<&Path>,
            language: &str,
            dpi: f32,
        ) -> Result<Self, ScheduleError> {
            let data_path = match model_dir {
                Some(dir) if has_models(dir) => {
                    info!("using cached OCR models from {}", dir.display());
                    dir.to_str()
                }
                Some(dir) => {
                    info!(
                        "no OCR models cached in {}; using the engine's data path",
                        dir.display()
                    );
                    None
                }
                None => None,
            };

            let engine = LepTess::new(data_path, language)
                .map_err(|error| ScheduleError::OcrEngine(error.to_string()))?;
            #[allow(clippy::cast_possible_truncation)]
            let dpi = dpi.round() as i32;
            Ok(Self { engine, dpi })
        }
    }

    pub(crate) fn parse_tsv(tsv: &str) -> Vec<Detection> {
        tsv.lines()
            .filter_map(|line| {
                let fields = line.split('\t').collect::<Vec<_>>();
                if fields.len() < 12 || fields[0] != WORD_LEVEL {
                    return None;
                }
                let number = |index: usize| fields[index].trim().parse::<f32>().ok();
                let confidence = number(10)?;
                let text = fields[11].trim();
                if confidence < 0.0 || text.is_empty() {
                    return None;
                }
                Some(Detection::from_box(
                    number(6)?,
                    number(7)?,
                    number(8)?,
                    number(9)?,
                    text,
                    confidence / 100.0,
                ))
            })
            .collect()
    }

    impl TextRecognizer for TesseractRecognizer {
        fn recognize(&mut self, image: &GrayImage) -> Result<Vec<Detection>, ScheduleError> {
            let mut png = Cursor::new(Vec::new());
            image.write_to(&mut png, ImageFormat::Png)?;

            self.engine
                .set_image_from_mem(png.get_ref())
                .map_err(|error| ScheduleError::OcrEngine(error.to_string()))?;
            self.engine.set_source_resolution(self.dpi);
            let tsv = self
                .engine
                .get_tsv_text(0)
                .map_err(|error| ScheduleError::OcrEngine(error.to_string()))?;

            Ok(parse_tsv(&tsv))
        }
    }

}
