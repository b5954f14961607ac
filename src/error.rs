use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rasterize,
    Normalize,
    Segment,
    Recognize,
    Assemble,
    Resolve,
    Export,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rasterize => "rasterize",
            Self::Normalize => "normalize",
            Self::Segment => "segment",
            Self::Recognize => "recognize",
            Self::Assemble => "assemble",
            Self::Resolve => "resolve",
            Self::Export => "export",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("failed to render PDF page: {0}")]
    PdfRender(String),

    #[error("no table contour found on the page")]
    NoTableFound,

    #[error("expected at least 2 horizontal grid lines, found {found}")]
    InsufficientGridLines { found: usize },

    #[error("text recognition returned no detections")]
    EmptyScan,

    #[error("unknown waste type in column header: {0:?}")]
    UnknownWasteType(String),

    #[error("OCR engine error: {0}")]
    OcrEngine(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("schedule table has no {0} column")]
    MissingColumn(&'static str),

    #[error("{stage} stage failed for '{}': {source}", path.display())]
    Stage {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: Box<ScheduleError>,
    },
}

impl ScheduleError {
    #[must_use]
    pub fn at(self, stage: Stage, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage {
                stage,
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self.root(),
            Self::NoTableFound
                | Self::InsufficientGridLines { .. }
                | Self::EmptyScan
                | Self::UnknownWasteType(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{ScheduleError, Stage};

    #[test]
    fn stage_context_names_stage_and_path() {
        let error = ScheduleError::EmptyScan.at(Stage::Recognize, "/tmp/work/image/5_body.png");
        let message = error.to_string();
        assert!(message.contains("recognize"), "message: {message}");
        assert!(message.contains("5_body.png"), "message: {message}");
        assert!(error.is_structural());
    }

    #[test]
    fn nested_stage_keeps_innermost_context() {
        let error = ScheduleError::NoTableFound
            .at(Stage::Normalize, Path::new("a.png"))
            .at(Stage::Rasterize, Path::new("b.pdf"));
        let ScheduleError::Stage { stage, .. } = &error else {
            panic!("expected stage wrapper, got {error:?}");
        };
        assert_eq!(*stage, Stage::Normalize);
        assert!(matches!(error.root(), ScheduleError::NoTableFound));
    }

    #[test]
    fn io_errors_are_not_structural() {
        let error = ScheduleError::Io(std::io::Error::other("disk full"));
        assert!(!error.is_structural());
    }
}
