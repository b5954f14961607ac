use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use image::{EncodableLayout, ImageBuffer, ImageFormat, PixelWithColorType};
use tracing::info;

use crate::error::ScheduleError;

const IMAGE_DIR: &str = "image";
const OCR_DIR: &str = "ocr";
const CSV_DIR: &str = "csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub cropped: PathBuf,
    pub redless: PathBuf,
    pub colorless: PathBuf,
    pub filled: PathBuf,
    pub header_image: PathBuf,
    pub body_image: PathBuf,
    pub header_csv: PathBuf,
    pub body_csv: PathBuf,
    pub schedule_csv: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, ScheduleError> {
        let root = root.into();
        for sub in [IMAGE_DIR, OCR_DIR, CSV_DIR] {
            fs::create_dir_all(root.join(sub))?;
        }
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn artifacts(&self) -> ArtifactPaths {
        let image = self.root.join(IMAGE_DIR);
        let ocr = self.root.join(OCR_DIR);
        ArtifactPaths {
            cropped: image.join("1_cropped_table.png"),
            redless: image.join("2_redless.png"),
            colorless: image.join("3_colorless.png"),
            filled: image.join("4_filled_image.png"),
            header_image: image.join("5_header.png"),
            body_image: image.join("5_body.png"),
            header_csv: ocr.join("header_harmonogram.csv"),
            body_csv: ocr.join("data_harmonogram.csv"),
            schedule_csv: self.root.join(CSV_DIR).join("harmonogram.csv"),
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

pub(crate) fn replace_file<F>(path: &Path, write: F) -> Result<(), ScheduleError>
where
    F: FnOnce(&Path) -> Result<(), ScheduleError>,
{
    let temp = temp_sibling(path);
    if let Err(error) = write(&temp) {
        let _ = fs::remove_file(&temp);
        return Err(error);
    }
    fs::rename(&temp, path)?;
    Ok(())
}

pub(crate) fn save_png<P>(
    path: &Path,
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
) -> Result<(), ScheduleError>
where
    P: PixelWithColorType,
    [P::Subpixel]: EncodableLayout,
{
    replace_file(path, |temp| {
        image.save_with_format(temp, ImageFormat::Png)?;
        Ok(())
    })?;
    info!("saved {}", path.display());
    Ok(())
}
