//! Text detection models.

mod config;
mod db;
mod east;

use std::fmt;
use std::path::Path;

use image::imageops;
use ndarray::{Array, Array4};

pub use config::{
    DetectorConfig, CHANNEL_MEAN, DB_INPUT_SIZE, EAST_INPUT_SIZE, EAST_UPSTREAM_INPUT_SIZE,
};
pub use db::{polygons_from_probability_map, DBModel};
pub use east::{decode_east, EASTModel};

pub use crate::error::{Error, Result};
use crate::TextPolygon;

/// Which detection capability a detector wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DetectorKind {
    East,
    Db,
}

impl DetectorKind {
    /// Name of the output tree this detector writes into, next to the input root.
    pub fn output_dir_name(&self) -> &'static str {
        match self {
            DetectorKind::East => "ImagesProcessedWithEAST",
            DetectorKind::Db => "ImagesProcessedWithDB50",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::East => f.write_str("EAST"),
            DetectorKind::Db => f.write_str("DB"),
        }
    }
}

/// Image in, text polygons out.
///
/// One instance is shared by every task of a run, hence `Send + Sync`.
pub trait TextDetector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    /// An empty vector means no text was found, which is not an error.
    fn detect(&self, img: &image::DynamicImage) -> Result<Vec<TextPolygon>>;
}

/// Load the model for `config.kind` from an ONNX artifact.
pub fn load_detector(
    config: DetectorConfig,
    file_path: impl AsRef<Path>,
) -> Result<Box<dyn TextDetector>> {
    let file_path = file_path.as_ref();
    let session_builder = ort::Session::builder()?;
    match config.kind {
        DetectorKind::East => Ok(Box::new(EASTModel::new_from_file(
            file_path,
            config,
            session_builder,
        )?)),
        DetectorKind::Db => Ok(Box::new(DBModel::new_from_file(
            file_path,
            config,
            session_builder,
        )?)),
    }
}

/// Stands in for a detector whose artifact could not be loaded.
///
/// Every call fails, so the failure stays scoped to each (file, detector) task.
pub struct UnavailableDetector {
    kind: DetectorKind,
    reason: String,
}

impl UnavailableDetector {
    pub fn new(kind: DetectorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl TextDetector for UnavailableDetector {
    fn kind(&self) -> DetectorKind {
        self.kind
    }

    fn detect(&self, _img: &image::DynamicImage) -> Result<Vec<TextPolygon>> {
        Err(Error::ModelUnavailable {
            kind: self.kind,
            reason: self.reason.clone(),
        })
    }
}

/// Resize to the network input and lay the pixels out as a `1x3xHxW` blob.
///
/// The image crate decodes RGB, so with `swap_rb` the blob is RGB; without it, BGR.
pub(crate) fn to_blob(img: &image::DynamicImage, config: &DetectorConfig) -> Array4<f32> {
    let (width, height) = (config.input_width, config.input_height);
    let resized = img.resize_exact(width, height, imageops::FilterType::Triangle);

    let mut blob = Array::zeros((1, 3, height as usize, width as usize));
    let order: [usize; 3] = if config.swap_rb { [0, 1, 2] } else { [2, 1, 0] };

    for (x, y, pixel) in resized.into_rgb8().enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (c, &src) in order.iter().enumerate() {
            blob[[0, c, y, x]] = (pixel.0[src] as f32 - config.mean[c]) * config.scale;
        }
    }

    blob
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    #[test]
    fn blob_has_network_geometry() {
        let config = DetectorConfig::east().with_input_size(64, 32);
        let blob = to_blob(&solid(10, 7, [0, 0, 0]), &config);
        assert_eq!(blob.shape(), &[1, 3, 32, 64]);
    }

    #[test]
    fn blob_subtracts_mean_in_rgb_order_when_swapping() {
        let config = DetectorConfig::east().with_input_size(32, 32);
        let blob = to_blob(&solid(8, 8, [200, 100, 50]), &config);
        assert!((blob[[0, 0, 0, 0]] - (200.0 - CHANNEL_MEAN[0])).abs() < 1e-3);
        assert!((blob[[0, 2, 5, 5]] - (50.0 - CHANNEL_MEAN[2])).abs() < 1e-3);
    }

    #[test]
    fn blob_is_bgr_and_scaled_without_swap() {
        let mut config = DetectorConfig::db().with_input_size(32, 32);
        config.swap_rb = false;
        let blob = to_blob(&solid(8, 8, [200, 100, 50]), &config);
        let expected = (50.0 - CHANNEL_MEAN[0]) / 255.0;
        assert!((blob[[0, 0, 3, 3]] - expected).abs() < 1e-5);
    }

    #[test]
    fn unavailable_detector_always_fails() {
        let detector = UnavailableDetector::new(DetectorKind::Db, "missing.onnx not found");
        let err = detector.detect(&solid(4, 4, [0, 0, 0])).unwrap_err();
        assert!(matches!(
            err,
            Error::ModelUnavailable {
                kind: DetectorKind::Db,
                ..
            }
        ));
        assert_eq!(detector.kind(), DetectorKind::Db);
    }

    #[test]
    fn output_tree_names() {
        assert_eq!(DetectorKind::East.output_dir_name(), "ImagesProcessedWithEAST");
        assert_eq!(DetectorKind::Db.output_dir_name(), "ImagesProcessedWithDB50");
        assert_eq!(DetectorKind::Db.to_string(), "DB");
    }
}
