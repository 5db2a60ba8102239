use std::path::Path;

use geo_types::{coord, Coord};
use ndarray::{Array1, ArrayViewD, Ix4};
use ort::{Session, SessionBuilder};

use super::{to_blob, DetectorConfig, DetectorKind, TextDetector};
pub use crate::error::{Error, Result};
use crate::{utils, TextPolygon};

/// Each geometry cell covers a 4x4 patch of the network input.
const EAST_STRIDE: f32 = 4.0;

/// An [`EAST`](https://arxiv.org/abs/1704.03155) scene text detector.
///
/// Emits one rotated quadrilateral per surviving text region.
pub struct EASTModel {
    model_name: String,
    model: Session,
    config: DetectorConfig,
}

impl EASTModel {
    /// Construct an [`EASTModel`] from an ONNX model file.
    pub fn new_from_file(
        file_path: &Path,
        config: DetectorConfig,
        session_builder: SessionBuilder,
    ) -> Result<Self> {
        if config.kind != DetectorKind::East {
            return Err(Error::Config(format!(
                "EAST model constructed with a {} profile",
                config.kind
            )));
        }

        let model = session_builder
            .commit_from_file(file_path)
            .map_err(|source| Error::ModelLoad {
                kind: DetectorKind::East,
                path: file_path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            model_name: model_name(file_path),
            model,
            config,
        })
    }

    fn inference_error(err: impl ToString) -> Error {
        Error::Inference {
            kind: DetectorKind::East,
            reason: err.to_string(),
        }
    }
}

impl TextDetector for EASTModel {
    fn kind(&self) -> DetectorKind {
        DetectorKind::East
    }

    fn detect(&self, img: &image::DynamicImage) -> Result<Vec<TextPolygon>> {
        let (img_width, img_height) = (img.width(), img.height());
        let input = to_blob(img, &self.config);

        let input_name = &self.model.inputs[0].name;
        let outputs = self
            .model
            .run(ort::inputs![input_name => input]?)
            .map_err(Self::inference_error)?;

        // Output order differs between exports; tell the maps apart by channel count.
        let mut scores = None;
        let mut geometry = None;
        for i in 0..self.model.outputs.len() {
            let tensor = outputs[i].try_extract_tensor::<f32>()?;
            let channels = tensor.shape().get(1).copied();
            match channels {
                Some(1) => scores = Some(tensor),
                Some(5) => geometry = Some(tensor),
                _ => {}
            }
        }
        let (Some(scores), Some(geometry)) = (scores, geometry) else {
            return Err(Self::inference_error(
                "model outputs lack a 1-channel score map and a 5-channel geometry map",
            ));
        };

        let polygons = decode_east(
            scores,
            geometry,
            &self.config,
            img_width as f32 / self.config.input_width as f32,
            img_height as f32 / self.config.input_height as f32,
        )?;

        tracing::debug!(
            model = %self.model_name,
            regions = polygons.len(),
            "EAST inference finished"
        );

        Ok(polygons)
    }
}

/// Turn EAST score/geometry maps into quadrilaterals in source-image coordinates.
///
/// `scores` is `1x1xHxW`, `geometry` is `1x5xHxW` (distances to the top, right,
/// bottom and left edges, then the rotation angle). Corners come out as
/// top-left, top-right, bottom-right, bottom-left.
pub fn decode_east(
    scores: ArrayViewD<'_, f32>,
    geometry: ArrayViewD<'_, f32>,
    config: &DetectorConfig,
    scale_x: f32,
    scale_y: f32,
) -> Result<Vec<TextPolygon>> {
    let scores = scores.into_dimensionality::<Ix4>()?;
    let geometry = geometry.into_dimensionality::<Ix4>()?;

    let (_, _, rows, cols) = scores.dim();
    let (_, geo_channels, geo_rows, geo_cols) = geometry.dim();
    if geo_channels != 5 || geo_rows != rows || geo_cols != cols {
        return Err(Error::Inference {
            kind: DetectorKind::East,
            reason: format!(
                "geometry map {:?} does not match score map {:?}",
                geometry.shape(),
                scores.shape()
            ),
        });
    }

    let mut quads: Vec<[Coord<f32>; 4]> = vec![];
    let mut confidences = vec![];

    for y in 0..rows {
        for x in 0..cols {
            let score = scores[[0, 0, y, x]];
            if score < config.confidence_threshold {
                continue;
            }

            let top = geometry[[0, 0, y, x]];
            let right = geometry[[0, 1, y, x]];
            let bottom = geometry[[0, 2, y, x]];
            let left = geometry[[0, 3, y, x]];
            let (sin, cos) = geometry[[0, 4, y, x]].sin_cos();

            let height = top + bottom;
            let width = right + left;

            let (origin_x, origin_y) = (x as f32 * EAST_STRIDE, y as f32 * EAST_STRIDE);
            let bottom_right = coord! {
                x: origin_x + cos * right + sin * bottom,
                y: origin_y - sin * right + cos * bottom,
            };
            let top_right = coord! {
                x: bottom_right.x - sin * height,
                y: bottom_right.y - cos * height,
            };
            let bottom_left = coord! {
                x: bottom_right.x - cos * width,
                y: bottom_right.y + sin * width,
            };
            let top_left = top_right + bottom_left - bottom_right;

            let quad = [top_left, top_right, bottom_right, bottom_left]
                .map(|p| coord! { x: p.x * scale_x, y: p.y * scale_y });
            quads.push(quad);
            confidences.push(score);
        }
    }

    if quads.is_empty() {
        return Ok(vec![]);
    }

    let confidences = Array1::from(confidences);

    let keep = utils::nms_polygons(&quads, &confidences, config.nms_threshold);

    Ok(keep
        .into_iter()
        .map(|i| TextPolygon::from_f32(&quads[i], confidences[i]))
        .collect())
}

pub(super) fn model_name(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.display().to_string())
}
