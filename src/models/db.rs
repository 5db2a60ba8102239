use std::path::Path;

use clipper2::{EndType, JoinType, Path as ClipperPath};
use geo_types::{coord, Coord};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use itertools::Itertools;
use ndarray::{ArrayView2, ArrayViewD};
use ort::{Session, SessionBuilder};

use super::east::model_name;
use super::{to_blob, DetectorConfig, DetectorKind, TextDetector};
pub use crate::error::{Error, Result};
use crate::TextPolygon;

/// Regions whose shorter side is below this many map pixels are noise.
const MIN_REGION_SIDE: f32 = 3.0;
/// Douglas-Peucker tolerance as a fraction of the contour perimeter.
const APPROX_EPSILON_RATIO: f64 = 0.01;

/// A [`DB`](https://arxiv.org/abs/1911.08947) (differentiable binarization) text detector.
///
/// Emits arbitrary closed contours rather than quadrilaterals.
pub struct DBModel {
    model_name: String,
    model: Session,
    config: DetectorConfig,
}

impl DBModel {
    /// Construct a [`DBModel`] from an ONNX model file.
    pub fn new_from_file(
        file_path: &Path,
        config: DetectorConfig,
        session_builder: SessionBuilder,
    ) -> Result<Self> {
        if config.kind != DetectorKind::Db {
            return Err(Error::Config(format!(
                "DB model constructed with a {} profile",
                config.kind
            )));
        }

        let model = session_builder
            .commit_from_file(file_path)
            .map_err(|source| Error::ModelLoad {
                kind: DetectorKind::Db,
                path: file_path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            model_name: model_name(file_path),
            model,
            config,
        })
    }

}

impl TextDetector for DBModel {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Db
    }

    fn detect(&self, img: &image::DynamicImage) -> Result<Vec<TextPolygon>> {
        let input = to_blob(img, &self.config);

        let input_name = &self.model.inputs[0].name;
        let outputs = self
            .model
            .run(ort::inputs![input_name => input]?)
            .map_err(|err| Error::Inference {
                kind: DetectorKind::Db,
                reason: err.to_string(),
            })?;

        let probabilities = outputs[0].try_extract_tensor::<f32>()?;
        let polygons = polygons_from_probability_map(
            probabilities,
            &self.config,
            img.width(),
            img.height(),
        )?;

        tracing::debug!(
            model = %self.model_name,
            regions = polygons.len(),
            "DB inference finished"
        );

        Ok(polygons)
    }
}

/// Extract text polygons from a DB probability map.
///
/// `pred` may carry leading unit dimensions (`1x1xHxW`); the last two are the map.
/// Polygons are scaled to `dest_width` x `dest_height` and clamped to it.
pub fn polygons_from_probability_map(
    pred: ArrayViewD<'_, f32>,
    config: &DetectorConfig,
    dest_width: u32,
    dest_height: u32,
) -> Result<Vec<TextPolygon>> {
    let ndim = pred.ndim();
    if ndim < 2 {
        return Err(Error::Inference {
            kind: DetectorKind::Db,
            reason: format!("probability map has shape {:?}", pred.shape()),
        });
    }
    let (height, width) = (pred.shape()[ndim - 2], pred.shape()[ndim - 1]);
    let pred = pred.into_shape((height, width))?;

    if height == 0 || width == 0 {
        return Ok(vec![]);
    }

    let bitmap = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        if pred[[y as usize, x as usize]] > config.binary_threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    let scale_x = dest_width as f32 / width as f32;
    let scale_y = dest_height as f32 / height as f32;

    let mut polygons = vec![];

    let outer = find_contours::<i32>(&bitmap)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer))
        .take(config.max_candidates);

    for contour in outer {
        if contour.points.len() < 3 {
            continue;
        }

        let epsilon = APPROX_EPSILON_RATIO * arc_length(&contour.points, true);
        let approx = approximate_polygon_dp(&contour.points, epsilon, true);
        if approx.len() < 3 {
            continue;
        }

        let points: Vec<Coord<f32>> = approx
            .iter()
            .map(|p| coord! { x: p.x as f32, y: p.y as f32 })
            .collect();

        let (w, h) = extent(&points);
        if w.min(h) < MIN_REGION_SIDE {
            continue;
        }

        let score = polygon_score(&pred, &points);
        if score < config.polygon_threshold {
            continue;
        }

        let scaled: Vec<Coord<f32>> = unclip(&points, config.unclip_ratio)
            .into_iter()
            .map(|p| coord! {
                x: (p.x * scale_x).clamp(0.0, dest_width as f32),
                y: (p.y * scale_y).clamp(0.0, dest_height as f32),
            })
            .collect();

        polygons.push(TextPolygon::from_f32(&scaled, score));
    }

    Ok(polygons)
}

fn extent(points: &[Coord<f32>]) -> (f32, f32) {
    let (min_x, max_x) = points
        .iter()
        .map(|p| p.x)
        .minmax_by(f32::total_cmp)
        .into_option()
        .unwrap_or_default();
    let (min_y, max_y) = points
        .iter()
        .map(|p| p.y)
        .minmax_by(f32::total_cmp)
        .into_option()
        .unwrap_or_default();
    (max_x - min_x, max_y - min_y)
}

/// Mean probability over the map pixels whose centres fall inside the polygon.
fn polygon_score(pred: &ArrayView2<'_, f32>, points: &[Coord<f32>]) -> f32 {
    let (rows, cols) = pred.dim();
    let min_x = points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).max(0.0) as usize;
    let min_y = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).max(0.0) as usize;
    let max_x = (points.iter().map(|p| p.x).fold(0.0, f32::max) as usize).min(cols - 1);
    let max_y = (points.iter().map(|p| p.y).fold(0.0, f32::max) as usize).min(rows - 1);

    let mut sum = 0.0;
    let mut count = 0usize;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if contains(points, x as f32, y as f32) {
                sum += pred[[y, x]];
                count += 1;
            }
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Even-odd point-in-polygon test.
fn contains(points: &[Coord<f32>], x: f32, y: f32) -> bool {
    let mut inside = false;
    for (a, b) in points
        .iter()
        .circular_tuple_windows::<(&Coord<f32>, &Coord<f32>)>()
    {
        if (a.y > y) != (b.y > y) {
            let cross_x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
            if x <= cross_x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Grow a shrunk text kernel back out by offsetting every edge by
/// `area * ratio / perimeter`, with rounded corners.
///
/// Returns the input unchanged when it is degenerate or the offset does not
/// come out as a single outline.
fn unclip(points: &[Coord<f32>], unclip_ratio: f32) -> Vec<Coord<f32>> {
    let path: ClipperPath = points
        .iter()
        .map(|p| (p.x as f64, p.y as f64))
        .collect::<Vec<_>>()
        .into();

    let area = path.signed_area().abs();
    let perimeter: f64 = points
        .iter()
        .circular_tuple_windows::<(&Coord<f32>, &Coord<f32>)>()
        .map(|(a, b)| ((b.x - a.x) as f64).hypot((b.y - a.y) as f64))
        .sum();
    if area <= f64::EPSILON || perimeter <= f64::EPSILON {
        return points.to_vec();
    }

    let distance = area * unclip_ratio as f64 / perimeter;
    let mut grown = path
        .inflate(distance, JoinType::Round, EndType::Polygon, 2.0)
        .into_iter();

    match (grown.next(), grown.next()) {
        (Some(outline), None) if outline.len() >= 3 => outline
            .iter()
            .map(|p| coord! { x: p.x() as f32, y: p.y() as f32 })
            .collect(),
        _ => points.to_vec(),
    }
}
