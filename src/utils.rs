use clipper2::{intersect, FillRule, Paths};
use geo_types::Coord;
use itertools::Itertools;
use ndarray::prelude::*;
use ndarray::Data;

use std::cmp::Ordering;

// argsort_by function from: https://github.com/rust-ndarray/ndarray/issues/1145
pub fn argsort_by<S, F>(arr: &ArrayBase<S, Ix1>, mut compare: F) -> Vec<usize>
where
    S: Data,
    F: FnMut(&S::Elem, &S::Elem) -> Ordering,
{
    let mut indices: Vec<usize> = (0..arr.len()).collect();
    indices.sort_by(move |&i, &j| compare(&arr[i], &arr[j]));
    indices
}

/// Greedy non-max suppression over arbitrary (possibly rotated) polygons.
///
/// Overlap is the true intersection-over-union of the outlines, not of their
/// bounding boxes. Returns the indices of the kept polygons, highest score first.
pub(crate) fn nms_polygons<const N: usize>(
    polygons: &[[Coord<f32>; N]],
    scores: &Array1<f32>,
    nms_thr: f32,
) -> Vec<usize> {
    let areas: Vec<f64> = polygons.iter().map(|p| shoelace(&to_f64(p))).collect();
    let bounds: Vec<[f32; 4]> = polygons.iter().map(|p| envelope(p)).collect();

    let mut order = {
        let mut o = argsort_by(scores, |a, b| a.total_cmp(b));
        o.reverse();
        o
    };

    let mut keep = vec![];

    while !order.is_empty() {
        let i = order[0];
        keep.push(i);

        order = order
            .iter()
            .skip(1)
            .copied()
            .filter(|&j| {
                if !bounds_overlap(&bounds[i], &bounds[j]) {
                    return true;
                }
                let inter = intersection_area(&polygons[i], &polygons[j]);
                let union = areas[i] + areas[j] - inter;
                let iou = if union > f64::EPSILON { inter / union } else { 0.0 };
                iou as f32 <= nms_thr
            })
            .collect();
    }

    keep
}

fn to_f64(points: &[Coord<f32>]) -> Vec<(f64, f64)> {
    points.iter().map(|p| (p.x as f64, p.y as f64)).collect()
}

/// Unsigned area of a simple polygon.
fn shoelace(points: &[(f64, f64)]) -> f64 {
    points
        .iter()
        .circular_tuple_windows::<(&(f64, f64), &(f64, f64))>()
        .map(|(a, b)| a.0 * b.1 - b.0 * a.1)
        .sum::<f64>()
        .abs()
        / 2.0
}

fn intersection_area(a: &[Coord<f32>], b: &[Coord<f32>]) -> f64 {
    let subject: Paths = vec![to_f64(a)].into();
    let clip: Paths = vec![to_f64(b)].into();
    match intersect(subject, clip, FillRule::NonZero) {
        Ok(overlap) => {
            let outlines: Vec<Vec<(f64, f64)>> = overlap.into();
            outlines.iter().map(|o| shoelace(o)).sum()
        }
        Err(err) => {
            tracing::debug!(error = ?err, "polygon intersection failed; treating as disjoint");
            0.0
        }
    }
}

fn envelope(points: &[Coord<f32>]) -> [f32; 4] {
    points.iter().fold(
        [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY],
        |[x1, y1, x2, y2], p| [x1.min(p.x), y1.min(p.y), x2.max(p.x), y2.max(p.y)],
    )
}

fn bounds_overlap(a: &[f32; 4], b: &[f32; 4]) -> bool {
    a[0] < b[2] && b[0] < a[2] && a[1] < b[3] && b[1] < a[3]
}
