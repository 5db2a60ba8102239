use geo_types::{coord, Coord, Rect};
use itertools::Itertools;

/// A closed text-region outline in source-image pixel coordinates.
///
/// EAST yields rotated quadrilaterals, DB yields arbitrary contours; both end up here.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextPolygon {
    pub points: Vec<Coord<i32>>,
    pub score: f32,
}

impl TextPolygon {
    pub fn new(points: Vec<Coord<i32>>, score: f32) -> Self {
        Self { points, score }
    }

    pub fn from_f32(points: &[Coord<f32>], score: f32) -> Self {
        let points = points
            .iter()
            .map(|p| coord! { x: p.x.round() as i32, y: p.y.round() as i32 })
            .collect();
        Self { points, score }
    }

    /// A polygon needs at least three vertices to enclose anything.
    pub fn is_closed_shape(&self) -> bool {
        self.points.len() >= 3
    }

    /// Axis-aligned bounds, `None` for an empty polygon.
    pub fn bounding_rect(&self) -> Option<Rect<i32>> {
        let (min_x, max_x) = self.points.iter().map(|p| p.x).minmax().into_option()?;
        let (min_y, max_y) = self.points.iter().map(|p| p.y).minmax().into_option()?;
        Some(Rect::new(
            coord! { x: min_x, y: min_y },
            coord! { x: max_x, y: max_y },
        ))
    }

    /// Edges of the closed outline, including the one back to the first vertex.
    pub fn edges(&self) -> impl Iterator<Item = (Coord<i32>, Coord<i32>)> + '_ {
        self.points
            .iter()
            .copied()
            .circular_tuple_windows::<(Coord<i32>, Coord<i32>)>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_close_the_outline() {
        let poly = TextPolygon::new(
            vec![
                coord! { x: 0, y: 0 },
                coord! { x: 4, y: 0 },
                coord! { x: 4, y: 2 },
            ],
            0.9,
        );
        let edges: Vec<_> = poly.edges().collect();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2], (coord! { x: 4, y: 2 }, coord! { x: 0, y: 0 }));
    }

    #[test]
    fn bounds_and_rounding() {
        let poly = TextPolygon::from_f32(
            &[
                coord! { x: 1.4, y: 2.6 },
                coord! { x: 10.5, y: 2.0 },
                coord! { x: 3.0, y: 7.2 },
            ],
            1.0,
        );
        assert_eq!(poly.points[0], coord! { x: 1, y: 3 });
        let rect = poly.bounding_rect().unwrap();
        assert_eq!(rect.min(), coord! { x: 1, y: 2 });
        assert_eq!(rect.max(), coord! { x: 11, y: 7 });
        assert!(poly.is_closed_shape());
        assert!(TextPolygon::new(vec![], 0.0).bounding_rect().is_none());
    }
}
