use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::error::{Error, Result};
use crate::TextPolygon;

/// How polygons are stroked onto the annotated copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStyle {
    pub color: Rgb<u8>,
    pub thickness: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: Rgb([0, 255, 0]),
            thickness: 2,
        }
    }
}

/// Draw every polygon as a closed outline onto a fresh RGB copy of `img`.
///
/// Polygons with fewer than three points are skipped.
pub fn render(
    img: &image::DynamicImage,
    polygons: &[TextPolygon],
    style: &AnnotationStyle,
) -> RgbImage {
    let mut canvas = img.to_rgb8();

    for polygon in polygons.iter().filter(|p| p.is_closed_shape()) {
        for (a, b) in polygon.edges() {
            let (ax, ay, bx, by) = (a.x as f32, a.y as f32, b.x as f32, b.y as f32);
            for t in 0..style.thickness.max(1) {
                let t = t as f32;
                draw_line_segment_mut(&mut canvas, (ax + t, ay), (bx + t, by), style.color);
                draw_line_segment_mut(&mut canvas, (ax, ay + t), (bx, by + t), style.color);
            }
        }
    }

    canvas
}

/// Persist with the codec implied by the extension of `path`.
pub fn write(img: &RgbImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|_| Error::UnsupportedFormat(path.to_path_buf()))?;
    img.save_with_format(path, format).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;
    use image::DynamicImage;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    fn square(x0: i32, y0: i32, x1: i32, y1: i32) -> TextPolygon {
        TextPolygon::new(
            vec![
                coord! { x: x0, y: y0 },
                coord! { x: x1, y: y0 },
                coord! { x: x1, y: y1 },
                coord! { x: x0, y: y1 },
            ],
            1.0,
        )
    }

    #[test]
    fn outlines_are_two_pixels_wide_and_closed() {
        let style = AnnotationStyle::default();
        let src = blank(20, 20);
        let out = render(&src, &[square(2, 2, 12, 12)], &style);

        // Top edge and its second stroke row.
        assert_eq!(*out.get_pixel(7, 2), style.color);
        assert_eq!(*out.get_pixel(7, 3), style.color);
        // Closing edge back to the first vertex.
        assert_eq!(*out.get_pixel(2, 7), style.color);
        // Interior and outside untouched.
        assert_eq!(*out.get_pixel(7, 7), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(18, 18), Rgb([0, 0, 0]));
    }

    #[test]
    fn source_image_is_not_mutated() {
        let src = blank(10, 10);
        let _ = render(&src, &[square(1, 1, 8, 8)], &AnnotationStyle::default());
        assert!(src.to_rgb8().pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn degenerate_polygons_and_out_of_bounds_points_are_tolerated() {
        let line = TextPolygon::new(vec![coord! { x: 0, y: 0 }, coord! { x: 5, y: 5 }], 1.0);
        let polygons = [line, square(-5, -5, 50, 50)];
        let out = render(&blank(10, 10), &polygons, &AnnotationStyle::default());
        assert_eq!(*out.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn write_picks_codec_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbImage::new(4, 4);

        write(&img, &dir.path().join("a.png")).unwrap();
        write(&img, &dir.path().join("b.JPG")).unwrap();

        assert_eq!(image::open(dir.path().join("a.png")).unwrap().width(), 4);
        assert_eq!(image::open(dir.path().join("b.JPG")).unwrap().height(), 4);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = write(&RgbImage::new(2, 2), &dir.path().join("a.unknownext")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_parent_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write(&RgbImage::new(2, 2), &dir.path().join("nope/a.png")).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }
}
