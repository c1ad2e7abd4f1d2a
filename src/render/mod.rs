//! Annotation rendering
//!
//! Outlines grounded polygons on a copy of the page image.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::config::RenderSettings;
use crate::grounding::GroundedAnnotation;
use crate::vision::Point;

/// Height of the label tag drawn above a polygon
const TAG_HEIGHT: u32 = 6;
/// Tag width per label character
const TAG_CHAR_WIDTH: u32 = 4;

/// Outline colour and width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    pub color: Rgba<u8>,
    pub stroke_width: u32,
    pub draw_labels: bool,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::from(&RenderSettings::default())
    }
}

impl From<&RenderSettings> for RenderStyle {
    fn from(settings: &RenderSettings) -> Self {
        let [r, g, b] = settings.color;
        Self {
            color: Rgba([r, g, b, 255]),
            stroke_width: settings.stroke_width,
            draw_labels: settings.draw_labels,
        }
    }
}

/// Draw every annotation on a copy of `image`.
///
/// Polygons are closed; a single vertex becomes a dot and two vertices a
/// segment. With no annotations the result equals the input pixels.
pub fn render_annotations(
    image: &DynamicImage,
    annotations: &[GroundedAnnotation],
    style: &RenderStyle,
) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    if style.stroke_width == 0 {
        return canvas;
    }

    for annotation in annotations {
        let vertices = annotation.polygon.vertices();
        match vertices {
            [] => continue,
            [point] => draw_dot(&mut canvas, *point, style),
            [a, b] => draw_thick_segment(&mut canvas, *a, *b, style),
            _ => {
                for (i, start) in vertices.iter().enumerate() {
                    let end = vertices[(i + 1) % vertices.len()];
                    draw_thick_segment(&mut canvas, *start, end, style);
                }
            }
        }

        if style.draw_labels && !annotation.label.is_empty() {
            draw_tag(&mut canvas, annotation, style);
        }
    }

    canvas
}

fn draw_dot(canvas: &mut RgbaImage, point: Point, style: &RenderStyle) {
    let radius = (style.stroke_width as i32 / 2).max(1);
    draw_filled_circle_mut(canvas, (point.x, point.y), radius, style.color);
}

/// A segment drawn `stroke_width` times with offsets around the centre line
fn draw_thick_segment(canvas: &mut RgbaImage, a: Point, b: Point, style: &RenderStyle) {
    let width = style.stroke_width as i32;
    let lo = -(width - 1) / 2;
    let hi = width / 2;
    let steep = (b.y - a.y).abs() > (b.x - a.x).abs();

    for offset in lo..=hi {
        let (dx, dy) = if steep { (offset as f32, 0.0) } else { (0.0, offset as f32) };
        draw_line_segment_mut(
            canvas,
            (a.x as f32 + dx, a.y as f32 + dy),
            (b.x as f32 + dx, b.y as f32 + dy),
            style.color,
        );
    }
}

/// Filled tab sitting on the polygon's top-left corner
fn draw_tag(canvas: &mut RgbaImage, annotation: &GroundedAnnotation, style: &RenderStyle) {
    let Some((min_x, min_y, _, _)) = annotation.polygon.bounds() else {
        return;
    };
    let chars = annotation.label.chars().count() as u32;
    let width = (chars * TAG_CHAR_WIDTH).max(TAG_CHAR_WIDTH);
    let top = (min_y - TAG_HEIGHT as i32).max(0);
    draw_filled_rect_mut(
        canvas,
        Rect::at(min_x, top).of_size(width, TAG_HEIGHT),
        style.color,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::Polygon;

    fn white(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }

    fn no_labels() -> RenderStyle {
        RenderStyle {
            draw_labels: false,
            ..RenderStyle::default()
        }
    }

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_no_annotations_is_identical_copy() {
        let image = white(20, 10);
        let rendered = render_annotations(&image, &[], &RenderStyle::default());
        assert_eq!(rendered, image.to_rgba8());
    }

    #[test]
    fn test_quad_outline_is_closed() {
        let image = white(40, 40);
        let box_ = Polygon::from_pairs(&[(10, 10), (30, 10), (30, 30), (10, 30)]);
        let rendered = render_annotations(&image, &[GroundedAnnotation::new(box_, "Total")], &no_labels());

        // every edge, including the closing one
        assert_eq!(*rendered.get_pixel(20, 10), RED);
        assert_eq!(*rendered.get_pixel(30, 20), RED);
        assert_eq!(*rendered.get_pixel(20, 30), RED);
        assert_eq!(*rendered.get_pixel(10, 20), RED);
        // stroke is 3 wide, interior stays untouched
        assert_eq!(*rendered.get_pixel(20, 11), RED);
        assert_eq!(*rendered.get_pixel(20, 20), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_slanted_edges_are_stroked() {
        let image = white(80, 60);
        let skewed = Polygon::from_pairs(&[(10, 4), (40, 12), (34, 40), (4, 30)]);
        let pentagon = Polygon::from_pairs(&[(50, 10), (70, 24), (62, 48), (38, 48), (30, 24)]);
        let annotations = vec![
            GroundedAnnotation::new(skewed, "Merchant"),
            GroundedAnnotation::new(pentagon, "Total"),
        ];

        let rendered = render_annotations(&image, &annotations, &no_labels());

        // edge midpoints, the last one of each list closes the outline
        for (x, y) in [(25, 8), (37, 26), (19, 35), (7, 17)] {
            assert_eq!(*rendered.get_pixel(x, y), RED, "quad edge at ({x}, {y})");
        }
        for (x, y) in [(60, 17), (66, 36), (50, 48), (34, 36), (40, 17)] {
            assert_eq!(*rendered.get_pixel(x, y), RED, "pentagon edge at ({x}, {y})");
        }
        assert_eq!(*rendered.get_pixel(20, 20), Rgba([255, 255, 255, 255]));
        assert_eq!(*rendered.get_pixel(50, 30), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_degenerate_polygons() {
        let image = white(20, 20);
        let annotations = vec![
            GroundedAnnotation::new(Polygon::new(vec![]), "Empty"),
            GroundedAnnotation::new(Polygon::from_pairs(&[(5, 5)]), "Dot"),
            GroundedAnnotation::new(Polygon::from_pairs(&[(0, 15), (19, 15)]), "Line"),
        ];

        let rendered = render_annotations(&image, &annotations, &no_labels());

        assert_eq!(*rendered.get_pixel(5, 5), RED);
        assert_eq!(*rendered.get_pixel(10, 15), RED);
        assert_eq!(*rendered.get_pixel(10, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_out_of_bounds_vertices_are_clipped() {
        let image = white(10, 10);
        let box_ = Polygon::from_pairs(&[(-5, -5), (50, -5), (50, 50), (-5, 50)]);
        let rendered = render_annotations(&image, &[GroundedAnnotation::new(box_, "Big")], &RenderStyle::default());
        assert_eq!(rendered.dimensions(), (10, 10));
    }

    #[test]
    fn test_label_tag() {
        let image = white(40, 40);
        let box_ = Polygon::from_pairs(&[(10, 20), (30, 20), (30, 30), (10, 30)]);
        let rendered = render_annotations(&image, &[GroundedAnnotation::new(box_, "Tax")], &RenderStyle::default());

        assert_eq!(*rendered.get_pixel(12, 16), RED);
        assert_eq!(*rendered.get_pixel(12, 8), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_custom_colour() {
        let settings = RenderSettings {
            color: [0, 128, 255],
            stroke_width: 1,
            draw_labels: false,
        };
        let style = RenderStyle::from(&settings);
        let image = white(10, 10);
        let line = Polygon::from_pairs(&[(0, 5), (9, 5)]);

        let rendered = render_annotations(&image, &[GroundedAnnotation::new(line, "x")], &style);

        assert_eq!(*rendered.get_pixel(4, 5), Rgba([0, 128, 255, 255]));
        assert_eq!(*rendered.get_pixel(4, 4), Rgba([255, 255, 255, 255]));
    }
}
