//! Detection overlay rendering.
//!
//! Draws per-class colored rectangles onto a decoded frame and re-encodes it
//! as JPEG for the annotated-image endpoint and the CLI `--output` flag.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detect::{DamageClass, Detection};

const BOX_THICKNESS: u32 = 2;

/// Per-class overlay color, matching the palette the mobile client expects.
pub fn class_color(class: DamageClass) -> Rgb<u8> {
    match class {
        DamageClass::Scratch => Rgb([255, 255, 0]),
        DamageClass::Dent => Rgb([0, 0, 255]),
        DamageClass::Crack => Rgb([255, 0, 0]),
        DamageClass::GlassDamage => Rgb([0, 255, 255]),
        DamageClass::PaintDamage => Rgb([255, 0, 255]),
        DamageClass::BumperDamage => Rgb([0, 255, 0]),
        DamageClass::HeadlightDamage => Rgb([128, 0, 128]),
        DamageClass::TireDamage => Rgb([255, 165, 0]),
        DamageClass::Rust => Rgb([139, 69, 19]),
        DamageClass::BrokenPart => Rgb([128, 128, 128]),
        DamageClass::Unknown(_) => Rgb([255, 255, 255]),
    }
}

/// Draw detection boxes onto the frame in place.
///
/// Boxes are clamped to the image bounds for drawing only; the detections
/// themselves are not modified.
pub fn draw_detections(frame: &mut RgbImage, detections: &[Detection]) {
    let (img_w, img_h) = (frame.width() as f32, frame.height() as f32);
    for det in detections {
        let x1 = det.bbox.x1.clamp(0.0, img_w - 1.0);
        let y1 = det.bbox.y1.clamp(0.0, img_h - 1.0);
        let x2 = det.bbox.x2.clamp(0.0, img_w - 1.0);
        let y2 = det.bbox.y2.clamp(0.0, img_h - 1.0);
        let w = (x2 - x1).max(1.0) as u32;
        let h = (y2 - y1).max(1.0) as u32;
        let color = class_color(det.class);
        for inset in 0..BOX_THICKNESS {
            if w <= 2 * inset || h <= 2 * inset {
                break;
            }
            let rect = Rect::at(x1 as i32 + inset as i32, y1 as i32 + inset as i32)
                .of_size(w - 2 * inset, h - 2 * inset);
            draw_hollow_rect_mut(frame, rect, color);
        }
    }
}

/// Render detections onto a copy of the frame and encode it as JPEG.
pub fn render_jpeg(frame: &RgbImage, detections: &[Detection]) -> Result<Vec<u8>> {
    let mut annotated = frame.clone();
    draw_detections(&mut annotated, detections);
    let mut out = Vec::new();
    annotated
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)
        .context("failed to encode annotated JPEG")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::PixelBBox;

    #[test]
    fn draws_box_border_in_class_color() {
        let mut frame = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
        let det = Detection::new(
            DamageClass::Crack,
            0.9,
            PixelBBox::new(4.0, 4.0, 20.0, 20.0),
        );
        draw_detections(&mut frame, &[det]);
        assert_eq!(*frame.get_pixel(4, 4), Rgb([255, 0, 0]));
        // Interior stays untouched.
        assert_eq!(*frame.get_pixel(12, 12), Rgb([0, 0, 0]));
    }

    #[test]
    fn out_of_bounds_boxes_are_clamped_for_drawing() {
        let mut frame = RgbImage::from_pixel(16, 16, Rgb([0, 0, 0]));
        let det = Detection::new(
            DamageClass::Dent,
            0.9,
            PixelBBox::new(-10.0, -10.0, 100.0, 100.0),
        );
        draw_detections(&mut frame, &[det]);
        assert_eq!(*frame.get_pixel(0, 0), Rgb([0, 0, 255]));
    }

    #[test]
    fn render_produces_jpeg_bytes() {
        let frame = RgbImage::from_pixel(16, 16, Rgb([10, 20, 30]));
        let bytes = render_jpeg(&frame, &[]).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
