//! Bounding box overlay.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detection::Detection;

/// Box color for the counted class.
pub const TARGET_COLOR: Rgb<u8> = Rgb([255, 64, 0]);
/// Box color for every other class.
pub const OTHER_COLOR: Rgb<u8> = Rgb([0, 200, 255]);
/// Outline thickness in pixels.
pub const BOX_THICKNESS: u32 = 3;

/// Draw every detection onto `frame`, highlighting `target_class`.
///
/// Boxes are in normalized coordinates; anything that rounds to an empty
/// rectangle is skipped.
pub fn annotate(frame: &mut RgbImage, detections: &[Detection], target_class: usize) {
    let (fw, fh) = frame.dimensions();

    for detection in detections {
        let x1 = (detection.x * fw as f32).round() as i32;
        let y1 = (detection.y * fh as f32).round() as i32;
        let x2 = ((detection.x + detection.width) * fw as f32).round() as i32;
        let y2 = ((detection.y + detection.height) * fh as f32).round() as i32;

        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        let color = if detection.is_class(target_class) {
            TARGET_COLOR
        } else {
            OTHER_COLOR
        };

        // Concentric outlines, shrinking inward
        for inset in 0..BOX_THICKNESS as i32 {
            let w = x2 - x1 - 2 * inset;
            let h = y2 - y1 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(frame, rect, color);
        }
    }
}
