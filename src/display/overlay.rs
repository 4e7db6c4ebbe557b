//! Software overlay painter: closed quad outlines over packed RGB24

use serde::{Deserialize, Serialize};

use crate::pipeline::polygon::Quad;
use crate::source::Point;

/// Overlay paint parameters. Defaults to the classic green 2 px outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub color: [u8; 3],
    /// Brush edge in pixels, square, minimum 1.
    pub thickness: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: [0, 255, 0],
            thickness: 2,
        }
    }
}

/// Paint each quad as a closed outline into `rgb`, a `width * height`
/// packed RGB24 buffer. Out-of-bounds pixels are clipped; a buffer whose
/// length does not match the claimed dimensions is left untouched.
pub fn draw_quads(rgb: &mut [u8], width: u32, height: u32, quads: &[Quad], style: &OverlayStyle) {
    if rgb.len() != width as usize * height as usize * 3 {
        return;
    }

    for quad in quads {
        for i in 0..4 {
            draw_segment(rgb, width, height, quad[i], quad[(i + 1) % 4], style);
        }
    }
}

fn draw_segment(rgb: &mut [u8], width: u32, height: u32, from: Point, to: Point, style: &OverlayStyle) {
    // Clamped so degenerate detector coordinates cannot run the walk unbounded
    let margin = width.max(height) as f32 * 2.0 + 16.0;
    let snap = |v: f32| v.clamp(-margin, margin).round() as i64;

    let (mut x, mut y) = (snap(from.x), snap(from.y));
    let (end_x, end_y) = (snap(to.x), snap(to.y));

    let dx = (end_x - x).abs();
    let dy = -(end_y - y).abs();
    let step_x = if x < end_x { 1 } else { -1 };
    let step_y = if y < end_y { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(rgb, width, height, x, y, style);
        if x == end_x && y == end_y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += step_x;
        }
        if e2 <= dx {
            err += dx;
            y += step_y;
        }
    }
}

fn stamp(rgb: &mut [u8], width: u32, height: u32, cx: i64, cy: i64, style: &OverlayStyle) {
    let t = style.thickness.max(1) as i64;
    let half = t / 2;

    for dy in 0..t {
        for dx in 0..t {
            let px = cx + dx - half;
            let py = cy + dy - half;
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                continue;
            }
            let i = (py as usize * width as usize + px as usize) * 3;
            rgb[i..i + 3].copy_from_slice(&style.color);
        }
    }
}
