use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

/// 2D image coordinate in pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Frame metadata shared by the color and grayscale views
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Capture timestamp for latency tracking
    pub captured_at: Instant,
}

/// Packed RGB24 view of a capture, shareable across threads without copying
#[derive(Clone)]
pub struct ColorFrame {
    pub data: Bytes,
    pub meta: Arc<FrameMetadata>,
}

/// Single-byte-per-pixel grayscale view, the detector's input
#[derive(Clone)]
pub struct GrayFrame {
    pub data: Bytes,
    pub meta: Arc<FrameMetadata>,
}

/// One camera capture. Sources that produce a native grayscale plane attach
/// it; otherwise [`Frame::gray`] derives one from the color data on demand.
pub struct Frame {
    pub color: ColorFrame,
    pub native_gray: Option<GrayFrame>,
}

impl Frame {
    pub fn from_color(color: ColorFrame) -> Self {
        Self {
            color,
            native_gray: None,
        }
    }

    pub fn with_gray(color: ColorFrame, gray: GrayFrame) -> Self {
        Self {
            color,
            native_gray: Some(gray),
        }
    }

    pub fn meta(&self) -> &FrameMetadata {
        &self.color.meta
    }

    /// Grayscale view of this capture. Uses the native plane when the source
    /// supplied one, otherwise computes integer BT.601 luma from the RGB data.
    pub fn gray(&self) -> GrayFrame {
        if let Some(gray) = &self.native_gray {
            return gray.clone();
        }

        let rgb = &self.color.data;
        let mut luma = Vec::with_capacity(rgb.len() / 3);
        for px in rgb.chunks_exact(3) {
            // Weights sum to 256 so the shift never overshoots 255
            let y = (77 * px[0] as u32 + 150 * px[1] as u32 + 29 * px[2] as u32) >> 8;
            luma.push(y as u8);
        }

        GrayFrame {
            data: luma.into(),
            meta: self.color.meta.clone(),
        }
    }

    /// Hand the color view over for display, consuming the frame.
    pub fn into_color(self) -> ColorFrame {
        self.color
    }
}
