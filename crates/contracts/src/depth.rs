//! DepthFrame - producer-side frame buffer
//!
//! Filled in place by the producer thread, then handed to the render loop.

use serde::{Deserialize, Serialize};

/// Map output mode of a depth generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapOutputMode {
    pub x_res: u32,
    pub y_res: u32,
    pub fps: u32,
}

impl MapOutputMode {
    /// Number of pixels in one map
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.x_res as usize * self.y_res as usize
    }
}

impl Default for MapOutputMode {
    fn default() -> Self {
        Self {
            x_res: 640,
            y_res: 480,
            fps: 30,
        }
    }
}

/// Depth frame buffer
///
/// Holds both the raw depth map and the 8-bit grey rendition computed from
/// it. Allocated once per buffer and reused across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,

    /// Native frame counter of the depth map
    pub frame_id: u64,

    /// Native timestamp (seconds)
    pub timestamp: f64,

    /// Depth per pixel in millimetres (0 = no reading)
    pub depth: Vec<u16>,

    /// Grey pixels, one byte per pixel
    pub pixels: Vec<u8>,
}

impl DepthFrame {
    /// Allocate a zeroed frame for the given output mode
    pub fn new(mode: MapOutputMode) -> Self {
        let size = mode.pixel_count();
        Self {
            width: mode.x_res,
            height: mode.y_res,
            frame_id: 0,
            timestamp: 0.0,
            depth: vec![0; size],
            pixels: vec![0; size],
        }
    }

    /// Pixel count
    #[inline]
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    /// Check if the frame has no pixels
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    /// Depth at (x, y), or `None` if out of bounds
    #[inline]
    pub fn depth_at(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.depth
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_sized_from_mode() {
        let frame = DepthFrame::new(MapOutputMode {
            x_res: 4,
            y_res: 3,
            fps: 30,
        });
        assert_eq!(frame.len(), 12);
        assert_eq!(frame.pixels.len(), 12);
        assert_eq!(frame.depth_at(3, 2), Some(0));
        assert_eq!(frame.depth_at(4, 0), None);
    }
}
