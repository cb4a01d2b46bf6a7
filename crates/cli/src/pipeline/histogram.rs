//! Cumulative depth histogram equalization.
//!
//! Maps each depth `d` to `256 * (1 - cdf(d))`, where `cdf` only counts
//! pixels with a reading. Near pixels come out bright, far ones dark, and
//! pixels without a reading stay black.

use contracts::DepthFrame;

/// Reusable histogram, sized for depths `0..=max_depth`
#[derive(Debug, Clone)]
pub struct DepthHistogram {
    bins: Vec<f32>,
}

impl DepthHistogram {
    pub fn new(max_depth_mm: u16) -> Self {
        Self {
            bins: vec![0.0; max_depth_mm as usize + 1],
        }
    }

    /// Fill `frame.pixels` from `frame.depth`
    ///
    /// Returns the number of pixels with a depth reading.
    pub fn equalize(&mut self, frame: &mut DepthFrame) -> usize {
        let last = self.bins.len() - 1;
        self.bins.fill(0.0);

        let mut points = 0usize;
        for &d in &frame.depth {
            if d != 0 {
                self.bins[(d as usize).min(last)] += 1.0;
                points += 1;
            }
        }

        if points > 0 {
            for i in 1..self.bins.len() {
                self.bins[i] += self.bins[i - 1];
            }
            let total = points as f32;
            for bin in self.bins.iter_mut().skip(1) {
                *bin = 256.0 * (1.0 - *bin / total);
            }
        }

        for (pixel, &d) in frame.pixels.iter_mut().zip(&frame.depth) {
            *pixel = if d == 0 || points == 0 {
                0
            } else {
                self.bins[(d as usize).min(last)].clamp(0.0, 255.0) as u8
            };
        }
        points
    }
}
