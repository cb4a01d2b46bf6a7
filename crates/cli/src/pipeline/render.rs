//! Frame renderers.
//!
//! The render loop builds one `RenderFrame` per consumed depth frame and
//! hands it to every configured renderer in turn.

use std::fs;
use std::path::{Path, PathBuf};

use contracts::{DepthFrame, HandId, Point3D};
use tracing::{debug, info, instrument};

use crate::error::{PipelineError, Result};

/// Projected trail of one hand, oldest point first
#[derive(Debug, Clone, PartialEq)]
pub struct TrailPolyline {
    pub id: HandId,
    /// Projective points: pixel `x`/`y`, depth `z` in mm
    pub points: Vec<Point3D>,
}

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub depth: &'a DepthFrame,
    /// Frame channel sequence of `depth`
    pub sequence: u64,
    pub trails: &'a [TrailPolyline],
}

impl RenderFrame<'_> {
    /// Total trail points across every hand
    pub fn point_count(&self) -> usize {
        self.trails.iter().map(|t| t.points.len()).sum()
    }
}

/// Output stage of the render loop
pub trait FrameRenderer: Send {
    fn name(&self) -> &str;

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Renderer that logs a frame summary via tracing
pub struct LogRenderer {
    name: String,
}

impl LogRenderer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl FrameRenderer for LogRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        debug!(
            renderer = %self.name,
            sequence = frame.sequence,
            frame_id = frame.depth.frame_id,
            hands = frame.trails.len(),
            points = frame.point_count(),
            "frame rendered"
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        debug!(renderer = %self.name, "LogRenderer closed");
        Ok(())
    }
}

/// Trail colours, picked by hand id
const PALETTE: [[u8; 3]; 6] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [255, 255, 0],
    [255, 0, 255],
    [0, 255, 255],
];

/// Colour used to draw the trail of `id`
pub fn trail_color(id: HandId) -> [u8; 3] {
    PALETTE[id as usize % PALETTE.len()]
}

/// Renderer that writes every Nth frame as a PNG, trails drawn over the
/// grey depth image
pub struct SnapshotRenderer {
    name: String,
    dir: PathBuf,
    every: u64,
    seen: u64,
    written: Vec<PathBuf>,
}

impl SnapshotRenderer {
    /// Create the output directory; `every == 0` is treated as 1
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, every: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            name: name.into(),
            dir,
            every: every.max(1),
            seen: 0,
            written: Vec::new(),
        })
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far
    #[inline]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn save(&self, path: &Path, frame: &RenderFrame<'_>) -> std::io::Result<()> {
        let rgb = compose(frame);
        image::save_buffer(
            path,
            &rgb,
            frame.depth.width,
            frame.depth.height,
            image::ColorType::Rgb8,
        )
        .map_err(std::io::Error::other)
    }
}

impl FrameRenderer for SnapshotRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "snapshot_render",
        skip(self, frame),
        fields(renderer = %self.name, sequence = frame.sequence)
    )]
    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        self.seen += 1;
        if self.seen % self.every != 0 {
            return Ok(());
        }

        let path = self.dir.join(format!("frame_{:06}.png", frame.sequence));
        self.save(&path, frame)
            .map_err(|e| PipelineError::render(&self.name, e.to_string()))?;
        debug!(path = %path.display(), "snapshot written");
        self.written.push(path);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        info!(
            renderer = %self.name,
            dir = %self.dir.display(),
            snapshots = self.written.len(),
            "SnapshotRenderer closed"
        );
        Ok(())
    }
}

/// Grey depth image with every trail drawn as a coloured polyline
pub fn compose(frame: &RenderFrame<'_>) -> Vec<u8> {
    let depth = frame.depth;
    let mut rgb = Vec::with_capacity(depth.pixels.len() * 3);
    for &p in &depth.pixels {
        rgb.extend_from_slice(&[p, p, p]);
    }

    let mut canvas = Canvas {
        rgb: &mut rgb,
        width: depth.width as i64,
        height: depth.height as i64,
    };
    for trail in frame.trails {
        let color = trail_color(trail.id);
        for pair in trail.points.windows(2) {
            canvas.line(&pair[0], &pair[1], color);
        }
        if let Some(head) = trail.points.last() {
            canvas.marker(head, color);
        }
    }
    rgb
}

struct Canvas<'a> {
    rgb: &'a mut [u8],
    width: i64,
    height: i64,
}

impl Canvas<'_> {
    fn plot(&mut self, x: i64, y: i64, color: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let i = ((y * self.width + x) * 3) as usize;
        self.rgb[i..i + 3].copy_from_slice(&color);
    }

    /// Bresenham line; off-canvas pixels are clipped
    fn line(&mut self, from: &Point3D, to: &Point3D, color: [u8; 3]) {
        let (mut x0, mut y0) = (from.x.round() as i64, from.y.round() as i64);
        let (x1, y1) = (to.x.round() as i64, to.y.round() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.plot(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn marker(&mut self, at: &Point3D, color: [u8; 3]) {
        let (cx, cy) = (at.x.round() as i64, at.y.round() as i64);
        for y in cy - 1..=cy + 1 {
            for x in cx - 1..=cx + 1 {
                self.plot(x, y, color);
            }
        }
    }
}
