//! Synthetic depth maps: a back wall, a floor, a shadow band on the left
//! and one disc per tracked hand.

use contracts::{CoordinateConverter, DepthFrame, Point3D};

use crate::converter::ProjectiveConverter;
use crate::world::HandSample;

const WALL_MM: u16 = 3500;
const FLOOR_NEAR_MM: u16 = 1200;
/// Half the width of a hand (mm)
const HAND_RADIUS_MM: f32 = 50.0;

pub(crate) fn render_depth(
    frame: &mut DepthFrame,
    hands: &[HandSample],
    converter: &ProjectiveConverter,
    max_depth_mm: u16,
) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let horizon = height / 2;
    let shadow = (width / 80).max(1);
    let wall = WALL_MM.min(max_depth_mm);

    for (y, row) in frame.depth.chunks_mut(width).enumerate() {
        let background = if y <= horizon {
            wall
        } else {
            // Floor comes closer linearly towards the bottom row
            let t = (y - horizon) as f32 / (height - horizon) as f32;
            (wall as f32 - t * (wall.saturating_sub(FLOOR_NEAR_MM)) as f32) as u16
        };
        row[..shadow].fill(0);
        row[shadow..].fill(background);
    }

    for hand in hands {
        let center = converter.real_world_to_projective(&hand.position);
        let edge = converter.real_world_to_projective(&Point3D::new(
            hand.position.x + HAND_RADIUS_MM,
            hand.position.y,
            hand.position.z,
        ));
        let radius = (edge.x - center.x).abs().max(1.0);
        let depth = hand.position.z.clamp(1.0, max_depth_mm as f32) as u16;
        fill_disc(frame, center.x, center.y, radius, depth);
    }
}

fn fill_disc(frame: &mut DepthFrame, cx: f32, cy: f32, radius: f32, depth: u16) {
    let width = frame.width as i64;
    let height = frame.height as i64;
    let x0 = ((cx - radius).floor() as i64).max(0);
    let x1 = ((cx + radius).ceil() as i64).min(width - 1);
    let y0 = ((cy - radius).floor() as i64).max(0);
    let y1 = ((cy + radius).ceil() as i64).min(height - 1);
    let r2 = radius * radius;

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let idx = (y * width + x) as usize;
            let current = frame.depth[idx];
            if current == 0 || depth < current {
                frame.depth[idx] = depth;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MapOutputMode;

    fn mode() -> MapOutputMode {
        MapOutputMode {
            x_res: 160,
            y_res: 120,
            fps: 30,
        }
    }

    #[test]
    fn test_background_layout() {
        let mut frame = DepthFrame::new(mode());
        render_depth(&mut frame, &[], &ProjectiveConverter::new(mode()), 10000);

        assert_eq!(frame.depth_at(0, 10), Some(0));
        assert_eq!(frame.depth_at(80, 10), Some(WALL_MM));
        let bottom = frame.depth_at(80, 119).unwrap();
        assert!(bottom < WALL_MM && bottom >= FLOOR_NEAR_MM);
    }

    #[test]
    fn test_hand_disc_in_front() {
        let mut frame = DepthFrame::new(mode());
        let hands = [HandSample {
            position: Point3D::new(0.0, 0.0, 1000.0),
        }];
        render_depth(&mut frame, &hands, &ProjectiveConverter::new(mode()), 10000);

        assert_eq!(frame.depth_at(80, 60), Some(1000));
        assert_eq!(frame.depth_at(150, 10), Some(WALL_MM));
    }

    #[test]
    fn test_hand_outside_view_is_clipped() {
        let mut frame = DepthFrame::new(mode());
        let hands = [HandSample {
            position: Point3D::new(90000.0, 0.0, 1000.0),
        }];
        render_depth(&mut frame, &hands, &ProjectiveConverter::new(mode()), 10000);
        assert!(frame.depth.iter().all(|&d| d != 1000));
    }
}
