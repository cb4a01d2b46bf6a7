//! Pinhole projection matching the simulated depth sensor

use contracts::{CoordinateConverter, MapOutputMode, Point3D};

/// Horizontal field of view (radians)
pub const HORIZONTAL_FOV: f64 = 1.0225;

/// Vertical field of view (radians)
pub const VERTICAL_FOV: f64 = 0.7941;

/// Real-world (mm) <-> projective (px, px, mm) conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectiveConverter {
    x_res: f32,
    y_res: f32,
    /// Width of the view plane at 1 mm distance
    xz_factor: f32,
    /// Height of the view plane at 1 mm distance
    yz_factor: f32,
}

impl ProjectiveConverter {
    pub fn new(mode: MapOutputMode) -> Self {
        Self {
            x_res: mode.x_res as f32,
            y_res: mode.y_res as f32,
            xz_factor: ((HORIZONTAL_FOV / 2.0).tan() * 2.0) as f32,
            yz_factor: ((VERTICAL_FOV / 2.0).tan() * 2.0) as f32,
        }
    }

    /// Half the view width at distance `z` (mm)
    #[inline]
    pub fn half_width_at(&self, z: f32) -> f32 {
        z * self.xz_factor / 2.0
    }

    /// Half the view height at distance `z` (mm)
    #[inline]
    pub fn half_height_at(&self, z: f32) -> f32 {
        z * self.yz_factor / 2.0
    }
}

impl CoordinateConverter for ProjectiveConverter {
    fn real_world_to_projective(&self, point: &Point3D) -> Point3D {
        // Nothing projects from behind the sensor; map it to the centre
        if point.z <= 0.0 {
            return Point3D::new(self.x_res / 2.0, self.y_res / 2.0, 0.0);
        }
        Point3D {
            x: point.x / (point.z * self.xz_factor) * self.x_res + self.x_res / 2.0,
            y: self.y_res / 2.0 - point.y / (point.z * self.yz_factor) * self.y_res,
            z: point.z,
        }
    }

    fn projective_to_real_world(&self, point: &Point3D) -> Point3D {
        Point3D {
            x: (point.x / self.x_res - 0.5) * point.z * self.xz_factor,
            y: (0.5 - point.y / self.y_res) * point.z * self.yz_factor,
            z: point.z,
        }
    }
}
