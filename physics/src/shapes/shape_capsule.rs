use super::ShapeTrait;
use crate::bounds::Bounds;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Capsule along local Y. `height` is the total height including both caps.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeCapsule {
    pub radius: f32,
    pub height: f32,
}

impl ShapeCapsule {
    pub fn new(radius: f32, height: f32) -> Self {
        Self {
            radius: radius.abs(),
            height: height.abs(),
        }
    }

    /// Half length of the inner segment.
    pub fn half_segment(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }

    /// End points of the inner segment in local space.
    pub fn segment(&self) -> (Vec3, Vec3) {
        let h = self.half_segment();
        (Vec3::new(0.0, -h, 0.0), Vec3::new(0.0, h, 0.0))
    }

    /// Segment end points after placement in the world.
    pub fn world_segment(&self, pos: Vec3, orient: Quat) -> (Vec3, Vec3) {
        let (a, b) = self.segment();
        (pos + orient * a, pos + orient * b)
    }
}

impl ShapeTrait for ShapeCapsule {
    fn inertia_tensor(&self) -> Mat3 {
        // cylinder plus two hemispheres, weighted by volume
        let r = self.radius;
        let h = self.half_segment() * 2.0;
        let cyl_volume = PI * r * r * h;
        let sphere_volume = 4.0 / 3.0 * PI * r * r * r;
        let total = cyl_volume + sphere_volume;
        if total <= f32::EPSILON {
            return Mat3::ZERO;
        }
        let m_cyl = cyl_volume / total;
        let m_sph = sphere_volume / total;

        let iy = m_cyl * r * r * 0.5 + m_sph * 2.0 * r * r / 5.0;
        let ixz = m_cyl * (3.0 * r * r + h * h) / 12.0
            + m_sph * (2.0 * r * r / 5.0 + h * h / 4.0 + 3.0 * h * r / 8.0);
        Mat3::from_diagonal(Vec3::new(ixz, iy, ixz))
    }

    fn local_bounds(&self) -> Bounds {
        let h = self.half_segment();
        Bounds::from_center_half_extents(
            Vec3::ZERO,
            Vec3::new(self.radius, h + self.radius, self.radius),
        )
    }

    fn bounds(&self, pos: Vec3, orient: Quat) -> Bounds {
        let (a, b) = self.world_segment(pos, orient);
        Bounds::from_points(&[a, b]).inflated(self.radius)
    }

    fn contains_point(&self, pt: Vec3) -> bool {
        let h = self.half_segment();
        let on_axis = Vec3::new(0.0, pt.y.clamp(-h, h), 0.0);
        (pt - on_axis).length_squared() <= self.radius * self.radius
    }

    fn closest_point(&self, pt: Vec3) -> Vec3 {
        let h = self.half_segment();
        let on_axis = Vec3::new(0.0, pt.y.clamp(-h, h), 0.0);
        let dir = (pt - on_axis).try_normalize().unwrap_or(Vec3::X);
        on_axis + dir * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capsule_segment() {
        let capsule = ShapeCapsule::new(0.5, 2.0);
        assert_eq!(capsule.half_segment(), 0.5);
        let bounds = capsule.local_bounds();
        assert_eq!(bounds.maxs, Vec3::new(0.5, 1.0, 0.5));
        assert!(capsule.contains_point(Vec3::new(0.0, 0.9, 0.0)));
        assert!(!capsule.contains_point(Vec3::new(0.45, 0.95, 0.0)));

        // degenerate capsule is a sphere
        let ball = ShapeCapsule::new(1.0, 1.0);
        assert_eq!(ball.half_segment(), 0.0);
    }
}
