use super::ShapeTrait;
use crate::bounds::Bounds;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeSphere {
    pub radius: f32,
}

impl ShapeSphere {
    pub fn new(radius: f32) -> Self {
        Self {
            radius: radius.abs(),
        }
    }
}

impl ShapeTrait for ShapeSphere {
    fn inertia_tensor(&self) -> Mat3 {
        let i = 2.0 * self.radius * self.radius / 5.0;
        Mat3::from_diagonal(Vec3::splat(i))
    }

    fn local_bounds(&self) -> Bounds {
        Bounds {
            mins: Vec3::splat(-self.radius),
            maxs: Vec3::splat(self.radius),
        }
    }

    fn bounds(&self, pos: Vec3, _: Quat) -> Bounds {
        Bounds {
            mins: Vec3::splat(-self.radius) + pos,
            maxs: Vec3::splat(self.radius) + pos,
        }
    }

    fn contains_point(&self, pt: Vec3) -> bool {
        pt.length_squared() <= self.radius * self.radius
    }

    fn closest_point(&self, pt: Vec3) -> Vec3 {
        // centre maps to the top of the sphere
        let dir = pt.try_normalize().unwrap_or(Vec3::Y);
        dir * self.radius
    }
}
