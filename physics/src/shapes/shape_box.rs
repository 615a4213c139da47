use super::{box_inertia_tensor, closest_point_on_box, rotated_box_bounds, ShapeTrait};
use crate::bounds::Bounds;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Box centred on its local origin.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeBox {
    pub half_extents: Vec3,
}

impl ShapeBox {
    pub fn new(half_extents: Vec3) -> Self {
        Self {
            half_extents: half_extents.abs(),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.half_extents * 2.0
    }
}

impl ShapeTrait for ShapeBox {
    fn inertia_tensor(&self) -> Mat3 {
        box_inertia_tensor(self.half_extents)
    }

    fn local_bounds(&self) -> Bounds {
        Bounds::from_center_half_extents(Vec3::ZERO, self.half_extents)
    }

    fn bounds(&self, pos: Vec3, orient: Quat) -> Bounds {
        rotated_box_bounds(self.half_extents, pos, orient)
    }

    fn contains_point(&self, pt: Vec3) -> bool {
        pt.abs().cmple(self.half_extents).all()
    }

    fn closest_point(&self, pt: Vec3) -> Vec3 {
        closest_point_on_box(self.half_extents, pt)
    }
}
