use super::{box_inertia_tensor, closest_point_on_box, rotated_box_bounds, ShapeTrait};
use crate::bounds::Bounds;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A cube of voxel cells around the collider origin. What is solid inside it
/// is decided by the voxel world at query time.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeVoxelRegion {
    pub radius_cells: u32,
    pub cell_size: f32,
}

impl ShapeVoxelRegion {
    pub fn new(radius_cells: u32, cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        Self {
            radius_cells,
            cell_size,
        }
    }

    pub fn half_extents(&self) -> Vec3 {
        Vec3::splat((self.radius_cells as f32 + 0.5) * self.cell_size)
    }
}

impl ShapeTrait for ShapeVoxelRegion {
    fn inertia_tensor(&self) -> Mat3 {
        box_inertia_tensor(self.half_extents())
    }

    fn local_bounds(&self) -> Bounds {
        Bounds::from_center_half_extents(Vec3::ZERO, self.half_extents())
    }

    fn bounds(&self, pos: Vec3, orient: Quat) -> Bounds {
        rotated_box_bounds(self.half_extents(), pos, orient)
    }

    fn contains_point(&self, pt: Vec3) -> bool {
        pt.abs().cmple(self.half_extents()).all()
    }

    fn closest_point(&self, pt: Vec3) -> Vec3 {
        closest_point_on_box(self.half_extents(), pt)
    }
}
