mod shape_box;
mod shape_capsule;
mod shape_sphere;
mod shape_voxel;

use crate::bounds::Bounds;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

pub use shape_box::ShapeBox;
pub use shape_capsule::ShapeCapsule;
pub use shape_sphere::ShapeSphere;
pub use shape_voxel::ShapeVoxelRegion;

/// Queries are in the shape's local space, world placement is applied by the caller.
trait ShapeTrait {
    /// Inertia tensor for unit mass about the local origin.
    fn inertia_tensor(&self) -> Mat3;
    fn local_bounds(&self) -> Bounds;
    fn bounds(&self, translation: Vec3, orientation: Quat) -> Bounds;
    fn contains_point(&self, pt: Vec3) -> bool;
    fn closest_point(&self, pt: Vec3) -> Vec3;
}

/// Shape kinds in narrow phase dispatch order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere = 0,
    Box = 1,
    Capsule = 2,
    VoxelRegion = 3,
}

impl ShapeKind {
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere(ShapeSphere),
    Box(ShapeBox),
    Capsule(ShapeCapsule),
    VoxelRegion(ShapeVoxelRegion),
}

impl Default for Shape {
    fn default() -> Shape {
        Shape::Sphere(ShapeSphere { radius: 0.5 })
    }
}

impl Shape {
    pub fn make_sphere(radius: f32) -> Self {
        Shape::Sphere(ShapeSphere::new(radius))
    }

    pub fn make_box(half_extents: Vec3) -> Self {
        Shape::Box(ShapeBox::new(half_extents))
    }

    pub fn make_capsule(radius: f32, height: f32) -> Self {
        Shape::Capsule(ShapeCapsule::new(radius, height))
    }

    pub fn make_voxel_region(radius_cells: u32, cell_size: f32) -> Self {
        Shape::VoxelRegion(ShapeVoxelRegion::new(radius_cells, cell_size))
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere(_) => ShapeKind::Sphere,
            Shape::Box(_) => ShapeKind::Box,
            Shape::Capsule(_) => ShapeKind::Capsule,
            Shape::VoxelRegion(_) => ShapeKind::VoxelRegion,
        }
    }

    fn shape_trait(&self) -> &dyn ShapeTrait {
        match self {
            Shape::Sphere(data) => data,
            Shape::Box(data) => data,
            Shape::Capsule(data) => data,
            Shape::VoxelRegion(data) => data,
        }
    }

    pub fn inertia_tensor(&self) -> Mat3 {
        self.shape_trait().inertia_tensor()
    }

    pub fn local_bounds(&self) -> Bounds {
        self.shape_trait().local_bounds()
    }

    pub fn bounds(&self, translation: Vec3, orientation: Quat) -> Bounds {
        self.shape_trait().bounds(translation, orientation)
    }

    pub fn contains_local_point(&self, pt: Vec3) -> bool {
        self.shape_trait().contains_point(pt)
    }

    pub fn closest_local_point(&self, pt: Vec3) -> Vec3 {
        self.shape_trait().closest_point(pt)
    }
}

fn box_corners(half_extents: Vec3) -> [Vec3; 8] {
    let h = half_extents;
    [
        Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(-h.x, h.y, -h.z),
        Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, h.y, h.z),
        Vec3::new(h.x, h.y, -h.z),
        Vec3::new(h.x, -h.y, h.z),
        Vec3::new(-h.x, h.y, h.z),
    ]
}

fn box_inertia_tensor(half_extents: Vec3) -> Mat3 {
    let d = half_extents * 2.0;
    let dd = d * d;
    let diagonal = Vec3::new(dd.y + dd.z, dd.x + dd.z, dd.x + dd.y) / 12.0;
    Mat3::from_diagonal(diagonal)
}

/// World bounds of a centred box, rotated corner by corner.
fn rotated_box_bounds(half_extents: Vec3, pos: Vec3, orient: Quat) -> Bounds {
    let mut bounds = Bounds::new();
    for pt in &box_corners(half_extents) {
        bounds.expand_by_point((orient * *pt) + pos);
    }
    bounds
}

/// Closest point on the surface of a centred box, including from the inside.
fn closest_point_on_box(half_extents: Vec3, pt: Vec3) -> Vec3 {
    let clamped = pt.clamp(-half_extents, half_extents);
    if clamped != pt {
        return clamped;
    }
    // inside, push out through the nearest face
    let dist = half_extents - pt.abs();
    let axis = if dist.x <= dist.y && dist.x <= dist.z {
        0
    } else if dist.y <= dist.z {
        1
    } else {
        2
    };
    let mut out = pt;
    out[axis] = half_extents[axis].copysign(pt[axis]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order() {
        assert_eq!(Shape::make_sphere(1.0).kind().index(), 0);
        assert_eq!(Shape::make_box(Vec3::ONE).kind().index(), 1);
        assert_eq!(Shape::make_capsule(0.5, 2.0).kind().index(), 2);
        assert_eq!(Shape::make_voxel_region(2, 1.0).kind().index(), 3);
    }

    #[test]
    fn test_rotated_box_bounds() {
        let shape = Shape::make_box(Vec3::new(1.0, 0.5, 0.5));
        let orient = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let bounds = shape.bounds(Vec3::new(0.0, 2.0, 0.0), orient);
        assert!((bounds.mins - Vec3::new(-0.5, 1.0, -0.5)).abs().max_element() < 1e-5);
        assert!((bounds.maxs - Vec3::new(0.5, 3.0, 0.5)).abs().max_element() < 1e-5);
    }

    #[test]
    fn test_closest_point_from_inside_box() {
        let shape = Shape::make_box(Vec3::new(1.0, 2.0, 3.0));
        let p = shape.closest_local_point(Vec3::new(0.8, 0.0, 0.0));
        assert_eq!(p, Vec3::new(1.0, 0.0, 0.0));
        let q = shape.closest_local_point(Vec3::new(0.0, -5.0, 0.0));
        assert_eq!(q, Vec3::new(0.0, -2.0, 0.0));
    }
}
