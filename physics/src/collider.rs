use crate::{arena::Handle, body::BodyHandle, bounds::Bounds, shapes::Shape};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

pub type ColliderHandle = Handle<Collider>;

/// Surface response coefficients, both kept in [0, 1].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

fn unit_or(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl Material {
    pub fn new(friction: f32, restitution: f32) -> Self {
        let defaults = Material::default();
        Self {
            friction: unit_or(friction, defaults.friction),
            restitution: unit_or(restitution, defaults.restitution),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Collider {
    pub shape: Shape,
    /// Placement relative to the owning body.
    pub offset: Vec3,
    pub rotation: Quat,
    pub is_trigger: bool,
    material: Material,
    pub(crate) owner: Option<BodyHandle>,
}

impl Collider {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            is_trigger: false,
            material: Material::default(),
            owner: None,
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation.normalize();
        self
    }

    pub fn with_trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.set_material(material);
        self
    }

    pub fn owner(&self) -> Option<BodyHandle> {
        self.owner
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = Material::new(material.friction, material.restitution);
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.material.friction = unit_or(friction, self.material.friction);
    }

    pub fn set_restitution(&mut self, restitution: f32) {
        self.material.restitution = unit_or(restitution, self.material.restitution);
    }

    /// owner * translate(offset) * rotate(rotation)
    pub fn world_transform(&self, body_position: Vec3, body_orientation: Quat) -> (Vec3, Quat) {
        (
            body_position + body_orientation * self.offset,
            body_orientation * self.rotation,
        )
    }

    pub fn world_bounds(&self, body_position: Vec3, body_orientation: Quat) -> Bounds {
        let (position, orientation) = self.world_transform(body_position, body_orientation);
        self.shape.bounds(position, orientation)
    }

    pub fn contains_point(&self, body_position: Vec3, body_orientation: Quat, pt: Vec3) -> bool {
        let (position, orientation) = self.world_transform(body_position, body_orientation);
        let local = orientation.conjugate() * (pt - position);
        self.shape.contains_local_point(local)
    }

    /// Closest point on the collider surface to `pt`, in world space.
    pub fn closest_point(&self, body_position: Vec3, body_orientation: Quat, pt: Vec3) -> Vec3 {
        let (position, orientation) = self.world_transform(body_position, body_orientation);
        let local = orientation.conjugate() * (pt - position);
        position + orientation * self.shape.closest_local_point(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_clamped() {
        let material = Material::new(2.0, -1.0);
        assert_eq!(material.friction, 1.0);
        assert_eq!(material.restitution, 0.0);

        let mut collider = Collider::new(Shape::make_sphere(1.0));
        collider.set_restitution(1.5);
        assert_eq!(collider.material().restitution, 1.0);
    }

    #[test]
    fn test_world_transform_composition() {
        let collider = Collider::new(Shape::make_box(Vec3::new(1.0, 0.5, 0.5)))
            .with_offset(Vec3::new(2.0, 0.0, 0.0))
            .with_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let body_rot = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let (pos, _) = collider.world_transform(Vec3::new(0.0, 1.0, 0.0), body_rot);
        assert!((pos - Vec3::new(0.0, 1.0, -2.0)).length() < 1e-5);

        assert!(collider.contains_point(Vec3::new(0.0, 1.0, 0.0), body_rot, Vec3::new(0.0, 1.9, -2.0)));
        assert!(!collider.contains_point(Vec3::new(0.0, 1.0, 0.0), body_rot, Vec3::new(0.9, 1.0, -2.0)));
    }

    #[test]
    fn test_closest_point_sphere() {
        let collider = Collider::new(Shape::make_sphere(1.0)).with_offset(Vec3::Y);
        let p = collider.closest_point(Vec3::ZERO, Quat::IDENTITY, Vec3::new(5.0, 1.0, 0.0));
        assert!((p - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
    }
}
