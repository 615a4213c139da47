use crate::{body::BodyHandle, collider::ColliderHandle};
use glam::{IVec3, Vec3};

/// One overlapping collider pair found this step. Voxel contacts have no
/// second body, `voxel_cell` names the cell instead.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionInfo {
    pub body_a: BodyHandle,
    pub collider_a: ColliderHandle,
    pub body_b: Option<BodyHandle>,
    pub collider_b: Option<ColliderHandle>,
    pub voxel_cell: Option<IVec3>,
    pub point: Vec3,
    /// Unit normal from the first body toward the second.
    pub normal: Vec3,
    pub penetration: f32,
    pub is_trigger: bool,
}

impl CollisionInfo {
    pub fn is_voxel(&self) -> bool {
        self.body_b.is_none()
    }

    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == Some(body)
    }

    /// The other body as seen from `body`.
    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if self.body_a == body {
            self.body_b
        } else if self.body_b == Some(body) {
            Some(self.body_a)
        } else {
            None
        }
    }

    /// Normal pointing away from `body`.
    pub fn normal_from(&self, body: BodyHandle) -> Vec3 {
        if self.body_a == body {
            self.normal
        } else {
            -self.normal
        }
    }
}

/// Counters for the most recent fixed step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionStats {
    pub broad_phase_pairs: usize,
    pub narrow_phase_tests: usize,
    pub active_contacts: usize,
    pub voxel_contacts: usize,
}
