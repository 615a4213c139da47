use crate::{
    arena::Handle,
    collider::ColliderHandle,
    config::SleepConfig,
    movement::{Movement, MovementParams},
};
use glam::{BVec3, Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

pub type BodyHandle = Handle<Body>;

pub const MAX_LAYERS: u32 = 32;

// 30 rad/s is fast enough for us
const MAX_ANGULAR_SPEED: f32 = 30.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves, infinite mass.
    Static,
    Dynamic,
    /// Moved by the caller, pushes dynamic bodies but is never pushed back.
    Kinematic,
    /// Reports overlaps only, every collider behaves as a trigger.
    Trigger,
}

#[derive(Clone, Debug)]
pub struct Body {
    kind: BodyKind,
    mass: f32,
    inv_mass: f32,
    pub(crate) position: Vec3,
    pub(crate) orientation: Quat,
    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,
    /// Local offset of the centre of mass.
    pub centre_of_mass: Vec3,
    /// Unit mass inertia of the primary collider.
    pub(crate) inertia_tensor: Mat3,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub use_gravity: bool,
    pub lock_linear: BVec3,
    pub lock_angular: BVec3,
    pub can_rotate: bool,
    pub can_sleep: bool,
    /// Falls back to the world's thresholds when unset.
    pub sleep_thresholds: Option<SleepConfig>,
    layer: u32,
    pub collision_mask: u32,
    sleeping: bool,
    sleep_timer: f32,
    pub(crate) gravity_scale: f32,
    pub(crate) colliders: Vec<ColliderHandle>,
    pub(crate) kinematic_target: Option<(Vec3, Quat)>,
    pub(crate) kinematic_moved: bool,
    pub(crate) movement: Option<Box<Movement>>,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            mass: 1.0,
            inv_mass: 1.0,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            centre_of_mass: Vec3::ZERO,
            inertia_tensor: Mat3::from_diagonal(Vec3::splat(0.1)),
            linear_damping: 0.01,
            angular_damping: 0.01,
            use_gravity: true,
            lock_linear: BVec3::FALSE,
            lock_angular: BVec3::FALSE,
            can_rotate: true,
            can_sleep: true,
            sleep_thresholds: None,
            layer: 0,
            collision_mask: u32::MAX,
            sleeping: false,
            sleep_timer: 0.0,
            gravity_scale: 1.0,
            colliders: Vec::new(),
            kinematic_target: None,
            kinematic_moved: false,
            movement: None,
        }
    }
}

impl Body {
    pub fn new(kind: BodyKind) -> Self {
        let mut body = Self::default();
        body.set_kind(kind);
        body
    }

    pub fn dynamic(mass: f32) -> Self {
        let mut body = Self::default();
        body.set_mass(mass);
        body
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation.normalize();
        self
    }

    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.set_linear_velocity(velocity);
        self
    }

    pub fn with_gravity(mut self, use_gravity: bool) -> Self {
        self.use_gravity = use_gravity;
        self
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.set_layer(layer);
        self
    }

    pub fn with_collision_mask(mut self, mask: u32) -> Self {
        self.collision_mask = mask;
        self
    }

    pub fn with_movement(mut self, params: MovementParams) -> Self {
        self.enable_movement(params);
        self
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    pub fn is_kinematic(&self) -> bool {
        self.kind == BodyKind::Kinematic
    }

    pub fn is_trigger(&self) -> bool {
        self.kind == BodyKind::Trigger
    }

    /// Static bodies lose their mass and velocity. A massless body made
    /// dynamic gets unit mass.
    pub fn set_kind(&mut self, kind: BodyKind) {
        self.kind = kind;
        match kind {
            BodyKind::Static => {
                self.mass = 0.0;
                self.linear_velocity = Vec3::ZERO;
                self.angular_velocity = Vec3::ZERO;
                self.clear_forces();
            }
            BodyKind::Dynamic => {
                if self.mass <= 0.0 {
                    self.mass = 1.0;
                }
            }
            BodyKind::Kinematic | BodyKind::Trigger => {}
        }
        self.sleeping = false;
        self.sleep_timer = 0.0;
        self.update_inv_mass();
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Negative or NaN mass is treated as zero, and zero mass turns a dynamic
    /// or kinematic body static.
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = if mass.is_finite() { mass.max(0.0) } else { 0.0 };
        if self.mass == 0.0 && matches!(self.kind, BodyKind::Dynamic | BodyKind::Kinematic) {
            self.set_kind(BodyKind::Static);
        }
        self.update_inv_mass();
    }

    fn update_inv_mass(&mut self) {
        self.inv_mass = if self.kind == BodyKind::Dynamic && self.mass > 0.0 {
            self.mass.recip()
        } else {
            0.0
        };
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    pub fn has_infinite_mass(&self) -> bool {
        self.inv_mass == 0.0
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        if self.is_static() || !velocity.is_finite() {
            return;
        }
        self.linear_velocity = velocity;
        self.wake_up();
    }

    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        if self.is_static() || !velocity.is_finite() {
            return;
        }
        self.angular_velocity = velocity;
        self.wake_up();
    }

    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn set_layer(&mut self, layer: u32) {
        self.layer = layer.min(MAX_LAYERS - 1);
    }

    pub fn collides_with_layer(&self, layer: u32) -> bool {
        layer < MAX_LAYERS && self.collision_mask & (1 << layer) != 0
    }

    pub fn colliders(&self) -> &[ColliderHandle] {
        &self.colliders
    }

    pub fn movement(&self) -> Option<&Movement> {
        self.movement.as_deref()
    }

    pub fn movement_mut(&mut self) -> Option<&mut Movement> {
        self.movement.as_deref_mut()
    }

    pub fn enable_movement(&mut self, params: MovementParams) {
        match self.movement.as_deref_mut() {
            Some(movement) => movement.params = params,
            None => self.movement = Some(Box::new(Movement::new(params))),
        }
    }

    pub fn disable_movement(&mut self) {
        self.movement = None;
        self.gravity_scale = 1.0;
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn wake_up(&mut self) {
        self.sleeping = false;
        self.sleep_timer = 0.0;
    }

    pub fn sleep(&mut self) {
        if !self.is_dynamic() {
            return;
        }
        self.sleeping = true;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.clear_forces();
    }

    /// Bodies the solver may move.
    pub(crate) fn is_simulated(&self) -> bool {
        self.is_dynamic() && !self.sleeping
    }

    /// Inverse mass as seen by contact resolution, sleeping bodies do not move.
    pub(crate) fn solver_inv_mass(&self) -> f32 {
        if self.is_simulated() {
            self.inv_mass
        } else {
            0.0
        }
    }

    pub fn apply_force(&mut self, force: Vec3) {
        if !self.is_dynamic() || !force.is_finite() {
            return;
        }
        self.force += force;
        self.wake_up();
    }

    pub fn apply_force_at_point(&mut self, force: Vec3, point: Vec3) {
        if !self.is_dynamic() || !force.is_finite() {
            return;
        }
        self.force += force;
        self.torque += (point - self.centre_of_mass_world()).cross(force);
        self.wake_up();
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        if !self.is_dynamic() || !torque.is_finite() {
            return;
        }
        self.torque += torque;
        self.wake_up();
    }

    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    pub fn centre_of_mass_world(&self) -> Vec3 {
        self.position + self.orientation * self.centre_of_mass
    }

    pub fn world_to_local(&self, world_point: Vec3) -> Vec3 {
        self.orientation.conjugate() * (world_point - self.centre_of_mass_world())
    }

    pub fn local_to_world(&self, body_point: Vec3) -> Vec3 {
        self.centre_of_mass_world() + self.orientation * body_point
    }

    /// Point velocity including the contribution of spin.
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        let r = point - self.centre_of_mass_world();
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    pub fn inv_inertia_tensor_world(&self) -> Mat3 {
        if !self.can_rotate {
            return Mat3::ZERO;
        }
        let inv_inertia_tensor = self.inv_inertia_tensor_local();
        let orientation = Mat3::from_quat(self.orientation);
        orientation * inv_inertia_tensor * orientation.transpose()
    }

    pub fn inv_inertia_tensor_local(&self) -> Mat3 {
        if self.inv_mass == 0.0 || self.inertia_tensor.determinant().abs() <= f32::EPSILON {
            return Mat3::ZERO;
        }
        self.inertia_tensor.inverse() * self.inv_mass
    }

    /// Impulse through the centre of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if !self.is_dynamic() || !impulse.is_finite() {
            return;
        }
        self.wake_up();
        self.apply_impulse_linear(impulse);
    }

    pub fn apply_impulse_at_point(&mut self, impulse: Vec3, point: Vec3) {
        if !self.is_dynamic() || !impulse.is_finite() {
            return;
        }
        self.wake_up();
        self.apply_contact_impulse(impulse, point);
    }

    /// Solver path, does not wake the body.
    pub(crate) fn apply_contact_impulse(&mut self, impulse: Vec3, point: Vec3) {
        if self.has_infinite_mass() {
            return;
        }

        self.apply_impulse_linear(impulse);

        // applying impulses must produce torques through the centre of mass
        let r = point - self.centre_of_mass_world();
        self.apply_impulse_angular(r.cross(impulse));
    }

    fn apply_impulse_angular(&mut self, impulse: Vec3) {
        if self.has_infinite_mass() {
            return;
        }

        // dL = I dw = r x J
        // => dw = I^-1 * (r x J)
        self.angular_velocity += self.inv_inertia_tensor_world() * impulse;
        self.angular_velocity = self.angular_velocity.clamp_length_max(MAX_ANGULAR_SPEED);
        self.apply_locks();
    }

    fn apply_impulse_linear(&mut self, impulse: Vec3) {
        if self.has_infinite_mass() {
            return;
        }

        // dp = m dv = J
        // => dv = J / m
        self.linear_velocity += impulse * self.inv_mass;
        self.apply_locks();
    }

    fn apply_locks(&mut self) {
        self.linear_velocity = Vec3::select(self.lock_linear, Vec3::ZERO, self.linear_velocity);
        self.angular_velocity = Vec3::select(self.lock_angular, Vec3::ZERO, self.angular_velocity);
        if !self.can_rotate {
            self.angular_velocity = Vec3::ZERO;
        }
    }

    /// Forces, gravity and damping into velocity.
    pub(crate) fn integrate_velocity(&mut self, gravity: Vec3, dt: f32) {
        if !self.is_simulated() {
            return;
        }

        let mut acceleration = self.force * self.inv_mass;
        if self.use_gravity {
            acceleration += gravity * self.gravity_scale;
        }
        self.linear_velocity += acceleration * dt;
        self.angular_velocity += self.inv_inertia_tensor_world() * self.torque * dt;

        self.linear_velocity *= (1.0 - self.linear_damping.clamp(0.0, 1.0)).powf(dt);
        self.angular_velocity *= (1.0 - self.angular_damping.clamp(0.0, 1.0)).powf(dt);
        self.angular_velocity = self.angular_velocity.clamp_length_max(MAX_ANGULAR_SPEED);
        self.apply_locks();
    }

    /// Velocity into position and orientation.
    pub(crate) fn integrate_position(&mut self, dt: f32) {
        let moves = self.is_simulated() || self.is_kinematic();
        if !moves {
            return;
        }

        self.position += self.linear_velocity * dt;

        if !self.can_rotate || self.angular_velocity == Vec3::ZERO {
            return;
        }

        // rotation happens about the centre of mass, carry the body origin with it
        let position_com = self.centre_of_mass_world();
        let com_to_position = self.position - position_com;

        if self.is_dynamic() {
            // T = Ia = w x I * w, with no external torque left at this point
            let orientation = Mat3::from_quat(self.orientation);
            let inertia_tensor = orientation * self.inertia_tensor * orientation.transpose();
            if inertia_tensor.determinant().abs() > f32::EPSILON {
                let alpha = inertia_tensor.inverse()
                    * (self
                        .angular_velocity
                        .cross(inertia_tensor * self.angular_velocity));
                self.angular_velocity += alpha * dt;
            }
        }

        let d_angle = self.angular_velocity * dt;
        let angle = d_angle.length();
        let rcp_angle = angle.recip();
        let dq = if rcp_angle.is_finite() {
            Quat::from_axis_angle(d_angle * rcp_angle, angle)
        } else {
            Quat::IDENTITY
        };
        self.orientation = (dq * self.orientation).normalize();
        self.position = position_com + dq * com_to_position;
    }

    /// Advances the sleep timer. Returns true when the body falls asleep.
    pub(crate) fn update_sleep(&mut self, defaults: &SleepConfig, dt: f32) -> bool {
        if !self.is_dynamic() || self.sleeping {
            return false;
        }
        if !self.can_sleep || self.movement.is_some() {
            self.sleep_timer = 0.0;
            return false;
        }
        let thresholds = self.sleep_thresholds.unwrap_or(*defaults);
        if self.linear_velocity.length() < thresholds.linear_threshold
            && self.angular_velocity.length() < thresholds.angular_threshold
        {
            self.sleep_timer += dt;
            if self.sleep_timer >= thresholds.time_threshold {
                self.sleep();
                return true;
            }
        } else {
            self.sleep_timer = 0.0;
        }
        false
    }

    pub fn sleep_timer(&self) -> f32 {
        self.sleep_timer
    }
}
