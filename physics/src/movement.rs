//! Platformer layer for character bodies.
//!
//! Nothing here moves a body directly. Commands and the per step update only
//! write velocities, timers and a gravity scale that the regular integration
//! and contact resolution then honor. Ledge climbing is the one exception and
//! reports a position delta for the world to apply as a teleport.

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementParams {
    pub max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    /// Multiplier on acceleration and deceleration while airborne.
    pub air_control: f32,

    pub jump_height: f32,
    /// Apex height reached when jump is released immediately.
    pub min_jump_height: f32,
    /// How long after takeoff releasing jump still cuts the rise.
    pub jump_time: f32,
    pub coyote_time: f32,
    pub jump_buffer_time: f32,

    pub ground_check_distance: f32,
    pub wall_check_distance: f32,

    pub wall_slide_enabled: bool,
    pub wall_slide_gravity_scale: f32,
    pub wall_jump_force: f32,

    /// Grab automatically when a ledge is detected while falling.
    pub auto_ledge_grab: bool,
    pub ledge_climb_height: f32,
    pub ledge_climb_forward: f32,

    pub dash_enabled: bool,
    pub dash_force: f32,
    pub dash_duration: f32,
    pub dash_cooldown: f32,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            acceleration: 20.0,
            deceleration: 10.0,
            air_control: 0.5,
            jump_height: 2.0,
            min_jump_height: 0.5,
            jump_time: 0.5,
            coyote_time: 0.1,
            jump_buffer_time: 0.1,
            ground_check_distance: 0.1,
            wall_check_distance: 0.5,
            wall_slide_enabled: true,
            wall_slide_gravity_scale: 0.3,
            wall_jump_force: 5.0,
            auto_ledge_grab: false,
            ledge_climb_height: 1.0,
            ledge_climb_forward: 0.5,
            dash_enabled: true,
            dash_force: 10.0,
            dash_duration: 0.2,
            dash_cooldown: 1.0,
        }
    }
}

impl MovementParams {
    /// Tuning derived from a desired jump and run speed.
    pub fn platformer(jump_height: f32, jump_time: f32, max_speed: f32) -> Self {
        let jump_height = jump_height.abs();
        let max_speed = max_speed.abs();
        Self {
            max_speed,
            acceleration: max_speed * 4.0,
            deceleration: max_speed * 2.0,
            jump_height,
            min_jump_height: jump_height * 0.5,
            jump_time: jump_time.abs(),
            coyote_time: 0.1,
            jump_buffer_time: 0.1,
            wall_jump_force: max_speed,
            ..Self::default()
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MovementState {
    pub grounded: bool,
    pub was_grounded: bool,
    pub jumping: bool,
    pub coyote_timer: f32,
    pub jump_buffer_timer: f32,
    /// Remaining window in which a release shortens the jump.
    pub jump_hold_timer: f32,
    pub move_input: Vec3,
    /// Unit horizontal direction of the last non-zero move input.
    pub facing: Vec3,
    pub touching_wall: bool,
    pub wall_sliding: bool,
    pub ledge_point: Option<Vec3>,
    pub ledge_grabbing: bool,
    pub dashing: bool,
    pub dash_direction: Vec3,
    pub dash_timer: f32,
    pub dash_cooldown_timer: f32,
    pub air_dash_available: bool,
    /// Set by contact resolution during the previous step.
    pub(crate) contact_grounded: bool,
}

impl Default for MovementState {
    fn default() -> Self {
        Self {
            grounded: false,
            was_grounded: false,
            jumping: false,
            coyote_timer: 0.0,
            jump_buffer_timer: 0.0,
            jump_hold_timer: 0.0,
            move_input: Vec3::ZERO,
            facing: Vec3::X,
            touching_wall: false,
            wall_sliding: false,
            ledge_point: None,
            ledge_grabbing: false,
            dashing: false,
            dash_direction: Vec3::X,
            dash_timer: 0.0,
            dash_cooldown_timer: 0.0,
            air_dash_available: true,
            contact_grounded: false,
        }
    }
}

/// Probe results gathered by the world before each update.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MovementSensors {
    pub grounded: bool,
    pub wall_normal: Option<Vec3>,
    pub ledge_point: Option<Vec3>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Movement {
    pub params: MovementParams,
    pub state: MovementState,
}

fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

impl Movement {
    pub fn new(params: MovementParams) -> Self {
        Self {
            params,
            state: MovementState::default(),
        }
    }

    pub fn jump_velocity(&self, gravity: f32) -> f32 {
        (2.0 * gravity.abs() * self.params.jump_height).sqrt()
    }

    pub fn min_jump_velocity(&self, gravity: f32) -> f32 {
        (2.0 * gravity.abs() * self.params.min_jump_height).sqrt()
    }

    pub fn set_move_input(&mut self, direction: Vec3, strength: f32) {
        let strength = if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            0.0
        };
        match horizontal(direction).try_normalize() {
            Some(dir) => {
                self.state.move_input = dir * strength;
                self.state.facing = dir;
            }
            None => self.state.move_input = Vec3::ZERO,
        }
    }

    pub fn can_jump(&self) -> bool {
        let state = &self.state;
        (state.grounded || state.coyote_timer > 0.0 || state.wall_sliding) && !state.ledge_grabbing
    }

    /// Jumps now if allowed, otherwise remembers the input for the buffer window.
    pub fn jump(&mut self, velocity: &mut Vec3, gravity: f32) -> bool {
        if self.can_jump() {
            self.launch(velocity, gravity);
            true
        } else {
            if !self.state.grounded && !self.state.jumping {
                self.state.jump_buffer_timer = self.params.jump_buffer_time;
            }
            false
        }
    }

    fn launch(&mut self, velocity: &mut Vec3, gravity: f32) {
        velocity.y = self.jump_velocity(gravity);
        let state = &mut self.state;
        state.coyote_timer = 0.0;
        state.jump_buffer_timer = 0.0;
        state.jump_hold_timer = self.params.jump_time;
        state.jumping = true;
        state.grounded = false;
        state.contact_grounded = false;
    }

    /// Cuts the rise short so a tapped jump reaches the minimum height.
    pub fn jump_released(&mut self, velocity: &mut Vec3, gravity: f32) {
        if self.state.jumping && self.state.jump_hold_timer > 0.0 && velocity.y > 0.0 {
            self.state.jump_hold_timer = 0.0;
            velocity.y = velocity.y.min(self.min_jump_velocity(gravity));
        }
    }

    pub fn wall_jump(&mut self, velocity: &mut Vec3, gravity: f32) -> bool {
        if !self.state.wall_sliding {
            return false;
        }
        let away = -self.state.facing;
        *velocity = away * self.params.wall_jump_force;
        velocity.y = self.jump_velocity(gravity);
        let state = &mut self.state;
        state.facing = away;
        state.wall_sliding = false;
        state.grounded = false;
        state.jumping = true;
        state.coyote_timer = 0.0;
        true
    }

    pub fn dash(&mut self, velocity: &mut Vec3, direction: Vec3) -> bool {
        let state = &self.state;
        if !self.params.dash_enabled
            || state.dashing
            || state.ledge_grabbing
            || state.dash_cooldown_timer > 0.0
            || (!state.grounded && !state.air_dash_available)
        {
            return false;
        }
        let dir = direction
            .try_normalize()
            .or_else(|| horizontal(self.state.facing).try_normalize())
            .unwrap_or(Vec3::X);

        let state = &mut self.state;
        if !state.grounded {
            state.air_dash_available = false;
        }
        state.dashing = true;
        state.dash_direction = dir;
        state.dash_timer = self.params.dash_duration;
        state.dash_cooldown_timer = self.params.dash_cooldown;
        *velocity = dir * self.params.dash_force;
        true
    }

    pub fn can_grab_ledge(&self) -> bool {
        let state = &self.state;
        state.ledge_point.is_some() && !state.grounded && !state.ledge_grabbing
    }

    pub fn grab_ledge(&mut self, velocity: &mut Vec3) -> bool {
        if !self.can_grab_ledge() {
            return false;
        }
        self.state.ledge_grabbing = true;
        self.state.dashing = false;
        self.state.wall_sliding = false;
        *velocity = Vec3::ZERO;
        true
    }

    pub fn release_ledge(&mut self) {
        self.state.ledge_grabbing = false;
    }

    /// Position delta that puts the body on top of the grabbed ledge.
    pub fn climb_ledge(&mut self) -> Option<Vec3> {
        if !self.state.ledge_grabbing {
            return None;
        }
        self.state.ledge_grabbing = false;
        self.state.ledge_point = None;
        Some(
            Vec3::Y * self.params.ledge_climb_height
                + self.state.facing * self.params.ledge_climb_forward,
        )
    }

    /// Advances the state machine by one fixed step and returns the gravity
    /// scale the body integrates with this step.
    pub fn update(
        &mut self,
        velocity: &mut Vec3,
        sensors: MovementSensors,
        gravity: f32,
        dt: f32,
    ) -> f32 {
        let params = self.params;

        self.state.jump_buffer_timer = (self.state.jump_buffer_timer - dt).max(0.0);
        self.state.dash_cooldown_timer = (self.state.dash_cooldown_timer - dt).max(0.0);
        self.state.jump_hold_timer = (self.state.jump_hold_timer - dt).max(0.0);

        // rising bodies only count as grounded through contacts under them
        let probe_grounded = sensors.grounded && velocity.y <= 0.01;
        let grounded = probe_grounded || self.state.contact_grounded;
        self.state.contact_grounded = false;

        let state = &mut self.state;
        state.was_grounded = state.grounded;
        state.grounded = grounded;
        if grounded {
            state.coyote_timer = params.coyote_time;
            state.air_dash_available = true;
        } else {
            state.coyote_timer = (state.coyote_timer - dt).max(0.0);
        }

        state.touching_wall = sensors.wall_normal.is_some();
        state.ledge_point = sensors.ledge_point;

        if params.auto_ledge_grab && velocity.y <= 0.0 && self.can_grab_ledge() {
            self.grab_ledge(velocity);
        }

        if self.state.ledge_grabbing {
            *velocity = Vec3::ZERO;
            return 0.0;
        }

        if self.state.dashing {
            self.state.dash_timer -= dt;
            if self.state.dash_timer > 0.0 {
                *velocity = self.state.dash_direction * params.dash_force;
                return 0.0;
            }
            self.state.dashing = false;
            self.state.dash_timer = 0.0;
            *velocity *= 0.5;
        }

        self.state.wall_sliding = params.wall_slide_enabled
            && self.state.touching_wall
            && !self.state.grounded
            && velocity.y < 0.0;

        self.apply_horizontal(velocity, dt);

        if self.state.jump_buffer_timer > 0.0 && self.state.grounded {
            self.launch(velocity, gravity);
        }

        if self.state.grounded && velocity.y <= 0.0 {
            self.state.jumping = false;
            self.state.jump_hold_timer = 0.0;
        }

        if self.state.wall_sliding {
            params.wall_slide_gravity_scale
        } else {
            1.0
        }
    }

    fn apply_horizontal(&mut self, velocity: &mut Vec3, dt: f32) {
        let params = &self.params;
        let air_scale = if self.state.grounded {
            1.0
        } else {
            params.air_control
        };
        let current = horizontal(*velocity);
        let input = self.state.move_input;

        let next = if input.length_squared() > 1e-4 {
            let target = input * params.max_speed;
            let change = target - current;
            let max_change = params.acceleration * air_scale * dt;
            current + change.clamp_length_max(max_change)
        } else {
            let speed = current.length();
            let reduced = (speed - params.deceleration * air_scale * dt).max(0.0);
            current.normalize_or_zero() * reduced
        };
        velocity.x = next.x;
        velocity.z = next.z;
    }
}
