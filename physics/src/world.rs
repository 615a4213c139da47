use crate::{
    arena::Arena,
    body::{Body, BodyHandle, BodyKind, MAX_LAYERS},
    bounds::Bounds,
    collider::{Collider, ColliderHandle},
    config::PhysicsConfig,
    contact::{CollisionInfo, CollisionStats},
    events::{BodyListener, Listeners, PhysicsEvent, WorldListener},
    movement::{Movement, MovementParams},
    narrowphase::{collide, voxel_world_contacts, NarrowContext, ShapeContact, WorldShape},
    pairs::{CollisionPair, PairTracker},
    shapes::{Shape, ShapeKind},
    solver::{self, SolverContact},
    spatial::SpatialGrid,
    time_accumulator::TimeAccumulator,
    voxel::VoxelGrid,
};
use glam::{IVec3, Mat3, Quat, Vec3};
use tracing::{debug, trace, warn};

const LAYER_COUNT: usize = MAX_LAYERS as usize;

pub struct PhysicsWorld {
    pub(crate) config: PhysicsConfig,
    pub(crate) bodies: Arena<Body>,
    pub(crate) colliders: Arena<Collider>,
    pub(crate) grid: SpatialGrid,
    pub(crate) voxels: Option<Box<dyn VoxelGrid>>,
    tracker: PairTracker,
    contacts: Vec<CollisionInfo>,
    solver_contacts: Vec<SolverContact>,
    stats: CollisionStats,
    events: Vec<PhysicsEvent>,
    listeners: Listeners,
    // bit j of row i enables layer i against layer j
    layer_matrix: [u32; LAYER_COUNT],
    layer_names: Vec<String>,
    accumulator: TimeAccumulator,
    paused: bool,
    step_num: u64,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        let config = config.sanitized();
        debug!(
            gravity = ?config.gravity,
            step = config.fixed_time_step,
            iterations = config.iterations,
            "creating physics world"
        );
        Self {
            grid: SpatialGrid::new(config.cell_size, config.grid_extent),
            accumulator: TimeAccumulator::new(config.fixed_time_step, config.max_steps_per_update),
            config,
            bodies: Arena::new(),
            colliders: Arena::new(),
            voxels: None,
            tracker: PairTracker::new(),
            contacts: Vec::new(),
            solver_contacts: Vec::new(),
            stats: CollisionStats::default(),
            events: Vec::new(),
            listeners: Listeners::default(),
            layer_matrix: [u32::MAX; LAYER_COUNT],
            layer_names: (0..LAYER_COUNT).map(|i| format!("Layer {}", i)).collect(),
            paused: false,
            step_num: 0,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        if gravity.is_finite() {
            self.config.gravity = gravity;
            self.wake_all();
        }
    }

    pub fn fixed_time_step(&self) -> f32 {
        self.config.fixed_time_step
    }

    pub fn set_fixed_time_step(&mut self, step: f32) {
        if step.is_finite() && step > 0.0 {
            self.config.fixed_time_step = step;
            self.accumulator.set_step_secs(step);
        }
    }

    pub fn iterations(&self) -> u32 {
        self.config.iterations
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        self.config.iterations = iterations.max(1);
    }

    pub fn time_scale(&self) -> f32 {
        self.config.time_scale
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        if time_scale.is_finite() && time_scale >= 0.0 {
            self.config.time_scale = time_scale;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn step_num(&self) -> u64 {
        self.step_num
    }

    pub fn stats(&self) -> CollisionStats {
        self.stats
    }

    /// Contacts found during the most recent step.
    pub fn contacts(&self) -> &[CollisionInfo] {
        &self.contacts
    }

    /// Events from the most recent `update` or `step` calls.
    pub fn events(&self) -> &[PhysicsEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn set_voxel_grid(&mut self, grid: Option<Box<dyn VoxelGrid>>) {
        self.voxels = grid;
        self.wake_all();
    }

    pub fn voxel_grid(&self) -> Option<&dyn VoxelGrid> {
        self.voxels.as_deref()
    }

    pub fn set_body_listener(&mut self, body: BodyHandle, listener: Box<dyn BodyListener>) -> bool {
        if !self.bodies.contains(body) {
            return false;
        }
        self.listeners.bodies.insert(body, listener);
        true
    }

    pub fn remove_body_listener(&mut self, body: BodyHandle) -> Option<Box<dyn BodyListener>> {
        self.listeners.bodies.remove(&body)
    }

    pub fn set_world_listener(&mut self, listener: Option<Box<dyn WorldListener>>) {
        self.listeners.world = listener;
    }

    // layers

    pub fn set_layer_collision(&mut self, layer_a: u32, layer_b: u32, enabled: bool) {
        if layer_a >= MAX_LAYERS || layer_b >= MAX_LAYERS {
            return;
        }
        let (a, b) = (layer_a as usize, layer_b as usize);
        if enabled {
            self.layer_matrix[a] |= 1 << b;
            self.layer_matrix[b] |= 1 << a;
        } else {
            self.layer_matrix[a] &= !(1 << b);
            self.layer_matrix[b] &= !(1 << a);
        }
    }

    pub fn layers_collide(&self, layer_a: u32, layer_b: u32) -> bool {
        if layer_a >= MAX_LAYERS || layer_b >= MAX_LAYERS {
            return false;
        }
        self.layer_matrix[layer_a as usize] & (1 << layer_b) != 0
    }

    pub fn layer_name(&self, layer: u32) -> Option<&str> {
        self.layer_names.get(layer as usize).map(String::as_str)
    }

    pub fn set_layer_name(&mut self, layer: u32, name: impl Into<String>) {
        if let Some(slot) = self.layer_names.get_mut(layer as usize) {
            *slot = name.into();
        }
    }

    pub fn layer_by_name(&self, name: &str) -> Option<u32> {
        self.layer_names
            .iter()
            .position(|n| n == name)
            .map(|i| i as u32)
    }

    fn bodies_collide(&self, a: &Body, b: &Body) -> bool {
        self.layers_collide(a.layer(), b.layer())
            && a.collides_with_layer(b.layer())
            && b.collides_with_layer(a.layer())
    }

    // colliders

    pub fn create_collider(&mut self, mut collider: Collider) -> ColliderHandle {
        collider.owner = None;
        self.colliders.insert(collider)
    }

    pub fn create_sphere(&mut self, radius: f32) -> ColliderHandle {
        self.create_collider(Collider::new(Shape::make_sphere(radius)))
    }

    pub fn create_box(&mut self, half_extents: Vec3) -> ColliderHandle {
        self.create_collider(Collider::new(Shape::make_box(half_extents)))
    }

    pub fn create_capsule(&mut self, radius: f32, height: f32) -> ColliderHandle {
        self.create_collider(Collider::new(Shape::make_capsule(radius, height)))
    }

    pub fn create_voxel_region(&mut self, radius_cells: u32) -> ColliderHandle {
        let cell_size = self.voxels.as_ref().map_or(1.0, |grid| grid.cell_spacing());
        self.create_collider(Collider::new(Shape::make_voxel_region(radius_cells, cell_size)))
    }

    /// Detaches the collider from its owner first.
    pub fn destroy_collider(&mut self, handle: ColliderHandle) -> bool {
        let owner = match self.colliders.get(handle) {
            Some(collider) => collider.owner,
            None => return false,
        };
        if let Some(owner) = owner {
            self.detach(owner, handle);
        }
        self.colliders.remove(handle).is_some()
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    /// Edits a collider in place. The owning body is woken, its mass
    /// properties recomputed and its grid cells refreshed before returning.
    pub fn edit_collider<R>(
        &mut self,
        handle: ColliderHandle,
        edit: impl FnOnce(&mut Collider) -> R,
    ) -> Option<R> {
        let collider = self.colliders.get_mut(handle)?;
        let result = edit(collider);
        if let Some(owner) = collider.owner {
            if let Some(body) = self.bodies.get_mut(owner) {
                body.wake_up();
            }
            self.update_mass_properties(owner);
            self.reindex(owner);
        }
        Some(result)
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    // bodies

    pub fn add_body(&mut self, mut body: Body) -> BodyHandle {
        body.colliders.clear();
        let kind = body.kind();
        let handle = self.bodies.insert(body);
        debug!(?handle, ?kind, "added body");
        handle
    }

    /// Unregisters the body. Its colliders are detached and stay alive.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        let mut body = self.bodies.remove(handle)?;
        for collider in body.colliders.drain(..) {
            if let Some(collider) = self.colliders.get_mut(collider) {
                collider.owner = None;
            }
        }
        self.grid.remove(handle);
        self.listeners.bodies.remove(&handle);
        debug!(?handle, "removed body");
        Some(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Fails when either handle is stale or the collider belongs to another body.
    pub fn attach(&mut self, body: BodyHandle, collider: ColliderHandle) -> bool {
        if !self.bodies.contains(body) {
            return false;
        }
        match self.colliders.get_mut(collider) {
            Some(c) => match c.owner {
                Some(owner) if owner == body => return true,
                Some(owner) => {
                    trace!(?collider, ?owner, "collider already attached elsewhere");
                    return false;
                }
                None => c.owner = Some(body),
            },
            None => return false,
        }
        if let Some(b) = self.bodies.get_mut(body) {
            b.colliders.push(collider);
            b.wake_up();
        }
        self.update_mass_properties(body);
        self.reindex(body);
        true
    }

    pub fn detach(&mut self, body: BodyHandle, collider: ColliderHandle) -> bool {
        let removed = match self.bodies.get_mut(body) {
            Some(b) => {
                let before = b.colliders.len();
                b.colliders.retain(|c| *c != collider);
                b.wake_up();
                b.colliders.len() != before
            }
            None => false,
        };
        if !removed {
            return false;
        }
        if let Some(c) = self.colliders.get_mut(collider) {
            c.owner = None;
        }
        self.update_mass_properties(body);
        self.reindex(body);
        true
    }

    /// Inertia and centre of mass follow the first solid collider.
    fn update_mass_properties(&mut self, handle: BodyHandle) {
        let Self {
            bodies, colliders, ..
        } = self;
        let body = match bodies.get_mut(handle) {
            Some(body) => body,
            None => return,
        };
        let primary = body
            .colliders
            .iter()
            .filter_map(|c| colliders.get(*c))
            .find(|c| !c.is_trigger && c.shape.kind() != ShapeKind::VoxelRegion);
        match primary {
            Some(collider) => {
                let rotation = Mat3::from_quat(collider.rotation);
                body.inertia_tensor = rotation * collider.shape.inertia_tensor() * rotation.transpose();
                body.centre_of_mass = collider.offset;
            }
            None => {
                body.inertia_tensor = Body::default().inertia_tensor;
                body.centre_of_mass = Vec3::ZERO;
            }
        }
    }

    /// World bounds of every collider on the body.
    pub fn body_bounds(&self, handle: BodyHandle) -> Option<Bounds> {
        body_bounds(&self.bodies, &self.colliders, handle)
    }

    fn reindex(&mut self, handle: BodyHandle) {
        match body_bounds(&self.bodies, &self.colliders, handle) {
            Some(bounds) => self.grid.update(handle, &bounds),
            None => self.grid.remove(handle),
        }
    }

    fn wake_all(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            if body.is_sleeping() {
                body.wake_up();
            }
        }
    }

    // transforms and forces

    /// Teleports the body.
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> bool {
        if !position.is_finite() {
            return false;
        }
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.position = position;
                body.kinematic_target = None;
                body.wake_up();
            }
            None => return false,
        }
        self.reindex(handle);
        true
    }

    pub fn set_rotation(&mut self, handle: BodyHandle, rotation: Quat) -> bool {
        if !rotation.is_finite() {
            return false;
        }
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.orientation = rotation.normalize();
                body.kinematic_target = None;
                body.wake_up();
            }
            None => return false,
        }
        self.reindex(handle);
        true
    }

    /// Moves a kinematic body to the target over the next step, so bodies
    /// riding it see its velocity.
    pub fn move_kinematic(&mut self, handle: BodyHandle, position: Vec3, rotation: Quat) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) if body.is_kinematic() && position.is_finite() && rotation.is_finite() => {
                body.kinematic_target = Some((position, rotation.normalize()));
                true
            }
            _ => false,
        }
    }

    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec3) -> bool {
        self.with_body(handle, |body| body.apply_force(force))
    }

    pub fn apply_force_at_point(&mut self, handle: BodyHandle, force: Vec3, point: Vec3) -> bool {
        self.with_body(handle, |body| body.apply_force_at_point(force, point))
    }

    pub fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3) -> bool {
        self.with_body(handle, |body| body.apply_torque(torque))
    }

    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) -> bool {
        self.with_body(handle, |body| body.apply_impulse(impulse))
    }

    pub fn apply_impulse_at_point(&mut self, handle: BodyHandle, impulse: Vec3, point: Vec3) -> bool {
        self.with_body(handle, |body| body.apply_impulse_at_point(impulse, point))
    }

    pub fn wake_up(&mut self, handle: BodyHandle) -> bool {
        self.with_body(handle, Body::wake_up)
    }

    fn with_body(&mut self, handle: BodyHandle, f: impl FnOnce(&mut Body)) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                f(body);
                true
            }
            None => false,
        }
    }

    // movement

    fn with_movement<R>(
        &mut self,
        handle: BodyHandle,
        f: impl FnOnce(&mut Movement, &mut Vec3, f32) -> R,
    ) -> Option<R> {
        let gravity = self.config.gravity.y;
        let body = self.bodies.get_mut(handle)?;
        let movement = body.movement.as_mut()?;
        let result = f(movement, &mut body.linear_velocity, gravity);
        body.wake_up();
        Some(result)
    }

    pub fn move_input(&mut self, handle: BodyHandle, direction: Vec3, strength: f32) -> bool {
        self.with_movement(handle, |m, _, _| m.set_move_input(direction, strength))
            .is_some()
    }

    pub fn jump(&mut self, handle: BodyHandle) -> bool {
        self.with_movement(handle, |m, v, g| m.jump(v, g))
            .unwrap_or(false)
    }

    pub fn jump_released(&mut self, handle: BodyHandle) -> bool {
        self.with_movement(handle, |m, v, g| m.jump_released(v, g))
            .is_some()
    }

    pub fn dash(&mut self, handle: BodyHandle, direction: Vec3) -> bool {
        self.with_movement(handle, |m, v, _| m.dash(v, direction))
            .unwrap_or(false)
    }

    pub fn wall_jump(&mut self, handle: BodyHandle) -> bool {
        self.with_movement(handle, |m, v, g| m.wall_jump(v, g))
            .unwrap_or(false)
    }

    pub fn grab_ledge(&mut self, handle: BodyHandle) -> bool {
        self.with_movement(handle, |m, v, _| m.grab_ledge(v))
            .unwrap_or(false)
    }

    pub fn release_ledge(&mut self, handle: BodyHandle) -> bool {
        self.with_movement(handle, |m, _, _| m.release_ledge())
            .is_some()
    }

    /// Lifts the body onto the grabbed ledge.
    pub fn climb_ledge(&mut self, handle: BodyHandle) -> bool {
        let delta = match self.with_movement(handle, |m, _, _| m.climb_ledge()) {
            Some(Some(delta)) => delta,
            _ => return false,
        };
        if let Some(body) = self.bodies.get_mut(handle) {
            body.position += delta;
        }
        self.reindex(handle);
        true
    }

    pub fn set_movement_params(&mut self, handle: BodyHandle, params: MovementParams) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                match body.movement.as_mut() {
                    Some(movement) => movement.params = params,
                    None => body.enable_movement(params),
                }
                true
            }
            None => false,
        }
    }

    /// Applies the standard platformer tuning derived from the jump arc.
    pub fn setup_platformer(
        &mut self,
        handle: BodyHandle,
        jump_height: f32,
        jump_time: f32,
        max_speed: f32,
    ) -> bool {
        self.set_movement_params(
            handle,
            MovementParams::platformer(jump_height, jump_time, max_speed),
        )
    }

    /// Upright dynamic capsule with the platformer extension.
    pub fn create_character(&mut self, position: Vec3, height: f32, radius: f32) -> BodyHandle {
        let mut body = Body::dynamic(1.0).with_position(position);
        body.can_rotate = false;
        let handle = self.add_body(body);
        let capsule = self.create_capsule(radius, height);
        self.attach(handle, capsule);
        self.setup_platformer(handle, 2.0, 0.5, 5.0);
        debug!(?handle, ?position, height, radius, "created character");
        handle
    }

    // simulation

    /// Advances by `frame_delta` seconds of real time in whole fixed steps and
    /// returns the number of steps taken.
    pub fn update(&mut self, frame_delta: f32) -> u32 {
        self.events.clear();
        if self.paused {
            return 0;
        }
        let steps = self.accumulator.update(frame_delta * self.config.time_scale);
        let dt = self.accumulator.step_secs();
        for _ in 0..steps {
            self.step(dt);
        }
        steps
    }

    /// One fixed step. Events from it are appended to the queue and handed
    /// to listeners once the step is complete.
    pub fn step(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let first_event = self.events.len();
        self.step_num += 1;

        self.sync_kinematic(dt);
        self.update_movement(dt);

        let gravity = self.config.gravity;
        for (_, body) in self.bodies.iter_mut() {
            body.integrate_velocity(gravity, dt);
        }

        self.detect_collisions();

        let solver_config = self.config.solver;
        for _ in 0..self.config.iterations {
            for contact in self.solver_contacts.iter_mut() {
                solver::resolve(&mut self.bodies, contact, &solver_config);
            }
        }

        for (_, body) in self.bodies.iter_mut() {
            body.integrate_position(dt);
        }

        let sleep_defaults = self.config.sleep;
        for (handle, body) in self.bodies.iter_mut() {
            if body.update_sleep(&sleep_defaults, dt) {
                trace!(?handle, "body asleep");
            }
        }

        for (pair, is_trigger) in self.tracker.end_step() {
            if is_trigger {
                self.events.push(PhysicsEvent::TriggerExit {
                    a: pair.a,
                    b: pair.b,
                });
            }
        }

        for handle in self.bodies.handles() {
            self.reindex(handle);
        }

        for (_, body) in self.bodies.iter_mut() {
            body.clear_forces();
        }

        self.listeners.dispatch(&self.events[first_event..]);
    }

    fn sync_kinematic(&mut self, dt: f32) {
        for (_, body) in self.bodies.iter_mut() {
            if !body.is_kinematic() {
                continue;
            }
            match body.kinematic_target.take() {
                Some((position, rotation)) => {
                    body.linear_velocity = (position - body.position) / dt;
                    let mut dq = rotation * body.orientation.conjugate();
                    // shortest arc
                    if dq.w < 0.0 {
                        dq = -dq;
                    }
                    let (axis, angle) = dq.to_axis_angle();
                    body.angular_velocity = if angle.abs() > f32::EPSILON {
                        axis * (angle / dt)
                    } else {
                        Vec3::ZERO
                    };
                    body.kinematic_moved = true;
                }
                None if body.kinematic_moved => {
                    body.linear_velocity = Vec3::ZERO;
                    body.angular_velocity = Vec3::ZERO;
                    body.kinematic_moved = false;
                }
                None => {}
            }
        }
    }

    fn update_movement(&mut self, dt: f32) {
        let handles: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.movement.is_some() && body.is_dynamic())
            .map(|(handle, _)| handle)
            .collect();
        let gravity = self.config.gravity.y;
        for handle in handles {
            let sensors = self.movement_sensors(handle);
            if let Some(body) = self.bodies.get_mut(handle) {
                if let Some(movement) = body.movement.as_mut() {
                    let gravity_scale = movement.update(&mut body.linear_velocity, sensors, gravity, dt);
                    body.gravity_scale = gravity_scale;
                }
            }
        }
    }

    fn detect_collisions(&mut self) {
        self.contacts.clear();
        self.solver_contacts.clear();
        self.tracker.begin_step();
        let mut stats = CollisionStats::default();

        let pairs = self.grid.candidate_pairs();
        stats.broad_phase_pairs = pairs.len();
        let ctx = NarrowContext {
            voxels: self.voxels.as_deref(),
        };

        for (handle_a, handle_b) in pairs {
            let (body_a, body_b) = match (self.bodies.get(handle_a), self.bodies.get(handle_b)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
            if !can_interact(body_a) && !can_interact(body_b) {
                continue;
            }
            if !self.bodies_collide(body_a, body_b) {
                continue;
            }

            for &ca in &body_a.colliders {
                let collider_a = match self.colliders.get(ca) {
                    Some(c) => c,
                    None => continue,
                };
                let (pos_a, rot_a) = collider_a.world_transform(body_a.position, body_a.orientation);
                let shape_a = WorldShape::new(&collider_a.shape, pos_a, rot_a);
                let bounds_a = shape_a.bounds();

                for &cb in &body_b.colliders {
                    let collider_b = match self.colliders.get(cb) {
                        Some(c) => c,
                        None => continue,
                    };
                    let (pos_b, rot_b) = collider_b.world_transform(body_b.position, body_b.orientation);
                    let shape_b = WorldShape::new(&collider_b.shape, pos_b, rot_b);
                    if !bounds_a.intersects(&shape_b.bounds()) {
                        continue;
                    }
                    stats.narrow_phase_tests += 1;
                    let contact = match collide(&shape_a, &shape_b, &ctx) {
                        Some(contact) => contact,
                        None => continue,
                    };

                    let is_trigger = collider_a.is_trigger
                        || collider_b.is_trigger
                        || body_a.is_trigger()
                        || body_b.is_trigger();
                    let info = CollisionInfo {
                        body_a: handle_a,
                        collider_a: ca,
                        body_b: Some(handle_b),
                        collider_b: Some(cb),
                        voxel_cell: None,
                        point: contact.point,
                        normal: contact.normal,
                        penetration: contact.penetration,
                        is_trigger,
                    };
                    self.contacts.push(info);
                    if !is_trigger {
                        self.solver_contacts.push(SolverContact::new(
                            handle_a,
                            Some(handle_b),
                            contact.point,
                            contact.normal,
                            contact.penetration,
                            collider_a.material(),
                            collider_b.material(),
                        ));
                    }
                }
            }
        }

        if let Some(grid) = self.voxels.as_deref() {
            let mut cell_contacts: Vec<(IVec3, ShapeContact)> = Vec::new();
            for (handle, body) in self.bodies.iter() {
                if !body.is_simulated() {
                    continue;
                }
                for &ch in &body.colliders {
                    let collider = match self.colliders.get(ch) {
                        Some(c) if !c.is_trigger => c,
                        _ => continue,
                    };
                    let (pos, rot) = collider.world_transform(body.position, body.orientation);
                    let shape = WorldShape::new(&collider.shape, pos, rot);
                    cell_contacts.clear();
                    voxel_world_contacts(&shape, grid, &mut cell_contacts);
                    for &(cell, contact) in &cell_contacts {
                        stats.voxel_contacts += 1;
                        self.contacts.push(CollisionInfo {
                            body_a: handle,
                            collider_a: ch,
                            body_b: None,
                            collider_b: None,
                            voxel_cell: Some(cell),
                            point: contact.point,
                            normal: contact.normal,
                            penetration: contact.penetration,
                            is_trigger: false,
                        });
                        self.solver_contacts.push(SolverContact::new(
                            handle,
                            None,
                            contact.point,
                            contact.normal,
                            contact.penetration,
                            collider.material(),
                            self.config.voxel_material,
                        ));
                    }
                }
            }
        }
        stats.active_contacts = self.contacts.len();
        self.stats = stats;

        self.track_pairs();

        for contact in &self.solver_contacts {
            solver::latch_grounded(&mut self.bodies, contact);
        }
    }

    /// Enter edges, wake ups and collision events for this step's contacts.
    fn track_pairs(&mut self) {
        let wake_speed = self.config.sleep.linear_threshold;
        for i in 0..self.contacts.len() {
            let info = self.contacts[i];
            let body_b = match info.body_b {
                Some(body_b) => body_b,
                None => {
                    self.events.push(PhysicsEvent::Collision(info));
                    continue;
                }
            };
            let pair = CollisionPair::new(info.body_a, body_b);
            let is_new = self.tracker.touch(pair, info.is_trigger);
            if info.is_trigger {
                if is_new {
                    trace!(?pair, "trigger enter");
                    self.events.push(PhysicsEvent::TriggerEnter {
                        a: pair.a,
                        b: pair.b,
                    });
                }
                continue;
            }

            let moving = |handle: BodyHandle| {
                self.bodies.get(handle).map_or(false, |body| {
                    (body.is_simulated() && body.linear_velocity.length() > wake_speed)
                        || (body.is_kinematic() && body.kinematic_moved)
                })
            };
            let wake_a = is_new || moving(body_b);
            let wake_b = is_new || moving(info.body_a);
            for (handle, wake) in [(info.body_a, wake_a), (body_b, wake_b)] {
                if let Some(body) = self.bodies.get_mut(handle) {
                    if wake && body.is_sleeping() {
                        trace!(?handle, "woken by contact");
                        body.wake_up();
                    }
                }
            }
            self.events.push(PhysicsEvent::Collision(info));
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

/// Bodies that may start or change a contact on their own.
fn can_interact(body: &Body) -> bool {
    match body.kind() {
        BodyKind::Dynamic | BodyKind::Kinematic => true,
        BodyKind::Static | BodyKind::Trigger => false,
    }
}

pub(crate) fn body_bounds(
    bodies: &Arena<Body>,
    colliders: &Arena<Collider>,
    handle: BodyHandle,
) -> Option<Bounds> {
    let body = bodies.get(handle)?;
    let mut bounds = Bounds::new();
    for collider in body.colliders.iter().filter_map(|c| colliders.get(*c)) {
        bounds.expand_by_bounds(&collider.world_bounds(body.position, body.orientation));
    }
    if bounds.is_valid() {
        Some(bounds)
    } else {
        if !body.colliders.is_empty() {
            warn!(?handle, "body has colliders but no valid bounds");
        }
        None
    }
}
