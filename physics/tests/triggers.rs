use glam::Vec3;
use std::{cell::RefCell, rc::Rc};
use voxel_physics::{
    Body, BodyHandle, BodyListener, Collider, PhysicsConfig, PhysicsEvent, PhysicsWorld, Shape,
    WorldListener,
};

const DT: f32 = 1.0 / 60.0;

#[derive(Default)]
struct Counts {
    enters: Vec<(BodyHandle, BodyHandle)>,
    exits: Vec<(BodyHandle, BodyHandle)>,
    collisions: usize,
}

struct Recorder(Rc<RefCell<Counts>>);

impl WorldListener for Recorder {
    fn on_collision(&mut self, _info: &voxel_physics::CollisionInfo) {
        self.0.borrow_mut().collisions += 1;
    }

    fn on_trigger_enter(&mut self, a: BodyHandle, b: BodyHandle) {
        self.0.borrow_mut().enters.push((a, b));
    }

    fn on_trigger_exit(&mut self, a: BodyHandle, b: BodyHandle) {
        self.0.borrow_mut().exits.push((a, b));
    }
}

impl BodyListener for Recorder {
    fn on_trigger_enter(&mut self, body: BodyHandle, other: BodyHandle) {
        self.0.borrow_mut().enters.push((body, other));
    }

    fn on_trigger_exit(&mut self, body: BodyHandle, other: BodyHandle) {
        self.0.borrow_mut().exits.push((body, other));
    }
}

fn zero_gravity() -> PhysicsWorld {
    PhysicsWorld::new(PhysicsConfig {
        gravity: Vec3::ZERO,
        ..Default::default()
    })
}

fn add_trigger_ball(world: &mut PhysicsWorld, position: Vec3) -> BodyHandle {
    let body = world.add_body(Body::dynamic(1.0).with_position(position));
    let collider = world.create_collider(Collider::new(Shape::make_sphere(0.5)).with_trigger(true));
    assert!(world.attach(body, collider));
    body
}

fn count_trigger_events(events: &[PhysicsEvent]) -> (usize, usize) {
    events.iter().fold((0, 0), |(enters, exits), event| match event {
        PhysicsEvent::TriggerEnter { .. } => (enters + 1, exits),
        PhysicsEvent::TriggerExit { .. } => (enters, exits + 1),
        PhysicsEvent::Collision(_) => (enters, exits),
    })
}

#[test]
fn enter_and_exit_fire_once() {
    let mut world = zero_gravity();
    let a = add_trigger_ball(&mut world, Vec3::new(-5.0, 0.0, 0.0));
    let b = add_trigger_ball(&mut world, Vec3::new(5.0, 0.0, 0.0));

    let world_counts = Rc::new(RefCell::new(Counts::default()));
    let body_counts = Rc::new(RefCell::new(Counts::default()));
    world.set_world_listener(Some(Box::new(Recorder(world_counts.clone()))));
    assert!(world.set_body_listener(b, Box::new(Recorder(body_counts.clone()))));

    let mut queued = Vec::new();
    for _ in 0..5 {
        world.step(DT);
        queued.extend(world.drain_events());
    }
    assert_eq!(count_trigger_events(&queued), (0, 0));

    world.set_position(a, Vec3::new(4.5, 0.0, 0.0));
    for _ in 0..30 {
        world.step(DT);
        queued.extend(world.drain_events());
    }
    assert_eq!(count_trigger_events(&queued), (1, 0));
    assert_eq!(world_counts.borrow().enters, vec![(a, b)]);
    assert_eq!(body_counts.borrow().enters, vec![(b, a)]);

    // overlap does not push trigger bodies apart
    assert_eq!(world.body(a).unwrap().position(), Vec3::new(4.5, 0.0, 0.0));
    assert_eq!(world.body(b).unwrap().position(), Vec3::new(5.0, 0.0, 0.0));
    assert_eq!(world_counts.borrow().collisions, 0);

    world.set_position(a, Vec3::new(-5.0, 0.0, 0.0));
    for _ in 0..5 {
        world.step(DT);
        queued.extend(world.drain_events());
    }
    assert_eq!(count_trigger_events(&queued), (1, 1));
    assert_eq!(world_counts.borrow().exits, vec![(a, b)]);
    assert_eq!(body_counts.borrow().exits, vec![(b, a)]);
}

#[test]
fn trigger_body_kind_overlaps_without_response() {
    let mut world = zero_gravity();
    let zone = world.add_body(Body::new(voxel_physics::BodyKind::Trigger));
    let shape = world.create_box(Vec3::splat(2.0));
    world.attach(zone, shape);

    let ball = world.add_body(
        Body::dynamic(1.0)
            .with_position(Vec3::new(-4.0, 0.0, 0.0))
            .with_linear_velocity(Vec3::new(6.0, 0.0, 0.0)),
    );
    let sphere = world.create_sphere(0.5);
    world.attach(ball, sphere);

    let mut events = Vec::new();
    for _ in 0..120 {
        world.step(DT);
        events.extend(world.drain_events());
    }
    assert_eq!(count_trigger_events(&events), (1, 1));
    // passes straight through
    let body = world.body(ball).unwrap();
    assert!((body.linear_velocity().x - 6.0).abs() < 0.2);
    assert!(body.position().x > 5.0);
}

#[test]
fn world_sized_trigger_sees_small_bodies() {
    let mut world = zero_gravity();
    let zone = world.add_body(Body::new(voxel_physics::BodyKind::Trigger));
    let shape = world.create_box(Vec3::splat(1.0e10));
    assert!(world.attach(zone, shape));

    let ball = world.add_body(Body::dynamic(1.0).with_position(Vec3::new(3.0, 0.0, 0.0)));
    let sphere = world.create_sphere(0.5);
    world.attach(ball, sphere);

    world.step(DT);
    let events = world.drain_events();
    assert_eq!(count_trigger_events(&events), (1, 0));
    assert_eq!(
        world.overlap_sphere(Vec3::new(3.0, 0.0, 0.0), 0.1, u32::MAX),
        vec![zone, ball]
    );
}

#[test]
fn removed_body_exits_next_step() {
    let mut world = zero_gravity();
    let a = add_trigger_ball(&mut world, Vec3::ZERO);
    let _b = add_trigger_ball(&mut world, Vec3::new(0.5, 0.0, 0.0));
    world.step(DT);
    assert_eq!(count_trigger_events(&world.drain_events()), (1, 0));

    assert!(world.remove_body(a).is_some());
    world.step(DT);
    assert_eq!(count_trigger_events(&world.drain_events()), (0, 1));
    world.step(DT);
    assert_eq!(count_trigger_events(&world.drain_events()), (0, 0));
}

#[test]
fn masked_layers_never_trigger() {
    let mut world = zero_gravity();
    let a = add_trigger_ball(&mut world, Vec3::ZERO);
    let b = add_trigger_ball(&mut world, Vec3::new(0.5, 0.0, 0.0));
    world.body_mut(a).unwrap().set_layer(2);
    world.body_mut(b).unwrap().set_layer(5);
    world.set_layer_collision(2, 5, false);

    for _ in 0..10 {
        world.step(DT);
    }
    assert_eq!(count_trigger_events(&world.drain_events()), (0, 0));
    assert!(world.contacts().is_empty());
}
