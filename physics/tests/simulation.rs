use glam::{IVec3, Vec3};
use voxel_physics::{
    Body, BodyHandle, BodyKind, PhysicsConfig, PhysicsEvent, PhysicsWorld, SparseVoxelGrid,
};

const DT: f32 = 1.0 / 60.0;

fn add_ground(world: &mut PhysicsWorld) -> BodyHandle {
    let ground = world.add_body(Body::new(BodyKind::Static).with_position(Vec3::new(0.0, 0.5, 0.0)));
    let shape = world.create_box(Vec3::new(5.0, 0.5, 5.0));
    assert!(world.attach(ground, shape));
    ground
}

fn add_ball(world: &mut PhysicsWorld, position: Vec3, radius: f32) -> BodyHandle {
    let ball = world.add_body(Body::dynamic(1.0).with_position(position));
    let shape = world.create_sphere(radius);
    assert!(world.attach(ball, shape));
    ball
}

#[test]
fn sphere_settles_on_static_box() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    add_ground(&mut world);
    let ball = add_ball(&mut world, Vec3::new(0.0, 10.0, 0.0), 0.5);

    let mut penetrations = Vec::new();
    for _ in 0..600 {
        world.step(DT);
        if let Some(contact) = world.contacts().iter().find(|c| c.involves(ball)) {
            penetrations.push(contact.penetration);
        }
    }

    assert!(!penetrations.is_empty());
    for pair in penetrations.windows(2) {
        assert!(
            pair[1] <= pair[0] + 1e-5,
            "penetration grew from {} to {}",
            pair[0],
            pair[1]
        );
    }

    let slop = world.config().solver.slop;
    let last = penetrations[penetrations.len() - 1];
    assert!(last <= slop + 1e-3, "resting penetration {}", last);

    let body = world.body(ball).unwrap();
    assert!((body.position().y - 1.5).abs() <= slop + 1e-3, "rest height {}", body.position().y);
    assert!(body.linear_velocity().y.abs() < 1e-2);
    assert!(body.is_sleeping());
}

#[test]
fn sphere_settles_on_voxel_floor() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    let mut grid = SparseVoxelGrid::new(1.0);
    grid.fill(IVec3::new(-5, -1, -5), IVec3::new(5, -1, 5));
    world.set_voxel_grid(Some(Box::new(grid)));

    let ball = add_ball(&mut world, Vec3::new(0.5, 3.0, 0.5), 0.5);
    let mut saw_voxel_event = false;
    for _ in 0..300 {
        world.step(DT);
        saw_voxel_event |= world.drain_events().iter().any(|event| {
            matches!(event, PhysicsEvent::Collision(info) if info.voxel_cell == Some(IVec3::new(0, -1, 0)))
        });
    }

    assert!(saw_voxel_event);
    let body = world.body(ball).unwrap();
    let slop = world.config().solver.slop;
    assert!((body.position().y - 0.5).abs() <= slop + 1e-3, "rest height {}", body.position().y);
}

#[test]
fn resting_body_sleeps_and_impulse_wakes() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    let ball = world.add_body(Body::dynamic(1.0).with_gravity(false));
    let shape = world.create_sphere(0.5);
    world.attach(ball, shape);

    for _ in 0..40 {
        world.step(DT);
    }
    assert!(world.body(ball).unwrap().is_sleeping());

    assert!(world.apply_impulse(ball, Vec3::X));
    let body = world.body(ball).unwrap();
    assert!(!body.is_sleeping());
    assert_eq!(body.linear_velocity(), Vec3::X);
}

#[test]
fn new_contact_wakes_sleeping_body() {
    let mut world = PhysicsWorld::new(PhysicsConfig {
        gravity: Vec3::ZERO,
        ..Default::default()
    });
    let sleeper = add_ball(&mut world, Vec3::ZERO, 0.5);
    let other = add_ball(&mut world, Vec3::new(5.0, 0.0, 0.0), 0.5);
    for _ in 0..40 {
        world.step(DT);
    }
    assert!(world.body(sleeper).unwrap().is_sleeping());

    world.set_position(other, Vec3::new(0.8, 0.0, 0.0));
    world.step(DT);
    let body = world.body(sleeper).unwrap();
    assert!(!body.is_sleeping());
    assert!(body.position().x < 0.0);
}

#[test]
fn static_bodies_never_move() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    let ground = add_ground(&mut world);
    add_ball(&mut world, Vec3::new(0.0, 1.4, 0.0), 0.5);
    world.apply_impulse(ground, Vec3::Y * 100.0);
    for _ in 0..60 {
        world.step(DT);
    }
    let body = world.body(ground).unwrap();
    assert_eq!(body.position(), Vec3::new(0.0, 0.5, 0.0));
    assert_eq!(body.linear_velocity(), Vec3::ZERO);
}

#[test]
fn update_runs_whole_fixed_steps() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    let ball = add_ball(&mut world, Vec3::new(0.0, 50.0, 0.0), 0.5);
    let steps = world.update(0.5);
    assert!(steps == 8, "steps {}", steps);
    assert_eq!(world.step_num(), 8);
    assert!(world.body(ball).unwrap().linear_velocity().y < 0.0);

    world.set_time_scale(0.5);
    let steps = world.update(4.0 / 60.0);
    assert!((1..=2).contains(&steps), "steps {}", steps);
}

#[test]
fn kinematic_platform_carries_velocity_into_contacts() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    let platform = world.add_body(Body::new(BodyKind::Kinematic));
    let shape = world.create_box(Vec3::new(2.0, 0.25, 2.0));
    world.attach(platform, shape);
    let ball = add_ball(&mut world, Vec3::new(0.0, 0.74, 0.0), 0.5);

    let mut y = 0.0;
    for _ in 0..30 {
        y += 0.02;
        world.move_kinematic(platform, Vec3::new(0.0, y, 0.0), glam::Quat::IDENTITY);
        world.step(DT);
    }
    let platform_y = world.body(platform).unwrap().position().y;
    assert!((platform_y - y).abs() < 1e-4);
    // the ball rides on top instead of sinking through
    let ball_y = world.body(ball).unwrap().position().y;
    assert!(ball_y > platform_y + 0.6, "ball {} platform {}", ball_y, platform_y);
}

#[test]
fn box_slides_across_voxel_seams() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    let mut grid = SparseVoxelGrid::new(1.0);
    grid.fill(IVec3::new(-2, -1, -4), IVec3::new(12, -1, 4));
    world.set_voxel_grid(Some(Box::new(grid)));

    let mut body = Body::dynamic(1.0)
        .with_position(Vec3::new(0.3, 0.5, 0.3))
        .with_linear_velocity(Vec3::new(4.0, 0.0, 0.0));
    body.lock_angular = glam::BVec3::TRUE;
    let block = world.add_body(body);
    let shape = world.create_box(Vec3::splat(0.5));
    world.attach(block, shape);

    let mut voxel_contacts = 0;
    for _ in 0..120 {
        world.step(DT);
        for event in world.drain_events() {
            if let PhysicsEvent::Collision(info) = event {
                if info.is_voxel() {
                    voxel_contacts += 1;
                    assert!(
                        info.normal.abs_diff_eq(Vec3::NEG_Y, 1e-4),
                        "cell {:?} normal {:?}",
                        info.voxel_cell,
                        info.normal
                    );
                }
            }
        }
    }

    assert!(voxel_contacts > 0);
    let body = world.body(block).unwrap();
    assert!(body.position().x > 1.5, "slid to {}", body.position().x);
    assert!((body.position().z - 0.3).abs() < 1e-3);
    assert!(body.linear_velocity().z.abs() < 1e-3);
}
