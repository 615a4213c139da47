use glam::Vec3;
use voxel_physics::{Body, BodyHandle, BodyKind, PhysicsConfig, PhysicsWorld};

const DT: f32 = 1.0 / 60.0;

fn add_static_box(world: &mut PhysicsWorld, centre: Vec3, half_extents: Vec3) -> BodyHandle {
    let body = world.add_body(Body::new(BodyKind::Static).with_position(centre));
    let shape = world.create_box(half_extents);
    world.attach(body, shape);
    body
}

fn grounded_character() -> (PhysicsWorld, BodyHandle) {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    add_static_box(&mut world, Vec3::new(0.0, 0.5, 0.0), Vec3::new(20.0, 0.5, 20.0));
    let character = world.create_character(Vec3::new(0.0, 2.5, 0.0), 2.0, 0.5);
    for _ in 0..60 {
        world.step(DT);
    }
    (world, character)
}

fn run(world: &mut PhysicsWorld, steps: usize) {
    for _ in 0..steps {
        world.step(DT);
    }
}

#[test]
fn character_lands_and_stays_upright() {
    let (world, character) = grounded_character();
    let body = world.body(character).unwrap();
    assert!(body.movement().unwrap().state.grounded);
    assert!((body.position().y - 2.0).abs() < 0.05, "rest height {}", body.position().y);
    assert!(body.orientation().abs_diff_eq(glam::Quat::IDENTITY, 1e-5));
    // movement bodies stay awake
    assert!(!body.is_sleeping());
}

#[test]
fn jump_reaches_configured_height() {
    let (mut world, character) = grounded_character();
    let rest_y = world.body(character).unwrap().position().y;
    assert!(world.jump(character));

    let mut apex = rest_y;
    for _ in 0..120 {
        world.step(DT);
        apex = apex.max(world.body(character).unwrap().position().y);
    }
    let height = apex - rest_y;
    assert!((height - 2.0).abs() < 0.15, "jump height {}", height);

    // landed again
    let body = world.body(character).unwrap();
    assert!(body.movement().unwrap().state.grounded);
    assert!(!body.movement().unwrap().state.jumping);
}

#[test]
fn cannot_jump_in_mid_air() {
    let (mut world, character) = grounded_character();
    assert!(world.jump(character));
    run(&mut world, 20);
    assert!(!world.jump(character));
}

#[test]
fn released_jump_is_lower() {
    let (mut world, character) = grounded_character();
    let rest_y = world.body(character).unwrap().position().y;
    world.jump(character);
    world.step(DT);
    world.jump_released(character);

    let mut apex = rest_y;
    for _ in 0..120 {
        world.step(DT);
        apex = apex.max(world.body(character).unwrap().position().y);
    }
    let height = apex - rest_y;
    assert!(height > 0.8 && height < 1.5, "released jump height {}", height);
}

#[test]
fn runs_up_to_speed_and_stops() {
    let (mut world, character) = grounded_character();
    assert!(world.move_input(character, Vec3::X, 1.0));
    run(&mut world, 60);
    let speed = world.body(character).unwrap().linear_velocity().x;
    assert!(speed >= 4.5 && speed <= 5.0 + 1e-4, "run speed {}", speed);

    world.move_input(character, Vec3::ZERO, 0.0);
    run(&mut world, 60);
    let speed = world.body(character).unwrap().linear_velocity().x;
    assert!(speed.abs() < 1e-3, "speed after stopping {}", speed);
}

#[test]
fn dash_overrides_velocity_briefly() {
    let (mut world, character) = grounded_character();
    assert!(world.dash(character, Vec3::Z));
    world.step(DT);
    let velocity = world.body(character).unwrap().linear_velocity();
    assert!((velocity.z - 10.0).abs() < 0.01);

    run(&mut world, 30);
    let body = world.body(character).unwrap();
    assert!(!body.movement().unwrap().state.dashing);
    assert!(body.linear_velocity().z < 10.0);
    // still cooling down
    assert!(!world.dash(character, Vec3::Z));
}

#[test]
fn slides_down_walls_and_jumps_off() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    add_static_box(&mut world, Vec3::new(1.3, 5.0, 0.0), Vec3::new(0.5, 5.0, 2.0));
    let character = world.create_character(Vec3::new(0.0, 6.0, 0.0), 2.0, 0.5);
    // face the wall, then let go so nothing presses into it
    world.move_input(character, Vec3::X, 1.0);
    world.step(DT);
    world.move_input(character, Vec3::ZERO, 0.0);
    run(&mut world, 30);

    let state = world.body(character).unwrap().movement().unwrap().state;
    assert!(state.touching_wall);
    assert!(state.wall_sliding);

    assert!(world.wall_jump(character));
    let body = world.body(character).unwrap();
    let velocity = body.linear_velocity();
    assert!(velocity.x < 0.0);
    assert!(velocity.y > 6.0);
    assert!(body.movement().unwrap().state.facing.abs_diff_eq(Vec3::NEG_X, 1e-5));
}

#[test]
fn grabs_and_climbs_ledges() {
    let mut world = PhysicsWorld::new(PhysicsConfig {
        gravity: Vec3::ZERO,
        ..Default::default()
    });
    add_static_box(&mut world, Vec3::new(1.3, 2.5, 0.0), Vec3::new(0.5, 2.5, 2.0));
    let character = world.create_character(Vec3::new(0.0, 4.0, 0.0), 2.0, 0.5);
    world.move_input(character, Vec3::X, 1.0);
    world.step(DT);
    world.move_input(character, Vec3::ZERO, 0.0);
    world.step(DT);

    let ledge = world
        .body(character)
        .unwrap()
        .movement()
        .unwrap()
        .state
        .ledge_point
        .expect("ledge in reach");
    assert!((ledge.y - 5.0).abs() < 1e-3);

    assert!(world.grab_ledge(character));
    run(&mut world, 5);
    let before = world.body(character).unwrap().position();
    assert_eq!(world.body(character).unwrap().linear_velocity(), Vec3::ZERO);

    assert!(world.climb_ledge(character));
    let after = world.body(character).unwrap().position();
    assert!(after.abs_diff_eq(before + Vec3::new(0.5, 1.0, 0.0), 1e-4));
    assert!(!world.body(character).unwrap().movement().unwrap().state.ledge_grabbing);
    assert!(!world.climb_ledge(character));
}
