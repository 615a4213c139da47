use glam::{IVec3, Vec3};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use voxel_physics::{
    Body, BodyHandle, BodyKind, CollisionInfo, ConfigError, PhysicsConfig, PhysicsWorld,
    SparseVoxelGrid, WorldListener,
};

const FRAME_SECS: f32 = 1.0 / 60.0;
const NUM_FRAMES: u32 = 600;
const REPORT_EVERY: u32 = 60;

struct EventLog;

impl WorldListener for EventLog {
    fn on_collision(&mut self, info: &CollisionInfo) {
        if let Some(cell) = info.voxel_cell {
            debug!(body = ?info.body_a, ?cell, depth = info.penetration, "voxel contact");
        }
    }

    fn on_trigger_enter(&mut self, a: BodyHandle, b: BodyHandle) {
        info!(?a, ?b, "trigger enter");
    }

    fn on_trigger_exit(&mut self, a: BodyHandle, b: BodyHandle) {
        info!(?a, ?b, "trigger exit");
    }
}

struct Sandbox {
    world: PhysicsWorld,
    character: BodyHandle,
    tracked: Vec<(&'static str, BodyHandle)>,
}

fn load_config() -> Result<PhysicsConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!(%path, "loading physics config");
            PhysicsConfig::load(path)
        }
        None => Ok(PhysicsConfig::default()),
    }
}

fn build_sandbox(config: PhysicsConfig) -> Sandbox {
    let mut world = PhysicsWorld::new(config);
    world.set_world_listener(Some(Box::new(EventLog)));
    world.set_layer_name(0, "world");
    world.set_layer_name(1, "props");
    world.set_layer_name(2, "player");

    // voxel terrain to the east of the slab
    let mut grid = SparseVoxelGrid::new(1.0);
    grid.fill(IVec3::new(10, -1, -10), IVec3::new(30, -1, 10));
    grid.fill(IVec3::new(18, 0, -10), IVec3::new(30, 1, 10));
    world.set_voxel_grid(Some(Box::new(grid)));

    let ground = world.add_body(Body::new(BodyKind::Static).with_position(Vec3::new(0.0, -0.5, 0.0)));
    let slab = world.create_box(Vec3::new(10.0, 0.5, 10.0));
    world.attach(ground, slab);

    let mut tracked = Vec::new();
    for i in 0..4 {
        let x = -6.0 + i as f32 * 3.0;
        let ball = world.add_body(
            Body::dynamic(1.0)
                .with_position(Vec3::new(x, 4.0 + i as f32, -3.0))
                .with_layer(1),
        );
        let sphere = world.create_sphere(0.5);
        world.attach(ball, sphere);
        tracked.push(("ball", ball));

        let crate_body = world.add_body(
            Body::dynamic(2.0)
                .with_position(Vec3::new(x, 6.0 + i as f32, 3.0))
                .with_layer(1),
        );
        let cube = world.create_box(Vec3::splat(0.5));
        world.attach(crate_body, cube);
        tracked.push(("crate", crate_body));
    }

    // rolls east onto the voxel terrain
    let roller = world.add_body(
        Body::dynamic(1.0)
            .with_position(Vec3::new(9.0, 1.0, 0.0))
            .with_linear_velocity(Vec3::new(4.0, 0.0, 0.0))
            .with_layer(1),
    );
    let sphere = world.create_sphere(0.5);
    world.attach(roller, sphere);
    tracked.push(("roller", roller));

    let zone = world.add_body(Body::new(BodyKind::Trigger).with_position(Vec3::new(4.0, 1.0, 0.0)));
    let volume = world.create_box(Vec3::new(1.0, 1.0, 2.0));
    world.attach(zone, volume);

    let character = world.create_character(Vec3::new(-4.0, 1.5, 0.0), 2.0, 0.5);
    if let Some(body) = world.body_mut(character) {
        body.set_layer(2);
    }
    tracked.push(("character", character));

    info!(
        bodies = world.body_count(),
        colliders = world.collider_count(),
        "sandbox ready"
    );
    Sandbox {
        world,
        character,
        tracked,
    }
}

/// Scripted stand-in for player input.
fn drive_character(sandbox: &mut Sandbox, frame: u32) {
    let world = &mut sandbox.world;
    let character = sandbox.character;
    match frame {
        30 => {
            world.move_input(character, Vec3::X, 1.0);
        }
        90 | 240 => {
            if !world.jump(character) {
                debug!(frame, "jump not allowed");
            }
        }
        105 => {
            world.jump_released(character);
        }
        180 => {
            world.dash(character, Vec3::X);
        }
        300 => {
            world.move_input(character, Vec3::ZERO, 0.0);
        }
        _ => {}
    }
}

fn report(sandbox: &Sandbox, frame: u32) {
    let world = &sandbox.world;
    let stats = world.stats();
    info!(
        frame,
        step = world.step_num(),
        broad = stats.broad_phase_pairs,
        narrow = stats.narrow_phase_tests,
        contacts = stats.active_contacts,
        voxel = stats.voxel_contacts,
        "physics stats"
    );
    for &(name, handle) in &sandbox.tracked {
        if let Some(body) = world.body(handle) {
            debug!(
                name,
                ?handle,
                position = ?body.position(),
                velocity = ?body.linear_velocity(),
                sleeping = body.is_sleeping(),
                "body"
            );
        }
    }
    if let Some(movement) = world.body(sandbox.character).and_then(|b| b.movement()) {
        let state = &movement.state;
        debug!(
            grounded = state.grounded,
            jumping = state.jumping,
            dashing = state.dashing,
            wall_sliding = state.wall_sliding,
            "character"
        );
    }
}

fn main() -> Result<(), ConfigError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let mut sandbox = build_sandbox(config);

    for frame in 0..NUM_FRAMES {
        drive_character(&mut sandbox, frame);
        let steps = sandbox.world.update(FRAME_SECS);
        if steps == 0 {
            debug!(frame, "frame took no physics steps");
        }
        if (frame + 1) % REPORT_EVERY == 0 {
            report(&sandbox, frame + 1);
        }
    }

    let sleeping = sandbox
        .world
        .bodies()
        .filter(|(_, body)| body.is_sleeping())
        .count();
    info!(steps = sandbox.world.step_num(), sleeping, "sandbox finished");
    Ok(())
}
