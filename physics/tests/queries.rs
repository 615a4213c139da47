use glam::{IVec3, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use voxel_physics::{
    narrowphase::{collide, NarrowContext, WorldShape},
    Body, BodyHandle, BodyKind, PhysicsConfig, PhysicsWorld, Shape, SparseVoxelGrid,
};

const DT: f32 = 1.0 / 60.0;
const ALL_LAYERS: u32 = u32::MAX;

struct Scene {
    world: PhysicsWorld,
    ground: BodyHandle,
    ball: BodyHandle,
}

fn scene() -> Scene {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    let ground = world.add_body(Body::new(BodyKind::Static).with_position(Vec3::new(0.0, 0.5, 0.0)));
    let shape = world.create_box(Vec3::new(5.0, 0.5, 5.0));
    world.attach(ground, shape);

    let ball = world.add_body(Body::new(BodyKind::Static).with_position(Vec3::new(0.0, 3.0, 0.0)));
    let shape = world.create_sphere(0.5);
    world.attach(ball, shape);
    Scene { world, ground, ball }
}

#[test]
fn raycast_is_repeatable() {
    let Scene { world, ball, .. } = scene();
    let first = world.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, 100.0, ALL_LAYERS);
    let second = world.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, 100.0, ALL_LAYERS);
    assert_eq!(first, second);

    let hit = first.unwrap();
    assert_eq!(hit.body, Some(ball));
    assert!((hit.distance - 6.5).abs() < 1e-4);
    assert!(hit.normal.abs_diff_eq(Vec3::Y, 1e-4));
    assert!(hit.point.abs_diff_eq(Vec3::new(0.0, 3.5, 0.0), 1e-4));
}

#[test]
fn raycast_all_is_sorted() {
    let Scene { world, ground, ball } = scene();
    let hits = world.raycast_all(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, 100.0, ALL_LAYERS);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].body, Some(ball));
    assert_eq!(hits[1].body, Some(ground));
    assert!((hits[1].distance - 9.0).abs() < 1e-4);
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    // too short to reach the ground
    let hits = world.raycast_all(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, 8.0, ALL_LAYERS);
    assert_eq!(hits.len(), 1);
}

#[test]
fn layer_mask_skips_bodies() {
    let Scene {
        mut world,
        ground,
        ball,
    } = scene();
    world.body_mut(ball).unwrap().set_layer(3);
    let hit = world
        .raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, 100.0, !(1 << 3))
        .unwrap();
    assert_eq!(hit.body, Some(ground));
    assert!(world
        .raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, 100.0, 0)
        .is_none());
}

#[test]
fn nearer_voxel_wins() {
    let Scene { mut world, .. } = scene();
    let mut grid = SparseVoxelGrid::new(1.0);
    grid.set_cell(IVec3::new(0, 5, 0), true);
    world.set_voxel_grid(Some(Box::new(grid)));

    let hit = world
        .raycast(Vec3::new(0.2, 10.0, 0.2), Vec3::NEG_Y, 100.0, ALL_LAYERS)
        .unwrap();
    assert_eq!(hit.body, None);
    assert_eq!(hit.voxel_cell, Some(IVec3::new(0, 5, 0)));
    assert!((hit.distance - 4.0).abs() < 1e-4);
    assert!(hit.normal.abs_diff_eq(Vec3::Y, 1e-4));

    // starting below the cell the ball is nearer again
    let hit = world
        .raycast(Vec3::new(0.2, 4.5, 0.2), Vec3::NEG_Y, 100.0, ALL_LAYERS)
        .unwrap();
    assert!(hit.body.is_some());
}

#[test]
fn degenerate_rays_miss() {
    let Scene { world, .. } = scene();
    assert!(world.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, 100.0, ALL_LAYERS).is_none());
    assert!(world.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, 0.0, ALL_LAYERS).is_none());
    assert!(world.raycast_all(Vec3::new(0.0, 10.0, 0.0), Vec3::Y, 100.0, ALL_LAYERS).is_empty());
}

#[test]
fn overlap_queries() {
    let Scene { world, ground, ball } = scene();
    assert_eq!(world.overlap_sphere(Vec3::new(0.0, 3.0, 0.0), 0.1, ALL_LAYERS), vec![ball]);
    assert_eq!(world.overlap_sphere(Vec3::new(0.0, 1.2, 0.0), 0.5, ALL_LAYERS), vec![ground]);
    assert!(world.overlap_sphere(Vec3::new(0.0, 2.0, 0.0), 0.2, ALL_LAYERS).is_empty());

    let both = world.overlap_box(
        Vec3::new(0.0, 2.0, 0.0),
        Vec3::new(1.0, 1.2, 1.0),
        glam::Quat::IDENTITY,
        ALL_LAYERS,
    );
    assert_eq!(both, vec![ground, ball]);

    let hits = world.overlap_capsule(Vec3::new(-3.0, 3.0, 0.0), Vec3::new(3.0, 3.0, 0.0), 0.2, ALL_LAYERS);
    assert_eq!(hits, vec![ball]);
    assert!(world
        .overlap_capsule(Vec3::new(-3.0, 3.0, 0.0), Vec3::new(3.0, 3.0, 0.0), 0.2, 0)
        .is_empty());
}

fn random_body(rng: &mut Pcg32, world: &mut PhysicsWorld) -> BodyHandle {
    let position = Vec3::new(
        rng.gen_range(-12.0..12.0),
        rng.gen_range(-12.0..12.0),
        rng.gen_range(-12.0..12.0),
    );
    let velocity = Vec3::new(
        rng.gen_range(-3.0..3.0),
        rng.gen_range(-3.0..3.0),
        rng.gen_range(-3.0..3.0),
    );
    let body = world.add_body(
        Body::dynamic(rng.gen_range(0.5..4.0))
            .with_position(position)
            .with_linear_velocity(velocity),
    );
    let collider = if rng.gen_bool(0.5) {
        world.create_sphere(rng.gen_range(0.25..1.5))
    } else {
        let half = Vec3::new(
            rng.gen_range(0.25..1.5),
            rng.gen_range(0.25..1.5),
            rng.gen_range(0.25..1.5),
        );
        world.create_box(half)
    };
    world.attach(body, collider);
    body
}

#[test]
fn grid_finds_every_overlapping_pair() {
    let mut rng = Pcg32::seed_from_u64(0x5eed);
    let mut world = PhysicsWorld::new(PhysicsConfig {
        gravity: Vec3::ZERO,
        cell_size: 4.0,
        ..Default::default()
    });
    let bodies: Vec<BodyHandle> = (0..80).map(|_| random_body(&mut rng, &mut world)).collect();

    let mut total = 0;
    for _ in 0..60 {
        let bounds: Vec<_> = bodies.iter().map(|&h| world.body_bounds(h).unwrap()).collect();
        let mut expected = 0;
        for i in 0..bounds.len() {
            for j in (i + 1)..bounds.len() {
                if bounds[i].intersects(&bounds[j]) {
                    expected += 1;
                }
            }
        }
        world.step(DT);
        assert_eq!(world.stats().narrow_phase_tests, expected);
        assert!(world.stats().broad_phase_pairs >= expected);
        total += expected;
    }
    // the scene is dense enough to exercise the narrow phase
    assert!(total > 0);
}

#[test]
fn contact_tests_are_symmetric() {
    let mut rng = Pcg32::seed_from_u64(42);
    let ctx = NarrowContext::default();
    let mut tested = 0;
    for _ in 0..500 {
        let first = if rng.gen_bool(0.5) {
            Shape::make_sphere(rng.gen_range(0.1..2.0))
        } else {
            Shape::make_box(Vec3::splat(rng.gen_range(0.1..2.0)))
        };
        let second = Shape::make_sphere(rng.gen_range(0.1..2.0));
        let pa = Vec3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
        let pb = Vec3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
        let a = WorldShape::new(&first, pa, glam::Quat::IDENTITY);
        let b = WorldShape::new(&second, pb, glam::Quat::IDENTITY);

        match (collide(&a, &b, &ctx), collide(&b, &a, &ctx)) {
            (Some(ab), Some(ba)) => {
                assert!((ab.penetration - ba.penetration).abs() < 1e-5);
                assert!(ab.normal.abs_diff_eq(-ba.normal, 1e-5));
                assert!(ab.penetration >= 0.0);
                tested += 1;
            }
            (None, None) => {}
            (ab, ba) => panic!("asymmetric result {:?} {:?}", ab, ba),
        }
    }
    assert!(tested > 0);
}
