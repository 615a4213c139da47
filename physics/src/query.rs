use crate::{
    body::BodyHandle,
    bounds::Bounds,
    collider::ColliderHandle,
    movement::MovementSensors,
    narrowphase::{collide, NarrowContext, WorldShape},
    shapes::{Shape, ShapeKind},
    voxel::{cells_in_bounds, raycast_voxels, VoxelGrid},
    world::PhysicsWorld,
};
use glam::{IVec3, Quat, Vec3};
use std::cmp::Ordering;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    /// `None` when the ray hit the voxel world.
    pub body: Option<BodyHandle>,
    pub collider: Option<ColliderHandle>,
    pub voxel_cell: Option<IVec3>,
}

pub fn ray_sphere_intersect(
    ray_start: Vec3,
    ray_dir: Vec3,
    sphere_centre: Vec3,
    sphere_radius: f32,
) -> Option<(f32, f32)> {
    let m = sphere_centre - ray_start;
    let a = ray_dir.dot(ray_dir);
    let b = m.dot(ray_dir);
    let c = m.dot(m) - sphere_radius * sphere_radius;

    let b2 = b * b;
    let delta = b2 - (a * c);

    if delta < 0.0 || a <= 0.0 {
        None
    } else {
        let inv_a = 1.0 / a;
        let delta_root = delta.sqrt();
        let t1 = inv_a * (b - delta_root);
        let t2 = inv_a * (b + delta_root);
        Some((t1, t2))
    }
}

/// Entry distance of the interval, or the exit when the ray starts inside.
fn first_surface((t_enter, t_exit): (f32, f32)) -> Option<f32> {
    if t_enter >= 0.0 {
        Some(t_enter)
    } else if t_exit >= 0.0 {
        Some(t_exit)
    } else {
        None
    }
}

fn box_face_normal(local_point: Vec3, half_extents: Vec3) -> Vec3 {
    let ratio = local_point.abs() / half_extents.max(Vec3::splat(f32::EPSILON));
    let mut normal = Vec3::ZERO;
    let axis = if ratio.x >= ratio.y && ratio.x >= ratio.z {
        0
    } else if ratio.y >= ratio.z {
        1
    } else {
        2
    };
    normal[axis] = local_point[axis].signum();
    normal
}

fn ray_local_box(origin: Vec3, dir: Vec3, half_extents: Vec3) -> Option<(f32, Vec3)> {
    let bounds = Bounds::from_center_half_extents(Vec3::ZERO, half_extents);
    let t = first_surface(bounds.ray_intersection(origin, dir)?)?;
    Some((t, box_face_normal(origin + dir * t, half_extents)))
}

fn ray_local_capsule(origin: Vec3, dir: Vec3, radius: f32, half_segment: f32) -> Option<(f32, Vec3)> {
    let top = Vec3::Y * half_segment;
    let mut interval: Option<(f32, f32)> = None;
    let mut merge = |span: (f32, f32)| {
        interval = Some(match interval {
            Some((lo, hi)) => (lo.min(span.0), hi.max(span.1)),
            None => span,
        });
    };

    if let Some(span) = ray_sphere_intersect(origin, dir, top, radius) {
        merge(span);
    }
    if let Some(span) = ray_sphere_intersect(origin, dir, -top, radius) {
        merge(span);
    }

    // the cylinder between the caps is the radial span clipped to the segment
    let radial_origin = Vec3::new(origin.x, 0.0, origin.z);
    let radial_dir = Vec3::new(dir.x, 0.0, dir.z);
    let radial = if radial_dir.length_squared() > 1e-12 {
        ray_sphere_intersect(radial_origin, radial_dir, Vec3::ZERO, radius)
    } else if radial_origin.length_squared() <= radius * radius {
        Some((f32::NEG_INFINITY, f32::INFINITY))
    } else {
        None
    };
    if let Some((r0, r1)) = radial {
        let slab = Bounds {
            mins: Vec3::new(f32::MIN, -half_segment, f32::MIN),
            maxs: Vec3::new(f32::MAX, half_segment, f32::MAX),
        };
        if let Some((s0, s1)) = slab.ray_intersection(origin, dir) {
            let lo = r0.max(s0);
            let hi = r1.min(s1);
            if lo <= hi {
                merge((lo, hi));
            }
        }
    }

    let t = first_surface(interval?)?;
    let point = origin + dir * t;
    let axis_point = Vec3::Y * point.y.clamp(-half_segment, half_segment);
    let normal = (point - axis_point).try_normalize().unwrap_or(-dir);
    Some((t, normal))
}

/// Nearest active voxel cell inside the region.
fn ray_voxel_region(
    origin: Vec3,
    dir: Vec3,
    region: &Bounds,
    grid: &dyn VoxelGrid,
) -> Option<(f32, Vec3)> {
    region.ray_intersection(origin, dir)?;
    let (min, max) = cells_in_bounds(grid, region);
    let half = Vec3::splat(grid.cell_spacing() * 0.5);
    let mut best: Option<(f32, Vec3)> = None;
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                let cell = IVec3::new(x, y, z);
                if !grid.is_cell_active(cell) {
                    continue;
                }
                let centre = grid.cell_to_world(cell);
                if let Some((t, normal)) = ray_local_box(origin - centre, dir, half) {
                    if best.map_or(true, |(best_t, _)| t < best_t) {
                        best = Some((t, normal));
                    }
                }
            }
        }
    }
    best
}

/// Distance and world normal where a unit-direction ray first meets the
/// shape. A ray starting inside reports where it leaves.
pub fn ray_shape(
    shape: &WorldShape,
    origin: Vec3,
    dir: Vec3,
    max_distance: f32,
    ctx: &NarrowContext,
) -> Option<(f32, Vec3)> {
    let inv_orientation = shape.orientation.conjugate();
    let local_origin = inv_orientation * (origin - shape.position);
    let local_dir = inv_orientation * dir;

    let (t, normal) = match *shape.shape {
        Shape::Sphere(sphere) => {
            let span = ray_sphere_intersect(origin, dir, shape.position, sphere.radius)?;
            let t = first_surface(span)?;
            let normal = (origin + dir * t - shape.position)
                .try_normalize()
                .unwrap_or(-dir);
            (t, normal)
        }
        Shape::Box(shape_box) => {
            let (t, local_normal) = ray_local_box(local_origin, local_dir, shape_box.half_extents)?;
            (t, shape.orientation * local_normal)
        }
        Shape::Capsule(capsule) => {
            let (t, local_normal) = ray_local_capsule(
                local_origin,
                local_dir,
                capsule.radius,
                capsule.half_segment(),
            )?;
            (t, shape.orientation * local_normal)
        }
        Shape::VoxelRegion(_) => ray_voxel_region(origin, dir, &shape.bounds(), ctx.voxels?)?,
    };
    if t <= max_distance {
        Some((t, normal))
    } else {
        None
    }
}

fn by_distance(a: &RaycastHit, b: &RaycastHit) -> Ordering {
    a.distance.total_cmp(&b.distance)
}

#[derive(Copy, Clone)]
struct RayFilter {
    layer_mask: u32,
    exclude: Option<BodyHandle>,
    include_triggers: bool,
}

impl PhysicsWorld {
    /// Nearest hit among bodies on layers in `layer_mask` and the voxel world.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<RaycastHit> {
        let filter = RayFilter {
            layer_mask,
            exclude: None,
            include_triggers: true,
        };
        self.raycast_filtered(origin, direction, max_distance, filter)
    }

    /// Every collider hit plus the first voxel hit, nearest first.
    pub fn raycast_all(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layer_mask: u32,
    ) -> Vec<RaycastHit> {
        let mut hits = Vec::new();
        let dir = match ray_setup(direction, max_distance) {
            Some(dir) => dir,
            None => return hits,
        };
        let filter = RayFilter {
            layer_mask,
            exclude: None,
            include_triggers: true,
        };
        self.collect_body_hits(origin, dir, max_distance, filter, |hit| hits.push(hit));
        if let Some(hit) = self.voxel_hit(origin, dir, max_distance) {
            hits.push(hit);
        }
        hits.sort_by(by_distance);
        hits
    }

    fn raycast_filtered(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: RayFilter,
    ) -> Option<RaycastHit> {
        let dir = ray_setup(direction, max_distance)?;
        let mut nearest: Option<RaycastHit> = None;
        self.collect_body_hits(origin, dir, max_distance, filter, |hit| {
            if nearest.map_or(true, |n| hit.distance < n.distance) {
                nearest = Some(hit);
            }
        });
        if let Some(hit) = self.voxel_hit(origin, dir, max_distance) {
            if nearest.map_or(true, |n| hit.distance < n.distance) {
                nearest = Some(hit);
            }
        }
        nearest
    }

    fn collect_body_hits(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        filter: RayFilter,
        mut on_hit: impl FnMut(RaycastHit),
    ) {
        let ctx = NarrowContext {
            voxels: self.voxels.as_deref(),
        };
        for handle in self.grid.query_ray(origin, dir, max_distance) {
            if Some(handle) == filter.exclude {
                continue;
            }
            let body = match self.bodies.get(handle) {
                Some(body) if in_mask(filter.layer_mask, body.layer()) => body,
                _ => continue,
            };
            for &ch in body.colliders() {
                let collider = match self.colliders.get(ch) {
                    Some(c) if filter.include_triggers || !(c.is_trigger || body.is_trigger()) => c,
                    _ => continue,
                };
                let (position, orientation) = collider.world_transform(body.position, body.orientation);
                let shape = WorldShape::new(&collider.shape, position, orientation);
                if let Some((distance, normal)) = ray_shape(&shape, origin, dir, max_distance, &ctx) {
                    on_hit(RaycastHit {
                        point: origin + dir * distance,
                        normal,
                        distance,
                        body: Some(handle),
                        collider: Some(ch),
                        voxel_cell: None,
                    });
                }
            }
        }
    }

    fn voxel_hit(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<RaycastHit> {
        let grid = self.voxels.as_deref()?;
        let hit = raycast_voxels(grid, origin, dir, max_distance)?;
        Some(RaycastHit {
            point: hit.point,
            normal: hit.normal,
            distance: hit.distance,
            body: None,
            collider: None,
            voxel_cell: Some(hit.cell),
        })
    }

    pub fn overlap_sphere(&self, centre: Vec3, radius: f32, layer_mask: u32) -> Vec<BodyHandle> {
        let shape = Shape::make_sphere(radius);
        self.overlap_shape(&WorldShape::new(&shape, centre, Quat::IDENTITY), layer_mask)
    }

    pub fn overlap_box(
        &self,
        centre: Vec3,
        half_extents: Vec3,
        orientation: Quat,
        layer_mask: u32,
    ) -> Vec<BodyHandle> {
        let shape = Shape::make_box(half_extents);
        self.overlap_shape(&WorldShape::new(&shape, centre, orientation), layer_mask)
    }

    /// Capsule from `start` to `end` with rounded ends of `radius`.
    pub fn overlap_capsule(&self, start: Vec3, end: Vec3, radius: f32, layer_mask: u32) -> Vec<BodyHandle> {
        let axis = end - start;
        let length = axis.length();
        let orientation = match axis.try_normalize() {
            Some(dir) => Quat::from_rotation_arc(Vec3::Y, dir),
            None => Quat::IDENTITY,
        };
        let shape = Shape::make_capsule(radius, length + 2.0 * radius);
        let centre = (start + end) * 0.5;
        self.overlap_shape(&WorldShape::new(&shape, centre, orientation), layer_mask)
    }

    /// Bodies with at least one collider touching `query`, in handle order.
    pub fn overlap_shape(&self, query: &WorldShape, layer_mask: u32) -> Vec<BodyHandle> {
        let bounds = query.bounds();
        if !bounds.is_valid() || query.kind() == ShapeKind::VoxelRegion {
            return Vec::new();
        }
        let ctx = NarrowContext {
            voxels: self.voxels.as_deref(),
        };
        self.grid
            .query_bounds(&bounds)
            .into_iter()
            .filter(|handle| {
                let body = match self.bodies.get(*handle) {
                    Some(body) if in_mask(layer_mask, body.layer()) => body,
                    _ => return false,
                };
                body.colliders().iter().any(|ch| {
                    self.colliders.get(*ch).map_or(false, |collider| {
                        let (position, orientation) =
                            collider.world_transform(body.position, body.orientation);
                        let shape = WorldShape::new(&collider.shape, position, orientation);
                        shape.bounds().intersects(&bounds) && collide(query, &shape, &ctx).is_some()
                    })
                })
            })
            .collect()
    }

    /// Ground, wall and ledge probes for a movement body. Probes ignore the
    /// body itself and triggers.
    pub(crate) fn movement_sensors(&self, handle: BodyHandle) -> MovementSensors {
        let mut sensors = MovementSensors::default();
        let (body, bounds) = match (self.bodies.get(handle), self.body_bounds(handle)) {
            (Some(body), Some(bounds)) => (body, bounds),
            _ => return sensors,
        };
        let movement = match body.movement() {
            Some(movement) => movement,
            None => return sensors,
        };
        let params = movement.params;
        let filter = RayFilter {
            layer_mask: body.collision_mask,
            exclude: Some(handle),
            include_triggers: false,
        };
        let centre = bounds.center();
        let half = bounds.half_extents();

        sensors.grounded = self
            .raycast_filtered(centre, Vec3::NEG_Y, half.y + params.ground_check_distance, filter)
            .is_some();

        let facing = movement.state.facing;
        let reach = half.x.max(half.z) + params.wall_check_distance;
        let wall = self.raycast_filtered(centre, facing, reach, filter);
        sensors.wall_normal = wall.map(|hit| hit.normal);

        if wall.is_some() {
            let chest = centre + Vec3::Y * (half.y * 0.5);
            let head = Vec3::new(centre.x, bounds.maxs.y + 0.05, centre.z);
            let chest_hit = self.raycast_filtered(chest, facing, reach, filter);
            let head_clear = self.raycast_filtered(head, facing, reach, filter).is_none();
            if let (Some(chest_hit), true) = (chest_hit, head_clear) {
                // look down onto the top of the wall just past its face
                let above = head + facing * (chest_hit.distance + 0.1);
                sensors.ledge_point = self
                    .raycast_filtered(above, Vec3::NEG_Y, head.y - chest.y, filter)
                    .map(|hit| hit.point);
            }
        }
        sensors
    }
}

fn in_mask(layer_mask: u32, layer: u32) -> bool {
    layer < 32 && layer_mask & (1 << layer) != 0
}

fn ray_setup(direction: Vec3, max_distance: f32) -> Option<Vec3> {
    if max_distance.is_nan() || max_distance <= 0.0 {
        return None;
    }
    direction.try_normalize()
}
