//! Exact shape against shape tests.
//!
//! Every contact normal points from the first shape toward the second, so
//! moving the second shape along the normal by the penetration separates them.

use crate::{
    bounds::Bounds,
    shapes::{Shape, ShapeKind},
    voxel::{cells_in_bounds, VoxelGrid},
};
use glam::{IVec3, Quat, Vec3};

/// A shape placed in the world.
#[derive(Copy, Clone, Debug)]
pub struct WorldShape<'a> {
    pub shape: &'a Shape,
    pub position: Vec3,
    pub orientation: Quat,
}

impl<'a> WorldShape<'a> {
    pub fn new(shape: &'a Shape, position: Vec3, orientation: Quat) -> Self {
        Self {
            shape,
            position,
            orientation,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn bounds(&self) -> Bounds {
        self.shape.bounds(self.position, self.orientation)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeContact {
    pub point: Vec3,
    /// Unit normal from the first shape toward the second.
    pub normal: Vec3,
    pub penetration: f32,
}

impl ShapeContact {
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Outside collaborators a test may consult.
#[derive(Copy, Clone, Default)]
pub struct NarrowContext<'a> {
    pub voxels: Option<&'a dyn VoxelGrid>,
}

type ContactTest = fn(&WorldShape, &WorldShape, &NarrowContext) -> Option<ShapeContact>;

const KINDS: usize = ShapeKind::COUNT;

// upper triangle only, indexed by canonical kind order
static DISPATCH: [[Option<ContactTest>; KINDS]; KINDS] = [
    [
        Some(sphere_sphere as ContactTest),
        Some(sphere_box as ContactTest),
        Some(sphere_capsule as ContactTest),
        Some(shape_voxel_region as ContactTest),
    ],
    [
        None,
        Some(box_box as ContactTest),
        Some(box_capsule as ContactTest),
        Some(shape_voxel_region as ContactTest),
    ],
    [
        None,
        None,
        Some(capsule_capsule as ContactTest),
        Some(shape_voxel_region as ContactTest),
    ],
    [None, None, None, Some(voxel_region_voxel_region as ContactTest)],
];

/// Tests `a` against `b`, swapping into canonical order when needed.
pub fn collide(a: &WorldShape, b: &WorldShape, ctx: &NarrowContext) -> Option<ShapeContact> {
    let ka = a.kind().index();
    let kb = b.kind().index();
    if ka <= kb {
        let test = DISPATCH[ka][kb]?;
        test(a, b, ctx)
    } else {
        let test = DISPATCH[kb][ka]?;
        test(b, a, ctx).map(ShapeContact::flipped)
    }
}

/// One contact per active voxel cell the shape penetrates. The cell is the
/// second shape, so normals point into the voxels.
pub fn voxel_world_contacts(
    shape: &WorldShape,
    grid: &dyn VoxelGrid,
    contacts: &mut Vec<(IVec3, ShapeContact)>,
) {
    if shape.kind() == ShapeKind::VoxelRegion {
        return;
    }
    let ctx = NarrowContext::default();
    let bounds = shape.bounds();
    let (min, max) = cells_in_bounds(grid, &bounds);
    let cell_shape = Shape::make_box(Vec3::splat(grid.cell_spacing() * 0.5));
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                let cell = IVec3::new(x, y, z);
                if !grid.is_cell_active(cell) {
                    continue;
                }
                let cell_world = WorldShape::new(&cell_shape, grid.cell_to_world(cell), Quat::IDENTITY);
                if let Some(contact) = collide(shape, &cell_world, &ctx) {
                    contacts.push((cell, exposed_face_contact(grid, cell, &bounds, contact)));
                }
            }
        }
    }
}

/// A cell face shared with another active cell lies inside the solid. A
/// contact pushing out through such a face is moved to the exposed face of
/// least overlap, measured against the shape's bounds. Fully buried cells
/// keep the original contact.
fn exposed_face_contact(
    grid: &dyn VoxelGrid,
    cell: IVec3,
    shape_bounds: &Bounds,
    contact: ShapeContact,
) -> ShapeContact {
    // the shape leaves the cell against the normal
    let push = -contact.normal;
    let abs = push.abs();
    let axis = if abs.x >= abs.y && abs.x >= abs.z {
        0
    } else if abs.y >= abs.z {
        1
    } else {
        2
    };
    let mut face = IVec3::ZERO;
    face[axis] = if push[axis] < 0.0 { -1 } else { 1 };
    if !grid.is_cell_active(cell + face) {
        return contact;
    }

    let half = Vec3::splat(grid.cell_spacing() * 0.5);
    let centre = grid.cell_to_world(cell);
    let (cell_min, cell_max) = (centre - half, centre + half);
    let mut best: Option<(f32, usize, i32)> = None;
    for axis in 0..3 {
        for sign in [-1, 1] {
            let mut face = IVec3::ZERO;
            face[axis] = sign;
            if grid.is_cell_active(cell + face) {
                continue;
            }
            let overlap = if sign > 0 {
                cell_max[axis] - shape_bounds.mins[axis]
            } else {
                shape_bounds.maxs[axis] - cell_min[axis]
            };
            if overlap > 0.0 && best.map_or(true, |(b, _, _)| overlap < b) {
                best = Some((overlap, axis, sign));
            }
        }
    }

    match best {
        Some((penetration, axis, sign)) => {
            let mut normal = Vec3::ZERO;
            normal[axis] = -(sign as f32);
            let mut point = contact.point;
            point[axis] = if sign > 0 { cell_max[axis] } else { cell_min[axis] };
            ShapeContact {
                point,
                normal,
                penetration,
            }
        }
        None => contact,
    }
}

fn sphere_radius(shape: &Shape) -> f32 {
    match shape {
        Shape::Sphere(sphere) => sphere.radius,
        Shape::Capsule(capsule) => capsule.radius,
        _ => 0.0,
    }
}

fn box_half_extents(shape: &Shape) -> Vec3 {
    match shape {
        Shape::Box(data) => data.half_extents,
        Shape::VoxelRegion(region) => region.half_extents(),
        _ => Vec3::ZERO,
    }
}

fn capsule_segment(ws: &WorldShape) -> (Vec3, Vec3) {
    match ws.shape {
        Shape::Capsule(capsule) => capsule.world_segment(ws.position, ws.orientation),
        _ => (ws.position, ws.position),
    }
}

fn sphere_sphere_contact(pos_a: Vec3, radius_a: f32, pos_b: Vec3, radius_b: f32) -> Option<ShapeContact> {
    let ab = pos_b - pos_a;
    let radius_ab = radius_a + radius_b;
    let length_squared = ab.length_squared();
    if length_squared >= radius_ab * radius_ab {
        return None;
    }
    let dist = length_squared.sqrt();
    // coincident centres pick an arbitrary axis
    let normal = if dist > 1e-6 { ab / dist } else { Vec3::Y };
    let penetration = radius_ab - dist;
    Some(ShapeContact {
        point: pos_a + normal * (radius_a - penetration * 0.5),
        normal,
        penetration,
    })
}

/// Normal points from the sphere toward the box.
fn sphere_box_contact(
    centre: Vec3,
    radius: f32,
    box_pos: Vec3,
    box_orient: Quat,
    half_extents: Vec3,
) -> Option<ShapeContact> {
    let local = box_orient.conjugate() * (centre - box_pos);
    let clamped = local.clamp(-half_extents, half_extents);

    if clamped != local {
        let diff = local - clamped;
        let dist_sq = diff.length_squared();
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        let out = if dist > 1e-6 { diff / dist } else { Vec3::Y };
        return Some(ShapeContact {
            point: box_pos + box_orient * clamped,
            normal: -(box_orient * out),
            penetration: radius - dist,
        });
    }

    // centre inside, leave through the face of least penetration
    let face_dist = half_extents - local.abs();
    let axis = if face_dist.x <= face_dist.y && face_dist.x <= face_dist.z {
        0
    } else if face_dist.y <= face_dist.z {
        1
    } else {
        2
    };
    let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
    let mut out = Vec3::ZERO;
    out[axis] = sign;
    let mut surface = local;
    surface[axis] = half_extents[axis] * sign;
    Some(ShapeContact {
        point: box_pos + box_orient * surface,
        normal: -(box_orient * out),
        penetration: radius + face_dist[axis],
    })
}

fn closest_point_on_segment(pt: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((pt - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between segments `p1q1` and `p2q2`.
fn closest_points_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a <= f32::EPSILON && e <= f32::EPSILON {
        return (p1, p2);
    }
    let (s, t) = if a <= f32::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= f32::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    (p1 + d1 * s, p2 + d2 * t)
}

/// Signed distance from a local point to a centred box.
fn box_sdf(local: Vec3, half_extents: Vec3) -> f32 {
    let q = local.abs() - half_extents;
    q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
}

fn sphere_sphere(a: &WorldShape, b: &WorldShape, _: &NarrowContext) -> Option<ShapeContact> {
    sphere_sphere_contact(
        a.position,
        sphere_radius(a.shape),
        b.position,
        sphere_radius(b.shape),
    )
}

fn sphere_box(a: &WorldShape, b: &WorldShape, _: &NarrowContext) -> Option<ShapeContact> {
    sphere_box_contact(
        a.position,
        sphere_radius(a.shape),
        b.position,
        b.orientation,
        box_half_extents(b.shape),
    )
}

fn sphere_capsule(a: &WorldShape, b: &WorldShape, _: &NarrowContext) -> Option<ShapeContact> {
    let (p, q) = capsule_segment(b);
    let on_axis = closest_point_on_segment(a.position, p, q);
    sphere_sphere_contact(a.position, sphere_radius(a.shape), on_axis, sphere_radius(b.shape))
}

fn capsule_capsule(a: &WorldShape, b: &WorldShape, _: &NarrowContext) -> Option<ShapeContact> {
    let (p1, q1) = capsule_segment(a);
    let (p2, q2) = capsule_segment(b);
    let (c1, c2) = closest_points_segments(p1, q1, p2, q2);
    sphere_sphere_contact(c1, sphere_radius(a.shape), c2, sphere_radius(b.shape))
}

/// Oriented boxes, separating axis test over face normals and edge pairs.
fn box_box(a: &WorldShape, b: &WorldShape, _: &NarrowContext) -> Option<ShapeContact> {
    let half_a = box_half_extents(a.shape);
    let half_b = box_half_extents(b.shape);
    let axes_a = [a.orientation * Vec3::X, a.orientation * Vec3::Y, a.orientation * Vec3::Z];
    let axes_b = [b.orientation * Vec3::X, b.orientation * Vec3::Y, b.orientation * Vec3::Z];
    let delta = b.position - a.position;

    // edge axes must beat face axes by a margin to be picked
    const EDGE_BIAS: f32 = 1e-3;

    let mut best_overlap = f32::MAX;
    let mut best_biased = f32::MAX;
    let mut best_normal = Vec3::Y;
    let mut test_axis = |axis: Vec3, bias: f32| -> bool {
        let len = axis.length();
        if len < 1e-6 {
            return true;
        }
        let n = axis / len;
        let radius_a: f32 = (0..3).map(|i| n.dot(axes_a[i]).abs() * half_a[i]).sum();
        let radius_b: f32 = (0..3).map(|i| n.dot(axes_b[i]).abs() * half_b[i]).sum();
        let dist = n.dot(delta);
        let overlap = radius_a + radius_b - dist.abs();
        if overlap <= 0.0 {
            return false;
        }
        if overlap + bias < best_biased {
            best_biased = overlap + bias;
            best_overlap = overlap;
            best_normal = if dist < 0.0 { -n } else { n };
        }
        true
    };

    for axis in axes_a.iter().chain(axes_b.iter()) {
        if !test_axis(*axis, 0.0) {
            return None;
        }
    }
    for axis_a in &axes_a {
        for axis_b in &axes_b {
            if !test_axis(axis_a.cross(*axis_b), EDGE_BIAS) {
                return None;
            }
        }
    }

    let point = a
        .bounds()
        .intersection(&b.bounds())
        .map(|overlap| overlap.center())
        .unwrap_or((a.position + b.position) * 0.5);
    Some(ShapeContact {
        point,
        normal: best_normal,
        penetration: best_overlap,
    })
}

/// Deepest point of the capsule segment against the box, found by golden
/// section search on the box distance field.
fn box_capsule(a: &WorldShape, b: &WorldShape, _: &NarrowContext) -> Option<ShapeContact> {
    let half = box_half_extents(a.shape);
    let inv_orient = a.orientation.conjugate();
    let (p, q) = capsule_segment(b);
    let seg = q - p;
    let sdf = |t: f32| box_sdf(inv_orient * (p + seg * t - a.position), half);

    const INV_PHI: f32 = 0.618_034;
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    let mut x1 = hi - (hi - lo) * INV_PHI;
    let mut x2 = lo + (hi - lo) * INV_PHI;
    let mut f1 = sdf(x1);
    let mut f2 = sdf(x2);
    for _ in 0..32 {
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - (hi - lo) * INV_PHI;
            f1 = sdf(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + (hi - lo) * INV_PHI;
            f2 = sdf(x2);
        }
    }
    // the ends are not reached by the search interior
    let mut best_t = (lo + hi) * 0.5;
    let mut best = sdf(best_t);
    for t in [0.0, 1.0] {
        let d = sdf(t);
        if d < best {
            best = d;
            best_t = t;
        }
    }

    let centre = p + seg * best_t;
    sphere_box_contact(centre, sphere_radius(b.shape), a.position, a.orientation, half)
        .map(ShapeContact::flipped)
}

/// Shape against whatever voxels are active inside the region, deepest cell wins.
fn shape_voxel_region(a: &WorldShape, b: &WorldShape, ctx: &NarrowContext) -> Option<ShapeContact> {
    let grid = ctx.voxels?;
    if a.kind() == ShapeKind::VoxelRegion {
        return None;
    }
    let a_bounds = a.bounds();
    let overlap = a_bounds.intersection(&b.bounds())?;
    let (min, max) = cells_in_bounds(grid, &overlap);
    let cell_shape = Shape::make_box(Vec3::splat(grid.cell_spacing() * 0.5));

    let mut deepest: Option<ShapeContact> = None;
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                let cell = IVec3::new(x, y, z);
                if !grid.is_cell_active(cell) {
                    continue;
                }
                let cell_world = WorldShape::new(&cell_shape, grid.cell_to_world(cell), Quat::IDENTITY);
                if let Some(contact) = collide(a, &cell_world, ctx) {
                    let contact = exposed_face_contact(grid, cell, &a_bounds, contact);
                    if deepest.map_or(true, |d| contact.penetration > d.penetration) {
                        deepest = Some(contact);
                    }
                }
            }
        }
    }
    deepest
}

// two regions view the same static world, there is nothing to push apart
fn voxel_region_voxel_region(_: &WorldShape, _: &WorldShape, _: &NarrowContext) -> Option<ShapeContact> {
    None
}
