use crate::bounds::Bounds;
use glam::{IVec3, Vec3};
use std::collections::HashSet;

/// Read-only view of a block world. Cells are unit boxes of side
/// [`cell_spacing`](VoxelGrid::cell_spacing).
pub trait VoxelGrid {
    fn is_cell_active(&self, cell: IVec3) -> bool;
    fn world_to_cell(&self, pos: Vec3) -> IVec3;
    /// Centre of `cell` in world space.
    fn cell_to_world(&self, cell: IVec3) -> Vec3;
    fn cell_spacing(&self) -> f32;

    fn cell_bounds(&self, cell: IVec3) -> Bounds {
        Bounds::from_center_half_extents(
            self.cell_to_world(cell),
            Vec3::splat(self.cell_spacing() * 0.5),
        )
    }
}

/// Hash set of active cells on a uniform lattice.
#[derive(Clone, Debug)]
pub struct SparseVoxelGrid {
    spacing: f32,
    origin: Vec3,
    cells: HashSet<IVec3>,
}

impl Default for SparseVoxelGrid {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SparseVoxelGrid {
    pub fn new(spacing: f32) -> Self {
        Self::with_origin(spacing, Vec3::ZERO)
    }

    pub fn with_origin(spacing: f32, origin: Vec3) -> Self {
        let spacing = if spacing > 0.0 { spacing } else { 1.0 };
        Self {
            spacing,
            origin,
            cells: HashSet::new(),
        }
    }

    pub fn set_cell(&mut self, cell: IVec3, active: bool) {
        if active {
            self.cells.insert(cell);
        } else {
            self.cells.remove(&cell);
        }
    }

    /// Activates every cell in the inclusive range.
    pub fn fill(&mut self, min: IVec3, max: IVec3) {
        let lo = min.min(max);
        let hi = min.max(max);
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    self.cells.insert(IVec3::new(x, y, z));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IVec3> {
        self.cells.iter()
    }
}

impl VoxelGrid for SparseVoxelGrid {
    fn is_cell_active(&self, cell: IVec3) -> bool {
        self.cells.contains(&cell)
    }

    fn world_to_cell(&self, pos: Vec3) -> IVec3 {
        ((pos - self.origin) / self.spacing).floor().as_ivec3()
    }

    fn cell_to_world(&self, cell: IVec3) -> Vec3 {
        self.origin + (cell.as_vec3() + Vec3::splat(0.5)) * self.spacing
    }

    fn cell_spacing(&self) -> f32 {
        self.spacing
    }
}

/// Inclusive cell range covered by `bounds`.
pub fn cells_in_bounds(grid: &dyn VoxelGrid, bounds: &Bounds) -> (IVec3, IVec3) {
    (grid.world_to_cell(bounds.mins), grid.world_to_cell(bounds.maxs))
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VoxelHit {
    pub cell: IVec3,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

// cap for rays with no finite length
const MAX_VOXEL_RAY_STEPS: u32 = 4096;

/// Walks the cells pierced by the ray and returns the first active one. The
/// cell holding `origin` is never reported.
pub fn raycast_voxels(
    grid: &dyn VoxelGrid,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Option<VoxelHit> {
    let dir = direction.try_normalize()?;
    if max_distance.is_nan() || max_distance <= 0.0 {
        return None;
    }
    let spacing = grid.cell_spacing();
    let mut cell = grid.world_to_cell(origin);
    let cell_min = grid.cell_to_world(cell) - Vec3::splat(spacing * 0.5);

    let mut step = IVec3::ZERO;
    let mut t_max = Vec3::splat(f32::INFINITY);
    let mut t_delta = Vec3::splat(f32::INFINITY);
    for axis in 0..3 {
        let d = dir[axis];
        if d > 0.0 {
            step[axis] = 1;
            t_max[axis] = (cell_min[axis] + spacing - origin[axis]) / d;
            t_delta[axis] = spacing / d;
        } else if d < 0.0 {
            step[axis] = -1;
            t_max[axis] = (cell_min[axis] - origin[axis]) / d;
            t_delta[axis] = -spacing / d;
        }
    }

    for _ in 0..MAX_VOXEL_RAY_STEPS {
        let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
            0
        } else if t_max.y <= t_max.z {
            1
        } else {
            2
        };
        let t = t_max[axis];
        if t > max_distance {
            return None;
        }
        cell[axis] += step[axis];
        t_max[axis] += t_delta[axis];

        if grid.is_cell_active(cell) {
            let mut normal = Vec3::ZERO;
            normal[axis] = -(step[axis] as f32);
            return Some(VoxelHit {
                cell,
                point: origin + dir * t,
                normal,
                distance: t,
            });
        }
    }
    None
}
