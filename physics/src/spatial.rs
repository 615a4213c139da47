use crate::{body::BodyHandle, bounds::Bounds, config::GridExtent};
use glam::{IVec3, Vec3};
use std::collections::{BTreeSet, HashMap};

/// Bodies covering more cells than this skip the grid and are paired with everything.
const MAX_CELLS_PER_BODY: i64 = 4096;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Entry {
    Cells { min: IVec3, max: IVec3 },
    Large,
}

/// Sparse uniform grid from cell coordinate to the bodies whose bounds touch it.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    extent: Option<GridExtent>,
    cells: HashMap<IVec3, Vec<BodyHandle>>,
    entries: HashMap<BodyHandle, Entry>,
    large: BTreeSet<BodyHandle>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32, extent: Option<GridExtent>) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            extent,
            cells: HashMap::new(),
            entries: HashMap::new(),
            large: BTreeSet::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn cell_of(&self, pos: Vec3) -> IVec3 {
        (pos / self.cell_size).floor().as_ivec3()
    }

    /// Cell range of `bounds` clipped to the extent, `None` when nothing is left.
    fn cell_range(&self, bounds: &Bounds) -> Option<(IVec3, IVec3)> {
        if !bounds.is_valid() || !bounds.mins.is_finite() || !bounds.maxs.is_finite() {
            return None;
        }
        let mut min = self.cell_of(bounds.mins);
        let mut max = self.cell_of(bounds.maxs);
        if let Some(extent) = self.extent {
            min = min.max(extent.min);
            max = max.min(extent.max);
            if min.cmpgt(max).any() {
                return None;
            }
        }
        Some((min, max))
    }

    /// Saturates, an axis can span the whole `i32` range.
    fn range_volume(min: IVec3, max: IVec3) -> i64 {
        let d = |lo: i32, hi: i32| i64::from(hi) - i64::from(lo) + 1;
        d(min.x, max.x)
            .saturating_mul(d(min.y, max.y))
            .saturating_mul(d(min.z, max.z))
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
        self.large.clear();
    }

    pub fn remove(&mut self, handle: BodyHandle) {
        match self.entries.remove(&handle) {
            Some(Entry::Cells { min, max }) => {
                for_each_cell(min, max, |cell| {
                    if let Some(bucket) = self.cells.get_mut(&cell) {
                        bucket.retain(|h| *h != handle);
                        if bucket.is_empty() {
                            self.cells.remove(&cell);
                        }
                    }
                });
            }
            Some(Entry::Large) => {
                self.large.remove(&handle);
            }
            None => {}
        }
    }

    /// Re-indexes `handle` under its latest world bounds.
    pub fn update(&mut self, handle: BodyHandle, bounds: &Bounds) {
        let range = self.cell_range(bounds);
        let entry = range.map(|(min, max)| {
            if Self::range_volume(min, max) > MAX_CELLS_PER_BODY {
                Entry::Large
            } else {
                Entry::Cells { min, max }
            }
        });
        if entry.is_some() && self.entries.get(&handle) == entry.as_ref() {
            return;
        }
        self.remove(handle);
        match entry {
            Some(Entry::Cells { min, max }) => {
                for_each_cell(min, max, |cell| {
                    self.cells.entry(cell).or_default().push(handle);
                });
                self.entries.insert(handle, Entry::Cells { min, max });
            }
            Some(Entry::Large) => {
                self.large.insert(handle);
                self.entries.insert(handle, Entry::Large);
            }
            None => {}
        }
    }

    /// Bodies sharing a cell or an oversized body, each pair once with the
    /// lower handle first, in handle order.
    pub fn candidate_pairs(&self) -> Vec<(BodyHandle, BodyHandle)> {
        let mut pairs = BTreeSet::new();
        for bucket in self.cells.values() {
            for (i, &a) in bucket.iter().enumerate() {
                for &b in &bucket[i + 1..] {
                    pairs.insert(ordered(a, b));
                }
            }
        }
        for &a in &self.large {
            for &b in self.entries.keys() {
                if a != b {
                    pairs.insert(ordered(a, b));
                }
            }
        }
        pairs.into_iter().collect()
    }

    /// Bodies indexed in any cell touched by `bounds`, de-duplicated and sorted.
    pub fn query_bounds(&self, bounds: &Bounds) -> Vec<BodyHandle> {
        let mut found: BTreeSet<BodyHandle> = self.large.iter().copied().collect();
        if let Some((min, max)) = self.cell_range(bounds) {
            if Self::range_volume(min, max) > self.cells.len() as i64 {
                // sparse relative to the query, walk the occupied cells instead
                for (cell, bucket) in &self.cells {
                    if cell.cmpge(min).all() && cell.cmple(max).all() {
                        found.extend(bucket.iter().copied());
                    }
                }
            } else {
                for_each_cell(min, max, |cell| {
                    if let Some(bucket) = self.cells.get(&cell) {
                        found.extend(bucket.iter().copied());
                    }
                });
            }
        }
        found.into_iter().collect()
    }

    /// Bodies in the cells pierced by the ray, in no particular order of distance.
    pub fn query_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Vec<BodyHandle> {
        let mut found: BTreeSet<BodyHandle> = self.large.iter().copied().collect();
        let dir = match direction.try_normalize() {
            Some(dir) => dir,
            None => return found.into_iter().collect(),
        };
        let occupied = match self.occupied_range() {
            Some(range) => range,
            None => return found.into_iter().collect(),
        };

        let mut cell = self.cell_of(origin);
        let mut step = IVec3::ZERO;
        let mut t_max = Vec3::splat(f32::INFINITY);
        let mut t_delta = Vec3::splat(f32::INFINITY);
        let cell_min = cell.as_vec3() * self.cell_size;
        for axis in 0..3 {
            let d = dir[axis];
            if d > 0.0 {
                step[axis] = 1;
                t_max[axis] = (cell_min[axis] + self.cell_size - origin[axis]) / d;
                t_delta[axis] = self.cell_size / d;
            } else if d < 0.0 {
                step[axis] = -1;
                t_max[axis] = (cell_min[axis] - origin[axis]) / d;
                t_delta[axis] = -self.cell_size / d;
            }
        }

        let (occ_min, occ_max) = occupied;
        loop {
            if let Some(bucket) = self.cells.get(&cell) {
                found.extend(bucket.iter().copied());
            }

            let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
                0
            } else if t_max.y <= t_max.z {
                1
            } else {
                2
            };
            if t_max[axis] > max_distance {
                break;
            }
            cell[axis] += step[axis];
            t_max[axis] += t_delta[axis];

            // past the occupied cells and moving away, nothing more to find
            let leaving = (0..3).any(|i| {
                let past_max = cell[i] > occ_max[i] && step[i] >= 0;
                let past_min = cell[i] < occ_min[i] && step[i] <= 0;
                past_max || past_min
            });
            if leaving {
                break;
            }
        }
        found.into_iter().collect()
    }

    fn occupied_range(&self) -> Option<(IVec3, IVec3)> {
        let mut cells = self.cells.keys();
        let first = *cells.next()?;
        Some(cells.fold((first, first), |(lo, hi), c| (lo.min(*c), hi.max(*c))))
    }
}

fn ordered(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn for_each_cell(min: IVec3, max: IVec3, mut f: impl FnMut(IVec3)) {
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                f(IVec3::new(x, y, z));
            }
        }
    }
}
