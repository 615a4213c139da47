use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Axis aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Bounds {
    /// An inverted box that any point expands into.
    pub fn new() -> Bounds {
        Bounds {
            mins: Vec3::splat(f32::MAX),
            maxs: Vec3::splat(-f32::MAX),
        }
    }

    pub fn from_points(pts: &[Vec3]) -> Self {
        pts.iter().fold(Bounds::new(), |acc, pt| acc + *pt)
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Bounds {
            mins: center - half_extents,
            maxs: center + half_extents,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.mins.cmple(self.maxs).all()
    }

    pub fn intersects(&self, rhs: &Self) -> bool {
        !(self.maxs.cmplt(rhs.mins).any() || rhs.maxs.cmplt(self.mins).any())
    }

    pub fn contains_point(&self, pt: Vec3) -> bool {
        pt.cmpge(self.mins).all() && pt.cmple(self.maxs).all()
    }

    pub fn expand_by_point(&mut self, pt: Vec3) {
        self.add_assign(pt);
    }

    pub fn expand_by_bounds(&mut self, rhs: &Self) {
        self.expand_by_point(rhs.mins);
        self.expand_by_point(rhs.maxs);
    }

    /// Grows the box by `margin` on every side.
    pub fn inflated(&self, margin: f32) -> Self {
        Bounds {
            mins: self.mins - Vec3::splat(margin),
            maxs: self.maxs + Vec3::splat(margin),
        }
    }

    pub fn intersection(&self, rhs: &Self) -> Option<Self> {
        let bounds = Bounds {
            mins: self.mins.max(rhs.mins),
            maxs: self.maxs.min(rhs.maxs),
        };
        if bounds.is_valid() {
            Some(bounds)
        } else {
            None
        }
    }

    pub fn width(&self) -> Vec3 {
        self.maxs - self.mins
    }

    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        self.width() * 0.5
    }

    pub fn closest_point(&self, pt: Vec3) -> Vec3 {
        pt.clamp(self.mins, self.maxs)
    }

    /// Slab test. Returns the entry and exit parameters along `dir`, the entry
    /// parameter is negative when `origin` starts inside the box.
    pub fn ray_intersection(&self, origin: Vec3, dir: Vec3) -> Option<(f32, f32)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            if d.abs() < 1e-8 {
                if o < self.mins[axis] || o > self.maxs[axis] {
                    return None;
                }
                continue;
            }
            let inv_d = d.recip();
            let mut t0 = (self.mins[axis] - o) * inv_d;
            let mut t1 = (self.maxs[axis] - o) * inv_d;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        if t_max < 0.0 {
            None
        } else {
            Some((t_min, t_max))
        }
    }
}

impl Default for Bounds {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Add<Vec3> for Bounds {
    type Output = Self;
    fn add(self, pt: Vec3) -> Self::Output {
        Bounds {
            mins: Vec3::select(pt.cmplt(self.mins), pt, self.mins),
            maxs: Vec3::select(pt.cmpgt(self.maxs), pt, self.maxs),
        }
    }
}

impl AddAssign<Vec3> for Bounds {
    fn add_assign(&mut self, pt: Vec3) {
        self.mins = Vec3::select(pt.cmplt(self.mins), pt, self.mins);
        self.maxs = Vec3::select(pt.cmpgt(self.maxs), pt, self.maxs);
    }
}
