use crate::collider::Material;
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config json is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Penetration left alone by positional correction.
    pub slop: f32,
    /// Fraction of the remaining penetration removed per iteration.
    pub correction_percent: f32,
    /// Closing speeds below this do not bounce.
    pub restitution_velocity_threshold: f32,
    pub voxel_correction_percent: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            slop: 0.01,
            correction_percent: 0.2,
            restitution_velocity_threshold: 0.2,
            voxel_correction_percent: 0.2,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    pub linear_threshold: f32,
    pub angular_threshold: f32,
    /// Seconds a body must stay below both thresholds before it sleeps.
    pub time_threshold: f32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            linear_threshold: 0.01,
            angular_threshold: 0.01,
            time_threshold: 0.5,
        }
    }
}

/// Inclusive range of spatial grid cells. Anything outside it is never indexed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridExtent {
    pub min: IVec3,
    pub max: IVec3,
}

impl GridExtent {
    pub fn contains(&self, cell: IVec3) -> bool {
        cell.cmpge(self.min).all() && cell.cmple(self.max).all()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    pub fixed_time_step: f32,
    pub iterations: u32,
    pub max_steps_per_update: u32,
    pub time_scale: f32,
    pub cell_size: f32,
    pub grid_extent: Option<GridExtent>,
    pub solver: SolverConfig,
    pub sleep: SleepConfig,
    pub voxel_material: Material,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_time_step: 1.0 / 60.0,
            iterations: 4,
            max_steps_per_update: 8,
            time_scale: 1.0,
            cell_size: 10.0,
            grid_extent: None,
            solver: SolverConfig::default(),
            sleep: SleepConfig::default(),
            voxel_material: Material::default(),
        }
    }
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn non_negative_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

impl PhysicsConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PhysicsConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: PhysicsConfig = serde_json::from_reader(reader)?;
        Ok(config.sanitized())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Replaces out of range values with their defaults instead of rejecting them.
    pub fn sanitized(mut self) -> Self {
        let defaults = PhysicsConfig::default();
        if !self.gravity.is_finite() {
            self.gravity = defaults.gravity;
        }
        self.fixed_time_step = positive_or(self.fixed_time_step, defaults.fixed_time_step);
        self.iterations = self.iterations.max(1);
        self.max_steps_per_update = self.max_steps_per_update.max(1);
        self.time_scale = non_negative_or(self.time_scale, defaults.time_scale);
        self.cell_size = positive_or(self.cell_size, defaults.cell_size);
        if let Some(extent) = self.grid_extent {
            self.grid_extent = Some(GridExtent {
                min: extent.min.min(extent.max),
                max: extent.min.max(extent.max),
            });
        }

        let solver = &mut self.solver;
        solver.slop = non_negative_or(solver.slop, defaults.solver.slop);
        solver.correction_percent = non_negative_or(
            solver.correction_percent,
            defaults.solver.correction_percent,
        )
        .min(1.0);
        solver.restitution_velocity_threshold = non_negative_or(
            solver.restitution_velocity_threshold,
            defaults.solver.restitution_velocity_threshold,
        );
        solver.voxel_correction_percent = non_negative_or(
            solver.voxel_correction_percent,
            defaults.solver.voxel_correction_percent,
        )
        .min(1.0);

        let sleep = &mut self.sleep;
        sleep.linear_threshold =
            non_negative_or(sleep.linear_threshold, defaults.sleep.linear_threshold);
        sleep.angular_threshold =
            non_negative_or(sleep.angular_threshold, defaults.sleep.angular_threshold);
        sleep.time_threshold = non_negative_or(sleep.time_threshold, defaults.sleep.time_threshold);

        self.voxel_material = Material::new(
            self.voxel_material.friction,
            self.voxel_material.restitution,
        );
        self
    }
}
