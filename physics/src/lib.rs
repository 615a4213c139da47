pub mod arena;
pub mod body;
pub mod bounds;
pub mod collider;
pub mod config;
pub mod contact;
pub mod events;
pub mod movement;
pub mod narrowphase;
pub mod pairs;
pub mod query;
mod solver;
pub mod shapes;
pub mod spatial;
pub mod time_accumulator;
pub mod voxel;
pub mod world;

pub use arena::{Arena, Handle};
pub use body::{Body, BodyHandle, BodyKind};
pub use bounds::Bounds;
pub use collider::{Collider, ColliderHandle, Material};
pub use config::{ConfigError, PhysicsConfig};
pub use contact::{CollisionInfo, CollisionStats};
pub use events::{BodyListener, PhysicsEvent, WorldListener};
pub use movement::{Movement, MovementParams, MovementState};
pub use query::RaycastHit;
pub use shapes::{Shape, ShapeKind};
pub use voxel::{SparseVoxelGrid, VoxelGrid};
pub use world::PhysicsWorld;
