//! Deterministic game simulation
//!
//! All gameplay logic lives here:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Body and entity lifetimes owned by [`GameWorld`]; everything else holds handles
//! - Mutations requested outside the stepper go through the [`CommandQueue`]

pub mod behavior;
pub mod camera;
pub mod commands;
pub mod entities;
pub mod hazards;
pub mod observer;
pub mod scheduler;
pub mod state;
pub mod terrain;
pub mod world;

pub use camera::camera_centre;
pub use commands::{Command, CommandQueue, CommandSender};
pub use entities::{
    Enemy, Entity, EntityId, EntityKind, Facing, Hazard, HazardKind, MovementState, PatrolConfig,
    PatrolEnemy, PatrolMode, PatrolState, Platform, Player, Projectile,
};
pub use hazards::{CollectibleSpawner, FallingSpawn};
pub use observer::{EventLog, GameEvent, GameObserver, NullObserver, SoundCue};
pub use scheduler::Scheduler;
pub use state::{DamageOutcome, GamePhase, GameState, StarOutcome};
pub use terrain::{PlatformSpawn, TerrainGenerator};
pub use world::{GameWorld, TickInput};
