//! Robo Run - an endless vertical platformer core
//!
//! Core modules:
//! - `sim`: Deterministic game simulation (terrain generation, entity behaviour, game state)
//! - `physics`: Fixed-step rigid body world with contact and sensor events
//! - `theme`: Data-driven per-level parameters
//!
//! Rendering, HUD, audio playback and keyboard mapping belong to the shell. The
//! core reports to it through [`sim::GameObserver`].

pub mod error;
pub mod physics;
pub mod sim;
pub mod theme;

pub use error::{GameError, StaleEntity};
pub use theme::{Theme, ThemeParams};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    use glam::Vec2;

    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Fixed timestep in milliseconds, the unit animation timers run on
    pub const SIM_DT_MS: f32 = 1000.0 / 60.0;
    /// World gravity
    pub const GRAVITY: Vec2 = Vec2::new(0.0, -9.8);

    /// Player defaults
    pub const PLAYER_SPAWN: Vec2 = Vec2::new(0.0, -7.0);
    pub const PLAYER_HALF_EXTENTS: Vec2 = Vec2::new(0.96, 1.97);
    pub const PLAYER_MAX_HEALTH: u8 = 4;
    pub const PLAYER_GRAVITY_SCALE: f32 = 1.5;
    pub const PLAYER_WALK_SPEED: f32 = 15.0;
    pub const PLAYER_JUMP_SPEED: f32 = 15.0;
    /// Jumps are ignored while rising faster than this
    pub const PLAYER_JUMP_GATE: f32 = 6.0;
    pub const PLAYER_FRAME_MS: f32 = 100.0;

    /// Boundary geometry
    pub const WALL_X: f32 = 13.0;
    pub const WALL_HALF_EXTENTS: Vec2 = Vec2::new(0.5, 1000.0);
    pub const WALL_CENTRE_Y: f32 = -2.0;
    pub const GROUND_Y: f32 = -12.0;
    pub const GROUND_TILES: u32 = 13;
    pub const GROUND_TILE_WIDTH: f32 = 2.0;
    pub const GROUND_FIRST_X: f32 = -11.0;
    pub const FIRST_PLATFORM: Vec2 = Vec2::new(5.0, -7.0);

    /// Terrain generation
    pub const PLATFORM_HALF_EXTENTS: Vec2 = Vec2::new(2.0, 0.75);
    pub const INITIAL_FRONTIER: f32 = -7.0;
    pub const GENERATION_MARGIN: f32 = 5.0;
    pub const PLATFORM_BATCH: usize = 5;
    pub const PLATFORM_STEP: f32 = 5.0;
    pub const PLATFORM_JITTER: f32 = 3.0;
    /// Walkable x range for platforms, stars and hazards
    pub const WALKABLE_MIN_X: f32 = -10.0;
    pub const WALKABLE_MAX_X: f32 = 10.0;
    /// Moving platform speed (0.05 units per step)
    pub const PLATFORM_SPEED: f32 = 0.05 / SIM_DT;
    pub const DECORATION_FRICTION: f32 = 1.0;
    pub const STATIC_SPIKE_OFFSET: Vec2 = Vec2::new(1.3, 1.5);
    pub const STATIC_SPIKE_HALF_EXTENTS: Vec2 = Vec2::new(0.75, 0.85);

    /// Stationary enemies
    pub const ENEMY_HALF_EXTENTS: Vec2 = Vec2::new(1.0, 1.0);
    pub const ENEMY_PLATFORM_OFFSET: f32 = 1.65;
    pub const ENEMY_FRAME_MS: f32 = 250.0;
    pub const ENEMY_ATTACK_STEPS: u64 = 180;
    pub const PROJECTILE_SPEED: f32 = 15.0;
    pub const PROJECTILE_RADIUS: f32 = 0.4;
    pub const PROJECTILE_MOUTH_OFFSET: Vec2 = Vec2::new(1.0, 1.0);

    /// Patrol enemies
    pub const PATROL_HALF_EXTENTS: Vec2 = Vec2::new(1.0, 1.0);
    pub const PATROL_WALK_SPEED: f32 = 3.0;
    pub const CHASE_VELOCITY: Vec2 = Vec2::new(5.0, 2.0);
    /// Distance from a bound at which a patrolling enemy turns around
    pub const PATROL_TURN_MARGIN: f32 = 0.1;
    pub const PATROL_SENSOR_PADDING: f32 = 2.0;
    pub const PATROL_SENSOR_HALF_HEIGHT: f32 = 2.0;
    pub const PATROL_RESPAWN_CLIMB: f32 = 50.0;
    pub const PATROL_RESPAWN_OFFSET: Vec2 = Vec2::new(0.0, 5.0);

    /// Collectibles and hazards
    pub const STAR_RADIUS: f32 = 0.5;
    pub const STAR_FIRST_GATE: f32 = -10.0;
    pub const STAR_SPAWN_INTERVAL: f32 = 15.0;
    pub const STAR_SPAWN_HEIGHT: f32 = 3.0;
    pub const FALLING_HAZARD_HEIGHT: f32 = 15.0;
    pub const FALLING_HAZARD_GRAVITY_SCALE: f32 = 0.5;
    pub const FALLING_HAZARD_HALF_EXTENTS: Vec2 = Vec2::new(0.3, 0.5);

    /// Camera constraint policy
    pub const CAMERA_MIN_Y: f32 = -15.0;
    pub const CAMERA_MIN_X: f32 = 0.0;
    pub const CAMERA_MAX_X: f32 = 0.0;
}

/// Unit vector from `from` toward `to` scaled to `speed` (zero if the points coincide)
#[inline]
pub fn aim(from: Vec2, to: Vec2, speed: f32) -> Vec2 {
    (to - from).normalize_or_zero() * speed
}

/// `magnitude` signed by `delta` (positive when `delta > 0`)
#[inline]
pub fn signed(delta: f32, magnitude: f32) -> f32 {
    if delta > 0.0 { magnitude } else { -magnitude }
}
