//! Entity types
//!
//! Entities never own their bodies. Each [`Entity`] in the world arena pairs a
//! gameplay payload with the [`BodyHandle`] the physics world issued for it.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::consts::*;
use crate::physics::{BodyHandle, SensorHandle};

new_key_type! {
    /// Stable arena handle for an entity. Timers and commands capture this,
    /// never a reference.
    pub struct EntityId;
}

/// Horizontal facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// Facing toward a horizontal delta (right when `dx > 0`)
    pub fn toward(dx: f32) -> Self {
        if dx > 0.0 { Facing::Right } else { Facing::Left }
    }
}

/// Player movement state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementState {
    #[default]
    Idle,
    Walking,
    Jumping,
}

/// Player sprite set
#[derive(Debug, Clone)]
pub struct PlayerSprites {
    pub idle_right: String,
    pub idle_left: String,
    pub walk_right: Vec<String>,
    pub walk_left: Vec<String>,
    pub jump_right: String,
    pub jump_left: String,
}

impl Default for PlayerSprites {
    fn default() -> Self {
        Self {
            idle_right: "data/walk1.png".into(),
            idle_left: "data/walk1-1.png".into(),
            walk_right: vec![
                "data/walk1.png".into(),
                "data/walk2.png".into(),
                "data/walk3.png".into(),
            ],
            walk_left: vec![
                "data/walk1-1.png".into(),
                "data/walk2-1.png".into(),
                "data/walk3-1.png".into(),
            ],
            jump_right: "data/jump1.png".into(),
            jump_left: "data/jump1-1.png".into(),
        }
    }
}

/// The single player of a world
#[derive(Debug, Clone)]
pub struct Player {
    pub entity: EntityId,
    pub body: BodyHandle,
    /// Always within [1, PLAYER_MAX_HEALTH]
    pub health: u8,
    pub stars: u32,
    pub facing: Facing,
    pub movement: MovementState,
    pub frame: usize,
    /// Requested walking speed while a direction is held
    pub walk_speed: Option<f32>,
    /// Position and velocity as of the last completed step
    pub position: Vec2,
    pub velocity: Vec2,
    sprites: PlayerSprites,
}

impl Player {
    pub fn new(entity: EntityId, body: BodyHandle, position: Vec2) -> Self {
        Self {
            entity,
            body,
            health: PLAYER_MAX_HEALTH,
            stars: 0,
            facing: Facing::Right,
            movement: MovementState::Idle,
            frame: 0,
            walk_speed: None,
            position,
            velocity: Vec2::ZERO,
            sprites: PlayerSprites::default(),
        }
    }

    /// Altitude used by every generation and respawn gate
    pub fn altitude(&self) -> f32 {
        self.position.y
    }

    pub fn start_walking(&mut self, speed: f32) {
        if speed > 0.0 {
            self.facing = Facing::Right;
        } else if speed < 0.0 {
            self.facing = Facing::Left;
        }
        self.walk_speed = Some(speed);
        if self.movement == MovementState::Idle {
            self.movement = MovementState::Walking;
        }
    }

    pub fn stop_walking(&mut self) {
        self.walk_speed = None;
        self.frame = 0;
        if self.movement == MovementState::Walking {
            self.movement = MovementState::Idle;
        }
    }

    /// Start a jump unless already rising fast. Returns the new vertical speed.
    pub fn jump(&mut self, speed: f32) -> Option<f32> {
        if self.velocity.y >= PLAYER_JUMP_GATE {
            return None;
        }
        self.movement = MovementState::Jumping;
        Some(speed)
    }

    /// Touched down on solid ground
    pub fn land(&mut self) {
        if self.movement == MovementState::Jumping {
            self.movement = if self.walk_speed.is_some() {
                MovementState::Walking
            } else {
                MovementState::Idle
            };
        }
    }

    pub fn advance_frame(&mut self) {
        if self.movement == MovementState::Walking {
            let len = self.walk_frames().len().max(1);
            self.frame = (self.frame + 1) % len;
        }
    }

    fn walk_frames(&self) -> &[String] {
        match self.facing {
            Facing::Right => &self.sprites.walk_right,
            Facing::Left => &self.sprites.walk_left,
        }
    }

    /// Image the view should draw this frame
    pub fn sprite(&self) -> &str {
        match (self.movement, self.facing) {
            (MovementState::Idle, Facing::Right) => &self.sprites.idle_right,
            (MovementState::Idle, Facing::Left) => &self.sprites.idle_left,
            (MovementState::Jumping, Facing::Right) => &self.sprites.jump_right,
            (MovementState::Jumping, Facing::Left) => &self.sprites.jump_left,
            (MovementState::Walking, _) => self
                .walk_frames()
                .get(self.frame)
                .map(String::as_str)
                .unwrap_or(self.sprites.idle_right.as_str()),
        }
    }
}

/// A generated platform
#[derive(Debug, Clone)]
pub struct Platform {
    /// Signed horizontal speed for oscillating platforms
    pub speed: Option<f32>,
    pub friction: f32,
    pub sprite: String,
    /// Overlay image on decorated platforms
    pub decoration: Option<String>,
}

/// Stationary shooter
#[derive(Debug, Clone)]
pub struct Enemy {
    pub position: Vec2,
    pub sprites: Vec<String>,
    pub frame: usize,
    pub projectile_sprite: String,
    /// Steps until the next shot
    pub attack_countdown: u64,
}

impl Enemy {
    pub fn new(position: Vec2, sprites: Vec<String>, projectile_sprite: String) -> Self {
        Self {
            position,
            sprites,
            frame: 0,
            projectile_sprite,
            attack_countdown: ENEMY_ATTACK_STEPS,
        }
    }

    pub fn sprite(&self) -> &str {
        self.sprites.get(self.frame).map(String::as_str).unwrap_or("")
    }

    /// Where projectiles leave the enemy
    pub fn mouth(&self) -> Vec2 {
        self.position + PROJECTILE_MOUTH_OFFSET
    }
}

/// Patrol behaviour mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatrolMode {
    /// Pace between the bounds until the player is detected
    PatrolOnly,
    /// Fly straight at the player, ignoring bounds
    ChasePlayer,
}

/// Patrol behaviour state. Only ever moves Patrolling -> Chasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatrolState {
    #[default]
    Patrolling,
    Chasing,
}

/// Construction config for a patrol enemy, reused verbatim on respawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatrolConfig {
    pub left: f32,
    pub right: f32,
    pub walk_left_sprites: Vec<String>,
    pub walk_right_sprites: Vec<String>,
    pub frame_delay_ms: f32,
    pub mode: PatrolMode,
}

impl PatrolConfig {
    pub fn midpoint(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    /// Half extents of the detection sensor
    pub fn sensor_half_extents(&self) -> Vec2 {
        Vec2::new(
            (self.right - self.left) / 2.0 + PATROL_SENSOR_PADDING,
            PATROL_SENSOR_HALF_HEIGHT,
        )
    }
}

/// Mobile patrol/chase agent
#[derive(Debug, Clone)]
pub struct PatrolEnemy {
    pub config: PatrolConfig,
    pub sensor: Option<SensorHandle>,
    pub facing: Facing,
    pub frame: usize,
    state: PatrolState,
}

impl PatrolEnemy {
    pub fn new(config: PatrolConfig, sensor: Option<SensorHandle>) -> Self {
        Self {
            config,
            sensor,
            facing: Facing::Right,
            frame: 0,
            state: PatrolState::Patrolling,
        }
    }

    pub fn state(&self) -> PatrolState {
        self.state
    }

    /// Player entered the detection sensor. There is no way back.
    pub fn latch_chase(&mut self) {
        self.state = PatrolState::Chasing;
    }

    pub fn frames(&self) -> &[String] {
        match self.facing {
            Facing::Right => &self.config.walk_right_sprites,
            Facing::Left => &self.config.walk_left_sprites,
        }
    }

    pub fn sprite(&self) -> &str {
        let frames = self.frames();
        frames
            .get(self.frame % frames.len().max(1))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Enemy shot
#[derive(Debug, Clone)]
pub struct Projectile {
    pub sprite: String,
}

/// Hazard variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardKind {
    /// Placed beside a platform, never moves
    Static,
    /// Dropped from above the player
    Falling,
}

#[derive(Debug, Clone)]
pub struct Hazard {
    pub kind: HazardKind,
    pub sprite: String,
    /// Played when the hazard breaks
    pub sound: Option<String>,
}

/// Gameplay payload of an arena entry
#[derive(Debug, Clone)]
pub enum EntityKind {
    Player,
    /// Walls and ground
    Boundary,
    Platform(Platform),
    Enemy(Enemy),
    Patrol(PatrolEnemy),
    Projectile(Projectile),
    Star,
    Hazard(Hazard),
}

impl EntityKind {
    /// Enemy bodies are ignored by projectiles and hazards
    pub fn is_enemy(&self) -> bool {
        matches!(self, EntityKind::Enemy(_) | EntityKind::Patrol(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Boundary => "boundary",
            EntityKind::Platform(_) => "platform",
            EntityKind::Enemy(_) => "enemy",
            EntityKind::Patrol(_) => "patrol",
            EntityKind::Projectile(_) => "projectile",
            EntityKind::Star => "star",
            EntityKind::Hazard(_) => "hazard",
        }
    }
}

/// Arena entry
#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    pub body: BodyHandle,
    /// Cleared the moment the entity is retired, before its body is destroyed
    pub alive: bool,
}

impl Entity {
    pub fn new(kind: EntityKind, body: BodyHandle) -> Self {
        Self {
            kind,
            body,
            alive: true,
        }
    }
}
