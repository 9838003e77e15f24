//! Level themes and their tuning
//!
//! Every asset name and behaviour knob a level needs is carried in a
//! [`ThemeParams`] value handed to the world at construction. Nothing here is
//! process-wide mutable state; two worlds built from different themes never
//! observe each other's sprites or sounds.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::sim::{PatrolConfig, PatrolMode};

/// Level themes, in play order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    #[default]
    Factory,
    Ice,
    Fire,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Factory => "Factory",
            Theme::Ice => "Ice",
            Theme::Fire => "Fire",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "factory" | "1" => Some(Theme::Factory),
            "ice" | "2" => Some(Theme::Ice),
            "fire" | "3" => Some(Theme::Fire),
            _ => None,
        }
    }

    /// The level that follows this one (None after the last level)
    pub fn next(&self) -> Option<Self> {
        match self {
            Theme::Factory => Some(Theme::Ice),
            Theme::Ice => Some(Theme::Fire),
            Theme::Fire => None,
        }
    }
}

/// Probability gates used by terrain and collectible generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Chance a new platform oscillates horizontally
    pub moving_platform: f32,
    /// Chance a stationary enemy is placed on a new platform
    pub enemy: f32,
    /// Chance a star spawns when the altitude gate is crossed
    pub star: f32,
    /// Chance a platform gets a frictional decoration
    pub decoration: f32,
    /// Chance a static hazard is placed beside a platform
    pub static_hazard: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            moving_platform: 0.3,
            enemy: 0.2,
            star: 0.9,
            decoration: 0.0,
            static_hazard: 0.0,
        }
    }
}

/// Star counts at which the level changes pace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Falling hazards start once this many stars are collected
    pub hazards_at: u32,
    /// The shell is told the level is complete at this many stars
    pub level_complete_at: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            hazards_at: 1,
            level_complete_at: 5,
        }
    }
}

/// Falling hazard look and cadence for a level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallingHazardTheme {
    /// One is picked at random per spawn
    pub sprites: Vec<String>,
    /// Played when the hazard shatters
    pub sound: String,
    /// Steps between spawns once enabled
    pub interval_steps: u32,
}

/// When a level's patrol enemy first appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatrolTrigger {
    /// As soon as the world is created
    OnLoad,
    /// Once the player holds this many stars
    StarsCollected(u32),
}

/// Patrol enemy wiring for a level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatrolSpawnRule {
    pub trigger: PatrolTrigger,
    /// Spawn point relative to the player at trigger time
    pub spawn_offset: Vec2,
    pub config: PatrolConfig,
}

/// Complete per-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeParams {
    pub theme: Theme,

    // === Terrain ===
    pub background: String,
    pub platform_sprite: String,
    pub ground_sprite: String,
    /// Base friction of generated platforms
    pub platform_friction: f32,
    /// Overlay drawn on decorated platforms
    #[serde(default)]
    pub decoration_sprite: Option<String>,
    #[serde(default)]
    pub static_hazard_sprite: Option<String>,

    // === Enemies ===
    /// Stationary enemy animation frames
    pub enemy_sprites: Vec<String>,
    pub projectile_sprite: String,
    #[serde(default)]
    pub patrol: Option<PatrolSpawnRule>,

    // === Hazards ===
    #[serde(default)]
    pub falling_hazards: Option<FallingHazardTheme>,

    // === Pacing ===
    #[serde(default)]
    pub generation: GenerationParams,
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Retire platforms and static hazards this far below the player
    #[serde(default)]
    pub prune_below: Option<f32>,
}

fn frames(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("data/{prefix}{i}.png")).collect()
}

impl ThemeParams {
    /// Built-in parameters for a level
    pub fn preset(theme: Theme) -> Self {
        match theme {
            Theme::Factory => Self {
                theme,
                background: "data/background.png".into(),
                platform_sprite: "data/platform.png".into(),
                ground_sprite: "data/ground.png".into(),
                platform_friction: 0.2,
                decoration_sprite: None,
                static_hazard_sprite: None,
                enemy_sprites: frames("enemy", 4),
                projectile_sprite: "data/shot.png".into(),
                patrol: None,
                falling_hazards: None,
                generation: GenerationParams::default(),
                thresholds: Thresholds::default(),
                prune_below: None,
            },
            Theme::Ice => Self {
                theme,
                background: "data/background-2.png".into(),
                platform_sprite: "data/ice_platform.png".into(),
                ground_sprite: "data/ice_platform.png".into(),
                platform_friction: 0.05,
                decoration_sprite: Some("data/snow_overlay.png".into()),
                static_hazard_sprite: Some("data/obstacle.png".into()),
                enemy_sprites: frames("ice_enemy", 4),
                projectile_sprite: "data/ice_shot.png".into(),
                patrol: Some(PatrolSpawnRule {
                    trigger: PatrolTrigger::StarsCollected(3),
                    spawn_offset: Vec2::new(0.0, 5.0),
                    config: PatrolConfig {
                        left: -6.0,
                        right: 6.0,
                        walk_left_sprites: frames("ice_left", 5),
                        walk_right_sprites: frames("ice_right", 5),
                        frame_delay_ms: 200.0,
                        mode: PatrolMode::PatrolOnly,
                    },
                }),
                falling_hazards: Some(FallingHazardTheme {
                    sprites: frames("spike", 3),
                    sound: "data/spikeShatter.wav".into(),
                    interval_steps: 200,
                }),
                generation: GenerationParams {
                    decoration: 0.4,
                    static_hazard: 0.15,
                    ..Default::default()
                },
                thresholds: Thresholds::default(),
                prune_below: None,
            },
            Theme::Fire => Self {
                theme,
                background: "data/background3.png".into(),
                platform_sprite: "data/fire_platform.png".into(),
                ground_sprite: "data/fire_platform.png".into(),
                platform_friction: 0.2,
                decoration_sprite: None,
                static_hazard_sprite: None,
                enemy_sprites: frames("fire_enemy", 4),
                projectile_sprite: "data/fireball_small.png".into(),
                patrol: Some(PatrolSpawnRule {
                    trigger: PatrolTrigger::OnLoad,
                    spawn_offset: Vec2::new(0.0, 50.0),
                    config: PatrolConfig {
                        left: -10.0,
                        right: 10.0,
                        walk_left_sprites: frames("fire_left", 1),
                        walk_right_sprites: frames("fire_right", 1),
                        frame_delay_ms: 150.0,
                        mode: PatrolMode::ChasePlayer,
                    },
                }),
                falling_hazards: Some(FallingHazardTheme {
                    sprites: vec!["data/fireball.png".into()],
                    sound: "data/fireSound.wav".into(),
                    interval_steps: 180,
                }),
                generation: GenerationParams::default(),
                thresholds: Thresholds::default(),
                prune_below: None,
            },
        }
    }

    /// Parse a theme from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Load a theme from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the theme can build a level. Failures are fatal at load time.
    pub fn validate(&self) -> Result<(), GameError> {
        let missing = |set: &'static str| GameError::MissingSprites {
            theme: self.theme.as_str().to_string(),
            set,
        };

        if self.enemy_sprites.is_empty() {
            return Err(missing("enemy"));
        }
        if self
            .falling_hazards
            .as_ref()
            .is_some_and(|hazards| hazards.sprites.is_empty())
        {
            return Err(missing("falling hazard"));
        }
        if let Some(rule) = &self.patrol {
            if rule.config.walk_left_sprites.is_empty() {
                return Err(missing("patrol walk-left"));
            }
            if rule.config.walk_right_sprites.is_empty() {
                return Err(missing("patrol walk-right"));
            }
        }
        if self.generation.decoration > 0.0 && self.decoration_sprite.is_none() {
            return Err(missing("decoration"));
        }
        if self.generation.static_hazard > 0.0 && self.static_hazard_sprite.is_none() {
            return Err(missing("static hazard"));
        }

        let gen_params = &self.generation;
        for (name, value) in [
            ("moving_platform", gen_params.moving_platform),
            ("enemy", gen_params.enemy),
            ("star", gen_params.star),
            ("decoration", gen_params.decoration),
            ("static_hazard", gen_params.static_hazard),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GameError::InvalidProbability { name, value });
            }
        }

        if self.thresholds.hazards_at == 0 {
            return Err(GameError::InvalidThreshold { name: "hazards_at" });
        }
        if self.thresholds.level_complete_at == 0 {
            return Err(GameError::InvalidThreshold {
                name: "level_complete_at",
            });
        }
        Ok(())
    }
}

impl Default for ThemeParams {
    fn default() -> Self {
        Self::preset(Theme::Factory)
    }
}
