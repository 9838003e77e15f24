//! Collision-driven game state
//!
//! Health, stars and the level phase. Every transition the shell cares about
//! is latched here so it is reported exactly once, however many contacts
//! arrive in the same step.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entities::Player;
use super::observer::{GameObserver, SoundCue};
use crate::theme::Thresholds;

/// Current phase of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Star threshold reached; the shell is expected to load the next level
    LevelComplete,
    /// Player ran out of health
    GameOver,
    /// Torn down by the shell
    Stopped,
}

/// Result of one damaging contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Hurt { health: u8 },
    GameOver,
    /// The level is no longer being played
    Ignored,
}

/// Thresholds crossed by one star pickup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StarOutcome {
    pub stars: u32,
    pub hazards_enabled: bool,
    pub level_complete: bool,
}

/// Level-wide state outside the entity arena
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Single source of randomness for generation and spawning
    pub rng: Pcg32,
    pub phase: GamePhase,
    /// Simulation steps since the level started
    pub step_count: u64,
    pub thresholds: Thresholds,
    hazards_latched: bool,
}

impl GameState {
    pub fn new(seed: u64, thresholds: Thresholds) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Playing,
            step_count: 0,
            thresholds,
            hazards_latched: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    /// Take one point of health. The last point is never removed; losing it
    /// ends the game instead.
    pub fn damage(
        &mut self,
        player: &mut Player,
        observer: &mut dyn GameObserver,
    ) -> DamageOutcome {
        if !self.is_playing() {
            return DamageOutcome::Ignored;
        }

        if player.health > 1 {
            player.health -= 1;
            observer.on_health_changed(player.health);
            observer.play_sound(&SoundCue::Hit);
            log::debug!("Player hit, health {}", player.health);
            DamageOutcome::Hurt {
                health: player.health,
            }
        } else {
            self.phase = GamePhase::GameOver;
            log::info!("Game over after {} steps", self.step_count);
            observer.on_game_over();
            DamageOutcome::GameOver
        }
    }

    /// Count a collected star and evaluate the hazard and level thresholds
    pub fn collect_star(
        &mut self,
        player: &mut Player,
        observer: &mut dyn GameObserver,
    ) -> StarOutcome {
        if !self.is_playing() {
            return StarOutcome {
                stars: player.stars,
                ..Default::default()
            };
        }

        player.stars += 1;
        observer.on_score_changed(player.stars);
        observer.play_sound(&SoundCue::StarCollected);

        let mut outcome = StarOutcome {
            stars: player.stars,
            ..Default::default()
        };

        if !self.hazards_latched && player.stars >= self.thresholds.hazards_at {
            self.hazards_latched = true;
            outcome.hazards_enabled = true;
            log::info!("Falling hazards enabled at {} stars", player.stars);
        }

        if player.stars >= self.thresholds.level_complete_at {
            self.phase = GamePhase::LevelComplete;
            outcome.level_complete = true;
            log::info!("Level complete with {} stars", player.stars);
            observer.on_level_complete();
        }
        outcome
    }

    pub fn stop(&mut self) {
        self.phase = GamePhase::Stopped;
    }
}
