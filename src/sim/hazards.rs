//! Star and falling-hazard spawning
//!
//! Both are altitude- or step-gated rolls against the theme. The spawner only
//! plans positions; the world queues the actual spawns.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::terrain::{random_x, roll};
use crate::consts::*;
use crate::theme::ThemeParams;

/// A falling hazard ready to be queued
#[derive(Debug, Clone, PartialEq)]
pub struct FallingSpawn {
    pub position: Vec2,
    pub sprite: String,
    pub sound: String,
}

#[derive(Debug, Clone)]
pub struct CollectibleSpawner {
    last_star_altitude: f32,
    hazards_enabled: bool,
    hazard_steps: u32,
}

impl Default for CollectibleSpawner {
    fn default() -> Self {
        Self {
            last_star_altitude: STAR_FIRST_GATE,
            hazards_enabled: false,
            hazard_steps: 0,
        }
    }
}

impl CollectibleSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Altitude of the last star gate crossing
    pub fn last_star_altitude(&self) -> f32 {
        self.last_star_altitude
    }

    /// Star position if the player has climbed past the next gate and the
    /// probability roll passes. Crossing the gate consumes it either way.
    pub fn poll_star(
        &mut self,
        altitude: f32,
        params: &ThemeParams,
        rng: &mut impl Rng,
    ) -> Option<Vec2> {
        if altitude <= self.last_star_altitude + STAR_SPAWN_INTERVAL {
            return None;
        }
        self.last_star_altitude = altitude;
        if !roll(rng, params.generation.star) {
            log::trace!("Star roll failed at altitude {altitude:.2}");
            return None;
        }
        Some(Vec2::new(random_x(rng), altitude + STAR_SPAWN_HEIGHT))
    }

    pub fn hazards_enabled(&self) -> bool {
        self.hazards_enabled
    }

    /// Start dropping hazards. Later calls are no-ops.
    pub fn enable_hazards(&mut self) {
        if !self.hazards_enabled {
            self.hazards_enabled = true;
            self.hazard_steps = 0;
        }
    }

    /// Count one step; on the theme's interval, plan a hazard above the player
    pub fn tick_hazards(
        &mut self,
        player: Vec2,
        params: &ThemeParams,
        rng: &mut impl Rng,
    ) -> Option<FallingSpawn> {
        if !self.hazards_enabled {
            return None;
        }
        let theme = params.falling_hazards.as_ref()?;
        self.hazard_steps += 1;
        if self.hazard_steps < theme.interval_steps.max(1) {
            return None;
        }
        self.hazard_steps = 0;

        let sprite = theme.sprites.choose(rng)?.clone();
        Some(FallingSpawn {
            position: Vec2::new(random_x(rng), player.y + FALLING_HAZARD_HEIGHT),
            sprite,
            sound: theme.sound.clone(),
        })
    }
}
