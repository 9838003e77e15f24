//! Procedural terrain generation
//!
//! Plans platform batches ahead of the player. Planning is pure apart from the
//! injected RNG; the world turns each [`PlatformSpawn`] into bodies.

use glam::Vec2;
use rand::Rng;

use crate::consts::*;
use crate::theme::ThemeParams;

/// One planned platform and what rides on it
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSpawn {
    pub position: Vec2,
    /// Signed oscillation speed for moving platforms
    pub speed: Option<f32>,
    pub friction: f32,
    pub decorated: bool,
    /// Stationary enemy position, if one was rolled
    pub enemy: Option<Vec2>,
    /// Static hazard position, if one was rolled
    pub static_hazard: Option<Vec2>,
}

/// Uniform x across the walkable width
pub fn random_x(rng: &mut impl Rng) -> f32 {
    rng.random_range(WALKABLE_MIN_X..WALKABLE_MAX_X)
}

/// Probability gate. `p >= 1.0` always passes, `p <= 0.0` never does.
pub fn roll(rng: &mut impl Rng, p: f32) -> bool {
    rng.random::<f32>() < p
}

/// Generation watermark and batch planner
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    frontier: f32,
    batches: u64,
}

impl Default for TerrainGenerator {
    fn default() -> Self {
        Self::new(INITIAL_FRONTIER)
    }
}

impl TerrainGenerator {
    pub fn new(frontier: f32) -> Self {
        Self {
            frontier,
            batches: 0,
        }
    }

    /// Highest platform y generated so far
    pub fn frontier(&self) -> f32 {
        self.frontier
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Whether the player is close enough to the frontier to need more terrain
    pub fn needs_batch(&self, altitude: f32) -> bool {
        altitude > self.frontier - GENERATION_MARGIN
    }

    /// Plan one batch if the player has crossed the margin; otherwise do
    /// nothing. Every platform of the batch sits at least one step above the
    /// previous frontier, and the frontier becomes the highest of them.
    pub fn advance(
        &mut self,
        altitude: f32,
        params: &ThemeParams,
        rng: &mut impl Rng,
    ) -> Vec<PlatformSpawn> {
        if !self.needs_batch(altitude) {
            return Vec::new();
        }

        let base = self.frontier;
        let batch: Vec<PlatformSpawn> = (0..PLATFORM_BATCH)
            .map(|_| Self::plan_platform(base, params, rng))
            .collect();

        self.frontier = batch
            .iter()
            .map(|p| p.position.y)
            .fold(self.frontier, f32::max);
        self.batches += 1;

        log::debug!(
            "Platform batch {}: {} platforms, frontier {:.2} -> {:.2}",
            self.batches,
            batch.len(),
            base,
            self.frontier
        );
        batch
    }

    fn plan_platform(base: f32, params: &ThemeParams, rng: &mut impl Rng) -> PlatformSpawn {
        let gen_params = &params.generation;

        let x = random_x(rng);
        let y = base + PLATFORM_STEP + rng.random_range(0.0..PLATFORM_JITTER);
        let position = Vec2::new(x, y);

        let speed = roll(rng, gen_params.moving_platform).then_some(PLATFORM_SPEED);

        let decorated = roll(rng, gen_params.decoration);
        let friction = if decorated {
            DECORATION_FRICTION
        } else {
            params.platform_friction
        };

        let static_hazard = roll(rng, gen_params.static_hazard).then(|| {
            let side = if rng.random_bool(0.5) { -1.0 } else { 1.0 };
            position + Vec2::new(side * STATIC_SPIKE_OFFSET.x, STATIC_SPIKE_OFFSET.y)
        });

        let enemy =
            roll(rng, gen_params.enemy).then(|| position + Vec2::new(0.0, ENEMY_PLATFORM_OFFSET));

        PlatformSpawn {
            position,
            speed,
            friction,
            decorated,
            enemy,
            static_hazard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_first_batch_from_initial_frontier() {
        let mut terrain = TerrainGenerator::default();
        let mut rng = Pcg32::seed_from_u64(7);
        let params = ThemeParams::default();

        let batch = terrain.advance(0.0, &params, &mut rng);
        assert_eq!(batch.len(), 5);
        for platform in &batch {
            assert!(platform.position.y >= -2.0 && platform.position.y < 1.0);
            assert!(platform.position.x >= WALKABLE_MIN_X && platform.position.x < WALKABLE_MAX_X);
        }
        let highest = batch.iter().map(|p| p.position.y).fold(f32::MIN, f32::max);
        assert_eq!(terrain.frontier(), highest);
    }

    #[test]
    fn test_idempotent_below_margin() {
        let mut terrain = TerrainGenerator::new(20.0);
        let mut rng = Pcg32::seed_from_u64(1);
        let params = ThemeParams::default();

        assert!(terrain.advance(15.0, &params, &mut rng).is_empty());
        assert!(terrain.advance(10.0, &params, &mut rng).is_empty());
        assert_eq!(terrain.frontier(), 20.0);
        assert_eq!(terrain.batches(), 0);
    }

    #[test]
    fn test_forced_enemies_sit_on_platforms() {
        let mut terrain = TerrainGenerator::default();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut params = ThemeParams::default();
        params.generation.enemy = 1.0;

        let batch = terrain.advance(0.0, &params, &mut rng);
        for platform in batch {
            let enemy = platform.enemy.expect("enemy forced on every platform");
            assert_eq!(enemy, platform.position + Vec2::new(0.0, ENEMY_PLATFORM_OFFSET));
        }
    }

    #[test]
    fn test_ice_only_features() {
        let mut rng = Pcg32::seed_from_u64(11);

        let mut factory = TerrainGenerator::default();
        let params = ThemeParams::preset(Theme::Factory);
        for i in 0..20 {
            for p in factory.advance(factory.frontier() + i as f32, &params, &mut rng) {
                assert!(!p.decorated);
                assert!(p.static_hazard.is_none());
                assert_eq!(p.friction, params.platform_friction);
            }
        }

        let mut ice = TerrainGenerator::default();
        let mut params = ThemeParams::preset(Theme::Ice);
        params.generation.decoration = 1.0;
        params.generation.static_hazard = 1.0;
        for p in ice.advance(0.0, &params, &mut rng) {
            assert!(p.decorated);
            assert_eq!(p.friction, DECORATION_FRICTION);
            let spike = p.static_hazard.unwrap();
            assert!(((spike.x - p.position.x).abs() - STATIC_SPIKE_OFFSET.x).abs() < 1e-4);
            assert_eq!(spike.y, p.position.y + STATIC_SPIKE_OFFSET.y);
        }
    }

    proptest! {
        #[test]
        fn prop_frontier_strictly_rises(seed in any::<u64>(), frontier in -50.0f32..500.0, lead in 0.0f32..100.0) {
            let mut terrain = TerrainGenerator::new(frontier);
            let mut rng = Pcg32::seed_from_u64(seed);
            let params = ThemeParams::default();
            let altitude = frontier - GENERATION_MARGIN + 0.01 + lead;

            let batch = terrain.advance(altitude, &params, &mut rng);
            prop_assert_eq!(batch.len(), PLATFORM_BATCH);
            prop_assert!(terrain.frontier() > frontier);
            for p in &batch {
                prop_assert!(p.position.y >= frontier + PLATFORM_STEP);
                prop_assert!(p.position.y <= terrain.frontier());
            }
        }
    }
}
