//! The game world
//!
//! [`GameWorld`] is the stepper. It exclusively owns the physics world and the
//! entity arena; everything else refers to entities by [`EntityId`]. One call to
//! [`GameWorld::step`] runs, in order:
//!
//! 1. player input
//! 2. pre-step hooks (behaviour, attack and hazard timers, respawn checks), which
//!    only queue commands or set velocities
//! 3. a single drain of the command queue
//! 4. the physics step
//! 5. collision dispatch, which may retire entities and queue their removal
//!    for the next drain
//! 6. player sync and animation timers

use glam::Vec2;
use slotmap::{SecondaryMap, SlotMap};

use super::camera::camera_centre;
use super::commands::{Command, CommandQueue, CommandSender};
use super::entities::*;
use super::hazards::CollectibleSpawner;
use super::observer::{GameObserver, SoundCue};
use super::scheduler::Scheduler;
use super::state::{GamePhase, GameState};
use super::terrain::{PlatformSpawn, TerrainGenerator};
use crate::consts::*;
use crate::error::{GameError, StaleEntity};
use crate::physics::{
    BodyDesc, BodyHandle, ContactEvent, LayerMask, PhysicsConfig, PhysicsWorld, layers,
};
use crate::theme::{PatrolTrigger, ThemeParams};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held walking direction, if any
    pub walk: Option<Facing>,
    /// Jump pressed this tick
    pub jump: bool,
}

/// Patrol enemy waiting for the player to climb
#[derive(Debug, Clone)]
struct PendingRespawn {
    altitude: f32,
    config: PatrolConfig,
}

/// What an entity does when it touches something
enum ContactRole {
    Projectile,
    FallingHazard(Option<String>),
    StaticHazard,
    Patrol(PatrolConfig),
    Enemy,
    Star,
}

pub struct GameWorld {
    params: ThemeParams,
    physics: PhysicsWorld,
    entities: SlotMap<EntityId, Entity>,
    owners: SecondaryMap<BodyHandle, EntityId>,
    player: Player,
    state: GameState,
    terrain: TerrainGenerator,
    spawner: CollectibleSpawner,
    scheduler: Scheduler,
    queue: CommandQueue,
    observer: Box<dyn GameObserver>,
    respawns: Vec<PendingRespawn>,
    patrol_spawned: bool,
}

impl GameWorld {
    /// Build a level. Fails if the theme cannot supply every sprite set it needs.
    pub fn new(
        params: ThemeParams,
        seed: u64,
        observer: Box<dyn GameObserver>,
    ) -> Result<Self, GameError> {
        params.validate()?;

        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut entities: SlotMap<EntityId, Entity> = SlotMap::with_key();
        let mut owners = SecondaryMap::new();

        let body = physics.create_body(
            BodyDesc::dynamic(PLAYER_SPAWN, PLAYER_HALF_EXTENTS)
                .with_gravity_scale(PLAYER_GRAVITY_SCALE)
                .with_mask(LayerMask::simple(layers::PLAYER, layers::ALL)),
        );
        let entity = entities.insert(Entity::new(EntityKind::Player, body));
        owners.insert(body, entity);

        let mut world = Self {
            state: GameState::new(seed, params.thresholds),
            params,
            physics,
            entities,
            owners,
            player: Player::new(entity, body, PLAYER_SPAWN),
            terrain: TerrainGenerator::default(),
            spawner: CollectibleSpawner::new(),
            scheduler: Scheduler::new(),
            queue: CommandQueue::new(),
            observer,
            respawns: Vec::new(),
            patrol_spawned: false,
        };

        world.build_boundaries();
        world.scheduler.every(entity, PLAYER_FRAME_MS);

        let on_load = world
            .params
            .patrol
            .as_ref()
            .filter(|rule| rule.trigger == PatrolTrigger::OnLoad)
            .map(|rule| (rule.spawn_offset, rule.config.clone()));
        if let Some((offset, config)) = on_load {
            world.spawn_patrol(PLAYER_SPAWN + offset, config);
            world.patrol_spawned = true;
        }

        log::info!(
            "Created {} level (seed {seed}, {} bodies)",
            world.params.theme.as_str(),
            world.physics.body_count()
        );
        Ok(world)
    }

    // === Shell-facing API ===

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn params(&self) -> &ThemeParams {
        &self.params
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn terrain(&self) -> &TerrainGenerator {
        &self.terrain
    }

    /// Highest platform generated so far
    pub fn frontier(&self) -> f32 {
        self.terrain.frontier()
    }

    pub fn hazards_enabled(&self) -> bool {
        self.spawner.hazards_enabled()
    }

    /// Producer handle for other threads. Their commands apply at the next step.
    pub fn command_sender(&self) -> CommandSender {
        self.queue.sender()
    }

    /// Where the shell should centre the view, if it should move at all
    pub fn camera(&self) -> Option<Vec2> {
        camera_centre(self.player.position)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id).filter(|e| e.alive)
    }

    /// Live entities with their current positions
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity, Vec2)> + '_ {
        self.entities.iter().filter(|(_, e)| e.alive).filter_map(|(id, e)| {
            self.physics
                .position(e.body)
                .map(|position| (id, e, position))
        })
    }

    /// Number of live entities matching `filter`
    pub fn count(&self, filter: impl Fn(&EntityKind) -> bool) -> usize {
        self.entities
            .values()
            .filter(|e| e.alive && filter(&e.kind))
            .count()
    }

    /// Generate terrain and stars for `altitude` right away. A no-op until the
    /// altitude crosses the frontier margin. Returns the platforms added.
    pub fn advance_generation(&mut self, altitude: f32) -> usize {
        self.generate(altitude)
    }

    /// Tear the level down: no more steps, no more callbacks
    pub fn stop(&mut self) {
        if self.state.phase == GamePhase::Stopped {
            return;
        }
        self.state.stop();
        self.scheduler.clear();
        self.respawns.clear();
        self.physics.clear();
        self.owners.clear();
        self.entities.clear();
        self.observer = Box::new(super::observer::NullObserver);
        // Discard anything still queued
        let dropped = self.queue.drain().len();
        log::info!("Level stopped ({dropped} queued commands dropped)");
    }

    /// Advance one fixed step
    pub fn step(&mut self, input: &TickInput) {
        if !self.state.is_playing() {
            return;
        }
        self.state.step_count += 1;

        self.apply_input(input);
        self.pre_step();
        self.drain_commands();

        let events = self.physics.step();
        self.dispatch(events);

        self.sync_player();

        let mut fired = Vec::new();
        let entities = &self.entities;
        self.scheduler.advance(
            SIM_DT_MS,
            |id| entities.get(id).is_some_and(|e| e.alive),
            &mut fired,
        );
        for command in fired {
            self.queue.push(command);
        }
    }

    // === Step stages ===

    fn apply_input(&mut self, input: &TickInput) {
        let body = self.player.body;
        let velocity = self.physics.velocity(body).unwrap_or(Vec2::ZERO);

        match input.walk {
            Some(facing) => {
                let speed = match facing {
                    Facing::Left => -PLAYER_WALK_SPEED,
                    Facing::Right => PLAYER_WALK_SPEED,
                };
                self.player.start_walking(speed);
                self.physics
                    .set_velocity(body, Vec2::new(speed, velocity.y));
            }
            None => {
                if self.player.walk_speed.is_some() {
                    self.player.stop_walking();
                    self.physics.set_velocity(body, Vec2::new(0.0, velocity.y));
                }
            }
        }

        if input.jump {
            if let Some(vy) = self.player.jump(PLAYER_JUMP_SPEED) {
                let vx = self.physics.velocity(body).map_or(0.0, |v| v.x);
                self.physics.set_velocity(body, Vec2::new(vx, vy));
            }
        }
    }

    fn pre_step(&mut self) {
        let player_pos = self.player.position;

        self.queue.push(Command::AdvanceGeneration {
            altitude: self.player.altitude(),
        });

        for (id, entity) in self.entities.iter_mut() {
            if !entity.alive {
                continue;
            }
            match &mut entity.kind {
                EntityKind::Platform(platform) => {
                    let Some(speed) = platform.speed else {
                        continue;
                    };
                    let Some(x) = self.physics.position(entity.body).map(|p| p.x) else {
                        continue;
                    };
                    if (x >= WALKABLE_MAX_X && speed > 0.0) || (x <= WALKABLE_MIN_X && speed < 0.0)
                    {
                        platform.speed = Some(-speed);
                        self.physics
                            .set_velocity(entity.body, Vec2::new(-speed, 0.0));
                    }
                }
                EntityKind::Enemy(enemy) => {
                    if enemy.tick_attack() {
                        self.queue.push(Command::EnemyAttack { enemy: id });
                    }
                }
                EntityKind::Patrol(patrol) => {
                    let (Some(position), Some(velocity)) = (
                        self.physics.position(entity.body),
                        self.physics.velocity(entity.body),
                    ) else {
                        continue;
                    };
                    let next = patrol.think(position, velocity, player_pos);
                    self.physics.set_velocity(entity.body, next);
                }
                _ => {}
            }
        }

        if let Some(hazard) =
            self.spawner
                .tick_hazards(player_pos, &self.params, &mut self.state.rng)
        {
            self.queue.push(Command::SpawnFallingHazard {
                position: hazard.position,
                sprite: hazard.sprite,
                sound: hazard.sound,
            });
        }

        let altitude = self.player.altitude();
        let queue = &self.queue;
        self.respawns.retain(|pending| {
            if altitude < pending.altitude {
                return true;
            }
            queue.push(Command::SpawnPatrol {
                position: player_pos + PATROL_RESPAWN_OFFSET,
                config: pending.config.clone(),
            });
            false
        });

        if !self.patrol_spawned {
            let triggered = self.params.patrol.as_ref().filter(|rule| {
                matches!(rule.trigger, PatrolTrigger::StarsCollected(n) if self.player.stars >= n)
            });
            if let Some(rule) = triggered {
                self.queue.push(Command::SpawnPatrol {
                    position: player_pos + rule.spawn_offset,
                    config: rule.config.clone(),
                });
                self.patrol_spawned = true;
            }
        }
    }

    /// Apply everything queued. Generation requests are coalesced to the
    /// highest altitude and run once, after the other commands.
    fn drain_commands(&mut self) {
        let mut generation: Option<f32> = None;
        for command in self.queue.drain() {
            if let Command::AdvanceGeneration { altitude } = command {
                generation = Some(generation.map_or(altitude, |g| g.max(altitude)));
                continue;
            }
            log::trace!("Applying {command:?}");
            if let Err(stale) = self.apply(command) {
                log::debug!("Dropped command: {stale}");
            }
        }
        if let Some(altitude) = generation {
            self.generate(altitude);
        }
    }

    fn dispatch(&mut self, events: Vec<ContactEvent>) {
        for event in events {
            match event {
                ContactEvent::CollisionBegin { a, b } => {
                    let (Some(&ea), Some(&eb)) = (self.owners.get(a), self.owners.get(b)) else {
                        continue;
                    };
                    // Liveness is taken before either side reacts, so a pair
                    // that destroys each other is fully handled
                    let a_live = self.entity(ea).is_some();
                    let b_live = self.entity(eb).is_some();
                    if a_live {
                        self.resolve_contact(ea, eb);
                    }
                    if b_live {
                        self.resolve_contact(eb, ea);
                    }
                }
                ContactEvent::SensorBegin { owner, other, .. } => {
                    if other != self.player.body {
                        continue;
                    }
                    let Some(&id) = self.owners.get(owner) else {
                        continue;
                    };
                    if let Some(Entity {
                        kind: EntityKind::Patrol(patrol),
                        alive: true,
                        ..
                    }) = self.entities.get_mut(id)
                    {
                        if patrol.state() == PatrolState::Patrolling {
                            log::debug!("Patrol {id:?} spotted the player");
                        }
                        patrol.latch_chase();
                    }
                }
                // Leaving the sensor never ends a chase
                ContactEvent::SensorEnd { .. } => {}
            }
        }
    }

    /// Apply `me`'s side of a contact with `other`. `me` was alive when the
    /// contact began; `other` may already have retired itself.
    fn resolve_contact(&mut self, me: EntityId, other: EntityId) {
        let (Some(me_entity), Some(other_entity)) = (self.entities.get(me), self.entities.get(other))
        else {
            return;
        };
        let hits_player = other == self.player.entity;
        let hits_enemy = other_entity.kind.is_enemy();
        let hits_solid = self
            .physics
            .body(other_entity.body)
            .is_some_and(|body| body.solid);

        let role = match &me_entity.kind {
            EntityKind::Projectile(_) => ContactRole::Projectile,
            EntityKind::Hazard(hazard) => match hazard.kind {
                HazardKind::Falling => ContactRole::FallingHazard(hazard.sound.clone()),
                HazardKind::Static => ContactRole::StaticHazard,
            },
            EntityKind::Patrol(patrol) => ContactRole::Patrol(patrol.config.clone()),
            EntityKind::Enemy(_) => ContactRole::Enemy,
            EntityKind::Star => ContactRole::Star,
            _ => return,
        };

        match role {
            ContactRole::Projectile => {
                if hits_player {
                    self.damage_player();
                }
                if !hits_enemy {
                    self.retire(me);
                }
            }
            ContactRole::FallingHazard(sound) => {
                // Enemies and non-solid bodies (shots, pursuers) fall through
                if hits_enemy || !hits_solid {
                    return;
                }
                if hits_player {
                    self.damage_player();
                }
                if let Some(clip) = sound {
                    self.observer
                        .play_sound(&SoundCue::HazardImpact { clip });
                }
                self.retire(me);
            }
            ContactRole::StaticHazard => {
                if hits_player {
                    self.damage_player();
                    self.retire(me);
                }
            }
            ContactRole::Patrol(config) => {
                if hits_player {
                    self.damage_player();
                    self.retire(me);
                    let altitude = self.player.altitude() + PATROL_RESPAWN_CLIMB;
                    log::info!("Patrol destroyed, respawn at altitude {altitude:.1}");
                    self.respawns.push(PendingRespawn { altitude, config });
                }
            }
            ContactRole::Enemy => {
                if hits_player {
                    self.damage_player();
                }
            }
            ContactRole::Star => {
                if hits_player {
                    self.retire(me);
                    let outcome = self
                        .state
                        .collect_star(&mut self.player, &mut *self.observer);
                    if outcome.hazards_enabled {
                        self.spawner.enable_hazards();
                    }
                }
            }
        }
    }

    fn damage_player(&mut self) {
        self.state
            .damage(&mut self.player, &mut *self.observer);
    }

    /// Mark an entity dead now and remove its body at the next drain
    fn retire(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(id) {
            if entity.alive {
                entity.alive = false;
                self.queue.push(Command::Destroy { entity: id });
            }
        }
    }

    fn sync_player(&mut self) {
        let Some(body) = self.physics.body(self.player.body) else {
            return;
        };
        let grounded = body.grounded;
        self.player.position = body.position;
        self.player.velocity = body.velocity;
        if grounded && self.player.velocity.y <= 0.0 {
            self.player.land();
        }
    }

    // === Commands ===

    fn live(&self, id: EntityId) -> Result<&Entity, StaleEntity> {
        self.entities
            .get(id)
            .filter(|e| e.alive)
            .ok_or(StaleEntity(id))
    }

    fn apply(&mut self, command: Command) -> Result<(), StaleEntity> {
        match command {
            Command::AdvanceGeneration { altitude } => {
                self.generate(altitude);
            }
            Command::SpawnStar { position } => {
                self.spawn_star(position);
            }
            Command::SpawnFallingHazard {
                position,
                sprite,
                sound,
            } => {
                self.spawn_falling_hazard(position, sprite, sound);
            }
            Command::SpawnPatrol { position, config } => {
                self.spawn_patrol(position, config);
            }
            Command::EnemyAttack { enemy } => {
                let EntityKind::Enemy(shooter) = &self.live(enemy)?.kind else {
                    return Err(StaleEntity(enemy));
                };
                let (origin, velocity) = shooter.attack(self.player.position);
                let sprite = shooter.projectile_sprite.clone();
                log::debug!("Enemy {enemy:?} fires from {origin} at {velocity}");
                self.spawn_projectile(origin, velocity, sprite);
            }
            Command::AdvanceAnimation { entity } => {
                if entity == self.player.entity {
                    self.player.advance_frame();
                    return Ok(());
                }
                self.live(entity)?;
                if let Some(target) = self.entities.get_mut(entity) {
                    match &mut target.kind {
                        EntityKind::Enemy(enemy) => enemy.advance_frame(),
                        EntityKind::Patrol(patrol) => patrol.advance_frame(),
                        _ => {}
                    }
                }
            }
            Command::SetVelocity { entity, velocity } => {
                let body = self.live(entity)?.body;
                self.physics.set_velocity(body, velocity);
            }
            Command::Destroy { entity } => {
                if entity == self.player.entity {
                    log::warn!("Ignoring request to destroy the player");
                    return Ok(());
                }
                let removed = self.entities.remove(entity).ok_or(StaleEntity(entity))?;
                self.owners.remove(removed.body);
                self.physics.destroy_body(removed.body);
                log::trace!("Destroyed {} {entity:?}", removed.kind.name());
            }
        }
        Ok(())
    }

    // === Generation and spawning ===

    fn generate(&mut self, altitude: f32) -> usize {
        let batch = self
            .terrain
            .advance(altitude, &self.params, &mut self.state.rng);
        let added = batch.len();
        for spawn in batch {
            self.spawn_platform(spawn);
        }

        if let Some(position) = self
            .spawner
            .poll_star(altitude, &self.params, &mut self.state.rng)
        {
            log::debug!("Star at {position}");
            self.spawn_star(position);
        }

        if added > 0 {
            self.prune();
        }
        added
    }

    /// Retire terrain far below the player, if the theme asks for it
    fn prune(&mut self) {
        let Some(distance) = self.params.prune_below else {
            return;
        };
        let cutoff = self.player.altitude() - distance;
        let stale: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| {
                e.alive
                    && matches!(
                        e.kind,
                        EntityKind::Platform(_)
                            | EntityKind::Hazard(Hazard {
                                kind: HazardKind::Static,
                                ..
                            })
                    )
            })
            .filter(|(_, e)| self.physics.position(e.body).is_some_and(|p| p.y < cutoff))
            .map(|(id, _)| id)
            .collect();
        if !stale.is_empty() {
            log::debug!("Pruning {} bodies below {cutoff:.1}", stale.len());
        }
        for id in stale {
            self.retire(id);
        }
    }

    fn insert(&mut self, kind: EntityKind, desc: BodyDesc) -> EntityId {
        let body = self.physics.create_body(desc);
        let id = self.entities.insert(Entity::new(kind, body));
        self.owners.insert(body, id);
        id
    }

    fn build_boundaries(&mut self) {
        for x in [-WALL_X, WALL_X] {
            self.insert(
                EntityKind::Boundary,
                BodyDesc::fixed(Vec2::new(x, WALL_CENTRE_Y), WALL_HALF_EXTENTS).with_friction(0.0),
            );
        }

        let tile_half = Vec2::new(GROUND_TILE_WIDTH / 2.0, 0.5);
        for i in 0..GROUND_TILES {
            let x = GROUND_FIRST_X + i as f32 * GROUND_TILE_WIDTH;
            self.insert(
                EntityKind::Boundary,
                BodyDesc::fixed(Vec2::new(x, GROUND_Y), tile_half)
                    .with_friction(self.params.platform_friction),
            );
        }

        self.spawn_platform(PlatformSpawn {
            position: FIRST_PLATFORM,
            speed: None,
            friction: self.params.platform_friction,
            decorated: false,
            enemy: None,
            static_hazard: None,
        });
    }

    fn spawn_platform(&mut self, spawn: PlatformSpawn) {
        let desc = match spawn.speed {
            Some(speed) => BodyDesc::kinematic(spawn.position, PLATFORM_HALF_EXTENTS)
                .with_velocity(Vec2::new(speed, 0.0)),
            None => BodyDesc::fixed(spawn.position, PLATFORM_HALF_EXTENTS),
        }
        .with_friction(spawn.friction);

        let decoration = if spawn.decorated {
            self.params.decoration_sprite.clone()
        } else {
            None
        };
        self.insert(
            EntityKind::Platform(Platform {
                speed: spawn.speed,
                friction: spawn.friction,
                sprite: self.params.platform_sprite.clone(),
                decoration,
            }),
            desc,
        );

        if let Some(position) = spawn.enemy {
            self.spawn_enemy(position);
        }
        if let Some(position) = spawn.static_hazard {
            self.spawn_static_hazard(position);
        }
    }

    fn spawn_enemy(&mut self, position: Vec2) -> EntityId {
        let enemy = Enemy::new(
            position,
            self.params.enemy_sprites.clone(),
            self.params.projectile_sprite.clone(),
        );
        let id = self.insert(
            EntityKind::Enemy(enemy),
            BodyDesc::fixed(position, ENEMY_HALF_EXTENTS)
                .with_mask(LayerMask::simple(layers::ENEMY, layers::ALL)),
        );
        self.scheduler.every(id, ENEMY_FRAME_MS);
        id
    }

    fn spawn_static_hazard(&mut self, position: Vec2) -> EntityId {
        let hazard = Hazard {
            kind: HazardKind::Static,
            sprite: self.params.static_hazard_sprite.clone().unwrap_or_default(),
            sound: None,
        };
        self.insert(
            EntityKind::Hazard(hazard),
            BodyDesc::fixed(position, STATIC_SPIKE_HALF_EXTENTS)
                .with_mask(LayerMask::excluding(layers::HAZARD, layers::ENEMY)),
        )
    }

    fn spawn_projectile(&mut self, origin: Vec2, velocity: Vec2, sprite: String) -> EntityId {
        self.insert(
            EntityKind::Projectile(Projectile { sprite }),
            BodyDesc::dynamic(origin, Vec2::splat(PROJECTILE_RADIUS))
                .with_velocity(velocity)
                .non_solid()
                .with_mask(LayerMask::excluding(layers::PROJECTILE, layers::ENEMY)),
        )
    }

    fn spawn_star(&mut self, position: Vec2) -> EntityId {
        self.insert(
            EntityKind::Star,
            BodyDesc::fixed(position, Vec2::splat(STAR_RADIUS))
                .non_solid()
                .with_mask(LayerMask::simple(layers::PICKUP, layers::PLAYER)),
        )
    }

    fn spawn_falling_hazard(&mut self, position: Vec2, sprite: String, sound: String) -> EntityId {
        log::debug!("Falling hazard at {position}");
        self.insert(
            EntityKind::Hazard(Hazard {
                kind: HazardKind::Falling,
                sprite,
                sound: Some(sound),
            }),
            BodyDesc::dynamic(position, FALLING_HAZARD_HALF_EXTENTS)
                .with_gravity_scale(FALLING_HAZARD_GRAVITY_SCALE)
                .non_solid()
                .with_mask(LayerMask::excluding(layers::HAZARD, layers::ENEMY)),
        )
    }

    fn spawn_patrol(&mut self, position: Vec2, config: PatrolConfig) -> EntityId {
        let mask = LayerMask::simple(layers::ENEMY, layers::ALL);
        let desc = match config.mode {
            // Hovers at its spawn height
            PatrolMode::PatrolOnly => BodyDesc::dynamic(position, PATROL_HALF_EXTENTS),
            // Flies straight through terrain
            PatrolMode::ChasePlayer => {
                BodyDesc::dynamic(position, PATROL_HALF_EXTENTS).non_solid()
            }
        }
        .with_gravity_scale(0.0)
        .with_mask(mask);

        let frame_delay = config.frame_delay_ms;
        let sensor_needed = config.mode == PatrolMode::PatrolOnly;
        let sensor_offset = Vec2::new(config.midpoint() - position.x, 0.0);
        let sensor_half = config.sensor_half_extents();

        let id = self.insert(
            EntityKind::Patrol(PatrolEnemy::new(config, None)),
            desc,
        );

        if sensor_needed {
            let body = self.entities.get(id).map(|e| e.body);
            let sensor = body.and_then(|body| {
                self.physics
                    .attach_sensor(body, sensor_offset, sensor_half, layers::PLAYER)
            });
            if let Some(Entity {
                kind: EntityKind::Patrol(patrol),
                ..
            }) = self.entities.get_mut(id)
            {
                patrol.sensor = sensor;
            }
        }

        self.scheduler.every(id, frame_delay);
        log::info!("Patrol enemy spawned at {position}");
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::observer::{EventLog, GameEvent, NullObserver};
    use crate::theme::{Theme, Thresholds};
    use std::thread;

    fn world_with(params: ThemeParams, log: &EventLog) -> GameWorld {
        GameWorld::new(params, 42, Box::new(log.clone())).unwrap()
    }

    fn quiet_params() -> ThemeParams {
        let mut params = ThemeParams::default();
        params.generation.enemy = 0.0;
        params.generation.star = 0.0;
        params.generation.moving_platform = 0.0;
        params
    }

    fn is_enemy(kind: &EntityKind) -> bool {
        matches!(kind, EntityKind::Enemy(_))
    }

    fn is_patrol(kind: &EntityKind) -> bool {
        matches!(kind, EntityKind::Patrol(_))
    }

    #[test]
    fn test_level_construction() {
        let world = GameWorld::new(ThemeParams::default(), 1, Box::new(NullObserver)).unwrap();
        // player + 2 walls + 13 ground tiles + first platform
        assert_eq!(world.physics().body_count(), 17);
        assert_eq!(world.count(|k| matches!(k, EntityKind::Platform(_))), 1);
        assert_eq!(world.frontier(), INITIAL_FRONTIER);
        assert_eq!(world.player().health, PLAYER_MAX_HEALTH);
        assert_eq!(world.phase(), GamePhase::Playing);
        assert_eq!(world.camera(), None);
    }

    #[test]
    fn test_missing_sprites_fail_level_load() {
        let mut params = ThemeParams::preset(Theme::Fire);
        params.enemy_sprites.clear();
        let result = GameWorld::new(params, 1, Box::new(NullObserver));
        assert!(matches!(result, Err(GameError::MissingSprites { .. })));
    }

    #[test]
    fn test_advance_generation_first_batch() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);

        assert_eq!(world.advance_generation(0.0), 5);
        let ys: Vec<f32> = world
            .entities()
            .filter(|(_, e, _)| matches!(e.kind, EntityKind::Platform(_)))
            .map(|(_, _, p)| p.y)
            .filter(|y| *y != FIRST_PLATFORM.y)
            .collect();
        assert_eq!(ys.len(), 5);
        assert!(ys.iter().all(|y| (-2.0..1.0).contains(y)));
        assert_eq!(world.frontier(), ys.iter().copied().fold(f32::MIN, f32::max));

        // Below the margin nothing happens
        assert_eq!(world.advance_generation(-20.0), 0);
    }

    #[test]
    fn test_forced_enemies_round_trip() {
        let log = EventLog::new();
        let mut params = quiet_params();
        params.generation.enemy = 1.0;
        let mut world = world_with(params, &log);

        let added = world.advance_generation(0.0);
        assert_eq!(world.count(is_enemy), added);

        let platforms: Vec<Vec2> = world
            .entities()
            .filter(|(_, e, _)| matches!(e.kind, EntityKind::Platform(_)))
            .map(|(_, _, p)| p)
            .collect();
        for (_, _, enemy) in world.entities().filter(|(_, e, _)| is_enemy(&e.kind)) {
            let below = enemy - Vec2::new(0.0, ENEMY_PLATFORM_OFFSET);
            assert!(platforms.iter().any(|p| (*p - below).length() < 1e-4));
        }
    }

    #[test]
    fn test_static_hazard_hits_once() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let hazard = world.spawn_static_hazard(PLAYER_SPAWN);

        world.step(&TickInput::default());
        assert_eq!(world.player().health, 3);
        assert!(world.entity(hazard).is_none());

        for _ in 0..30 {
            world.step(&TickInput::default());
        }
        assert_eq!(world.player().health, 3);
        assert_eq!(log.count(&GameEvent::HealthChanged(3)), 1);
        assert!(world.entities.get(hazard).is_none());
    }

    #[test]
    fn test_game_over_fires_once() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        world.player.health = 1;
        world.spawn_static_hazard(PLAYER_SPAWN);
        world.spawn_static_hazard(PLAYER_SPAWN + Vec2::new(0.5, 0.0));

        world.step(&TickInput::default());
        assert_eq!(world.phase(), GamePhase::GameOver);
        assert_eq!(world.player().health, 1);

        let steps = world.state().step_count;
        world.step(&TickInput::default());
        assert_eq!(world.state().step_count, steps);
        assert_eq!(log.count(&GameEvent::GameOver), 1);
    }

    #[test]
    fn test_star_completes_level_and_enables_hazards() {
        let log = EventLog::new();
        let mut params = ThemeParams::preset(Theme::Ice);
        params.thresholds = Thresholds {
            hazards_at: 1,
            level_complete_at: 2,
        };
        let mut world = world_with(params, &log);

        world.spawn_star(PLAYER_SPAWN);
        world.step(&TickInput::default());
        assert_eq!(world.player().stars, 1);
        assert!(world.hazards_enabled());
        assert_eq!(world.phase(), GamePhase::Playing);

        world.spawn_star(world.player().position);
        world.step(&TickInput::default());
        assert_eq!(world.player().stars, 2);
        assert_eq!(world.phase(), GamePhase::LevelComplete);
        assert_eq!(log.count(&GameEvent::LevelComplete), 1);
        assert_eq!(log.count(&GameEvent::Sound(SoundCue::StarCollected)), 2);
    }

    #[test]
    fn test_projectile_passes_through_enemies() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let enemy = world.spawn_enemy(Vec2::new(0.0, 20.0));
        let shot = world.spawn_projectile(Vec2::new(0.0, 20.0), Vec2::ZERO, "shot".into());

        world.step(&TickInput::default());
        assert!(world.entity(shot).is_some());
        assert!(world.entity(enemy).is_some());
    }

    #[test]
    fn test_projectile_hits_player() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let shot = world.spawn_projectile(PLAYER_SPAWN, Vec2::ZERO, "shot".into());

        world.step(&TickInput::default());
        assert_eq!(world.player().health, PLAYER_MAX_HEALTH - 1);
        assert!(world.entity(shot).is_none());
        assert_eq!(log.count(&GameEvent::Sound(SoundCue::Hit)), 1);
    }

    #[test]
    fn test_colliding_projectiles_both_break() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let a = world.spawn_projectile(Vec2::new(-8.0, 40.0), Vec2::ZERO, "shot".into());
        let b = world.spawn_projectile(Vec2::new(-8.0, 40.0), Vec2::ZERO, "shot".into());

        world.step(&TickInput::default());
        assert!(world.entity(a).is_none());
        assert!(world.entity(b).is_none());
    }

    #[test]
    fn test_projectile_breaks_on_falling_hazard() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let hazard =
            world.spawn_falling_hazard(Vec2::new(8.0, 40.0), "spike".into(), "crash".into());
        let shot = world.spawn_projectile(Vec2::new(8.0, 40.0), Vec2::ZERO, "shot".into());

        world.step(&TickInput::default());
        assert!(world.entity(shot).is_none());
        // A shot is not solid, so the hazard keeps falling
        assert!(world.entity(hazard).is_some());
        assert!(
            !log.events()
                .iter()
                .any(|e| matches!(e, GameEvent::Sound(SoundCue::HazardImpact { .. })))
        );
    }

    #[test]
    fn test_falling_hazard_hits_player() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let hazard = world.spawn_falling_hazard(PLAYER_SPAWN, "spike".into(), "crash".into());

        world.step(&TickInput::default());
        assert_eq!(world.player().health, PLAYER_MAX_HEALTH - 1);
        assert!(world.entity(hazard).is_none());
        let impact = GameEvent::Sound(SoundCue::HazardImpact {
            clip: "crash".into(),
        });
        assert_eq!(log.count(&impact), 1);

        for _ in 0..10 {
            world.step(&TickInput::default());
        }
        assert_eq!(world.player().health, PLAYER_MAX_HEALTH - 1);
        assert_eq!(log.count(&impact), 1);
    }

    #[test]
    fn test_falling_hazard_breaks_on_terrain() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let hazard = world.spawn_falling_hazard(FIRST_PLATFORM, "spike".into(), "crash".into());

        world.step(&TickInput::default());
        assert!(world.entity(hazard).is_none());
        assert_eq!(world.player().health, PLAYER_MAX_HEALTH);
        let impact = GameEvent::Sound(SoundCue::HazardImpact {
            clip: "crash".into(),
        });
        assert_eq!(log.count(&impact), 1);
    }

    #[test]
    fn test_falling_hazard_passes_through_enemies() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let config = ThemeParams::preset(Theme::Ice)
            .patrol
            .map(|rule| rule.config)
            .unwrap();
        let enemy = world.spawn_enemy(Vec2::new(0.0, 20.0));
        let patrol = world.spawn_patrol(Vec2::new(0.0, 30.0), config);
        let hazards = [
            world.spawn_falling_hazard(Vec2::new(0.0, 20.0), "spike".into(), "crash".into()),
            world.spawn_falling_hazard(Vec2::new(0.0, 30.0), "spike".into(), "crash".into()),
        ];

        world.step(&TickInput::default());
        assert!(world.entity(enemy).is_some());
        assert!(world.entity(patrol).is_some());
        assert!(hazards.iter().all(|h| world.entity(*h).is_some()));
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_enemy_fires_on_its_interval() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        world.spawn_enemy(Vec2::new(5.0, 5.0));

        let projectiles = |w: &GameWorld| w.count(|k| matches!(k, EntityKind::Projectile(_)));
        for _ in 0..ENEMY_ATTACK_STEPS - 1 {
            world.step(&TickInput::default());
        }
        assert_eq!(projectiles(&world), 0);
        world.step(&TickInput::default());
        assert_eq!(projectiles(&world), 1);
    }

    #[test]
    fn test_patrol_latches_chase_from_sensor() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let config = ThemeParams::preset(Theme::Ice)
            .patrol
            .map(|rule| rule.config)
            .unwrap();
        let patrol = world.spawn_patrol(PLAYER_SPAWN + Vec2::new(3.0, 0.0), config);

        world.step(&TickInput::default());
        let Some(EntityKind::Patrol(p)) = world.entity(patrol).map(|e| &e.kind) else {
            panic!("patrol missing");
        };
        assert_eq!(p.state(), PatrolState::Chasing);
    }

    #[test]
    fn test_patrol_respawns_after_climb() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let config = ThemeParams::preset(Theme::Ice)
            .patrol
            .map(|rule| rule.config)
            .unwrap();
        world.spawn_patrol(PLAYER_SPAWN, config);

        world.step(&TickInput::default());
        assert_eq!(world.player().health, 3);
        assert_eq!(world.count(is_patrol), 0);
        assert_eq!(world.respawns.len(), 1);

        let high = world.player().position + Vec2::new(0.0, PATROL_RESPAWN_CLIMB + 10.0);
        world.physics.set_position(world.player.body, high);
        world.step(&TickInput::default());
        world.step(&TickInput::default());
        assert_eq!(world.count(is_patrol), 1);
        assert!(world.respawns.is_empty());
    }

    #[test]
    fn test_ice_patrol_waits_for_stars() {
        let log = EventLog::new();
        let mut params = ThemeParams::preset(Theme::Ice);
        params.generation.enemy = 0.0;
        let mut world = world_with(params, &log);

        world.step(&TickInput::default());
        assert_eq!(world.count(is_patrol), 0);

        world.player.stars = 3;
        world.step(&TickInput::default());
        assert_eq!(world.count(is_patrol), 1);
        world.step(&TickInput::default());
        assert_eq!(world.count(is_patrol), 1);
    }

    #[test]
    fn test_ice_walker_hovers_above_player() {
        let log = EventLog::new();
        let mut params = ThemeParams::preset(Theme::Ice);
        params.generation.enemy = 0.0;
        params.generation.star = 0.0;
        let mut world = world_with(params, &log);

        // Let the player settle on the ground first
        for _ in 0..120 {
            world.step(&TickInput::default());
        }
        world.player.stars = 3;
        let spawn_y = world.player().position.y + 5.0;
        world.step(&TickInput::default());
        assert_eq!(world.count(is_patrol), 1);

        for _ in 0..180 {
            world.step(&TickInput::default());
        }
        let heights: Vec<f32> = world
            .entities()
            .filter(|(_, e, _)| is_patrol(&e.kind))
            .map(|(_, _, p)| p.y)
            .collect();
        assert_eq!(heights.len(), 1);
        assert!((heights[0] - spawn_y).abs() < 1e-3);
        assert_eq!(world.player().health, PLAYER_MAX_HEALTH);
        assert!(world.respawns.is_empty());
    }

    #[test]
    fn test_fire_pursuer_spawns_on_load() {
        let world = GameWorld::new(ThemeParams::preset(Theme::Fire), 3, Box::new(NullObserver))
            .unwrap();
        assert_eq!(world.count(is_patrol), 1);
    }

    #[test]
    fn test_moving_platform_reverses_at_edge() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        world.spawn_platform(PlatformSpawn {
            position: Vec2::new(WALKABLE_MAX_X - 0.01, 40.0),
            speed: Some(PLATFORM_SPEED),
            friction: 0.2,
            decorated: false,
            enemy: None,
            static_hazard: None,
        });

        for _ in 0..3 {
            world.step(&TickInput::default());
        }
        let speeds: Vec<f32> = world
            .entities
            .values()
            .filter_map(|e| match &e.kind {
                EntityKind::Platform(p) => p.speed,
                _ => None,
            })
            .collect();
        assert_eq!(speeds, vec![-PLATFORM_SPEED]);
    }

    #[test]
    fn test_walk_and_jump() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        for _ in 0..120 {
            world.step(&TickInput::default());
        }
        assert_eq!(world.player().movement, MovementState::Idle);

        world.step(&TickInput {
            walk: Some(Facing::Left),
            jump: true,
        });
        assert_eq!(world.player().movement, MovementState::Jumping);
        assert_eq!(world.player().facing, Facing::Left);
        assert!(world.player().velocity.x < 0.0);
        assert!(world.player().velocity.y > PLAYER_JUMP_GATE);

        // Still rising fast: a second jump is ignored
        let vy = world.player().velocity.y;
        world.step(&TickInput {
            walk: None,
            jump: true,
        });
        assert!(world.player().velocity.y < vy);
        assert_eq!(world.player().velocity.x, 0.0);
    }

    #[test]
    fn test_stale_commands_are_dropped() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let enemy = world.spawn_enemy(Vec2::new(0.0, 30.0));
        let sender = world.command_sender();

        sender.destroy(enemy);
        sender.destroy(enemy);
        sender.set_velocity(enemy, Vec2::ONE);
        sender.send(Command::AdvanceAnimation { entity: enemy });
        sender.send(Command::EnemyAttack { enemy });
        world.step(&TickInput::default());

        assert!(world.entity(enemy).is_none());
        assert_eq!(world.count(is_enemy), 0);
        assert_eq!(world.count(|k| matches!(k, EntityKind::Projectile(_))), 0);
        assert!(world.scheduler.len() >= 1);
        world.step(&TickInput::default());
    }

    #[test]
    fn test_generation_from_another_thread_is_coalesced() {
        let log = EventLog::new();
        let mut world = world_with(quiet_params(), &log);
        let handles: Vec<_> = (0..3)
            .map(|i| {
                let sender = world.command_sender();
                thread::spawn(move || {
                    sender.advance_generation(i as f32);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        world.step(&TickInput::default());
        assert_eq!(world.terrain().batches(), 1);
        assert!(world.frontier() > INITIAL_FRONTIER);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = || {
            let mut params = ThemeParams::preset(Theme::Ice);
            params.generation.enemy = 0.5;
            let mut world = GameWorld::new(params, 99, Box::new(NullObserver)).unwrap();
            for i in 0..600 {
                let input = TickInput {
                    walk: if i % 120 < 60 { Some(Facing::Right) } else { None },
                    jump: i % 45 == 0,
                };
                world.step(&input);
                if i == 300 {
                    world.advance_generation(world.frontier());
                }
            }
            (
                world.frontier(),
                world.physics().body_count(),
                world.player().position,
                world.player().health,
            )
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_prune_retires_low_terrain() {
        let log = EventLog::new();
        let mut params = quiet_params();
        params.prune_below = Some(5.0);
        let mut world = world_with(params, &log);

        let first_platform = world
            .entities()
            .find(|(_, _, p)| *p == FIRST_PLATFORM)
            .map(|(id, _, _)| id)
            .unwrap();

        world.player.position = Vec2::new(0.0, 10.0);
        world.advance_generation(10.0);
        assert!(world.entity(first_platform).is_none());
        assert_eq!(world.count(|k| matches!(k, EntityKind::Boundary)), 2 + GROUND_TILES as usize);

        // Removal happens at the next drain
        world.step(&TickInput::default());
        assert!(world.entities.get(first_platform).is_none());
    }

    #[test]
    fn test_stop_detaches_everything() {
        let log = EventLog::new();
        let mut world = world_with(ThemeParams::preset(Theme::Fire), &log);
        world.step(&TickInput::default());
        world.stop();

        assert_eq!(world.phase(), GamePhase::Stopped);
        assert_eq!(world.physics().body_count(), 0);
        assert!(world.scheduler.is_empty());

        let steps = world.state().step_count;
        world.step(&TickInput::default());
        assert_eq!(world.state().step_count, steps);
    }
}
