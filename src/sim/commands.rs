//! Command queue
//!
//! Anything that wants to create, destroy, or alter a body from outside the
//! stepper (timers, the generation poller, shell threads, collision handlers)
//! pushes a [`Command`]. The stepper drains the queue once per tick, before the
//! physics step, so body bookkeeping never changes while contacts are resolved.

use std::sync::mpsc::{self, Receiver, Sender};

use glam::Vec2;

use super::entities::{EntityId, PatrolConfig};

/// A deferred world mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Run terrain and star generation for this altitude (coalesced per drain)
    AdvanceGeneration { altitude: f32 },
    SpawnStar { position: Vec2 },
    SpawnFallingHazard {
        position: Vec2,
        sprite: String,
        sound: String,
    },
    SpawnPatrol { position: Vec2, config: PatrolConfig },
    /// Fire the enemy's projectile at the player's current position
    EnemyAttack { enemy: EntityId },
    /// Swap to the entity's next animation frame
    AdvanceAnimation { entity: EntityId },
    SetVelocity { entity: EntityId, velocity: Vec2 },
    Destroy { entity: EntityId },
}

/// Cloneable, thread-safe producer handle
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    /// Queue a command. Returns false once the world is gone.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn advance_generation(&self, altitude: f32) -> bool {
        self.send(Command::AdvanceGeneration { altitude })
    }

    pub fn set_velocity(&self, entity: EntityId, velocity: Vec2) -> bool {
        self.send(Command::SetVelocity { entity, velocity })
    }

    pub fn destroy(&self, entity: EntityId) -> bool {
        self.send(Command::Destroy { entity })
    }
}

/// Multi-producer queue owned by the stepper
#[derive(Debug)]
pub struct CommandQueue {
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Queue from the stepper's own thread
    pub fn push(&self, command: Command) {
        // The receiver lives in `self`, so this cannot fail
        let _ = self.tx.send(command);
    }

    /// Take everything queued so far. Commands pushed while the batch is being
    /// applied land in the next drain.
    pub fn drain(&self) -> Vec<Command> {
        self.rx.try_iter().collect()
    }
}
