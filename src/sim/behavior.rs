//! Entity behaviour
//!
//! Frame cycling, enemy aiming, and the patrol/chase state machine. These are
//! pure updates on entity data; the world decides when they run and applies
//! the resulting velocities and spawns.

use glam::Vec2;

use super::entities::{Enemy, Facing, PatrolEnemy, PatrolMode, PatrolState};
use crate::consts::*;
use crate::{aim, signed};

/// Next frame index with wraparound
#[inline]
pub fn next_frame(frame: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (frame + 1) % len }
}

impl Enemy {
    pub fn advance_frame(&mut self) {
        self.frame = next_frame(self.frame, self.sprites.len());
    }

    /// Count down one step. True on the step the enemy should fire.
    pub fn tick_attack(&mut self) -> bool {
        self.attack_countdown = self.attack_countdown.saturating_sub(1);
        if self.attack_countdown == 0 {
            self.attack_countdown = ENEMY_ATTACK_STEPS;
            true
        } else {
            false
        }
    }

    /// Projectile spawn point and velocity for a shot at `target`.
    /// The aim is taken from the enemy's centre; the shot leaves from its mouth.
    pub fn attack(&self, target: Vec2) -> (Vec2, Vec2) {
        (self.mouth(), aim(self.position, target, PROJECTILE_SPEED))
    }
}

impl PatrolEnemy {
    pub fn advance_frame(&mut self) {
        self.frame = next_frame(self.frame, self.frames().len());
    }

    /// Velocity for this step given the enemy's and the player's positions
    pub fn think(&mut self, position: Vec2, velocity: Vec2, player: Vec2) -> Vec2 {
        match self.config.mode {
            PatrolMode::PatrolOnly => self.patrol(position, velocity, player),
            PatrolMode::ChasePlayer => {
                let delta = player - position;
                self.facing = Facing::toward(delta.x);
                Vec2::new(
                    signed(delta.x, CHASE_VELOCITY.x),
                    signed(delta.y, CHASE_VELOCITY.y),
                )
            }
        }
    }

    fn patrol(&mut self, position: Vec2, velocity: Vec2, player: Vec2) -> Vec2 {
        let (left, right) = (self.config.left, self.config.right);
        let x = position.x;

        // Outside the bounds the walker stops for good
        if x < left || x > right {
            return Vec2::new(0.0, velocity.y);
        }

        let vx = match self.state() {
            PatrolState::Chasing => {
                let dx = player.x - x;
                self.facing = Facing::toward(dx);
                signed(dx, PATROL_WALK_SPEED)
            }
            PatrolState::Patrolling => {
                if x <= left + PATROL_TURN_MARGIN {
                    self.facing = Facing::Right;
                    PATROL_WALK_SPEED
                } else if x >= right - PATROL_TURN_MARGIN {
                    self.facing = Facing::Left;
                    -PATROL_WALK_SPEED
                } else if velocity.x == 0.0 {
                    // Set off toward the nearer bound
                    if x - left <= right - x {
                        self.facing = Facing::Left;
                        -PATROL_WALK_SPEED
                    } else {
                        self.facing = Facing::Right;
                        PATROL_WALK_SPEED
                    }
                } else {
                    velocity.x
                }
            }
        };
        Vec2::new(vx, velocity.y)
    }
}
