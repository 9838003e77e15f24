//! Error types
//!
//! Only level-load failures reach the shell. Commands that target an entity
//! destroyed since they were issued produce [`StaleEntity`], which the command
//! drain logs and drops.

use crate::sim::EntityId;

/// Errors surfaced to the shell when a level cannot be built
#[derive(thiserror::Error, Debug)]
pub enum GameError {
    /// A theme is missing a sprite set the level needs
    #[error("theme '{theme}' has no {set} sprites")]
    MissingSprites { theme: String, set: &'static str },

    /// A probability knob outside [0, 1]
    #[error("probability '{name}' must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f32 },

    /// A star threshold of zero would complete the level before it starts
    #[error("star threshold '{name}' must be at least 1")]
    InvalidThreshold { name: &'static str },

    /// Theme config parse error
    #[error("theme config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A command or timer referred to an entity that no longer exists
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("entity {0:?} is no longer alive")]
pub struct StaleEntity(pub EntityId);
