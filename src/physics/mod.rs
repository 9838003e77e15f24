//! Rigid body world
//!
//! Axis-aligned boxes on a fixed step. Dynamic bodies fall and are pushed out
//! of solid static/kinematic bodies; every step returns contact-begin and
//! sensor begin/end events for the game layer to interpret.

pub mod types;
pub mod world;

pub use types::*;
pub use world::PhysicsWorld;
