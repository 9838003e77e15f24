use glam::Vec2;
use slotmap::new_key_type;

new_key_type! {
    /// Stable handle to a body; stale handles simply fail lookups
    pub struct BodyHandle;
    /// Handle to a sensor volume attached to a body
    pub struct SensorHandle;
}

/// Collision layers
pub mod layers {
    pub const PLAYER: u32 = 1 << 0;
    pub const TERRAIN: u32 = 1 << 1;
    pub const ENEMY: u32 = 1 << 2;
    pub const PROJECTILE: u32 = 1 << 3;
    pub const HAZARD: u32 = 1 << 4;
    pub const PICKUP: u32 = 1 << 5;
    pub const ALL: u32 = u32::MAX;
}

/// Bitmask-based filtering.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayerMask {
    /// Layer(s) this body belongs to.
    pub layer: u32,
    /// Layers this body wants to interact with.
    pub collides_with: u32,
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::simple(layers::TERRAIN, layers::ALL)
    }
}

impl LayerMask {
    pub fn simple(layer: u32, collides_with: u32) -> Self {
        Self {
            layer,
            collides_with,
        }
    }

    /// Everything except the given layers
    pub fn excluding(layer: u32, exclude: u32) -> Self {
        Self::simple(layer, layers::ALL & !exclude)
    }

    /// Mutual consent: both sides must want the other's layer
    pub fn allows(self, other: LayerMask) -> bool {
        (self.collides_with & other.layer) != 0 && (other.collides_with & self.layer) != 0
    }
}

/// How the simulation treats a body
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves
    Static,
    /// Moves by its velocity, never pushed
    Kinematic,
    /// Gravity, velocity, and push-out against solid non-dynamic bodies
    Dynamic,
}

/// Construction parameters for a body
#[derive(Clone, Debug)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec2,
    pub half_extents: Vec2,
    pub velocity: Vec2,
    pub gravity_scale: f32,
    pub friction: f32,
    /// Solid bodies take part in push-out; non-solid ones only report contacts
    pub solid: bool,
    pub mask: LayerMask,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, position: Vec2, half_extents: Vec2) -> Self {
        Self {
            kind,
            position,
            half_extents,
            velocity: Vec2::ZERO,
            gravity_scale: 1.0,
            friction: 0.2,
            solid: true,
            mask: LayerMask::default(),
        }
    }

    pub fn fixed(position: Vec2, half_extents: Vec2) -> Self {
        Self::new(BodyKind::Static, position, half_extents)
    }

    pub fn kinematic(position: Vec2, half_extents: Vec2) -> Self {
        Self::new(BodyKind::Kinematic, position, half_extents)
    }

    pub fn dynamic(position: Vec2, half_extents: Vec2) -> Self {
        Self::new(BodyKind::Dynamic, position, half_extents)
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn non_solid(mut self) -> Self {
        self.solid = false;
        self
    }
}

/// A live body
#[derive(Clone, Debug)]
pub struct Body {
    pub kind: BodyKind,
    pub position: Vec2,
    pub half_extents: Vec2,
    pub velocity: Vec2,
    pub gravity_scale: f32,
    pub friction: f32,
    pub solid: bool,
    pub mask: LayerMask,
    /// Resting on top of a solid surface after the last step
    pub grounded: bool,
}

impl Body {
    pub(crate) fn from_desc(desc: BodyDesc) -> Self {
        Self {
            kind: desc.kind,
            position: desc.position,
            half_extents: desc.half_extents,
            velocity: desc.velocity,
            gravity_scale: desc.gravity_scale,
            friction: desc.friction,
            solid: desc.solid,
            mask: desc.mask,
            grounded: false,
        }
    }

    pub fn min(&self) -> Vec2 {
        self.position - self.half_extents
    }

    pub fn max(&self) -> Vec2 {
        self.position + self.half_extents
    }
}

/// A non-solid detection volume that follows its owner
#[derive(Clone, Debug)]
pub struct Sensor {
    pub owner: BodyHandle,
    /// Centre relative to the owner's position
    pub offset: Vec2,
    pub half_extents: Vec2,
    /// Which layers the sensor reports
    pub detects: u32,
}

/// Events raised by a step, in body order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContactEvent {
    /// Two bodies started touching
    CollisionBegin { a: BodyHandle, b: BodyHandle },
    /// A body entered a sensor
    SensorBegin {
        sensor: SensorHandle,
        owner: BodyHandle,
        other: BodyHandle,
    },
    /// A body left a sensor
    SensorEnd {
        sensor: SensorHandle,
        owner: BodyHandle,
        other: BodyHandle,
    },
}

/// World-level configuration
#[derive(Clone, Debug)]
pub struct PhysicsConfig {
    pub gravity: Vec2,
    /// Seconds per step
    pub dt: f32,
    /// Bodies closer than this count as touching
    pub contact_skin: f32,
    /// Horizontal velocity lost per second per unit of friction while grounded
    pub friction_damping: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: crate::consts::GRAVITY,
            dt: crate::consts::SIM_DT,
            contact_skin: 0.01,
            friction_damping: 4.0,
        }
    }
}
