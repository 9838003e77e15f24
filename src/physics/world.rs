use glam::Vec2;
use slotmap::SlotMap;

use std::collections::HashSet;

use super::types::*;

/// Fixed-step box world.
///
/// Owns every body and sensor. Callers only ever hold handles; a handle whose
/// body was destroyed fails lookups instead of aliasing a new body.
pub struct PhysicsWorld {
    pub cfg: PhysicsConfig,
    bodies: SlotMap<BodyHandle, Body>,
    sensors: SlotMap<SensorHandle, Sensor>,
    // Pairs touching after the previous step, stored (min, max)
    contacts: HashSet<(BodyHandle, BodyHandle)>,
    sensor_contacts: HashSet<(SensorHandle, BodyHandle)>,
}

/// Copy of a solid non-dynamic body used during push-out
struct Support {
    position: Vec2,
    half_extents: Vec2,
    velocity: Vec2,
    friction: f32,
    mask: LayerMask,
}

/// Per-axis overlap of two boxes (positive on both axes when intersecting)
#[inline]
fn penetration(a_pos: Vec2, a_half: Vec2, b_pos: Vec2, b_half: Vec2) -> Vec2 {
    let delta = (a_pos - b_pos).abs();
    a_half + b_half - delta
}

#[inline]
fn ordered(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a < b { (a, b) } else { (b, a) }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl PhysicsWorld {
    pub fn new(cfg: PhysicsConfig) -> Self {
        Self {
            cfg,
            bodies: SlotMap::with_key(),
            sensors: SlotMap::with_key(),
            contacts: HashSet::new(),
            sensor_contacts: HashSet::new(),
        }
    }

    pub fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        self.bodies.insert(Body::from_desc(desc))
    }

    /// Remove a body, its sensors, and every contact it takes part in.
    /// Returns false for a stale handle.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        if self.bodies.remove(handle).is_none() {
            return false;
        }
        self.sensors.retain(|_, sensor| sensor.owner != handle);
        self.contacts.retain(|&(a, b)| a != handle && b != handle);
        let sensors = &self.sensors;
        self.sensor_contacts
            .retain(|&(sensor, body)| body != handle && sensors.contains_key(sensor));
        true
    }

    /// Attach a sensor volume centred at `offset` from the owner
    pub fn attach_sensor(
        &mut self,
        owner: BodyHandle,
        offset: Vec2,
        half_extents: Vec2,
        detects: u32,
    ) -> Option<SensorHandle> {
        if !self.bodies.contains_key(owner) {
            return None;
        }
        Some(self.sensors.insert(Sensor {
            owner,
            offset,
            half_extents,
            detects,
        }))
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(handle)
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| b.position)
    }

    pub fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| b.velocity)
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.velocity = velocity;
                true
            }
            None => false,
        }
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: Vec2) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.position = position;
                true
            }
            None => false,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Drop every body, sensor, and contact
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.sensors.clear();
        self.contacts.clear();
        self.sensor_contacts.clear();
    }

    /// Advance one fixed step and return the contact events it produced
    pub fn step(&mut self) -> Vec<ContactEvent> {
        self.integrate();
        self.resolve();

        let mut events = Vec::new();
        self.collect_contacts(&mut events);
        self.collect_sensor_events(&mut events);

        events
    }

    fn integrate(&mut self) {
        let dt = self.cfg.dt;
        let gravity = self.cfg.gravity;
        for body in self.bodies.values_mut() {
            match body.kind {
                BodyKind::Static => {}
                BodyKind::Kinematic => body.position += body.velocity * dt,
                BodyKind::Dynamic => {
                    body.velocity += gravity * body.gravity_scale * dt;
                    body.position += body.velocity * dt;
                }
            }
        }
    }

    /// Push dynamic bodies out of the solid static/kinematic bodies they sank into
    fn resolve(&mut self) {
        let dt = self.cfg.dt;
        let damping = self.cfg.friction_damping;

        let supports: Vec<Support> = self
            .bodies
            .values()
            .filter(|b| b.solid && b.kind != BodyKind::Dynamic)
            .map(|b| Support {
                position: b.position,
                half_extents: b.half_extents,
                velocity: b.velocity,
                friction: b.friction,
                mask: b.mask,
            })
            .collect();

        for body in self.bodies.values_mut() {
            if body.kind != BodyKind::Dynamic {
                continue;
            }
            body.grounded = false;
            if !body.solid {
                continue;
            }

            for support in &supports {
                if !body.mask.allows(support.mask) {
                    continue;
                }
                let overlap = penetration(
                    body.position,
                    body.half_extents,
                    support.position,
                    support.half_extents,
                );
                if overlap.x <= 0.0 || overlap.y <= 0.0 {
                    continue;
                }

                let delta = body.position - support.position;
                if overlap.x < overlap.y {
                    let dir = if delta.x >= 0.0 { 1.0 } else { -1.0 };
                    body.position.x += overlap.x * dir;
                    if body.velocity.x * dir < 0.0 {
                        body.velocity.x = 0.0;
                    }
                } else {
                    let dir = if delta.y >= 0.0 { 1.0 } else { -1.0 };
                    body.position.y += overlap.y * dir;
                    if body.velocity.y * dir < 0.0 {
                        body.velocity.y = 0.0;
                    }
                    if dir > 0.0 {
                        body.grounded = true;
                        // Ride moving platforms
                        body.position.x += support.velocity.x * dt;
                        let mixed = (body.friction * support.friction).sqrt();
                        body.velocity.x *= (1.0 - mixed * damping * dt).max(0.0);
                    }
                }
            }
        }
    }

    fn collect_contacts(&mut self, events: &mut Vec<ContactEvent>) {
        let skin = self.cfg.contact_skin;
        let mut touching = HashSet::with_capacity(self.contacts.len());

        for (a, body_a) in &self.bodies {
            if body_a.kind != BodyKind::Dynamic {
                continue;
            }
            for (b, body_b) in &self.bodies {
                if a == b || (body_b.kind == BodyKind::Dynamic && b < a) {
                    continue;
                }
                if !body_a.mask.allows(body_b.mask) {
                    continue;
                }
                let overlap = penetration(
                    body_a.position,
                    body_a.half_extents,
                    body_b.position,
                    body_b.half_extents,
                );
                if overlap.x <= -skin || overlap.y <= -skin {
                    continue;
                }
                let pair = ordered(a, b);
                if !self.contacts.contains(&pair) {
                    events.push(ContactEvent::CollisionBegin { a, b });
                }
                touching.insert(pair);
            }
        }

        self.contacts = touching;
    }

    fn collect_sensor_events(&mut self, events: &mut Vec<ContactEvent>) {
        let mut inside = HashSet::with_capacity(self.sensor_contacts.len());

        for (sensor_handle, sensor) in &self.sensors {
            let Some(owner) = self.bodies.get(sensor.owner) else {
                continue;
            };
            let centre = owner.position + sensor.offset;
            for (other, body) in &self.bodies {
                if other == sensor.owner || body.mask.layer & sensor.detects == 0 {
                    continue;
                }
                let overlap =
                    penetration(centre, sensor.half_extents, body.position, body.half_extents);
                if overlap.x <= 0.0 || overlap.y <= 0.0 {
                    continue;
                }
                let key = (sensor_handle, other);
                if !self.sensor_contacts.contains(&key) {
                    events.push(ContactEvent::SensorBegin {
                        sensor: sensor_handle,
                        owner: sensor.owner,
                        other,
                    });
                }
                inside.insert(key);
            }
        }

        let mut left: Vec<_> = self.sensor_contacts.difference(&inside).copied().collect();
        left.sort();
        for (sensor, other) in left {
            if let Some(s) = self.sensors.get(sensor) {
                events.push(ContactEvent::SensorEnd {
                    sensor,
                    owner: s.owner,
                    other,
                });
            }
        }

        self.sensor_contacts = inside;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(world: &mut PhysicsWorld) -> BodyHandle {
        world.create_body(BodyDesc::fixed(Vec2::new(0.0, -1.0), Vec2::new(10.0, 1.0)))
    }

    #[test]
    fn test_dynamic_body_lands_and_rests() {
        let mut world = PhysicsWorld::default();
        let ground = floor(&mut world);
        let crate_box =
            world.create_body(BodyDesc::dynamic(Vec2::new(0.0, 3.0), Vec2::splat(0.5)));

        let mut begins = 0;
        for _ in 0..240 {
            for event in world.step() {
                if let ContactEvent::CollisionBegin { a, b } = event {
                    assert_eq!(ordered(a, b), ordered(crate_box, ground));
                    begins += 1;
                }
            }
        }

        let body = world.body(crate_box).unwrap();
        assert_eq!(begins, 1, "resting contact must begin exactly once");
        assert!(body.grounded);
        assert!((body.position.y - 0.5).abs() < 0.05);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn test_layer_mask_lets_bodies_pass_through() {
        let mut world = PhysicsWorld::default();
        world.create_body(
            BodyDesc::fixed(Vec2::ZERO, Vec2::splat(1.0))
                .with_mask(LayerMask::simple(layers::ENEMY, layers::ALL)),
        );
        let spike = world.create_body(
            BodyDesc::dynamic(Vec2::new(0.0, 2.0), Vec2::splat(0.3)).with_mask(
                LayerMask::excluding(layers::HAZARD, layers::ENEMY),
            ),
        );

        for _ in 0..120 {
            assert!(world.step().is_empty());
        }
        assert!(world.position(spike).unwrap().y < -1.0);
    }

    #[test]
    fn test_sensor_begin_and_end() {
        let mut world = PhysicsWorld::default();
        world.cfg.gravity = Vec2::ZERO;
        let guard = world.create_body(BodyDesc::fixed(Vec2::ZERO, Vec2::splat(1.0)));
        let sensor = world
            .attach_sensor(guard, Vec2::new(3.0, 0.0), Vec2::splat(1.0), layers::PLAYER)
            .unwrap();
        let walker = world.create_body(
            BodyDesc::dynamic(Vec2::new(6.0, 0.0), Vec2::splat(0.5))
                .with_velocity(Vec2::new(-60.0, 0.0))
                .with_mask(LayerMask::simple(layers::PLAYER, layers::ALL)),
        );

        let events = world.step();
        assert!(events.is_empty());

        let events = world.step();
        assert!(events.contains(&ContactEvent::SensorBegin {
            sensor,
            owner: guard,
            other: walker
        }));

        world.set_velocity(walker, Vec2::new(0.0, 600.0));
        let events = world.step();
        assert!(events.contains(&ContactEvent::SensorEnd {
            sensor,
            owner: guard,
            other: walker
        }));
    }

    #[test]
    fn test_destroy_cleans_bookkeeping() {
        let mut world = PhysicsWorld::default();
        floor(&mut world);
        let owner = world.create_body(BodyDesc::dynamic(Vec2::new(0.0, 0.5), Vec2::splat(0.5)));
        world.attach_sensor(owner, Vec2::ZERO, Vec2::splat(2.0), layers::ALL);
        world.step();
        assert_eq!(world.contact_count(), 1);

        assert!(world.destroy_body(owner));
        assert_eq!(world.contact_count(), 0);
        assert_eq!(world.sensor_count(), 0);

        // Stale handle: every operation is a quiet failure
        assert!(!world.destroy_body(owner));
        assert!(!world.set_velocity(owner, Vec2::ONE));
        assert!(world.attach_sensor(owner, Vec2::ZERO, Vec2::ONE, 0).is_none());
        assert!(world.body(owner).is_none());
    }

    #[test]
    fn test_kinematic_body_carries_rider() {
        let mut world = PhysicsWorld::default();
        let lift = world.create_body(
            BodyDesc::kinematic(Vec2::ZERO, Vec2::new(2.0, 0.5))
                .with_velocity(Vec2::new(3.0, 0.0)),
        );
        let rider = world.create_body(BodyDesc::dynamic(Vec2::new(0.0, 0.9), Vec2::splat(0.4)));

        for _ in 0..60 {
            world.step();
        }
        let lift_x = world.position(lift).unwrap().x;
        let rider_x = world.position(rider).unwrap().x;
        assert!((lift_x - 3.0).abs() < 1e-3);
        assert!(rider_x > 2.0, "rider should travel with the lift, got {rider_x}");
    }
}
