//! Per-entity animation timers
//!
//! Timers run on their own millisecond clock with their own phase, so frame
//! changes are not locked to the physics tick. A firing timer only queues a
//! command; the frame swap itself happens in the next drain. Timers whose
//! owner has died are dropped the first time they are looked at.

use super::commands::Command;
use super::entities::EntityId;

#[derive(Debug, Clone)]
struct Timer {
    owner: EntityId,
    interval_ms: f32,
    elapsed_ms: f32,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repeat an animation tick for `owner` every `interval_ms`
    pub fn every(&mut self, owner: EntityId, interval_ms: f32) {
        if interval_ms <= 0.0 {
            log::warn!("Ignoring animation timer with interval {interval_ms} ms");
            return;
        }
        self.timers.push(Timer {
            owner,
            interval_ms,
            elapsed_ms: 0.0,
        });
    }

    /// Advance the clock. Fired ticks for live owners are appended to `out`;
    /// timers of dead owners are cancelled.
    pub fn advance(
        &mut self,
        elapsed_ms: f32,
        is_alive: impl Fn(EntityId) -> bool,
        out: &mut Vec<Command>,
    ) {
        self.timers.retain_mut(|timer| {
            if !is_alive(timer.owner) {
                return false;
            }
            timer.elapsed_ms += elapsed_ms;
            while timer.elapsed_ms >= timer.interval_ms {
                timer.elapsed_ms -= timer.interval_ms;
                out.push(Command::AdvanceAnimation {
                    entity: timer.owner,
                });
            }
            true
        });
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_fires_on_own_interval() {
        let mut ids: SlotMap<EntityId, ()> = SlotMap::with_key();
        let enemy = ids.insert(());
        let mut scheduler = Scheduler::new();
        scheduler.every(enemy, 250.0);

        let mut out = Vec::new();
        // 61 ticks of 1/60 s is just over one second -> 4 frames
        for _ in 0..61 {
            scheduler.advance(crate::consts::SIM_DT_MS, |_| true, &mut out);
        }
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|c| *c == Command::AdvanceAnimation { entity: enemy }));
    }

    #[test]
    fn test_dead_owner_cancels_timer() {
        let mut ids: SlotMap<EntityId, ()> = SlotMap::with_key();
        let alive = ids.insert(());
        let dead = ids.insert(());
        let mut scheduler = Scheduler::new();
        scheduler.every(alive, 100.0);
        scheduler.every(dead, 100.0);
        ids.remove(dead);

        let mut out = Vec::new();
        scheduler.advance(100.0, |id| ids.contains_key(id), &mut out);
        assert_eq!(out, vec![Command::AdvanceAnimation { entity: alive }]);
        assert_eq!(scheduler.len(), 1);
    }
}
