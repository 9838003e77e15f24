//! Shell callbacks
//!
//! The core never draws, plays audio, or switches levels. It reports through a
//! [`GameObserver`] supplied when the world is built.

use std::sync::{Arc, Mutex};

/// Sound the shell should play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundCue {
    /// Player took damage
    Hit,
    StarCollected,
    /// A hazard broke; the clip comes from the level theme
    HazardImpact { clip: String },
}

/// Callbacks consumed from the application shell. All methods default to no-ops.
pub trait GameObserver {
    fn on_health_changed(&mut self, _health: u8) {}
    fn on_score_changed(&mut self, _stars: u32) {}
    fn on_level_complete(&mut self) {}
    fn on_game_over(&mut self) {}
    fn play_sound(&mut self, _cue: &SoundCue) {}
}

/// Ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl GameObserver for NullObserver {}

/// One recorded callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    HealthChanged(u8),
    ScoreChanged(u32),
    LevelComplete,
    GameOver,
    Sound(SoundCue),
}

/// Records callbacks in order. Clones share the same log, so one copy can be
/// handed to the world while another is inspected.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<GameEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: GameEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<GameEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self, event: &GameEvent) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| *e == event)
            .count()
    }

    /// Take and clear the log
    pub fn drain(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl GameObserver for EventLog {
    fn on_health_changed(&mut self, health: u8) {
        self.record(GameEvent::HealthChanged(health));
    }

    fn on_score_changed(&mut self, stars: u32) {
        self.record(GameEvent::ScoreChanged(stars));
    }

    fn on_level_complete(&mut self) {
        self.record(GameEvent::LevelComplete);
    }

    fn on_game_over(&mut self) {
        self.record(GameEvent::GameOver);
    }

    fn play_sound(&mut self, cue: &SoundCue) {
        self.record(GameEvent::Sound(cue.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_log() {
        let log = EventLog::new();
        let mut handed_out: Box<dyn GameObserver> = Box::new(log.clone());

        handed_out.on_health_changed(3);
        handed_out.play_sound(&SoundCue::Hit);
        handed_out.on_game_over();

        assert_eq!(
            log.events(),
            vec![
                GameEvent::HealthChanged(3),
                GameEvent::Sound(SoundCue::Hit),
                GameEvent::GameOver,
            ]
        );
        assert_eq!(log.count(&GameEvent::GameOver), 1);
        assert_eq!(log.drain().len(), 3);
        assert!(log.events().is_empty());
    }
}
