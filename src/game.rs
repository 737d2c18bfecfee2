//! Game state: owns the tracker, platforms, chord detector, runner and score,
//! and advances them together once per frame.

use crate::chord::{ChordDetector, ChordSession};
use crate::config::GameConfig;
use crate::input::{KeyTracker, KeyboardSource};
use crate::notes::{ChordTable, GameKey, KeySet};
use crate::platform::{EndOutcome, Platform, PlatformCreated, PlatformManager, StartOutcome};
use crate::runner::{Runner, RunnerPhase};
use crate::score::Score;

/// Chord feedback for the UI: the live chord and how far along it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordDetected {
    pub chord_name: &'static str,
    pub points_this_tick: u32,
    pub accumulated_points: u32,
    pub base_points: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PlatformCreated(PlatformCreated),
    PlatformEnded { key: GameKey, width: f64 },
    /// Emitted on ticks where a held chord earned points.
    ChordDetected(ChordDetected),
    ChordCompleted { chord_name: &'static str, base_points: u32 },
    GroundEntered,
    GroundLeft,
    ScoreDecayed { amount: u64 },
    GameOver { final_score: u64 },
}

/// Everything a frame needs from one tick. Platform geometry is read through
/// [`GameState::platforms`] rather than copied every frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutcome {
    pub events: Vec<GameEvent>,
    pub score: u64,
    pub runner_y: f64,
    pub held: KeySet,
    /// Keys whose platforms are still growing.
    pub active_keys: KeySet,
    /// Current chord while one is held, even on ticks that earn nothing.
    pub chord: Option<ChordDetected>,
    pub game_over: bool,
}

#[derive(Debug, Clone)]
pub struct GameState {
    config: GameConfig,
    tracker: KeyTracker,
    platforms: PlatformManager,
    chords: ChordDetector,
    runner: Runner,
    score: Score,
    last_chord: Option<ChordDetected>,
    now_ms: u64,
    game_over: bool,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            tracker: KeyTracker::new(),
            platforms: PlatformManager::new(&config),
            chords: ChordDetector::new(ChordTable::new(), config.chord_window_ms),
            runner: Runner::new(&config),
            score: Score::new(),
            last_chord: None,
            now_ms: 0,
            game_over: false,
            config,
        }
    }

    /// Drop all state and start over. There is no partial restart.
    pub fn reset(&mut self) {
        log::info!("game reset (score was {})", self.score.total());
        *self = Self::new(self.config.clone());
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn platforms(&self) -> &[Platform] {
        self.platforms.platforms()
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn runner_phase(&self) -> RunnerPhase {
        self.runner.phase()
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn chord_session(&self) -> Option<&ChordSession> {
        self.chords.session()
    }

    pub fn chord_window_ms(&self) -> u64 {
        self.chords.window_ms()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Milliseconds until the next ground penalty, while grounded.
    pub fn next_decay_in_ms(&self) -> Option<u64> {
        self.runner.next_decay_in_ms(self.now_ms, &self.config)
    }

    /// Advance one frame. `now_ms` is a monotonic game clock; `advance` is how far the
    /// runner moved forward since the previous tick. A finished game ignores ticks.
    pub fn tick(
        &mut self,
        keyboard: Option<&dyn KeyboardSource>,
        now_ms: u64,
        advance: f64,
    ) -> TickOutcome {
        if self.game_over {
            return self.outcome(Vec::new());
        }
        debug_assert!(advance >= 0.0, "runner never moves backwards");
        self.now_ms = now_ms;
        let mut events = Vec::new();

        self.runner.advance(advance);

        debug_assert!(
            self.tracker.last_sample_ms().is_none_or(|last| now_ms >= last),
            "game clock went backwards"
        );
        let sample = self.tracker.sample(keyboard, now_ms);
        if sample.changed || !self.platforms.active_keys().is_subset(sample.held) {
            self.apply_key_changes(sample.held, now_ms, &mut events);
        }
        debug_assert!(self.platforms.active_keys().is_subset(sample.held));

        let update = self.chords.update(sample.held, now_ms);
        self.last_chord = update.name.map(|chord_name| ChordDetected {
            chord_name,
            points_this_tick: update.points,
            accumulated_points: update.accumulated,
            base_points: update.base_points,
        });
        if let Some(detected) = self.last_chord.filter(|c| c.points_this_tick > 0) {
            self.score.add_chord_points(detected.points_this_tick);
            events.push(GameEvent::ChordDetected(detected));
        }
        if update.completed {
            if let Some(chord_name) = update.name {
                events.push(GameEvent::ChordCompleted {
                    chord_name,
                    base_points: update.base_points,
                });
            }
        }

        self.platforms.extend_active_platforms(self.runner.x);

        let step = self
            .runner
            .update(self.platforms.highest_active_key(), now_ms, &self.config);
        if step.entered_ground {
            events.push(GameEvent::GroundEntered);
        }
        if step.left_ground {
            events.push(GameEvent::GroundLeft);
        }
        if step.decay_due {
            let amount = self.score.apply_decay(self.config.decay_penalty);
            log::debug!("ground decay -{} (score {})", amount, self.score.total());
            events.push(GameEvent::ScoreDecayed { amount });
        }

        if self.runner.y > self.config.game_over_y() {
            self.game_over = true;
            let final_score = self.score.total();
            log::info!("game over at x={:.0}, final score {}", self.runner.x, final_score);
            events.push(GameEvent::GameOver { final_score });
        }

        self.platforms.cleanup_old_platforms(self.runner.x);
        self.outcome(events)
    }

    /// Start platforms for newly held keys, freeze platforms for released ones.
    fn apply_key_changes(&mut self, held: KeySet, now_ms: u64, events: &mut Vec<GameEvent>) {
        for key in held.iter() {
            if let StartOutcome::Created(created) =
                self.platforms.start_platform(key, self.runner.x, now_ms)
            {
                self.score.add_platform_bonus(self.config.score_per_platform);
                events.push(GameEvent::PlatformCreated(created));
            }
        }
        for key in self.platforms.active_keys().difference(held).iter() {
            if let EndOutcome::Frozen { width } = self.platforms.end_platform(key) {
                events.push(GameEvent::PlatformEnded { key, width });
            }
        }
    }

    /// Current state with no events, for drawing before the first tick.
    pub fn snapshot(&self) -> TickOutcome {
        self.outcome(Vec::new())
    }

    fn outcome(&self, events: Vec<GameEvent>) -> TickOutcome {
        TickOutcome {
            events,
            score: self.score.total(),
            runner_y: self.runner.y,
            held: self.tracker.held(),
            active_keys: self.platforms.active_keys(),
            chord: self.last_chord,
            game_over: self.game_over,
        }
    }
}
