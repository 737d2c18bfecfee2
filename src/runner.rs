//! Runner height tracking and the grounded/decay timer.

use crate::config::GameConfig;
use crate::notes::GameKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    /// Easing toward a platform or falling toward the ground.
    Airborne,
    OnPlatform,
    Grounded,
}

/// What changed in one height update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunnerStep {
    pub entered_ground: bool,
    pub left_ground: bool,
    /// A decay interval elapsed on this tick.
    pub decay_due: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Runner {
    pub x: f64,
    pub y: f64,
    pub velocity_y: f64,
    phase: RunnerPhase,
    grounded: bool,
    ground_entry_ms: Option<u64>,
    last_decay_ms: Option<u64>,
    last_update_ms: Option<u64>,
}

impl Runner {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            x: config.runner_start_x,
            y: config.screen_height - config.runner_start_lift,
            velocity_y: 0.0,
            phase: RunnerPhase::Airborne,
            grounded: false,
            ground_entry_ms: None,
            last_decay_ms: None,
            last_update_ms: None,
        }
    }

    pub fn phase(&self) -> RunnerPhase {
        self.phase
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Milliseconds until the next decay, while grounded.
    pub fn next_decay_in_ms(&self, now_ms: u64, config: &GameConfig) -> Option<u64> {
        let entry = self.ground_entry_ms?;
        let due = match self.last_decay_ms {
            Some(last) => last.saturating_add(config.decay_interval_ms),
            None => entry
                .saturating_add(config.ground_grace_ms)
                .saturating_add(config.decay_interval_ms),
        };
        Some(due.saturating_sub(now_ms))
    }

    pub fn advance(&mut self, distance: f64) {
        self.x += distance;
    }

    /// Move toward the highest held platform, or fall to the ground when nothing is held.
    /// Decay fires at most once per call, however many intervals have passed.
    pub fn update(&mut self, target: Option<GameKey>, now_ms: u64, config: &GameConfig) -> RunnerStep {
        let dt_secs = self
            .last_update_ms
            .map(|last| now_ms.saturating_sub(last) as f64 / 1000.0)
            .unwrap_or(0.0);
        self.last_update_ms = Some(now_ms);

        match target {
            Some(key) => {
                let target_y = config.screen_height + key.level_height();
                if (self.y - target_y).abs() > config.snap_epsilon {
                    self.y = lerp(self.y, target_y, config.height_lerp);
                    self.phase = RunnerPhase::Airborne;
                } else {
                    self.y = target_y;
                    self.phase = RunnerPhase::OnPlatform;
                }
                self.velocity_y = 0.0;
            }
            None => {
                let ground_y = config.ground_y();
                if self.y < ground_y {
                    self.velocity_y = config.fall_velocity;
                    self.y = (self.y + self.velocity_y * dt_secs).min(ground_y);
                }
                if self.y >= ground_y {
                    self.y = ground_y;
                    self.velocity_y = 0.0;
                    self.phase = RunnerPhase::Grounded;
                } else {
                    self.phase = RunnerPhase::Airborne;
                }
            }
        }

        let mut step = RunnerStep::default();
        let grounded_now = self.phase == RunnerPhase::Grounded;
        if grounded_now && !self.grounded {
            self.grounded = true;
            self.ground_entry_ms = Some(now_ms);
            self.last_decay_ms = None;
            step.entered_ground = true;
            log::debug!("runner grounded at x={:.0}", self.x);
        } else if !grounded_now && self.grounded {
            self.grounded = false;
            self.ground_entry_ms = None;
            self.last_decay_ms = None;
            step.left_ground = true;
            log::debug!("runner left the ground at x={:.0}", self.x);
        }

        if let Some(entry) = self.ground_entry_ms {
            // Saturates, so an unreachable grace end means no decay at all.
            let grace_end = entry.saturating_add(config.ground_grace_ms);
            if now_ms >= grace_end {
                let since = now_ms - self.last_decay_ms.unwrap_or(grace_end);
                if since >= config.decay_interval_ms {
                    self.last_decay_ms = Some(now_ms);
                    step.decay_due = true;
                }
            }
        }
        step
    }
}

#[inline]
fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}
