//! Gameplay tunables and their validation.

use thiserror::Error;

/// Everything the simulation reads that is not per-key.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Logical world height in px; level heights are offsets from it.
    pub screen_height: f64,
    pub runner_start_x: f64,
    /// Runner starts this far above the screen bottom.
    pub runner_start_lift: f64,
    /// Horizontal run speed in px/s (used by the host to compute per-tick advance).
    pub runner_speed: f64,
    pub platform_min_length: f64,
    pub platform_height: f64,
    /// Platforms spawn this far ahead of the runner.
    pub platform_ahead_offset: f64,
    /// Platforms whose right edge is further behind the runner than this are destroyed.
    pub cleanup_distance: f64,
    /// Game over once the runner drops this far below the screen bottom.
    pub over_fall_distance: f64,
    pub score_per_platform: u32,
    /// Ground level sits this far above the screen bottom.
    pub ground_offset: f64,
    pub height_lerp: f64,
    pub snap_epsilon: f64,
    /// Constant fall speed in px/s when no platform is held.
    pub fall_velocity: f64,
    pub ground_grace_ms: u64,
    pub decay_interval_ms: u64,
    pub decay_penalty: u32,
    pub chord_window_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            screen_height: 768.0,
            runner_start_x: 100.0,
            runner_start_lift: 80.0,
            runner_speed: 100.0,
            platform_min_length: 20.0,
            platform_height: 20.0,
            platform_ahead_offset: 20.0,
            cleanup_distance: 400.0,
            over_fall_distance: 300.0,
            score_per_platform: 10,
            ground_offset: 60.0,
            height_lerp: 0.08,
            snap_epsilon: 0.5,
            fall_velocity: 300.0,
            ground_grace_ms: 1000,
            decay_interval_ms: 1000,
            decay_penalty: 1,
            chord_window_ms: 1000,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("height lerp must be in (0, 1], got {0}")]
    LerpOutOfRange(f64),
    #[error("{0} must be at least 1 ms")]
    ZeroDuration(&'static str),
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("screen height", self.screen_height),
            ("runner speed", self.runner_speed),
            ("platform min length", self.platform_min_length),
            ("platform height", self.platform_height),
            ("cleanup distance", self.cleanup_distance),
            ("fall velocity", self.fall_velocity),
            ("snap epsilon", self.snap_epsilon),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.height_lerp.is_nan() || self.height_lerp <= 0.0 || self.height_lerp > 1.0 {
            return Err(ConfigError::LerpOutOfRange(self.height_lerp));
        }
        if self.decay_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("decay interval"));
        }
        if self.chord_window_ms == 0 {
            return Err(ConfigError::ZeroDuration("chord window"));
        }
        Ok(())
    }

    /// Y the runner falls to when no platform is held.
    pub fn ground_y(&self) -> f64 {
        self.screen_height - self.ground_offset
    }

    /// Y past which the run is over.
    pub fn game_over_y(&self) -> f64 {
        self.screen_height + self.over_fall_distance
    }
}
