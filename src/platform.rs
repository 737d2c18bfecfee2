//! Platform lifecycle: one growing platform per held key, frozen on release,
//! destroyed once it scrolls far enough behind the runner.

use crate::config::GameConfig;
use crate::notes::{GameKey, KeyMap, KeySet};

pub type PlatformId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub id: PlatformId,
    pub key: GameKey,
    /// Runner X when the key went down.
    pub spawn_x: f64,
    /// Left edge; fixed for the platform's whole life.
    pub left: f64,
    /// Vertical centre.
    pub y: f64,
    pub width: f64,
    pub color: u32,
    pub spawned_at_ms: u64,
    pub growing: bool,
}

impl Platform {
    #[inline]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// Emitted once per new platform, for sound and particle feedback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformCreated {
    pub key: GameKey,
    pub x: f64,
    pub y: f64,
    pub color: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartOutcome {
    Created(PlatformCreated),
    AlreadyActive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EndOutcome {
    Frozen { width: f64 },
    NotActive,
}

#[derive(Debug, Clone)]
pub struct PlatformManager {
    platforms: Vec<Platform>,
    active: KeyMap<Option<PlatformId>>,
    next_id: PlatformId,
    screen_height: f64,
    min_length: f64,
    ahead_offset: f64,
    cleanup_distance: f64,
}

impl PlatformManager {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            platforms: Vec::new(),
            active: KeyMap::default(),
            next_id: 0,
            screen_height: config.screen_height,
            min_length: config.platform_min_length,
            ahead_offset: config.platform_ahead_offset,
            cleanup_distance: config.cleanup_distance,
        }
    }

    /// Every live platform, growing or frozen, oldest first.
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn is_active(&self, key: GameKey) -> bool {
        self.active[key].is_some()
    }

    pub fn active_keys(&self) -> KeySet {
        self.active
            .iter()
            .filter_map(|(key, id)| id.map(|_| key))
            .collect()
    }

    /// Y of the platform for `key`.
    pub fn level_y(&self, key: GameKey) -> f64 {
        self.screen_height + key.level_height()
    }

    /// Register a platform for `key` just ahead of the runner. Idempotent while the key is active.
    pub fn start_platform(&mut self, key: GameKey, runner_x: f64, now_ms: u64) -> StartOutcome {
        if self.is_active(key) {
            return StartOutcome::AlreadyActive;
        }
        let id = self.next_id;
        self.next_id += 1;

        let center = runner_x + self.ahead_offset;
        let platform = Platform {
            id,
            key,
            spawn_x: runner_x,
            left: center - self.min_length / 2.0,
            y: self.level_y(key),
            width: self.min_length,
            color: key.level_color(),
            spawned_at_ms: now_ms,
            growing: true,
        };
        let created = PlatformCreated {
            key,
            x: center,
            y: platform.y,
            color: platform.color,
        };
        log::debug!("platform {} for {} ({}) at y={}", id, key, key.note(), platform.y);
        self.platforms.push(platform);
        self.active[key] = Some(id);
        StartOutcome::Created(created)
    }

    /// Grow every active platform to the right; the left edge never moves.
    pub fn extend_active_platforms(&mut self, runner_x: f64) {
        let min = self.min_length;
        for platform in self.platforms.iter_mut().filter(|p| p.growing) {
            platform.width = min.max(min + (runner_x - platform.spawn_x));
        }
    }

    /// Freeze the platform for `key`. It stays in the world but no longer counts as active.
    pub fn end_platform(&mut self, key: GameKey) -> EndOutcome {
        let Some(id) = self.active[key].take() else {
            return EndOutcome::NotActive;
        };
        match self.platforms.iter_mut().find(|p| p.id == id) {
            Some(platform) => {
                platform.growing = false;
                log::debug!("platform {} for {} frozen at width {:.0}", id, key, platform.width);
                EndOutcome::Frozen { width: platform.width }
            }
            None => EndOutcome::NotActive,
        }
    }

    /// Active key whose level sits highest on screen (most negative level height).
    pub fn highest_active_key(&self) -> Option<GameKey> {
        self.active_keys()
            .iter()
            .min_by(|a, b| a.level_height().total_cmp(&b.level_height()))
    }

    /// Destroy platforms whose right edge is behind `runner_x - cleanup_distance`.
    /// Returns how many were removed.
    pub fn cleanup_old_platforms(&mut self, runner_x: f64) -> usize {
        let limit = runner_x - self.cleanup_distance;
        let before = self.platforms.len();
        let active = &mut self.active;
        self.platforms.retain(|p| {
            let keep = p.right() >= limit;
            if !keep && active[p.key] == Some(p.id) {
                active[p.key] = None;
            }
            keep
        });
        let removed = before - self.platforms.len();
        if removed > 0 {
            log::debug!("cleaned up {} platforms behind x={:.0}", removed, limit);
        }
        removed
    }
}
