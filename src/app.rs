//! App: terminal init, main loop, game clock and key handling.

use crate::Args;
use crate::config::GameConfig;
use crate::game::{GameEvent, GameState, TickOutcome};
use crate::input::{Action, TerminalKeyboard, key_to_action};
use crate::notes::GameKey;
use crate::theme::Theme;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// How long the runner glyph flashes in a new platform's colour.
const RUNNER_FLASH_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub animation_start: Instant,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            animation_start: Instant::now(),
        }
    }
}

/// Milliseconds since the game started, not counting time spent paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameClock {
    started: Instant,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl GameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(at);
        }
    }

    /// Frozen while paused.
    pub fn now_ms(&self, now: Instant) -> u64 {
        let now = self.paused_at.unwrap_or(now);
        let running = now
            .saturating_duration_since(self.started)
            .saturating_sub(self.paused_total);
        running.as_millis().min(u128::from(u64::MAX)) as u64
    }
}

/// Completed-chord banner; the fade effect is created on first draw.
pub struct ChordBanner {
    pub chord_name: &'static str,
    pub base_points: u32,
    pub effect: Option<Effect>,
    pub process_time: Option<Instant>,
}

impl ChordBanner {
    fn new(chord_name: &'static str, base_points: u32) -> Self {
        Self {
            chord_name,
            base_points,
            effect: None,
            process_time: None,
        }
    }
}

/// Brief highlight on the runner after a platform spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerFlash {
    pub key: GameKey,
    pub until: Instant,
}

/// Message written for an embedding host when a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameOverMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    data: GameOverData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct GameOverData {
    #[serde(rename = "finalScore")]
    final_score: u64,
}

impl GameOverMessage {
    pub fn new(final_score: u64) -> Self {
        Self {
            kind: "GAME_OVER",
            data: GameOverData { final_score },
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("writing game-over report to {}", path.display()))
    }
}

/// Everything the draw pass needs besides the game state.
pub struct View<'a> {
    pub screen: Screen,
    pub paused: bool,
    pub theme: &'a Theme,
    pub menu_state: &'a MenuState,
    pub banner: &'a mut Option<ChordBanner>,
    pub runner_flash: Option<RunnerFlash>,
    /// Result of the most recent simulation tick.
    pub last_tick: &'a TickOutcome,
    pub releases_reported: bool,
    pub now: Instant,
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    state: GameState,
    last_tick: TickOutcome,
    keyboard: TerminalKeyboard,
    screen: Screen,
    clock: GameClock,
    last_tick_ms: u64,
    banner: Option<ChordBanner>,
    runner_flash: Option<RunnerFlash>,
    menu_state: MenuState,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Self {
        let state = GameState::new(config.clone());
        let last_tick = state.snapshot();
        let keyboard = TerminalKeyboard::new(
            false,
            Duration::from_millis(args.repeat_delay_ms),
            Duration::from_millis(args.hold_timeout_ms),
        );
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Self {
            args,
            config,
            theme,
            state,
            last_tick,
            keyboard,
            screen,
            clock: GameClock::new(Instant::now()),
            last_tick_ms: 0,
            banner: None,
            runner_flash: None,
            menu_state: MenuState::default(),
        }
    }

    fn reset_game(&mut self) {
        self.state.reset();
        self.last_tick = self.state.snapshot();
        self.keyboard.clear();
        self.screen = Screen::Playing;
        self.clock = GameClock::new(Instant::now());
        self.last_tick_ms = 0;
        self.banner = None;
        self.runner_flash = None;
    }

    fn open_menu(&mut self) {
        self.screen = Screen::Menu;
        self.menu_state = MenuState::default();
        self.keyboard.clear();
    }

    fn toggle_pause(&mut self, now: Instant) {
        if self.clock.is_paused() {
            self.clock.resume(now);
            log::debug!("resumed at {} ms", self.clock.now_ms(now));
        } else {
            self.clock.pause(now);
            self.keyboard.clear();
            log::debug!("paused at {} ms", self.clock.now_ms(now));
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events make held-key tracking exact; without them we fall back to timeouts.
        let releases = supports_keyboard_enhancement().unwrap_or(false)
            && execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        log::info!(
            "key release reporting {}",
            if releases { "enabled" } else { "unavailable, using hold timeout" }
        );
        self.keyboard = TerminalKeyboard::new(
            releases,
            Duration::from_millis(self.args.repeat_delay_ms),
            Duration::from_millis(self.args.hold_timeout_ms),
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        if self.screen == Screen::Playing {
            self.reset_game();
        }
        let result = self.run_loop(&mut terminal);

        if releases {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        loop {
            let frame_start = Instant::now();
            if self.runner_flash.is_some_and(|f| frame_start >= f.until) {
                self.runner_flash = None;
            }

            let mut view = View {
                screen: self.screen,
                paused: self.clock.is_paused(),
                theme: &self.theme,
                menu_state: &self.menu_state,
                banner: &mut self.banner,
                runner_flash: self.runner_flash,
                last_tick: &self.last_tick,
                releases_reported: self.keyboard.reports_releases(),
                now: frame_start,
            };
            let state = &self.state;
            terminal.draw(|f| {
                let area = f.area();
                crate::ui::draw(f, state, &mut view, area);
            })?;

            if self
                .banner
                .as_ref()
                .is_some_and(|b| b.effect.as_ref().is_some_and(|e| e.done()))
            {
                self.banner = None;
            }

            let timeout = frame_duration.saturating_sub(frame_start.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if !self.handle_key(key, Instant::now()) {
                            return Ok(());
                        }
                    }
                }
            }

            if self.screen == Screen::Playing
                && !self.clock.is_paused()
                && !self.last_tick.game_over
            {
                self.tick(Instant::now());
            }
        }
    }

    /// Returns false when the app should exit.
    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        // Note keys feed the keyboard state and never double as actions.
        if self.screen == Screen::Playing
            && !self.clock.is_paused()
            && self.keyboard.handle(&key, now).is_some()
        {
            return true;
        }
        if key.kind != KeyEventKind::Press {
            return true;
        }

        let action = key_to_action(key);
        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return false,
                Action::Start => self.reset_game(),
                _ => {}
            },
            Screen::Playing => match action {
                Action::Quit => return false,
                Action::Pause => self.toggle_pause(now),
                Action::Restart => self.reset_game(),
                Action::Menu => self.open_menu(),
                _ => {}
            },
            Screen::GameOver => match action {
                Action::Quit => return false,
                Action::Start | Action::Restart => self.reset_game(),
                Action::Menu => self.open_menu(),
                Action::Pause | Action::None => {
                    if matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R')) {
                        self.reset_game();
                    }
                }
            },
        }
        true
    }

    fn tick(&mut self, now: Instant) {
        self.keyboard.expire(now);
        let now_ms = self.clock.now_ms(now);
        let dt_ms = now_ms.saturating_sub(self.last_tick_ms);
        self.last_tick_ms = now_ms;
        let advance = self.config.runner_speed * dt_ms as f64 / 1000.0;

        let outcome = self.state.tick(Some(&self.keyboard), now_ms, advance);
        for event in &outcome.events {
            match *event {
                GameEvent::PlatformCreated(created) => {
                    log::debug!(
                        "platform {} at ({:.0}, {:.0}) #{:06x}",
                        created.key,
                        created.x,
                        created.y,
                        created.color
                    );
                    self.runner_flash = Some(RunnerFlash {
                        key: created.key,
                        until: now + Duration::from_millis(RUNNER_FLASH_MS),
                    });
                }
                GameEvent::ChordCompleted {
                    chord_name,
                    base_points,
                } => {
                    log::info!("chord {} completed (+{})", chord_name, base_points);
                    self.banner = Some(ChordBanner::new(chord_name, base_points));
                }
                GameEvent::PlatformEnded { key, width } => {
                    log::debug!("platform {} released at width {:.0}", key, width);
                }
                GameEvent::ScoreDecayed { amount } if amount > 0 => {
                    log::debug!("grounded: -{} (score {})", amount, outcome.score);
                }
                GameEvent::GameOver { final_score } => self.finish(final_score),
                GameEvent::ChordDetected(_)
                | GameEvent::ScoreDecayed { .. }
                | GameEvent::GroundEntered
                | GameEvent::GroundLeft => {}
            }
        }
        self.last_tick = outcome;
    }

    /// A failed report write is logged; the game-over screen still shows.
    fn finish(&mut self, final_score: u64) {
        self.screen = Screen::GameOver;
        self.keyboard.clear();
        let breakdown = self.state.score();
        log::info!(
            "final score {} (platforms {}, chords {}, decay -{})",
            final_score,
            breakdown.platform_points(),
            breakdown.chord_points(),
            breakdown.decayed()
        );
        if let Some(path) = &self.args.report {
            if let Err(e) = GameOverMessage::new(final_score).write_to(path) {
                log::error!("{e:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_clock_runs_from_start() {
        let t0 = Instant::now();
        let clock = GameClock::new(t0);
        assert_eq!(clock.now_ms(t0), 0);
        assert_eq!(clock.now_ms(t0 + ms(1500)), 1500);
    }

    #[test]
    fn test_clock_excludes_paused_time() {
        let t0 = Instant::now();
        let mut clock = GameClock::new(t0);
        clock.pause(t0 + ms(1000));
        assert!(clock.is_paused());
        assert_eq!(clock.now_ms(t0 + ms(4000)), 1000);

        clock.resume(t0 + ms(5000));
        assert_eq!(clock.now_ms(t0 + ms(5000)), 1000);
        assert_eq!(clock.now_ms(t0 + ms(5250)), 1250);
    }

    #[test]
    fn test_clock_double_pause_keeps_first() {
        let t0 = Instant::now();
        let mut clock = GameClock::new(t0);
        clock.pause(t0 + ms(100));
        clock.pause(t0 + ms(300));
        clock.resume(t0 + ms(400));
        clock.resume(t0 + ms(900));
        assert_eq!(clock.now_ms(t0 + ms(1000)), 700);
    }

    #[test]
    fn test_game_over_message_json() {
        let json = serde_json::to_string(&GameOverMessage::new(42)).unwrap();
        assert_eq!(json, r#"{"type":"GAME_OVER","data":{"finalScore":42}}"#);
    }

    #[test]
    fn test_game_over_message_written_to_file() {
        let path = std::env::temp_dir().join(format!("muserun-report-{}.json", std::process::id()));
        GameOverMessage::new(7).write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["type"], "GAME_OVER");
        assert_eq!(value["data"]["finalScore"], 7);
    }
}
