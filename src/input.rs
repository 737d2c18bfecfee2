//! Key bindings, raw keyboard state and the per-tick held-key tracker.

use crate::notes::{GameKey, KeyMap, KeySet};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

/// Host action from a key press. Note keys are not actions; they go to the keyboard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Pause,
    Restart,
    Menu,
    Quit,
    None,
}

/// Map key event to host action. `R` is a note key, so restart while playing is Backspace.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    match code {
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Char('q') | KeyCode::Char('Q') if no_mod => Action::Quit,
        KeyCode::Char('p') | KeyCode::Char('P') if no_mod => Action::Pause,
        KeyCode::Esc => Action::Menu,
        KeyCode::Backspace => Action::Restart,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Start,
        _ => Action::None,
    }
}

/// Note key carried by a key event, ignoring Ctrl/Alt chords.
pub fn note_key(key: &KeyEvent) -> Option<GameKey> {
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return None;
    }
    match key.code {
        KeyCode::Char(c) => GameKey::from_char(c),
        _ => None,
    }
}

/// Raw down/up state of the note keys.
pub trait KeyboardSource {
    fn is_down(&self, key: GameKey) -> bool;
}

/// Result of one tracker sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeySample {
    pub held: KeySet,
    pub changed: bool,
}

/// Samples the keyboard once per tick and reports edges in the held set.
#[derive(Debug, Clone, Default)]
pub struct KeyTracker {
    held: KeySet,
    last_sample_ms: Option<u64>,
}

impl KeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-read every note key. With no keyboard the held set stays empty and never changes.
    /// `now_ms` is recorded but does not affect the result.
    pub fn sample(&mut self, source: Option<&dyn KeyboardSource>, now_ms: u64) -> KeySample {
        self.last_sample_ms = Some(now_ms);
        let Some(source) = source else {
            self.held = KeySet::empty();
            return KeySample::default();
        };
        let held: KeySet = GameKey::ALL
            .into_iter()
            .filter(|k| source.is_down(*k))
            .collect();
        let changed = held != self.held;
        self.held = held;
        KeySample { held, changed }
    }

    pub fn held(&self) -> KeySet {
        self.held
    }

    pub fn last_sample_ms(&self) -> Option<u64> {
        self.last_sample_ms
    }
}

/// Keyboard state rebuilt from crossterm key events.
///
/// Terminals that report key releases give exact state. Elsewhere a key counts as down
/// until its timeout passes without a press or auto-repeat for it. Before the first
/// repeat the timeout is `repeat_delay`, which has to outlast the OS key-repeat delay;
/// after that it is the shorter `hold_timeout`. The first release event seen switches to
/// exact tracking for the rest of the session.
#[derive(Debug, Clone)]
pub struct TerminalKeyboard {
    holds: KeyMap<Option<KeyHold>>,
    release_events: bool,
    repeat_delay: Duration,
    hold_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
struct KeyHold {
    last_seen: Instant,
    repeating: bool,
}

impl TerminalKeyboard {
    pub fn new(release_events: bool, repeat_delay: Duration, hold_timeout: Duration) -> Self {
        Self {
            holds: KeyMap::default(),
            release_events,
            repeat_delay: repeat_delay.max(hold_timeout),
            hold_timeout,
        }
    }

    pub fn reports_releases(&self) -> bool {
        self.release_events
    }

    /// Apply one key event. Returns the note key it touched, if any.
    pub fn handle(&mut self, event: &KeyEvent, now: Instant) -> Option<GameKey> {
        let key = note_key(event)?;
        match event.kind {
            // Legacy terminals report auto-repeat as another press.
            KeyEventKind::Press | KeyEventKind::Repeat => {
                let repeating =
                    event.kind == KeyEventKind::Repeat || self.holds[key].is_some();
                self.holds[key] = Some(KeyHold {
                    last_seen: now,
                    repeating,
                });
            }
            KeyEventKind::Release => {
                if !self.release_events {
                    log::debug!("terminal reports key releases; exact key tracking on");
                }
                self.release_events = true;
                self.holds[key] = None;
            }
        }
        Some(key)
    }

    /// Drop keys whose hold timeout ran out. No-op when releases are reported.
    pub fn expire(&mut self, now: Instant) {
        if self.release_events {
            return;
        }
        for key in GameKey::ALL {
            let Some(hold) = self.holds[key] else {
                continue;
            };
            let timeout = if hold.repeating {
                self.hold_timeout
            } else {
                self.repeat_delay
            };
            if now.saturating_duration_since(hold.last_seen) >= timeout {
                self.holds[key] = None;
            }
        }
    }

    pub fn clear(&mut self) {
        self.holds = KeyMap::default();
    }
}

impl KeyboardSource for TerminalKeyboard {
    fn is_down(&self, key: GameKey) -> bool {
        self.holds[key].is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Held(KeySet);

    impl KeyboardSource for Held {
        fn is_down(&self, key: GameKey) -> bool {
            self.0.contains(key)
        }
    }

    fn held(keys: &[GameKey]) -> Held {
        Held(keys.iter().copied().collect())
    }

    fn press(c: char) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Press)
    }

    fn release(c: char) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Release)
    }

    #[test]
    fn test_tracker_reports_change_on_press_and_release() {
        let mut tracker = KeyTracker::new();
        let first = tracker.sample(Some(&held(&[GameKey::S])), 0);
        assert!(first.changed);
        assert!(first.held.contains(GameKey::S));

        let same = tracker.sample(Some(&held(&[GameKey::S])), 16);
        assert!(!same.changed);

        let released = tracker.sample(Some(&held(&[])), 32);
        assert!(released.changed);
        assert!(released.held.is_empty());
    }

    #[test]
    fn test_tracker_detects_swap_with_equal_size() {
        let mut tracker = KeyTracker::new();
        tracker.sample(Some(&held(&[GameKey::S, GameKey::F])), 0);
        let swapped = tracker.sample(Some(&held(&[GameKey::S, GameKey::H])), 16);
        assert!(swapped.changed);
    }

    #[test]
    fn test_tracker_without_keyboard_is_empty_forever() {
        let mut tracker = KeyTracker::new();
        for t in 0..5 {
            let sample = tracker.sample(None, t * 16);
            assert!(sample.held.is_empty());
            assert!(!sample.changed);
        }
        assert_eq!(tracker.last_sample_ms(), Some(64));
    }

    #[test]
    fn test_terminal_keyboard_press_release() {
        let now = Instant::now();
        let mut kb = TerminalKeyboard::new(false, Duration::from_millis(800), Duration::from_millis(500));
        assert_eq!(kb.handle(&press('s'), now), Some(GameKey::S));
        assert!(kb.is_down(GameKey::S));
        kb.handle(&release('s'), now);
        assert!(!kb.is_down(GameKey::S));
        assert!(kb.reports_releases());
    }

    fn repeat(c: char) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Repeat)
    }

    #[test]
    fn test_terminal_keyboard_hold_timeout_without_releases() {
        let t0 = Instant::now();
        let ms = Duration::from_millis;
        let mut kb = TerminalKeyboard::new(false, ms(800), ms(500));
        kb.handle(&press(';'), t0);
        kb.expire(t0 + ms(799));
        assert!(kb.is_down(GameKey::Semicolon));
        kb.expire(t0 + ms(800));
        assert!(!kb.is_down(GameKey::Semicolon));
    }

    #[test]
    fn test_terminal_keyboard_survives_os_repeat_delay() {
        let t0 = Instant::now();
        let ms = Duration::from_millis;
        let mut kb = TerminalKeyboard::new(false, ms(800), ms(500));
        kb.handle(&press('s'), t0);
        // First auto-repeat at 672 ms, then every 32 ms.
        for t in (0..=1312).step_by(16) {
            if t >= 672 && (t - 672) % 32 == 0 {
                kb.handle(&repeat('s'), t0 + ms(t));
            }
            kb.expire(t0 + ms(t));
            assert!(kb.is_down(GameKey::S), "dropped at {t} ms");
        }
        // Last repeat at 1312 ms; repeats use the shorter timeout.
        kb.expire(t0 + ms(1811));
        assert!(kb.is_down(GameKey::S));
        kb.expire(t0 + ms(1812));
        assert!(!kb.is_down(GameKey::S));
    }

    #[test]
    fn test_legacy_repeat_press_counts_as_repeat() {
        let t0 = Instant::now();
        let ms = Duration::from_millis;
        let mut kb = TerminalKeyboard::new(false, ms(800), ms(100));
        kb.handle(&press('d'), t0);
        kb.handle(&press('d'), t0 + ms(700));
        kb.expire(t0 + ms(800));
        assert!(!kb.is_down(GameKey::D));
    }

    #[test]
    fn test_terminal_keyboard_ignores_non_note_keys() {
        let mut kb = TerminalKeyboard::new(true, Duration::from_millis(800), Duration::from_millis(500));
        assert_eq!(kb.handle(&press('q'), Instant::now()), None);
        let ctrl_s = KeyEvent::new_with_kind(KeyCode::Char('s'), KeyModifiers::CONTROL, KeyEventKind::Press);
        assert_eq!(kb.handle(&ctrl_s, Instant::now()), None);
        assert!(!kb.is_down(GameKey::S));
    }

    #[test]
    fn test_key_to_action_bindings() {
        assert_eq!(key_to_action(press('q')), Action::Quit);
        assert_eq!(key_to_action(press('p')), Action::Pause);
        assert_eq!(key_to_action(press(' ')), Action::Start);
        assert_eq!(key_to_action(press('r')), Action::None);
        let bs = KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(key_to_action(bs), Action::Restart);
    }
}
