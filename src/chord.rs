//! Chord detection: one live session, points ramp linearly over the accumulation window.

use crate::notes::{ChordDefinition, ChordTable, KeySet};

/// Accumulation state for the chord currently held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordSession {
    pub name: &'static str,
    pub base_points: u32,
    pub start_ms: u64,
    pub accumulated: u32,
    pub complete: bool,
}

impl ChordSession {
    fn start(chord: ChordDefinition, now_ms: u64) -> Self {
        Self {
            name: chord.name,
            base_points: chord.base_points,
            start_ms: now_ms,
            accumulated: 0,
            complete: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Fraction of the window elapsed, clamped to [0, 1].
    pub fn progress(&self, now_ms: u64, window_ms: u64) -> f64 {
        let elapsed = now_ms.saturating_sub(self.start_ms) as f64;
        (elapsed / window_ms as f64).clamp(0.0, 1.0)
    }
}

/// What the detector produced on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChordUpdate {
    /// Increase in accumulated points since the previous tick.
    pub points: u32,
    pub name: Option<&'static str>,
    pub accumulated: u32,
    pub base_points: u32,
    /// True only on the tick the session reached the full window.
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct ChordDetector {
    table: ChordTable,
    window_ms: u64,
    session: Option<ChordSession>,
}

impl ChordDetector {
    pub fn new(table: ChordTable, window_ms: u64) -> Self {
        debug_assert!(window_ms > 0);
        Self {
            table,
            window_ms,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&ChordSession> {
        self.session.as_ref()
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Advance the session for the held set. A different chord, or none, discards
    /// the live session with no carry-over.
    pub fn update(&mut self, held: KeySet, now_ms: u64) -> ChordUpdate {
        let Some(chord) = self.table.chord_for_keys(held) else {
            if let Some(old) = self.session.take() {
                log::debug!("chord released: {} ({}/{})", old.name, old.accumulated, old.base_points);
            }
            return ChordUpdate::default();
        };

        let window_ms = self.window_ms;
        let session = match &mut self.session {
            Some(s) if s.name == chord.name => s,
            slot => {
                log::debug!("chord started: {} worth {}", chord.name, chord.base_points);
                slot.insert(ChordSession::start(chord, now_ms))
            }
        };

        // floor(base * min(elapsed / window, 1)) in integer arithmetic.
        let elapsed = now_ms.saturating_sub(session.start_ms).min(window_ms);
        let accumulated = (u64::from(session.base_points) * elapsed / window_ms) as u32;
        let points = accumulated.saturating_sub(session.accumulated);
        session.accumulated = accumulated;

        let completed = elapsed == window_ms && !session.complete;
        if completed {
            session.complete = true;
            log::debug!("chord complete: {} +{}", session.name, session.base_points);
        }

        ChordUpdate {
            points,
            name: Some(session.name),
            accumulated,
            base_points: session.base_points,
            completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::GameKey;
    use proptest::prelude::*;

    const WINDOW: u64 = 1000;

    fn keys(list: &[GameKey]) -> KeySet {
        list.iter().copied().collect()
    }

    fn c_major() -> KeySet {
        keys(&[GameKey::S, GameKey::F, GameKey::H])
    }

    fn detector() -> ChordDetector {
        ChordDetector::new(ChordTable::new(), WINDOW)
    }

    /// Hold `held` from t=0 to t=WINDOW in `ticks` equal steps and sum the deltas.
    fn hold_for_window(det: &mut ChordDetector, held: KeySet, ticks: u64) -> u32 {
        (0..=ticks)
            .map(|i| det.update(held, i * WINDOW / ticks).points)
            .sum()
    }

    #[test]
    fn test_c_major_credits_base_points_over_window() {
        let mut det = detector();
        let first = det.update(c_major(), 0);
        assert_eq!(first.name, Some("C Major (I)"));
        assert_eq!(first.base_points, 50);
        assert_eq!(first.points, 0);

        let mut total = 0;
        for t in (100..=1000).step_by(100) {
            total += det.update(c_major(), t).points;
        }
        assert_eq!(total, 50);
        assert!(det.session().unwrap().is_complete());
    }

    #[test]
    fn test_sum_is_base_points_for_1_10_100_ticks() {
        for ticks in [1, 10, 100] {
            let mut det = detector();
            assert_eq!(hold_for_window(&mut det, c_major(), ticks), 50, "{ticks} ticks");
        }
    }

    #[test]
    fn test_never_exceeds_base_points_when_held_longer() {
        let mut det = detector();
        let mut total = hold_for_window(&mut det, c_major(), 10);
        for t in (1100..5000).step_by(100) {
            total += det.update(c_major(), t).points;
        }
        assert_eq!(total, 50);
    }

    #[test]
    fn test_completed_fires_once() {
        let mut det = detector();
        det.update(c_major(), 0);
        assert!(det.update(c_major(), 1000).completed);
        assert!(!det.update(c_major(), 1200).completed);
    }

    #[test]
    fn test_single_key_scores_nothing() {
        let mut det = detector();
        for t in (0..=1000).step_by(100) {
            let update = det.update(keys(&[GameKey::S]), t);
            assert_eq!(update, ChordUpdate::default());
        }
        assert!(det.session().is_none());
    }

    #[test]
    fn test_switching_chord_resets_accumulation() {
        let mut det = detector();
        det.update(c_major(), 0);
        let partial = det.update(c_major(), 500);
        assert_eq!(partial.accumulated, 25);

        let g_major = keys(&[GameKey::H, GameKey::K, GameKey::D]);
        let switched = det.update(g_major, 600);
        assert_eq!(switched.name, Some("G Major (V)"));
        assert_eq!(switched.accumulated, 0);
        assert_eq!(switched.points, 0);

        let mut total = 0;
        for t in (700..=1600).step_by(100) {
            total += det.update(g_major, t).points;
        }
        assert_eq!(total, 50);
    }

    #[test]
    fn test_no_chord_discards_session() {
        let mut det = detector();
        det.update(c_major(), 0);
        det.update(c_major(), 400);
        det.update(keys(&[GameKey::S]), 450);
        assert!(det.session().is_none());

        let restarted = det.update(c_major(), 500);
        assert_eq!(restarted.accumulated, 0);
    }

    #[test]
    fn test_power_chord_value() {
        let mut det = detector();
        det.update(keys(&[GameKey::S, GameKey::H]), 0);
        let done = det.update(keys(&[GameKey::S, GameKey::H]), 1000);
        assert_eq!(done.name, Some("C5"));
        assert_eq!(done.points, 25);
    }

    proptest! {
        #[test]
        fn prop_deltas_sum_to_base_points(steps in proptest::collection::vec(1u64..400, 1..60)) {
            let mut det = detector();
            let mut now = 0;
            let mut total = det.update(c_major(), now).points;
            for step in steps {
                now += step;
                total += det.update(c_major(), now).points;
            }
            let expected = if now >= WINDOW { 50 } else { (50 * now / WINDOW) as u32 };
            prop_assert_eq!(total, expected);
        }
    }
}
