//! Running score. Only platform bonuses, chord deltas and ground decay touch it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    total: u64,
    platform_points: u64,
    chord_points: u64,
    decayed: u64,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn platform_points(&self) -> u64 {
        self.platform_points
    }

    pub fn chord_points(&self) -> u64 {
        self.chord_points
    }

    /// Points actually taken by decay (after clamping at zero).
    pub fn decayed(&self) -> u64 {
        self.decayed
    }

    pub fn add_platform_bonus(&mut self, points: u32) {
        self.total += u64::from(points);
        self.platform_points += u64::from(points);
    }

    pub fn add_chord_points(&mut self, points: u32) {
        self.total += u64::from(points);
        self.chord_points += u64::from(points);
    }

    /// Subtract `penalty`, never going below zero. Returns what was taken.
    pub fn apply_decay(&mut self, penalty: u32) -> u64 {
        let taken = self.total.min(u64::from(penalty));
        self.total -= taken;
        self.decayed += taken;
        taken
    }
}
