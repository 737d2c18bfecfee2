//! Note keys, per-key level tables and the chord lookup tables.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Physical keys bound to a note and a platform height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameKey {
    S,
    D,
    F,
    G,
    H,
    J,
    K,
    R,
    U,
    I,
    A,
    L,
    Semicolon,
    Quote,
}

impl GameKey {
    pub const COUNT: usize = 14;

    pub const ALL: [Self; Self::COUNT] = [
        Self::S,
        Self::D,
        Self::F,
        Self::G,
        Self::H,
        Self::J,
        Self::K,
        Self::R,
        Self::U,
        Self::I,
        Self::A,
        Self::L,
        Self::Semicolon,
        Self::Quote,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Key for a typed character; letters are case-insensitive.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            's' => Some(Self::S),
            'd' => Some(Self::D),
            'f' => Some(Self::F),
            'g' => Some(Self::G),
            'h' => Some(Self::H),
            'j' => Some(Self::J),
            'k' => Some(Self::K),
            'r' => Some(Self::R),
            'u' => Some(Self::U),
            'i' => Some(Self::I),
            'a' => Some(Self::A),
            'l' => Some(Self::L),
            ';' => Some(Self::Semicolon),
            '\'' => Some(Self::Quote),
            _ => None,
        }
    }

    /// Label printed on the keyboard legend.
    pub fn label(self) -> char {
        match self {
            Self::S => 'S',
            Self::D => 'D',
            Self::F => 'F',
            Self::G => 'G',
            Self::H => 'H',
            Self::J => 'J',
            Self::K => 'K',
            Self::R => 'R',
            Self::U => 'U',
            Self::I => 'I',
            Self::A => 'A',
            Self::L => 'L',
            Self::Semicolon => ';',
            Self::Quote => '\'',
        }
    }

    /// Pitch class used for chord matching. Octave duplicates share a name.
    pub fn note(self) -> NoteName {
        match self {
            Self::S | Self::L => NoteName::C,
            Self::D | Self::Semicolon => NoteName::D,
            Self::F | Self::Quote => NoteName::E,
            Self::G => NoteName::F,
            Self::H => NoteName::G,
            Self::J => NoteName::A,
            Self::K | Self::A => NoteName::B,
            Self::R => NoteName::DSharp,
            Self::U => NoteName::GSharp,
            Self::I => NoteName::BFlat,
        }
    }

    /// Pitch with octave, e.g. "C4" or "B3".
    pub fn pitch_label(self) -> &'static str {
        match self {
            Self::S => "C4",
            Self::D => "D4",
            Self::F => "E4",
            Self::G => "F4",
            Self::H => "G4",
            Self::J => "A4",
            Self::K => "B4",
            Self::R => "D#4",
            Self::U => "G#4",
            Self::I => "Bb4",
            Self::A => "B3",
            Self::L => "C5",
            Self::Semicolon => "D5",
            Self::Quote => "E5",
        }
    }

    /// Vertical offset of this key's platform relative to the screen bottom.
    /// More negative is higher; every key has a distinct height.
    pub fn level_height(self) -> f64 {
        match self {
            Self::A => -40.0,
            Self::S => -80.0,
            Self::R => -100.0,
            Self::D => -120.0,
            Self::F => -160.0,
            Self::G => -200.0,
            Self::H => -240.0,
            Self::U => -260.0,
            Self::J => -280.0,
            Self::I => -300.0,
            Self::K => -320.0,
            Self::L => -360.0,
            Self::Semicolon => -400.0,
            Self::Quote => -440.0,
        }
    }

    /// Platform colour as 0xRRGGBB.
    pub fn level_color(self) -> u32 {
        match self {
            Self::S => 0xe7_4c_3c,
            Self::D => 0xf3_9c_12,
            Self::F => 0xf1_c4_0f,
            Self::G => 0x2e_cc_71,
            Self::H => 0x34_98_db,
            Self::J => 0x9b_59_b6,
            Self::K => 0xe9_1e_63,
            Self::R => 0xff_6b_6b,
            Self::U => 0x4e_cd_c4,
            Self::I => 0x45_b7_d1,
            Self::A => 0x8e_44_ad,
            Self::L => 0xe6_7e_22,
            Self::Semicolon => 0x16_a0_85,
            Self::Quote => 0x27_ae_60,
        }
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Pitch-class label shared by one or more keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
    DSharp,
    GSharp,
    BFlat,
}

impl NoteName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
            Self::G => "G",
            Self::A => "A",
            Self::B => "B",
            Self::DSharp => "D#",
            Self::GSharp => "G#",
            Self::BFlat => "Bb",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of held keys as a bitset over `GameKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct KeySet(u16);

impl KeySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub fn insert(&mut self, key: GameKey) {
        self.0 |= 1 << key.index();
    }

    #[allow(dead_code)]
    #[inline]
    pub fn remove(&mut self, key: GameKey) {
        self.0 &= !(1 << key.index());
    }

    #[inline]
    pub fn contains(self, key: GameKey) -> bool {
        self.0 & (1 << key.index()) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Keys in `self` but not in `other`.
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn is_subset(self, other: Self) -> bool {
        self.0 & !other.0 == 0
    }

    /// Keys in `GameKey::ALL` order.
    pub fn iter(self) -> impl Iterator<Item = GameKey> {
        GameKey::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<GameKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = GameKey>>(iter: I) -> Self {
        let mut set = Self::empty();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// Fixed-size map with one slot per `GameKey`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap<T>([T; GameKey::COUNT]);

impl<T> KeyMap<T> {
    pub fn from_fn(mut f: impl FnMut(GameKey) -> T) -> Self {
        Self(std::array::from_fn(|i| f(GameKey::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (GameKey, &T)> {
        GameKey::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Default> Default for KeyMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<GameKey> for KeyMap<T> {
    type Output = T;

    fn index(&self, key: GameKey) -> &T {
        &self.0[key.index()]
    }
}

impl<T> IndexMut<GameKey> for KeyMap<T> {
    fn index_mut(&mut self, key: GameKey) -> &mut T {
        &mut self.0[key.index()]
    }
}

/// Map held keys to their note names, in key order. Duplicates are kept.
pub fn keys_to_notes(keys: KeySet) -> Vec<NoteName> {
    keys.iter().map(GameKey::note).collect()
}

/// Named chord and the points it is worth when held for the full window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordDefinition {
    pub name: &'static str,
    pub base_points: u32,
}

const NOTE_DELIMITER: &str = ",";

/// Diatonic chords in C major. Keys are note names sorted and joined with ','.
const DIATONIC_CHORDS: &[(&str, &str, u32)] = &[
    // triads
    ("C,E,G", "C Major (I)", 50),
    ("A,D,F", "D Minor (ii)", 50),
    ("B,E,G", "E Minor (iii)", 50),
    ("A,C,F", "F Major (IV)", 50),
    ("B,D,G", "G Major (V)", 50),
    ("A,C,E", "A Minor (vi)", 50),
    ("B,D,F", "B Diminished (vii°)", 50),
    // sevenths
    ("B,C,E,G", "C Major 7 (IΔ7)", 100),
    ("A,C,D,F", "D Minor 7 (ii7)", 100),
    ("B,D,E,G", "E Minor 7 (iii7)", 100),
    ("A,C,E,F", "F Major 7 (IVΔ7)", 100),
    ("B,D,F,G", "G Dominant 7 (V7)", 100),
    ("A,C,E,G", "A Minor 7 (vi7)", 100),
    ("A,B,D,F", "B Half-Diminished 7 (viiø7)", 100),
    // ninths
    ("B,C,D,E,G", "C Major 9", 150),
    ("A,C,D,E,F", "D Minor 9", 150),
    ("A,B,D,F,G", "G9 (Dominant 9)", 150),
    ("A,B,C,E,G", "A Minor 9", 150),
    // suspended
    ("C,F,G", "Csus4", 50),
    ("C,D,G", "Csus2", 50),
    ("A,D,G", "Dsus4", 50),
    // add
    ("C,D,E,G", "Cadd9", 75),
    // power chords
    ("C,G", "C5", 25),
    ("A,D", "D5", 25),
    ("B,E", "E5", 25),
    ("C,F", "F5", 25),
    ("D,G", "G5", 25),
    ("A,E", "A5", 25),
    ("B,F", "B5", 25),
];

/// Chromatic extensions. Entries spelled with A#, C# or F# cannot be produced by any key.
const CHROMATIC_CHORDS: &[(&str, &str, u32)] = &[
    ("A,C,D#", "A Diminished (viio/iii)", 50),
    ("A,C#,E", "A Major (V/ii)", 50),
    ("A,D,F#", "D Major (V/V)", 50),
    ("A#,C#,E", "A# Diminished (viio/bII)", 50),
    ("A#,C,D,F", "F Minor (iv)", 50),
    ("A#,F,G#", "F Augmented (IV+)", 50),
    ("A#,D,F", "Bb Major (bVII)", 50),
    ("A#,D,G", "G Minor (v)", 50),
    ("A#,D,G#", "Ab Major (bVI)", 50),
    ("B,D#,G#", "G# Minor (iii/vi)", 50),
    ("C,D#,G", "C Minor (i)", 50),
    ("A#,C,D#,G", "C Minor 7 (i7)", 100),
    ("C,E,G#", "C Augmented (I+)", 50),
    ("B,C,E,G#", "C Augmented Major 7 (I+Δ7)", 100),
    ("C#,E,G#", "C# Diminished (viio/ii)", 50),
    ("C#,F,G#", "C# Minor (ii/ii)", 50),
    ("B,C#,F,G#", "C# Minor 7 (ii7/ii)", 100),
    ("D,F,G#", "D Augmented (II+)", 50),
    ("A#,D#,G", "Eb Minor (biii)", 50),
    ("B,D#,G", "D# Diminished", 50),
    ("B,E,G#", "E Major (III)", 50),
    ("B,D,E,G#", "E Dominant 7 (V7/vi)", 100),
    ("C,F,G#", "F Augmented (IV+)", 50),
    ("A#,C,F", "F Minor (iv)", 50),
    ("A#,C,F,G#", "F Augmented (IV+)", 50),
    // power chords
    ("A#,F", "Bb5 (bVII5)", 25),
    ("A#,D#", "Eb5 (bIII5)", 25),
    ("D#,G#", "Ab5 (bVI5)", 25),
];

/// Immutable chord lookup: diatonic table first, then the chromatic one.
#[derive(Debug, Clone)]
pub struct ChordTable {
    diatonic: HashMap<&'static str, ChordDefinition>,
    chromatic: HashMap<&'static str, ChordDefinition>,
}

fn build_table(entries: &[(&'static str, &'static str, u32)]) -> HashMap<&'static str, ChordDefinition> {
    entries
        .iter()
        .map(|&(notes, name, base_points)| (notes, ChordDefinition { name, base_points }))
        .collect()
}

impl ChordTable {
    pub fn new() -> Self {
        Self {
            diatonic: build_table(DIATONIC_CHORDS),
            chromatic: build_table(CHROMATIC_CHORDS),
        }
    }

    /// Canonical lookup key: labels sorted lexicographically and joined.
    pub fn canonical(notes: &[NoteName]) -> String {
        let mut labels: Vec<&str> = notes.iter().map(|n| n.as_str()).collect();
        labels.sort_unstable();
        labels.join(NOTE_DELIMITER)
    }

    /// First match wins; the diatonic table shadows the chromatic one.
    pub fn chord_for(&self, notes: &[NoteName]) -> Option<ChordDefinition> {
        let key = Self::canonical(notes);
        self.diatonic
            .get(key.as_str())
            .or_else(|| self.chromatic.get(key.as_str()))
            .copied()
    }

    pub fn chord_for_keys(&self, keys: KeySet) -> Option<ChordDefinition> {
        self.chord_for(&keys_to_notes(keys))
    }
}

impl Default for ChordTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[GameKey]) -> KeySet {
        list.iter().copied().collect()
    }

    #[test]
    fn test_level_heights_are_distinct() {
        let mut heights: Vec<i64> = GameKey::ALL.iter().map(|k| k.level_height() as i64).collect();
        heights.sort_unstable();
        heights.dedup();
        assert_eq!(heights.len(), GameKey::COUNT);
    }

    #[test]
    fn test_octave_keys_share_note_names() {
        assert_eq!(GameKey::S.note(), GameKey::L.note());
        assert_eq!(GameKey::K.note(), GameKey::A.note());
        assert_eq!(GameKey::D.note(), GameKey::Semicolon.note());
        assert_eq!(GameKey::F.note(), GameKey::Quote.note());
    }

    #[test]
    fn test_from_char_round_trips_labels() {
        for key in GameKey::ALL {
            assert_eq!(GameKey::from_char(key.label()), Some(key));
        }
        assert_eq!(GameKey::from_char('s'), Some(GameKey::S));
        assert_eq!(GameKey::from_char('q'), None);
    }

    #[test]
    fn test_canonical_sorts_lexicographically() {
        let notes = [NoteName::G, NoteName::DSharp, NoteName::C, NoteName::BFlat];
        assert_eq!(ChordTable::canonical(&notes), "Bb,C,D#,G");
    }

    #[test]
    fn test_c_major_from_keys() {
        let table = ChordTable::new();
        let chord = table
            .chord_for_keys(keys(&[GameKey::H, GameKey::S, GameKey::F]))
            .unwrap();
        assert_eq!(chord.name, "C Major (I)");
        assert_eq!(chord.base_points, 50);
    }

    #[test]
    fn test_octave_duplicate_key_matches_same_chord() {
        let table = ChordTable::new();
        let low = table.chord_for_keys(keys(&[GameKey::S, GameKey::F, GameKey::H]));
        let high = table.chord_for_keys(keys(&[GameKey::L, GameKey::F, GameKey::H]));
        assert_eq!(low, high);
    }

    #[test]
    fn test_duplicate_notes_do_not_match() {
        let table = ChordTable::new();
        // C,C,E,G is not deduplicated and has no entry.
        let chord = table.chord_for_keys(keys(&[GameKey::S, GameKey::L, GameKey::F, GameKey::H]));
        assert!(chord.is_none());
        assert!(table.chord_for_keys(keys(&[GameKey::S, GameKey::L])).is_none());
    }

    #[test]
    fn test_single_note_never_matches() {
        let table = ChordTable::new();
        for key in GameKey::ALL {
            assert!(table.chord_for_keys(keys(&[key])).is_none(), "{key}");
        }
    }

    #[test]
    fn test_chromatic_table_is_probed() {
        let table = ChordTable::new();
        let chord = table
            .chord_for_keys(keys(&[GameKey::S, GameKey::R, GameKey::H]))
            .unwrap();
        assert_eq!(chord.name, "C Minor (i)");
        let power = table.chord_for_keys(keys(&[GameKey::R, GameKey::U])).unwrap();
        assert_eq!(power.name, "Ab5 (bVI5)");
    }

    #[test]
    fn test_tables_do_not_collide() {
        let table = ChordTable::new();
        for notes in table.diatonic.keys() {
            assert!(!table.chromatic.contains_key(notes), "{notes} in both tables");
        }
    }

    #[test]
    fn test_key_set_ops() {
        let mut set = KeySet::empty();
        set.insert(GameKey::K);
        set.insert(GameKey::S);
        set.insert(GameKey::S);
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![GameKey::S, GameKey::K]);
        set.remove(GameKey::S);
        assert!(!set.contains(GameKey::S));
        assert!(set.is_subset(keys(&[GameKey::K, GameKey::F])));
        assert_eq!(keys(&[GameKey::K, GameKey::F]).difference(set), keys(&[GameKey::F]));
    }

    #[test]
    fn test_key_map_indexing() {
        let mut map: KeyMap<u32> = KeyMap::default();
        map[GameKey::Quote] = 7;
        assert_eq!(map[GameKey::Quote], 7);
        assert_eq!(map.iter().filter(|(_, v)| **v == 7).count(), 1);
    }
}
