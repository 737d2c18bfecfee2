//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Palette;
use crate::notes::{GameKey, KeyMap};
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// UI colours plus one platform colour per note key.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Platform colour for each key, indexed by [`GameKey`].
    pub keys: KeyMap<Color>,
    /// World background.
    pub bg: Color,
    /// Borders and the ground line.
    pub div_line: Color,
    /// Text (score, labels).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Frozen platforms and secondary text.
    pub inactive_fg: Color,
    pub runner: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

/// 0xRRGGBB → Color.
pub const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

/// Saturated colours for low-quality displays, ordered by [`GameKey::ALL`].
const HIGH_CONTRAST_KEYS: [u32; GameKey::COUNT] = [
    0xFF0000, 0xFF8800, 0xFFFF00, 0x00FF00, 0x0088FF, 0xAA00FF, 0xFF00FF, 0xFF4444, 0x00FFFF,
    0x88CCFF, 0xCC44FF, 0xFFAA00, 0x00FFAA, 0x44FF44,
];

/// Blue/orange/yellow family only, no red/green pairs at neighbouring heights.
const COLORBLIND_KEYS: [u32; GameKey::COUNT] = [
    0x0077BB, 0xEE7733, 0x33BBEE, 0xEE3377, 0xBBBB00, 0x009988, 0xCC3311, 0xAA4499, 0x88CCEE,
    0xDDCC77, 0x332288, 0xEE8866, 0x44AA99, 0xFFAABB,
];

impl Theme {
    /// One Dark UI colours; platform colours are the canonical per-key set.
    pub fn onedark_default() -> Self {
        Self {
            keys: KeyMap::from_fn(|key| rgb(key.level_color())),
            bg: rgb(0x282C34),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
            runner: rgb(0xFFFFFF),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to defaults if path is None or the file is missing.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            Some(p) => {
                log::warn!("theme file {} not found, using defaults", p.display());
                return Ok(Self::default_for_palette(palette));
            }
            None => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        log::info!("loaded theme {} ({} keys)", path.display(), map.len());
        Ok(theme)
    }

    pub fn default_for_palette(palette: Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override platform colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        let table = match palette {
            Palette::Normal => return,
            Palette::HighContrast => {
                self.inactive_fg = rgb(0x888888);
                &HIGH_CONTRAST_KEYS
            }
            Palette::Colorblind => &COLORBLIND_KEYS,
        };
        self.keys = KeyMap::from_fn(|key| rgb(table[key.index()]));
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::onedark_default();
        Self {
            // theme[key_s], theme[key_semicolon], ...
            keys: KeyMap::from_fn(|key| {
                get(&format!("key_{}", key_theme_name(key))).unwrap_or(base.keys[key])
            }),
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
            runner: get("runner").or_else(|| get("hi_fg")).unwrap_or(base.runner),
        }
    }

    #[inline]
    pub fn key_color(&self, key: GameKey) -> Color {
        self.keys[key]
    }
}

fn key_theme_name(key: GameKey) -> &'static str {
    match key {
        GameKey::S => "s",
        GameKey::D => "d",
        GameKey::F => "f",
        GameKey::G => "g",
        GameKey::H => "h",
        GameKey::J => "j",
        GameKey::K => "k",
        GameKey::R => "r",
        GameKey::U => "u",
        GameKey::I => "i",
        GameKey::A => "a",
        GameKey::L => "l",
        GameKey::Semicolon => "semicolon",
        GameKey::Quote => "quote",
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'').trim();
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&s[range], 16).map_err(|_| invalid())
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("zzzzzz").is_err());
        assert!(parse_hex("#ééé").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_default_key_colours_match_levels() {
        let theme = Theme::default();
        assert_eq!(theme.key_color(GameKey::S), Color::Rgb(0xe7, 0x4c, 0x3c));
        assert_eq!(theme.key_color(GameKey::Quote), Color::Rgb(0x27, 0xae, 0x60));
    }

    #[test]
    fn test_key_override_from_file() {
        let map = parse_theme_file(
            "# comment\ntheme[key_semicolon]='#010203'\ntheme[title]=\"#FFF\"\ntheme[main_fg]=\"nope\"",
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.key_color(GameKey::Semicolon), Color::Rgb(1, 2, 3));
        assert_eq!(theme.title, Color::Rgb(255, 255, 255));
        assert_eq!(theme.main_fg, Theme::default().main_fg);
        assert_eq!(theme.key_color(GameKey::S), Theme::default().key_color(GameKey::S));
    }

    #[test]
    fn test_palettes_keep_key_colours_distinct() {
        for palette in [Palette::HighContrast, Palette::Colorblind] {
            let theme = Theme::default_for_palette(palette);
            for a in GameKey::ALL {
                for b in GameKey::ALL {
                    if a != b {
                        assert_ne!(theme.key_color(a), theme.key_color(b), "{palette:?} {a} {b}");
                    }
                }
            }
        }
    }
}
