//! muserun: rhythm-platformer in the terminal. Hold note keys to raise platforms,
//! ride the highest one, and hold chords for points.

mod app;
mod chord;
mod config;
mod game;
mod input;
mod notes;
mod platform;
mod runner;
mod score;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use config::GameConfig;
use log::LevelFilter;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }
    let config = args.game_config();
    config.validate().context("invalid game settings")?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("failed to load theme: {e}; using defaults");
        theme::Theme::default_for_palette(args.palette)
    });
    log::info!("starting muserun: {config:?}");
    let mut app = App::new(args, config, theme);
    app.run()?;
    Ok(())
}

/// The TUI owns the terminal, so logs only go to a file when asked.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .init();
    Ok(())
}

/// Rhythm-platformer in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "muserun",
    version,
    about = "Rhythm-platformer in the terminal: hold note keys to raise platforms and score chords.",
    long_about = "muserun is a side-scrolling rhythm platformer.\n\n\
        The runner moves right on its own. Each note key grows a platform at its own pitch \
        height while held; the runner rides the highest one. Holding two or more keys that \
        form a chord earns its points over one second. With nothing held the runner drops to \
        the ground, and after a short grace period the score starts to decay.\n\n\
        NOTE KEYS (low to high):\n  A=B3  S=C4  R=D#4  D=D4  F=E4  G=F4  H=G4  U=G#4  J=A4  I=Bb4  K=B4  L=C5  ;=D5  '=E5\n\n\
        CONTROLS:\n  Space/Enter Start   P Pause   Backspace Restart   Esc Menu   Q Quit\n\n\
        Terminals that report key releases (kitty protocol) track held keys exactly; elsewhere a \
        key counts as held until --repeat-delay-ms passes without its first auto-repeat, then \
        until --hold-timeout-ms passes without another."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\", e.g. theme[key_s]=\"#ff0000\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette for platforms: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Logical screen height in world pixels; platform levels hang off its bottom edge.
    #[arg(long, default_value = "768", value_name = "PX")]
    pub screen_height: f64,

    /// Runner speed in world pixels per second.
    #[arg(short, long, default_value = "100", value_name = "PX_PER_SEC")]
    pub speed: f64,

    /// Grace period on the ground before decay starts.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub grace_ms: u64,

    /// Interval between score decays while grounded.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub decay_interval_ms: u64,

    /// Points lost per decay interval.
    #[arg(long, default_value = "1", value_name = "POINTS")]
    pub decay_penalty: u32,

    /// Time a chord must be held to earn its full points.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub chord_window_ms: u64,

    /// Distance of the ground above the screen bottom. Negative values put the ground
    /// below the game-over line, so falling ends the run.
    #[arg(long, default_value = "60", value_name = "PX", allow_negative_numbers = true)]
    pub ground_offset: f64,

    /// Target frames (and simulation ticks) per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Without key-release reporting, how long a pressed key stays held waiting for its
    /// first auto-repeat. Must outlast the OS key-repeat delay (usually 250-660 ms).
    #[arg(long, default_value = "800", value_name = "MS")]
    pub repeat_delay_ms: u64,

    /// Without key-release reporting, how long a key stays held after its last auto-repeat.
    #[arg(long, default_value = "500", value_name = "MS")]
    pub hold_timeout_ms: u64,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Write logs to this file (RUST_LOG sets the level; default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// On game over, write {"type":"GAME_OVER","data":{"finalScore":N}} to this file.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl Args {
    /// Gameplay settings from the command line; everything else keeps its default.
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            screen_height: self.screen_height,
            runner_speed: self.speed,
            ground_grace_ms: self.grace_ms,
            decay_interval_ms: self.decay_interval_ms,
            decay_penalty: self.decay_penalty,
            chord_window_ms: self.chord_window_ms,
            ground_offset: self.ground_offset,
            ..GameConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
