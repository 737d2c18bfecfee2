//! Layout and drawing: menu, side-scrolling world, sidebar, chord banner, pause, game over.

use crate::app::{ChordBanner, MenuState, Screen, View};
use crate::game::GameState;
use crate::notes::{GameKey, keys_to_notes};
use crate::runner::RunnerPhase;
use crate::theme::{Theme, rgb};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, EffectRenderer, Interpolation, fx};

/// World pixels per terminal column.
const PX_PER_COL: f64 = 8.0;
/// Fraction of the world view left of the runner.
const RUNNER_SCREEN_FRACTION: f64 = 0.25;
const SIDEBAR_WIDTH: u16 = 28;
/// Key legend column on the left of the world: "S C4".
const LEGEND_WIDTH: u16 = 6;
/// New platforms flash white this long.
const SPAWN_POP_MS: u64 = 120;
/// Chord banner fade after a chord completes.
const BANNER_FADE_MS: u32 = 900;

/// Maps world coordinates onto terminal cells of the world view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    area: Rect,
    origin_x: f64,
    px_per_row: f64,
}

impl Camera {
    /// Keeps the runner a quarter of the way in from the left; the whole logical screen
    /// height fits vertically.
    pub fn follow(area: Rect, runner_x: f64, screen_height: f64) -> Self {
        let view_w = f64::from(area.width) * PX_PER_COL;
        Self {
            area,
            origin_x: runner_x - view_w * RUNNER_SCREEN_FRACTION,
            px_per_row: screen_height / f64::from(area.height.max(1)),
        }
    }

    pub fn col(&self, world_x: f64) -> Option<u16> {
        let c = ((world_x - self.origin_x) / PX_PER_COL).floor();
        (c >= 0.0 && c < f64::from(self.area.width)).then(|| self.area.x + c as u16)
    }

    pub fn row(&self, world_y: f64) -> Option<u16> {
        let r = (world_y / self.px_per_row).floor();
        (r >= 0.0 && r < f64::from(self.area.height)).then(|| self.area.y + r as u16)
    }

    /// Rows covered by `[top, bottom)`, clipped to the view.
    pub fn rows(&self, top: f64, bottom: f64) -> Option<(u16, u16)> {
        let first = (top / self.px_per_row).floor().max(0.0);
        let last = (bottom / self.px_per_row).ceil() - 1.0;
        let last = last.min(f64::from(self.area.height) - 1.0);
        (last >= first).then(|| (self.area.y + first as u16, self.area.y + last as u16))
    }

    /// Columns covered by `[left, right)`, clipped to the view.
    pub fn span(&self, left: f64, right: f64) -> Option<(u16, u16)> {
        let first = ((left - self.origin_x) / PX_PER_COL).floor().max(0.0);
        let last = ((right - self.origin_x) / PX_PER_COL).ceil() - 1.0;
        let last = last.min(f64::from(self.area.width) - 1.0);
        (last >= first).then(|| (self.area.x + first as u16, self.area.x + last as u16))
    }
}

/// Blend `color` halfway toward `bg` (RGB only).
fn dim(color: Color, bg: Color) -> Color {
    match (color, bg) {
        (Color::Rgb(r, g, b), Color::Rgb(br, bgg, bb)) => Color::Rgb(
            ((u16::from(r) + u16::from(br)) / 2) as u8,
            ((u16::from(g) + u16::from(bgg)) / 2) as u8,
            ((u16::from(b) + u16::from(bb)) / 2) as u8,
        ),
        (c, _) => c,
    }
}

/// Draw the current screen. The chord banner's fade effect lives in `view` so it keeps
/// running across frames.
pub fn draw(frame: &mut Frame, state: &GameState, view: &mut View<'_>, area: Rect) {
    match view.screen {
        Screen::Menu => draw_menu(frame, view.theme, view.menu_state, area, view.now),
        Screen::Playing => {
            let world = draw_game(frame, state, view, area);
            if let Some(banner) = view.banner.as_mut() {
                draw_chord_banner(frame, view.theme, banner, world, view.now);
            }
            if view.paused {
                draw_pause_overlay(frame, view.theme, area);
            }
        }
        Screen::GameOver => {
            draw_game(frame, state, view, area);
            draw_game_over(frame, state, view.theme, area);
        }
    }
}

fn popup_rect(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn bordered(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_menu(frame: &mut Frame, theme: &Theme, menu_state: &MenuState, area: Rect, now: Instant) {
    let popup = popup_rect(area, 52, 20);

    let title = Line::from(vec![
        Span::styled(" muse ", Style::default().fg(rgb(0xe9_1e_63)).bold()),
        Span::styled("run ", Style::default().fg(theme.main_fg).bold()),
    ]);
    let hint = Style::default().fg(theme.inactive_fg);
    let key_style = Style::default().fg(theme.title).bold();

    // Keys ordered by height, lowest platform first.
    let mut by_height = GameKey::ALL;
    by_height.sort_by(|a, b| b.level_height().total_cmp(&a.level_height()));
    let legend: Vec<Span> = by_height
        .iter()
        .flat_map(|key| {
            [
                Span::styled(key.label().to_string(), Style::default().fg(theme.key_color(*key)).bold()),
                Span::from(" "),
            ]
        })
        .collect();
    let notes: Vec<Span> = by_height
        .iter()
        .map(|key| Span::styled(format!("{} ", key.note()), hint))
        .collect();

    let lines = vec![
        Line::from(""),
        title,
        Line::from(Span::styled("hold notes, ride platforms, play chords", hint)),
        Line::from(""),
        Line::from(Span::styled(" ─ NOTE KEYS (low → high) ─ ", Style::default().fg(theme.div_line))),
        Line::from(legend),
        Line::from(notes),
        Line::from(""),
        Line::from(Span::styled(
            "Hold a key to grow a platform at its pitch height.",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            "Hold 2+ keys forming a chord to earn points.",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            "Stay off the ground or your score decays.",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled(" SPACE ", key_style),
            Span::from("START   "),
            Span::styled(" P ", key_style),
            Span::from("PAUSE   "),
            Span::styled(" ⌫ ", key_style),
            Span::from("RESTART"),
        ]),
        Line::from(""),
        Line::from(Span::styled(" [Q] QUIT ", Style::default().fg(Color::Rgb(255, 80, 80)))),
    ];

    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(bordered(theme));

    // Slide in from below, ease-out cubic.
    let elapsed = now.saturating_duration_since(menu_state.animation_start).as_millis() as f32;
    let t = (elapsed / 500.0).min(1.0);
    let eased = 1.0 - (1.0 - t).powi(3);
    let mut anim_popup = popup;
    anim_popup.y += ((1.0 - eased) * 10.0) as u16;
    anim_popup.height = anim_popup.height.min((area.y + area.height).saturating_sub(anim_popup.y));

    p.render(anim_popup, frame.buffer_mut());
}

/// Legend, world and sidebar. Returns the world rect.
fn draw_game(frame: &mut Frame, state: &GameState, view: &View<'_>, area: Rect) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(area);
    let world_outer = chunks[0];
    let block = bordered(view.theme).title(Span::styled(" muserun ", view.theme.title));
    let inner = block.inner(world_outer);
    block.render(world_outer, frame.buffer_mut());

    let split = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(LEGEND_WIDTH), Constraint::Fill(1)])
        .split(inner);
    let (legend_area, world) = (split[0], split[1]);

    let camera = Camera::follow(world, state.runner().x, state.config().screen_height);
    let buf = frame.buffer_mut();
    fill(buf, inner, view.theme.bg);
    draw_legend(buf, state, view, &camera, legend_area);
    draw_world(buf, state, view, &camera, world);
    draw_sidebar(frame, state, view, chunks[1]);
    world
}

fn fill(buf: &mut Buffer, area: Rect, bg: Color) {
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            buf[(x, y)].set_symbol(" ").set_bg(bg);
        }
    }
}

fn draw_legend(buf: &mut Buffer, state: &GameState, view: &View<'_>, camera: &Camera, area: Rect) {
    let theme = view.theme;
    let active = view.last_tick.active_keys;
    for key in GameKey::ALL {
        let Some(row) = camera.row(state.config().screen_height + key.level_height()) else {
            continue;
        };
        let color = if active.contains(key) {
            theme.key_color(key)
        } else {
            dim(theme.key_color(key), theme.bg)
        };
        let label = format!("{} {:<3}", key.label(), key.pitch_label());
        let mut style = Style::default().fg(color).bg(theme.bg);
        if active.contains(key) {
            style = style.bold();
        }
        buf.set_stringn(area.x, row, label, usize::from(area.width), style);
    }
}

fn draw_world(buf: &mut Buffer, state: &GameState, view: &View<'_>, camera: &Camera, area: Rect) {
    let theme = view.theme;
    let config = state.config();

    if let Some(row) = camera.row(config.ground_y()) {
        let style = Style::default().fg(theme.div_line).bg(theme.bg);
        for x in area.left()..area.right() {
            buf[(x, row)].set_symbol("▔").set_style(style);
        }
    }

    for platform in state.platforms() {
        let (Some((top, bottom)), Some((first, last))) = (
            camera.rows(platform.y, platform.y + config.platform_height),
            camera.span(platform.left, platform.right()),
        ) else {
            continue;
        };
        let color = theme.key_color(platform.key);
        let fresh = state.now_ms().saturating_sub(platform.spawned_at_ms) < SPAWN_POP_MS;
        let (symbol, fg) = if platform.growing && fresh {
            ("█", theme.runner)
        } else if platform.growing {
            ("█", color)
        } else {
            ("▀", dim(color, theme.bg))
        };
        let style = Style::default().fg(fg).bg(theme.bg);
        for y in top..=bottom {
            for x in first..=last {
                buf[(x, y)].set_symbol(symbol).set_style(style);
            }
        }
    }

    let runner = state.runner();
    if let (Some(col), Some(row)) = (camera.col(runner.x), camera.row(runner.y)) {
        // Stand on top of the platform row.
        let row = row.saturating_sub(1).max(area.y);
        let color = view.runner_flash.map_or(theme.runner, |f| theme.key_color(f.key));
        let glyph = match runner.phase() {
            RunnerPhase::Airborne => "◉",
            RunnerPhase::OnPlatform => "●",
            RunnerPhase::Grounded => "○",
        };
        buf[(col, row)]
            .set_symbol(glyph)
            .set_style(Style::default().fg(color).bg(theme.bg).bold());
    }
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let hint_style = Style::default().fg(theme.inactive_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // score
            Constraint::Length(5), // held notes
            Constraint::Length(5), // chord
            Constraint::Length(4), // runner status
            Constraint::Fill(1),   // controls
        ])
        .split(area);

    // --- Score ---
    let score = state.score();
    let score_block = bordered(theme);
    let inner = score_block.inner(chunks[0]);
    score_block.render(chunks[0], frame.buffer_mut());
    Paragraph::new(Text::from(vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(view.last_tick.score.to_string(), fg_style.bold()),
        ]),
        Line::from(vec![
            Span::styled("Platforms: ", title_style),
            Span::styled(score.platform_points().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Chords: ", title_style),
            Span::styled(score.chord_points().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Decay: ", title_style),
            Span::styled(format!("-{}", score.decayed()), fg_style),
        ]),
    ]))
    .render(inner, frame.buffer_mut());

    // --- Held notes ---
    let held = view.last_tick.held;
    let notes_block = bordered(theme);
    let inner = notes_block.inner(chunks[1]);
    notes_block.render(chunks[1], frame.buffer_mut());
    let keys_line = if held.is_empty() {
        Line::from(Span::styled("—", hint_style))
    } else {
        Line::from(
            held.iter()
                .map(|k| Span::styled(format!("{} ", k.pitch_label()), Style::default().fg(theme.key_color(k))))
                .collect::<Vec<_>>(),
        )
    };
    let names: Vec<&str> = keys_to_notes(held).iter().map(|n| n.as_str()).collect();
    Paragraph::new(Text::from(vec![
        Line::from(Span::styled("Notes", title_style)),
        keys_line,
        Line::from(Span::styled(names.join(" "), hint_style)),
    ]))
    .render(inner, frame.buffer_mut());

    // --- Chord: name above, accumulation gauge below ---
    let chord_block = bordered(theme);
    let inner = chord_block.inner(chunks[2]);
    chord_block.render(chunks[2], frame.buffer_mut());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(inner);
    let (label, ratio, points, complete) = match (view.last_tick.chord, state.chord_session()) {
        (Some(chord), Some(session)) => (
            chord.chord_name.to_string(),
            session.progress(state.now_ms(), state.chord_window_ms()),
            format!("{}/{}", chord.accumulated_points, chord.base_points),
            session.is_complete(),
        ),
        _ => ("Chord".to_string(), 0.0, String::new(), false),
    };
    Paragraph::new(Line::from(Span::styled(label, title_style))).render(rows[0], frame.buffer_mut());
    Paragraph::new(Line::from(Span::styled(points, fg_style))).render(rows[1], frame.buffer_mut());
    let bar_color = if complete { Color::Green } else { Color::Yellow };
    Gauge::default()
        .ratio(ratio.clamp(0.0, 1.0))
        .label("")
        .gauge_style(Style::default().fg(bar_color).bg(theme.bg))
        .render(rows[2], frame.buffer_mut());

    // --- Runner status ---
    let status_block = bordered(theme);
    let inner = status_block.inner(chunks[3]);
    status_block.render(chunks[3], frame.buffer_mut());
    let status = match state.runner_phase() {
        RunnerPhase::Grounded => {
            let next = state.next_decay_in_ms().unwrap_or(0);
            Line::from(Span::styled(
                format!(
                    "Grounded! -{} in {:.1}s",
                    state.config().decay_penalty,
                    next as f64 / 1000.0
                ),
                Style::default().fg(Color::Rgb(255, 80, 80)).bold(),
            ))
        }
        RunnerPhase::OnPlatform => Line::from(Span::styled("Riding", Style::default().fg(Color::Green))),
        RunnerPhase::Airborne => Line::from(Span::styled("Airborne", fg_style)),
    };
    Paragraph::new(Text::from(vec![
        status,
        Line::from(Span::styled(
            format!(
                "Height {:.0}  Distance {:.0}",
                state.config().screen_height - view.last_tick.runner_y,
                state.runner().x
            ),
            hint_style,
        )),
    ]))
    .render(inner, frame.buffer_mut());

    // --- Controls ---
    let controls_block = bordered(theme);
    let inner = controls_block.inner(chunks[4]);
    controls_block.render(chunks[4], frame.buffer_mut());
    let tracking = if view.releases_reported {
        "keys: exact"
    } else {
        "keys: hold timeout"
    };
    Paragraph::new(Text::from(vec![
        Line::from(Span::styled("P pause  ⌫ restart", hint_style)),
        Line::from(Span::styled("Esc menu  Q quit", hint_style)),
        Line::from(Span::styled(tracking, hint_style)),
    ]))
    .render(inner, frame.buffer_mut());
}

/// Completed-chord banner at the top of the world, faded out with tachyonfx.
fn draw_chord_banner(
    frame: &mut Frame,
    theme: &Theme,
    banner: &mut ChordBanner,
    world: Rect,
    now: Instant,
) {
    let text = format!(" {} +{} ", banner.chord_name, banner.base_points);
    let w = (text.chars().count() as u16 + 2).min(world.width);
    let rect = Rect {
        x: world.x + world.width.saturating_sub(w) / 2,
        y: world.y,
        width: w,
        height: 3.min(world.height),
    };
    Paragraph::new(Line::from(Span::styled(text, Style::default().fg(Color::Black).bg(theme.title).bold())))
        .alignment(Alignment::Center)
        .block(bordered(theme))
        .render(rect, frame.buffer_mut());

    let delta_ms = banner
        .process_time
        .map(|t| now.saturating_duration_since(t).as_millis().min(u128::from(u32::MAX)) as u32)
        .unwrap_or(0);
    banner.process_time = Some(now);
    let effect = banner.effect.get_or_insert_with(|| {
        fx::fade_to(theme.bg, theme.bg, (BANNER_FADE_MS, Interpolation::QuadIn)).with_area(rect)
    });
    frame.render_effect(effect, rect, TfxDuration::from_millis(delta_ms));
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 30, 6);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P resume   Q quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(bordered(theme))
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 40, 13);
    let score = state.score();
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Final score: {} ", score.total()), fg.bold())),
        Line::from(Span::styled(format!(" Platforms: +{} ", score.platform_points()), fg)),
        Line::from(Span::styled(format!(" Chords: +{} ", score.chord_points()), fg)),
        Line::from(Span::styled(format!(" Ground decay: -{} ", score.decayed()), fg)),
        Line::from(Span::styled(format!(" Distance: {:.0} ", state.runner().x), fg)),
        Line::from(""),
        Line::from(Span::styled(" R restart   Esc menu   Q quit ", fg)),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(bordered(theme).title(Span::styled(" muserun ", theme.title)))
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_area() -> Rect {
        Rect::new(10, 2, 100, 32)
    }

    #[test]
    fn test_camera_keeps_runner_at_quarter_width() {
        let camera = Camera::follow(view_area(), 1000.0, 768.0);
        assert_eq!(camera.col(1000.0), Some(10 + 25));
        assert_eq!(camera.col(1000.0 - 25.0 * PX_PER_COL), Some(10));
        assert_eq!(camera.col(1000.0 - 25.0 * PX_PER_COL - 0.1), None);
        assert_eq!(camera.col(1000.0 + 75.0 * PX_PER_COL), None);
    }

    #[test]
    fn test_camera_rows_cover_screen_height() {
        let camera = Camera::follow(view_area(), 0.0, 768.0);
        assert_eq!(camera.row(0.0), Some(2));
        assert_eq!(camera.row(767.0), Some(2 + 31));
        assert_eq!(camera.row(768.0), None);
        assert_eq!(camera.row(-1.0), None);
        // Every key level lands on its own row or higher.
        let s = camera.row(768.0 - 80.0).unwrap();
        let quote = camera.row(768.0 - 440.0).unwrap();
        assert!(quote < s);
    }

    #[test]
    fn test_camera_span_clips_to_view() {
        let camera = Camera::follow(view_area(), 1000.0, 768.0);
        let origin = 1000.0 - 25.0 * PX_PER_COL;
        assert_eq!(camera.span(origin, origin + 16.0), Some((10, 11)));
        assert_eq!(camera.span(origin - 100.0, origin + 8.0), Some((10, 10)));
        assert_eq!(camera.span(origin - 100.0, origin - 50.0), None);
        assert_eq!(camera.span(origin + 790.0, origin + 2000.0), Some((108, 109)));
    }

    #[test]
    fn test_camera_rows_give_platforms_thickness() {
        let camera = Camera::follow(view_area(), 0.0, 768.0);
        // 24 px per row.
        assert_eq!(camera.rows(688.0, 708.0), Some((30, 31)));
        assert_eq!(camera.rows(672.0, 696.0), Some((30, 30)));
        assert_eq!(camera.rows(760.0, 800.0), Some((33, 33)));
        assert_eq!(camera.rows(800.0, 820.0), None);
        assert_eq!(camera.rows(-40.0, -10.0), None);
    }

    #[test]
    fn test_dim_blends_toward_background() {
        assert_eq!(dim(Color::Rgb(200, 100, 0), Color::Rgb(0, 0, 100)), Color::Rgb(100, 50, 50));
        assert_eq!(dim(Color::Red, Color::Black), Color::Red);
    }
}
