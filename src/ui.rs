// ═══════════════════════════════════════════════════════════════════════════════
//  UI Rendering
// ═══════════════════════════════════════════════════════════════════════════════

use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::{App, LoadState, Row as PageRow, Tab};
use crate::device::DeviceApi;
use crate::form::{FieldKind, field_def};
use crate::record::Rgb;
use crate::wheel::{COMPACT_SIZE, Channel, ColorWheel};

// ─── Theme: Nixie Orange ────────────────────────────────────────────────────

struct Theme;

impl Theme {
    const ACCENT: Color = Color::Rgb(255, 140, 40);
    const ACCENT2: Color = Color::Rgb(255, 185, 95);
    const DIM: Color = Color::Rgb(170, 90, 30);
    const DARK: Color = Color::Rgb(80, 40, 15);
    const BG_HL: Color = Color::Rgb(40, 20, 8);
    const BG_HEADER: Color = Color::Rgb(20, 10, 4);
    const FG: Color = Color::Rgb(230, 220, 205);
    const FG_DIM: Color = Color::Rgb(140, 125, 110);
    const OK: Color = Color::Rgb(120, 220, 120);
    const WARM: Color = Color::Rgb(255, 200, 0);
    const ERR: Color = Color::Rgb(255, 70, 50);
}

fn rgb_color(c: Rgb) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

pub fn draw<D: DeviceApi>(f: &mut Frame, app: &App<D>) {
    let [header, tab_bar, body, detail, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(10),
        Constraint::Length(5),
        Constraint::Length(3),
    ])
    .areas(f.area());

    draw_header(f, header);
    draw_tab_bar(f, tab_bar, app);

    let [left, right] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(body);

    draw_form(f, left, app);
    draw_wheel(f, right, app);
    draw_detail(f, detail, app);
    draw_status(f, status, app);
}

// ─── Header ─────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect) {
    let block = Block::bordered()
        .border_type(BorderType::Double)
        .border_style(Style::new().fg(Theme::ACCENT))
        .style(Style::new().bg(Theme::BG_HEADER));

    let text = Line::from(vec![
        Span::styled("  ◆ ", Style::new().fg(Theme::ACCENT).bold()),
        Span::styled("N I X I E", Style::new().fg(Theme::ACCENT).bold()),
        Span::styled("  ◆  ", Style::new().fg(Theme::ACCENT)),
        Span::styled("Clock Settings", Style::new().fg(Theme::FG_DIM)),
    ])
    .centered();

    f.render_widget(Paragraph::new(text).block(block), area);
}

// ─── Tab Bar ────────────────────────────────────────────────────────────────

fn draw_tab_bar<D: DeviceApi>(f: &mut Frame, area: Rect, app: &App<D>) {
    let mut spans = vec![Span::raw("  ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        let style = if *tab == app.tab {
            Style::new().fg(Color::Black).bg(Theme::ACCENT).bold()
        } else {
            Style::new().fg(Theme::FG_DIM)
        };
        spans.push(Span::styled(format!(" F{} {} ", i + 1, tab.title()), style));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled("Tab to switch", Style::new().fg(Theme::DARK)));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ─── Form Panel ─────────────────────────────────────────────────────────────

fn row_label(row: PageRow) -> &'static str {
    match row {
        PageRow::Field(id) => field_def(id).label,
        PageRow::Wheel(ch) => ch.label(),
    }
}

fn wheel_reading(wheel: &ColorWheel, ch: Channel) -> String {
    let hsv = wheel.hsv();
    match ch {
        Channel::Hue => format!("{:.0}°", hsv.h),
        Channel::Saturation => format!("{:.0}%", hsv.s),
        Channel::Value => format!("{:.0}%", hsv.v),
    }
}

fn draw_form<D: DeviceApi>(f: &mut Frame, area: Rect, app: &App<D>) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(Theme::DIM))
        .title(Span::styled(
            format!(" {} ", app.tab.title()),
            Style::new().fg(Theme::ACCENT).bold(),
        ));

    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.load == LoadState::Loading {
        f.render_widget(
            Paragraph::new("Loading settings…")
                .style(Style::new().fg(Theme::FG_DIM))
                .centered(),
            inner,
        );
        return;
    }

    let form = app.page.form();
    let selected = app.selected_row();
    let rows: Vec<Row> = app
        .tab
        .rows()
        .iter()
        .map(|&row| {
            let sel = row == selected;
            let arrow = if sel { " ▸ " } else { "   " };
            let style = if sel {
                Style::new().fg(Theme::ACCENT).bg(Theme::BG_HL).bold()
            } else {
                Style::new().fg(Theme::FG)
            };

            let (disp, hint) = match row {
                PageRow::Field(id) => {
                    let kind = field_def(id).kind;
                    let disp = match (&app.editing, sel) {
                        (Some(buf), true) if kind == FieldKind::Secret => {
                            format!("{}▏", "•".repeat(buf.chars().count()))
                        }
                        (Some(buf), true) => format!("{buf}▏"),
                        _ if kind == FieldKind::Choice => format!("◀ {} ▶", form.display(id)),
                        _ => form.display(id),
                    };
                    let hint = match (kind, sel) {
                        (FieldKind::Text | FieldKind::Secret, true) => " [Enter]",
                        (FieldKind::Toggle, true) => " [Enter]",
                        (FieldKind::Choice, true) => " [←→]",
                        _ => "",
                    };
                    (disp, hint)
                }
                PageRow::Wheel(ch) => {
                    let disp = app
                        .page
                        .wheel()
                        .map(|w| wheel_reading(w, ch))
                        .unwrap_or_else(|| "N/A".into());
                    (disp, if sel { " [←→]" } else { "" })
                }
            };

            let val_style = if sel && app.editing.is_some() {
                Style::new().fg(Theme::WARM).bg(Theme::BG_HL).bold()
            } else if sel {
                Style::new().fg(Theme::ACCENT2).bg(Theme::BG_HL).bold()
            } else {
                Style::new().fg(Theme::DIM)
            };

            Row::new(vec![
                Cell::new(arrow).style(style),
                Cell::new(format!("{:<18}", row_label(row))).style(style),
                Cell::new(disp).style(val_style),
                Cell::new(hint).style(Style::new().fg(Theme::FG_DIM)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Length(19),
        Constraint::Min(14),
        Constraint::Length(8),
    ];

    f.render_widget(Table::new(rows, widths).column_spacing(0), inner);
}

// ─── Color Wheel Panel ──────────────────────────────────────────────────────

fn gradient_bar(wheel: &ColorWheel, ch: Channel, width: u16) -> Line<'static> {
    let w = width.max(1) as usize;
    let marker = ((wheel.fraction(ch) * (w - 1) as f64).round() as usize).min(w - 1);
    let mut spans = vec![Span::raw("  ")];
    for i in 0..w {
        let frac = if w == 1 { 0.0 } else { i as f64 / (w - 1) as f64 };
        let mut c = wheel.sample(ch, frac);
        if !wheel.is_enabled() {
            // Washed out while the spectrum owns the LEDs.
            c = Rgb::new(c.r / 3, c.g / 3, c.b / 3);
        }
        let glyph = if i == marker { "┃" } else { "█" };
        let style = if i == marker {
            Style::new().fg(Theme::FG).bg(rgb_color(c)).bold()
        } else {
            Style::new().fg(rgb_color(c))
        };
        spans.push(Span::styled(glyph, style));
    }
    Line::from(spans)
}

fn draw_wheel<D: DeviceApi>(f: &mut Frame, area: Rect, app: &App<D>) {
    let mode = app.page.mode();
    let border = if mode.is_spectrum() {
        Theme::DARK
    } else {
        Theme::DIM
    };
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(border))
        .title(Span::styled(
            " Backlight Color ",
            Style::new().fg(Theme::ACCENT).bold(),
        ));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(wheel) = app.page.wheel() else {
        f.render_widget(
            Paragraph::new("Color wheel not ready")
                .style(Style::new().fg(Theme::FG_DIM))
                .centered(),
            inner,
        );
        return;
    };

    let bar_w = wheel.bar_width(inner.width.saturating_sub(4));
    let c = wheel.rgb();

    let mut lines = vec![Line::from(vec![
        Span::styled("  ", Style::new()),
        Span::styled("████████", Style::new().fg(rgb_color(c))),
        Span::styled(format!("  {}", c.hex()), Style::new().fg(Theme::FG).bold()),
        Span::styled(
            format!("  ({}, {}, {})", c.r, c.g, c.b),
            Style::new().fg(Theme::FG_DIM),
        ),
    ])];
    lines.push(Line::default());

    for ch in Channel::ALL {
        let sel = app.selected_row() == PageRow::Wheel(ch);
        let ls = if sel {
            Style::new().fg(Theme::ACCENT).bold()
        } else {
            Style::new().fg(Theme::FG_DIM)
        };
        lines.push(Line::from(Span::styled(format!("  {}", ch.label()), ls)));
        lines.push(gradient_bar(wheel, ch, bar_w));
    }

    lines.push(Line::default());
    let note = if !wheel.is_enabled() {
        Span::styled(
            "  ♫ Spectrum mode: LEDs follow the microphone",
            Style::new().fg(Theme::WARM),
        )
    } else if wheel.size() == COMPACT_SIZE {
        Span::styled("  Compact wheel", Style::new().fg(Theme::DARK))
    } else {
        Span::raw("")
    };
    lines.push(Line::from(note));

    f.render_widget(Paragraph::new(lines), inner);
}

// ─── Detail Panel ───────────────────────────────────────────────────────────

fn draw_detail<D: DeviceApi>(f: &mut Frame, area: Rect, app: &App<D>) {
    let row = app.selected_row();
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(if app.editing.is_some() {
            Theme::WARM
        } else {
            Theme::DIM
        }))
        .title(Span::styled(
            format!(" {} ", row_label(row)),
            Style::new().fg(Theme::ACCENT).bold(),
        ));

    let (desc, hint) = match row {
        PageRow::Field(id) => {
            let def = field_def(id);
            let hint = match def.kind {
                FieldKind::Text | FieldKind::Secret => "  Enter: Edit  │  ↑↓: Navigate",
                FieldKind::Toggle => "  Enter/←→: Toggle  │  ↑↓: Navigate",
                FieldKind::Choice => "  ←→: Cycle  │  ↑↓: Navigate",
                FieldKind::Mirror => "  Follows the color wheel",
            };
            (def.desc.to_string(), hint)
        }
        PageRow::Wheel(ch) => (
            format!("Drag the {} channel of the backlight color", ch.label().to_lowercase()),
            "  ←→: Adjust (Shift ×5)  │  Enter or ↑↓: Release",
        ),
    };

    let lines = vec![
        Line::from(Span::styled(
            format!("  {desc}"),
            Style::new().fg(Theme::FG).italic(),
        )),
        Line::default(),
        Line::from(Span::styled(hint, Style::new().fg(Theme::DIM))),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}

// ─── Status Bar ─────────────────────────────────────────────────────────────

fn draw_status<D: DeviceApi>(f: &mut Frame, area: Rect, app: &App<D>) {
    let conn_span = match app.load {
        LoadState::Loading => Span::styled(" LOADING ", Style::new().fg(Theme::WARM).bold()),
        LoadState::Loaded => Span::styled(" CLOCK ✓ ", Style::new().fg(Theme::OK).bold()),
        LoadState::Failed => Span::styled(" OFFLINE ", Style::new().fg(Theme::ERR).bold()),
    };

    let mode = app.page.mode();
    let mode_span = Span::styled(
        format!(" {} ", mode.as_str().to_uppercase()),
        Style::new().fg(Color::Black).bg(Theme::ACCENT).bold(),
    );

    let reboot_span = if app.page.reboot_enabled() {
        Span::raw("")
    } else {
        Span::styled(" REBOOTING ", Style::new().fg(Theme::WARM).bold())
    };

    let sc = if app.err { Theme::ERR } else { Theme::FG_DIM };

    let lines = vec![
        Line::from(vec![
            mode_span,
            Span::raw(" "),
            conn_span,
            reboot_span,
            Span::raw(" "),
            Span::styled(app.status.clone(), Style::new().fg(sc)),
        ]),
        Line::from(Span::styled(
            " F1-F3 Tab │ ↑↓ Navigate │ ←→ Adjust │ s Save │ r Reload │ R Reboot │ q Quit ",
            Style::new().fg(Theme::FG_DIM),
        )),
    ];

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(Theme::DARK));

    f.render_widget(Paragraph::new(lines).block(block), area);
}
