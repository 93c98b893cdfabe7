pub mod progress;
pub mod screen;
pub mod settings_view;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use limber::{
    celebration::Confetti,
    coach::ChatCard,
    instructions::InstructionStep,
    sequencer::SequencerState,
};

use crate::App;

const PANEL_PERCENT: u16 = 42;
const CONFETTI_COLORS: [Color; 7] = [
    Color::Yellow,
    Color::Magenta,
    Color::Cyan,
    Color::Green,
    Color::Red,
    Color::Blue,
    Color::LightYellow,
];

/// Colours for the current contrast setting.
pub struct Theme {
    pub accent: Color,
    pub user: Color,
    pub notice: Color,
    pub dim: Style,
}

impl Theme {
    pub fn for_app(app: &App) -> Self {
        if app.settings.accessibility.high_contrast {
            Theme {
                accent: Color::White,
                user: Color::White,
                notice: Color::White,
                dim: Style::default().fg(Color::White),
            }
        } else {
            Theme {
                accent: Color::Cyan,
                user: Color::LightBlue,
                notice: Color::Yellow,
                dim: Style::default().fg(Color::Gray),
            }
        }
    }
}

fn step_line<'a>(step: &InstructionStep, theme: &Theme) -> Line<'a> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let (marker, style) = if step.completed {
        ("[✓]", Style::default().fg(Color::Green))
    } else if step.active {
        ("[▶]", bold.fg(theme.accent))
    } else {
        ("[ ]", theme.dim)
    };
    Line::from(vec![
        Span::styled(format!("{marker} {}. ", step.step_number), style),
        Span::styled(step.text.replace('\n', " "), style),
        Span::styled(format!("  ({}s)", step.duration_secs), theme.dim),
    ])
}

fn transcript_text<'a>(cards: &[ChatCard], theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    for card in cards {
        match card {
            ChatCard::User(text) => {
                lines.push(Line::default());
                lines.push(Line::from(vec![
                    Span::styled(
                        "you: ",
                        Style::default().fg(theme.user).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(text.clone()),
                ]));
            }
            ChatCard::Step(step) => lines.push(step_line(step, theme)),
            ChatCard::Notice(text) => lines.push(Line::from(Span::styled(
                text.clone(),
                Style::default()
                    .fg(theme.notice)
                    .add_modifier(Modifier::ITALIC),
            ))),
        }
    }
    lines
}

/// Rows `lines` take up once wrapped to `width`.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}

impl App {
    fn render_header(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let ledger = self.coach.ledger();
        let mut spans = vec![
            Span::styled(
                " limber ",
                Style::default()
                    .fg(Color::Black)
                    .bg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "  {}  ·  {} pts  ·  Level {}",
                self.coach.config().user_name,
                ledger.session_points(),
                ledger.level()
            )),
        ];
        if let Some(region) = self.coach.highlighted() {
            spans.push(Span::styled(
                format!("  ·  {}", region.display_name()),
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ));
        }
        if self.coach.is_exercising() && !self.coach.panel_visible() {
            let readout = match self.coach.progress() {
                Some(p) => format!("  ·  ▶ step {} of {} {} (m to restore)", p.step_number, p.total, p.countdown),
                None => "  ·  ▶ resting (m to restore)".to_string(),
            };
            spans.push(Span::styled(readout, Style::default().fg(theme.notice)));
        }
        Paragraph::new(Line::from(spans)).render(area, buf);
    }

    fn render_transcript(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default().borders(Borders::ALL).title(" Chat ");
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = if self.coach.transcript().is_empty() {
            vec![Line::from(Span::styled(
                "Tell me where it hurts, e.g. \"my lower back is stiff\". Type /help for commands.",
                theme.dim,
            ))]
        } else {
            transcript_text(self.coach.transcript(), theme)
        };
        // keep the newest lines in view
        let scroll = wrapped_height(&lines, inner.width).saturating_sub(inner.height);
        Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .render(inner, buf);
    }

    fn render_panel(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent))
            .title(" Exercise ");
        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // step n of m
                Constraint::Min(2),    // instruction
                Constraint::Length(1), // countdown
                Constraint::Length(1), // gauge
                Constraint::Length(1), // focus
                Constraint::Length(2), // tip
                Constraint::Length(1), // controls
            ])
            .split(inner);

        let bold = Style::default().add_modifier(Modifier::BOLD);

        match (self.coach.progress(), self.coach.sequencer().state()) {
            (Some(progress), _) => {
                Paragraph::new(Span::styled(
                    format!("Step {} of {}", progress.step_number, progress.total),
                    bold.fg(theme.accent),
                ))
                .render(chunks[0], buf);
                Paragraph::new(progress.text.clone())
                    .wrap(Wrap { trim: true })
                    .render(chunks[1], buf);
                Paragraph::new(Span::styled(progress.countdown.clone(), bold))
                    .alignment(Alignment::Center)
                    .render(chunks[2], buf);
                Gauge::default()
                    .gauge_style(Style::default().fg(theme.accent))
                    .ratio((progress.percentage / 100.0).clamp(0.0, 1.0))
                    .label(format!("{:.0}%", progress.percentage))
                    .render(chunks[3], buf);
            }
            (None, SequencerState::Resting { next_index }) => {
                Paragraph::new(Span::styled(
                    format!("Get ready for step {}…", next_index + 1),
                    bold.fg(theme.notice),
                ))
                .render(chunks[0], buf);
            }
            (None, _) => {}
        }

        if let Some(focus) = self.coach.focus() {
            Paragraph::new(format!("Focus: {}", focus.display_name()))
                .style(theme.dim)
                .render(chunks[4], buf);
        }

        let location = self
            .coach
            .sequencer()
            .batch()
            .first()
            .map(|step| step.pain_location);
        if let Some(region) = location.and_then(|loc| self.regions.iter().find(|r| r.location == loc)) {
            Paragraph::new(format!("Tip: {}", region.tips))
                .style(theme.dim.add_modifier(Modifier::ITALIC))
                .wrap(Wrap { trim: true })
                .render(chunks[5], buf);
        }

        Paragraph::new("(s)kip  (c)omplete  (m)inimize")
            .style(theme.dim)
            .render(chunks[6], buf);
    }

    fn render_input(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let title = if self.coach.is_exercising() {
            " Message (busy: s/c/m control the exercise) "
        } else {
            " Message "
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        block.render(area, buf);

        // show the tail of long input
        let mut shown = self.input.as_str();
        while shown.width() + 1 > inner.width as usize && !shown.is_empty() {
            let mut chars = shown.chars();
            chars.next();
            shown = chars.as_str();
        }
        Paragraph::new(Line::from(vec![
            Span::raw(shown.to_string()),
            Span::styled("█", Style::default().fg(theme.accent)),
        ]))
        .render(inner, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let line = match &self.status {
            Some(status) => Line::from(Span::styled(status.clone(), Style::default().fg(Color::Red))),
            None if self.coach.is_exercising() => Line::from(Span::styled(
                "s/c/m typed first are controls, not text  (tab) progress  (esc) quit",
                theme.dim.add_modifier(Modifier::ITALIC),
            )),
            None => Line::from(Span::styled(
                "(enter) send  (tab) progress  (esc) quit",
                theme.dim.add_modifier(Modifier::ITALIC),
            )),
        };
        Paragraph::new(line).render(area, buf);
    }

    fn render_celebration(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let Some(celebration) = self.coach.celebration() else {
            return;
        };
        render_confetti(&self.confetti, area, buf);

        let headline = celebration.headline();
        let width = (headline.width() as u16 + 6).min(area.width);
        let height = 5.min(area.height);
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );
        Clear.render(popup, buf);
        Paragraph::new(vec![
            Line::from(Span::styled(
                "Well done!",
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            )),
            Line::from(headline),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true })
        .render(popup, buf);
    }
}

fn render_confetti(confetti: &Confetti, area: Rect, buf: &mut Buffer) {
    for particle in &confetti.particles {
        if particle.x < 0.0 || particle.y < 0.0 {
            continue;
        }
        let (x, y) = (particle.x as u16, particle.y as u16);
        if x >= area.width || y >= area.height {
            continue;
        }
        let color = CONFETTI_COLORS[particle.color_index % CONFETTI_COLORS.len()];
        let fade = 1.0 - particle.age / particle.max_age;
        let style = if fade > 0.5 {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color).add_modifier(Modifier::DIM)
        };
        if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
            cell.set_symbol(&particle.symbol.to_string());
            cell.set_style(style);
        }
    }
}

/// The chat screen.
impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let theme = Theme::for_app(self);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_header(rows[0], buf, &theme);

        if self.coach.panel_visible() {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(100 - PANEL_PERCENT),
                    Constraint::Percentage(PANEL_PERCENT),
                ])
                .split(rows[1]);
            self.render_transcript(cols[0], buf, &theme);
            self.render_panel(cols[1], buf, &theme);
        } else {
            self.render_transcript(rows[1], buf, &theme);
        }

        self.render_input(rows[2], buf, &theme);
        self.render_status(rows[3], buf, &theme);
        self.render_celebration(area, buf, &theme);
    }
}
