use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::{ui::Theme, App};

pub fn render_settings(app: &mut App, f: &mut Frame) {
    let theme = Theme::for_app(app);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(4), Constraint::Length(4)])
        .split(f.area());

    let rows: Vec<Row> = match app.settings.entries() {
        Ok(entries) => entries
            .into_iter()
            .map(|(key, value)| {
                Row::new(vec![
                    Cell::from(key).style(Style::default().fg(theme.accent)),
                    Cell::from(value.to_string()),
                ])
            })
            .collect(),
        Err(e) => vec![Row::new(vec![Cell::from("error"), Cell::from(e.to_string())])],
    };

    let table = Table::new(rows, [Constraint::Length(30), Constraint::Min(10)])
        .header(
            Row::new(vec!["Setting", "Value"])
                .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)),
        )
        .block(Block::default().borders(Borders::ALL).title(" Settings "));
    f.render_widget(table, chunks[0]);

    f.render_widget(
        Paragraph::new(
            "Change a value with `limber --set KEY=VALUE`, e.g. --set accessibility.highContrast=true. \
             (tab/b) back  (esc) quit",
        )
        .style(theme.dim)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::TOP)),
        chunks[1],
    );
}
