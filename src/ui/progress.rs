use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table},
    Frame,
};

use limber::ledger::{ExerciseRecord, LeaderboardEntry, POINTS_PER_LEVEL};

use crate::{ui::Theme, App};

/// Most recent history rows shown.
const HISTORY_ROWS: usize = 8;

fn present_entry(rank: usize, entry: &LeaderboardEntry, is_user: bool, theme: &Theme) -> Row<'static> {
    let style = if is_user {
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let medal = match rank {
        1 => "🥇",
        2 => "🥈",
        3 => "🥉",
        _ => "",
    };
    Row::new(vec![
        Cell::from(format!("{rank} {medal}")),
        Cell::from(entry.user_name.clone()),
        Cell::from(entry.total_points.to_string()),
        Cell::from(entry.completed_exercise_count.to_string()),
        Cell::from(format!("Level {}", entry.level())),
    ])
    .style(style)
}

fn present_record(record: &ExerciseRecord) -> Row<'static> {
    Row::new(vec![
        Cell::from(record.completed_at.format("%H:%M").to_string()),
        Cell::from(record.pain_location.display_name()),
        Cell::from(format!("{} steps", record.step_count)),
        Cell::from(format!("+{}", record.points_awarded)).style(Style::default().fg(Color::Green)),
    ])
}

/// Region with the most completed routines, if any.
fn favourite_region(history: &[ExerciseRecord]) -> Option<&'static str> {
    history
        .iter()
        .counts_by(|r| r.pain_location)
        .into_iter()
        .sorted_by_key(|(loc, _)| loc.display_name())
        .max_by_key(|(_, n)| *n)
        .map(|(loc, _)| loc.display_name())
}

pub fn render_progress(app: &mut App, f: &mut Frame) {
    let theme = Theme::for_app(app);
    let ledger = app.coach.ledger();
    let user = app.coach.config().user_name.clone();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // level
            Constraint::Length(3), // gauge
            Constraint::Min(5),    // tables
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    let mut summary = vec![Span::styled(
        format!("Level {}", ledger.level()),
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )];
    summary.push(Span::raw(format!(
        "  ·  {} points this session  ·  {} routines",
        ledger.session_points(),
        ledger.history().len()
    )));
    if let Some(rank) = ledger.leaderboard().rank_of(&user) {
        summary.push(Span::raw(format!("  ·  rank #{rank}")));
    }
    if let Some(region) = favourite_region(ledger.history()) {
        summary.push(Span::raw(format!("  ·  mostly {region}")));
    }
    f.render_widget(
        Paragraph::new(Line::from(summary))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(format!(" {user} "))),
        chunks[0],
    );

    let into_level = ledger.progress_to_next_level();
    f.render_widget(
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(" Next level "))
            .gauge_style(Style::default().fg(theme.accent))
            .ratio(f64::from(into_level) / f64::from(POINTS_PER_LEVEL))
            .label(format!("{into_level} / {POINTS_PER_LEVEL}")),
        chunks[1],
    );

    let tables = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);

    let header_style = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let board = ledger.leaderboard();
    let rows: Vec<Row> = board
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| present_entry(i + 1, entry, entry.user_name == user, &theme))
        .collect();
    let leaderboard = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Min(12),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(9),
        ],
    )
    .header(Row::new(vec!["#", "Name", "Points", "Exercises", "Level"]).style(header_style))
    .block(Block::default().borders(Borders::ALL).title(" Leaderboard "));
    f.render_widget(leaderboard, tables[0]);

    let history_block = Block::default().borders(Borders::ALL).title(" Recent ");
    if ledger.history().is_empty() {
        f.render_widget(
            Paragraph::new("No routines finished yet.")
                .style(theme.dim)
                .block(history_block),
            tables[1],
        );
    } else {
        let rows: Vec<Row> = ledger
            .history()
            .iter()
            .rev()
            .take(HISTORY_ROWS)
            .map(present_record)
            .collect();
        let history = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Min(10),
                Constraint::Length(8),
                Constraint::Length(5),
            ],
        )
        .block(history_block);
        f.render_widget(history, tables[1]);
    }

    f.render_widget(
        Paragraph::new("(tab/b) back  (esc) quit")
            .style(theme.dim.add_modifier(Modifier::ITALIC))
            .alignment(Alignment::Center),
        chunks[3],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use limber::pain::PainLocation;

    fn record(loc: PainLocation) -> ExerciseRecord {
        ExerciseRecord {
            id: 1,
            completed_at: Local::now(),
            pain_location: loc,
            step_count: 3,
            points_awarded: 75,
        }
    }

    #[test]
    fn test_favourite_region() {
        assert_eq!(favourite_region(&[]), None);
        let history = vec![
            record(PainLocation::Ankle),
            record(PainLocation::Head),
            record(PainLocation::Ankle),
        ];
        assert_eq!(favourite_region(&history), Some(PainLocation::Ankle.display_name()));
    }
}
