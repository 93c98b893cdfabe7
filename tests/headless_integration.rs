use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use limber::assistant::ScriptedAssistant;
use limber::clock::ManualClock;
use limber::coach::{ChatCard, Coach};
use limber::history::HistoryDb;
use limber::ledger::points_for;
use limber::runtime::{AppEvent, FixedTicker, Runner, TestEventSource};
use limber::session::SessionConfig;
use limber::speech::SilentAnnouncer;

// Headless integration: the coach driven by the runtime without a TTY.
// Every tick moves the manual clock one second.

fn coach(clock: &ManualClock, name: &str) -> Coach<ManualClock> {
    let config = SessionConfig {
        user_name: name.to_string(),
        ..SessionConfig::default()
    };
    Coach::new(
        config,
        clock.clone(),
        Box::new(ScriptedAssistant::seeded(7).unwrap()),
        Box::new(SilentAnnouncer),
    )
}

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

/// Drive the loop until the routine finishes (or a bounded number of steps).
fn drive(runner: &Runner<TestEventSource, FixedTicker>, coach: &mut Coach<ManualClock>, clock: &ManualClock) {
    for _ in 0..5_000u32 {
        if !coach.is_exercising() {
            break;
        }
        match runner.step() {
            AppEvent::Tick => {
                clock.advance_secs(1);
                coach.poll();
            }
            AppEvent::Resize => {}
            AppEvent::Key(key) => match key.code {
                KeyCode::Char('s') => {
                    let _ = coach.skip();
                }
                KeyCode::Char('c') => {
                    let _ = coach.complete();
                }
                _ => {}
            },
        }
    }
}

fn runner(rx: mpsc::Receiver<AppEvent>) -> Runner<TestEventSource, FixedTicker> {
    Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    )
}

#[test]
fn headless_routine_runs_to_completion_on_ticks() {
    let clock = ManualClock::new();
    let mut coach = coach(&clock, "Ada");
    let (_tx, rx) = mpsc::channel();
    let runner = runner(rx);

    let steps = coach.send_message("my neck is stiff from the desk").unwrap();
    assert!(steps >= 1);
    assert!(coach.is_exercising());

    drive(&runner, &mut coach, &clock);

    assert!(!coach.is_exercising(), "routine should have finished");
    assert_eq!(coach.ledger().session_points(), points_for(steps));
    assert_eq!(coach.ledger().history().len(), 1);
    assert!(coach.celebration().is_some());
    let completed = coach
        .transcript()
        .iter()
        .filter(|card| matches!(card, ChatCard::Step(step) if step.completed))
        .count();
    assert_eq!(completed, steps);

    let ada = coach.ledger().leaderboard().get("Ada").unwrap();
    assert_eq!(ada.total_points, points_for(steps));
    assert_eq!(ada.completed_exercise_count, 1);
}

#[test]
fn headless_keys_skip_through_routine() {
    let clock = ManualClock::new();
    let mut coach = coach(&clock, "Bea");
    let (tx, rx) = mpsc::channel();
    let runner = runner(rx);

    let steps = coach.send_message("my lower back aches").unwrap();
    // one skip per step; rests in between are covered by ticks
    for _ in 0..steps {
        tx.send(key('s')).unwrap();
        tx.send(AppEvent::Tick).unwrap();
    }

    drive(&runner, &mut coach, &clock);

    assert!(!coach.is_exercising());
    assert_eq!(coach.ledger().session_points(), points_for(steps));
}

#[test]
fn headless_second_message_rejected_while_running() {
    let clock = ManualClock::new();
    let mut coach = coach(&clock, "Cy");
    coach.send_message("sore wrist").unwrap();
    let cards = coach.transcript().len();

    let err = coach.send_message("and my knee").unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(coach.transcript().len(), cards);
}

#[test]
fn headless_history_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    let clock = ManualClock::new();
    let (_tx, rx) = mpsc::channel();
    let runner = runner(rx);

    let mut first = coach(&clock, "Dee");
    first.attach_history(HistoryDb::open(&path).unwrap()).unwrap();
    let steps = first.send_message("my shoulder is tight").unwrap();
    drive(&runner, &mut first, &clock);
    assert!(!first.is_exercising());
    drop(first);

    let db = HistoryDb::open(&path).unwrap();
    let history = db.load_history("Dee").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].points_awarded, points_for(steps));

    let mut second = coach(&clock, "Dee");
    second.attach_history(db).unwrap();
    assert_eq!(second.ledger().session_points(), points_for(steps));
    let rank = second.ledger().leaderboard().rank_of("Dee").unwrap();
    // the community seed starts at 720 points, so a single routine ranks last
    assert_eq!(rank, 6);
}
