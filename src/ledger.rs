//! Points, completed-exercise history and the leaderboard.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::pain::PainLocation;
use crate::sequencer::Completion;
use crate::util::{next_id, reserve_ids_above};

pub const POINTS_PER_STEP: u32 = 25;
pub const MAX_POINTS_PER_SEQUENCE: u32 = 250;
pub const POINTS_PER_LEVEL: u32 = 100;

/// Points a finished batch of `step_count` steps is worth.
pub fn points_for(step_count: usize) -> u32 {
    u32::try_from(step_count)
        .unwrap_or(u32::MAX)
        .saturating_mul(POINTS_PER_STEP)
        .min(MAX_POINTS_PER_SEQUENCE)
}

pub fn level(points: u32) -> u32 {
    points / POINTS_PER_LEVEL + 1
}

pub fn progress_to_next_level(points: u32) -> u32 {
    points % POINTS_PER_LEVEL
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecord {
    pub id: u64,
    pub completed_at: DateTime<Local>,
    pub pain_location: PainLocation,
    pub step_count: usize,
    pub points_awarded: u32,
}

impl ExerciseRecord {
    pub fn from_completion(completion: &Completion, completed_at: DateTime<Local>) -> Self {
        Self {
            id: next_id(),
            completed_at,
            pain_location: completion.pain_location,
            step_count: completion.step_count,
            points_awarded: completion.points_awarded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_name: String,
    pub total_points: u32,
    pub completed_exercise_count: u32,
}

impl LeaderboardEntry {
    pub fn new(user_name: impl Into<String>, total_points: u32, completed_exercise_count: u32) -> Self {
        Self {
            user_name: user_name.into(),
            total_points,
            completed_exercise_count,
        }
    }

    pub fn level(&self) -> u32 {
        level(self.total_points)
    }
}

/// Entries keyed by user name, kept sorted by descending points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The board every session starts from.
    pub fn community() -> Self {
        Self::from_entries(vec![
            LeaderboardEntry::new("Alex Chen", 1250, 47),
            LeaderboardEntry::new("Sarah Johnson", 1180, 43),
            LeaderboardEntry::new("Mike Rodriguez", 980, 38),
            LeaderboardEntry::new("Emma Thompson", 850, 32),
            LeaderboardEntry::new("David Park", 720, 28),
        ])
    }

    pub fn from_entries(entries: Vec<LeaderboardEntry>) -> Self {
        let mut board = Self { entries };
        board.sort();
        board
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn get(&self, user_name: &str) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| e.user_name == user_name)
    }

    /// 1-based rank of `user_name`.
    pub fn rank_of(&self, user_name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.user_name == user_name)
            .map(|i| i + 1)
    }

    /// Replace or add entries wholesale, e.g. with stored totals.
    pub fn overlay(&mut self, entries: impl IntoIterator<Item = LeaderboardEntry>) {
        for entry in entries {
            match self.entries.iter_mut().find(|e| e.user_name == entry.user_name) {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
        self.sort();
    }

    fn sort(&mut self) {
        // stable: equal totals keep their relative order
        self.entries
            .sort_by(|a, b| b.total_points.cmp(&a.total_points));
    }
}

/// What one user has done this session, plus the shared board.
#[derive(Debug, Clone)]
pub struct SessionLedger {
    session_points: u32,
    history: Vec<ExerciseRecord>,
    leaderboard: Leaderboard,
}

impl Default for SessionLedger {
    fn default() -> Self {
        Self::new(Leaderboard::community())
    }
}

impl SessionLedger {
    pub fn new(leaderboard: Leaderboard) -> Self {
        Self {
            session_points: 0,
            history: Vec::new(),
            leaderboard,
        }
    }

    /// Rebuild from stored history; points are the history's sum. Records
    /// booked afterwards get ids above every restored one.
    pub fn restore(history: Vec<ExerciseRecord>, leaderboard: Leaderboard) -> Self {
        if let Some(max) = history.iter().map(|r| r.id).max() {
            reserve_ids_above(max);
        }
        let session_points = history
            .iter()
            .fold(0u32, |acc, r| acc.saturating_add(r.points_awarded));
        Self {
            session_points,
            history,
            leaderboard,
        }
    }

    pub fn session_points(&self) -> u32 {
        self.session_points
    }

    pub fn history(&self) -> &[ExerciseRecord] {
        &self.history
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub fn level(&self) -> u32 {
        level(self.session_points)
    }

    pub fn progress_to_next_level(&self) -> u32 {
        progress_to_next_level(self.session_points)
    }

    /// Book a finished sequence for `user_name` and return the updated board.
    ///
    /// The board is updated from the values as they were before this record:
    /// the exercise count is `history.len() + 1` and a new user starts from the
    /// session's points so far plus this award.
    pub fn record_completion(&mut self, record: ExerciseRecord, user_name: &str) -> &[LeaderboardEntry] {
        let points = record.points_awarded;
        let count = u32::try_from(self.history.len() + 1).unwrap_or(u32::MAX);

        match self
            .leaderboard
            .entries
            .iter_mut()
            .find(|e| e.user_name == user_name)
        {
            Some(entry) => {
                entry.total_points = entry.total_points.saturating_add(points);
                entry.completed_exercise_count = count;
            }
            None => self.leaderboard.entries.push(LeaderboardEntry::new(
                user_name,
                self.session_points.saturating_add(points),
                count,
            )),
        }

        self.history.push(record);
        self.session_points = self.session_points.saturating_add(points);
        self.leaderboard.sort();

        self.leaderboard.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(steps: usize) -> ExerciseRecord {
        ExerciseRecord::from_completion(
            &Completion {
                pain_location: PainLocation::Knee,
                step_count: steps,
                points_awarded: points_for(steps),
            },
            Local::now(),
        )
    }

    fn is_sorted_desc(entries: &[LeaderboardEntry]) -> bool {
        entries
            .windows(2)
            .all(|w| w[0].total_points >= w[1].total_points)
    }

    #[test]
    fn points_cap_at_250() {
        assert_eq!(points_for(0), 0);
        assert_eq!(points_for(1), 25);
        assert_eq!(points_for(5), 125);
        assert_eq!(points_for(10), 250);
        assert_eq!(points_for(12), 250);
        assert_eq!(points_for(usize::MAX), 250);
    }

    #[test]
    fn level_and_progress_from_points() {
        assert_eq!(level(0), 1);
        assert_eq!(level(99), 1);
        assert_eq!(level(100), 2);
        assert_eq!(level(275), 3);
        assert_eq!(progress_to_next_level(275), 75);
        assert_eq!(progress_to_next_level(300), 0);
    }

    #[test]
    fn ada_first_insert_then_update() {
        let mut ledger = SessionLedger::new(Leaderboard::new());

        let board = ledger.record_completion(record(4), "Ada").to_vec();
        assert_eq!(board, vec![LeaderboardEntry::new("Ada", 100, 1)]);

        let board = ledger.record_completion(record(2), "Ada").to_vec();
        assert_eq!(board, vec![LeaderboardEntry::new("Ada", 150, 2)]);

        assert_eq!(ledger.session_points(), 150);
        assert_eq!(ledger.history().len(), 2);
        assert_eq!(ledger.level(), 2);
        assert_eq!(ledger.progress_to_next_level(), 50);
    }

    #[test]
    fn new_user_counts_points_already_earned() {
        let mut ledger = SessionLedger::new(Leaderboard::new());
        ledger.record_completion(record(4), "Ada");

        // a different name joins mid-session
        ledger.record_completion(record(2), "Bea");
        let bea = ledger.leaderboard().get("Bea").cloned();
        assert_eq!(bea, Some(LeaderboardEntry::new("Bea", 150, 2)));
    }

    #[test]
    fn existing_user_count_uses_history_before_append() {
        let board = Leaderboard::from_entries(vec![LeaderboardEntry::new("Ada", 500, 20)]);
        let mut ledger = SessionLedger::new(board);

        ledger.record_completion(record(1), "Ada");
        let ada = ledger.leaderboard().get("Ada").cloned();
        // 20 previous completions are replaced by this session's count
        assert_eq!(ada, Some(LeaderboardEntry::new("Ada", 525, 1)));
    }

    #[test]
    fn board_stays_sorted_after_each_update() {
        let mut ledger = SessionLedger::default();
        assert!(is_sorted_desc(ledger.leaderboard().entries()));
        assert_eq!(ledger.leaderboard().entries().len(), 5);

        for _ in 0..4 {
            let entries = ledger.record_completion(record(8), "Ada");
            assert!(is_sorted_desc(entries));
        }
        // 4 * 200
        assert_eq!(ledger.leaderboard().get("Ada").map(|e| e.total_points), Some(800));
        // Emma Thompson's 850 stays ahead
        assert_eq!(ledger.leaderboard().rank_of("Ada"), Some(5));
        assert_eq!(ledger.leaderboard().rank_of("David Park"), Some(6));
    }

    #[test]
    fn ties_keep_prior_order() {
        let mut ledger = SessionLedger::new(Leaderboard::from_entries(vec![
            LeaderboardEntry::new("First", 100, 1),
            LeaderboardEntry::new("Second", 100, 1),
        ]));
        ledger.record_completion(record(4), "Third");

        let names: Vec<&str> = ledger
            .leaderboard()
            .entries()
            .iter()
            .map(|e| e.user_name.as_str())
            .collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn totals_never_decrease() {
        let mut ledger = SessionLedger::new(Leaderboard::new());
        let mut last = 0;
        for steps in [0, 3, 1, 12, 0] {
            ledger.record_completion(record(steps), "Ada");
            let total = ledger.leaderboard().get("Ada").map(|e| e.total_points).unwrap();
            assert!(total >= last);
            last = total;
        }
    }

    #[test]
    fn restore_sums_history() {
        let history = vec![record(2), record(3)];
        let ledger = SessionLedger::restore(history, Leaderboard::new());
        assert_eq!(ledger.session_points(), 125);
        assert_eq!(ledger.history().len(), 2);
    }

    #[test]
    fn overlay_replaces_by_name_and_resorts() {
        let mut board = Leaderboard::community();
        board.overlay([
            LeaderboardEntry::new("David Park", 2000, 30),
            LeaderboardEntry::new("Ada", 10, 1),
        ]);
        assert_eq!(board.entries().len(), 6);
        assert_eq!(board.rank_of("David Park"), Some(1));
        assert_eq!(board.rank_of("Ada"), Some(6));
    }
}
