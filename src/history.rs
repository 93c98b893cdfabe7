use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::ledger::{ExerciseRecord, LeaderboardEntry};
use crate::pain::PainLocation;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS exercise_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        record_id INTEGER NOT NULL,
        user_name TEXT NOT NULL,
        completed_at TEXT NOT NULL,
        pain_location TEXT NOT NULL,
        step_count INTEGER NOT NULL,
        points_awarded INTEGER NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_exercise_history_user ON exercise_history(user_name);
    CREATE TABLE IF NOT EXISTS leaderboard (
        user_name TEXT PRIMARY KEY,
        total_points INTEGER NOT NULL,
        completed_exercise_count INTEGER NOT NULL,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// One CSV row of an exported history.
#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    completed_at: String,
    pain_location: String,
    region: &'a str,
    step_count: usize,
    points_awarded: u32,
}

/// Append-only exercise history and the stored leaderboard.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open the database under the application state directory.
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("limber_history.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(HistoryDb { conn })
    }

    /// Append `record` and store `entry` in one transaction.
    pub fn record_completion(
        &mut self,
        user_name: &str,
        record: &ExerciseRecord,
        entry: &LeaderboardEntry,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO exercise_history
            (record_id, user_name, completed_at, pain_location, step_count, points_awarded)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                user_name,
                record.completed_at.to_rfc3339(),
                record.pain_location.to_string(),
                record.step_count,
                record.points_awarded,
            ],
        )?;
        tx.execute(
            r#"
            INSERT INTO leaderboard (user_name, total_points, completed_exercise_count)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_name) DO UPDATE SET
                total_points = excluded.total_points,
                completed_exercise_count = excluded.completed_exercise_count,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                entry.user_name,
                entry.total_points,
                entry.completed_exercise_count
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// A user's history, oldest first.
    pub fn load_history(&self, user_name: &str) -> Result<Vec<ExerciseRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT record_id, completed_at, pain_location, step_count, points_awarded
            FROM exercise_history
            WHERE user_name = ?1
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([user_name], |row| {
            let completed_at: String = row.get(1)?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        1,
                        "completed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            let tag: String = row.get(2)?;
            let pain_location = PainLocation::from_tag(&tag).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    2,
                    "pain_location".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;

            Ok(ExerciseRecord {
                id: row.get(0)?,
                completed_at,
                pain_location,
                step_count: row.get(3)?,
                points_awarded: row.get(4)?,
            })
        })?;

        let mut history = Vec::new();
        for record in rows {
            history.push(record?);
        }
        Ok(history)
    }

    /// Stored leaderboard entries, highest first.
    pub fn load_leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_name, total_points, completed_exercise_count
            FROM leaderboard
            ORDER BY total_points DESC, updated_at ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LeaderboardEntry {
                user_name: row.get(0)?,
                total_points: row.get(1)?,
                completed_exercise_count: row.get(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    /// Write `user_name`'s history as CSV. Returns the number of rows.
    pub fn export_csv<W: std::io::Write>(&self, user_name: &str, out: W) -> Result<usize> {
        let history = self.load_history(user_name)?;
        let mut writer = csv::Writer::from_writer(out);
        for record in &history {
            writer.serialize(HistoryRow {
                completed_at: record.completed_at.to_rfc3339(),
                pain_location: record.pain_location.to_string(),
                region: record.pain_location.display_name(),
                step_count: record.step_count,
                points_awarded: record.points_awarded,
            })?;
        }
        writer.flush()?;
        Ok(history.len())
    }

    /// Highest record id stored for any user, 0 when empty.
    pub fn max_record_id(&self) -> Result<u64> {
        let max: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(record_id), 0) FROM exercise_history",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(max).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::points_for;
    use tempfile::tempdir;

    fn record(location: PainLocation, steps: usize) -> ExerciseRecord {
        ExerciseRecord {
            id: crate::util::next_id(),
            completed_at: Local::now(),
            pain_location: location,
            step_count: steps,
            points_awarded: points_for(steps),
        }
    }

    #[test]
    fn test_record_and_load_history() {
        let mut db = HistoryDb::in_memory().unwrap();
        let first = record(PainLocation::Knee, 3);
        let second = record(PainLocation::LowerBack, 5);

        db.record_completion("Ada", &first, &LeaderboardEntry::new("Ada", 75, 1))
            .unwrap();
        db.record_completion("Ada", &second, &LeaderboardEntry::new("Ada", 200, 2))
            .unwrap();
        db.record_completion("Bea", &first, &LeaderboardEntry::new("Bea", 75, 1))
            .unwrap();

        let history = db.load_history("Ada").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, first.id);
        assert_eq!(history[0].pain_location, PainLocation::Knee);
        assert_eq!(history[1].points_awarded, 125);
        assert_eq!(
            history[1].completed_at.timestamp(),
            second.completed_at.timestamp()
        );
        assert!(db.load_history("Nobody").unwrap().is_empty());
    }

    #[test]
    fn test_leaderboard_upserts() {
        let mut db = HistoryDb::in_memory().unwrap();
        let r = record(PainLocation::Hip, 2);
        db.record_completion("Ada", &r, &LeaderboardEntry::new("Ada", 50, 1))
            .unwrap();
        db.record_completion("Bea", &r, &LeaderboardEntry::new("Bea", 60, 1))
            .unwrap();
        db.record_completion("Ada", &r, &LeaderboardEntry::new("Ada", 100, 2))
            .unwrap();

        let entries = db.load_leaderboard().unwrap();
        assert_eq!(
            entries,
            vec![
                LeaderboardEntry::new("Ada", 100, 2),
                LeaderboardEntry::new("Bea", 60, 1),
            ]
        );
    }

    #[test]
    fn test_export_csv() {
        let mut db = HistoryDb::in_memory().unwrap();
        db.record_completion(
            "Ada",
            &record(PainLocation::UpperBack, 4),
            &LeaderboardEntry::new("Ada", 100, 1),
        )
        .unwrap();

        let mut out = Vec::new();
        let rows = db.export_csv("Ada", &mut out).unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("completed_at,pain_location,region,step_count,points_awarded")
        );
        let row = lines.next().unwrap();
        assert!(row.ends_with(",upperBack,Upper Back & Shoulders,4,100"));
    }

    #[test]
    fn test_max_record_id() {
        let mut db = HistoryDb::in_memory().unwrap();
        assert_eq!(db.max_record_id().unwrap(), 0);

        let mut ada = record(PainLocation::Ankle, 1);
        ada.id = 40;
        let mut bea = record(PainLocation::Knee, 2);
        bea.id = 41;
        db.record_completion("Ada", &ada, &LeaderboardEntry::new("Ada", 25, 1))
            .unwrap();
        db.record_completion("Bea", &bea, &LeaderboardEntry::new("Bea", 50, 1))
            .unwrap();
        // across users, not just the one being restored
        assert_eq!(db.max_record_id().unwrap(), 41);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");
        {
            let mut db = HistoryDb::open(&path).unwrap();
            db.record_completion(
                "Ada",
                &record(PainLocation::Spine, 2),
                &LeaderboardEntry::new("Ada", 50, 1),
            )
            .unwrap();
        }
        let db = HistoryDb::open(&path).unwrap();
        assert_eq!(db.load_history("Ada").unwrap().len(), 1);
    }
}
