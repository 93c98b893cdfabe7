use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide monotonic id, never handed out twice.
pub fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Make sure every later `next_id` is above `floor`, e.g. after restoring
/// stored records.
pub fn reserve_ids_above(floor: u64) {
    NEXT_ID.fetch_max(floor.saturating_add(1), Ordering::Relaxed);
}

/// Countdown text as `m:ss`.
pub fn format_countdown(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Share of a batch reached once the step at `index` is underway.
pub fn progress_percentage(index: usize, total: usize) -> f64 {
    match total {
        0 => 0.0,
        total => ((index + 1) as f64 / total as f64) * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_increases() {
        let a = next_id();
        let b = next_id();
        assert!(b > a);
    }

    #[test]
    fn test_reserve_ids_above() {
        reserve_ids_above(5_000_000);
        assert!(next_id() > 5_000_000);
        // a lower floor never moves the counter back
        reserve_ids_above(3);
        assert!(next_id() > 5_000_000);
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(0), "0:00");
        assert_eq!(format_countdown(9), "0:09");
        assert_eq!(format_countdown(75), "1:15");
        assert_eq!(format_countdown(600), "10:00");
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(progress_percentage(0, 4), 25.0);
        assert_eq!(progress_percentage(3, 4), 100.0);
        assert_eq!(progress_percentage(0, 0), 0.0);
    }
}
