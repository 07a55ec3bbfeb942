//! crates/lingualive_core/src/progression.rs
//!
//! Pure progression rules: XP amounts, level derivation and streak
//! transitions. The database adapter mirrors the streak transition inside its
//! atomic upsert; this module is the canonical statement of the rules and the
//! place they are unit tested.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{BadgeDefinition, ProgressSummary, UserProgress};

/// XP granted for one successful (non-cached) image translation.
pub const XP_PER_TRANSLATION: i64 = 50;

/// Default XP required per level. `level = floor(xp / threshold) + 1`.
pub const DEFAULT_LEVEL_THRESHOLD: i64 = 1000;

/// Maximum gap between activities that still counts as the same streak.
pub const STREAK_WINDOW_HOURS: i64 = 48;

/// Badge granted on a user's first non-cached successful translation.
pub const FIRST_TRANSLATION_BADGE: BadgeDefinition = BadgeDefinition {
    key: "first-translation",
    name: "First Translation",
    description: "Completed your first visual translation.",
};

/// Derives the level for an XP total. Level is never stored; it is always
/// recomputed from xp so the two cannot diverge.
pub fn level_for_xp(xp: i64, threshold: i64) -> i64 {
    xp / threshold.max(1) + 1
}

/// Computes the streak value after an activity at `now`, given the previous
/// streak and the previous activity time.
///
/// Rules: a gap over the streak window resets to 1; crossing a UTC calendar
/// day boundary within the window increments; any further activity on the
/// same day leaves the streak unchanged.
pub fn next_streak(current: i32, last_active_at: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    if now.signed_duration_since(last_active_at) > Duration::hours(STREAK_WINDOW_HOURS) {
        return 1;
    }
    if now.date_naive() > last_active_at.date_naive() {
        current + 1
    } else {
        current
    }
}

/// Builds the client-facing view of a progress row, deriving the level.
pub fn summarize(progress: &UserProgress, level_threshold: i64) -> ProgressSummary {
    ProgressSummary {
        xp: progress.xp,
        level: level_for_xp(progress.xp, level_threshold),
        streak: progress.streak,
        last_active_at: Some(progress.last_active_at),
    }
}

/// The view served to a user who has no progress row yet.
pub fn empty_summary() -> ProgressSummary {
    ProgressSummary {
        xp: 0,
        level: 1,
        streak: 0,
        last_active_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn level_is_floor_of_xp_over_threshold_plus_one() {
        assert_eq!(level_for_xp(0, 1000), 1);
        assert_eq!(level_for_xp(999, 1000), 1);
        assert_eq!(level_for_xp(1000, 1000), 2);
        assert_eq!(level_for_xp(2340, 1000), 3);
    }

    #[test]
    fn level_respects_custom_threshold() {
        assert_eq!(level_for_xp(2340, 500), 5);
        // A nonsense threshold must not panic on division.
        assert_eq!(level_for_xp(100, 0), 101);
    }

    #[test]
    fn streak_unchanged_within_same_day() {
        let last = at(2024, 3, 10, 9, 0);
        let now = at(2024, 3, 10, 21, 0);
        assert_eq!(next_streak(4, last, now), 4);
    }

    #[test]
    fn streak_increments_across_day_boundary_within_window() {
        let last = at(2024, 3, 10, 22, 0);
        let now = at(2024, 3, 11, 8, 0);
        assert_eq!(next_streak(4, last, now), 5);
    }

    #[test]
    fn streak_resets_after_window_expires() {
        let last = at(2024, 3, 10, 9, 0);
        let now = at(2024, 3, 12, 10, 0);
        assert_eq!(next_streak(7, last, now), 1);
    }

    #[test]
    fn streak_survives_exactly_at_window_edge() {
        let last = at(2024, 3, 10, 9, 0);
        let now = at(2024, 3, 12, 9, 0);
        // Exactly 48h is still inside the window and crosses a day boundary.
        assert_eq!(next_streak(2, last, now), 3);
    }

    #[test]
    fn summarize_derives_level_from_xp() {
        let progress = UserProgress {
            user_id: Uuid::new_v4(),
            xp: 2340,
            streak: 3,
            last_active_at: at(2024, 3, 10, 9, 0),
        };
        let summary = summarize(&progress, DEFAULT_LEVEL_THRESHOLD);
        assert_eq!(summary.level, 3);
        assert_eq!(summary.xp, 2340);
        assert_eq!(summary.streak, 3);
    }

    #[test]
    fn empty_summary_is_level_one_zero_streak() {
        let summary = empty_summary();
        assert_eq!(summary.xp, 0);
        assert_eq!(summary.level, 1);
        assert_eq!(summary.streak, 0);
        assert!(summary.last_active_at.is_none());
    }
}
