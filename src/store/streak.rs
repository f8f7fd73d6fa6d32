use chrono::{DateTime, TimeZone};

use crate::models::WorkoutSession;

/// Consecutive-day streak ending today or yesterday, newest first.
///
/// Sessions are walked by date descending with a day cursor starting at
/// `now`'s calendar day. A session extends the streak when it met its goal
/// and falls on the cursor day or the day before; the cursor then moves back
/// one day. The first session that fails either test ends the walk, so each
/// calendar day is consumed by at most one session.
pub fn calculate_streak<Tz: TimeZone>(sessions: &[WorkoutSession], now: &DateTime<Tz>) -> u32 {
    let tz = now.timezone();
    let mut sorted: Vec<&WorkoutSession> = sessions.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    let mut streak = 0;
    let mut current = now.date_naive();

    for session in sorted {
        let day = session.date.with_timezone(&tz).date_naive();
        let previous = current.pred_opt();
        let on_cursor = day == current || Some(day) == previous;

        if !(on_cursor && session.goal_met()) {
            break;
        }

        streak += 1;
        match previous {
            Some(date) => current = date,
            None => break,
        }
    }

    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 18, 0, 0).unwrap()
    }

    fn session(days_ago: i64, reps: u32, goal: u32) -> WorkoutSession {
        WorkoutSession {
            id: format!("s-{days_ago}-{reps}"),
            reps_completed: reps,
            time_taken: 60,
            date: now() - Duration::days(days_ago) - Duration::hours(2),
            goal,
        }
    }

    #[test]
    fn empty_history_has_no_streak() {
        assert_eq!(calculate_streak(&[], &now()), 0);
    }

    #[test]
    fn single_goal_met_today() {
        assert_eq!(calculate_streak(&[session(0, 10, 10)], &now()), 1);
    }

    #[test]
    fn today_and_yesterday() {
        let history = [session(1, 12, 10), session(0, 10, 10)];
        assert_eq!(calculate_streak(&history, &now()), 2);
    }

    #[test]
    fn two_day_gap_breaks_the_chain() {
        let history = [session(3, 10, 10), session(0, 10, 10)];
        assert_eq!(calculate_streak(&history, &now()), 1);
    }

    #[test]
    fn missed_goal_today_is_zero() {
        let history = [session(1, 10, 10), session(0, 9, 10)];
        assert_eq!(calculate_streak(&history, &now()), 0);
    }

    #[test]
    fn streak_may_start_yesterday() {
        let history = [session(2, 10, 10), session(1, 10, 10)];
        assert_eq!(calculate_streak(&history, &now()), 2);
    }

    #[test]
    fn stale_history_is_zero() {
        let history = [session(5, 10, 10), session(4, 10, 10)];
        assert_eq!(calculate_streak(&history, &now()), 0);
    }

    #[test]
    fn second_session_on_the_same_day_ends_the_walk() {
        // The newest session today takes today's slot; the cursor moves to
        // yesterday, and the earlier session today no longer matches.
        let mut earlier_today = session(0, 10, 10);
        earlier_today.date = earlier_today.date - Duration::hours(3);
        let history = [session(1, 10, 10), earlier_today, session(0, 10, 10)];

        assert_eq!(calculate_streak(&history, &now()), 1);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let history = [session(0, 10, 10), session(2, 10, 10), session(1, 10, 10)];
        assert_eq!(calculate_streak(&history, &now()), 3);
    }
}
