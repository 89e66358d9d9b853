pub const MAX_LEVEL: i64 = 50;
pub const POINTS_PER_LEVEL: i64 = 100;

/// Points for a completed quiz: 10 per correct answer, an accuracy bonus
/// (only the highest qualifying tier), and a flat speed bonus when the
/// average answer took under five seconds. A zero-correct quiz can still
/// collect the speed bonus; that is long-standing behavior, not an accident.
pub fn quiz_points(correct: i64, total: i64, time_spent_secs: f64) -> i64 {
    let mut points = correct * 10;

    let accuracy = accuracy_percent(correct, total);
    if accuracy == 100.0 {
        points += 50;
    } else if accuracy >= 80.0 {
        points += 20;
    }

    if time_spent_secs < (total * 5) as f64 {
        points += 25;
    }

    points.max(0)
}

pub fn accuracy_percent(correct: i64, total: i64) -> f64 {
    if total > 0 {
        correct as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

pub fn level_for_points(points: i64) -> i64 {
    (points / POINTS_PER_LEVEL + 1).min(MAX_LEVEL)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelProgress {
    pub level: i64,
    pub next_threshold: i64,
    pub progress_ratio: f64,
}

pub fn level_progress(points: i64) -> LevelProgress {
    let level = level_for_points(points);
    LevelProgress {
        level,
        next_threshold: level * POINTS_PER_LEVEL,
        progress_ratio: (points % POINTS_PER_LEVEL) as f64 / POINTS_PER_LEVEL as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_fast_quiz() {
        // 100 base + 50 perfect + 25 speed
        assert_eq!(quiz_points(10, 10, 40.0), 175);
    }

    #[test]
    fn test_high_accuracy_no_speed() {
        // 80 base + 20 accuracy
        assert_eq!(quiz_points(8, 10, 60.0), 100);
    }

    #[test]
    fn test_all_wrong_slow() {
        assert_eq!(quiz_points(0, 10, 60.0), 0);
    }

    #[test]
    fn test_zero_correct_keeps_speed_bonus() {
        assert_eq!(quiz_points(0, 10, 20.0), 25);
    }

    #[test]
    fn test_bonus_tiers_are_exclusive() {
        // perfect gets only the 50, never 50 + 20
        assert_eq!(quiz_points(10, 10, 100.0), 150);
        // 90% lands in the 80% tier
        assert_eq!(quiz_points(9, 10, 100.0), 110);
        // below 80% gets nothing
        assert_eq!(quiz_points(7, 10, 100.0), 70);
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(99), 1);
        assert_eq!(level_for_points(100), 2);
        assert_eq!(level_for_points(4900), 50);
        assert_eq!(level_for_points(100_000), MAX_LEVEL);
    }
}
