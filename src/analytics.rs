// src/analytics.rs - Quiz performance derivations
//
// Everything here is a pure function of one user's quiz history plus "now".
// The full performance view and the lightweight summary view are both built
// from these primitives; they are cached and invalidated independently.
use crate::models::QuizResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Qualitative bucket for a percentage score. Total over all of f64 and
/// deliberately unclamped: out-of-range input is an upstream data bug and
/// maps to the nearest end bucket rather than being repaired here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRating {
    pub rating: &'static str,
    pub color: &'static str,
    pub bg_color: &'static str,
}

pub fn performance_rating(percentage: f64) -> PerformanceRating {
    let (rating, color, bg_color) = if percentage >= 90.0 {
        ("Excellent", "text-green-800", "bg-green-100")
    } else if percentage >= 80.0 {
        ("Very Good", "text-green-700", "bg-green-50")
    } else if percentage >= 70.0 {
        ("Good", "text-blue-700", "bg-blue-50")
    } else if percentage >= 60.0 {
        ("Average", "text-yellow-700", "bg-yellow-50")
    } else if percentage >= 50.0 {
        ("Below Average", "text-orange-700", "bg-orange-50")
    } else {
        ("Needs Improvement", "text-red-700", "bg-red-50")
    };
    PerformanceRating {
        rating,
        color,
        bg_color,
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

fn mean_percentage(results: &[QuizResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.percentage).sum::<f64>() / results.len() as f64
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
    pub value: i64,
    pub trend: &'static str,
    pub recent_average: i64,
    pub previous_average: i64,
}

/// Compares the 5 most recent results against the 5 before them, on rounded
/// window means. A window with no results contributes 0. More than 5 points
/// of movement flips the label off "stable".
pub fn improvement_trend(results: &[QuizResult]) -> Improvement {
    let recent = &results[..results.len().min(5)];
    let previous = &results[results.len().min(5)..results.len().min(10)];

    let recent_average = round(mean_percentage(recent));
    let previous_average = round(mean_percentage(previous));
    let value = recent_average - previous_average;

    let trend = if value > 5 {
        "improving"
    } else if value < -5 {
        "declining"
    } else {
        "stable"
    };

    Improvement {
        value,
        trend,
        recent_average,
        previous_average,
    }
}

/// Consecutive qualifying days (percentage >= 60), walking newest-first.
/// The gap rule is intentional: a result breaks the streak once its distance
/// from today in whole days exceeds the streak counted so far plus one.
pub fn calculate_streak(results: &[QuizResult], now: DateTime<Utc>) -> u32 {
    let mut sorted: Vec<&QuizResult> = results.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    let mut streak: u32 = 0;
    for result in sorted {
        let day_diff = (now - result.date).num_days();
        if day_diff > i64::from(streak) + 1 {
            break;
        }
        if result.percentage >= 60.0 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    pub total: usize,
    pub total_score: f64,
    pub average: i64,
}

fn difficulty_breakdown(results: &[QuizResult]) -> HashMap<String, DifficultyStats> {
    let mut stats: HashMap<String, DifficultyStats> = HashMap::new();
    for result in results {
        let difficulty = if result.difficulty.is_empty() {
            "medium"
        } else {
            result.difficulty.as_str()
        };
        let entry = stats
            .entry(difficulty.to_string())
            .or_insert(DifficultyStats {
                total: 0,
                total_score: 0.0,
                average: 0,
            });
        entry.total += 1;
        entry.total_score += result.percentage;
    }
    for entry in stats.values_mut() {
        entry.average = round(entry.total_score / entry.total as f64);
    }
    stats
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInsights {
    pub overall_rating: PerformanceRating,
    pub average_score: i64,
    pub best_score: f64,
    pub worst_score: f64,
    pub total_quizzes: usize,
    pub improvement: Improvement,
    pub difficulty_stats: HashMap<String, DifficultyStats>,
    /// 100 - sqrt(population variance) / 2, rounded and unclamped. Lower
    /// spread scores higher; this is a house metric, not a textbook one.
    pub consistency: i64,
    pub streak: u32,
}

/// Derives the insight block from history sorted newest-first. Returns `None`
/// for an empty history; callers map that to a zeroed "no data" response.
pub fn performance_insights(
    results: &[QuizResult],
    now: DateTime<Utc>,
) -> Option<PerformanceInsights> {
    if results.is_empty() {
        return None;
    }

    let total_quizzes = results.len();
    let average_score = round(mean_percentage(results));

    let best_score = results
        .iter()
        .map(|r| r.percentage)
        .fold(f64::NEG_INFINITY, f64::max);
    let worst_score = results
        .iter()
        .map(|r| r.percentage)
        .fold(f64::INFINITY, f64::min);

    // Population variance around the rounded mean, matching how the overall
    // rating and averages are reported.
    let variance = results
        .iter()
        .map(|r| (r.percentage - average_score as f64).powi(2))
        .sum::<f64>()
        / total_quizzes as f64;
    let consistency = round(100.0 - variance.sqrt() / 2.0);

    Some(PerformanceInsights {
        overall_rating: performance_rating(average_score as f64),
        average_score,
        best_score,
        worst_score,
        total_quizzes,
        improvement: improvement_trend(results),
        difficulty_stats: difficulty_breakdown(results),
        consistency,
        streak: calculate_streak(results, now),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedQuizResult {
    #[serde(flatten)]
    pub result: QuizResult,
    pub performance_rating: PerformanceRating,
}

pub fn annotate(results: &[QuizResult]) -> Vec<RatedQuizResult> {
    results
        .iter()
        .map(|result| RatedQuizResult {
            result: result.clone(),
            performance_rating: performance_rating(result.percentage),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStats {
    pub subject: String,
    pub total_quizzes: usize,
    pub average_score: i64,
    pub performance_rating: PerformanceRating,
    pub best_score: f64,
    pub worst_score: f64,
    /// The group's 3 most recent scores, newest first.
    pub trend: Vec<f64>,
}

/// Groups by topic (empty topics bucket under "Unknown"; whitespace-only
/// topics are kept as their own group) and sorts the breakdown by
/// descending average score.
pub fn subject_breakdown(results: &[QuizResult]) -> Vec<SubjectStats> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();

    for result in results {
        let subject = if result.topic.is_empty() {
            "Unknown"
        } else {
            result.topic.as_str()
        };
        if !groups.contains_key(subject) {
            order.push(subject.to_string());
        }
        groups
            .entry(subject.to_string())
            .or_default()
            .push(result.percentage);
    }

    let mut stats: Vec<SubjectStats> = order
        .into_iter()
        .map(|subject| {
            let scores = &groups[&subject];
            let average_score = round(scores.iter().sum::<f64>() / scores.len() as f64);
            SubjectStats {
                total_quizzes: scores.len(),
                average_score,
                performance_rating: performance_rating(average_score as f64),
                best_score: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                worst_score: scores.iter().copied().fold(f64::INFINITY, f64::min),
                trend: scores.iter().copied().take(3).collect(),
                subject,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.average_score.cmp(&a.average_score));
    stats
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPerformanceView {
    pub has_data: bool,
    pub recent_results: Vec<RatedQuizResult>,
    pub performance_insights: PerformanceInsights,
    pub subject_performance: Vec<SubjectStats>,
    pub total_quizzes: usize,
    pub time_spent_total: f64,
    pub consistency: i64,
}

/// Full analytics view over the complete history (sorted newest-first).
pub fn performance_view(results: &[QuizResult], now: DateTime<Utc>) -> Option<QuizPerformanceView> {
    let insights = performance_insights(results, now)?;
    let consistency = insights.consistency;
    Some(QuizPerformanceView {
        has_data: true,
        recent_results: annotate(&results[..results.len().min(5)]),
        subject_performance: subject_breakdown(results),
        total_quizzes: results.len(),
        time_spent_total: results.iter().map(|r| r.time_spent).sum(),
        consistency,
        performance_insights: insights,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub total_quizzes: usize,
    pub average_score: i64,
    pub best_score: f64,
    pub current_streak: u32,
    pub overall_rating: PerformanceRating,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummaryView {
    pub recent_results: Vec<RatedQuizResult>,
    pub stats: QuizStats,
}

/// Lightweight variant for the dashboard: stats plus the 5 most recent
/// annotated results, skipping the heavier breakdowns.
pub fn summary_view(
    recent: &[QuizResult],
    all: &[QuizResult],
    now: DateTime<Utc>,
) -> QuizSummaryView {
    let total_quizzes = all.len();
    let average_score = if total_quizzes > 0 {
        round(mean_percentage(all))
    } else {
        0
    };
    let best_score = if total_quizzes > 0 {
        all.iter()
            .map(|r| r.percentage)
            .fold(f64::NEG_INFINITY, f64::max)
    } else {
        0.0
    };

    QuizSummaryView {
        recent_results: annotate(recent),
        stats: QuizStats {
            total_quizzes,
            average_score,
            best_score,
            current_streak: calculate_streak(all, now),
            overall_rating: performance_rating(average_score as f64),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn quiz(percentage: f64, days_ago: i64, now: DateTime<Utc>) -> QuizResult {
        quiz_in(percentage, days_ago, now, "Algebra", "medium")
    }

    fn quiz_in(
        percentage: f64,
        days_ago: i64,
        now: DateTime<Utc>,
        topic: &str,
        difficulty: &str,
    ) -> QuizResult {
        let date = now - Duration::days(days_ago);
        QuizResult {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            topic: topic.to_string(),
            score: percentage / 10.0,
            total_questions: 10,
            percentage,
            quiz_type: "mcq".to_string(),
            difficulty: difficulty.to_string(),
            time_spent: 120.0,
            date,
            created_at: date,
        }
    }

    #[test]
    fn rating_bucket_boundaries() {
        assert_eq!(performance_rating(90.0).rating, "Excellent");
        assert_eq!(performance_rating(89.0).rating, "Very Good");
        assert_eq!(performance_rating(70.0).rating, "Good");
        assert_eq!(performance_rating(60.0).rating, "Average");
        assert_eq!(performance_rating(59.0).rating, "Below Average");
        assert_eq!(performance_rating(49.9).rating, "Needs Improvement");
    }

    #[test]
    fn rating_is_not_clamped_outside_the_percentage_domain() {
        assert_eq!(performance_rating(130.0).rating, "Excellent");
        assert_eq!(performance_rating(-10.0).rating, "Needs Improvement");
    }

    #[test]
    fn streak_counts_until_the_first_failing_score() {
        let now = Utc::now();
        // Newest first: 70, 65, 80 qualify on consecutive days, 40 breaks.
        let results = vec![
            quiz(70.0, 0, now),
            quiz(65.0, 1, now),
            quiz(80.0, 2, now),
            quiz(40.0, 3, now),
        ];
        assert_eq!(calculate_streak(&results, now), 3);
    }

    #[test]
    fn streak_breaks_on_a_day_gap_wider_than_streak_plus_one() {
        let now = Utc::now();
        // First result is 2 days old with streak 0: gap 2 > 0 + 1 breaks it.
        let results = vec![quiz(95.0, 2, now), quiz(95.0, 3, now)];
        assert_eq!(calculate_streak(&results, now), 0);

        // A recent result widens the allowed gap for the next one.
        let results = vec![quiz(95.0, 0, now), quiz(95.0, 2, now)];
        assert_eq!(calculate_streak(&results, now), 2);
    }

    #[test]
    fn streak_of_empty_history_is_zero() {
        assert_eq!(calculate_streak(&[], Utc::now()), 0);
    }

    #[test]
    fn identical_scores_have_consistency_100() {
        let now = Utc::now();
        let results = vec![quiz(100.0, 0, now), quiz(100.0, 1, now), quiz(100.0, 2, now)];
        let insights = performance_insights(&results, now).unwrap();
        assert_eq!(insights.consistency, 100);
    }

    #[test]
    fn wider_spread_lowers_consistency() {
        let now = Utc::now();
        let narrow = vec![quiz(78.0, 0, now), quiz(80.0, 1, now), quiz(82.0, 2, now)];
        let wide = vec![quiz(40.0, 0, now), quiz(80.0, 1, now), quiz(120.0, 2, now)];
        let narrow_score = performance_insights(&narrow, now).unwrap().consistency;
        let wide_score = performance_insights(&wide, now).unwrap().consistency;
        assert!(narrow_score > wide_score);
    }

    #[test]
    fn trend_labels_follow_the_five_point_threshold() {
        let now = Utc::now();
        // Recent five at 90, previous five at 70: improving.
        let mut results: Vec<QuizResult> = (0..5).map(|i| quiz(90.0, i, now)).collect();
        results.extend((5..10).map(|i| quiz(70.0, i, now)));
        let improvement = improvement_trend(&results);
        assert_eq!(improvement.trend, "improving");
        assert_eq!(improvement.value, 20);
        assert_eq!(improvement.recent_average, 90);
        assert_eq!(improvement.previous_average, 70);

        // Exactly five points of movement stays stable.
        let mut results: Vec<QuizResult> = (0..5).map(|i| quiz(75.0, i, now)).collect();
        results.extend((5..10).map(|i| quiz(70.0, i, now)));
        assert_eq!(improvement_trend(&results).trend, "stable");
    }

    #[test]
    fn trend_with_no_previous_window_compares_against_zero() {
        let now = Utc::now();
        let results = vec![quiz(80.0, 0, now)];
        let improvement = improvement_trend(&results);
        assert_eq!(improvement.previous_average, 0);
        assert_eq!(improvement.trend, "improving");
    }

    #[test]
    fn difficulty_defaults_to_medium() {
        let now = Utc::now();
        let results = vec![
            quiz_in(80.0, 0, now, "Algebra", ""),
            quiz_in(60.0, 1, now, "Algebra", "hard"),
        ];
        let insights = performance_insights(&results, now).unwrap();
        assert_eq!(insights.difficulty_stats["medium"].total, 1);
        assert_eq!(insights.difficulty_stats["hard"].average, 60);
    }

    #[test]
    fn only_empty_strings_fall_back_to_the_default_buckets() {
        let now = Utc::now();
        let results = vec![
            quiz_in(80.0, 0, now, " ", " "),
            quiz_in(60.0, 1, now, "", ""),
        ];
        let insights = performance_insights(&results, now).unwrap();
        assert_eq!(insights.difficulty_stats[" "].total, 1);
        assert_eq!(insights.difficulty_stats["medium"].total, 1);

        let stats = subject_breakdown(&results);
        let subjects: Vec<&str> = stats.iter().map(|s| s.subject.as_str()).collect();
        assert!(subjects.contains(&" "));
        assert!(subjects.contains(&"Unknown"));
    }

    #[test]
    fn subject_breakdown_sorts_by_descending_average() {
        let now = Utc::now();
        let results = vec![
            quiz_in(50.0, 0, now, "History", "medium"),
            quiz_in(90.0, 1, now, "Algebra", "medium"),
            quiz_in(70.0, 2, now, "History", "medium"),
            quiz_in(85.0, 3, now, "", "medium"),
        ];
        let stats = subject_breakdown(&results);
        assert_eq!(stats[0].subject, "Algebra");
        assert_eq!(stats[1].subject, "Unknown");
        assert_eq!(stats[2].subject, "History");
        assert_eq!(stats[2].average_score, 60);
        assert_eq!(stats[2].best_score, 70.0);
        assert_eq!(stats[2].worst_score, 50.0);
        assert_eq!(stats[2].trend, vec![50.0, 70.0]);
    }

    #[test]
    fn performance_view_is_none_for_empty_history() {
        assert!(performance_view(&[], Utc::now()).is_none());
    }

    #[test]
    fn performance_view_totals_and_recent_slice() {
        let now = Utc::now();
        let results: Vec<QuizResult> = (0..7).map(|i| quiz(80.0, i, now)).collect();
        let view = performance_view(&results, now).unwrap();
        assert!(view.has_data);
        assert_eq!(view.total_quizzes, 7);
        assert_eq!(view.recent_results.len(), 5);
        assert_eq!(view.time_spent_total, 840.0);
        assert_eq!(view.consistency, view.performance_insights.consistency);
    }

    #[test]
    fn summary_view_of_empty_history_is_zeroed() {
        let view = summary_view(&[], &[], Utc::now());
        assert_eq!(view.stats.total_quizzes, 0);
        assert_eq!(view.stats.average_score, 0);
        assert_eq!(view.stats.best_score, 0.0);
        assert_eq!(view.stats.current_streak, 0);
        assert_eq!(view.stats.overall_rating.rating, "Needs Improvement");
        assert!(view.recent_results.is_empty());
    }
}
