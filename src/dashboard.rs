// src/dashboard.rs - Dashboard view composition
//
// Pure derivation over the five per-user collections. The handler fetches the
// collections concurrently, calls `compose_dashboard` and caches the result;
// nothing in here touches storage or the cache.
use crate::models::{BudgetEntry, ClassEntry, PlannerTask, StudySession, WellnessEntry};
use chrono::{DateTime, Datelike, Duration, Local, Timelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Maps a weekday name to 0=Sunday..6=Saturday. Accepts full names or
/// 3-letter abbreviations, case-insensitive; longer strings match on their
/// first three letters ("Thursdays" still resolves).
pub fn day_name_to_index(value: &str) -> Option<u32> {
    fn lookup(key: &str) -> Option<u32> {
        match key {
            "sun" | "sunday" => Some(0),
            "mon" | "monday" => Some(1),
            "tue" | "tuesday" => Some(2),
            "wed" | "wednesday" => Some(3),
            "thu" | "thursday" => Some(4),
            "fri" | "friday" => Some(5),
            "sat" | "saturday" => Some(6),
            _ => None,
        }
    }

    let s = value.trim().to_lowercase();
    lookup(&s).or_else(|| s.get(..3).and_then(lookup))
}

/// Parses `H:MM`, `H:MM am/pm` or bare 24-hour `HH:MM` into minutes since
/// midnight. 12-hour times convert the usual way (12am -> 0, 12pm -> 12).
/// Anything else is unparseable and yields `None`.
pub fn parse_time_to_minutes(time: &str) -> Option<u32> {
    let s = time.trim().to_lowercase();
    let (clock, meridiem) = if let Some(rest) = s.strip_suffix("am") {
        (rest.trim_end(), Some("am"))
    } else if let Some(rest) = s.strip_suffix("pm") {
        (rest.trim_end(), Some("pm"))
    } else {
        (s.as_str(), None)
    };

    let (hh, mm) = clock.split_once(':')?;
    if hh.is_empty() || hh.len() > 2 || mm.len() != 2 {
        return None;
    }
    if !hh.bytes().all(|b| b.is_ascii_digit()) || !mm.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut hour: u32 = hh.parse().ok()?;
    let minute: u32 = mm.parse().ok()?;
    match meridiem {
        Some("pm") if hour != 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }
    Some(hour * 60 + minute)
}

/// Whether a class occurs on the given weekday. A stored numeric index wins
/// when it is in range; otherwise the day-name string decides; a class with
/// neither is never "today".
fn occurs_on(class: &ClassEntry, weekday: u32) -> bool {
    if let Some(index) = class.day_index {
        if (0..=6).contains(&index) {
            return index as u32 == weekday;
        }
    }
    if !class.day.is_empty() {
        return day_name_to_index(&class.day) == Some(weekday);
    }
    false
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub total: usize,
    pub today_classes: Vec<ClassEntry>,
    pub next_class: Option<ClassEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub recent_transactions: Vec<BudgetEntry>,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerSummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub high_priority_tasks: usize,
    pub overdue_tasks: usize,
    pub upcoming_tasks: Vec<PlannerTask>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessSummary {
    pub total_entries: usize,
    pub average_mood: f64,
    pub sleep_hours: f64,
    pub study_hours: f64,
    pub last_entry: Option<WellnessEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyData {
    pub study_sessions: Vec<StudySession>,
    /// Expense totals bucketed by ISO calendar date inside the window.
    pub expenses: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub total_classes: usize,
    pub balance: f64,
    pub pending_tasks: usize,
    pub study_hours_this_week: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub classes: ClassSummary,
    pub budget: BudgetSummary,
    pub expenses_by_category: HashMap<String, f64>,
    pub planner: PlannerSummary,
    pub wellness: WellnessSummary,
    pub weekly_data: WeeklyData,
    pub quick_stats: QuickStats,
    pub timestamp: DateTime<Utc>,
}

fn class_summary(classes: &[ClassEntry], now_local: DateTime<Local>) -> ClassSummary {
    let today_index = now_local.weekday().num_days_from_sunday();
    let now_minutes = now_local.hour() * 60 + now_local.minute();

    let today_classes: Vec<ClassEntry> = classes
        .iter()
        .filter(|class| occurs_on(class, today_index))
        .cloned()
        .collect();

    let next_class = today_classes
        .iter()
        .filter_map(|class| {
            parse_time_to_minutes(&class.start_time)
                .filter(|start| *start > now_minutes)
                .map(|start| (start, class))
        })
        .min_by_key(|(start, _)| *start)
        .map(|(_, class)| class.clone());

    ClassSummary {
        total: classes.len(),
        today_classes,
        next_class,
    }
}

fn budget_summary(entries: &[BudgetEntry]) -> (BudgetSummary, HashMap<String, f64>) {
    let total_income: f64 = entries
        .iter()
        .filter(|e| e.entry_type == "income")
        .map(|e| e.amount)
        .sum();
    let total_expenses: f64 = entries
        .iter()
        .filter(|e| e.entry_type == "expense")
        .map(|e| e.amount)
        .sum();

    let mut by_category: HashMap<String, f64> = HashMap::new();
    for entry in entries.iter().filter(|e| e.entry_type == "expense") {
        let category = if entry.category.is_empty() {
            "Uncategorized"
        } else {
            entry.category.as_str()
        };
        *by_category.entry(category.to_string()).or_default() += entry.amount;
    }

    let summary = BudgetSummary {
        total_income,
        total_expenses,
        recent_transactions: entries.iter().take(5).cloned().collect(),
        balance: total_income - total_expenses,
    };
    (summary, by_category)
}

fn planner_summary(tasks: &[PlannerTask], now: DateTime<Utc>) -> PlannerSummary {
    let completed = tasks.iter().filter(|t| t.status == "completed").count();
    let pending = tasks.len() - completed;
    let high_priority = tasks
        .iter()
        .filter(|t| t.priority == "high" && t.status != "completed")
        .count();
    let overdue = tasks
        .iter()
        .filter(|t| {
            t.status != "completed"
                && t.due_date.map(|due| due < now).unwrap_or(false)
        })
        .count();

    // Missing due dates sort as the epoch, i.e. ahead of everything. That
    // ordering is load-bearing for existing clients; do not "fix" it here.
    let mut upcoming: Vec<PlannerTask> = tasks
        .iter()
        .filter(|t| t.status != "completed")
        .cloned()
        .collect();
    upcoming.sort_by_key(|t| t.due_date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH));
    upcoming.truncate(5);

    PlannerSummary {
        total_tasks: tasks.len(),
        completed_tasks: completed,
        pending_tasks: pending,
        high_priority_tasks: high_priority,
        overdue_tasks: overdue,
        upcoming_tasks: upcoming,
    }
}

fn wellness_summary(entries: &[WellnessEntry]) -> WellnessSummary {
    let count = entries.len();
    let mean = |f: fn(&WellnessEntry) -> f64| -> f64 {
        if count == 0 {
            0.0
        } else {
            entries.iter().map(f).sum::<f64>() / count as f64
        }
    };

    WellnessSummary {
        total_entries: count,
        average_mood: mean(|e| e.mood),
        sleep_hours: mean(|e| e.sleep_hours),
        study_hours: mean(|e| e.study_hours),
        last_entry: entries.first().cloned(),
    }
}

/// Composes the dashboard from one user's collections as fetched (classes
/// ordered by day then start time, the others newest-first, wellness capped
/// at 7 entries). `now` anchors "today", the clock and the trailing week.
pub fn compose_dashboard(
    classes: &[ClassEntry],
    budget_entries: &[BudgetEntry],
    tasks: &[PlannerTask],
    wellness: &[WellnessEntry],
    sessions: &[StudySession],
    now: DateTime<Utc>,
) -> DashboardSummary {
    let now_local = now.with_timezone(&Local);
    let one_week_ago = now - Duration::days(7);

    let classes_summary = class_summary(classes, now_local);
    let (budget, expenses_by_category) = budget_summary(budget_entries);
    let planner = planner_summary(tasks, now);
    let wellness_data = wellness_summary(wellness);

    let weekly_sessions: Vec<StudySession> = sessions
        .iter()
        .filter(|s| s.date >= one_week_ago)
        .cloned()
        .collect();
    let weekly_study_minutes: f64 = weekly_sessions.iter().map(|s| s.duration).sum();

    let mut weekly_expenses: BTreeMap<String, f64> = BTreeMap::new();
    for entry in budget_entries
        .iter()
        .filter(|e| e.entry_type == "expense" && e.date >= one_week_ago)
    {
        *weekly_expenses
            .entry(entry.date.date_naive().to_string())
            .or_default() += entry.amount;
    }

    let quick_stats = QuickStats {
        total_classes: classes_summary.total,
        balance: budget.balance,
        pending_tasks: planner.pending_tasks,
        study_hours_this_week: weekly_study_minutes,
    };

    DashboardSummary {
        classes: classes_summary,
        budget,
        expenses_by_category,
        planner,
        wellness: wellness_data,
        weekly_data: WeeklyData {
            study_sessions: weekly_sessions,
            expenses: weekly_expenses,
        },
        quick_stats,
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn class(subject: &str, day: &str, day_index: Option<i32>, start_time: &str) -> ClassEntry {
        ClassEntry {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            subject: subject.to_string(),
            instructor: String::new(),
            day: day.to_string(),
            day_index,
            start_time: start_time.to_string(),
            end_time: String::new(),
            color: "#45b7d1".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn budget_entry(entry_type: &str, amount: f64, category: &str, days_ago: i64) -> BudgetEntry {
        BudgetEntry {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            entry_type: entry_type.to_string(),
            amount,
            category: category.to_string(),
            description: String::new(),
            date: Utc::now() - Duration::days(days_ago),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn task(title: &str, status: &str, priority: &str, due: Option<DateTime<Utc>>) -> PlannerTask {
        PlannerTask {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            title: title.to_string(),
            description: String::new(),
            due_date: due,
            status: status.to_string(),
            priority: priority.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn session(duration: f64, days_ago: i64) -> StudySession {
        StudySession {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            subject: "Math".to_string(),
            duration,
            topic: String::new(),
            efficiency: 0.0,
            date: Utc::now() - Duration::days(days_ago),
            created_at: Utc::now(),
        }
    }

    fn wellness_entry(mood: f64, sleep: f64, study: f64) -> WellnessEntry {
        WellnessEntry {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            mood,
            sleep_hours: sleep,
            study_hours: study,
            notes: String::new(),
            date: Utc::now(),
            created_at: Utc::now(),
        }
    }

    /// A local wall-clock instant whose weekday we control: 2026-08-26 is a
    /// Wednesday in every timezone offset that chrono's Local can produce,
    /// because we build it from local components.
    fn wednesday_at(hour: u32, minute: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2026, 8, 26, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn day_names_resolve_full_and_abbreviated() {
        assert_eq!(day_name_to_index("Sunday"), Some(0));
        assert_eq!(day_name_to_index("wed"), Some(3));
        assert_eq!(day_name_to_index(" THURSDAY "), Some(4));
        assert_eq!(day_name_to_index("Thursdays"), Some(4));
        assert_eq!(day_name_to_index("noday"), None);
        assert_eq!(day_name_to_index("tu"), None);
        assert_eq!(day_name_to_index(""), None);
    }

    #[test]
    fn time_parsing_covers_both_clock_styles() {
        assert_eq!(parse_time_to_minutes("09:00"), Some(540));
        assert_eq!(parse_time_to_minutes("9:05"), Some(545));
        assert_eq!(parse_time_to_minutes("8:00am"), Some(480));
        assert_eq!(parse_time_to_minutes("8:00 pm"), Some(1200));
        assert_eq!(parse_time_to_minutes("12:00am"), Some(0));
        assert_eq!(parse_time_to_minutes("12:30 PM"), Some(750));
        assert_eq!(parse_time_to_minutes("14:30"), Some(870));
        assert_eq!(parse_time_to_minutes("nope"), None);
        assert_eq!(parse_time_to_minutes("9:5"), None);
        assert_eq!(parse_time_to_minutes(""), None);
    }

    #[test]
    fn numeric_day_index_wins_over_the_name() {
        let now = wednesday_at(10, 0);
        // Index says Wednesday even though the name says Friday.
        let classes = vec![class("Physics", "Friday", Some(3), "11:00")];
        let summary = compose_dashboard(&classes, &[], &[], &[], &[], now);
        assert_eq!(summary.classes.today_classes.len(), 1);
    }

    #[test]
    fn name_fallback_applies_when_index_is_invalid_or_missing() {
        let now = wednesday_at(10, 0);
        let classes = vec![
            class("Chemistry", "Wednesday", None, "13:00"),
            class("Biology", "Wednesday", Some(9), "15:00"),
            class("History", "", None, "16:00"),
        ];
        let summary = compose_dashboard(&classes, &[], &[], &[], &[], now);
        let subjects: Vec<&str> = summary
            .classes
            .today_classes
            .iter()
            .map(|c| c.subject.as_str())
            .collect();
        assert_eq!(subjects, vec!["Chemistry", "Biology"]);
    }

    #[test]
    fn next_class_is_the_soonest_future_start() {
        let now = wednesday_at(10, 0);
        let classes = vec![
            class("A", "Wednesday", Some(3), "09:00"),
            class("B", "Wednesday", Some(3), "14:30"),
            class("C", "Wednesday", Some(3), "8:00am"),
        ];
        let summary = compose_dashboard(&classes, &[], &[], &[], &[], now);
        assert_eq!(
            summary.classes.next_class.as_ref().map(|c| c.start_time.as_str()),
            Some("14:30")
        );
    }

    #[test]
    fn no_next_class_when_everything_started_already() {
        let now = wednesday_at(22, 0);
        let classes = vec![class("A", "Wednesday", Some(3), "09:00")];
        let summary = compose_dashboard(&classes, &[], &[], &[], &[], now);
        assert!(summary.classes.next_class.is_none());
    }

    #[test]
    fn budget_balance_and_category_buckets() {
        let entries = vec![
            budget_entry("income", 500.0, "Salary", 0),
            budget_entry("expense", 200.0, "Food", 0),
            budget_entry("expense", 50.0, "", 0),
        ];
        let summary = compose_dashboard(&[], &entries, &[], &[], &[], Utc::now());
        assert_eq!(summary.budget.total_income, 500.0);
        assert_eq!(summary.budget.total_expenses, 250.0);
        assert_eq!(summary.budget.balance, 250.0);
        assert_eq!(summary.expenses_by_category["Food"], 200.0);
        assert_eq!(summary.expenses_by_category["Uncategorized"], 50.0);
        assert_eq!(summary.quick_stats.balance, 250.0);
    }

    #[test]
    fn planner_counts_and_upcoming_ordering() {
        let now = Utc::now();
        let tasks = vec![
            task("done", "completed", "high", Some(now - Duration::days(1))),
            task("late", "pending", "high", Some(now - Duration::days(2))),
            task("soon", "pending", "low", Some(now + Duration::days(1))),
            task("dateless", "pending", "medium", None),
        ];
        let summary = compose_dashboard(&[], &[], &tasks, &[], &[], now);
        assert_eq!(summary.planner.total_tasks, 4);
        assert_eq!(summary.planner.completed_tasks, 1);
        assert_eq!(summary.planner.pending_tasks, 3);
        assert_eq!(summary.planner.high_priority_tasks, 1);
        assert_eq!(summary.planner.overdue_tasks, 1);
        // The missing due date sorts first (epoch), then by due date.
        let titles: Vec<&str> = summary
            .planner
            .upcoming_tasks
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["dateless", "late", "soon"]);
    }

    #[test]
    fn wellness_averages_are_zero_for_an_empty_window() {
        let summary = compose_dashboard(&[], &[], &[], &[], &[], Utc::now());
        assert_eq!(summary.wellness.total_entries, 0);
        assert_eq!(summary.wellness.average_mood, 0.0);
        assert_eq!(summary.wellness.sleep_hours, 0.0);
        assert!(summary.wellness.last_entry.is_none());
    }

    #[test]
    fn wellness_means_over_the_fetched_window() {
        let entries = vec![
            wellness_entry(4.0, 8.0, 2.0),
            wellness_entry(2.0, 6.0, 4.0),
        ];
        let summary = compose_dashboard(&[], &[], &[], &entries, &[], Utc::now());
        assert_eq!(summary.wellness.average_mood, 3.0);
        assert_eq!(summary.wellness.sleep_hours, 7.0);
        assert_eq!(summary.wellness.study_hours, 3.0);
        assert_eq!(summary.wellness.last_entry.as_ref().unwrap().mood, 4.0);
    }

    #[test]
    fn weekly_window_keeps_only_the_trailing_seven_days() {
        let now = Utc::now();
        let sessions = vec![session(60.0, 1), session(30.0, 3), session(90.0, 10)];
        let entries = vec![
            budget_entry("expense", 20.0, "Food", 2),
            budget_entry("expense", 15.0, "Food", 9),
        ];
        let summary = compose_dashboard(&[], &entries, &[], &[], &sessions, now);
        assert_eq!(summary.weekly_data.study_sessions.len(), 2);
        assert_eq!(summary.quick_stats.study_hours_this_week, 90.0);
        assert_eq!(summary.weekly_data.expenses.len(), 1);
        assert_eq!(summary.weekly_data.expenses.values().sum::<f64>(), 20.0);
    }

    #[test]
    fn recomputation_is_identical_except_for_the_timestamp() {
        let now = wednesday_at(9, 30);
        let classes = vec![class("A", "Wednesday", Some(3), "10:00")];
        let entries = vec![budget_entry("income", 100.0, "Salary", 0)];
        let first = compose_dashboard(&classes, &entries, &[], &[], &[], now);
        let second = compose_dashboard(&classes, &entries, &[], &[], &[], now);
        let a = serde_json::to_value(&first).unwrap();
        let b = serde_json::to_value(&second).unwrap();
        assert_eq!(a, b);
    }
}
