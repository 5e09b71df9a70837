use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::NoScoredWeeks;
use crate::models::Student;

/// The mark caps: meeting the cumulative goal is worth 100, overflow and
/// bonus achievement can push either mark to at most 120.
const MARK_CAP: f64 = 1.2;

/// Sum of a student's XP over `[start 00:00, end 23:59:59]`, both boundary
/// dates inclusive.
pub fn xp_between(student: &Student, start: NaiveDate, end: NaiveDate) -> i64 {
    student
        .practices_between(day_start(start), day_end(end))
        .iter()
        .map(|p| p.xp)
        .sum()
}

pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn day_end(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59).unwrap_or_else(|| day_start(date))
}

/// Everything the term report shows for one student.
#[derive(Debug, Clone, Serialize)]
pub struct StudentStats {
    pub total_xp: i64,
    pub weekly_xp: i64,
    pub full_weeks: usize,
    pub half_weeks: usize,
    pub xp_goal: i64,
    pub xp_mark: i64,
    pub consistency_mark: i64,
    pub xp_note: String,
    pub consistency_note: String,
}

/// Compute one student's marks. `weekly_xp` carries one total per displayed
/// week, bonus weeks included; `scored_weeks` counts the non-bonus weeks
/// only. Full/half weeks are counted over all supplied totals while every
/// denominator uses the scored count, so XP earned in bonus weeks can lift
/// the counts past `scored_weeks`; that surfaces as the extra-weeks note.
pub fn student_stats(
    weekly_xp: &[i64],
    scored_weeks: usize,
    goal: i64,
) -> Result<StudentStats, NoScoredWeeks> {
    if scored_weeks == 0 {
        return Err(NoScoredWeeks);
    }

    let total_xp: i64 = weekly_xp.iter().sum();
    let weeks = scored_weeks as f64;
    let weekly = (total_xp as f64 / weeks).round() as i64;

    let full_weeks = weekly_xp.iter().filter(|&&xp| xp >= goal).count();
    let half_threshold = goal as f64 / 2.0;
    let at_least_half = weekly_xp
        .iter()
        .filter(|&&xp| xp as f64 >= half_threshold)
        .count();
    let half_weeks = at_least_half - full_weeks;

    let xp_goal = goal * scored_weeks as i64;
    let base = (total_xp as f64 / xp_goal as f64).min(1.0);
    let overflow = (total_xp - xp_goal).max(0) as f64 / goal as f64;
    let xp_mark = (100.0 * (base + overflow).min(MARK_CAP)).round() as i64;

    let consistency = full_weeks as f64 / weeks + (half_weeks as f64 / weeks) / 2.0;
    let consistency_mark = (100.0 * consistency.min(MARK_CAP)).round() as i64;

    let xp_note = format!(
        "earned {total_xp} XP of a {xp_goal} XP target ({weekly} per week on average, goal {goal})"
    );
    let mut consistency_note = format!(
        "{full_weeks} full-goal and {half_weeks} half-goal weeks of {scored_weeks} required"
    );
    if full_weeks + half_weeks > scored_weeks {
        consistency_note.push_str(", including extra earned during non-required weeks");
    }

    Ok(StudentStats {
        total_xp,
        weekly_xp: weekly,
        full_weeks,
        half_weeks,
        xp_goal,
        xp_mark,
        consistency_mark,
        xp_note,
        consistency_note,
    })
}

/// Class-wide means, one equal-weight share per student, rounded.
#[derive(Debug, Clone, Serialize)]
pub struct ClassAverages {
    pub total_xp: i64,
    pub weekly_xp: i64,
    pub full_weeks: i64,
    pub half_weeks: i64,
    pub xp_mark: i64,
    pub consistency_mark: i64,
}

pub fn class_averages(stats: &[StudentStats]) -> Option<ClassAverages> {
    if stats.is_empty() {
        return None;
    }
    let n = stats.len() as f64;
    let mean = |f: &dyn Fn(&StudentStats) -> f64| (stats.iter().map(f).sum::<f64>() / n).round() as i64;

    Some(ClassAverages {
        total_xp: mean(&|s| s.total_xp as f64),
        weekly_xp: mean(&|s| s.weekly_xp as f64),
        full_weeks: mean(&|s| s.full_weeks as f64),
        half_weeks: mean(&|s| s.half_weeks as f64),
        xp_mark: mean(&|s| s.xp_mark as f64),
        consistency_mark: mean(&|s| s.consistency_mark as f64),
    })
}
