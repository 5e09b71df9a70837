use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::NoScoredWeeks;
use crate::models::{Cohort, Student};
use crate::scoring::{self, ClassAverages, StudentStats};
use crate::weeks::{WeekInterval, WeekLabel};

const FMT_DATE: &str = "%Y-%m-%d (%a)";

#[derive(Debug, Clone, Serialize)]
pub struct WeekRow {
    pub name: String,
    pub xp: i64,
    pub capped_xp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekSummary {
    pub label: String,
    pub bonus: bool,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: Vec<WeekRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentRow {
    pub name: String,
    #[serde(flatten)]
    pub stats: StudentStats,
}

/// The whole term, already computed; renderers below and any external
/// consumer (the JSON dump) read it as-is.
#[derive(Debug, Clone, Serialize)]
pub struct TermReport {
    pub goal: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub scored_weeks: usize,
    pub weeks: Vec<WeekSummary>,
    pub students: Vec<StudentRow>,
    pub averages: Option<ClassAverages>,
}

/// One week's totals per student, name-sorted, XP capped at the goal.
pub fn week_summary(cohort: &Cohort, week: WeekInterval, label: WeekLabel) -> WeekSummary {
    let rows = cohort
        .students
        .values()
        .map(|student| {
            let xp = scoring::xp_between(student, week.start, week.end);
            WeekRow {
                name: student.name.clone(),
                xp,
                capped_xp: xp.min(cohort.goal),
            }
        })
        .collect();

    WeekSummary {
        label: label.text(),
        bonus: label.is_bonus(),
        start: week.start,
        end: week.end,
        rows,
    }
}

/// Assemble the term report: weekly summaries in chronological order plus
/// per-student stats and class averages. Fails when no week is scored.
pub fn term_report(
    cohort: &Cohort,
    labeled: &[(WeekInterval, WeekLabel)],
) -> Result<TermReport, NoScoredWeeks> {
    let scored_weeks = labeled.iter().filter(|(_, label)| !label.is_bonus()).count();
    if scored_weeks == 0 {
        return Err(NoScoredWeeks);
    }

    let weeks: Vec<WeekSummary> = labeled
        .iter()
        .map(|&(week, label)| week_summary(cohort, week, label))
        .collect();

    let mut students = Vec::with_capacity(cohort.students.len());
    for student in cohort.students.values() {
        let weekly: Vec<i64> = labeled
            .iter()
            .map(|(week, _)| scoring::xp_between(student, week.start, week.end))
            .collect();
        let stats = scoring::student_stats(&weekly, scored_weeks, cohort.goal)?;
        students.push(StudentRow {
            name: student.name.clone(),
            stats,
        });
    }

    let averages = class_averages(&students);

    Ok(TermReport {
        goal: cohort.goal,
        start: labeled[0].0.start,
        end: labeled[labeled.len() - 1].0.end,
        scored_weeks,
        weeks,
        students,
        averages,
    })
}

fn class_averages(students: &[StudentRow]) -> Option<ClassAverages> {
    let stats: Vec<StudentStats> = students.iter().map(|row| row.stats.clone()).collect();
    scoring::class_averages(&stats)
}

/// Console layout for one week, newest shown first by the caller.
pub fn render_week(summary: &WeekSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} to {}",
        summary.label,
        summary.start.format(FMT_DATE),
        summary.end.format(FMT_DATE)
    );
    for row in &summary.rows {
        let _ = writeln!(
            out,
            "{:<20} : {:<4} : {:<3}",
            title_case(&row.name),
            row.xp,
            row.capped_xp
        );
    }
    out
}

/// Per-week breakdown for one student, most recent week first, with the
/// individual practice events under each week.
pub fn render_student_detail(
    student: &Student,
    labeled: &[(WeekInterval, WeekLabel)],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title_case(&student.name));

    for &(week, label) in labeled.iter().rev() {
        let header = if label.is_bonus() {
            "Bonus week".to_string()
        } else {
            format!("Week {}", label.text())
        };
        let xp = scoring::xp_between(student, week.start, week.end);
        let _ = writeln!(
            out,
            "\n{} ({} to {}) : {:>4} XP",
            header,
            week.start.format(FMT_DATE),
            week.end.format(FMT_DATE),
            xp
        );

        let mut practices =
            student.practices_between(scoring::day_start(week.start), scoring::day_end(week.end));
        practices.reverse();
        for practice in practices {
            let _ = writeln!(
                out,
                "\t{} : {} ({})",
                practice.at.format("%a, %Y-%m-%d %H:%M"),
                practice.xp,
                practice.desc
            );
        }
    }
    out
}

/// Markdown rendering of the persisted term report.
pub fn render_term_markdown(report: &TermReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Term Progress Report");
    let _ = writeln!(
        out,
        "Goal {} XP per week, {} scored weeks from {} to {}",
        report.goal, report.scored_weeks, report.start, report.end
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "## Weeks");
    for week in &report.weeks {
        let kind = if week.bonus { "Bonus week" } else { "Week" };
        let _ = writeln!(
            out,
            "- {} {} ({} to {})",
            kind,
            week.label.trim(),
            week.start,
            week.end
        );
        for row in &week.rows {
            let _ = writeln!(
                out,
                "  - {}: {} XP (capped {})",
                title_case(&row.name),
                row.xp,
                row.capped_xp
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Students");
    if report.students.is_empty() {
        let _ = writeln!(out, "No students on the roster.");
    }
    for row in &report.students {
        let _ = writeln!(
            out,
            "- {}: XP mark {}, consistency mark {}",
            title_case(&row.name),
            row.stats.xp_mark,
            row.stats.consistency_mark
        );
        let _ = writeln!(out, "  - {}", row.stats.xp_note);
        let _ = writeln!(out, "  - {}", row.stats.consistency_note);
    }

    if let Some(avg) = &report.averages {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Class Averages");
        let _ = writeln!(out, "- total XP {}", avg.total_xp);
        let _ = writeln!(out, "- weekly XP {}", avg.weekly_xp);
        let _ = writeln!(out, "- full weeks {}", avg.full_weeks);
        let _ = writeln!(out, "- half weeks {}", avg.half_weeks);
        let _ = writeln!(out, "- XP mark {}", avg.xp_mark);
        let _ = writeln!(out, "- consistency mark {}", avg.consistency_mark);
    }

    out
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
