use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// One practice event for one student. Identity is (desc, xp, timestamp
/// rounded down to the minute) within the owning student's set, so
/// re-ingesting the same export never double-counts.
#[derive(Debug, Clone)]
pub struct Practice {
    pub desc: String,
    pub xp: i64,
    pub at: NaiveDateTime,
}

impl Practice {
    pub fn new(desc: impl Into<String>, xp: i64, at: NaiveDateTime) -> Self {
        Self {
            desc: desc.into(),
            xp,
            at,
        }
    }

    fn minute_key(&self) -> NaiveDateTime {
        self.at
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(self.at)
    }

    pub fn is_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start <= self.at && self.at <= end
    }
}

impl PartialEq for Practice {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc
            && self.xp == other.xp
            && self.minute_key() == other.minute_key()
    }
}

impl Eq for Practice {}

impl Hash for Practice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.desc.hash(state);
        self.xp.hash(state);
        self.minute_key().hash(state);
    }
}

/// A student keyed by canonical lowercase name, owning every practice event
/// resolved to them.
#[derive(Debug, Clone)]
pub struct Student {
    pub name: String,
    pub practices: HashSet<Practice>,
}

impl Student {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            practices: HashSet::new(),
        }
    }

    /// Returns false when the event was already present.
    pub fn add_practice(&mut self, practice: Practice) -> bool {
        self.practices.insert(practice)
    }

    pub fn practices_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<&Practice> {
        let mut found: Vec<&Practice> = self
            .practices
            .iter()
            .filter(|p| p.is_between(start, end))
            .collect();
        found.sort_by_key(|p| p.at);
        found
    }
}

/// Outcome of resolving a raw source alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Known(String),
    Excluded,
}

/// Alias lookup table. Aliases fold to lowercase; several aliases may point
/// at one canonical name (duplicate accounts), and aliases configured with
/// the skip sentinel live in the exclusion set instead.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    aliases: HashMap<String, String>,
    excluded: HashSet<String>,
}

impl Roster {
    pub fn register(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(alias.to_lowercase(), canonical.to_lowercase());
    }

    pub fn exclude(&mut self, alias: &str) {
        self.excluded.insert(alias.to_lowercase());
    }

    pub fn resolve(&self, alias: &str) -> Option<Resolution> {
        let folded = alias.to_lowercase();
        if self.excluded.contains(&folded) {
            return Some(Resolution::Excluded);
        }
        self.aliases
            .get(&folded)
            .map(|canonical| Resolution::Known(canonical.clone()))
    }
}

/// The long-lived aggregate for one run: goal and bonus markers from the
/// configuration, the roster, the students, and every observed activity date.
#[derive(Debug, Clone, Default)]
pub struct Cohort {
    pub goal: i64,
    pub bonus_week_ends: BTreeSet<NaiveDate>,
    pub roster: Roster,
    pub students: BTreeMap<String, Student>,
    pub dates: BTreeSet<NaiveDate>,
}

impl Cohort {
    pub fn add_student(&mut self, canonical: &str) {
        let key = canonical.to_lowercase();
        self.students
            .entry(key.clone())
            .or_insert_with(|| Student::new(key));
    }

    pub fn observe_date(&mut self, date: NaiveDate) {
        self.dates.insert(date);
    }

    /// Attach a practice to an already-rostered student. Returns false on a
    /// duplicate event.
    pub fn record(&mut self, canonical: &str, practice: Practice) -> bool {
        match self.students.get_mut(canonical) {
            Some(student) => student.add_practice(practice),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn practices_dedupe_at_minute_resolution() {
        let mut student = Student::new("mika");
        let a = Practice::new("practiced", 20, dt(2024, 1, 3, 10, 30, 15));
        let b = Practice::new("practiced", 20, dt(2024, 1, 3, 10, 30, 45));
        assert!(student.add_practice(a));
        assert!(!student.add_practice(b));
        assert_eq!(student.practices.len(), 1);
    }

    #[test]
    fn distinct_xp_or_minute_are_distinct_events() {
        let mut student = Student::new("mika");
        assert!(student.add_practice(Practice::new("practiced", 20, dt(2024, 1, 3, 10, 30, 0))));
        assert!(student.add_practice(Practice::new("practiced", 30, dt(2024, 1, 3, 10, 30, 0))));
        assert!(student.add_practice(Practice::new("practiced", 20, dt(2024, 1, 3, 10, 31, 0))));
        assert_eq!(student.practices.len(), 3);
    }

    #[test]
    fn practices_between_is_inclusive_and_sorted() {
        let mut student = Student::new("mika");
        student.add_practice(Practice::new("a", 10, dt(2024, 1, 5, 23, 59, 0)));
        student.add_practice(Practice::new("b", 20, dt(2024, 1, 3, 0, 0, 0)));
        student.add_practice(Practice::new("c", 30, dt(2024, 1, 8, 0, 0, 0)));

        let found = student.practices_between(dt(2024, 1, 3, 0, 0, 0), dt(2024, 1, 5, 23, 59, 59));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].desc, "b");
        assert_eq!(found[1].desc, "a");
    }

    #[test]
    fn roster_resolution_folds_case_and_honors_exclusions() {
        let mut roster = Roster::default();
        roster.register("Mika_42", "mika");
        roster.exclude("Test-Account");

        assert_eq!(
            roster.resolve("MIKA_42"),
            Some(Resolution::Known("mika".to_string()))
        );
        assert_eq!(roster.resolve("test-account"), Some(Resolution::Excluded));
        assert_eq!(roster.resolve("stranger"), None);
    }

    #[test]
    fn recording_against_unrostered_name_is_a_no_op() {
        let mut cohort = Cohort::default();
        assert!(!cohort.record("ghost", Practice::new("x", 5, dt(2024, 1, 1, 0, 0, 0))));
    }
}
