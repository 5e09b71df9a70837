use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;

use crate::error::ConfigError;
use crate::models::Cohort;

const COMMENT_MARKER: char = ';';
const SKIP_SENTINEL: &str = "-";

/// Read and parse the configuration file into a fresh cohort.
pub fn load(path: &Path) -> anyhow::Result<Cohort> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    let cohort = parse(&text)?;
    Ok(cohort)
}

/// Parse line-oriented configuration text:
///
/// ```text
/// ; comment
/// goal :: 100
/// bonus week end :: 2024-03-10
/// alias :: mika_42 == mika
/// alias :: sara
/// alias :: test-account == -
/// ```
///
/// An empty canonical means the alias is its own canonical name; the `-`
/// sentinel excludes the alias from all ingestion. Any line outside this
/// grammar is fatal.
pub fn parse(text: &str) -> Result<Cohort, ConfigError> {
    let mut cohort = Cohort::default();
    let mut goal_seen = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }

        let (key, value) = line.split_once("::").ok_or_else(|| ConfigError::Malformed {
            line_no,
            line: line.to_string(),
        })?;
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "goal" => {
                let goal: i64 = value.parse().map_err(|_| ConfigError::InvalidGoal {
                    value: value.to_string(),
                })?;
                if goal <= 0 {
                    return Err(ConfigError::InvalidGoal {
                        value: value.to_string(),
                    });
                }
                cohort.goal = goal;
                goal_seen = true;
            }
            "bonus week end" => {
                let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
                    ConfigError::InvalidBonusDate {
                        value: value.to_string(),
                    }
                })?;
                cohort.bonus_week_ends.insert(date);
            }
            "alias" => add_alias(&mut cohort, value, line_no)?,
            _ => {
                return Err(ConfigError::Malformed {
                    line_no,
                    line: line.to_string(),
                })
            }
        }
    }

    if !goal_seen {
        return Err(ConfigError::MissingGoal);
    }

    Ok(cohort)
}

fn add_alias(cohort: &mut Cohort, value: &str, line_no: usize) -> Result<(), ConfigError> {
    let (alias, canonical) = match value.split_once("==") {
        Some((alias, canonical)) => (alias.trim(), canonical.trim()),
        None => (value, ""),
    };
    let alias = alias.to_lowercase();
    if alias.is_empty() {
        return Err(ConfigError::EmptyAlias { line_no });
    }

    let canonical = canonical.to_lowercase();
    if canonical == SKIP_SENTINEL {
        cohort.roster.exclude(&alias);
        return Ok(());
    }

    let canonical = if canonical.is_empty() {
        alias.clone()
    } else {
        canonical
    };
    cohort.add_student(&canonical);
    cohort.roster.register(&alias, &canonical);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resolution;
    use chrono::NaiveDate;

    #[test]
    fn parses_a_full_configuration() {
        let cohort = parse(
            "; term 2, spring\n\
             goal :: 100\n\
             bonus week end :: 2024-03-10\n\
             bonus week end :: 2024-04-07\n\
             alias :: mika_42 == mika\n\
             alias :: mika-alt == mika\n\
             alias :: sara\n\
             alias :: test-account == -\n",
        )
        .unwrap();

        assert_eq!(cohort.goal, 100);
        assert_eq!(cohort.bonus_week_ends.len(), 2);
        assert!(cohort
            .bonus_week_ends
            .contains(&NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()));

        // Two aliases merge onto one student; bare alias is its own canonical.
        assert_eq!(cohort.students.len(), 2);
        assert!(cohort.students.contains_key("mika"));
        assert!(cohort.students.contains_key("sara"));
        assert_eq!(
            cohort.roster.resolve("MIKA-ALT"),
            Some(Resolution::Known("mika".to_string()))
        );
    }

    #[test]
    fn excluded_alias_never_becomes_a_student() {
        let cohort = parse("goal :: 50\nalias :: dropout == -\n").unwrap();
        assert!(cohort.students.is_empty());
        assert_eq!(cohort.roster.resolve("dropout"), Some(Resolution::Excluded));
    }

    #[test]
    fn rejects_a_line_outside_the_grammar() {
        let err = parse("goal :: 50\nnot a config line\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line_no: 2, .. }));
    }

    #[test]
    fn rejects_an_unknown_key() {
        let err = parse("goal :: 50\ntarget :: 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn requires_a_goal() {
        let err = parse("alias :: sara\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingGoal));
    }

    #[test]
    fn rejects_a_non_positive_goal() {
        let err = parse("goal :: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGoal { .. }));
    }

    #[test]
    fn rejects_a_bad_bonus_date() {
        let err = parse("goal :: 50\nbonus week end :: 2024-13-40\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBonusDate { .. }));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let cohort = parse("\n; header\n\ngoal :: 10\n   ; indented comment\n").unwrap();
        assert_eq!(cohort.goal, 10);
    }
}
