use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::IngestError;
use crate::models::{Cohort, Practice, Resolution};

/// Column of the window export holding the total XP for the window.
const XP_COLUMN: usize = 10;

static RE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-_a-z(). ]+) (completed|practiced|tested)").unwrap());
static RE_XP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+(\d+) xp").unwrap());
static RE_DATE_24H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+) (\d+), (\d+) (\d+) h (\d+)").unwrap());
static RE_DATE_AMPM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z]+) (\d+), (\d+) (\d+):(\d+) (a\.m\.|p\.m\.)").unwrap());

const FMT_DATE_24H: &str = "%b %d, %Y %H h %M";
const FMT_DATE_AMPM: &str = "%b %d, %Y %I:%M %p";

/// Ingest every export in a directory. CSV files are window summaries,
/// txt files are activity logs; files whose stem starts with `_` and
/// anything else are skipped.
pub fn ingest_dir(cohort: &mut Cohort, dir: &Path) -> Result<(), IngestError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    paths.sort();

    for path in paths {
        let stem = path.file_stem().and_then(OsStr::to_str).unwrap_or("");
        if stem.starts_with('_') {
            continue;
        }
        match path.extension().and_then(OsStr::to_str) {
            Some("csv") => {
                ingest_window_export(cohort, &path)?;
            }
            Some("txt") => {
                ingest_activity_export(cohort, &path)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// One CSV row per student with the window's total XP. The filename stem
/// carries the inclusive window as `<start> <end>`; the window start at
/// midnight becomes the event timestamp.
pub fn ingest_window_export(cohort: &mut Cohort, path: &Path) -> Result<usize, IngestError> {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or_else(|| IngestError::BadWindowName {
            file: path.to_path_buf(),
        })?;
    let (window_start, window_end) = parse_window(stem, path)?;
    let reader = csv::Reader::from_path(path)?;
    ingest_window_records(cohort, reader, window_start, window_end, path)
}

fn parse_window(stem: &str, path: &Path) -> Result<(NaiveDate, NaiveDate), IngestError> {
    let bad = || IngestError::BadWindowName {
        file: path.to_path_buf(),
    };
    let (start, end) = stem.split_once(' ').ok_or_else(bad)?;
    let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").map_err(|_| bad())?;
    let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").map_err(|_| bad())?;
    Ok((start, end))
}

fn ingest_window_records<R: Read>(
    cohort: &mut Cohort,
    mut reader: csv::Reader<R>,
    window_start: NaiveDate,
    window_end: NaiveDate,
    path: &Path,
) -> Result<usize, IngestError> {
    cohort.observe_date(window_start);
    cohort.observe_date(window_end);

    let desc = format!("main panel week summary {window_start} to {window_end}");
    let at = window_start.and_time(NaiveTime::MIN);

    let mut added = 0;
    let mut duplicates = 0;
    let mut dropped = 0;

    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        // Header row is consumed by the reader; humans count from 1.
        let row = row_no + 2;
        let alias = record
            .get(0)
            .ok_or_else(|| IngestError::ShortRow {
                row,
                file: path.to_path_buf(),
            })?
            .trim();
        let xp_field = record
            .get(XP_COLUMN)
            .ok_or_else(|| IngestError::ShortRow {
                row,
                file: path.to_path_buf(),
            })?
            .trim();
        let xp: i64 = xp_field.parse().map_err(|_| IngestError::BadXp {
            value: xp_field.to_string(),
            file: path.to_path_buf(),
        })?;
        if xp < 0 {
            return Err(IngestError::BadXp {
                value: xp_field.to_string(),
                file: path.to_path_buf(),
            });
        }

        match cohort.roster.resolve(alias) {
            None => {
                return Err(IngestError::UnknownAlias {
                    alias: alias.to_string(),
                    file: path.to_path_buf(),
                })
            }
            Some(Resolution::Excluded) => dropped += 1,
            Some(Resolution::Known(canonical)) => {
                if cohort.record(&canonical, Practice::new(desc.clone(), xp, at)) {
                    added += 1;
                } else {
                    duplicates += 1;
                }
            }
        }
    }

    debug!(file = %path.display(), added, duplicates, dropped, "parsed window export");
    Ok(added)
}

/// Three-line activity records: a name line, a `+N xp` line, then a
/// timestamp in one of two human-readable formats.
#[derive(Debug)]
enum ParseState {
    AwaitName,
    AwaitXp {
        canonical: String,
        desc: String,
    },
    AwaitDate {
        canonical: String,
        desc: String,
        xp: i64,
    },
}

pub fn ingest_activity_export(cohort: &mut Cohort, path: &Path) -> Result<usize, IngestError> {
    let file = File::open(path)?;
    ingest_activity_lines(cohort, BufReader::new(file).lines(), path)
}

/// Walk the lines of an activity export. Lines that match nothing are
/// skipped without error; a fresh name line resets a half-built record.
/// Only an unresolvable alias aborts.
fn ingest_activity_lines<I>(
    cohort: &mut Cohort,
    lines: I,
    path: &Path,
) -> Result<usize, IngestError>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut state = ParseState::AwaitName;
    let mut added = 0;
    let mut duplicates = 0;
    let mut dropped = 0;

    for line in lines {
        let raw = line?;
        let line = raw.trim().to_lowercase();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = RE_NAME.captures(&line) {
            let alias = caps[1].trim().to_string();
            let desc = caps[2].to_string();
            state = match cohort.roster.resolve(&alias) {
                None => {
                    return Err(IngestError::UnknownAlias {
                        alias,
                        file: path.to_path_buf(),
                    })
                }
                Some(Resolution::Excluded) => {
                    dropped += 1;
                    ParseState::AwaitName
                }
                Some(Resolution::Known(canonical)) => ParseState::AwaitXp { canonical, desc },
            };
            continue;
        }

        state = match state {
            ParseState::AwaitName => ParseState::AwaitName,
            ParseState::AwaitXp { canonical, desc } => match RE_XP.captures(&line) {
                Some(caps) => match caps[1].parse::<i64>() {
                    Ok(xp) => ParseState::AwaitDate { canonical, desc, xp },
                    Err(_) => ParseState::AwaitXp { canonical, desc },
                },
                None => ParseState::AwaitXp { canonical, desc },
            },
            ParseState::AwaitDate { canonical, desc, xp } => {
                match parse_activity_datetime(&line) {
                    Some(at) => {
                        cohort.observe_date(at.date());
                        if cohort.record(&canonical, Practice::new(desc, xp, at)) {
                            added += 1;
                        } else {
                            duplicates += 1;
                        }
                        ParseState::AwaitName
                    }
                    None => ParseState::AwaitDate { canonical, desc, xp },
                }
            }
        };
    }

    debug!(file = %path.display(), added, duplicates, dropped, "parsed activity export");
    Ok(added)
}

fn parse_activity_datetime(line: &str) -> Option<NaiveDateTime> {
    if let Some(found) = RE_DATE_24H.find(line) {
        if let Ok(at) = NaiveDateTime::parse_from_str(found.as_str(), FMT_DATE_24H) {
            return Some(at);
        }
    }
    if let Some(found) = RE_DATE_AMPM.find(line) {
        let cleaned = found.as_str().replace('.', "");
        if let Ok(at) = NaiveDateTime::parse_from_str(&cleaned, FMT_DATE_AMPM) {
            return Some(at);
        }
    }
    None
}
