use std::path::PathBuf;

use thiserror::Error;

/// Problems in the configuration file. All of these abort the run before any
/// input is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed configuration line {line_no}: {line:?}")]
    Malformed { line_no: usize, line: String },
    #[error("configuration sets no weekly goal")]
    MissingGoal,
    #[error("weekly goal must be a positive integer, got {value:?}")]
    InvalidGoal { value: String },
    #[error("invalid bonus week date {value:?}, expected yyyy-mm-dd")]
    InvalidBonusDate { value: String },
    #[error("alias entry on line {line_no} has an empty alias")]
    EmptyAlias { line_no: usize },
}

/// Problems while reading input exports. An unknown alias is a roster gap
/// and aborts the run; excluded aliases are dropped upstream of these.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown alias {alias:?} in {}", .file.display())]
    UnknownAlias { alias: String, file: PathBuf },
    #[error("input file {} is not named '<start> <end>.csv'", .file.display())]
    BadWindowName { file: PathBuf },
    #[error("bad xp value {value:?} in {}", .file.display())]
    BadXp { value: String, file: PathBuf },
    #[error("row {row} in {} is missing the xp column", .file.display())]
    ShortRow { row: usize, file: PathBuf },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Marks cannot be computed without at least one scored week; every
/// denominator in the marking scheme would be zero.
#[derive(Debug, Error)]
#[error("no scored weeks to mark against")]
pub struct NoScoredWeeks;
