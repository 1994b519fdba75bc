//! Failure taxonomy of a build.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// An input row or file could not be decoded. Aborts the run.
    MalformedInput { file: String, detail: String },
    /// A rate the engine needs is absent. Fails only the affected country.
    MissingCoverage {
        country: String,
        currency: String,
        date: NaiveDate,
    },
    /// The inputs or settings cannot produce any output. Aborts the run.
    Configuration(String),
}

impl BuildError {
    pub fn malformed(file: impl Into<String>, detail: impl Into<String>) -> Self {
        BuildError::MalformedInput {
            file: file.into(),
            detail: detail.into(),
        }
    }

    /// Whether the build may continue with the remaining countries.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BuildError::MissingCoverage { .. })
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::MalformedInput { file, detail } => {
                write!(f, "Malformed input in {file}: {detail}")
            }
            BuildError::MissingCoverage {
                country,
                currency,
                date,
            } => write!(
                f,
                "No {currency} exchange rate on {date} needed for country {country}"
            ),
            BuildError::Configuration(detail) => write!(f, "Configuration error: {detail}"),
        }
    }
}

impl std::error::Error for BuildError {}
