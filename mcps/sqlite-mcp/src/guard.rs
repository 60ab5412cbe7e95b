//! Query guard - safety layer for client-supplied SQL
//!
//! A conservative lexical classifier, not a parser. A query passes only if it
//! starts with `SELECT` and contains none of the write/DDL keywords anywhere,
//! including inside string literals and aliases. Queries such as
//! `SELECT 'update' AS status` are rejected on purpose.
//!
//! The guard also owns the table-identifier allow-list used wherever a table
//! name has to be spliced into SQL text.

use std::fmt;

use thiserror::Error;

/// Keywords that reject a query wherever they appear, checked in this order
pub const FORBIDDEN_PATTERNS: [&str; 6] = ["DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE"];

/// Why a query was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The query does not start with `SELECT`
    NotASelect,
    /// The query contains one of [`FORBIDDEN_PATTERNS`]
    ForbiddenPattern(&'static str),
}

impl Rejection {
    /// Stable machine-readable reason, e.g. `forbidden-pattern:DROP`
    pub fn reason_code(&self) -> String {
        match self {
            Rejection::NotASelect => "not-a-select".to_string(),
            Rejection::ForbiddenPattern(pattern) => format!("forbidden-pattern:{}", pattern),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotASelect => f.write_str("Only SELECT queries are allowed"),
            Rejection::ForbiddenPattern(pattern) => {
                write!(f, "Query contains forbidden pattern: {}", pattern)
            }
        }
    }
}

impl std::error::Error for Rejection {}

/// Outcome of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Safe,
    Rejected(Rejection),
}

impl Classification {
    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            Classification::Safe => Ok(()),
            Classification::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Classify a query as safe (read-only) or rejected
///
/// Matching runs on a trimmed, uppercased copy; the caller keeps executing the
/// original text.
pub fn classify(query: &str) -> Classification {
    let normalized = query.trim().to_uppercase();

    if !normalized.starts_with("SELECT") {
        return Classification::Rejected(Rejection::NotASelect);
    }

    match FORBIDDEN_PATTERNS
        .iter()
        .copied()
        .find(|pattern| normalized.contains(pattern))
    {
        Some(pattern) => Classification::Rejected(Rejection::ForbiddenPattern(pattern)),
        None => Classification::Safe,
    }
}

/// [`classify`] as a `Result`, for use with `?`
pub fn check(query: &str) -> Result<(), Rejection> {
    classify(query).into_result()
}

/// A table name that failed the identifier allow-list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid table name: {0:?}")]
pub struct InvalidIdentifier(pub String);

/// Accept only non-empty names made of ASCII letters, digits, `_` and `-`
pub fn validate_identifier(name: &str) -> Result<&str, InvalidIdentifier> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';

    if !name.is_empty() && name.chars().all(allowed) {
        Ok(name)
    } else {
        Err(InvalidIdentifier(name.to_string()))
    }
}
