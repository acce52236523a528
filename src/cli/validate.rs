//! Argument shape checks, run before any ABL I/O

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::cli::{CliError, CliResult};

static COLLECTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^col\d{5}$").expect("valid collection id pattern"));
static CONTENT_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+(\.\d+)?$").expect("valid content version pattern"));
static MIN_CODE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}\.\d{6}$").expect("valid min code version pattern"));

/// `col` followed by five digits.
pub fn collection_id(value: &str) -> CliResult<()> {
    check(&COLLECTION_ID, value, "collection ID")
}

/// `digits.digits[.digits]`
pub fn content_version(value: &str) -> CliResult<()> {
    check(&CONTENT_VERSION, value, "content version")
}

/// `YYYYMMDD.HHMMSS`-shaped build stamp.
pub fn min_code_version(value: &str) -> CliResult<()> {
    check(&MIN_CODE_VERSION, value, "minimum code version")
}

pub fn book_uuid(value: &str) -> CliResult<()> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|e| CliError::InvalidArgs(format!("{value} is not a valid book UUID: {e}")))
}

/// Repository names, commit SHAs, styles and slugs only need to be non-blank.
pub fn identifier(value: &str, what: &str) -> CliResult<()> {
    if value.trim().is_empty() {
        return Err(CliError::InvalidArgs(format!("{what} must not be empty")));
    }
    Ok(())
}

fn check(pattern: &Regex, value: &str, what: &str) -> CliResult<()> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(CliError::InvalidArgs(format!("{value} is not a valid {what}")))
    }
}
