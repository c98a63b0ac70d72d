use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use rusqlite::Connection;

use crate::db;

static SUPRA_FLAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^supra$").unwrap());
static SUPRA_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^supra:\s*(.+)$").unwrap());
static COUNTRY_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^country:\s*(.+)$").unwrap());
static KM2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9][0-9 _]*)\s*(?:km2|km²|km\^2)$").unwrap());
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9][0-9 _]*$").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{2,3}$").unwrap());
static TAGLIST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9|_ ]*$").unwrap());

/// One classified fixture value. `City` is the fallback for anything
/// no structured matcher claims.
#[derive(Debug, Clone, PartialEq)]
pub enum Fact {
    SupraFlag,
    SupraRef(i64),
    CountryRef(i64),
    Number(i64),
    Code(String),
    Tags(Vec<String>),
    City(String),
}

/// Classify a single value by trying the matchers in fixed priority order.
///
/// km²-suffixed numbers are tried before bare numbers, tag lists are only
/// eligible for the last value of a line, and `supra:`/`country:` references
/// only match when the referenced country resolves to an existing row —
/// otherwise the value falls through to the `City` fallback.
pub fn classify(conn: &Connection, value: &str, is_last: bool) -> Result<Fact> {
    if SUPRA_FLAG_RE.is_match(value) {
        return Ok(Fact::SupraFlag);
    }
    if let Some(caps) = SUPRA_REF_RE.captures(value) {
        if let Some(id) = db::resolve_country(conn, caps[1].trim())? {
            return Ok(Fact::SupraRef(id));
        }
    }
    if let Some(caps) = COUNTRY_REF_RE.captures(value) {
        if let Some(id) = db::resolve_country(conn, caps[1].trim())? {
            return Ok(Fact::CountryRef(id));
        }
    }
    if let Some(caps) = KM2_RE.captures(value) {
        return Ok(Fact::Number(parse_number(&caps[1])?));
    }
    if NUMBER_RE.is_match(value) {
        return Ok(Fact::Number(parse_number(value)?));
    }
    if CODE_RE.is_match(value) {
        return Ok(Fact::Code(value.to_string()));
    }
    if is_last && TAGLIST_RE.is_match(value) {
        let keys = value
            .split('|')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        return Ok(Fact::Tags(keys));
    }
    Ok(Fact::City(value.to_string()))
}

/// Parse a digit run with optional `_`/space separators, e.g. `8 414 638`.
fn parse_number(digits: &str) -> Result<i64> {
    let stripped = digits.replace([' ', '_'], "");
    let n = stripped.parse::<i64>()?;
    Ok(n)
}
