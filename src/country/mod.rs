pub mod attribs;
pub mod classify;

use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use rusqlite::Connection;
use tracing::debug;

use crate::{city, db, tag};

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]{2}$").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z_]{3}$").unwrap());

/// Persistence-time format checks on the two derived identifier fields.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid key '{0}': expected two lowercase letters a-z")]
    Key(String),
    #[error("invalid code '{0}': expected three uppercase letters A-Z (and _)")]
    Code(String),
}

#[derive(Debug, Default, Clone)]
pub struct LoadOpts {
    pub skip_tags: bool,
}

/// Upsert one country from its ordered fixture values.
///
/// The first value is the key and the second the title (with optional
/// `|`-separated synonyms); the rest go through the classifier pass. The
/// merge, capital-city stubs, and taggings run in one transaction so a
/// partial failure cannot leave the country without them.
pub fn create_or_update_from_values(
    conn: &Connection,
    values: &[String],
    opts: &LoadOpts,
) -> Result<i64> {
    let (key, raw_title, rest) = split_key_n_title(values)?;

    let parsed = attribs::build(conn, raw_title, rest)
        .with_context(|| format!("country '{}'", key))?;

    validate(key, parsed.attribs.code.as_deref())
        .with_context(|| format!("country '{}'", key))?;

    let tx = conn.unchecked_transaction()?;

    let id = match db::find_country_by_key(&tx, key)? {
        Some(existing) => {
            debug!("update country {}-{}", existing.id, key);
            db::update_country(&tx, existing.id, &parsed.attribs)?;
            existing.id
        }
        None => {
            debug!("create country {}", key);
            db::insert_country(&tx, key, &parsed.attribs)?
        }
    };
    debug!("attribs: {}", serde_json::to_string(&parsed.attribs)?);

    city::create_or_update_from_titles(&tx, &parsed.city_titles, id)?;
    tag::add_taggings(&tx, id, &parsed.tag_keys, opts.skip_tags)?;

    tx.commit()?;
    Ok(id)
}

fn split_key_n_title(values: &[String]) -> Result<(&str, &str, &[String])> {
    if values.len() < 2 {
        bail!("fixture line needs at least key and title, got {:?}", values);
    }
    Ok((values[0].trim(), values[1].trim(), &values[2..]))
}

fn validate(key: &str, code: Option<&str>) -> Result<(), ValidationError> {
    if !KEY_RE.is_match(key) {
        return Err(ValidationError::Key(key.to_string()));
    }
    if let Some(code) = code {
        if !CODE_RE.is_match(code) {
            return Err(ValidationError::Code(code.to_string()));
        }
    }
    Ok(())
}
