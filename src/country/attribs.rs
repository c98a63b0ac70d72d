use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

use super::classify::{classify, Fact};
use crate::db::CountryAttribs;

/// Output of one fixture line: the finished attribute set plus the side
/// lists the upsert step consumes afterwards.
#[derive(Debug)]
pub struct ParsedValues {
    pub attribs: CountryAttribs,
    pub tag_keys: Vec<String>,
    pub city_titles: Vec<String>,
}

/// Single left-to-right pass over the optional values of a line.
///
/// The first and second numbers encountered become area and population,
/// in that order, no matter which matcher produced them. Fewer than two
/// numbers leaves the missing field unset.
pub fn build(conn: &Connection, raw_title: &str, values: &[String]) -> Result<ParsedValues> {
    let (title, synonyms) = split_title(raw_title);
    let mut attribs = CountryAttribs {
        title,
        synonyms,
        is_country: true, // country by default; supra/country: values change it
        ..Default::default()
    };

    let mut numbers: Vec<i64> = Vec::new();
    let mut tag_keys: Vec<String> = Vec::new();
    let mut city_titles: Vec<String> = Vec::new();

    let last = values.len().saturating_sub(1);
    for (index, value) in values.iter().enumerate() {
        match classify(conn, value, index == last)? {
            Fact::SupraFlag => {
                attribs.is_country = false;
                attribs.is_supra = true;
                push_tag(&mut tag_keys, "supra");
            }
            Fact::SupraRef(id) => {
                attribs.parent_id = Some(id);
            }
            Fact::CountryRef(id) => {
                attribs.parent_id = Some(id);
                attribs.is_country = false;
                attribs.is_dependency = true;
                push_tag(&mut tag_keys, "territory");
            }
            Fact::Number(n) => numbers.push(n),
            Fact::Code(code) => attribs.code = Some(code),
            Fact::Tags(keys) => {
                for key in &keys {
                    push_tag(&mut tag_keys, key);
                }
            }
            Fact::City(title) => {
                if title.contains(':') {
                    // likely an unresolved supra:/country: reference
                    warn!("treating value >{}< as capital city", title);
                }
                city_titles.push(title);
            }
        }
    }

    attribs.area = numbers.first().copied();
    attribs.pop = numbers.get(1).copied();

    Ok(ParsedValues {
        attribs,
        tag_keys,
        city_titles,
    })
}

/// Split `Austria|Österreich` into title plus pipe-joined synonyms.
fn split_title(raw: &str) -> (String, Option<String>) {
    let mut parts = raw.split('|').map(str::trim).filter(|p| !p.is_empty());
    let title = parts.next().unwrap_or("").to_string();
    let rest: Vec<&str> = parts.collect();
    let synonyms = if rest.is_empty() {
        None
    } else {
        Some(rest.join("|"))
    };
    (title, synonyms)
}

fn push_tag(tag_keys: &mut Vec<String>, key: &str) {
    if !tag_keys.iter().any(|k| k == key) {
        tag_keys.push(key.to_string());
    }
}
