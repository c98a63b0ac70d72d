use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

/// Resolve tag keys to tag rows (creating missing ones) and attach them to
/// a country. Attaching is set-semantics: an already-attached tag is a
/// no-op. With `skip` set, nothing is created or attached.
pub fn add_taggings(
    conn: &Connection,
    country_id: i64,
    tag_keys: &[String],
    skip: bool,
) -> Result<usize> {
    if tag_keys.is_empty() {
        return Ok(0);
    }
    if skip {
        debug!("skipping {} taggings (skip-tags)", tag_keys.len());
        return Ok(0);
    }

    debug!("adding {} taggings: >>{}<<", tag_keys.len(), tag_keys.join("|"));

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO taggings (country_id, tag_id) VALUES (?1, ?2)",
    )?;
    let mut attached = 0;
    for key in tag_keys {
        let tag_id = find_or_create(conn, key)?;
        attached += stmt.execute(rusqlite::params![country_id, tag_id])?;
    }
    Ok(attached)
}

fn find_or_create(conn: &Connection, key: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM tags WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    debug!("creating tag >{}<", key);
    conn.execute("INSERT INTO tags (key) VALUES (?1)", [key])?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, CountryAttribs};

    fn conn_with_country() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let id = db::insert_country(
            &conn,
            "at",
            &CountryAttribs {
                title: "Austria".to_string(),
                is_country: true,
                ..Default::default()
            },
        )
        .unwrap();
        (conn, id)
    }

    fn keys(vals: &[&str]) -> Vec<String> {
        vals.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn creates_tags_on_first_reference() {
        let (conn, id) = conn_with_country();
        let attached = add_taggings(&conn, id, &keys(&["eu", "western europe"]), false).unwrap();
        assert_eq!(attached, 2);
        assert_eq!(
            db::fetch_country_tags(&conn, id).unwrap(),
            vec!["eu".to_string(), "western europe".to_string()]
        );
    }

    #[test]
    fn reattaching_is_a_noop() {
        let (conn, id) = conn_with_country();
        add_taggings(&conn, id, &keys(&["eu"]), false).unwrap();
        let attached = add_taggings(&conn, id, &keys(&["eu"]), false).unwrap();
        assert_eq!(attached, 0);
        let stats = db::get_stats(&conn).unwrap();
        assert_eq!(stats.tags, 1);
        assert_eq!(stats.taggings, 1);
    }

    #[test]
    fn tags_shared_between_countries() {
        let (conn, at) = conn_with_country();
        let fr = db::insert_country(
            &conn,
            "fr",
            &CountryAttribs {
                title: "France".to_string(),
                is_country: true,
                ..Default::default()
            },
        )
        .unwrap();
        add_taggings(&conn, at, &keys(&["eu"]), false).unwrap();
        add_taggings(&conn, fr, &keys(&["eu"]), false).unwrap();
        let stats = db::get_stats(&conn).unwrap();
        assert_eq!(stats.tags, 1);
        assert_eq!(stats.taggings, 2);
    }

    #[test]
    fn skip_mode_creates_nothing() {
        let (conn, id) = conn_with_country();
        let attached = add_taggings(&conn, id, &keys(&["eu"]), true).unwrap();
        assert_eq!(attached, 0);
        assert_eq!(db::get_stats(&conn).unwrap().tags, 0);
    }
}
