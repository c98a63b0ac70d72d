use std::path::Path;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS countries (
            id            INTEGER PRIMARY KEY,
            key           TEXT UNIQUE NOT NULL,
            title         TEXT NOT NULL,
            synonyms      TEXT,
            code          TEXT,
            area          INTEGER,
            pop           INTEGER,
            is_country    BOOLEAN NOT NULL DEFAULT 1,
            is_supra      BOOLEAN NOT NULL DEFAULT 0,
            is_dependency BOOLEAN NOT NULL DEFAULT 0,
            parent_id     INTEGER REFERENCES countries(id),
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_countries_parent ON countries(parent_id);

        -- Capital-city stubs auto-created from leftover fixture values
        CREATE TABLE IF NOT EXISTS cities (
            id         INTEGER PRIMARY KEY,
            title      TEXT NOT NULL,
            country_id INTEGER NOT NULL REFERENCES countries(id),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(country_id, title)
        );
        CREATE INDEX IF NOT EXISTS idx_cities_country ON cities(country_id);

        CREATE TABLE IF NOT EXISTS tags (
            id  INTEGER PRIMARY KEY,
            key TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS taggings (
            country_id INTEGER NOT NULL REFERENCES countries(id),
            tag_id     INTEGER NOT NULL REFERENCES tags(id),
            UNIQUE(country_id, tag_id)
        );
        CREATE INDEX IF NOT EXISTS idx_taggings_tag ON taggings(tag_id);
        ",
    )?;
    Ok(())
}

/// Bulk wipe of all records (used by `load --delete` / `setup --delete`).
pub fn delete_all(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "DELETE FROM taggings;
         DELETE FROM cities;
         DELETE FROM countries;
         DELETE FROM tags;",
    )?;
    tx.commit()?;
    Ok(())
}

// ── Countries ──

#[derive(Debug, Clone)]
pub struct CountryRow {
    pub id: i64,
    pub key: String,
    pub title: String,
    pub synonyms: Option<String>,
    pub code: Option<String>,
    pub area: Option<i64>,
    pub pop: Option<i64>,
    pub is_country: bool,
    pub is_supra: bool,
    pub is_dependency: bool,
    pub parent_id: Option<i64>,
}

/// Attribute set assembled from one fixture line. Absent options stay NULL.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CountryAttribs {
    pub title: String,
    pub synonyms: Option<String>,
    pub code: Option<String>,
    pub area: Option<i64>,
    pub pop: Option<i64>,
    pub is_country: bool,
    pub is_supra: bool,
    pub is_dependency: bool,
    pub parent_id: Option<i64>,
}

const COUNTRY_COLS: &str =
    "id, key, title, synonyms, code, area, pop, is_country, is_supra, is_dependency, parent_id";

fn country_from_row(row: &rusqlite::Row) -> rusqlite::Result<CountryRow> {
    Ok(CountryRow {
        id: row.get(0)?,
        key: row.get(1)?,
        title: row.get(2)?,
        synonyms: row.get(3)?,
        code: row.get(4)?,
        area: row.get(5)?,
        pop: row.get(6)?,
        is_country: row.get(7)?,
        is_supra: row.get(8)?,
        is_dependency: row.get(9)?,
        parent_id: row.get(10)?,
    })
}

pub fn find_country_by_key(conn: &Connection, key: &str) -> Result<Option<CountryRow>> {
    let sql = format!("SELECT {} FROM countries WHERE key = ?1", COUNTRY_COLS);
    let row = conn.query_row(&sql, [key], country_from_row).optional()?;
    Ok(row)
}

/// Resolve a `supra:`/`country:` reference by key or title.
pub fn resolve_country(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM countries WHERE key = ?1 OR title = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn insert_country(conn: &Connection, key: &str, a: &CountryAttribs) -> Result<i64> {
    conn.execute(
        "INSERT INTO countries
         (key, title, synonyms, code, area, pop, is_country, is_supra, is_dependency, parent_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            key, a.title, a.synonyms, a.code, a.area, a.pop,
            a.is_country, a.is_supra, a.is_dependency, a.parent_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Merge an attribute set into an existing row. Only provided fields are
/// overwritten: an absent code/synonyms/parent keeps the stored value.
/// Numbers are assigned as a pair — a line with at least one number sets
/// both area and pop (pop to NULL when only one number was given), a line
/// with no numbers touches neither.
pub fn update_country(conn: &Connection, id: i64, a: &CountryAttribs) -> Result<()> {
    let mut sets: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    push_set(&mut sets, &mut params, "title", Box::new(a.title.clone()));
    if let Some(synonyms) = &a.synonyms {
        push_set(&mut sets, &mut params, "synonyms", Box::new(synonyms.clone()));
    }
    if let Some(code) = &a.code {
        push_set(&mut sets, &mut params, "code", Box::new(code.clone()));
    }
    if a.area.is_some() {
        push_set(&mut sets, &mut params, "area", Box::new(a.area));
        push_set(&mut sets, &mut params, "pop", Box::new(a.pop));
    }
    push_set(&mut sets, &mut params, "is_country", Box::new(a.is_country));
    push_set(&mut sets, &mut params, "is_supra", Box::new(a.is_supra));
    push_set(&mut sets, &mut params, "is_dependency", Box::new(a.is_dependency));
    if let Some(parent_id) = a.parent_id {
        push_set(&mut sets, &mut params, "parent_id", Box::new(parent_id));
    }

    params.push(Box::new(id));
    let sql = format!(
        "UPDATE countries SET {} WHERE id = ?{}",
        sets.join(", "),
        params.len()
    );
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, param_refs.as_slice())?;
    Ok(())
}

fn push_set(
    sets: &mut Vec<String>,
    params: &mut Vec<Box<dyn rusqlite::types::ToSql>>,
    col: &str,
    value: Box<dyn rusqlite::types::ToSql>,
) {
    params.push(value);
    sets.push(format!("{} = ?{}", col, params.len()));
}

pub fn fetch_countries(conn: &Connection, limit: usize) -> Result<Vec<CountryRow>> {
    let sql = format!(
        "SELECT {} FROM countries ORDER BY key LIMIT {}",
        COUNTRY_COLS, limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], country_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_country_tags(conn: &Connection, country_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.key FROM tags t
         JOIN taggings tg ON tg.tag_id = t.id
         WHERE tg.country_id = ?1
         ORDER BY t.key",
    )?;
    let rows = stmt
        .query_map([country_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub countries: usize,
    pub cities: usize,
    pub tags: usize,
    pub taggings: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |table: &str| -> Result<usize> {
        let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
        Ok(n)
    };
    Ok(Stats {
        countries: count("countries")?,
        cities: count("cities")?,
        tags: count("tags")?,
        taggings: count("taggings")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_then_find_by_key() {
        let conn = conn();
        let attribs = CountryAttribs {
            title: "Austria".to_string(),
            code: Some("AUT".to_string()),
            area: Some(83858),
            pop: Some(8414638),
            is_country: true,
            ..Default::default()
        };
        let id = insert_country(&conn, "at", &attribs).unwrap();
        let row = find_country_by_key(&conn, "at").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.title, "Austria");
        assert_eq!(row.code.as_deref(), Some("AUT"));
        assert_eq!(row.area, Some(83858));
        assert_eq!(row.pop, Some(8414638));
        assert!(row.is_country);
        assert!(!row.is_supra);
    }

    #[test]
    fn resolve_by_key_or_title() {
        let conn = conn();
        let attribs = CountryAttribs {
            title: "France".to_string(),
            is_country: true,
            ..Default::default()
        };
        let id = insert_country(&conn, "fr", &attribs).unwrap();
        assert_eq!(resolve_country(&conn, "fr").unwrap(), Some(id));
        assert_eq!(resolve_country(&conn, "France").unwrap(), Some(id));
        assert_eq!(resolve_country(&conn, "Atlantis").unwrap(), None);
    }

    #[test]
    fn update_overwrites_fields() {
        let conn = conn();
        let mut attribs = CountryAttribs {
            title: "Austria".to_string(),
            area: Some(1),
            is_country: true,
            ..Default::default()
        };
        let id = insert_country(&conn, "at", &attribs).unwrap();
        attribs.area = Some(83858);
        attribs.pop = Some(8414638);
        update_country(&conn, id, &attribs).unwrap();
        let row = find_country_by_key(&conn, "at").unwrap().unwrap();
        assert_eq!(row.area, Some(83858));
        assert_eq!(row.pop, Some(8414638));
    }

    #[test]
    fn update_keeps_absent_fields() {
        let conn = conn();
        let id = insert_country(
            &conn,
            "at",
            &CountryAttribs {
                title: "Austria".to_string(),
                synonyms: Some("Österreich".to_string()),
                code: Some("AUT".to_string()),
                area: Some(83858),
                pop: Some(8414638),
                is_country: true,
                ..Default::default()
            },
        )
        .unwrap();

        // bare re-process: title only, no code/numbers/synonyms
        update_country(
            &conn,
            id,
            &CountryAttribs {
                title: "Austria".to_string(),
                is_country: true,
                ..Default::default()
            },
        )
        .unwrap();

        let row = find_country_by_key(&conn, "at").unwrap().unwrap();
        assert_eq!(row.code.as_deref(), Some("AUT"));
        assert_eq!(row.synonyms.as_deref(), Some("Österreich"));
        assert_eq!(row.area, Some(83858));
        assert_eq!(row.pop, Some(8414638));
    }

    #[test]
    fn update_with_one_number_clears_pop() {
        let conn = conn();
        let id = insert_country(
            &conn,
            "at",
            &CountryAttribs {
                title: "Austria".to_string(),
                area: Some(83858),
                pop: Some(8414638),
                is_country: true,
                ..Default::default()
            },
        )
        .unwrap();

        // numbers are assigned as a pair: one number present resets pop
        update_country(
            &conn,
            id,
            &CountryAttribs {
                title: "Austria".to_string(),
                area: Some(500),
                pop: None,
                is_country: true,
                ..Default::default()
            },
        )
        .unwrap();

        let row = find_country_by_key(&conn, "at").unwrap().unwrap();
        assert_eq!(row.area, Some(500));
        assert_eq!(row.pop, None);
    }

    #[test]
    fn delete_all_empties_tables() {
        let conn = conn();
        let attribs = CountryAttribs {
            title: "Austria".to_string(),
            is_country: true,
            ..Default::default()
        };
        insert_country(&conn, "at", &attribs).unwrap();
        delete_all(&conn).unwrap();
        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.countries, 0);
        assert_eq!(stats.cities, 0);
        assert_eq!(stats.tags, 0);
        assert_eq!(stats.taggings, 0);
    }
}
