use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

/// Create capital-city stub rows from leftover fixture values, owned by
/// the given country. Re-running with the same titles is a no-op.
pub fn create_or_update_from_titles(
    conn: &Connection,
    titles: &[String],
    country_id: i64,
) -> Result<usize> {
    if titles.is_empty() {
        return Ok(0);
    }
    debug!("adding {} capital cities for country {}", titles.len(), country_id);

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO cities (title, country_id) VALUES (?1, ?2)",
    )?;
    let mut created = 0;
    for title in titles {
        created += stmt.execute(rusqlite::params![title, country_id])?;
    }
    Ok(created)
}

pub fn fetch_titles(conn: &Connection, country_id: i64) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT title FROM cities WHERE country_id = ?1 ORDER BY title")?;
    let rows = stmt
        .query_map([country_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
