use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{error, info};

use crate::country::{self, LoadOpts};

pub struct LoadStats {
    pub loaded: usize,
    pub failed: usize,
}

/// Load one plain-text country fixture file, one entity per line.
///
/// A failing line aborts that entity only; it is logged with its source
/// location and the remaining lines are still processed.
pub fn load_countries(conn: &Connection, path: &Path, opts: &LoadOpts) -> Result<LoadStats> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    let lines = parse_fixture(&text);
    info!("loading {} countries from {}", lines.len(), path.display());

    let pb = ProgressBar::new(lines.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut stats = LoadStats { loaded: 0, failed: 0 };
    for (lineno, values) in &lines {
        match country::create_or_update_from_values(conn, values, opts) {
            Ok(_) => stats.loaded += 1,
            Err(e) => {
                error!("{}:{}: {:#}", path.display(), lineno, e);
                stats.failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(stats)
}

/// Split fixture text into per-line token lists, dropping comment (`#`)
/// and blank lines. Line numbers are 1-based for error reporting.
pub fn parse_fixture(text: &str) -> Vec<(usize, Vec<String>)> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let values: Vec<String> = line.split(',').map(|v| v.trim().to_string()).collect();
            Some((i + 1, values))
        })
        .collect()
}
