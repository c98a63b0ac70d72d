mod city;
mod country;
mod db;
mod reader;
mod tag;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use country::LoadOpts;

#[derive(Parser)]
#[command(name = "worlddb", about = "world.db plain-text fixture loader")]
struct Cli {
    /// Database path
    #[arg(long, global = true, default_value = "data/world.sqlite")]
    db: PathBuf,
    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Show debug messages
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Load country fixture files
    Load {
        /// Fixture files (plain text, one country per line)
        fixtures: Vec<PathBuf>,
        /// Delete all records first
        #[arg(long)]
        delete: bool,
        /// Do not create or attach tags
        #[arg(long)]
        skip_tags: bool,
    },
    /// Create the schema and load every .txt fixture under a directory
    Setup {
        /// Data directory
        dir: PathBuf,
        /// Delete all records first
        #[arg(long)]
        delete: bool,
    },
    /// Show table counts
    Stats,
    /// Countries overview table
    Ls {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let t0 = Instant::now();
    let conn = db::connect(&cli.db)?;
    db::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Init => {
            println!("Created schema in {}", cli.db.display());
            Ok(())
        }
        Commands::Load { fixtures, delete, skip_tags } => {
            if fixtures.is_empty() {
                println!("No fixtures given. Pass one or more fixture files.");
                return Ok(());
            }
            if delete {
                db::delete_all(&conn)?;
            }
            let opts = LoadOpts { skip_tags };
            let mut loaded = 0;
            let mut failed = 0;
            for fixture in &fixtures {
                let stats = reader::load_countries(&conn, fixture, &opts)?;
                loaded += stats.loaded;
                failed += stats.failed;
            }
            println!("Loaded {} countries ({} failed).", loaded, failed);
            Ok(())
        }
        Commands::Setup { dir, delete } => {
            if delete {
                db::delete_all(&conn)?;
            }
            let mut fixtures: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
                .collect();
            fixtures.sort();
            if fixtures.is_empty() {
                println!("No .txt fixtures found under {}", dir.display());
                return Ok(());
            }
            let opts = LoadOpts::default();
            let mut loaded = 0;
            let mut failed = 0;
            for fixture in &fixtures {
                let stats = reader::load_countries(&conn, fixture, &opts)?;
                loaded += stats.loaded;
                failed += stats.failed;
            }
            println!(
                "Loaded {} countries from {} fixtures ({} failed).",
                loaded,
                fixtures.len(),
                failed
            );
            Ok(())
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Countries: {}", s.countries);
            println!("Cities:    {}", s.cities);
            println!("Tags:      {}", s.tags);
            println!("Taggings:  {}", s.taggings);
            Ok(())
        }
        Commands::Ls { limit } => {
            let rows = db::fetch_countries(&conn, limit)?;
            if rows.is_empty() {
                println!("No countries found. Run 'load' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<3} | {:<24} | {:<4} | {:>10} | {:>12} | {:<9}",
                "#", "Key", "Title", "Code", "Area km²", "Pop", "Nature"
            );
            println!("{}", "-".repeat(84));

            for (i, r) in rows.iter().enumerate() {
                let title = truncate(&r.title, 24);
                let code = r.code.as_deref().unwrap_or("-");
                let area = r.area.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                let pop = r.pop.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "{:>3} | {:<3} | {:<24} | {:<4} | {:>10} | {:>12} | {:<9}",
                    i + 1, r.key, title, code, area, pop, nature(r)
                );
            }

            println!("\n{} countries", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn nature(r: &db::CountryRow) -> &'static str {
    if r.is_supra {
        "supra"
    } else if r.is_dependency {
        "territory"
    } else {
        "country"
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
