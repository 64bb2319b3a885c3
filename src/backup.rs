//! Backup binary for copying the data stores to a dated directory.
//!
//! Usage: cargo run --bin backup
//!        cargo run --bin backup -- --target backups/before_cleanup
//!        cargo run --bin backup -- --data-dir other_data --target backup_dir
//!
//! Copies the task and diary JSON files into a new directory.

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(about = "Backup the daybook data files to a new directory")]
struct Args {
    /// Source data directory (overrides DATA_DIR from .env)
    #[arg(long)]
    data_dir: Option<String>,

    /// Target backup directory (default: backup_{year}_{month}_{day})
    #[arg(long)]
    target: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _ = dotenvy::dotenv();

    let source_dir = PathBuf::from(
        args.data_dir
            .or_else(|| std::env::var("DATA_DIR").ok())
            .unwrap_or_else(|| "data".to_string()),
    );

    let now = chrono::Utc::now();
    let default_target = format!("backup_{}_{:02}_{:02}", now.year(), now.month(), now.day());
    let target_dir = PathBuf::from(args.target.unwrap_or(default_target));

    println!("Source data directory: {}", source_dir.display());
    println!("Target backup: {}", target_dir.display());

    fs::create_dir_all(&target_dir)?;

    let mut copied = 0;
    for name in ["tasks.json", "diary-entries.json"] {
        let source = source_dir.join(name);
        if !source.exists() {
            println!("  Skipping {} (not found)", name);
            continue;
        }
        fs::copy(&source, target_dir.join(name))
            .with_context(|| format!("failed to copy {}", source.display()))?;
        println!("  Copied {}", name);
        copied += 1;
    }

    println!("\nBackup completed successfully!");
    println!("{} file(s) saved to: {}", copied, target_dir.display());
    Ok(())
}
