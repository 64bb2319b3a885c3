//! Clear binary for resetting the data stores.
//!
//! Usage: cargo run --bin clear
//!
//! Overwrites the task and diary stores with empty lists.

mod store;
mod task;

use anyhow::Result;
use std::path::PathBuf;

use crate::store::JsonStore;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    std::fs::create_dir_all(&data_dir)?;

    let empty: Vec<serde_json::Value> = Vec::new();

    println!("Clearing task store...");
    JsonStore::new(data_dir.join("tasks.json")).save(&empty).await?;

    println!("Clearing diary store...");
    JsonStore::new(data_dir.join("diary-entries.json")).save(&empty).await?;

    println!("All stores cleared successfully!");
    Ok(())
}
