//! Seed binary for populating the task store with starter tasks.
//!
//! Usage: cargo run --bin seed
//!
//! Reads from seed.toml in the project root and appends to the task store.
//! Periodic seeds are expanded into their full family of occurrences.

mod config;
mod convert;
mod store;
mod task;

use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::store::JsonStore;
use crate::task::{Task, TaskType, next_task_id, parse_day};

#[derive(Debug, Deserialize)]
struct SeedData {
    tasks: Vec<SeedTask>,
}

#[derive(Debug, Deserialize)]
struct SeedTask {
    title: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    due: Option<String>,
    /// "regular task", "periodic task" or "reminder"
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    frequency: Option<i64>,
}

impl SeedTask {
    fn to_task(&self, id: i64) -> Task {
        Task {
            id,
            title: self.title.clone(),
            desc: self.desc.clone(),
            due: self.due.as_deref().and_then(parse_day),
            kind: self.kind.as_deref().map(TaskType::parse).unwrap_or_default(),
            end_date: self.end_date.as_deref().and_then(parse_day),
            frequency: self.frequency,
            ..Task::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("🌱 Seeding task store...");

    let _ = dotenvy::dotenv();
    let timezone = std::env::var("TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
    config::init_timezone(&timezone);

    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    fs::create_dir_all(&data_dir)?;
    let store = JsonStore::new(data_dir.join("tasks.json"));
    println!("📦 Using task store: {}", store.path().display());

    let seed_content = fs::read_to_string("seed.toml")?;
    let seed_data: SeedData = toml::from_str(&seed_content)?;
    println!("📋 Found {} tasks to seed", seed_data.tasks.len());

    let today = config::today();
    let mut tasks: Vec<Task> = store.load().await?;

    // Clock ids collide inside a tight loop, so hand them out sequentially
    let mut next_id = next_task_id();
    for seed_task in &seed_data.tasks {
        let task = seed_task.to_task(next_id).normalized(today);
        next_id += 1;

        if task.kind == TaskType::Periodic {
            match crate::convert::convert(&task, &tasks, today) {
                Some(expanded) => {
                    let members = expanded.len() - tasks.len();
                    tasks = expanded;
                    println!("  ✓ Created periodic task: {} ({} occurrences)", task.title, members);
                }
                None => {
                    tasks.push(task.clone());
                    println!("  ✓ Created task: {}", task.title);
                }
            }
        } else {
            tasks.push(task.clone());
            println!("  ✓ Created task: {}", task.title);
        }
    }

    store.save(&tasks).await?;
    println!("✅ Seeding complete!");

    Ok(())
}
