//! # Seed Data Generator
//!
//! Populates a database with demo notes and prints the first page back.
//!
//! ## Usage
//! ```bash
//! # 200 notes into $DBUTIL_DATABASE_URL (default ./dbutil.db)
//! cargo run -p dbutil-sql --bin seed
//!
//! # Custom amount and path
//! cargo run -p dbutil-sql --bin seed -- --count 1000 --db ./data/notes.db
//! ```
//!
//! Set `RUST_LOG=dbutil_sql=debug` to see every generated statement.

use std::env;

use chrono::{DateTime, Utc};
use dbutil_core::entity::{Column, ColumnType};
use dbutil_core::{Entity, ListOptions, SearchOptions, Value};
use dbutil_sql::{Database, DbConfig, Record, Schema};
use tracing_subscriber::EnvFilter;

const AUTHORS: &[&str] = &["ada", "grace", "linus", "barbara", "ken"];

const TOPICS: &[&str] = &[
    "pool sizing",
    "index layout",
    "query plans",
    "page cache",
    "write-ahead log",
    "vacuum",
    "foreign keys",
];

/// Demo entity stored in the `note` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct Note {
    id: i64,
    title: String,
    author: String,
    stars: i64,
    created_at: DateTime<Utc>,
}

impl Entity for Note {
    const NAME: &'static str = "Note";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", ColumnType::Integer).primary_key().auto_increment(),
            Column::new("title", ColumnType::Text),
            Column::new("author", ColumnType::Text),
            Column::new("stars", ColumnType::Integer),
            Column::new("created_at", ColumnType::Timestamp),
        ];
        COLUMNS
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.title.as_str().into(),
            self.author.as_str().into(),
            self.stars.into(),
            self.created_at.into(),
        ]
    }
}

impl Record for Note {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut count: usize = 200;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("dbutil seed data generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of notes to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: $DBUTIL_DATABASE_URL)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => DbConfig::from_env()?,
    };
    println!("Database: {}", config.database_url);
    println!("Notes:    {}", count);
    println!();

    let db = Database::must_connect(config).await;
    db.must_migrate(&Schema::new().register::<Note>()).await;
    println!("✓ Connected and schema synchronized");

    let notes = db.repository::<Note>();
    let existing = notes.count().await?;
    if existing > 0 {
        println!("⚠ Table already has {} notes, skipping seed", existing);
    } else {
        let start = std::time::Instant::now();
        let mut tx = db.begin().await?;
        for seed in 0..count {
            notes.tx_create(&generate_note(seed), Some(&mut tx)).await?;
        }
        tx.commit().await?;
        println!("✓ Generated {} notes in {:?}", count, start.elapsed());
    }

    println!();
    let page = notes
        .find_by_page(&ListOptions::new(1, 5).desc(Some("stars")))
        .await?;
    println!("Top notes ({} total, {} pages):", page.total, page.total_pages());
    for note in &page.items {
        println!("  #{:<5} {:>3}★  {} by {}", note.id, note.stars, note.title, note.author);
    }

    let ada = notes
        .first_with(&SearchOptions::default().with("author", "ada"))
        .await?;
    println!();
    println!("First note by ada: {:?}", ada.map(|n| n.title));

    db.close().await;
    Ok(())
}

/// Logs go to stderr; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dbutil_sql=info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn generate_note(seed: usize) -> Note {
    let topic = TOPICS[seed % TOPICS.len()];
    Note {
        id: 0,
        title: format!("Notes on {} #{}", topic, seed),
        author: AUTHORS[(seed * 7) % AUTHORS.len()].to_string(),
        stars: ((seed * 37) % 100) as i64,
        created_at: Utc::now(),
    }
}
