//! footfall-report - operator CLI for the reporting queries
//!
//! Prints per-business timeseries and lifetime totals, the directory-wide
//! series, and the category distribution. Runs with admin access since it
//! is operator tooling; the role gate it exercises is the same one the
//! dashboard layer goes through.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use footfall_core::db::Database;
use footfall_core::{AccessLevel, Config, Reports};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "footfall-report")]
#[command(about = "Query the analytics rollup store")]
#[command(version)]
struct Args {
    /// Database path (defaults to the XDG data dir)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daily metrics and lifetime totals for one business
    Business {
        /// Business id to report on
        id: String,

        /// Days of history to show
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Directory-wide daily views and clicks
    Global {
        /// Days of history to show
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Listing count per category
    Categories,
    /// Row counts across the store
    Stats,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let db_path = args.db.unwrap_or_else(Config::database_path);
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let reports = Reports::new(&db);

    match args.command {
        Command::Business { id, days } => {
            let series = reports
                .business_timeseries(&id, days)
                .context("failed to load timeseries")?;

            println!("{:<12} {:>8} {:>8} {:>8} {:>10}", "date", "views", "clicks", "shares", "visitors");
            for row in &series {
                println!(
                    "{:<12} {:>8} {:>8} {:>8} {:>10}",
                    row.date.to_string(),
                    row.views,
                    row.clicks,
                    row.shares,
                    row.unique_visitors
                );
            }

            let lifetime = reports
                .business_lifetime(&id)
                .context("failed to load lifetime stats")?;
            println!();
            println!(
                "Lifetime: {} views, {} clicks, {} shares",
                lifetime.views, lifetime.clicks, lifetime.shares
            );
        }
        Command::Global { days } => {
            let series = reports
                .global_timeseries(AccessLevel::Admin, days)
                .context("failed to load global timeseries")?;

            println!("{:<12} {:>8} {:>8}", "date", "views", "clicks");
            for day in &series {
                println!(
                    "{:<12} {:>8} {:>8}",
                    day.date.to_string(),
                    day.views,
                    day.clicks
                );
            }
        }
        Command::Categories => {
            let dist = reports
                .category_distribution(AccessLevel::Admin)
                .context("failed to load category distribution")?;

            let mut categories: Vec<_> = dist.into_iter().collect();
            categories.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

            for (category, count) in categories {
                println!("{:<24} {}", category, count);
            }
        }
        Command::Stats => {
            let stats = db.store_stats().context("failed to load store stats")?;
            println!("Events:        {}", stats.events);
            println!("Daily metrics: {}", stats.daily_metrics);
            println!("Businesses:    {}", stats.businesses);
        }
    }

    Ok(())
}
