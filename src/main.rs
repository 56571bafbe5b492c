use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use sqlx::postgres::PgPoolOptions;

mod db;
mod dispatcher;
mod errors;
mod evaluator;
mod models;
mod monitor;
mod push;
mod report;

use db::{PgNotificationStore, UserBudgets};
use dispatcher::{NotificationDispatcher, PushService};
use monitor::{BudgetMonitor, RepeatPolicy};

#[derive(Parser)]
#[command(name = "budget-alerts")]
#[command(about = "Budget threshold alerts with durable notification records", long_about = None)]
struct Cli {
    /// Append push alerts as JSON lines to this file instead of printing them
    #[arg(long, global = true)]
    push_spool: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample budgets
    Seed,
    /// Import budget snapshots from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Evaluate every budget once and dispatch alerts
    Evaluate {
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Re-evaluate budgets on an interval
    Watch {
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
        /// Only alert when a budget moves into a new band
        #[arg(long)]
        only_transitions: bool,
    },
    /// List stored notifications
    Notifications {
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        unread_only: bool,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = PgNotificationStore::new(pool.clone());

    let push: Arc<dyn PushService> = match &cli.push_spool {
        Some(path) => Arc::new(push::SpoolPushService::new(path)),
        None => Arc::new(push::ConsolePushService),
    };

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            store.seed().await?;
            println!("Seed budgets inserted.");
        }
        Commands::Import { csv } => {
            let upserted = store.import_csv(&csv).await?;
            println!("Upserted {upserted} budgets from {}.", csv.display());
        }
        Commands::Evaluate { user_id } => {
            let mut monitor = build_monitor(&store, push, RepeatPolicy::EveryEvaluation);
            let source = UserBudgets {
                store: store.clone(),
                user_id,
            };
            let summary = monitor.sweep(&source).await?;
            println!(
                "Evaluated {} budgets: {} alerts sent, {} failed.",
                summary.evaluated, summary.notified, summary.failed
            );
        }
        Commands::Watch {
            user_id,
            interval_secs,
            only_transitions,
        } => {
            let policy = if only_transitions {
                RepeatPolicy::OnTransition
            } else {
                RepeatPolicy::EveryEvaluation
            };
            let mut monitor = build_monitor(&store, push, policy);
            if let Some(user) = user_id.as_deref() {
                monitor = monitor.with_badge_user(user);
            }
            let badge = monitor.badge();
            let source = UserBudgets {
                store: store.clone(),
                user_id,
            };

            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                let Some(summary) = monitor.poll(&source).await else {
                    continue;
                };
                info!(
                    "Sweep finished: {} evaluated, {} notified, {} failed, {} unread",
                    summary.evaluated,
                    summary.notified,
                    summary.failed,
                    badge.get()
                );
            }
        }
        Commands::Notifications {
            user_id,
            unread_only,
            limit,
        } => {
            let records = store
                .list_notifications(user_id.as_deref(), unread_only, limit)
                .await?;

            if records.is_empty() {
                println!("No notifications found.");
                return Ok(());
            }

            for record in records.iter() {
                println!(
                    "- [{}] {} {}: {}{}",
                    record.priority,
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.title,
                    record.body,
                    if record.is_read { "" } else { " (unread)" }
                );
            }
        }
        Commands::Report { user_id, out } => {
            let budgets = store.fetch_budgets(user_id.as_deref()).await?;
            let notifications = store
                .list_notifications(user_id.as_deref(), false, 50)
                .await?;
            let report = report::build_report(user_id.as_deref(), &budgets, &notifications);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn build_monitor(
    store: &PgNotificationStore,
    push: Arc<dyn PushService>,
    policy: RepeatPolicy,
) -> BudgetMonitor {
    let store = Arc::new(store.clone());
    let dispatcher = NotificationDispatcher::new(store.clone(), push);
    BudgetMonitor::new(dispatcher, store, policy)
}
