//! Tally CLI - Conversational finance tracker
//!
//! Usage:
//!   tally init                 Initialize database
//!   tally serve --port 3000    Start web server and ingestion pipeline
//!   tally summary              Show this month's totals
//!   tally reminders list       List reminders

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db_path = cli.db.clone().unwrap_or_else(commands::default_db_path);

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &db_path,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
        Commands::Status => commands::cmd_status(&db_path, cli.no_encrypt),
        Commands::Summary => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            commands::cmd_summary(&db, &cli.owner)
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            match action {
                None => commands::cmd_transactions_list(&db, &cli.owner, 20),
                Some(TransactionsAction::List { limit }) => {
                    commands::cmd_transactions_list(&db, &cli.owner, limit)
                }
                Some(TransactionsAction::Delete { id }) => {
                    commands::cmd_transactions_delete(&db, &cli.owner, id)
                }
            }
        }
        Commands::Reminders { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            match action {
                None => commands::cmd_reminders_list(&db, &cli.owner, false),
                Some(RemindersAction::List { all }) => {
                    commands::cmd_reminders_list(&db, &cli.owner, all)
                }
                Some(RemindersAction::Add {
                    title,
                    due,
                    amount,
                    category,
                    recur,
                    lead_days,
                    no_notify,
                }) => commands::cmd_reminders_add(
                    &db,
                    &cli.owner,
                    &title,
                    &due,
                    amount,
                    &category,
                    &recur,
                    lead_days,
                    no_notify,
                ),
                Some(RemindersAction::Complete { id }) => commands::cmd_reminders_complete(&db, id),
                Some(RemindersAction::Cancel { id }) => commands::cmd_reminders_cancel(&db, id),
            }
        }
        Commands::Alerts { all } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            commands::cmd_alerts(&db, &cli.owner, all)
        }
        Commands::Reset { soft, yes } => commands::cmd_reset(&db_path, soft, yes, cli.no_encrypt),
    }
}
