//! FinSage CLI - Budget planning and spending anomaly detection
//!
//! Usage:
//!   finsage budget --income 50000 --savings 10000    Allocate a budget
//!   finsage detect --file ledger.csv --limit 30000   Flag unusual spending
//!   finsage summary --file ledger.csv                Monthly totals
//!   finsage serve --port 3000                        Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use finsage_core::FinanceEngine;
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

    let engine = if cli.offline {
        FinanceEngine::offline()
    } else {
        FinanceEngine::from_env()
    };
    let out = commands::Output::new(cli.json);

    match cli.command {
        Commands::Budget {
            income,
            savings,
            loans,
            history,
            month,
        } => {
            commands::cmd_budget(
                &engine,
                &out,
                income,
                savings,
                loans,
                history.as_deref(),
                month,
            )
            .await
        }
        Commands::Detect {
            ledger,
            limit,
            savings,
            budgets,
        } => commands::cmd_detect(&engine, &out, &ledger, limit, savings, budgets).await,
        Commands::Recommend { ledger, budgets } => {
            commands::cmd_recommend(&engine, &out, &ledger, budgets).await
        }
        Commands::Advise {
            ledger,
            savings,
            limit,
        } => commands::cmd_advise(&engine, &out, &ledger, savings, limit).await,
        Commands::Summary { ledger } => commands::cmd_summary(&out, &ledger),
        Commands::Prompts { action } => match action {
            PromptsAction::List => commands::cmd_prompts_list(),
            PromptsAction::Show { prompt_id } => commands::cmd_prompts_show(&prompt_id),
            PromptsAction::Path => commands::cmd_prompts_path(),
        },
        Commands::Ai { action } => match action {
            AiAction::Test => commands::cmd_ai_test(&engine).await,
        },
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&host, port, no_auth).await,
    }
}
