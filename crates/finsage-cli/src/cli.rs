//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use finsage_core::Month;

/// FinSage - Budget planning and spending anomaly detection
#[derive(Parser)]
#[command(name = "finsage")]
#[command(about = "Budget allocation, anomaly detection and spending advice", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip the AI backend and use the deterministic rules only
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Ledger file and month shared by the ledger-driven commands
#[derive(clap::Args, Debug, Clone)]
pub struct LedgerArgs {
    /// Transaction CSV (date,amount,category,description,transaction_type)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Month to analyse as YYYY-MM (defaults to the newest month in the file)
    #[arg(short, long)]
    pub month: Option<Month>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Allocate spendable income across the budget categories
    Budget {
        /// Monthly income
        #[arg(long)]
        income: f64,

        /// Amount to set aside as savings
        #[arg(long, default_value_t = 0.0)]
        savings: f64,

        /// Fixed loan repayments
        #[arg(long, default_value_t = 0.0)]
        loans: f64,

        /// Ledger CSV whose monthly category totals inform the allocation
        #[arg(long)]
        history: Option<PathBuf>,

        /// Month of the ledger to use as history (defaults to the newest)
        #[arg(short, long, requires = "history")]
        month: Option<Month>,
    },

    /// Flag unusual spending for a month of the ledger
    Detect {
        #[command(flatten)]
        ledger: LedgerArgs,

        /// Overall monthly spending limit
        #[arg(long)]
        limit: f64,

        /// Savings target for the month
        #[arg(long, default_value_t = 0.0)]
        savings: f64,

        /// Category budget as Category=amount (repeatable)
        #[arg(long = "budget", value_parser = parse_category_amount)]
        budgets: Vec<(String, f64)>,
    },

    /// Suggest spending adjustments for a month of the ledger
    Recommend {
        #[command(flatten)]
        ledger: LedgerArgs,

        /// Category budget as Category=amount (repeatable)
        #[arg(long = "budget", value_parser = parse_category_amount)]
        budgets: Vec<(String, f64)>,
    },

    /// Write short financial advice for a month of the ledger
    Advise {
        #[command(flatten)]
        ledger: LedgerArgs,

        /// Savings target for the month
        #[arg(long, default_value_t = 0.0)]
        savings: f64,

        /// Overall monthly spending limit (runs anomaly detection first)
        #[arg(long)]
        limit: Option<f64>,
    },

    /// Show monthly totals for the ledger
    Summary {
        #[command(flatten)]
        ledger: LedgerArgs,
    },

    /// Manage AI prompts
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },

    /// AI backend commands
    Ai {
        #[command(subcommand)]
        action: AiAction,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (e.g., budget_plan, detect_anomalies)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}

#[derive(Subcommand)]
pub enum AiAction {
    /// Check the configured backend and run one budget request through it
    Test,
}

/// Parse `Category=amount`
pub fn parse_category_amount(value: &str) -> Result<(String, f64), String> {
    let (category, amount) = value
        .split_once('=')
        .ok_or_else(|| format!("expected Category=amount, got '{}'", value))?;

    let category = category.trim();
    if category.is_empty() {
        return Err(format!("missing category in '{}'", value));
    }

    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount in '{}'", value))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("amount must be non-negative in '{}'", value));
    }

    Ok((category.to_string(), amount))
}
