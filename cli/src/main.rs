use std::fs;
use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;

use stacks_kernel::catalog::date::{current_date, format_date, parse_date};
use stacks_kernel::catalog::{Patron, Title};
use stacks_kernel::engine::{CirculationEngine, Outcome, Request};
use stacks_kernel::notify::{AvailabilityNotice, MemoryDispatcher};
use stacks_kernel::policy::CirculationConfig;

/// Stacks Circulation CLI
#[derive(Parser, Debug)]
#[command(name = "stacks")]
#[command(about = "Library circulation engine driver", long_about = None)]
struct Cli {
    /// Path to title records JSON
    #[arg(long)]
    titles: String,

    /// Path to patron records JSON
    #[arg(long)]
    patrons: String,

    /// Path to request batch JSON
    #[arg(long)]
    requests: String,

    /// Path to engine config JSON
    #[arg(long)]
    config: Option<String>,

    /// Current date override, DD/MM/YYYY
    #[arg(long, value_parser = parse_today)]
    today: Option<NaiveDate>,

    /// Append availability notifications to this file
    #[arg(long)]
    notify_log: Option<String>,
}

fn parse_today(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).map_err(|e| e.to_string())
}

/// Per-request entry in the JSON report
#[derive(Debug, Serialize)]
struct RequestResult {
    request: usize,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Wrapper for JSON output
#[derive(Debug, Serialize)]
struct CliOutput {
    today: String,
    results: Vec<RequestResult>,
    notifications: Vec<AvailabilityNotice>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ----------------------------
    // Load config
    // ----------------------------
    let config = if let Some(path) = cli.config {
        let data = fs::read_to_string(path)?;
        serde_json::from_str::<CirculationConfig>(&data)?
    } else {
        CirculationConfig::default()
    };

    // ----------------------------
    // Load records
    // ----------------------------
    let mut engine = CirculationEngine::new(config);

    let titles_data = fs::read_to_string(&cli.titles)?;
    let titles: Vec<Title> = serde_json::from_str(&titles_data)?;
    for title in titles {
        engine.add_title(title);
    }

    let patrons_data = fs::read_to_string(&cli.patrons)?;
    let patrons: Vec<Patron> = serde_json::from_str(&patrons_data)?;
    for patron in patrons {
        engine.register_patron(patron);
    }

    let requests_data = fs::read_to_string(&cli.requests)?;
    let requests: Vec<Request> = serde_json::from_str(&requests_data)?;

    // ----------------------------
    // Resolve "today"
    // ----------------------------
    let today = current_date(cli.today);

    // ----------------------------
    // Run the batch
    // ----------------------------
    let mut dispatcher = MemoryDispatcher::new();
    let mut results = Vec::with_capacity(requests.len());

    for (index, request) in requests.iter().enumerate() {
        match engine.execute(request, today, &mut dispatcher) {
            Ok(outcome) => results.push(RequestResult {
                request: index,
                status: "ok",
                outcome: Some(outcome),
                error: None,
            }),
            Err(err) => results.push(RequestResult {
                request: index,
                status: "error",
                outcome: None,
                error: Some(err.to_string()),
            }),
        }
    }

    // ----------------------------
    // Append notification log
    // ----------------------------
    if let Some(path) = cli.notify_log {
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        for notice in &dispatcher.notices {
            writeln!(
                file,
                "[{}] NOTIFICATION: title {} available ({} copies) for patron {}",
                format_date(notice.timestamp),
                notice.catalog_id.0,
                notice.available_copies,
                notice.patron_id.0
            )?;
        }
    }

    // ----------------------------
    // Output
    // ----------------------------
    let output = CliOutput {
        today: format_date(today),
        results,
        notifications: dispatcher.notices,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
