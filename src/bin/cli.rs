#![cfg(not(tarpaulin_include))]

use clap::{Parser, Subcommand};
use container_dashboard::analysis::{self, RankedSummary, column_title};
use container_dashboard::config::DEFAULT_DATA_PATH;
use container_dashboard::loader;
use container_dashboard::record::{ALL, Party};
use std::path::PathBuf;
use std::process::ExitCode;

/// Print dashboard reports for a shipment spreadsheet.
#[derive(Parser)]
#[command(name = "report", version, about)]
struct Cli {
    /// Shipment spreadsheet (xlsx, xls, ods or csv)
    #[arg(long, env = "DASHBOARD_DATA", default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dataset totals and the container line ranking
    Overview,
    /// Rank exporters or importers by containers
    Rank {
        /// exporter or importer
        #[arg(long, default_value = "exporter", value_parser = parse_party)]
        party: Party,
        #[arg(long, default_value = ALL)]
        category: String,
        #[arg(long, default_value_t = 0)]
        min_containers: u64,
        /// Keep only rows with this business description
        #[arg(long)]
        business: Option<String>,
    },
    /// Drill into one company
    Company {
        #[arg(long, default_value = "exporter", value_parser = parse_party)]
        party: Party,
        name: String,
    },
}

fn parse_party(value: &str) -> Result<Party, String> {
    Party::parse(value).ok_or_else(|| format!("expected exporter or importer, got {}", value))
}

fn print_summary(summary: &RankedSummary, party: Party) {
    if summary.is_empty() {
        println!("(no rows)");
        return;
    }
    let headers: Vec<String> = summary.columns.iter().map(|c| column_title(c, party)).collect();
    println!("{:>5}  {}  {:>10}", "Rank", headers.join(" | "), "Containers");
    for row in &summary.rows {
        let share = row.share.map(|s| format!("  {:>5.1}%", s)).unwrap_or_default();
        println!(
            "{:>5}  {}  {:>10}{}",
            row.rank,
            row.keys.join(" | "),
            row.containers,
            share
        );
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let table = loader::load_dataset(&cli.data)?;
    log::info!("Loaded {} records from {}", table.len(), cli.data.display());

    match cli.command {
        Command::Overview => {
            let overview = analysis::overview(&table);
            println!("Records:         {}", overview.records);
            println!("Exporters:       {}", overview.exporters);
            println!("Importers:       {}", overview.importers);
            println!("Containers:      {}", overview.containers);
            println!("Container lines: {}", overview.container_lines);
            println!();
            print_summary(&overview.line_ranking, Party::Exporter);
        }
        Command::Rank {
            party,
            category,
            min_containers,
            business,
        } => {
            let mut summary = analysis::rank(&table, party, min_containers, &category);
            if let Some(business) = business {
                summary = analysis::business_filter(&summary, &business);
            }
            print_summary(&summary, party);
            println!("Total containers: {}", summary.total_containers());
        }
        Command::Company { party, name } => {
            let profile = analysis::company_profile(&table, party, &name)?;
            println!("{} {}", party.title(), profile.company);
            println!("Category:        {}", profile.category);
            println!("Business:        {}", profile.business);
            println!("Shipments:       {}", profile.records);
            println!("Containers:      {}", profile.containers);
            println!("Partners:        {}", profile.partners);
            println!("Container lines: {}", profile.container_lines);
            println!("\nPartners");
            print_summary(&profile.partner_summary, party);
            println!("\nRoutes");
            print_summary(&profile.route_summary, party);
            println!("\nContainer lines");
            print_summary(&profile.line_summary, party);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
