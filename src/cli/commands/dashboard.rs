use clap::Subcommand;
use serde_json::json;

use super::entity::settle;
use crate::api::SummaryStats;
use crate::cli::config::CliContext;
use crate::cli::OutputFormat;
use crate::error::ErrorDescriptor;
use crate::session::DashboardPage;

#[derive(Subcommand)]
pub enum DashboardCommands {
    #[command(about = "Bookings, revenue, occupancy and room categories")]
    Stats,
}

pub async fn handle(
    cmd: DashboardCommands,
    context: &CliContext,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let guard = context.open_page(DashboardPage::Overview)?;

    match cmd {
        DashboardCommands::Stats => {
            let result = context.client.summary_stats().await.map_err(ErrorDescriptor::from);
            let stats = settle(&guard, &output_format, result)?;
            output_stats(&output_format, &stats)
        }
    }
}

fn output_stats(output_format: &OutputFormat, stats: &SummaryStats) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "stats": stats }))?);
        }
        OutputFormat::Text => {
            for line in stats_lines(stats) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn stats_lines(stats: &SummaryStats) -> Vec<String> {
    let mut lines = vec![
        format!("Total bookings\t{}", stats.bookings.total),
        format!("Revenue\t${}", stats.revenue.total),
        format!("Occupancy\t{}%", stats.occupancy_rate),
    ];
    if !stats.revenue.by_month.is_empty() {
        lines.push(String::new());
        lines.push("MONTH\tREVENUE\tOCCUPANCY".to_string());
        let fraction = stats.occupancy_fraction();
        for month in &stats.revenue.by_month {
            lines.push(format!("{}\t{}\t{:.2}", month.month, month.amount, fraction));
        }
    }
    if !stats.category_distribution.is_empty() {
        lines.push(String::new());
        lines.push("CATEGORY\tROOMS".to_string());
        for entry in &stats.category_distribution {
            lines.push(format!("{}\t{}", entry.category, entry.count));
        }
    }
    lines
}
