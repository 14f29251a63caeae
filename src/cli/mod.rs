pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "hotel-admin")]
#[command(about = "Hotel admin CLI - dashboard, staff, rooms, services and audit logs")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Login, logout and session status")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Dashboard overview")]
    Dashboard {
        #[command(subcommand)]
        cmd: commands::dashboard::DashboardCommands,
    },

    #[command(about = "Staff management")]
    Staff {
        #[command(subcommand)]
        cmd: commands::entity::StaffCommands,
    },

    #[command(about = "Room management")]
    Rooms {
        #[command(subcommand)]
        cmd: commands::entity::EntityCommands,
    },

    #[command(about = "Service management")]
    Services {
        #[command(subcommand)]
        cmd: commands::entity::EntityCommands,
    },

    #[command(about = "System audit logs")]
    Logs {
        #[command(subcommand)]
        cmd: commands::entity::LogCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let context = config::CliContext::load()?;

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &context, output_format).await,
        Commands::Dashboard { cmd } => commands::dashboard::handle(cmd, &context, output_format).await,
        Commands::Staff { cmd } => commands::entity::handle_staff(cmd, &context, output_format).await,
        Commands::Rooms { cmd } => {
            commands::entity::handle::<crate::entity::Room>(cmd, &context, output_format).await
        }
        Commands::Services { cmd } => {
            commands::entity::handle::<crate::entity::Service>(cmd, &context, output_format).await
        }
        Commands::Logs { cmd } => commands::entity::handle_logs(cmd, &context, output_format).await,
    }
}
