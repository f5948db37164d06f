pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "venue-admin")]
#[command(about = "Venue Admin CLI - migrations, development tokens and scope inspection")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Issue a bearer token for an admin (development use)")]
    Token {
        #[arg(long, help = "Admin id the token is issued for")]
        admin: Uuid,
        #[arg(long, default_value = "dev@localhost", help = "Email carried in the token")]
        email: String,
    },

    #[command(about = "Print the tier and scope resolved for an admin")]
    Scope {
        #[arg(long, help = "Admin id to inspect")]
        admin: Uuid,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
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

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Token { admin, email } => commands::token::handle(admin, email, output_format),
        Commands::Scope { admin } => commands::scope::handle(admin, output_format).await,
    }
}
