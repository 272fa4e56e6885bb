//! Mimic CLI — the main entry point.
//!
//! Commands:
//! - `onboard`   — Write the default config
//! - `personas`  — List the personas found in a transcript
//! - `chat`      — Chat with a persona from a transcript
//! - `convert`   — Turn a WhatsApp `.txt` export into JSON
//! - `doctor`    — Diagnose config and API key setup

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "mimic",
    about = "Mimic — reply in the voice of anyone from your chat history",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// List the personas in a transcript
    Personas {
        /// Transcript JSON export
        transcript: PathBuf,
    },

    /// Chat with a persona
    Chat {
        /// Transcript JSON export to load before chatting
        transcript: Option<PathBuf>,

        /// Persona to emulate
        #[arg(short, long)]
        persona: Option<String>,
    },

    /// Convert a WhatsApp text export to JSON
    Convert {
        /// WhatsApp `.txt` export
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the nested date → time → messages form
        #[arg(long)]
        nested: bool,
    },

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Personas { transcript } => commands::personas::run(&transcript).await?,
        Commands::Chat {
            transcript,
            persona,
        } => commands::chat::run(transcript, persona).await?,
        Commands::Convert {
            input,
            output,
            nested,
        } => commands::convert::run(&input, output.as_deref(), nested).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
