use anyhow::Result;
use clap::{Parser, Subcommand};
use lexvox::config::load_config;
use lexvox::preferences::{self, PreferencesUpdate};
use lexvox::scenario::Scenario;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

use commands::redact::{DisplaySize, Drag};
use commands::Context;

#[derive(Parser)]
#[command(name = "lexvox")]
#[command(about = "Practice legal consultations with a live AI assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live consultation; type to talk, /end to finish
    Live {
        /// Consultation scenario (defaults to the saved preference)
        #[arg(long)]
        scenario: Option<Scenario>,
        /// Language code, e.g. en, es, fr
        #[arg(long)]
        locale: Option<String>,
        /// Text only, do not open the microphone
        #[arg(long)]
        no_mic: bool,
    },
    /// Browse saved sessions
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Black out regions of an image before attaching it
    Redact {
        /// Data URL, remote URL or local path; tried in that order
        #[arg(required = true)]
        sources: Vec<String>,
        /// Size the image is displayed at, WxH; defaults to native size
        #[arg(long)]
        display: Option<DisplaySize>,
        /// Drag in display coordinates, x,y,x2,y2 (repeatable)
        #[arg(long = "rect")]
        rects: Vec<Drag>,
        /// Output file; defaults to redacted_<name> in the current directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List recently attached files
    Uploads,
    /// Show or change saved preferences
    Prefs {
        /// Default language code
        #[arg(long)]
        locale: Option<String>,
        /// Default consultation scenario
        #[arg(long)]
        scenario: Option<Scenario>,
        /// Directory for history and recent uploads
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Directory for markdown exports
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List saved sessions, newest first
    List,
    /// Print a session with its analysis
    Show { id: String },
    /// Delete a session
    Remove { id: String },
    /// Write a session report as markdown
    Export {
        id: String,
        /// Target directory; defaults to Documents/Lexvox/sessions
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables from .env file
    if dotenvy::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }

    let cli = Cli::parse();
    let ctx = Context {
        config: load_config()?,
        prefs: preferences::load_preferences(),
    };

    match cli.command {
        Commands::Live {
            scenario,
            locale,
            no_mic,
        } => commands::live::run(&ctx, scenario, locale, !no_mic).await?,
        Commands::History { action } => match action {
            HistoryAction::List => commands::history::list(&ctx)?,
            HistoryAction::Show { id } => commands::history::show(&ctx, &id)?,
            HistoryAction::Remove { id } => commands::history::remove(&ctx, &id)?,
            HistoryAction::Export { id, dir } => commands::history::export(&ctx, &id, dir)?,
        },
        Commands::Redact {
            sources,
            display,
            rects,
            out,
        } => commands::redact::run(&ctx, &sources, display, &rects, out).await?,
        Commands::Uploads => commands::uploads::list(&ctx)?,
        Commands::Prefs {
            locale,
            scenario,
            data_dir,
            export_dir,
        } => {
            let update = PreferencesUpdate {
                locale,
                scenario,
                data_location: data_dir,
                export_location: export_dir,
            };
            commands::prefs::run(&ctx, update)?
        }
    }

    Ok(())
}
