mod commands;
mod localizer;

use clap::{Parser, Subcommand};
use pagelocale_core::{
    config,
    traits::{PreferenceStore, TableSource},
};
use pagelocale_sources::build_source;
use pagelocale_store::{MemoryPreferenceStore, SqlitePreferenceStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use localizer::Localizer;

#[derive(Parser)]
#[command(
    name = "pagelocale",
    version,
    about = "Translate marked page elements from a language table"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "pagelocale.toml")]
    config: String,

    /// Keep the language preference in memory only.
    #[arg(long)]
    no_persist: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the stored language (or the default) to a page.
    Load {
        page: PathBuf,
        /// Write the translated page here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Switch to a language and apply it to a page.
    Apply {
        lang: String,
        page: PathBuf,
        /// Write the translated page here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show the stored language and the active configuration.
    Status,
    /// List the languages in the translation table.
    Languages,
    /// List marked keys in a page that have no translation in a language.
    Audit { lang: String, page: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    // Logs go to stderr; stdout carries the translated page.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.locale.log_level)),
        )
        .init();

    let store: Arc<dyn PreferenceStore> = if cli.no_persist {
        Arc::new(MemoryPreferenceStore::new())
    } else {
        Arc::new(SqlitePreferenceStore::new(&cfg.store).await?)
    };
    let source: Arc<dyn TableSource> = Arc::from(build_source(&cfg.source)?);
    let localizer = Localizer::new(store, source, cfg.locale.clone());

    match cli.command {
        Commands::Load { page, out } => {
            let (report, html) = commands::handle_load(&localizer, &page, out.as_deref()).await?;
            info!("{}", commands::format_report(&report));
            if let Some(html) = html {
                print!("{html}");
            }
        }
        Commands::Apply { lang, page, out } => {
            let (report, html) =
                commands::handle_apply(&localizer, &lang, &page, out.as_deref()).await?;
            info!("{}", commands::format_report(&report));
            if let Some(html) = html {
                print!("{html}");
            }
        }
        Commands::Status => {
            println!("{}", commands::handle_status(&localizer).await?);
        }
        Commands::Languages => {
            println!("{}", commands::handle_languages(&localizer).await?);
        }
        Commands::Audit { lang, page } => {
            println!("{}", commands::handle_audit(&localizer, &lang, &page).await?);
        }
    }

    Ok(())
}
