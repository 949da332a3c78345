//! Onboard CLI
//!
//! Fill in the sections of an onboarding form from the terminal. Drafts are
//! kept locally between runs and synced to the onboarding backend on demand.

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use onboard_client::OnboardClient;
use onboard_core::{Section, SessionToken};
use onboard_state::DraftStore;
use onboard_state_file::FileDraftStore;
use onboard_state_memory::MemoryDraftStore;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use crate::commands::App;
use crate::config::OnboardConfig;

/// Onboard CLI: fill in and submit onboarding form sections.
#[derive(Parser, Debug)]
#[command(name = "onboard", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        env = "ONBOARD_CONFIG",
        default_value = "onboard.toml",
        global = true
    )]
    config: PathBuf,

    /// Onboarding backend URL. Overrides `api.base_url`.
    #[arg(long, env = "ONBOARD_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// API key for authentication. Overrides `api.api_key`.
    #[arg(long, env = "ONBOARD_API_KEY", global = true)]
    api_key: Option<String>,

    /// Session token from the onboarding link.
    #[arg(long, env = "ONBOARD_TOKEN", global = true)]
    token: Option<String>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a section, merging server records into the local draft.
    Open {
        /// Section name.
        section: Section,
    },
    /// Edit fields of a record in the local draft.
    Set(commands::edit::SetArgs),
    /// Mark a record as a copy of another one.
    Mirror(commands::edit::MirrorArgs),
    /// Show what a sync would do, without calling the server.
    Status(commands::status::StatusArgs),
    /// Save a section to the server.
    Sync(commands::sync::SyncArgs),
    /// Show every section and whether it is ready for submission.
    Preview(commands::preview::PreviewArgs),
    /// Submit the completed onboarding form.
    Submit,
    /// List active countries.
    Countries,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = OnboardConfig::load(&cli.config)?;
    debug!(config = %cli.config.display(), "configuration loaded");

    let base_url = cli.endpoint.as_deref().unwrap_or(&config.api.base_url);
    let mut builder = OnboardClient::builder(base_url)
        .timeout(config.api.timeout())
        .routes(config.routes.clone());
    if let Some(key) = cli.api_key.as_ref().or(config.api.api_key.as_ref()) {
        builder = builder.api_key(key);
    }
    let client = Arc::new(builder.build()?);

    let store: Arc<dyn DraftStore> = match config.storage.backend.as_str() {
        "memory" => Arc::new(MemoryDraftStore::new()),
        "file" => Arc::new(FileDraftStore::new(&config.storage.directory)),
        other => anyhow::bail!("unknown storage backend: {other}"),
    };

    let app = App {
        client,
        store,
        token: cli.token.map(SessionToken::from),
        debounce: config.sync.debounce(),
        format: cli.format,
    };

    match cli.command {
        Command::Open { section } => commands::open::run(&app, section).await,
        Command::Set(args) => commands::edit::run_set(&app, &args).await,
        Command::Mirror(args) => commands::edit::run_mirror(&app, &args).await,
        Command::Status(args) => commands::status::run(&app, &args).await,
        Command::Sync(args) => commands::sync::run(&app, &args).await,
        Command::Preview(args) => commands::preview::run(&app, &args).await,
        Command::Submit => commands::submit::run(&app).await,
        Command::Countries => commands::countries::run(&app).await,
    }
}
