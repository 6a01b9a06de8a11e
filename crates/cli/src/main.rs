//! moltpilot CLI: the main entry point.
//!
//! Commands:
//! - `serve`     : HTTP gateway plus scheduled engagement and heartbeat
//! - `engage`    : One engagement run over a post's comments
//! - `preview`   : Draft a post from the feed
//! - `publish`   : Publish a draft file
//! - `thread`    : Print a post's thread snapshot
//! - `join`      : Run the join flow
//! - `heartbeat` : Run one heartbeat check
//! - `status`    : Show configuration, credential and recent engagement
//! - `credential`: Store the platform API key

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "moltpilot",
    about = "An LLM agent for the Moltbook platform",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to ~/.moltpilot/config.toml)
    #[arg(short, long, global = true, env = "MOLTPILOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway and the background scheduler
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Reply once to every new top-level comment on a post
    Engage {
        /// Post to engage (defaults to engagement.post_id)
        #[arg(long)]
        post_id: Option<String>,
    },

    /// Draft a post from a feed page
    Preview {
        /// Community to read (global feed when omitted)
        #[arg(long)]
        submolt: Option<String>,

        /// Posts to read (1-50, 15 when omitted)
        #[arg(long, default_value_t = 0)]
        take: i64,

        /// Extra context for the draft
        #[arg(long, default_value = "")]
        context: String,
    },

    /// Publish a draft file (first line is the title)
    Publish {
        #[arg(long)]
        submolt: Option<String>,

        #[arg(long)]
        file: PathBuf,
    },

    /// Print a post's thread snapshot as JSON
    Thread {
        #[arg(long)]
        post_id: Option<String>,
    },

    /// Register with the platform by following its skill document
    Join,

    /// Run one heartbeat check
    Heartbeat,

    /// Show configuration, credential and recent engagement
    Status,

    /// Manage the stored credential
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },
}

#[derive(Subcommand)]
enum CredentialAction {
    /// Store the platform API key
    Set {
        #[arg(long, env = "MOLTPILOT_API_KEY", hide_env_values = true)]
        api_key: String,

        #[arg(long)]
        handle: Option<String>,

        #[arg(long)]
        claim_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Engage { post_id } => commands::engage::run(config, post_id).await?,
        Commands::Preview {
            submolt,
            take,
            context,
        } => commands::preview::run(config, submolt, take, context).await?,
        Commands::Publish { submolt, file } => {
            commands::publish::run(config, submolt, file).await?
        }
        Commands::Thread { post_id } => commands::thread::run(config, post_id).await?,
        Commands::Join => commands::join::run(config).await?,
        Commands::Heartbeat => commands::heartbeat::run(config).await?,
        Commands::Status => commands::status::run(config).await?,
        Commands::Credential { action } => match action {
            CredentialAction::Set {
                api_key,
                handle,
                claim_url,
            } => commands::credential::set(config, api_key, handle, claim_url).await?,
        },
    }

    Ok(())
}
