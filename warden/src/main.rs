use std::path::PathBuf;
use clap::{Parser, Subcommand};
use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warden::api::{ApiServer, ApiServerConfig};
use warden::cli::{build_runtime, set_settings, show_settings};
use warden_settings::SettingsUpdate;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "System settings service with request-scoped caching", long_about = None)]
struct Cli {
    /// JSON file holding the settings record (defaults to WARDEN_SETTINGS_FILE, else memory)
    #[arg(short, long, global = true)]
    settings_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect or change the system settings directly
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings, read straight from the store
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one or more settings
    Set {
        #[arg(long)]
        max_upload_mb: Option<u32>,

        #[arg(long)]
        enable_deduplication: Option<bool>,

        #[arg(long)]
        enable_jira: Option<bool>,

        #[arg(long)]
        enable_product_grade: Option<bool>,

        #[arg(long)]
        enable_user_profile_editable: Option<bool>,

        #[arg(long)]
        time_zone: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warden=info,warden_settings=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let runtime = build_runtime(cli.settings_file)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = ApiServerConfig::default();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            ApiServer::new(config, runtime).start().await?;
        }

        Commands::Settings { action } => match action {
            SettingsAction::Show { json } => {
                println!("{}", show_settings(&runtime, json).await?);
            }

            SettingsAction::Set {
                max_upload_mb,
                enable_deduplication,
                enable_jira,
                enable_product_grade,
                enable_user_profile_editable,
                time_zone,
            } => {
                let update = SettingsUpdate {
                    max_upload_mb,
                    enable_deduplication,
                    enable_jira,
                    enable_product_grade,
                    enable_user_profile_editable,
                    time_zone,
                };
                println!("{}", set_settings(&runtime, update).await?);
            }
        },
    }

    Ok(())
}
