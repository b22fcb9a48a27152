//! Products Showcase CLI - migrations and settings management.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! showcase-cli migrate
//!
//! # Inspect stored settings (secrets redacted)
//! showcase-cli settings show
//!
//! # Set UTM parameters appended to product links
//! showcase-cli settings set-utm --source blog --medium referral
//!
//! # Change how long Shopify data is cached
//! showcase-cli settings set-cache-duration 7200
//!
//! # Re-detect the Admin API version
//! showcase-cli api-version refresh
//!
//! # Remove every stored setting
//! showcase-cli reset --yes
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "showcase-cli")]
#[command(author, version, about = "Products Showcase CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Manage the Shopify Admin API version
    ApiVersion {
        #[command(subcommand)]
        action: ApiVersionAction,
    },
    /// Remove every stored setting, credentials included
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print stored settings with secrets redacted
    Show,
    /// Set UTM parameters (empty values clear them)
    SetUtm {
        #[arg(long, default_value = "")]
        source: String,
        #[arg(long, default_value = "")]
        medium: String,
        #[arg(long, default_value = "")]
        campaign: String,
    },
    /// Set the cache duration in seconds
    SetCacheDuration {
        /// One of 900, 1800, 3600, 7200, 21600, 43200, 86400
        seconds: u64,
    },
}

#[derive(Subcommand)]
enum ApiVersionAction {
    /// Detect and store the newest supported version
    Refresh,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Settings { action } => match action {
            SettingsAction::Show => commands::settings::show().await?,
            SettingsAction::SetUtm {
                source,
                medium,
                campaign,
            } => commands::settings::set_utm(&source, &medium, &campaign).await?,
            SettingsAction::SetCacheDuration { seconds } => {
                commands::settings::set_cache_duration(seconds).await?;
            }
        },
        Commands::ApiVersion { action } => match action {
            ApiVersionAction::Refresh => commands::settings::refresh_api_version().await?,
        },
        Commands::Reset { yes } => commands::settings::reset(yes).await?,
    }
    Ok(())
}
