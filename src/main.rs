use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tv_store::{
    config::Config,
    notifications::NoopNotifier,
    Caller, QueryRequest, ResourceUri, TvStore,
};

const LOGO_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Parser)]
#[command(name = "tv-store")]
#[command(version = "0.1.0")]
#[command(about = "TV channel and program metadata store")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or upgrade the schema and exit
    Migrate,
    /// Remove expired programs and trim the watch log
    Cleanup,
    /// Run a query and print the rows as JSON
    Query {
        uri: String,
        /// Calling application
        #[arg(short, long, default_value = "tv-store-cli")]
        package: String,
        /// Read every application's programs and channels
        #[arg(long)]
        full_access: bool,
    },
    /// Store an image file as a channel logo
    SetLogo {
        channel_id: i64,
        file: PathBuf,
        /// Calling application
        #[arg(short, long)]
        package: String,
        #[arg(long)]
        full_access: bool,
    },
    /// Print the content type of an identifier
    ContentType { uri: String },
}

fn caller(package: String, full_access: bool) -> Caller {
    if full_access {
        Caller::with_full_access(package)
    } else {
        Caller::new(package)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("tv_store={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting TV Store v{}", env!("CARGO_PKG_VERSION"));

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    info!("Using database: {}", config.database.url);

    // Opening the store runs the schema check
    let store = TvStore::open(config, Arc::new(NoopNotifier)).await?;

    match cli.command {
        Command::Migrate => {
            info!("Schema is at version {}", store.schema_version());
        }
        Command::Cleanup => {
            let report = store.cleanup().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Query {
            uri,
            package,
            full_access,
        } => {
            let uri = ResourceUri::parse(&uri)?;
            let rows = store
                .query(&caller(package, full_access), &uri, &QueryRequest::new())
                .await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::SetLogo {
            channel_id,
            file,
            package,
            full_access,
        } => {
            let image = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let uri = ResourceUri::channel_logo(channel_id);
            let mut writer = store.write_logo(&caller(package, full_access), &uri)?;
            writer.write_all(&image, LOGO_CHUNK_SIZE).await?;
            writer.finish().wait().await?;
            info!("Logo for channel {} submitted ({} bytes)", channel_id, image.len());
        }
        Command::ContentType { uri } => {
            let uri = ResourceUri::parse(&uri)?;
            println!("{}", store.content_type(&uri)?);
        }
    }

    store.close().await;
    Ok(())
}
