use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;

use jobfeed::app::{build_http_client, build_jobs_client, App, AppEvent};
use jobfeed::config::Config;
use jobfeed::job::FeedAggregator;
use jobfeed::storage::{BookmarkStore, Database, DatabaseError};
use jobfeed::ui;

/// Get the config directory path (~/.config/jobfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("jobfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "jobfeed", about = "Browse job listings and keep local bookmarks")]
struct Args {
    /// Config file (default: ~/.config/jobfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listing endpoint, overrides `api_url` from the config file
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Reset database (delete and recreate). Removes all bookmarks.
    #[arg(long)]
    reset_db: bool,

    /// Write bookmarks to FILE as JSON and exit
    #[arg(long, value_name = "FILE")]
    export_bookmarks: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interleave with the shell on stdout
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }

    let db_path = config_dir.join("jobs.db");
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of jobfeed appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };
    let store = BookmarkStore::new(db);

    if let Some(path) = &args.export_bookmarks {
        let count = store
            .export_to(path)
            .await
            .with_context(|| format!("Failed to export bookmarks to '{}'", path.display()))?;
        println!("Exported {} bookmarks to {}", count, path.display());
        return Ok(());
    }

    let http = build_http_client(config.request_timeout()).context("Failed to build HTTP client")?;
    let client = build_jobs_client(&config, http)?;
    tracing::info!(api_url = %client.api_url(), "Starting");

    let feed = FeedAggregator::new()
        .with_policy(config.stale_policy())
        .with_max_items(config.max_feed_items);
    let mut app = App::new(client, store, feed);

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    println!("Type 'help' for commands.");
    ui::run(&mut app, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
