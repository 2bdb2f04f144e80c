//! CLI entry point for folio

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "A Markdown blog content service with password-protected posts", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the content directory into the post snapshot
    #[command(alias = "b")]
    Build,

    /// Validate every post and report all frontmatter problems
    Check,

    /// List posts
    List {
        /// Include unlisted, private and protected posts
        #[arg(short, long)]
        all: bool,
    },

    /// Start the API server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Read posts from the content directory instead of the snapshot
        #[arg(long)]
        live: bool,

        /// Evict cached posts when content changes (with --live)
        #[arg(short, long)]
        watch: bool,
    },

    /// Remove the post snapshot
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "folio=debug,info"
    } else {
        "folio=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };

    match cli.command {
        Commands::Build => {
            let site = folio::Folio::new(&base_dir)?;
            tracing::info!("Building snapshot from {:?}", site.posts_root);
            let report = site.build().await?;
            println!(
                "Wrote {} posts to {}",
                report.written,
                report.snapshot_path.display()
            );
            if !report.skipped.is_empty() {
                println!("Skipped: {}", report.skipped.join(", "));
            }
        }

        Commands::Check => {
            let site = folio::Folio::new(&base_dir)?;
            folio::commands::check::run(&site).await?;
        }

        Commands::List { all } => {
            let site = folio::Folio::new(&base_dir)?;
            folio::commands::list::run(&site, all).await?;
        }

        Commands::Serve {
            port,
            ip,
            live,
            watch,
        } => {
            let site = folio::Folio::new(&base_dir)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            folio::server::start(
                &site,
                folio::server::ServeOptions {
                    ip,
                    port,
                    live,
                    watch,
                },
            )
            .await?;
        }

        Commands::Clean => {
            let site = folio::Folio::new(&base_dir)?;
            tracing::info!("Cleaning build artifacts...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("folio version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
