use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use outreach_core::models::ProspectFilter;
use outreach_core::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use outreach::api::{self, AppState};
use outreach::config::Settings;
use outreach::import::{export_prospects, import_prospects};
use outreach::mail::SendGridMailer;
use outreach::mcp;
use outreach::sequencer::Sequencer;

#[derive(Parser)]
#[command(name = "outreach")]
#[command(about = "Cold-email outreach sequencer with funnel tracking")]
struct Cli {
    /// SQLite database file (defaults to the platform data directory)
    #[arg(long, global = true, env = "OUTREACH_DB")]
    db: Option<PathBuf>,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Start MCP server via stdio
    Mcp,
    /// Run one campaign batch and exit (for cron)
    Campaign,
    /// Import prospects from a CSV file
    Import {
        /// CSV file with at least an `email` column
        file: PathBuf,
    },
    /// Export prospects as CSV
    Export {
        /// all, not_contacted, contacted, replied, demo_booked or clients
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn open_database(path: Option<&PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path)
            .with_context(|| format!("opening database at {}", path.display()))?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn build_sequencer(db: &Database, settings: &Settings) -> Sequencer {
    Sequencer::new(
        Arc::new(db.clone()),
        Arc::new(SendGridMailer::new(settings)),
        settings.sequencer_config(),
    )
}

async fn serve(db: Database, settings: Settings, host: &str, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting outreach server on port {}", port);
    settings.batch_criteria()?;

    let sequencer = build_sequencer(&db, &settings);
    let app = api::create_router(AppState {
        db,
        sequencer,
        settings: Arc::new(settings),
    });

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("Outreach server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "outreach=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let db = open_database(cli.db.as_ref())?;
    let settings = cli.settings;

    match cli.command {
        Some(Commands::Serve { port, host }) => serve(db, settings, &host, port).await?,
        Some(Commands::Mcp) => {
            let sequencer = build_sequencer(&db, &settings);
            mcp::run_stdio_server(db, sequencer).await?;
        }
        Some(Commands::Campaign) => {
            let sequencer = build_sequencer(&db, &settings);
            let report = sequencer.run_batch(&settings.batch_criteria()?).await?;
            tracing::info!(
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped,
                "{}",
                report.message
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Commands::Import { file }) => {
            let reader = File::open(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            let report = import_prospects(&db, BufReader::new(reader))?;
            println!(
                "Imported {} new, merged {} duplicates, skipped {} invalid rows",
                report.imported, report.duplicates, report.invalid
            );
        }
        Some(Commands::Export { filter, output }) => {
            let filter = ProspectFilter::from_str(&filter)
                .with_context(|| format!("unknown filter '{}'", filter))?;
            let written = match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    export_prospects(&db, filter, file)?
                }
                None => {
                    let stdout = io::stdout();
                    let mut lock = stdout.lock();
                    let n = export_prospects(&db, filter, &mut lock)?;
                    lock.flush()?;
                    n
                }
            };
            tracing::info!("Exported {} prospects", written);
        }
        None => serve(db, settings, "127.0.0.1", 3000).await?,
    }

    Ok(())
}
