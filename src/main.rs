//! esdump
//!
//! Streams every document matching an Elasticsearch query to stdout as JSON
//! lines. Logs and the optional progress bar go to stderr, so the output can
//! be piped straight into other tools.
//!
//! # Usage
//!
//! ```bash
//! # First page only
//! esdump -u http://localhost:9200 -i logs
//!
//! # Everything, in four concurrent slices
//! esdump -u http://localhost:9200 -i logs -q '{"query":{"match_all":{}}}' -a -s 4 > logs.ndjson
//! ```

use tokio::io::BufWriter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use esdump::Result;
use esdump::cli::CliInterface;
use esdump::export;

/// Application entry point
#[tokio::main]
async fn main() {
    // Initialize the application and handle any errors
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Print a completion script, or run the fetch
///
/// # Returns
/// * `Result<()>` - Success or error
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_completion() {
        return Ok(());
    }

    run_fetch(&cli).await
}

/// Run the fetch and stream hits to stdout
async fn run_fetch(cli: &CliInterface) -> Result<()> {
    let request = cli.fetch_request()?;
    let store_url = cli.store_url()?;

    debug!(
        "Fetching from {} index={} fetch_all={} slices={}",
        store_url, request.index, request.fetch_all, request.slices
    );

    let cancel_token = CancellationToken::new();
    let ctrl_c_handle = spawn_interrupt_listener(cancel_token.clone());

    let coordinator = export::coordinator_for(store_url, cli.credentials(), cli.config())?
        .with_cancellation(cancel_token);
    let result = coordinator
        .run(&request, BufWriter::new(tokio::io::stdout()))
        .await;

    ctrl_c_handle.abort();

    let summary = result?;
    info!(
        "Done: {} documents in {:.2}s",
        summary.documents,
        summary.elapsed_ms as f64 / 1000.0
    );
    Ok(())
}

/// Cancel `token` on Ctrl+C
fn spawn_interrupt_listener(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, releasing open scrolls");
                token.cancel();
            }
            Err(err) => {
                eprintln!("Failed to listen for Ctrl+C: {}", err);
            }
        }
    })
}

/// Initialize logging system based on verbosity level
///
/// Log lines are written to stderr; stdout carries only documents.
///
/// # Arguments
/// * `cli` - CLI interface with effective logging settings
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
