use anyhow::Context;
use clap::Parser;
use payerscope::backend::HttpDocumentBackend;
use payerscope::config;
use payerscope::pipeline::Orchestrator;
use payerscope::sink::{Sink, SqliteSink};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Policy-document discovery and rule mining for payer provider portals
#[derive(Parser, Debug)]
#[command(name = "payerscope", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "payerscope.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and exit without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Print catalog totals from the database and exit
    #[arg(long)]
    stats: bool,
}

fn setup_logging(verbose: u8, quiet: bool) {
    let directive = if quiet {
        "payerscope=warn,warn"
    } else {
        match verbose {
            0 => "payerscope=info,warn",
            1 => "payerscope=debug,info",
            _ => "payerscope=trace,debug",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = config::load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    if cli.dry_run {
        println!(
            "Configuration valid: {} payer(s), hash {}",
            config.payer.len(),
            &config_hash[..12]
        );
        return Ok(());
    }

    let sink = Arc::new(
        SqliteSink::open(&config.output.database_path)
            .with_context(|| format!("Failed to open database {}", config.output.database_path))?,
    );

    if cli.stats {
        println!("Database: {}", config.output.database_path);
        println!("  documents: {}", sink.document_count()?);
        println!("  rules:     {}", sink.rule_count()?);
        return Ok(());
    }

    let backend_config = config.backend.clone();
    let mut orchestrator = Orchestrator::new(config, config_hash, sink)?;
    if let Some(backend) = backend_config {
        orchestrator = orchestrator.with_backend(Arc::new(HttpDocumentBackend::new(
            reqwest::Client::new(),
            backend.endpoint,
            backend.api_key,
        )));
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight work");
            let _ = cancel_tx.send(true);
        }
    });

    info!("Starting run");
    let summary = orchestrator.run(cancel_rx).await?;
    print!("{}", summary.render());

    Ok(())
}
