use std::fs::{self, OpenOptions};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use election_results::aggregate::{get_constituencies, get_total_results};
use election_results::config::{Config, ConfigOverrides};
use election_results::error::ElectionError;
use election_results::ingest::{ensure_csv_filename, ingest_csv};
use election_results::output::csv::{constituencies_to_csv, totals_to_csv};
use election_results::output::json::render_json;
use election_results::output::table::{
    render_constituencies_table, render_report_table, render_totals_table,
};
use election_results::server::run_server;
use election_results::storage::ResultStore;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "election-results",
    about = "Election result ingestion and seat totals"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    db: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Ingest {
        file: PathBuf,
    },
    Results,
    Constituencies,
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    init_logging(config.resolved_log_file().as_deref())?;
    let (host, port) = match &cli.command {
        Commands::Serve { host, port } => (host.clone(), *port),
        _ => (None, None),
    };
    config.apply_overrides(ConfigOverrides {
        db_path: cli.db.clone(),
        host,
        port,
    });

    if let Commands::Config { init, show } = &cli.command {
        return handle_config_command(*init, *show, &config, &config_path);
    }
    if matches!(cli.command, Commands::Serve { .. }) {
        let bind = format!("{}:{}", config.server.host, config.server.port);
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let store = ResultStore::open(&config.resolved_db_path(), config.busy_timeout())?;

    match &cli.command {
        Commands::Ingest { file } => ingest_file(&store, file, cli.output)?,
        Commands::Results => {
            let totals = get_total_results(&store)?;
            if totals.is_empty() {
                return Err(ElectionError::NotFound.into());
            }
            let rendered = match cli.output {
                OutputFormat::Table => render_totals_table(&totals),
                OutputFormat::Json => render_json(&totals)?,
                OutputFormat::Csv => totals_to_csv(&totals)?,
            };
            println!("{rendered}");
        }
        Commands::Constituencies => {
            let summaries = get_constituencies(&store)?;
            if summaries.is_empty() {
                return Err(ElectionError::NotFound.into());
            }
            let rendered = match cli.output {
                OutputFormat::Table => render_constituencies_table(&summaries),
                OutputFormat::Json => render_json(&summaries)?,
                OutputFormat::Csv => constituencies_to_csv(&summaries)?,
            };
            println!("{rendered}");
        }
        Commands::Serve { .. } => unreachable!("serve command handled before dispatch"),
        Commands::Config { .. } => unreachable!("config command handled before dispatch"),
    }

    Ok(())
}

fn ingest_file(store: &ResultStore, file: &Path, format: OutputFormat) -> Result<()> {
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    ensure_csv_filename(filename)?;
    let bytes = fs::read(file)
        .with_context(|| format!("failed reading upload: {}", file.display()))?;

    info!("ingesting {}", file.display());
    let report = ingest_csv(store, &bytes)?;
    if report.lines_skipped > 0 {
        warn!("{} lines skipped", report.lines_skipped);
    }
    match format {
        OutputFormat::Json => println!("{}", render_json(&report)?),
        OutputFormat::Table | OutputFormat::Csv => println!("{}", render_report_table(&report)),
    }
    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed creating log directory: {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed opening log file: {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        if config_path.exists() {
            bail!("config already exists: {}", config_path.display());
        }
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}
