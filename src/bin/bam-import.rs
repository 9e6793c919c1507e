// Copyright (c) 2025 - Cowboy AI, Inc.
//! Device Import CLI
//!
//! Reads a device inventory spreadsheet and creates the matching device
//! types, subtypes, blocks, networks, and devices in BlueCat Address Manager.
//!
//! Run with: cargo run --bin bam-import -- -f devices.csv -a 10.255.255.50 -u api -c Test
//!
//! The password is taken from `--password` or `BAM_PASSWORD`, or prompted for
//! with `--interactive`.

use anyhow::{Context, Result};
use bam_device_import::config::{base_url_from_address, BamConfig, RunConfig};
use bam_device_import::directory::{BamClient, DirectoryService, InMemoryDirectory};
use bam_device_import::{CsvRowSource, ImportError, Importer};
use clap::Parser;
use dialoguer::{Input, Password};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bam-import")]
#[command(version)]
#[command(about = "Import a device inventory spreadsheet into BlueCat Address Manager")]
struct Cli {
    /// Read CSV data from FILE
    #[arg(short, long, value_name = "FILE", default_value = "test.csv")]
    filename: PathBuf,

    /// Address of the address manager (IPv4, FQDN, or URL)
    #[arg(short, long, env = "BAM_URL")]
    address: Option<String>,

    /// Username to authenticate with
    #[arg(short, long, env = "BAM_USERNAME")]
    username: Option<String>,

    /// Password to authenticate with
    #[arg(short, long, env = "BAM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Configuration to create devices in
    #[arg(short, long, env = "BAM_CONFIGURATION")]
    configuration: Option<String>,

    /// Prompt for any connection setting not given on the command line
    #[arg(short, long)]
    interactive: bool,

    /// Display debug information
    #[arg(short, long)]
    verbose: bool,

    /// Reconcile and push against an in-memory directory; nothing is sent
    #[arg(long)]
    dry_run: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Extra attempts for requests that cannot reach the server
    #[arg(long, default_value_t = 1)]
    retries: u32,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            filename: self.filename.clone(),
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }

    /// Build connection settings, prompting for gaps in interactive mode
    fn bam_config(&self) -> Result<BamConfig> {
        let address = self.setting(&self.address, || prompt("Address manager address"))?;
        let username = self.setting(&self.username, || prompt("Username"))?;
        let password = self.setting(&self.password, || {
            Password::new()
                .with_prompt("Password")
                .interact()
                .context("Failed to read password")
        })?;
        let configuration = self.setting(&self.configuration, || {
            prompt("Active configuration to use on the address manager")
        })?;

        let base_url = match address {
            Some(address) => base_url_from_address(&address)?,
            None if self.dry_run => BamConfig::default().base_url,
            None => return Err(ImportError::Config("No address supplied".to_string()).into()),
        };

        let config = BamConfig {
            base_url,
            username: username.unwrap_or_default(),
            password: password.unwrap_or_default(),
            configuration: configuration.unwrap_or_default(),
            timeout_secs: self.timeout,
            retries: self.retries,
        };
        if self.dry_run {
            if config.configuration.is_empty() {
                return Err(ImportError::Config("No configuration supplied".to_string()).into());
            }
        } else {
            config.validate()?;
        }
        Ok(config)
    }

    fn setting(
        &self,
        value: &Option<String>,
        ask: impl FnOnce() -> Result<String>,
    ) -> Result<Option<String>> {
        match value {
            Some(v) if !v.is_empty() => Ok(Some(v.clone())),
            _ if self.interactive => ask().map(Some),
            _ => Ok(None),
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(label)
        .interact_text()
        .with_context(|| format!("Failed to read {}", label))?;
    Ok(value.trim().to_string())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

async fn execute<D: DirectoryService>(
    directory: D,
    bam: &BamConfig,
    run: &RunConfig,
    source: &CsvRowSource,
) -> Result<()> {
    let mut importer = Importer::new(directory);

    match importer.run(bam, source).await {
        Ok(summary) => {
            importer.dump_state();
            println!("{}", summary);
            Ok(())
        }
        Err(e) => {
            if run.verbose {
                importer.dump_state();
            }
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match import(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn import(cli: &Cli) -> Result<()> {
    let run = cli.run_config();
    let bam = cli.bam_config()?;
    info!("Connection settings: {:?}", bam);

    let source = CsvRowSource::from_path(&run.filename)
        .with_context(|| format!("Failed to load {}", run.filename.display()))?;
    info!("Loaded {} rows from {}", source.len(), run.filename.display());

    if run.dry_run {
        info!("Dry run: nothing will be sent to {}", bam.base_url);
        let directory = InMemoryDirectory::new().with_configuration(&bam.configuration);
        execute(directory, &bam, &run, &source).await
    } else {
        let client = BamClient::new(bam.clone()).map_err(ImportError::Connection)?;
        execute(client, &bam, &run, &source).await
    }
}
