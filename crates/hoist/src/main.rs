use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use hoist_release::{GithubClient, Updater};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use crate::cli::{App, Commands, ExtractArg, PackArg, VersionArg};
use crate::config::Config;

mod cli;
mod config;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const RUSTC_VERSION: &str = env!("HOIST_RUSTC_VERSION");

fn main() -> ExitCode {
    let app = App::parse();
    init_tracing();

    match run(app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HOIST_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn run(app: App) -> Result<()> {
    match app.cmd {
        Commands::Version(arg) => version(&arg),
        Commands::Extract(arg) => extract(&arg),
        Commands::Pack(arg) => pack(&arg),
    }
}

fn argv0() -> String {
    std::env::args().next().unwrap_or_else(|| "hoist".to_string())
}

fn updater(config: &Config) -> Result<Updater> {
    let client = GithubClient::new(&config.api_url, config.client_setting())
        .context("failed to set up the release client")?;
    Ok(Updater::new(client, config.release_source()))
}

fn version(arg: &VersionArg) -> Result<()> {
    let argv0 = argv0();
    let config = Config::load().context("invalid configuration")?;

    if arg.update {
        let new = updater(&config)?.update(VERSION).context("update failed")?;
        println!("Updated {argv0} to version {new}");
        return Ok(());
    }

    println!(
        "{argv0} {VERSION} compiled with {RUSTC_VERSION} on {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    match updater(&config).and_then(|updater| updater.check(VERSION).map_err(Into::into)) {
        Ok(Some(latest)) => println!(
            "\nUpdate available: {}\nRun `{argv0} version -u` to update (requires read/write access to install directory).",
            latest.version
        ),
        Ok(None) => {}
        Err(e) => debug!(error = %e, "release lookup failed"),
    }

    Ok(())
}

fn extract(arg: &ExtractArg) -> Result<()> {
    let report = match hoist_archive::extract_tar_gz(&arg.archive, &arg.output) {
        Ok(report) => report,
        Err(e) if e.is_rollback_failure() => {
            error!(output = %arg.output.display(), error = %e, "rollback failed, output directory is incomplete");
            return Err(e.into());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to extract {}", arg.archive.display())),
    };

    println!(
        "Extracted {} entries into {} ({} skipped)",
        report.entry_count(),
        arg.output.display(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!("  skipped {}", skipped.display());
    }
    Ok(())
}

fn pack(arg: &PackArg) -> Result<()> {
    hoist_archive::pack_tar_gz(&arg.dir, &arg.archive)
        .with_context(|| format!("failed to pack {}", arg.dir.display()))?;
    println!("Packed {} into {}", arg.dir.display(), arg.archive.display());
    Ok(())
}
