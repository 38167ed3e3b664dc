use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "hoist", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(name = "version", about = "Display the current version & update information")]
    Version(VersionArg),
    #[command(alias = "x", name = "extract", about = "Extract a tar.gz archive into a directory")]
    Extract(ExtractArg),
    #[command(name = "pack", about = "Pack a directory into a tar.gz archive")]
    Pack(PackArg),
}

#[derive(Clone, Debug, Args)]
pub struct VersionArg {
    /// Update to the latest version
    #[arg(short, long)]
    pub update: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ExtractArg {
    /// Archive to extract
    pub archive: PathBuf,
    /// Output directory, created if missing and removed again on failure
    pub output: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct PackArg {
    /// Directory whose contents are packed
    pub dir: PathBuf,
    /// Archive to write
    pub archive: PathBuf,
}
