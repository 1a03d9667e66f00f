//! clut - inspect and apply color lookup tables
//!
//! Front end of the `clut-store` engine: resolves Hald images, CLF
//! transforms, external generator manifests and CTL scripts the same way
//! the editor does.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clut_core::StoreConfig;
use clut_store::{ClutStore, Quality};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "clut")]
#[command(author, version, about = "Inspect and apply color lookup tables")]
#[command(long_about = "
Resolves and applies color lookup tables: Hald CLUT images, CLF transforms,
external LUT generator manifests (.json) and CTL scripts.

Examples:
  clut info FilmProPhoto.png look.clf          # Show LUT information
  clut params generator.json --json            # Default parameter values
  clut apply in.png -o out.png -l FilmProPhoto.png -s 0.8
  clut apply in.png -o out.png -l gen.json --set gain=1.5 --set invert=true
  clut --config store.yaml cache trim          # Enforce the disk cache limit
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace; RUST_LOG overrides)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    /// Store configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory relative LUT names are resolved against
    #[arg(long, global = true)]
    luts_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Display LUT information
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// List the parameters of a script or generator
    #[command(visible_alias = "p")]
    Params(ParamsArgs),

    /// Apply a LUT to a PNG image
    #[command(visible_alias = "a")]
    Apply(ApplyArgs),

    /// Maintain the external LUT disk cache
    Cache(CacheArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// LUT file(s)
    #[arg(required = true)]
    lut: Vec<PathBuf>,
}

#[derive(Args)]
struct ParamsArgs {
    /// LUT file
    lut: PathBuf,

    /// Print the default values as a JSON object
    #[arg(long)]
    json: bool,
}

/// Arguments for the `apply` command.
#[derive(Args)]
struct ApplyArgs {
    /// Input image (8 or 16-bit PNG, sRGB encoded)
    input: PathBuf,

    /// Output image (16-bit PNG)
    #[arg(short, long)]
    output: PathBuf,

    /// LUT file
    #[arg(short, long)]
    lut: PathBuf,

    /// Blend between the original (0) and the LUT result (1)
    #[arg(short, long, default_value = "1.0")]
    strength: f32,

    /// Working profile the LUT is applied in
    #[arg(short = 'p', long, default_value = "sRGB")]
    working_profile: String,

    /// Parameter values as a JSON object
    #[arg(long)]
    params: Option<PathBuf>,

    /// Override one parameter: NAME=VALUE[,VALUE...] (true/false for switches)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Rendering quality of CTL scripts
    #[arg(short, long, value_enum, default_value = "highest")]
    quality: QualityArg,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    action: CacheAction,
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached generator outputs, oldest first
    List,
    /// Remove entries beyond the configured limit
    Trim,
    /// Remove every entry
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum QualityArg {
    Low,
    Medium,
    High,
    Highest,
}

impl From<QualityArg> for Quality {
    fn from(q: QualityArg) -> Self {
        match q {
            QualityArg::Low => Quality::Low,
            QualityArg::Medium => Quality::Medium,
            QualityArg::High => Quality::High,
            QualityArg::Highest => Quality::Highest,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = &cli.luts_dir {
        config.luts_dir = dir.clone();
    }
    config.verbose |= cli.verbose > 0;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let store = Arc::new(ClutStore::new(load_config(&cli)?));

    match cli.command {
        Commands::Info(args) => commands::info::run(args, &store),
        Commands::Params(args) => commands::params::run(args, &store),
        Commands::Apply(args) => commands::apply::run(args, store, cli.verbose),
        Commands::Cache(args) => commands::cache::run(args, &store),
    }
}
