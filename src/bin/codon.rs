//! codon - Codon Usage Analysis CLI
//!
//! Command-line interface for clustering and classifying codon-usage tables.

use clap::{Parser, Subcommand, ValueEnum};
use codon_analysis::config::AnalysisConfig;
use codon_analysis::error::Result;
use codon_analysis::service::AnalysisService;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Output encoding for command results
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
    /// Per-sample records as TSV (analyze only)
    Tsv,
}

/// Codon Usage Analysis
#[derive(Parser)]
#[command(name = "codon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to analysis configuration YAML
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory with trained artifacts (overrides the configuration)
    #[arg(short, long, global = true)]
    artifacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster and classify the samples of a codon-usage table
    Analyze {
        /// Path to the codon-usage table (CSV or TSV)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Trace each pipeline stage for a codon-usage table
    Debug {
        /// Path to the codon-usage table (CSV or TSV)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Report whether the trained artifacts are loaded
    Health,

    /// Print an example configuration file
    ExampleConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            output,
            format,
        } => load_service(cli.config.as_ref(), cli.artifacts.as_ref())
            .and_then(|service| cmd_analyze(&service, &input, output.as_ref(), format)),

        Commands::Debug { input, format } => {
            load_service(cli.config.as_ref(), cli.artifacts.as_ref())
                .and_then(|service| cmd_debug(&service, &input, format))
        }

        Commands::Health => load_service(cli.config.as_ref(), cli.artifacts.as_ref())
            .and_then(|service| cmd_health(&service)),

        Commands::ExampleConfig { output } => cmd_example_config(output.as_ref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e.public_message());
        std::process::exit(1);
    }
}

fn load_service(config_path: Option<&PathBuf>, artifacts: Option<&PathBuf>) -> Result<AnalysisService> {
    let mut config = match config_path {
        Some(path) => {
            eprintln!("Loading configuration from {:?}...", path);
            AnalysisConfig::from_path(path)?
        }
        None => AnalysisConfig::default(),
    };
    if let Some(dir) = artifacts {
        config.artifact_dir = dir.clone();
    }
    Ok(AnalysisService::load(config))
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json | OutputFormat::Tsv => serde_json::to_string_pretty(value)?,
    })
}

fn emit(text: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            eprintln!("Wrote {:?}", path);
        }
        None => println!("{}", text),
    }
    Ok(())
}

/// Analyze a table
fn cmd_analyze(
    service: &AnalysisService,
    input: &Path,
    output: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    eprintln!("Reading {:?}...", input);
    let bytes = std::fs::read(input)?;
    let result = service.analyze(&bytes)?;

    eprintln!(
        "Done! {} samples in {} clusters",
        result.total_samples, result.analysis_metadata.n_clusters_found
    );
    if let Some(warning) = &result.warning {
        eprintln!("  Warning: {}", warning);
    }
    if let Some(kingdoms) = &result.kingdom_distribution {
        for (kingdom, count) in kingdoms {
            eprintln!("  {:<12} {}", kingdom, count);
        }
    }

    match (format, output) {
        (OutputFormat::Tsv, Some(path)) => {
            result.write_tsv(path)?;
            eprintln!("Wrote {:?}", path);
            Ok(())
        }
        (OutputFormat::Tsv, None) => result.write_tsv_to(std::io::stdout().lock()),
        _ => emit(&render(&result, format)?, output),
    }
}

/// Trace the pipeline stages
fn cmd_debug(service: &AnalysisService, input: &Path, format: OutputFormat) -> Result<()> {
    let bytes = std::fs::read(input)?;
    let report = service.debug(&bytes);
    emit(&render(&report, format)?, None)
}

/// Report readiness
fn cmd_health(service: &AnalysisService) -> Result<()> {
    let health = service.health();
    if let Some(reason) = service.load_error() {
        eprintln!("{}", reason);
    }
    emit(&render(&health, OutputFormat::Json)?, None)
}

/// Print an example configuration
fn cmd_example_config(output: Option<&PathBuf>) -> Result<()> {
    let yaml = AnalysisConfig::default().to_yaml()?;
    let text = format!(
        "# Codon usage analysis configuration\n\
         # metadata_columns: leading non-codon columns of an upload\n\
         # low_total_quantile: samples at or below this batch quantile of totals are dropped\n\
         {}",
        yaml
    );
    emit(&text, output)
}
