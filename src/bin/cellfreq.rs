//! cellfreq - Immune Cell Frequency Dashboard CLI
//!
//! Command-line views over the study database: overview of population
//! frequencies, responder vs non-responder comparison, and subset summary.

use clap::{Args, Parser, Subcommand, ValueEnum};
use cell_frequency::config::DashboardConfig;
use cell_frequency::error::{CellFreqError, Result};
use cell_frequency::filter::{filter_samples, FrequencyFilter, SampleFilter};
use cell_frequency::io::Store;
use cell_frequency::normalize::summarize_frequencies;
use cell_frequency::profile::{describe_subset, FilterOptions};
use cell_frequency::report::{render, OutputFormat};
use cell_frequency::test::compare_response_groups;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// CLI-friendly output format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFormat {
    /// Aligned plain-text tables
    Text,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Text => OutputFormat::Text,
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Yaml => OutputFormat::Yaml,
        }
    }
}

/// Immune cell frequency analysis
#[derive(Parser)]
#[command(name = "cellfreq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dashboard configuration YAML
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Cell-count CSV path (overrides config)
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: CliFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Cohort selection flags. Repeat a flag to select several values.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Condition (e.g. melanoma)
    #[arg(long = "condition")]
    conditions: Vec<String>,

    /// Treatment (e.g. miraclib)
    #[arg(long = "treatment")]
    treatments: Vec<String>,

    /// Sample type (e.g. PBMC)
    #[arg(long = "sample-type")]
    sample_types: Vec<String>,

    /// Days from treatment start
    #[arg(long = "timepoint")]
    timepoints: Vec<i64>,
}

impl FilterArgs {
    fn to_filter(&self) -> SampleFilter {
        SampleFilter::new()
            .with_conditions(self.conditions.iter().cloned())
            .with_treatments(self.treatments.iter().cloned())
            .with_sample_types(self.sample_types.iter().cloned())
            .with_timepoints(self.timepoints.iter().copied())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Import the CSV into the database, replacing existing data
    Load,

    /// List the filter values present in the database
    Options,

    /// Show population frequencies per sample
    Overview {
        /// Restrict to a sample (repeatable)
        #[arg(long = "sample")]
        samples: Vec<String>,

        /// Restrict to a population (repeatable)
        #[arg(long = "population")]
        populations: Vec<String>,

        /// Also write the frequency table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare population frequencies between responders and non-responders
    Compare {
        #[command(flatten)]
        filter: FilterArgs,

        /// Significance threshold (overrides config)
        #[arg(long)]
        alpha: Option<f64>,
    },

    /// Summarize samples and subjects of a cohort
    Subset {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Write an example configuration file
    Example {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "cellfreq.yaml")]
        output: PathBuf,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format);

    let result = load_config(&cli).and_then(|config| match cli.command {
        Commands::Load => cmd_load(&config),
        Commands::Options => cmd_options(&config, format),
        Commands::Overview {
            samples,
            populations,
            output,
        } => cmd_overview(&config, &samples, &populations, output.as_ref(), format),
        Commands::Compare { filter, alpha } => cmd_compare(&config, &filter, alpha, format),
        Commands::Subset { filter } => cmd_subset(&config, &filter, format),
        Commands::Example { output } => cmd_example(&output),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cell_frequency=info,cellfreq=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the config file if given, then apply flag overrides.
fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            DashboardConfig::from_file(path)?
        }
        None => DashboardConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database = db.clone();
    }
    if let Some(csv) = &cli.csv {
        config.csv = csv.clone();
    }
    Ok(config)
}

fn open_store(config: &DashboardConfig) -> Result<Store> {
    Store::open_or_import(&config.database, &config.csv)
}

/// Import the CSV, replacing the database contents
fn cmd_load(config: &DashboardConfig) -> Result<()> {
    let (_store, data) = Store::load_csv(&config.database, &config.csv)?;
    println!(
        "Loaded {} samples and {} populations into {}",
        data.samples.len(),
        data.populations().len(),
        config.database.display()
    );
    Ok(())
}

fn cmd_options(config: &DashboardConfig, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let options = FilterOptions::collect(&store.load_samples()?, &store.load_counts()?);
    println!("{}", render(&options, format)?);
    Ok(())
}

/// Overview: frequency table, optionally restricted to samples and populations
fn cmd_overview(
    config: &DashboardConfig,
    samples: &[String],
    populations: &[String],
    output: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let store = open_store(config)?;
    let summary = summarize_frequencies(&store.load_counts()?);
    let view = FrequencyFilter::new()
        .with_samples(samples.iter().cloned())
        .with_populations(populations.iter().cloned())
        .apply(&summary);

    if view.is_empty() {
        warn!("no frequency rows match the selected samples and populations");
        return Ok(());
    }
    if let Some(path) = output {
        view.to_csv(path)?;
        info!(path = %path.display(), rows = view.len(), "wrote frequency table");
    }
    println!("{}", render(&view, format)?);
    Ok(())
}

/// Response Group Comparison view
fn cmd_compare(
    config: &DashboardConfig,
    filter: &FilterArgs,
    alpha: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let store = open_store(config)?;
    let samples = store.load_samples()?;
    let summary = summarize_frequencies(&store.load_counts()?);
    let alpha = alpha.unwrap_or(config.alpha);

    match compare_response_groups(&summary, &samples, &filter.to_filter(), alpha, &config.lmm) {
        Ok(report) => {
            println!("{}", render(&report, format)?);
            Ok(())
        }
        Err(CellFreqError::EmptyData(msg)) => {
            warn!("{}; skipping comparison", msg);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Subset Summary view
fn cmd_subset(config: &DashboardConfig, args: &FilterArgs, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let samples = store.load_samples()?;

    let options = FilterOptions::collect(&samples, &store.load_counts()?);
    let filter = config.subset_filter(&args.to_filter(), &options);
    debug!(?filter, "subset filter");

    let subset = filter_samples(&samples, &filter);
    if subset.is_empty() {
        warn!("no samples match the selected filters; skipping subset summary");
        return Ok(());
    }
    println!("{}", render(&describe_subset(&subset), format)?);
    Ok(())
}

/// Write an example configuration
fn cmd_example(output: &PathBuf) -> Result<()> {
    let yaml = DashboardConfig::default().to_yaml()?;
    std::fs::write(output, yaml)?;
    println!("Example configuration written to {:?}", output);
    Ok(())
}
