//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use releaseqa_core::curate::curate_file;
use releaseqa_core::jsonl;
use releaseqa_core::manifest::RunManifest;
use releaseqa_core::pipeline::{self, GenerateResult, ProgressReporter};
use releaseqa_shared::{
    AppConfig, GenerateConfig, QuestionOverrides, SourceRecord, init_config, load_config,
    load_config_from,
};
use tracing::info;

/// Printed by `inspect` between factsheets.
const RULE: &str =
    "--------------------------------------------------------------------------------";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ReleaseQA — build chat fine-tuning data from Python release notes.
#[derive(Parser)]
#[command(
    name = "releaseqa",
    version,
    about = "Generate question/answer training data from Python release factsheets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.releaseqa/releaseqa.toml.
    #[arg(long, global = true, env = "RELEASEQA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a training dataset from a factsheet file.
    Generate {
        /// Factsheet JSON Lines file.
        #[arg(short, long)]
        input: PathBuf,

        /// Training JSON Lines file to write.
        #[arg(short, long)]
        output: PathBuf,

        /// Expand every question into paraphrased variants.
        #[arg(long)]
        paraphrase: bool,

        /// Variants kept per question when paraphrasing (0 keeps all).
        #[arg(long)]
        max_variants: Option<usize>,

        /// TOML file with an `[overrides]` table replacing the configured one.
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Drop entries matching the configured pruning rules.
        #[arg(long)]
        prune: bool,

        /// Write a run manifest (JSON) to this path.
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Strip leftover emphasis markers from an existing training dataset.
    Clean {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Apply pruning rules to an existing training dataset.
    Prune {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Filter a plain question/answer corpus by length, markup, and duplicates.
    Curate {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Maximum number of pairs to keep.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the notes of every factsheet in a file.
    Inspect {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "releaseqa=info",
        1 => "releaseqa=debug",
        _ => "releaseqa=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Generate {
            input,
            output,
            paraphrase,
            max_variants,
            overrides,
            prune,
            manifest,
        } => {
            let options = GenerateOptions {
                paraphrase,
                max_variants,
                overrides,
                prune,
                manifest,
            };
            cmd_generate(config_path, &input, &output, options)
        }
        Command::Clean { input, output } => cmd_clean(&input, &output),
        Command::Prune { input, output } => cmd_prune(config_path, &input, &output),
        Command::Curate {
            input,
            output,
            limit,
        } => cmd_curate(config_path, &input, &output, limit),
        Command::Inspect { input } => cmd_inspect(&input),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load the config from `--config` when given, otherwise the default location.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// `generate` flags that override the config file.
struct GenerateOptions {
    paraphrase: bool,
    max_variants: Option<usize>,
    overrides: Option<PathBuf>,
    prune: bool,
    manifest: Option<PathBuf>,
}

fn cmd_generate(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    options: GenerateOptions,
) -> Result<()> {
    let app = resolve_config(config_path)?;
    let mut config = GenerateConfig::from(&app);

    config.paraphrase |= options.paraphrase;
    if let Some(max) = options.max_variants {
        config.max_variants = max;
    }
    if let Some(path) = &options.overrides {
        config.overrides = QuestionOverrides::load_from(path)?;
    }
    config.prune = options.prune;

    info!(
        input = %input.display(),
        output = %output.display(),
        paraphrase = config.paraphrase,
        max_variants = config.max_variants,
        prune = config.prune,
        override_sheets = config.overrides.len(),
        "generating training data"
    );

    let reporter = CliProgress::new();
    let result = pipeline::generate_dataset(input, output, &config, &reporter)?;

    if let Some(path) = &options.manifest {
        RunManifest::build(&result, &config, env!("CARGO_PKG_VERSION"))?.write(path)?;
    }

    println!();
    println!("  Training data written!");
    println!("  Factsheets: {}", result.records);
    if result.degraded > 0 {
        println!("  Degraded:   {}", result.degraded);
    }
    println!("  Entries:    {}", result.entries);
    if config.prune {
        println!("  Pruned:     {}", result.pruned);
    }
    println!("  Path:       {}", result.output.display());
    if let Some(path) = &options.manifest {
        println!("  Manifest:   {}", path.display());
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_clean(input: &Path, output: &Path) -> Result<()> {
    info!(input = %input.display(), output = %output.display(), "cleaning training data");
    let written = pipeline::clean_dataset(input, output)?;
    println!("Cleaned {written} entries → {}", output.display());
    Ok(())
}

fn cmd_prune(config_path: Option<&Path>, input: &Path, output: &Path) -> Result<()> {
    let app = resolve_config(config_path)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rules = app.prune.len(),
        "pruning training data"
    );

    let stats = pipeline::prune_dataset(input, output, &app.prune)?;
    println!(
        "Kept {} entries, dropped {} → {}",
        stats.kept,
        stats.dropped,
        output.display()
    );
    Ok(())
}

fn cmd_curate(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    limit: Option<usize>,
) -> Result<()> {
    let app = resolve_config(config_path)?;
    let mut bounds = app.curate;
    if let Some(limit) = limit {
        bounds.limit = limit;
    }

    let stats = curate_file(input, output, &bounds)?;

    println!();
    println!("  Curated pairs written to {}", output.display());
    println!("  Kept:       {}", stats.kept);
    println!("  Too short:  {}", stats.too_short);
    println!("  Too long:   {}", stats.too_long);
    println!("  Markup:     {}", stats.markup);
    println!("  Duplicates: {}", stats.duplicates);
    println!("  Corrupted:  {}", stats.corrupted);
    println!();
    Ok(())
}

fn cmd_inspect(input: &Path) -> Result<()> {
    let values = jsonl::read_values(input)?;

    for value in &values {
        let record = SourceRecord::from_json(value);
        println!("{RULE}");
        println!("SHEET: {}", record.id);
        println!();
        match value.get("detailed_notes").and_then(|v| v.as_str()) {
            Some(notes) => println!("{notes}"),
            None => println!("NO detailed_notes FIELD FOUND"),
        }
        println!();
    }

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config).wrap_err("failed to render config")?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_done(&self, sheet_id: &str, current: usize, total: usize, entries: usize) {
        self.spinner.set_message(format!(
            "Generating [{current}/{total}] {sheet_id} ({entries} entries)"
        ));
    }

    fn done(&self, _result: &GenerateResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
