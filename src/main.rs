//! DislexIA predictor CLI
//!
//! Dyslexia risk screening from cognitive mini-game telemetry.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dislexia_predictor::{
    assemble_features,
    config::Config,
    core::{risk, validation::validate_features, FeatureMap},
    evaluation::ScreeningRequest,
    model::ModelCache,
    transparency::{create_shared_log_with_persistence, SharedTransparencyLog},
    Predictor, SCOPE_DECLARATION, VERSION,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dislexia")]
#[command(author = "DislexIA")]
#[command(version = VERSION)]
#[command(about = "Dyslexia risk screening from cognitive mini-game telemetry", long_about = None)]
struct Cli {
    /// Model artifact directory (overrides config and DISLEXIA_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen an evaluation and print the report
    Screen {
        /// Evaluation input JSON file ("-" for stdin)
        input: PathBuf,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Print the 196-feature vector assembled from an evaluation
    Assemble {
        /// Evaluation input JSON file ("-" for stdin)
        input: PathBuf,
    },

    /// Validate a name-keyed feature vector
    Validate {
        /// Feature map JSON file ("-" for stdin)
        input: PathBuf,
    },

    /// Show the model backing predictions
    ModelInfo,

    /// Display the scope declaration and result disclaimer
    Disclaimer,

    /// Show model and screening status
    Status,

    /// Show configuration
    Config,

    /// Serve the screening API over HTTP (requires server feature)
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8787")]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: could not load config, using defaults: {e}");
        Config::default()
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let model_dir = cli.model_dir.unwrap_or_else(|| config.model_dir());

    match cli.command {
        Commands::Screen { input, pretty } => cmd_screen(&config, &model_dir, &input, pretty),
        Commands::Assemble { input } => cmd_assemble(&config, &model_dir, &input),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::ModelInfo => cmd_model_info(&config, &model_dir),
        Commands::Disclaimer => {
            cmd_disclaimer(&config);
            Ok(())
        }
        Commands::Status => {
            cmd_status(&config, &model_dir);
            Ok(())
        }
        Commands::Config => cmd_config(&config),
        Commands::Serve { port } => cmd_serve(&config, &model_dir, port),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn open_log(config: &Config) -> SharedTransparencyLog {
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    create_shared_log_with_persistence(config.transparency_log_path())
}

fn predictor(config: &Config, model_dir: &Path) -> Predictor {
    let cache = ModelCache::new(model_dir, config.calibration.clone());
    Predictor::new(Arc::new(cache))
}

fn cmd_screen(config: &Config, model_dir: &Path, input: &Path, pretty: bool) -> anyhow::Result<()> {
    let request: ScreeningRequest = read_json(input)?;
    let mut evaluation = request.into_input(&config.reference_languages);
    if evaluation.evaluation_id.is_none() {
        evaluation.evaluation_id = input
            .file_stem()
            .filter(|_| input != Path::new("-"))
            .map(|stem| stem.to_string_lossy().into_owned());
    }

    let log = open_log(config);
    let report = predictor(config, model_dir)
        .with_log(log.clone())
        .screen(&evaluation);

    if let Err(e) = log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    let json = if pretty {
        report.to_json_pretty()?
    } else {
        report.to_json()?
    };
    println!("{json}");

    if !report.success {
        bail!("evaluation rejected: {}", report.validation_errors.join("; "));
    }
    Ok(())
}

fn cmd_assemble(config: &Config, model_dir: &Path, input: &Path) -> anyhow::Result<()> {
    let request: ScreeningRequest = read_json(input)?;
    let evaluation = request.into_input(&config.reference_languages);
    let padding = predictor(config, model_dir).calibration().padding;
    let assembled = assemble_features(&evaluation, &padding);

    eprintln!(
        "Real exercises: {}, padded: {}",
        assembled.real_exercises,
        assembled.padded_exercises()
    );
    println!("{}", serde_json::to_string_pretty(&assembled.vector.to_map())?);
    Ok(())
}

fn cmd_validate(input: &Path) -> anyhow::Result<()> {
    let features: FeatureMap = read_json(input)?;
    let report = validate_features(&features);

    if report.is_valid {
        println!("Feature vector is valid ({} features).", features.len());
        return Ok(());
    }

    println!("Feature vector is invalid:");
    for description in report.descriptions() {
        println!("  - {description}");
    }
    bail!("{} validation error(s)", report.errors.len())
}

fn cmd_model_info(config: &Config, model_dir: &Path) -> anyhow::Result<()> {
    let info = predictor(config, model_dir).model_info();
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn cmd_disclaimer(config: &Config) {
    println!("{SCOPE_DECLARATION}");
    println!("{}", risk::disclaimer(config.calibration.validated_accuracy));
}

fn cmd_status(config: &Config, model_dir: &Path) {
    println!("DislexIA Predictor Status");
    println!("=========================");
    println!();

    let predictor = predictor(config, model_dir);
    let info = predictor.model_info();
    println!("Model directory: {}", model_dir.display());
    println!(
        "Model: {}",
        if info.loaded {
            format!("loaded ✓ ({}, threshold {})", info.version, info.threshold)
        } else {
            "not loaded ✗ (simulation mode)".to_string()
        }
    );
    if let Some(reason) = &info.degraded_reason {
        println!("  Reason: {reason}");
    }
    println!();

    let stats_path = config.transparency_log_path();
    if stats_path.exists() {
        let log = create_shared_log_with_persistence(stats_path);
        println!("Cumulative Statistics:");
        println!("{}", log.summary());
    } else {
        println!("No previous screening data found.");
    }
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

#[cfg(feature = "server")]
fn cmd_serve(config: &Config, model_dir: &Path, port: u16) -> anyhow::Result<()> {
    use dislexia_predictor::server::{run, ServerConfig, ServerState};

    let log = open_log(config);
    let state = ServerState::new(predictor(config, model_dir), log.clone())
        .with_reference_languages(config.reference_languages.clone());

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(async {
        let (addr, shutdown_tx) = run(ServerConfig::new(port), state).await?;
        println!("Listening on http://{addr}");
        println!("Press Ctrl+C to stop");

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl+C")?;
        let _ = shutdown_tx.send(());
        anyhow::Ok(())
    })?;

    if let Err(e) = log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }
    println!();
    println!("{}", log.summary());
    Ok(())
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_config: &Config, _model_dir: &Path, _port: u16) -> anyhow::Result<()> {
    bail!("this build does not include the HTTP server (rebuild with --features server)")
}
