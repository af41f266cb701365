use clap::Parser;
use euler_lf::{
    diagnostics::{write_field, write_history},
    fv_core::validation::ValidationPolicy,
    run,
    scenarios::Scenario,
    SimulationConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Compressible Euler flow past a cylinder, Lax-Friedrichs scheme
#[derive(Parser)]
#[command(name = "euler_lf")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
struct Cli {
    /// TOML configuration file; overrides --scenario
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in setup used when no configuration file is given
    #[arg(long, value_enum, default_value_t = Scenario::Cylinder)]
    scenario: Scenario,

    /// Number of time steps
    #[arg(long)]
    steps: Option<usize>,

    /// Report every N steps
    #[arg(long)]
    interval: Option<usize>,

    /// Worker threads (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Post-step state validation
    #[arg(long, value_enum)]
    validation: Option<ValidationPolicy>,

    /// Write the diagnostic history as CSV
    #[arg(long)]
    history: Option<PathBuf>,

    /// Write the final interior field as CSV
    #[arg(long)]
    field: Option<PathBuf>,

    /// Show a progress bar on stderr
    #[arg(long)]
    progress: bool,

    /// Log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => cli.scenario.config(),
    };
    if let Some(steps) = cli.steps {
        config.run.n_steps = steps;
    }
    if let Some(interval) = cli.interval {
        config.run.diagnostic_interval = interval;
    }
    if let Some(threads) = cli.threads {
        config.run.threads = threads;
    }
    if let Some(validation) = cli.validation {
        config.run.validation = validation;
    }
    config.validate()?;

    let pb = if cli.progress {
        let pb = ProgressBar::new(config.run.n_steps as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} (eta: {eta}) {msg}")?
                .progress_chars("█░"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let start = Instant::now();
    let mut run = run(config)?;
    let mut samples = Vec::new();

    while let Some(sample) = run.next() {
        let sample = sample?;
        pb.suspend(|| {
            println!(
                "Step {} completed, total kinetic energy: {}",
                sample.step, sample.kinetic_energy
            )
        });
        pb.set_position(run.steps_taken() as u64);
        samples.push(sample);
    }
    let elapsed = start.elapsed();
    pb.finish_and_clear();

    println!("Simulation time: {} ms", elapsed.as_secs_f64() * 1000.0);
    info!(samples = samples.len(), steps = run.steps_taken(), "run complete");

    if let Some(path) = &cli.history {
        write_history(path, &samples)?;
        info!(path = %path.display(), "wrote diagnostic history");
    }
    if let Some(path) = &cli.field {
        write_field(path, run.simulation())?;
        info!(path = %path.display(), "wrote final field");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_defaults_to_warn() {
        let cli = Cli::try_parse_from(["euler_lf"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert_eq!(Level::from(cli.log_level), Level::WARN);
    }

    #[test]
    fn test_log_level_parses_known_names() {
        let cli = Cli::try_parse_from(["euler_lf", "--log-level", "debug"]).unwrap();
        assert_eq!(Level::from(cli.log_level), Level::DEBUG);
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        assert!(Cli::try_parse_from(["euler_lf", "--log-level", "verbose"]).is_err());
        assert!(Cli::try_parse_from(["euler_lf", "-l", "warning"]).is_err());
    }
}
