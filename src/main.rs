use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use effortrs::config::AppConfig;
use effortrs::ekg::EkgAnalyzer;
use effortrs::error::{EffortError, ImportError};
use effortrs::import::{EkgTextReader, ImportManager};
use effortrs::logging::{init_logging, LogLevel};
use effortrs::models::{Activity, EkgTrace, PowerCurve};
use effortrs::power::{self, MergeStrategy, PowerCurveBuilder};
use effortrs::session::{DirectorySource, SessionAnalyzer};
use effortrs::stats;
use effortrs::zones::{estimate_max_heart_rate, HeartRateZone, HeartRateZoneCalculator};

/// effortrs - EKG and power analysis CLI
///
/// Detects heartbeats in raw EKG recordings, estimates heart rate and builds
/// best-effort power curves from single activities or whole directories.
#[derive(Parser)]
#[command(name = "effortrs")]
#[command(author = "effortrs Contributors")]
#[command(version = "0.1.0")]
#[command(about = "EKG and power analysis CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect heartbeat peaks in an EKG recording
    Peaks {
        /// EKG recording (tab-separated .txt or comma-separated .csv)
        #[arg(short, long)]
        file: PathBuf,

        /// Subsampling stride before detection
        #[arg(short, long)]
        respacing: Option<usize>,
    },

    /// Estimate heart rate from an EKG recording
    HeartRate {
        /// EKG recording (tab-separated .txt or comma-separated .csv)
        #[arg(short, long)]
        file: PathBuf,

        /// Print the smoothed series instead of the average
        #[arg(short, long)]
        series: bool,

        /// Beats per smoothing window
        #[arg(short, long)]
        window: Option<usize>,

        /// Drop intervals above this BPM
        #[arg(long)]
        max_bpm: Option<f64>,
    },

    /// Best-effort power curve of one activity
    PowerCurve {
        /// Activity file (CSV or FIT)
        #[arg(short, long)]
        file: PathBuf,

        /// Include the extended long windows
        #[arg(short, long)]
        extended: bool,

        /// Fill missing power samples from their neighbours first
        #[arg(long)]
        fill_gaps: bool,
    },

    /// Best efforts across every activity in a directory
    Accumulate {
        /// Directory with CSV or FIT activities
        #[arg(short, long)]
        dir: PathBuf,

        /// How activities are merged (concatenate, per-trace-max)
        #[arg(short, long)]
        strategy: Option<MergeStrategy>,

        /// Include the extended long windows
        #[arg(short, long)]
        extended: bool,
    },

    /// Time spent in each heart rate zone
    Zones {
        /// Activity file (CSV or FIT)
        #[arg(short, long)]
        file: PathBuf,

        /// Maximum heart rate
        #[arg(long, conflicts_with = "birth_year", required_unless_present = "birth_year")]
        max_hr: Option<u16>,

        /// Birth year, for an age-predicted maximum heart rate
        #[arg(long)]
        birth_year: Option<i32>,
    },

    /// Configure application settings
    Config {
        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long)]
        force: bool,

        /// Print the active configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Tabled)]
struct PeakRow {
    #[tabled(rename = "#")]
    number: usize,
    #[tabled(rename = "Sample")]
    sample: usize,
    #[tabled(rename = "Time (s)")]
    time: String,
}

#[derive(Tabled)]
struct BpmRow {
    #[tabled(rename = "Time (s)")]
    time: String,
    #[tabled(rename = "BPM")]
    bpm: String,
}

#[derive(Tabled)]
struct CurveRow {
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Seconds")]
    seconds: u32,
    #[tabled(rename = "Best power (W)")]
    watts: u32,
}

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "From (BPM)")]
    from: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Share")]
    share: String,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        report_error(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    log_config.level = LogLevel::from_verbosity(log_config.level, cli.verbose);
    init_logging(&log_config).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Peaks { file, respacing } => {
            let analyzer = EkgAnalyzer::new(config.ekg.clone());
            let trace = EkgTextReader::new().read_file(&file)?;
            let respacing = respacing.unwrap_or(config.ekg.respacing_factor);
            let peaks = analyzer.find_peaks(&trace.voltages_mv, respacing);

            tracing::info!(file = %file.display(), peaks = peaks.len(), "Peak detection finished");

            if cli.json {
                print_json(&peaks)?;
            } else {
                println!(
                    "{} {} peaks in {} samples",
                    "✓".green(),
                    peaks.len().to_string().bold(),
                    trace.len()
                );
                let rows: Vec<PeakRow> = peaks
                    .iter()
                    .enumerate()
                    .map(|(i, &sample)| PeakRow {
                        number: i + 1,
                        sample,
                        time: format!("{:.3}", elapsed_seconds(&trace, sample)),
                    })
                    .collect();
                if !rows.is_empty() {
                    print_table(rows);
                }
            }
        }

        Commands::HeartRate {
            file,
            series,
            window,
            max_bpm,
        } => {
            let analyzer = EkgAnalyzer::new(config.ekg.clone());
            let trace = EkgTextReader::new().read_file(&file)?;

            if series {
                let window = window.unwrap_or(config.ekg.window_size);
                let max_bpm = max_bpm.unwrap_or(config.ekg.max_bpm);
                let points = analyzer
                    .estimate_heart_rate_series(&trace, window, max_bpm)
                    .map_err(EffortError::from)?;

                if cli.json {
                    print_json(&points)?;
                } else {
                    let rows: Vec<BpmRow> = points
                        .iter()
                        .map(|p| BpmRow {
                            time: format!("{:.2}", p.time_seconds),
                            bpm: format!("{:.1}", p.bpm),
                        })
                        .collect();
                    print_table(rows);
                }
            } else {
                let bpm = analyzer
                    .estimate_heart_rate_average(&trace)
                    .map_err(EffortError::from)?;

                if cli.json {
                    print_json(&serde_json::json!({ "average_bpm": bpm }))?;
                } else {
                    println!("{} {:.1} BPM", "Average heart rate:".cyan().bold(), bpm);
                }
            }
        }

        Commands::PowerCurve {
            file,
            extended,
            fill_gaps,
        } => {
            let activity = ImportManager::new().import_file(&file)?;
            let trace = activity.power_trace();
            if !trace.has_power() {
                return Err(EffortError::from(ImportError::MissingData {
                    field: format!("power values in {}", file.display()),
                })
                .into());
            }

            let builder = PowerCurveBuilder::new(config.power.clone()).extended(extended);
            let values = if fill_gaps {
                stats::fill_gaps(&trace.values())
            } else {
                trace.values()
            };
            let curve = power::build_power_curve(&values, &builder.windows());

            if cli.json {
                print_json(&curve)?;
            } else {
                if let Some(summary) = power::summarize_power(&values) {
                    println!(
                        "{} mean {:.0} W, max {:.0} W over {} samples",
                        "Power:".yellow().bold(),
                        summary.mean_watts,
                        summary.max_watts,
                        summary.samples
                    );
                }
                print_curve(&curve);
            }
        }

        Commands::Accumulate {
            dir,
            strategy,
            extended,
        } => {
            let source = DirectorySource::new(&dir).with_progress(!cli.json);
            let analyzer = SessionAnalyzer::from_config(&config).extended(extended);
            let strategy = strategy.unwrap_or(config.power.merge_strategy);
            let summary = analyzer.summarize_with(&source, strategy)?;

            if cli.json {
                print_json(&summary)?;
            } else {
                println!(
                    "{} {} activities from {}",
                    "Accumulated".green().bold(),
                    summary.activity_count,
                    dir.display()
                );
                if let Some(hr) = summary.max_heart_rate {
                    println!("  Max heart rate: {:.0} BPM", hr);
                }
                if let Some(power) = &summary.power_summary {
                    println!(
                        "  Power: mean {:.0} W, max {:.0} W",
                        power.mean_watts, power.max_watts
                    );
                }
                print_curve(&summary.power_curve);
            }
        }

        Commands::Zones {
            file,
            max_hr,
            birth_year,
        } => {
            let max_hr = match (max_hr, birth_year) {
                (Some(hr), _) => hr,
                (None, Some(year)) => estimate_max_heart_rate(
                    year,
                    chrono::Utc::now().year(),
                    config.zones.max_hr_base,
                )
                .map_err(EffortError::from)?,
                (None, None) => anyhow::bail!("Either --max-hr or --birth-year is required"),
            };

            let calculator = HeartRateZoneCalculator::with_settings(max_hr, &config.zones)
                .map_err(EffortError::from)?;
            let activity: Activity = ImportManager::new().import_file(&file)?;
            let distribution = calculator.distribution(&activity.heart_rates());

            if cli.json {
                print_json(&distribution)?;
            } else {
                println!("{} {} BPM", "Max heart rate:".magenta().bold(), max_hr);
                let bounds = calculator.upper_bounds();
                let rows: Vec<ZoneRow> = HeartRateZone::ALL
                    .iter()
                    .enumerate()
                    .map(|(i, zone)| ZoneRow {
                        zone: zone.to_string(),
                        from: if i == 0 {
                            "0".to_string()
                        } else {
                            format!("{:.0}", bounds[i - 1])
                        },
                        samples: distribution.count(*zone),
                        share: format!("{:.1}%", distribution.percentage(*zone)),
                    })
                    .collect();
                print_table(rows);
            }
        }

        Commands::Config { init, force, show } => {
            let path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);

            if init {
                if path.exists() && !force {
                    anyhow::bail!(
                        "Config file already exists: {} (use --force to overwrite)",
                        path.display()
                    );
                }
                AppConfig::default().save_to_file(&path)?;
                println!("{} {}", "✓ Wrote default configuration to".green(), path.display());
            }

            if show || !init {
                let content = toml::to_string_pretty(&config)
                    .context("Failed to serialize configuration")?;
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", content);
            }
        }
    }

    Ok(())
}

fn elapsed_seconds(trace: &EkgTrace, sample: usize) -> f64 {
    match (trace.elapsed_ms.first(), trace.elapsed_ms.get(sample)) {
        (Some(t0), Some(t)) => (t - t0) / 1000.0,
        _ => 0.0,
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_curve(curve: &PowerCurve) {
    if curve.is_empty() {
        println!("{}", "No window fits the available power data".yellow());
        return;
    }

    let rows: Vec<CurveRow> = curve
        .points
        .iter()
        .map(|p| CurveRow {
            window: p.label(),
            seconds: p.window_seconds,
            watts: p.best_average_power_watts,
        })
        .collect();
    print_table(rows);
}

fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<EffortError>() {
        Some(effort_err) => {
            if effort_err.severity().to_tracing_level() == tracing::Level::WARN {
                tracing::warn!(error = %effort_err, "Command failed");
            } else {
                tracing::error!(error = %effort_err, "Command failed");
            }
            eprintln!("{} {}", "Error:".red().bold(), effort_err.user_message());
        }
        None => eprintln!("{} {:#}", "Error:".red().bold(), err),
    }
}
