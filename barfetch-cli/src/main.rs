//! barfetch CLI: download historical bars and manage symbol presets.
//!
//! Commands:
//! - `download`: fetch a symbols x timeframes matrix and export CSV/xlsx
//! - `symbols`: list the symbols the terminal currently offers
//! - `preset`: list/save/delete named symbol lists

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use barfetch_core::domain::Timeframe;
use barfetch_core::terminal::{BridgeTerminal, SyntheticTerminal, Terminal};
use barfetch_runner::{
    spawn_worker, split_symbols, LogLevel, PresetStore, RunRequest, TerminalSpec, WorkerCommand,
    WorkerEvent, DEFAULT_PRESET_FILE,
};

#[derive(Parser)]
#[command(
    name = "barfetch",
    about = "barfetch CLI: historical bar downloader and exporter"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download bars for every symbol/timeframe combination and export them.
    Download {
        /// Symbols, comma-separated or space-separated (e.g. EURUSD,XAUUSD).
        symbols: Vec<String>,

        /// Load symbols from a named preset instead of the command line.
        #[arg(long)]
        preset: Option<String>,

        /// Timeframes, comma-separated (M1 M5 M15 M30 H1 H4 D1 W1 MN1).
        #[arg(long, default_value = "H1")]
        timeframes: String,

        /// Range start (YYYY-MM-DD); overrides --days-back.
        #[arg(long)]
        start: Option<String>,

        /// Range end (YYYY-MM-DD). Defaults to today when --start is given.
        #[arg(long)]
        end: Option<String>,

        /// Days back from today, used when no explicit range is given.
        #[arg(long, default_value_t = 30)]
        days_back: i64,

        /// Output file or directory. Empty skips persistence.
        #[arg(long, default_value = "")]
        output: String,

        /// Export format: csv or xlsx.
        #[arg(long, default_value = "csv")]
        format: String,

        /// Export columns, comma-separated.
        #[arg(
            long,
            default_value = "Date,Open,High,Low,Close,Volume,Spread,RealVolume"
        )]
        columns: String,

        /// Terminal bridge endpoint.
        #[arg(long)]
        endpoint: Option<String>,

        /// Use the in-process synthetic terminal instead of a bridge.
        #[arg(long, default_value_t = false)]
        demo: bool,

        /// Read the full run request from a TOML file, ignoring the other
        /// request arguments.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Preset file used with --preset.
        #[arg(long, default_value = DEFAULT_PRESET_FILE)]
        presets_file: PathBuf,
    },
    /// List the symbols the terminal currently offers.
    Symbols {
        /// Terminal bridge endpoint.
        #[arg(long)]
        endpoint: Option<String>,

        /// Use the in-process synthetic terminal instead of a bridge.
        #[arg(long, default_value_t = false)]
        demo: bool,
    },
    /// Manage named symbol presets.
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// List saved presets.
    List {
        #[arg(long, default_value = DEFAULT_PRESET_FILE)]
        file: PathBuf,
    },
    /// Save (or replace) a preset.
    Save {
        name: String,
        /// Comma-separated symbol list.
        symbols: String,
        #[arg(long, default_value = DEFAULT_PRESET_FILE)]
        file: PathBuf,
    },
    /// Delete a preset.
    Delete {
        name: String,
        #[arg(long, default_value = DEFAULT_PRESET_FILE)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            symbols,
            preset,
            timeframes,
            start,
            end,
            days_back,
            output,
            format,
            columns,
            endpoint,
            demo,
            config,
            presets_file,
        } => run_download(
            symbols,
            preset,
            timeframes,
            start,
            end,
            days_back,
            output,
            format,
            columns,
            endpoint,
            demo,
            config,
            presets_file,
        ),
        Commands::Symbols { endpoint, demo } => run_symbols(endpoint, demo),
        Commands::Preset { action } => match action {
            PresetAction::List { file } => preset_list(&file),
            PresetAction::Save {
                name,
                symbols,
                file,
            } => preset_save(&file, &name, &symbols),
            PresetAction::Delete { name, file } => preset_delete(&file, &name),
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn run_download(
    symbols: Vec<String>,
    preset: Option<String>,
    timeframes: String,
    start: Option<String>,
    end: Option<String>,
    days_back: i64,
    output: String,
    format: String,
    columns: String,
    endpoint: Option<String>,
    demo: bool,
    config: Option<PathBuf>,
    presets_file: PathBuf,
) -> Result<()> {
    let request = match config {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => build_request(
            symbols,
            preset,
            &timeframes,
            start.as_deref(),
            end.as_deref(),
            days_back,
            output,
            &format,
            &columns,
            &presets_file,
        )?,
    };
    request.validate()?;

    let spec = terminal_spec(endpoint, demo);

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (evt_tx, evt_rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let handle = spawn_worker(cmd_rx, evt_tx, cancel);

    cmd_tx
        .send(WorkerCommand::StartRun {
            request,
            terminal: spec,
        })
        .map_err(|_| anyhow!("worker thread is not running"))?;

    let mut run_error: Option<String> = None;
    for event in evt_rx.iter() {
        match event {
            WorkerEvent::Progress(percent) => println!("progress: {percent}%"),
            WorkerEvent::Log { level, message } => match level {
                LogLevel::Info => println!("{message}"),
                LogLevel::Warning | LogLevel::Error => eprintln!("{level}: {message}"),
            },
            WorkerEvent::Finished(results) => {
                if results.is_empty() {
                    println!("download complete but no data received");
                } else {
                    println!("download complete: {} series", results.len());
                    for (key, bars) in &results {
                        println!("  {key}: {} bars", bars.len());
                    }
                }
                break;
            }
            WorkerEvent::Error(message) => {
                run_error = Some(message);
                break;
            }
        }
    }

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    handle
        .join()
        .map_err(|_| anyhow!("worker thread panicked"))?;

    if let Some(message) = run_error {
        bail!("{message}");
    }
    Ok(())
}

fn run_symbols(endpoint: Option<String>, demo: bool) -> Result<()> {
    let terminal: Box<dyn Terminal> = if demo {
        Box::new(SyntheticTerminal::new())
    } else {
        Box::new(BridgeTerminal::new(
            endpoint.as_deref().unwrap_or(BridgeTerminal::DEFAULT_ENDPOINT),
        ))
    };

    terminal.connect().context("terminal connection failed")?;
    let result = terminal.symbols();
    terminal.disconnect();

    let symbols = result.context("failed to list terminal symbols")?;
    for symbol in &symbols {
        println!("{symbol}");
    }
    println!("{} symbols", symbols.len());
    Ok(())
}

fn preset_list(file: &Path) -> Result<()> {
    let store = PresetStore::load(file);
    if store.is_empty() {
        println!("no presets saved in {}", file.display());
        return Ok(());
    }
    for name in store.names() {
        println!("{name}: {}", store.get(name).unwrap_or(""));
    }
    Ok(())
}

fn preset_save(file: &Path, name: &str, symbols: &str) -> Result<()> {
    if split_symbols(symbols).is_empty() {
        bail!("preset '{name}' needs at least one symbol");
    }
    let mut store = PresetStore::load(file);
    store.set(name, symbols);
    store.save(file)?;
    println!("preset '{name}' saved");
    Ok(())
}

fn preset_delete(file: &Path, name: &str) -> Result<()> {
    let mut store = PresetStore::load(file);
    if !store.remove(name) {
        bail!("no preset named '{name}' in {}", file.display());
    }
    store.save(file)?;
    println!("preset '{name}' deleted");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_request(
    symbols: Vec<String>,
    preset: Option<String>,
    timeframes: &str,
    start: Option<&str>,
    end: Option<&str>,
    days_back: i64,
    output: String,
    format: &str,
    columns: &str,
    presets_file: &Path,
) -> Result<RunRequest> {
    let symbols = match preset {
        Some(name) => PresetStore::load(presets_file)
            .symbols(&name)
            .ok_or_else(|| anyhow!("no preset named '{name}' in {}", presets_file.display()))?,
        None => symbols.iter().flat_map(|s| split_symbols(s)).collect(),
    };

    let timeframes = split_symbols(timeframes)
        .iter()
        .map(|tf| tf.parse::<Timeframe>())
        .collect::<Result<Vec<_>, _>>()?;

    let (start, end) = resolve_range(start, end, days_back)?;

    Ok(RunRequest {
        symbols,
        timeframes,
        start,
        end,
        output_path: output,
        format: format.parse()?,
        columns: split_symbols(columns),
    })
}

/// Explicit range when `--start` is given (end defaulting to today),
/// otherwise `days_back` from today. Both ends are date midnights UTC.
fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    days_back: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let today = Utc::now().date_naive();
    match (start, end) {
        (Some(start), end) => {
            let start = parse_date(start)?;
            let end = match end {
                Some(end) => parse_date(end)?,
                None => midnight(today),
            };
            Ok((start, end))
        }
        (None, Some(_)) => bail!("--end requires --start"),
        (None, None) => {
            if days_back < 1 {
                bail!("--days-back must be at least 1");
            }
            let end = midnight(today);
            Ok((end - Duration::days(days_back), end))
        }
    }
}

fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))?;
    Ok(midnight(date))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

fn terminal_spec(endpoint: Option<String>, demo: bool) -> TerminalSpec {
    if demo {
        TerminalSpec::Synthetic
    } else {
        TerminalSpec::Bridge {
            endpoint: endpoint.unwrap_or_else(|| BridgeTerminal::DEFAULT_ENDPOINT.to_string()),
        }
    }
}
