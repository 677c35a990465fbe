//! xover CLI: config validation, bar-file replay, and synthetic bar generation.
//!
//! Commands:
//! - `validate` parse and validate a TOML config, print its fingerprint
//! - `replay` run a bar CSV through the engine and the simulated venue
//! - `synth` write a seeded random-walk bar CSV on one or more timeframes
//!
//! Bar CSV columns: `timeframe,timestamp,open,high,low,close,volume`, with
//! `timestamp` the RFC 3339 bar close time in UTC.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;
use xover_core::domain::{Bar, Timeframe};
use xover_core::execution::{replay, ReplayStats, SimulatedVenue};
use xover_core::{EngineConfig, EngineSummary, StrategyEngine};

#[derive(Parser)]
#[command(name = "xover", about = "Multi-timeframe moving-average crossover engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a TOML config, then print its fingerprint.
    Validate {
        /// Path to the TOML config file.
        config: PathBuf,
    },
    /// Replay a bar CSV through the engine and a simulated venue.
    Replay {
        /// Path to the TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bar CSV file. Reads stdin when omitted.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate a seeded random-walk bar CSV.
    Synth {
        /// Timeframes to emit, e.g. 15-MINUTE 1-HOUR.
        #[arg(long, num_args = 1.., default_values_t = vec![String::from("15-MINUTE")])]
        timeframes: Vec<String>,

        /// First bar open time (RFC 3339).
        #[arg(long, default_value = "2024-01-01T00:00:00Z")]
        start: String,

        /// Length of the generated series in hours.
        #[arg(long, default_value_t = 240)]
        hours: i64,

        /// Starting price.
        #[arg(long, default_value_t = 1.1)]
        price: f64,

        /// Largest one-minute move, in price units.
        #[arg(long, default_value_t = 0.0002)]
        step: f64,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output file. Writes stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => run_validate(config),
        Commands::Replay {
            config,
            bars,
            output,
        } => run_replay(config, bars, output),
        Commands::Synth {
            timeframes,
            start,
            hours,
            price,
            step,
            seed,
            output,
        } => run_synth(&timeframes, &start, hours, price, step, seed, output),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,xover_core=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn run_validate(path: PathBuf) -> Result<()> {
    let config = load_config(Some(&path))?;
    println!("instrument:  {}", config.instrument);
    println!("primary:     {}", config.primary_timeframe);
    println!("fingerprint: {}", config.fingerprint());
    Ok(())
}

/// One CSV row; converted to a [`Bar`] after parsing the timeframe.
#[derive(Debug, Serialize, Deserialize)]
struct BarRow {
    timeframe: String,
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl BarRow {
    fn into_bar(self) -> Result<Bar> {
        let timeframe: Timeframe = self
            .timeframe
            .parse()
            .with_context(|| format!("bar at {}", self.timestamp))?;
        Ok(Bar {
            timeframe,
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }

    fn from_bar(bar: &Bar) -> Self {
        Self {
            timeframe: bar.timeframe.to_string(),
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// Read bars and order them by close time, faster timeframes first on ties.
fn read_bars(reader: impl Read) -> Result<Vec<Bar>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();
    for (line, row) in csv_reader.deserialize::<BarRow>().enumerate() {
        let row = row.with_context(|| format!("bar row {}", line + 1))?;
        let bar = row.into_bar()?;
        if !bar.is_sane() {
            bail!("bar row {}: inconsistent OHLC or negative volume", line + 1);
        }
        bars.push(bar);
    }
    bars.sort_by_key(|b| (b.timestamp, b.timeframe.duration()));
    Ok(bars)
}

#[derive(Serialize)]
struct ReplayReport {
    replay: ReplayStats,
    summary: EngineSummary,
}

fn run_replay(
    config_path: Option<PathBuf>,
    bars_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let bars = match &bars_path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening bars {}", path.display()))?;
            read_bars(file)?
        }
        None => read_bars(std::io::stdin().lock())?,
    };
    if bars.is_empty() {
        bail!("no bars to replay");
    }

    let mut engine = StrategyEngine::new(config)?;
    let mut venue = SimulatedVenue::for_engine(&engine);
    info!(
        bars = bars.len(),
        venue_timeframe = %venue.price_timeframe(),
        "replaying"
    );
    let stats = replay(&mut engine, &mut venue, bars);

    let report = ReplayReport {
        replay: stats,
        summary: engine.summary(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Report saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Aggregate one-minute closes into bars of `timeframe`, each stamped with
/// its close time.
fn aggregate(timeframe: Timeframe, start: DateTime<Utc>, minute_closes: &[f64], open: f64) -> Vec<Bar> {
    let per_bar = timeframe.duration().num_minutes().max(1) as usize;
    let mut bars = Vec::with_capacity(minute_closes.len() / per_bar);
    let mut prev_close = open;
    for (i, chunk) in minute_closes.chunks(per_bar).enumerate() {
        if chunk.len() < per_bar {
            break;
        }
        let high = chunk.iter().copied().fold(prev_close, f64::max);
        let low = chunk.iter().copied().fold(prev_close, f64::min);
        let close = chunk[chunk.len() - 1];
        bars.push(Bar {
            timeframe,
            timestamp: start + timeframe.duration() * (i as i32 + 1),
            open: prev_close,
            high,
            low,
            close,
            volume: (per_bar * 100) as f64,
        });
        prev_close = close;
    }
    bars
}

fn run_synth(
    timeframes: &[String],
    start: &str,
    hours: i64,
    price: f64,
    step: f64,
    seed: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    if hours <= 0 || price <= 0.0 || step <= 0.0 {
        bail!("hours, price and step must be positive");
    }
    let start: DateTime<Utc> = DateTime::parse_from_rfc3339(start)
        .with_context(|| format!("parsing start {start}"))?
        .with_timezone(&Utc);
    let timeframes = timeframes
        .iter()
        .map(|s| s.parse::<Timeframe>().with_context(|| format!("timeframe {s}")))
        .collect::<Result<Vec<_>>>()?;

    let minutes = Duration::hours(hours).num_minutes() as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut level = price;
    let floor = step;
    let minute_closes: Vec<f64> = (0..minutes)
        .map(|_| {
            level = (level + rng.gen_range(-step..=step)).max(floor);
            level
        })
        .collect();

    let mut by_close: BTreeMap<(DateTime<Utc>, Duration), Bar> = BTreeMap::new();
    for tf in timeframes {
        for bar in aggregate(tf, start, &minute_closes, price) {
            by_close.insert((bar.timestamp, tf.duration()), bar);
        }
    }

    let sink: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(sink);
    for bar in by_close.values() {
        writer.serialize(BarRow::from_bar(bar))?;
    }
    writer.flush()?;
    if let Some(path) = output {
        eprintln!("{} bars written to {}", by_close.len(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn aggregate_stamps_close_times() {
        let closes: Vec<f64> = (1..=35).map(|i| i as f64).collect();
        let bars = aggregate(Timeframe::minutes(15), start(), &closes, 0.5);
        // partial trailing bucket is dropped
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, start() + Duration::minutes(15));
        assert_eq!(bars[0].open, 0.5);
        assert_eq!(bars[0].close, 15.0);
        assert_eq!(bars[1].open, 15.0);
        assert_eq!(bars[1].high, 30.0);
        assert_eq!(bars[1].low, 15.0);
    }

    #[test]
    fn csv_rows_sort_faster_first_on_ties() {
        let csv = "timeframe,timestamp,open,high,low,close,volume\n\
                   15-MINUTE,2024-01-01T00:15:00Z,1,2,0.5,1.5,10\n\
                   5-MINUTE,2024-01-01T00:15:00Z,1,2,0.5,1.5,10\n\
                   5-MINUTE,2024-01-01T00:10:00Z,1,2,0.5,1.5,10\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        let order: Vec<String> = bars.iter().map(|b| b.timeframe.to_string()).collect();
        assert_eq!(order, vec!["5-MINUTE", "5-MINUTE", "15-MINUTE"]);
        assert_eq!(bars[0].timestamp, start() + Duration::minutes(10));
    }

    #[test]
    fn inconsistent_ohlc_is_reported() {
        let csv = "timeframe,timestamp,open,high,low,close,volume\n\
                   15-MINUTE,2024-01-01T00:15:00Z,1,0.9,0.5,1.5,10\n";
        let err = read_bars(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("bar row 1"));
    }

    #[test]
    fn synthetic_bars_pass_sanity() {
        let closes: Vec<f64> = (0..60).map(|i| 1.1 + ((i % 7) as f64 - 3.0) * 0.001).collect();
        let bars = aggregate(Timeframe::minutes(5), start(), &closes, 1.1);
        assert_eq!(bars.len(), 12);
        assert!(bars.iter().all(Bar::is_sane));
    }

    #[test]
    fn bad_timeframe_is_reported() {
        let csv = "timeframe,timestamp,open,high,low,close,volume\n\
                   7-FORTNIGHT,2024-01-01T00:15:00Z,1,2,0.5,1.5,10\n";
        assert!(read_bars(csv.as_bytes()).is_err());
    }
}
