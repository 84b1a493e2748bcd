/*!
 * Run Options
 * clap-derived command line converted once into validated options
 */

use crate::core::errors::{ConfigError, Result};
use crate::core::limits::{DEFAULT_INTERVAL_MS, DEFAULT_SAMPLE_PERIOD};
use crate::core::types::{Dimension, Pid};
use crate::decode::DecoderKind;
use crate::sampling::SourceKind;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Sample retired instructions and report the live instruction mix
#[derive(Debug, Clone, Parser)]
#[command(name = "insnmix", version, about)]
pub struct Cli {
    /// Interval length in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval: u64,

    /// Events between two samples
    #[arg(short, long = "sample-period", default_value_t = DEFAULT_SAMPLE_PERIOD)]
    pub sample_period: u64,

    /// Only profile this process
    #[arg(short, long)]
    pub pid: Option<Pid>,

    /// Report mnemonics instead of categories
    #[arg(short, long, conflicts_with = "extensions")]
    pub mnemonics: bool,

    /// Report ISA extensions instead of categories
    #[arg(short, long)]
    pub extensions: bool,

    /// Only show columns matching this name (repeatable)
    #[arg(short, long = "filter")]
    pub filters: Vec<String>,

    /// Write intervals to a CSV file instead of the interactive view
    #[arg(short, long)]
    pub csv: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(short, long = "time")]
    pub time: Option<u64>,

    /// Stop after this many intervals
    #[arg(short = 'n', long = "intervals")]
    pub intervals: Option<u64>,

    /// Instruction decoder (x86 or aarch64)
    #[arg(long, default_value_t = DecoderKind::host())]
    pub decoder: DecoderKind,

    /// Sample transport (perf or simulate)
    #[arg(long, default_value_t = SourceKind::Perf)]
    pub source: SourceKind,

    /// Show failure and process share columns
    #[arg(long)]
    pub debug: bool,
}

/// Where interval reports go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "path", rename_all = "snake_case")]
pub enum OutputMode {
    Interactive,
    Csv(PathBuf),
}

/// Validated, immutable run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    pub interval_ms: u64,
    pub sample_period: u64,
    pub pid: Option<Pid>,
    pub dimension: Dimension,
    pub filters: Vec<String>,
    pub output: OutputMode,
    pub runtime_secs: Option<u64>,
    pub max_intervals: Option<u64>,
    pub decoder: DecoderKind,
    pub source: SourceKind,
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            sample_period: DEFAULT_SAMPLE_PERIOD,
            pid: None,
            dimension: Dimension::Category,
            filters: Vec::new(),
            output: OutputMode::Interactive,
            runtime_secs: None,
            max_intervals: None,
            decoder: DecoderKind::host(),
            source: SourceKind::Perf,
            debug: false,
        }
    }
}

impl Options {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let dimension = if cli.mnemonics {
            Dimension::Mnemonic
        } else if cli.extensions {
            Dimension::Extension
        } else {
            Dimension::Category
        };

        let filters = cli
            .filters
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(|f| dimension.normalize(f))
            .collect();

        let options = Self {
            interval_ms: cli.interval,
            sample_period: cli.sample_period,
            pid: cli.pid,
            dimension,
            filters,
            output: cli.csv.map_or(OutputMode::Interactive, OutputMode::Csv),
            runtime_secs: cli.time,
            max_intervals: cli.intervals,
            decoder: cli.decoder,
            source: cli.source,
            debug: cli.debug,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval.into());
        }
        if self.sample_period == 0 {
            return Err(ConfigError::ZeroSamplePeriod.into());
        }
        if self.max_intervals == Some(0) {
            return Err(ConfigError::InvalidValue {
                option: "intervals".into(),
                reason: "must be greater than zero".into(),
            }
            .into());
        }
        if self.runtime_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                option: "time".into(),
                reason: "must be greater than zero".into(),
            }
            .into());
        }
        Ok(())
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn runtime(&self) -> Option<Duration> {
        self.runtime_secs.map(Duration::from_secs)
    }

    pub fn is_interactive(&self) -> bool {
        self.output == OutputMode::Interactive
    }
}
