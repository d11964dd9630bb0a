//! Command-line surface: argument model, logging setup and run dispatch.

use std::io;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Args, Parser, ValueEnum};
use mirrorkit_io_sync::{
    EnumSyncDirection, EnumSyncOutcome, EnumSyncPatternMode, ReportSync, SpecSyncOptions,
    run_with_report,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "mirrorkit",
    version,
    about = "Back up or restore a list of files by modification time"
)]
pub struct Cli {
    #[command(flatten)]
    pub mode: ArgsMode,

    /// Parameter file: one relative path per line.
    pub param_file: PathBuf,

    /// Base directory files are copied from.
    pub origin_base: PathBuf,

    /// Base directory files are copied to.
    pub destination_base: PathBuf,

    /// Skip parameter entries matching this pattern (repeatable).
    #[arg(long = "exclude", value_name = "PATTERN", env = "MIRRORKIT_EXCLUDE")]
    pub patterns_exclude: Vec<String>,

    /// How `--exclude` patterns are interpreted.
    #[arg(long, value_enum, default_value_t = ArgPatternMode::Glob)]
    pub pattern_mode: ArgPatternMode,

    /// Decide only; do not write any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not copy extended attributes.
    #[arg(long)]
    pub no_xattrs: bool,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "MIRRORKIT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = ArgLogFormat::Text)]
    pub log_format: ArgLogFormat,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ArgsMode {
    /// Copy origin files onto the mirror.
    #[arg(short = 'b', long)]
    pub backup: bool,

    /// Copy the mirror back onto the original location.
    #[arg(short = 'r', long)]
    pub restore: bool,
}

impl ArgsMode {
    pub fn direction(&self) -> EnumSyncDirection {
        if self.restore {
            EnumSyncDirection::Restore
        } else {
            EnumSyncDirection::Backup
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArgPatternMode {
    Glob,
    Regex,
    Literal,
}

impl From<ArgPatternMode> for EnumSyncPatternMode {
    fn from(value: ArgPatternMode) -> Self {
        match value {
            ArgPatternMode::Glob => Self::Glob,
            ArgPatternMode::Regex => Self::Regex,
            ArgPatternMode::Literal => Self::Literal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArgLogFormat {
    Text,
    Json,
}

impl Cli {
    pub fn to_options(&self) -> SpecSyncOptions {
        SpecSyncOptions {
            patterns_exclude: if self.patterns_exclude.is_empty() {
                None
            } else {
                Some(self.patterns_exclude.clone())
            },
            rule_pattern: self.pattern_mode.into(),
            if_dry_run: self.dry_run,
            if_preserve_xattrs: !self.no_xattrs,
        }
    }
}

/// Install the global `tracing` subscriber, writing to stderr.
pub fn init_logging(level: &str, log_format: ArgLogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("invalid log level `{level}`: {e}"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false);
    let res = match log_format {
        ArgLogFormat::Text => builder.try_init(),
        ArgLogFormat::Json => builder.json().try_init(),
    };
    res.map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

/// Print the run header, execute the batch and print its summary.
pub fn execute(cli: &Cli) -> ReportSync {
    let direction = cli.mode.direction();
    match direction {
        EnumSyncDirection::Backup => println!("MODE: backup (origin -> mirror)"),
        EnumSyncDirection::Restore => println!("MODE: restore (mirror -> origin)"),
    }
    println!("Parameter file: {}", cli.param_file.display());
    println!("Origin base: {}", cli.origin_base.display());
    println!("Destination base: {}", cli.destination_base.display());

    let report = run_with_report(
        &cli.param_file,
        &cli.origin_base,
        &cli.destination_base,
        direction,
        &cli.to_options(),
    );
    println!("{report}");
    report
}

/// One-line user message for a finished run.
pub fn outcome_message(outcome: EnumSyncOutcome) -> String {
    if outcome.is_ok() {
        "operation completed successfully".to_string()
    } else {
        format!("operation failed with {outcome}")
    }
}
