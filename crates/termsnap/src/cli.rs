//! Command-line interface

use crate::manifest::{seconds, Manifest};
use crate::record::{self, AnimationOptions, RenderSettings};
use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use termsnap_pty::CaptureBuilder;
use termsnap_render::font::{DEFAULT_BOLD_FONT, DEFAULT_FONT_SIZE, DEFAULT_REGULAR_FONT};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "termsnap - Render terminal output to PNG screenshots and GIF animations"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[command(flatten)]
    pub font: FontArgs,
}

/// Font and layout options shared by every subcommand
#[derive(ClapArgs, Debug, Clone)]
pub struct FontArgs {
    /// Regular monospace TTF
    #[arg(long, global = true, default_value = DEFAULT_REGULAR_FONT)]
    pub font: PathBuf,

    /// Bold monospace TTF; falls back to the regular face
    #[arg(long, global = true, default_value = DEFAULT_BOLD_FONT)]
    pub bold_font: PathBuf,

    /// Font size in pixels
    #[arg(long, global = true, default_value_t = DEFAULT_FONT_SIZE)]
    pub font_size: f32,

    /// Margin around the text in pixels
    #[arg(long, global = true, default_value_t = 20)]
    pub padding: u32,
}

impl From<&FontArgs> for RenderSettings {
    fn from(args: &FontArgs) -> Self {
        Self {
            font: args.font.clone(),
            bold_font: args.bold_font.clone(),
            font_size: args.font_size,
            padding: args.padding,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render already-captured terminal output to a PNG
    Render {
        /// File holding the output, or `-` for stdin
        input: PathBuf,

        /// PNG to write
        #[arg(short, long)]
        output: PathBuf,

        /// Minimum image width in pixels
        #[arg(long, default_value_t = 0)]
        width: u32,
    },

    /// Run a command once and render its output to a PNG
    Still {
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = 0)]
        width: u32,

        /// Seconds before the command is killed
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Command and arguments, after `--`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Run a command in a PTY and record it as a GIF
    Record {
        #[arg(short, long)]
        output: PathBuf,

        /// Seconds to record
        #[arg(long, default_value = "5", value_parser = parse_seconds)]
        duration: Duration,

        /// Snapshots per second
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        fps: u32,

        /// Minimum frame width in pixels; also sizes the PTY
        #[arg(long)]
        width: Option<u32>,

        /// Fixed frame height in pixels
        #[arg(long)]
        height: Option<u32>,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Record every demo in a TOML manifest
    Batch {
        manifest: PathBuf,
    },
}

pub async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);
    execute(args).await
}

fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Carry out a parsed command line
pub async fn execute(args: Args) -> Result<()> {
    let settings = RenderSettings::from(&args.font);

    match args.command {
        Commands::Render {
            input,
            output,
            width,
        } => {
            let text = read_input(&input)?;
            record::render_text_to_png(&settings, &text, width, &output)
        }
        Commands::Still {
            output,
            width,
            timeout,
            command,
        } => {
            let command = std_command(&command)?;
            record::record_still(
                &settings,
                command,
                width,
                Duration::from_secs(timeout),
                &output,
            )
            .await
        }
        Commands::Record {
            output,
            duration,
            fps,
            width,
            height,
            command,
        } => {
            let options = AnimationOptions {
                width,
                height,
                fps,
                duration,
            };
            let capture = CaptureBuilder::argv(command);
            if !record::record_animated(&settings, capture, &options, &output).await? {
                warn!("Nothing recorded for {}", output.display());
            }
            Ok(())
        }
        Commands::Batch { manifest } => {
            let loaded = Manifest::load(&manifest)?;
            let dir = manifest.parent().unwrap_or_else(|| Path::new("."));
            let summary = record::run_batch(&settings, &loaded, dir).await;
            for (name, error) in &summary.failed {
                warn!("{}: {}", name, error);
            }
            if summary.is_clean() {
                info!("All {} demos recorded", summary.recorded.len());
            }
            Ok(())
        }
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value.parse().map_err(|e| format!("{}", e))?;
    seconds(secs).map_err(|e| e.to_string())
}

fn read_input(input: &Path) -> Result<String> {
    let bytes = if input == Path::new("-") {
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .context("failed to read stdin")?;
        bytes
    } else {
        std::fs::read(input).with_context(|| format!("failed to read {}", input.display()))?
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn std_command(argv: &[String]) -> Result<std::process::Command> {
    let Some((program, rest)) = argv.split_first() else {
        bail!("no command given");
    };
    let mut command = std::process::Command::new(program);
    command.args(rest);
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn record_takes_trailing_command() {
        let args = Args::parse_from([
            "termsnap", "record", "-o", "out.gif", "--fps", "12", "--", "ls", "-la",
        ]);
        match args.command {
            Commands::Record {
                fps,
                command,
                duration,
                ..
            } => {
                assert_eq!(fps, 12);
                assert_eq!(duration, Duration::from_secs(5));
                assert_eq!(command, vec!["ls", "-la"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn global_font_options_apply_after_subcommand() {
        let args = Args::parse_from([
            "termsnap",
            "render",
            "-",
            "-o",
            "out.png",
            "--font-size",
            "18",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.font.font_size, 18.0);
        assert_eq!(args.font.padding, 20);
        assert_eq!(args.log_level, LogLevel::Debug);
        assert_eq!(args.font.font, PathBuf::from(DEFAULT_REGULAR_FONT));
    }

    #[test]
    fn zero_fps_is_rejected() {
        let result = Args::try_parse_from([
            "termsnap", "record", "-o", "x.gif", "--fps", "0", "--", "true",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unusable_durations_are_rejected() {
        for value in ["inf", "NaN", "-1", "1e30", "soon"] {
            let result = Args::try_parse_from([
                "termsnap", "record", "-o", "x.gif", "--duration", value, "--", "true",
            ]);
            assert!(result.is_err(), "--duration {} accepted", value);
        }

        let args = Args::try_parse_from([
            "termsnap", "record", "-o", "x.gif", "--duration", "0.5", "--", "true",
        ])
        .unwrap();
        match args.command {
            Commands::Record { duration, .. } => assert_eq!(duration, Duration::from_millis(500)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn still_requires_a_command() {
        let result = Args::try_parse_from(["termsnap", "still", "-o", "x.png"]);
        assert!(result.is_err());
    }
}
