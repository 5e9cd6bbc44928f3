//! Batch manifest
//!
//! A TOML file listing the demos to record:
//!
//! ```toml
//! [defaults]
//! output_dir = "assets"
//! font_size = 14.0
//!
//! [[demo]]
//! name = "progress"
//! command = "cargo run --release --example progress"
//! kind = "animated"
//! width = 600
//! height = 160
//! duration = 6.0
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use termsnap_pty::CaptureBuilder;

/// Convert a seconds value from config, rejecting negative, non-finite and
/// out-of-range numbers
pub fn seconds(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow::anyhow!("{} is not a valid number of seconds", secs))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default, rename = "demo")]
    pub demos: Vec<Demo>,
}

/// Settings shared by every demo unless the demo overrides them
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    /// Where relative outputs go, itself relative to the manifest
    pub output_dir: PathBuf,
    pub font: Option<PathBuf>,
    pub bold_font: Option<PathBuf>,
    pub font_size: Option<f32>,
    pub padding: Option<u32>,
    pub width: u32,
    pub fps: u32,
    /// Seconds an animated demo may run
    pub duration: f64,
    /// Seconds a still demo may run
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("assets"),
            font: None,
            bold_font: None,
            font_size: None,
            padding: None,
            width: 700,
            fps: 10,
            duration: 5.0,
            timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoKind {
    #[default]
    Still,
    Animated,
}

/// A command line, either for `sh -c` or as an argv vector
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Shell(String),
    Argv(Vec<String>),
}

impl CommandLine {
    pub fn to_command(&self) -> std::process::Command {
        match self {
            Self::Shell(line) => {
                let mut command = std::process::Command::new("sh");
                command.arg("-c").arg(line);
                command
            }
            Self::Argv(argv) => {
                let mut command = std::process::Command::new(argv.first().map_or("", String::as_str));
                command.args(argv.iter().skip(1));
                command
            }
        }
    }

    pub fn to_capture(&self) -> CaptureBuilder {
        match self {
            Self::Shell(line) => CaptureBuilder::shell(line.clone()),
            Self::Argv(argv) => CaptureBuilder::argv(argv.iter().cloned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Demo {
    pub name: String,
    pub command: CommandLine,
    #[serde(default)]
    pub kind: DemoKind,
    pub output: Option<PathBuf>,
    pub width: Option<u32>,
    /// Fixed animation height; median frame height when unset
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub duration: Option<f64>,
    pub timeout: Option<u64>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        seconds(self.defaults.duration).context("invalid default duration")?;
        let mut seen = std::collections::HashSet::new();
        for demo in &self.demos {
            if demo.name.trim().is_empty() {
                anyhow::bail!("demo with an empty name");
            }
            if !seen.insert(demo.name.as_str()) {
                anyhow::bail!("duplicate demo name {:?}", demo.name);
            }
            let empty = match &demo.command {
                CommandLine::Shell(line) => line.trim().is_empty(),
                CommandLine::Argv(argv) => argv.is_empty(),
            };
            if empty {
                anyhow::bail!("demo {:?} has an empty command", demo.name);
            }
            if demo.fps == Some(0) {
                anyhow::bail!("demo {:?} has fps = 0", demo.name);
            }
            demo.duration(&self.defaults)
                .with_context(|| format!("demo {:?} has an invalid duration", demo.name))?;
        }
        Ok(())
    }

    /// Output directory, resolved against the manifest's own directory
    pub fn output_dir(&self, manifest_dir: &Path) -> PathBuf {
        manifest_dir.join(&self.defaults.output_dir)
    }
}

impl Demo {
    /// Where this demo is written: an explicit relative path goes under
    /// `output_dir`, and without one the name plus the kind's extension is used
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        match &self.output {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => output_dir.join(path),
            None => {
                let ext = match self.kind {
                    DemoKind::Still => "png",
                    DemoKind::Animated => "gif",
                };
                output_dir.join(format!("{}.{}", self.name, ext))
            }
        }
    }

    pub fn width(&self, defaults: &Defaults) -> u32 {
        self.width.unwrap_or(defaults.width)
    }

    pub fn fps(&self, defaults: &Defaults) -> u32 {
        self.fps.unwrap_or(defaults.fps).max(1)
    }

    pub fn duration(&self, defaults: &Defaults) -> Result<Duration> {
        seconds(self.duration.unwrap_or(defaults.duration))
    }

    pub fn timeout(&self, defaults: &Defaults) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(defaults.timeout))
    }
}
