//! Recording orchestration
//!
//! Glues capture, emulation and rasterization together for the three ways
//! termsnap produces an artifact: rendering text that was already captured,
//! running a command once for a still PNG, and sampling a command in a PTY
//! for an animated GIF.

use crate::manifest::{Defaults, Demo, DemoKind, Manifest};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use termsnap_pty::{capture_output, pty::DEFAULT_ROWS, CaptureBuilder};
use termsnap_render::{
    font::{DEFAULT_BOLD_FONT, DEFAULT_FONT_SIZE, DEFAULT_REGULAR_FONT},
    save_gif, save_png, FallbackPainter, FontPainter, FontSet, FrameReducer, GlyphPainter,
    RasterConfig, ReduceConfig, Reduced, Renderer,
};
use tracing::{debug, info, warn};

/// Narrowest PTY a width hint may produce
const MIN_PTY_COLS: u16 = 20;

/// Font and layout shared by every artifact in a run
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub font: PathBuf,
    pub bold_font: PathBuf,
    pub font_size: f32,
    pub padding: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            font: PathBuf::from(DEFAULT_REGULAR_FONT),
            bold_font: PathBuf::from(DEFAULT_BOLD_FONT),
            font_size: DEFAULT_FONT_SIZE,
            padding: 20,
        }
    }
}

impl RenderSettings {
    /// Apply a manifest's `[defaults]` on top of these settings
    pub fn merged(&self, defaults: &Defaults) -> Self {
        Self {
            font: defaults.font.clone().unwrap_or_else(|| self.font.clone()),
            bold_font: defaults
                .bold_font
                .clone()
                .unwrap_or_else(|| self.bold_font.clone()),
            font_size: defaults.font_size.unwrap_or(self.font_size),
            padding: defaults.padding.unwrap_or(self.padding),
        }
    }

    /// Load the configured fonts, or fall back to block glyphs when the
    /// regular face cannot be used
    pub fn painter(&self) -> Box<dyn GlyphPainter> {
        match FontSet::load(&self.font, &self.bold_font) {
            Ok(fonts) => Box::new(FontPainter::new(fonts, self.font_size)),
            Err(e) => {
                warn!("{}; drawing text as blocks", e);
                Box::new(FallbackPainter::new(self.font_size))
            }
        }
    }

    pub fn raster_config(&self, min_width: u32) -> RasterConfig {
        RasterConfig {
            padding: self.padding,
            min_width,
            ..RasterConfig::default()
        }
    }

    pub fn renderer(&self, min_width: u32) -> Renderer<Box<dyn GlyphPainter>> {
        Renderer::new(self.painter(), self.raster_config(min_width))
    }
}

/// Capture parameters for an animated recording
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationOptions {
    /// Minimum frame width in pixels, also used to size the PTY
    pub width: Option<u32>,
    /// Fixed frame height in pixels
    pub height: Option<u32>,
    pub fps: u32,
    pub duration: Duration,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            fps: 10,
            duration: Duration::from_secs(5),
        }
    }
}

/// Render already-captured terminal output to a PNG
pub fn render_text_to_png(
    settings: &RenderSettings,
    text: &str,
    min_width: u32,
    output: &Path,
) -> Result<()> {
    let canvas = settings.renderer(min_width).render_text(text);
    save_png(&canvas, output).with_context(|| format!("failed to write {}", output.display()))
}

/// Run `command` without a PTY and render everything it printed
pub async fn record_still(
    settings: &RenderSettings,
    command: Command,
    min_width: u32,
    limit: Duration,
    output: &Path,
) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    let text = capture_output(command, limit)
        .await
        .with_context(|| format!("failed to capture {}", program))?;
    debug!("Captured {} bytes from {}", text.len(), program);

    render_text_to_png(settings, &text, min_width, output)
}

/// Sample `capture` in a PTY and encode the result as a GIF.
///
/// Returns `false` when nothing visible was captured and no file was written.
pub async fn record_animated(
    settings: &RenderSettings,
    capture: CaptureBuilder,
    options: &AnimationOptions,
    output: &Path,
) -> Result<bool> {
    let mut renderer = settings.renderer(options.width.unwrap_or(0));
    let mut capture = capture.fps(options.fps).duration(options.duration);
    if let Some(width) = options.width {
        let cols = pty_cols(width, settings.padding, renderer.painter().measure('M'));
        capture = capture.dimensions(DEFAULT_ROWS, cols);
    }

    let frames = capture.build().run().await.context("capture failed")?;
    info!("Captured {} frames", frames.len());

    let reducer = FrameReducer::new(ReduceConfig {
        fixed_height: options.height,
        ..ReduceConfig::default()
    });
    match renderer.animate(frames.iter().map(|f| f.text.as_str()), &reducer) {
        Reduced::Empty => {
            warn!("No visible output, skipping {}", output.display());
            Ok(false)
        }
        Reduced::Animation(animation) => {
            save_gif(&animation, options.fps, output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            Ok(true)
        }
    }
}

/// Terminal columns that fit in `width` pixels after padding
fn pty_cols(width: u32, padding: u32, cell_width: u32) -> u16 {
    let usable = width.saturating_sub(padding.saturating_mul(2));
    let cols = usable / cell_width.max(1);
    u16::try_from(cols).unwrap_or(u16::MAX).max(MIN_PTY_COLS)
}

/// What happened to each demo in a batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub recorded: Vec<PathBuf>,
    /// Demos that ran but produced nothing visible
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Record every demo in `manifest`. A failing demo is logged and skipped.
pub async fn run_batch(
    settings: &RenderSettings,
    manifest: &Manifest,
    manifest_dir: &Path,
) -> BatchSummary {
    let settings = settings.merged(&manifest.defaults);
    let manifest_dir = if manifest_dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        manifest_dir
    };
    let output_dir = manifest.output_dir(manifest_dir);
    let mut summary = BatchSummary::default();

    for demo in &manifest.demos {
        let output = demo.output_path(&output_dir);
        info!("Recording {} -> {}", demo.name, output.display());

        match record_demo(&settings, &manifest.defaults, demo, manifest_dir, &output).await {
            Ok(true) => summary.recorded.push(output),
            Ok(false) => summary.skipped.push(demo.name.clone()),
            Err(e) => {
                warn!("Demo {} failed: {:#}", demo.name, e);
                summary.failed.push((demo.name.clone(), format!("{:#}", e)));
            }
        }
    }

    info!(
        "Batch done: {} recorded, {} skipped, {} failed",
        summary.recorded.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    summary
}

async fn record_demo(
    settings: &RenderSettings,
    defaults: &Defaults,
    demo: &Demo,
    working_dir: &Path,
    output: &Path,
) -> Result<bool> {
    match demo.kind {
        DemoKind::Still => {
            let mut command = demo.command.to_command();
            command.current_dir(working_dir).envs(&demo.env);
            record_still(
                settings,
                command,
                demo.width(defaults),
                demo.timeout(defaults),
                output,
            )
            .await?;
            Ok(true)
        }
        DemoKind::Animated => {
            let mut capture = demo.command.to_capture().current_dir(working_dir);
            for (key, value) in &demo.env {
                capture = capture.env(key.as_str(), value.as_str());
            }
            let options = AnimationOptions {
                width: Some(demo.width(defaults)),
                height: demo.height,
                fps: demo.fps(defaults),
                duration: demo.duration(defaults)?,
            };
            record_animated(settings, capture, &options, output).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_defaults_override_settings() {
        let defaults = Defaults {
            font_size: Some(18.0),
            padding: Some(8),
            ..Defaults::default()
        };
        let merged = RenderSettings::default().merged(&defaults);

        assert_eq!(merged.font_size, 18.0);
        assert_eq!(merged.padding, 8);
        assert_eq!(merged.font, PathBuf::from(DEFAULT_REGULAR_FONT));
    }

    #[test]
    fn missing_font_falls_back() {
        let settings = RenderSettings {
            font: PathBuf::from("/nonexistent/font.ttf"),
            font_size: 10.0,
            ..RenderSettings::default()
        };
        let painter = settings.painter();
        assert_eq!(painter.measure('M'), 6);
        assert_eq!(painter.line_height(), 15);
    }

    #[test]
    fn pty_columns_follow_width() {
        assert_eq!(pty_cols(600, 20, 8), 70);
        assert_eq!(pty_cols(100, 20, 8), MIN_PTY_COLS);
        assert_eq!(pty_cols(600, 20, 0), 560);
    }
}
