//! Rasterization and animation encoding for termsnap
//!
//! Turns emulated terminal lines into pixel canvases, reduces a run of
//! canvases into a compact animation and writes PNG and GIF files.

pub mod canvas;
pub mod encode;
pub mod font;
pub mod palette;
pub mod pipeline;
pub mod raster;
pub mod reduce;

pub use canvas::{Canvas, Rect, Surface};
pub use encode::{encode_gif, ensure_parent_dir, frame_duration_ms, save_gif, save_png};
pub use font::{FallbackPainter, FontPainter, FontSet, FontVariant};
pub use palette::{IndexedFrame, Palette, Quantizer};
pub use pipeline::Renderer;
pub use raster::{rasterize, GlyphPainter, RasterConfig};
pub use reduce::{Animation, FrameReducer, ReduceConfig, Reduced};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to read font {path}: {source}")]
    FontLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse font: {0}")]
    FontParse(String),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("GIF encoding error: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dimensions {width}x{height} exceed the GIF limit")]
    TooLarge { width: u32, height: u32 },

    #[error("Invalid animation: {0}")]
    InvalidAnimation(String),
}
