//! Terminal output interpretation for termsnap
//!
//! Turns a captured byte stream (printable text interleaved with ANSI control
//! sequences) into a list of styled lines ready for rasterization. Only the
//! subset of terminal behavior that matters for a top-down redraw is modeled:
//! colors, text attributes, carriage-return overwrite, cursor-up and
//! full-screen erase.

pub mod color;
pub mod emulator;
pub mod parser;
pub mod style;

pub use color::{basic_color, resolve_indexed, resolve_truecolor, Rgb, ANSI_PALETTE};
pub use emulator::{render_lines, Terminal};
pub use parser::{tokenize, Sequence, Token, Tokens};
pub use style::{Line, Segment, StyleAttributes, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminalError {
    #[error("Invalid color index: {0} (expected 0-255)")]
    InvalidColorIndex(u32),

    #[error("Invalid color component: {0} (expected 0-255)")]
    InvalidColorComponent(u32),

    #[error("Missing parameters for extended color (code {0})")]
    MissingColorParameters(u32),
}
