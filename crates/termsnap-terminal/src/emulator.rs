//! Line-oriented terminal emulator
//!
//! Folds the token stream into finalized lines. Rendering is always
//! re-synthesized top-down from the surviving lines, so absolute cursor
//! positioning is not modeled; only the operations that add, overwrite or
//! remove trailing content are.

use crate::{
    parser::{tokenize, Sequence, Token},
    style::{Line, Segment, StyleAttributes},
};
use tracing::{debug, trace};

const TAB_WIDTH: usize = 8;

/// A single character of the in-progress line
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    c: char,
    style: StyleAttributes,
}

/// Terminal emulator state for one stream
#[derive(Debug, Clone, Default)]
pub struct Terminal {
    /// Attributes applied to newly written characters
    style: StyleAttributes,

    /// Completed lines, oldest first
    lines: Vec<Line>,

    /// Line currently being written
    current: Vec<Cell>,

    /// Write position within `current`
    column: usize,
}

impl Terminal {
    /// Create a terminal with default attributes and no content
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text attributes
    pub fn style(&self) -> StyleAttributes {
        self.style
    }

    /// Apply a chunk of output
    pub fn feed(&mut self, text: &str) {
        for token in tokenize(text) {
            match token {
                Token::Literal(s) => self.write_str(s),
                Token::Sequence(seq) => self.apply(seq),
            }
        }
    }

    /// Finalize the stream and return its lines with trailing blank lines
    /// removed
    pub fn finish(mut self) -> Vec<Line> {
        if !self.current.is_empty() {
            self.finalize_line();
        }
        while self.lines.last().is_some_and(Line::is_blank) {
            self.lines.pop();
        }
        self.lines
    }

    fn apply(&mut self, seq: Sequence<'_>) {
        match seq {
            Sequence::Sgr(params) => match self.style.apply_sgr(&params) {
                Ok(style) => self.style = style,
                Err(e) => debug!("Ignoring SGR {:?}: {}", params, e),
            },
            Sequence::CursorUp(n) => self.cursor_up(n as usize),
            Sequence::EraseDisplay(2) => {
                self.lines.clear();
                self.current.clear();
                self.column = 0;
            }
            Sequence::EraseDisplay(_)
            | Sequence::CursorPosition { .. }
            | Sequence::SaveCursor
            | Sequence::RestoreCursor
            | Sequence::CursorVisibility(_) => {}
            Sequence::Unrecognized(raw) => trace!("Dropping unrecognized sequence {:?}", raw),
        }
    }

    fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            match c {
                '\n' => self.finalize_line(),
                '\r' => self.column = 0,
                '\t' => {
                    let next = (self.column / TAB_WIDTH + 1) * TAB_WIDTH;
                    self.advance_to(next);
                }
                '\x08' => self.column = self.column.saturating_sub(1),
                c if c.is_control() => {}
                c => self.put(c),
            }
        }
    }

    /// Write at the cursor, overwriting whatever is there
    fn put(&mut self, c: char) {
        let cell = Cell {
            c,
            style: self.style,
        };
        match self.current.get_mut(self.column) {
            Some(existing) => *existing = cell,
            None => self.current.push(cell),
        }
        self.column += 1;
    }

    /// Move the cursor right, padding with blanks past the end of the line
    fn advance_to(&mut self, column: usize) {
        while self.current.len() < column {
            self.current.push(Cell {
                c: ' ',
                style: StyleAttributes::default(),
            });
        }
        self.column = column;
    }

    fn cursor_up(&mut self, n: usize) {
        if !self.current.is_empty() {
            self.finalize_line();
        }
        let keep = self.lines.len().saturating_sub(n);
        self.lines.truncate(keep);
        self.column = 0;
    }

    fn finalize_line(&mut self) {
        let cells = std::mem::take(&mut self.current);
        self.lines.push(coalesce(&cells));
        self.column = 0;
    }
}

/// Group consecutive cells with identical attributes into segments
fn coalesce(cells: &[Cell]) -> Line {
    let mut segments: Vec<Segment> = Vec::new();
    for cell in cells {
        match segments.last_mut() {
            Some(last) if last.style == cell.style => last.text.push(cell.c),
            _ => segments.push(Segment::new(cell.c.to_string(), cell.style)),
        }
    }
    Line::new(segments)
}

/// Emulate a complete captured buffer in one call
pub fn render_lines(text: &str) -> Vec<Line> {
    let mut terminal = Terminal::new();
    terminal.feed(text);
    terminal.finish()
}
