//! Control sequence tokenizer
//!
//! Splits captured terminal output into literal text runs and the escape
//! sequences the emulator understands. Tokens borrow from the input and are
//! produced lazily.

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// A recognized escape sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sequence<'a> {
    /// Select Graphic Rendition; empty parameters are `None`
    Sgr(Vec<Option<u32>>),
    /// Lines to move up, at least one (`ESC[0A` moves one line)
    CursorUp(u32),
    EraseDisplay(u32),
    /// Absolute positioning, 1-based (`H` with no parameters is home)
    CursorPosition { row: u32, col: u32 },
    SaveCursor,
    RestoreCursor,
    CursorVisibility(bool),
    /// Sequence with an unknown terminator, kept verbatim
    Unrecognized(&'a str),
}

/// One unit of terminal output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Literal(&'a str),
    Sequence(Sequence<'a>),
}

/// Lazy token stream over a text buffer
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    input: &'a str,
    pos: usize,
}

/// Tokenize `input` without copying it
pub fn tokenize(input: &str) -> Tokens<'_> {
    Tokens { input, pos: 0 }
}

/// Outcome of scanning an escape starting at the current position
enum Escape<'a> {
    Sequence(Sequence<'a>, usize),
    /// Known code with no effect on the rendered output
    Ignored(usize),
    /// Incomplete or interrupted; the bytes up to the offset become literal text
    Malformed(usize),
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos >= self.input.len() {
                return None;
            }

            let start = self.pos;
            let rest = &self.input[start..];

            if rest.as_bytes()[0] != ESC {
                let end = rest.find('\x1b').map_or(self.input.len(), |i| start + i);
                self.pos = end;
                return Some(Token::Literal(&self.input[start..end]));
            }

            match self.scan_escape(start) {
                Escape::Sequence(seq, end) => {
                    self.pos = end;
                    return Some(Token::Sequence(seq));
                }
                Escape::Ignored(end) => {
                    self.pos = end;
                }
                Escape::Malformed(end) => {
                    self.pos = end;
                    return Some(Token::Literal(&self.input[start..end]));
                }
            }
        }
    }
}

impl<'a> Tokens<'a> {
    fn scan_escape(&self, start: usize) -> Escape<'a> {
        let bytes = self.input.as_bytes();
        let Some(&introducer) = bytes.get(start + 1) else {
            return Escape::Malformed(bytes.len());
        };

        match introducer {
            b'[' => self.scan_csi(start),
            b']' => self.scan_osc(start),
            b'7' => Escape::Sequence(Sequence::SaveCursor, start + 2),
            b'8' => Escape::Sequence(Sequence::RestoreCursor, start + 2),
            0x20..=0x2f => {
                // Charset designation and friends: ESC ( B
                let mut i = start + 1;
                while i < bytes.len() && (0x20..=0x2f).contains(&bytes[i]) {
                    i += 1;
                }
                match bytes.get(i) {
                    Some(0x30..=0x7e) => self.unrecognized(start, i + 1),
                    Some(_) => Escape::Malformed(i),
                    None => Escape::Malformed(bytes.len()),
                }
            }
            0x30..=0x7e => self.unrecognized(start, start + 2),
            _ => Escape::Malformed(start + 1),
        }
    }

    fn scan_csi(&self, start: usize) -> Escape<'a> {
        let bytes = self.input.as_bytes();
        let params_start = start + 2;
        let mut i = params_start;

        while i < bytes.len() && (0x30..=0x3f).contains(&bytes[i]) {
            i += 1;
        }
        let params_end = i;
        while i < bytes.len() && (0x20..=0x2f).contains(&bytes[i]) {
            i += 1;
        }
        let intermediates_end = i;

        let final_byte = match bytes.get(i) {
            Some(&b @ 0x40..=0x7e) => b,
            Some(_) => return Escape::Malformed(i),
            None => return Escape::Malformed(bytes.len()),
        };
        let end = i + 1;

        if intermediates_end != params_end {
            return self.unrecognized(start, end);
        }

        let raw_params = &self.input[params_start..params_end];
        match raw_params.strip_prefix('?') {
            Some(private) => classify_private(final_byte, private)
                .map_or_else(|| self.unrecognized(start, end), |e| e.at(end)),
            None => classify(final_byte, raw_params)
                .map_or_else(|| self.unrecognized(start, end), |e| e.at(end)),
        }
    }

    fn scan_osc(&self, start: usize) -> Escape<'a> {
        let bytes = self.input.as_bytes();
        let mut i = start + 2;
        while i < bytes.len() {
            match bytes[i] {
                BEL => return self.unrecognized(start, i + 1),
                ESC if bytes.get(i + 1) == Some(&b'\\') => return self.unrecognized(start, i + 2),
                _ => i += 1,
            }
        }
        Escape::Malformed(bytes.len())
    }

    fn unrecognized(&self, start: usize, end: usize) -> Escape<'a> {
        Escape::Sequence(Sequence::Unrecognized(&self.input[start..end]), end)
    }
}

/// Classification of a complete CSI before its end offset is attached
enum Classified {
    Sequence(Sequence<'static>),
    Ignored,
}

impl Classified {
    fn at<'a>(self, end: usize) -> Escape<'a> {
        match self {
            Self::Sequence(seq) => Escape::Sequence(seq, end),
            Self::Ignored => Escape::Ignored(end),
        }
    }
}

fn classify(final_byte: u8, raw_params: &str) -> Option<Classified> {
    let params = parse_params(raw_params);
    let first = params.first().copied().flatten();

    let seq = match final_byte {
        b'm' => Sequence::Sgr(params),
        b'A' => Sequence::CursorUp(first.unwrap_or(1).max(1)),
        b'J' => Sequence::EraseDisplay(first.unwrap_or(0)),
        b'H' | b'f' => Sequence::CursorPosition {
            row: first.unwrap_or(1).max(1),
            col: params.get(1).copied().flatten().unwrap_or(1).max(1),
        },
        b's' => Sequence::SaveCursor,
        b'u' => Sequence::RestoreCursor,
        // Relative movement and line/character erasure
        b'B' | b'C' | b'D' | b'E' | b'F' | b'G' | b'K' | b'X' | b'd' => {
            return Some(Classified::Ignored)
        }
        _ => return None,
    };
    Some(Classified::Sequence(seq))
}

fn classify_private(final_byte: u8, raw_params: &str) -> Option<Classified> {
    match final_byte {
        b'h' | b'l' => {
            let params = parse_params(raw_params);
            if params == [Some(25)] {
                Some(Classified::Sequence(Sequence::CursorVisibility(
                    final_byte == b'h',
                )))
            } else {
                Some(Classified::Ignored)
            }
        }
        _ => None,
    }
}

/// Split a semicolon-delimited parameter string. Empty input yields no
/// parameters; empty or non-numeric fields yield `None`; values too large for
/// a `u32` saturate.
fn parse_params(raw: &str) -> Vec<Option<u32>> {
    if raw.is_empty() {
        return Vec::new();
    }

    raw.split(';')
        .map(|field| {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                Some(field.parse::<u32>().unwrap_or(u32::MAX))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        tokenize(input).collect()
    }

    #[test]
    fn splits_literals_around_sgr() {
        assert_eq!(
            tokens("a\x1b[1;31mb\x1b[0m"),
            vec![
                Token::Literal("a"),
                Token::Sequence(Sequence::Sgr(vec![Some(1), Some(31)])),
                Token::Literal("b"),
                Token::Sequence(Sequence::Sgr(vec![Some(0)])),
            ]
        );
    }

    #[test]
    fn empty_sgr_has_no_params() {
        assert_eq!(
            tokens("\x1b[m"),
            vec![Token::Sequence(Sequence::Sgr(vec![]))]
        );
        assert_eq!(
            tokens("\x1b[1;;4m"),
            vec![Token::Sequence(Sequence::Sgr(vec![Some(1), None, Some(4)]))]
        );
    }

    #[test]
    fn cursor_up_count_is_at_least_one() {
        assert_eq!(
            tokens("\x1b[0A\x1b[;A"),
            vec![
                Token::Sequence(Sequence::CursorUp(1)),
                Token::Sequence(Sequence::CursorUp(1)),
            ]
        );
    }

    #[test]
    fn cursor_and_erase_sequences() {
        assert_eq!(
            tokens("\x1b[A\x1b[3A\x1b[2J\x1b[H\x1b[5;10H\x1b[s\x1b[u"),
            vec![
                Token::Sequence(Sequence::CursorUp(1)),
                Token::Sequence(Sequence::CursorUp(3)),
                Token::Sequence(Sequence::EraseDisplay(2)),
                Token::Sequence(Sequence::CursorPosition { row: 1, col: 1 }),
                Token::Sequence(Sequence::CursorPosition { row: 5, col: 10 }),
                Token::Sequence(Sequence::SaveCursor),
                Token::Sequence(Sequence::RestoreCursor),
            ]
        );
    }

    #[test]
    fn cursor_visibility() {
        assert_eq!(
            tokens("\x1b[?25l\x1b[?25h"),
            vec![
                Token::Sequence(Sequence::CursorVisibility(false)),
                Token::Sequence(Sequence::CursorVisibility(true)),
            ]
        );
    }

    #[test]
    fn ignored_codes_are_dropped() {
        assert_eq!(
            tokens("a\x1b[2Kb\x1b[3Cc\x1b[?1049hd"),
            vec![
                Token::Literal("a"),
                Token::Literal("b"),
                Token::Literal("c"),
                Token::Literal("d"),
            ]
        );
    }

    #[test]
    fn unknown_terminators_are_preserved() {
        assert_eq!(
            tokens("\x1b[5nx"),
            vec![
                Token::Sequence(Sequence::Unrecognized("\x1b[5n")),
                Token::Literal("x"),
            ]
        );
        assert_eq!(
            tokens("\x1b]0;title\x07x"),
            vec![
                Token::Sequence(Sequence::Unrecognized("\x1b]0;title\x07")),
                Token::Literal("x"),
            ]
        );
        assert_eq!(
            tokens("\x1b(Bx"),
            vec![
                Token::Sequence(Sequence::Unrecognized("\x1b(B")),
                Token::Literal("x"),
            ]
        );
    }

    #[test]
    fn unterminated_sequences_become_literals() {
        assert_eq!(
            tokens("ab\x1b[38;5"),
            vec![Token::Literal("ab"), Token::Literal("\x1b[38;5")]
        );
        assert_eq!(tokens("\x1b"), vec![Token::Literal("\x1b")]);
        assert_eq!(tokens("\x1b]0;title"), vec![Token::Literal("\x1b]0;title")]);
    }

    #[test]
    fn interrupted_sequence_resumes_at_offending_byte() {
        assert_eq!(
            tokens("\x1b[31\nok"),
            vec![Token::Literal("\x1b[31"), Token::Literal("\nok")]
        );
        assert_eq!(
            tokens("\x1b[1é"),
            vec![Token::Literal("\x1b[1"), Token::Literal("é")]
        );
    }

    #[test]
    fn huge_parameters_saturate() {
        assert_eq!(
            tokens("\x1b[99999999999999m"),
            vec![Token::Sequence(Sequence::Sgr(vec![Some(u32::MAX)]))]
        );
    }

    proptest! {
        #[test]
        fn literal_only_input_round_trips(text in "[^\x1b]*") {
            let mut rebuilt = String::new();
            for token in tokenize(&text) {
                match token {
                    Token::Literal(s) => rebuilt.push_str(s),
                    Token::Sequence(seq) => prop_assert!(false, "unexpected sequence {:?}", seq),
                }
            }
            prop_assert_eq!(rebuilt, text);
        }

        #[test]
        fn escape_soup_terminates(text in "(\x1b|\\[|[0-9;?]|[a-zA-Z]|\n|\r){0,64}") {
            let count = tokenize(&text).count();
            prop_assert!(count <= text.len());
        }
    }
}
