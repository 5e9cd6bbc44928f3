use anyhow::Result;
use similar::{ChangeTag, TextDiff};

/// Remove every escape sequence, leaving the printable text
pub fn strip_ansi(text: &str) -> String {
    strip_ansi_escapes::strip_str(text)
}

pub struct TerminalComparator;

impl Default for TerminalComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalComparator {
    pub fn new() -> Self {
        Self
    }

    pub fn compare_output(&self, expected: &str, actual: &str) -> Result<()> {
        let expected_clean = self.normalize_output(expected);
        let actual_clean = self.normalize_output(actual);

        if expected_clean == actual_clean {
            return Ok(());
        }

        anyhow::bail!(
            "Terminal output mismatch:\n\nExpected:\n{}\n\nActual:\n{}\n\nDiff:\n{}",
            expected_clean,
            actual_clean,
            render_diff(&expected_clean, &actual_clean)
        )
    }

    pub fn compare_lines<S: AsRef<str>>(&self, expected: &[S], actual: &[S]) -> Result<()> {
        let expected = expected
            .iter()
            .map(|l| self.normalize_line(l.as_ref()))
            .collect::<Vec<_>>()
            .join("\n");
        let actual = actual
            .iter()
            .map(|l| self.normalize_line(l.as_ref()))
            .collect::<Vec<_>>()
            .join("\n");

        if expected == actual {
            return Ok(());
        }

        anyhow::bail!("Line mismatch:\n{}", render_diff(&expected, &actual))
    }

    fn normalize_output(&self, output: &str) -> String {
        strip_ansi(output)
            .replace("\r\n", "\n")
            .lines()
            .map(|l| self.normalize_line(l))
            .collect::<Vec<_>>()
            .join("\n")
            .trim_end()
            .to_string()
    }

    fn normalize_line(&self, line: &str) -> String {
        line.trim_end().to_string()
    }
}

fn render_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut out = String::new();

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        out.push_str(&format!("{sign}{change}"));
        if change.missing_newline() {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_and_trailing_space_are_ignored() {
        let comparator = TerminalComparator::new();
        comparator
            .compare_output("\x1b[1mok\x1b[0m  \r\n\n", "ok")
            .unwrap();
        comparator.compare_lines(&["a ", "b"], &["a", "b"]).unwrap();
    }

    #[test]
    fn mismatch_reports_a_line_diff() {
        let err = TerminalComparator::new()
            .compare_lines(&["same", "old"], &["same", "new"])
            .unwrap_err()
            .to_string();
        assert!(err.contains("-old"));
        assert!(err.contains("+new"));
        assert!(err.contains(" same"));
    }
}
