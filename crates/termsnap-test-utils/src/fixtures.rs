use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestFixtures {
    temp_dir: TempDir,
}

impl TestFixtures {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    /// Write an executable shell script into the fixture directory
    pub fn create_test_script(&self, name: &str, content: &str) -> Result<PathBuf> {
        let script_path = self.temp_dir.path().join(name);
        std::fs::write(&script_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&script_path)?.permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&script_path, perms)?;
        }

        Ok(script_path)
    }

    pub fn create_test_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let file_path = self.temp_dir.path().join(name);
        std::fs::write(&file_path, content)?;
        Ok(file_path)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Terminal output samples shared across crates
pub mod data {
    pub const UNICODE_TEST: &str = "🦀 Rust 日本語 العربية\n";

    pub const ANSI_COLORS: &str = "\x1b[31mRed\x1b[0m \x1b[32mGreen\x1b[0m \x1b[34mBlue\x1b[0m\n";

    pub const STYLED_STATUS: &str =
        "\x1b[1;32m✔\x1b[0m build \x1b[2m(0.4s)\x1b[0m\n\x1b[1;31m✘\x1b[0m \x1b[4mtest\x1b[24m failed\n";

    pub const EXTENDED_COLORS: &str =
        "\x1b[38;5;208morange\x1b[0m \x1b[48;2;40;42;54m\x1b[38;2;189;147;249mpurple on grey\x1b[0m\n";

    /// A progress bar redrawn in place with carriage returns
    pub fn progress_bar(steps: usize, width: usize) -> String {
        let mut out = String::new();
        for step in 0..=steps {
            let filled = step * width / steps.max(1);
            out.push_str(&format!(
                "\r[{}{}] {:>3}%",
                "#".repeat(filled),
                " ".repeat(width - filled),
                step * 100 / steps.max(1)
            ));
        }
        out.push('\n');
        out
    }
}
