pub mod markdown;

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

pub use markdown::render_markdown;

/// Source of the date stamped into the provenance footer.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// The local calendar date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock stuck on one date, for reproducible output.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Layout options for the Markdown report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Heading level of top-level categories. Deeper categories add one
    /// level each, up to `######`.
    pub heading_base: usize,
    /// Emitted verbatim before the first category.
    pub header: Option<String>,
    /// Emitted verbatim after the last category, before the provenance line.
    pub footer: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            heading_base: 1,
            header: None,
            footer: None,
        }
    }
}

/// Write a rendered report to `path`, replacing any existing file.
pub fn write_report(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    tracing::info!(path = %path.display(), bytes = content.len(), "wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_its_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(FixedClock(date).today(), date);
    }

    #[test]
    fn write_report_replaces_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("README.md");
        std::fs::write(&path, "old contents that are longer").unwrap();
        write_report(&path, "# new\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# new\n");
    }
}
