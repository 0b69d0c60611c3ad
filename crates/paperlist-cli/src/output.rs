use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use paperlist_core::{BatchOutcome, ErrorKind, ResolutionError};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Extraction => "UNREADABLE",
        ErrorKind::NotFound => "NOT FOUND",
        ErrorKind::Lookup => "LOOKUP FAILED",
    }
}

/// One line describing a paper that was left out of the list.
pub fn failure_line(error: &ResolutionError, color: ColorMode) -> String {
    let label = kind_label(error.kind);
    if color.enabled() {
        let label = match error.kind {
            ErrorKind::NotFound => label.yellow().to_string(),
            _ => label.red().to_string(),
        };
        format!(
            "{} {} {}",
            label,
            error.path.display(),
            format!("({})", error.message).dimmed()
        )
    } else {
        format!("{} {} ({})", label, error.path.display(), error.message)
    }
}

/// Print the end-of-run summary: counts, then every omitted paper.
pub fn print_summary(
    w: &mut dyn Write,
    outcome: &BatchOutcome,
    output: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    let failed = outcome.failures.len();
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "Summary".bold())?;
        writeln!(
            w,
            "  {} listed ({} from cache, {} looked up)",
            outcome.resolved().to_string().green(),
            outcome.from_cache,
            outcome.from_lookup
        )?;
        if failed > 0 {
            writeln!(w, "  {} omitted", failed.to_string().red())?;
        }
    } else {
        writeln!(w, "Summary")?;
        writeln!(
            w,
            "  {} listed ({} from cache, {} looked up)",
            outcome.resolved(),
            outcome.from_cache,
            outcome.from_lookup
        )?;
        if failed > 0 {
            writeln!(w, "  {} omitted", failed)?;
        }
    }

    if failed > 0 {
        writeln!(w)?;
        for error in &outcome.failures {
            writeln!(w, "  {}", failure_line(error, color))?;
        }
    }

    writeln!(w)?;
    writeln!(w, "Wrote {}", output.display())?;
    Ok(())
}
