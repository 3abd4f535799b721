//! `planwise coverage` command: classify outcomes and print their status.

use std::fmt::{self, Write as _};

use anyhow::Result;

use planwise_core::coverage::summarize;
use planwise_core::{CoverageFilter, CurriculumStore, OutcomeCoverage, classify_coverage};

/// Run the coverage command.
///
/// Prints a table with a trailing summary line, or the wire-format JSON
/// array when `json` is set.
pub async fn run_coverage(
    store: &dyn CurriculumStore,
    filter: &CoverageFilter,
    json: bool,
) -> Result<()> {
    let coverage = classify_coverage(store, filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&coverage)?);
    } else {
        print!("{}", render_table(&coverage)?);
    }
    Ok(())
}

fn render_table(coverage: &[OutcomeCoverage]) -> Result<String, fmt::Error> {
    if coverage.is_empty() {
        return Ok("No outcomes found.\n".to_string());
    }

    let mut out = String::new();
    writeln!(
        out,
        "{:<20} {:<10} {:>7} {:>10}",
        "CODE", "STATUS", "LINKED", "COMPLETED"
    )?;
    writeln!(out, "{}", "-".repeat(50))?;

    for c in coverage {
        let code = truncate(&c.code, 18);
        writeln!(
            out,
            "{:<20} {:<10} {:>7} {:>10}",
            code,
            c.status.to_string(),
            c.linked_count,
            c.completed_count
        )?;
    }

    let summary = summarize(coverage);
    writeln!(out)?;
    writeln!(
        out,
        "{} outcomes: {} covered, {} partial, {} uncovered",
        summary.total, summary.covered, summary.partial, summary.uncovered
    )?;
    Ok(out)
}

/// Shorten `s` to at most `max` characters, marking the cut with `...`.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
