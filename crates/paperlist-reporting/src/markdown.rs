//! Markdown rendering: nested category headings, year buckets, citation lines.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use paperlist_core::{CategoryGroup, PaperRecord};

use crate::{Clock, ReportOptions};

const MAX_HEADING_LEVEL: usize = 6;
const UNKNOWN_YEAR: &str = "Unknown year";

/// Render the grouped collection as one Markdown document.
///
/// Groups are emitted in the given order. For each group only the category
/// segments that differ from the previous group's path get a heading, so
/// `A/B` followed by `A/C` renders `A`, `B`, `C` with `C` as a sibling of `B`.
pub fn render_markdown(
    groups: &[CategoryGroup],
    options: &ReportOptions,
    clock: &dyn Clock,
) -> String {
    let mut out = String::new();

    if let Some(header) = &options.header {
        push_block(&mut out, header);
    }

    let mut previous: &[String] = &[];
    for group in groups {
        let shared = common_prefix_len(previous, &group.category);
        for (i, segment) in group.category.iter().enumerate().skip(shared) {
            let level = heading_level(options.heading_base, i + 1);
            out.push_str(&"#".repeat(level));
            out.push(' ');
            out.push_str(segment);
            out.push_str("\n\n");
        }
        write_year_buckets(&mut out, &group.papers);
        out.push('\n');
        previous = &group.category;
    }

    if let Some(footer) = &options.footer {
        push_block(&mut out, footer);
    }

    out.push_str(&format!("Generated by paperlist on {}.\n", clock.today()));
    out
}

/// `base + depth - 1`, clamped to the Markdown range.
fn heading_level(base: usize, depth: usize) -> usize {
    base.max(1)
        .saturating_add(depth.saturating_sub(1))
        .min(MAX_HEADING_LEVEL)
}

fn common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Verbatim text followed by exactly one blank line.
fn push_block(out: &mut String, text: &str) {
    out.push_str(text.trim_end_matches('\n'));
    out.push_str("\n\n");
}

fn write_year_buckets(out: &mut String, papers: &[PaperRecord]) {
    let mut by_year: BTreeMap<Reverse<i32>, Vec<&PaperRecord>> = BTreeMap::new();
    let mut undated = Vec::new();
    for paper in papers {
        match paper.metadata.year {
            Some(year) => by_year.entry(Reverse(year)).or_default().push(paper),
            None => undated.push(paper),
        }
    }

    for (Reverse(year), bucket) in &by_year {
        out.push_str(&format!("- {}\n", year));
        write_lines(out, bucket);
    }
    if !undated.is_empty() {
        out.push_str(&format!("- {}\n", UNKNOWN_YEAR));
        write_lines(out, &undated);
    }
}

fn write_lines(out: &mut String, papers: &[&PaperRecord]) {
    for paper in papers {
        out.push_str("  ");
        out.push_str(&paper.rendered_line);
        out.push('\n');
    }
}
