//! CLI output formatting for a conversion run.
//!
//! Output follows the outline, not the filesystem: each entry leads with its
//! sidebar position and title, and the written path comes after the arrow.
//! Entries that became directories end their title with `/`.
//!
//! ```text
//! manual → docu_book/manual
//! 001 Intro/ → intro/intro.md
//!     001 Setup → intro/setup.md
//! 002 FAQ (missing)
//! 003 Appendix/ → appendix/index.md (generated)
//!     001 Glossary → appendix/glossary.md
//!
//! Converted 3 pages, 2 directories, 2 images copied (1 unchanged)
//! 1 warning written to mdtodocu.log
//! ```
//!
//! `format_*` functions return lines and do no I/O; `print_*` wrappers write
//! them to stdout.

use crate::convert::{ConversionReport, PageOutcome, PageStatus};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: u32) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// One outline entry: index, title, and where it went.
///
/// ```text
/// 001 Intro/ → intro/intro.md
/// 002 FAQ (missing)
/// ```
fn page_line(page: &PageOutcome) -> String {
    let header = format!(
        "{}{} {}{}",
        indent(page.depth),
        format_index(page.position),
        page.title,
        if page.is_directory { "/" } else { "" }
    );
    let output = page.output.display();
    match page.status {
        PageStatus::Written => format!("{header} → {output}"),
        PageStatus::Generated => format!("{header} → {output} (generated)"),
        PageStatus::Missing => format!("{header} (missing)"),
        PageStatus::Failed => format!("{header} → {output} (failed)"),
    }
}

// ============================================================================
// Convert output
// ============================================================================

/// Format the result of a conversion run.
pub fn format_convert_output(report: &ConversionReport) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} → {}",
        report.paths.book,
        report.paths.output_root.display()
    ));
    lines.extend(report.pages.iter().map(page_line));
    lines.push(String::new());

    let pages = report.count(PageStatus::Written) + report.count(PageStatus::Generated);
    let mut summary = format!(
        "Converted {}, {}, {} copied",
        count(pages, "page", "pages"),
        count(report.directories, "directory", "directories"),
        count(report.images.copied, "image", "images")
    );
    if report.images.unchanged > 0 {
        summary.push_str(&format!(" ({} unchanged)", report.images.unchanged));
    }
    lines.push(summary);

    if !report.log.is_empty() {
        lines.push(format!(
            "{} written to {}",
            count(report.log.len(), "warning", "warnings"),
            report.paths.log_path.display()
        ));
    }
    lines
}

/// Print conversion output to stdout.
pub fn print_convert_output(report: &ConversionReport) {
    for line in format_convert_output(report) {
        println!("{}", line);
    }
}
