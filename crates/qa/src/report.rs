use crate::coverage::{BundleCoverage, CoverageReport};
use crate::duplication::{DuplicationIssue, DuplicationReport};
use crate::style::{StyleIssue, StyleReport};
use crate::table::TableReport;
use haqei_iching::TableIssue;

/// Rows shown per findings table
const MAX_ROWS: usize = 50;

pub fn render_coverage_report(report: &CoverageReport, bundles: Option<&BundleCoverage>) -> String {
    let mut md = String::new();
    md.push_str("# Narrative coverage report\n\n");
    md.push_str(&format!("- Expected: `{}`\n", report.expected));
    md.push_str(&format!(
        "- Present: `{}` ({} authored, {} placeholders)\n",
        report.present,
        report.authored(),
        report.placeholders
    ));
    md.push_str(&format!("- Missing: `{}`\n", report.missing));
    md.push_str(&format!("- Coverage: `{:.2}%`\n\n", report.percentage));

    if !report.missing_sample.is_empty() {
        md.push_str("## Missing keys (sample)\n\n");
        for key in &report.missing_sample {
            md.push_str(&format!("- `{}`\n", escape_cell(key)));
        }
        md.push('\n');
    }

    if let Some(bundles) = bundles {
        md.push_str("## Bundles\n\n");
        md.push_str(&format!(
            "- Items: `{}` / `{}`\n",
            bundles.total_items,
            BundleCoverage::expected_items()
        ));
        md.push_str(&format!("- Files read: `{}`\n", bundles.items.len()));
        md.push_str(&format!(
            "- Missing files: {}\n",
            list_or_none(bundles.missing_files.iter().map(ToString::to_string))
        ));
        md.push_str(&format!(
            "- Incomplete: {}\n",
            list_or_none(
                bundles
                    .incomplete
                    .iter()
                    .map(|id| format!("{id} ({})", bundles.items.get(id).copied().unwrap_or(0)))
            )
        ));
        if !bundles.invalid.is_empty() {
            md.push_str("\n| file | error |\n");
            md.push_str("|---|---|\n");
            for invalid in &bundles.invalid {
                md.push_str(&format!(
                    "| `{}` | {} |\n",
                    invalid.file,
                    escape_cell(&truncate_one_line(&invalid.error, 120))
                ));
            }
        }
        md.push('\n');
    }

    md
}

pub fn render_duplication_report(report: &DuplicationReport) -> String {
    let mut md = String::new();
    md.push_str("# Narrative duplication report\n\n");
    md.push_str(&format!("- Checked: `{}`\n", report.checked));
    md.push_str(&format!("- Placeholders skipped: `{}`\n", report.skipped_placeholders));
    md.push_str(&format!("- Findings: `{}`\n\n", report.findings.len()));

    if report.findings.is_empty() {
        return md;
    }

    md.push_str("| key | variant | finding | score |\n");
    md.push_str("|---|---|---|---:|\n");
    for finding in report.findings.iter().take(MAX_ROWS) {
        let (what, score) = match &finding.issue {
            DuplicationIssue::HeadlineRepeatsFinal { similarity } => {
                ("headline ≈ final".to_string(), format!("{similarity:.3}"))
            }
            DuplicationIssue::StagesOverlap { a, b, similarity } => (
                format!("{} ≈ {}", a.as_str(), b.as_str()),
                format!("{similarity:.3}"),
            ),
            DuplicationIssue::ShortHeadline { chars, min } => {
                (format!("headline {chars} < {min} chars"), "-".to_string())
            }
        };
        md.push_str(&format!(
            "| `{}` | {} | {} | `{}` |\n",
            escape_cell(&finding.key),
            if finding.easy { "easy" } else { "default" },
            what,
            score
        ));
    }
    push_truncation_note(&mut md, report.findings.len());
    md
}

pub fn render_style_report(report: &StyleReport) -> String {
    let mut md = String::new();
    md.push_str("# Line-state style report\n\n");
    md.push_str(&format!("- Checked: `{}`\n", report.checked));
    md.push_str(&format!("- Failing rows: `{}`\n", report.failing_rows()));
    md.push_str(&format!("- Findings: `{}`\n\n", report.findings.len()));

    if report.findings.is_empty() {
        return md;
    }

    md.push_str("| name | finding |\n");
    md.push_str("|---|---|\n");
    for finding in report.findings.iter().take(MAX_ROWS) {
        let what = match &finding.issue {
            StyleIssue::TerminatorCount { count } => format!("{count} terminators (expected 1)"),
            StyleIssue::TerminatorNotAtEnd => "terminator not at end".to_string(),
            StyleIssue::TooShort { chars, min } => format!("{chars} chars < {min}"),
            StyleIssue::TooLong { chars, max } => format!("{chars} chars > {max}"),
            StyleIssue::BannedSequence { sequence } => format!("banned `{sequence}`"),
            StyleIssue::ArchaicWord { word } => format!("archaic word `{word}`"),
            StyleIssue::ArchaicPattern { matched, .. } => format!("archaic phrasing `{matched}`"),
        };
        md.push_str(&format!(
            "| `{}` | {} |\n",
            escape_cell(&finding.name),
            escape_cell(&what)
        ));
    }
    push_truncation_note(&mut md, report.findings.len());
    md
}

pub fn render_table_report(report: &TableReport) -> String {
    let mut md = String::new();
    md.push_str("# Transform table report\n\n");
    md.push_str(&format!("- Edges: `{}`\n", report.edges));
    md.push_str(&format!("- Involution: `{}`\n", report.involution));
    md.push_str(&format!("- Issues: `{}`\n\n", report.issues.len()));

    for issue in report.issues.iter().take(MAX_ROWS) {
        let line = match issue {
            TableIssue::MissingRow { hexagram } => format!("- hexagram {hexagram}: no row\n"),
            TableIssue::MissingEdge { line } => format!("- {line}: no edge\n"),
            TableIssue::WrongTarget {
                line,
                expected,
                actual,
            } => format!("- {line}: expected {expected}, got {actual}\n"),
        };
        md.push_str(&line);
    }
    md
}

fn push_truncation_note(md: &mut String, total: usize) {
    if total > MAX_ROWS {
        md.push_str(&format!("\n_{} more not shown_\n", total - MAX_ROWS));
    }
}

fn list_or_none(items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn truncate_one_line(text: &str, max_chars: usize) -> String {
    let mut s = text.replace(['\n', '\r', '\t'], " ");
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= max_chars {
        return s;
    }
    let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
