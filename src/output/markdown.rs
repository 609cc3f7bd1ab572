//! Markdown history report
//!
//! This module writes the full record of a walk as a human-readable markdown
//! file: run information, restart history, action history and the step log.

use crate::history::CrawlReport;
use crate::output::traits::{OutputHandler, OutputResult, RunContext, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes reports as markdown files
#[derive(Debug, Clone)]
pub struct MarkdownOutputHandler {
    path: PathBuf,
}

impl MarkdownOutputHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputHandler for MarkdownOutputHandler {
    fn write_report(&self, report: &CrawlReport, context: &RunContext) -> OutputResult<()> {
        generate_markdown_report(report, context, &self.path)
    }
}

/// Generates the markdown history report
///
/// # Arguments
///
/// * `report` - The finished walk
/// * `context` - Settings the walk ran with
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_report(
    report: &CrawlReport,
    context: &RunContext,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(report, context);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("History report written to {}", output_path.display());
    Ok(())
}

/// Formats a walk report as markdown
pub fn format_markdown_report(report: &CrawlReport, context: &RunContext) -> String {
    let summary = RunSummary::from_report(report);
    let mut md = String::new();

    md.push_str("# Tag-Walker History\n\n");

    // Run information
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Start URL**: {}\n", report.start_url));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!("- **Duration**: {} seconds\n", summary.duration_seconds));
    md.push_str(&format!("- **Ended**: {}\n", report.termination));
    md.push_str(&format!("- **Max Steps**: {}\n", context.max_steps));
    md.push_str(&format!("- **Steps Taken**: {}\n", summary.total_steps));
    md.push_str(&format!("- **Distinct Pages**: {}\n", summary.distinct_pages));
    md.push_str(&format!("- **Actions Run**: {}\n", summary.actions_total));
    if let Some(range) = &context.restart_range {
        md.push_str(&format!("- **Restarts**: {} (every {} steps)\n", summary.restarts, range));
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", context.config_hash));

    // Ignore patterns
    md.push_str("## Ignore Patterns\n\n");
    if context.ignore_patterns.is_empty() {
        md.push_str("None\n\n");
    } else {
        for pattern in &context.ignore_patterns {
            md.push_str(&format!("- [{}] `{}`", pattern.kind, pattern.pattern));
            if !pattern.description.is_empty() {
                md.push_str(&format!(": {}", pattern.description));
            }
            md.push('\n');
        }
        md.push('\n');
    }

    // Visits by domain
    if !summary.domain_counts.is_empty() {
        md.push_str("## Visits by Domain\n\n");
        md.push_str("| Domain | Steps |\n");
        md.push_str("|--------|-------|\n");
        for (domain, count) in &summary.domain_counts {
            md.push_str(&format!("| {} | {} |\n", domain, count));
        }
        md.push('\n');
    }

    // Restart history
    if !report.restarts.is_empty() {
        md.push_str("## Restart History\n\n");
        md.push_str("| # | Step | Time | Success | Visited Before | Next Restart |\n");
        md.push_str("|---|------|------|---------|----------------|--------------|\n");
        for restart in &report.restarts {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                restart.restart_count,
                restart.step,
                restart.timestamp.format("%H:%M:%S"),
                if restart.success { "yes" } else { "no" },
                restart.visited_urls_before,
                restart
                    .next_restart_step
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
        md.push('\n');

        for restart in report.restarts.iter().filter(|r| r.error.is_some()) {
            if let Some(error) = &restart.error {
                md.push_str(&format!("- Restart #{}: {}\n", restart.restart_count, error));
            }
        }
        md.push('\n');
    }

    // Action history
    if !report.actions.is_empty() {
        md.push_str("## Action History\n\n");
        md.push_str(&format!(
            "Successful: {} / {}, inputs set: {} / {}\n\n",
            summary.actions_successful,
            summary.actions_total,
            summary.inputs_successful,
            summary.inputs_total
        ));
        md.push_str("| Step | Action | URL | Success | Inputs | Click |\n");
        md.push_str("|------|--------|-----|---------|--------|-------|\n");
        for action in &report.actions {
            let click = match (action.click_attempted, action.click_successful) {
                (false, _) => "none",
                (true, true) => "ok",
                (true, false) => "failed",
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {}/{} | {} |\n",
                action.step,
                action.action_name,
                action.url,
                if action.success { "yes" } else { "no" },
                action.inputs_successful,
                action.inputs_total,
                click
            ));
        }
        md.push('\n');
    }

    // Step log
    md.push_str("## Step Log\n\n");
    for entry in &report.steps {
        let mut marks = Vec::new();
        if entry.action_performed {
            marks.push("action");
        }
        if entry.restart_occurred {
            marks.push("restart");
        }

        md.push_str(&format!(
            "### Step {} ({})",
            entry.step,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S")
        ));
        if !marks.is_empty() {
            md.push_str(&format!(" [{}]", marks.join(", ")));
        }
        md.push_str("\n\n");

        md.push_str(&format!("- URL: {}\n", entry.url));
        if let Some(title) = &entry.title {
            md.push_str(&format!("- Title: {}\n", title));
        }
        md.push_str(&format!(
            "- Links: {} found, {} eligible\n",
            entry.links_discovered, entry.links_found
        ));
        if !entry.detected_tags.is_empty() {
            md.push_str(&format!("- Tags: {}\n", entry.detected_tags.join(", ")));
        }
        if let Some(selected) = &entry.selected_link {
            md.push_str(&format!("- Next: {}\n", selected));
        }
        if !entry.cookies.is_empty() {
            md.push_str(&format!("- Cookies ({}):\n", entry.cookies.len()));
            for (name, value) in &entry.cookies {
                md.push_str(&format!("  - `{}` = `{}`\n", name, value));
            }
        }
        md.push('\n');
    }

    md
}
