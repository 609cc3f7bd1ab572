//! Console summary of a walk

use crate::output::traits::RunSummary;

/// Prints the summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_statistics(summary: &RunSummary) {
    println!("{}", format_statistics(summary));
}

/// Formats the console summary
pub fn format_statistics(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("=== Walk Statistics ===\n\n");

    out.push_str("Overview:\n");
    out.push_str(&format!("  Start URL: {}\n", summary.start_url));
    out.push_str(&format!("  Steps taken: {}\n", summary.total_steps));
    out.push_str(&format!("  Distinct pages: {}\n", summary.distinct_pages));
    out.push_str(&format!("  Restarts: {}\n", summary.restarts));
    out.push_str(&format!(
        "  Pages with instrumentation: {}\n",
        summary.instrumented_steps
    ));
    out.push_str(&format!("  Duration: {}s\n\n", summary.duration_seconds));

    if !summary.domain_counts.is_empty() {
        out.push_str("Visits by Domain:\n");
        for (domain, count) in &summary.domain_counts {
            let percentage = if summary.total_steps > 0 {
                (*count as f64 / summary.total_steps as f64) * 100.0
            } else {
                0.0
            };
            out.push_str(&format!("  {}: {} ({:.1}%)\n", domain, count, percentage));
        }
        out.push('\n');
    }

    if summary.actions_total > 0 {
        out.push_str("Actions:\n");
        out.push_str(&format!(
            "  Successful: {} / {}\n",
            summary.actions_successful, summary.actions_total
        ));
        out.push_str(&format!(
            "  Inputs set: {} / {} ({:.1}%)\n\n",
            summary.inputs_successful,
            summary.inputs_total,
            summary.input_success_rate()
        ));
    }

    out.push_str(&format!("Ended: {}", summary.termination));
    out
}
