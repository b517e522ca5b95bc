//! Run report output

use colored::*;
use worksync_core::domain::bundle::BundleState;
use worksync_engine::{ReconcileError, RunReport, UpsertResult};

/// Print the per-job outcome of a run
pub fn print_report(report: &RunReport) {
    println!(
        "{}",
        format!("Worksheet {}: {} job(s)", report.worksheet, report.outcomes.len()).bold()
    );

    for outcome in &report.outcomes {
        println!("  {:<40} {}", outcome.name, colorize_result(&outcome.result));
    }

    println!(
        "\n{} submitted, {} skipped",
        report.submitted().to_string().green(),
        report.skipped().to_string().dimmed()
    );

    if let Some(state) = &report.waited {
        println!("Final bundle: {}", colorize_state(state));
    }
}

/// Colorize an upsert result for display
fn colorize_result(result: &UpsertResult) -> ColoredString {
    let text = result.to_string();
    match result {
        UpsertResult::Skipped(_) => text.dimmed(),
        UpsertResult::Created => text.green(),
        UpsertResult::Recreated { .. } => text.yellow(),
    }
}

/// Colorize a bundle state for display
fn colorize_state(state: &BundleState) -> ColoredString {
    let text = state.to_string();
    match state {
        BundleState::Ready => text.green(),
        BundleState::Failed | BundleState::Killed => text.red(),
        _ => text.cyan(),
    }
}

/// Context attached to a failed run, with a hint for server-side failures
pub fn failure_context(err: &ReconcileError, worksheet: &str) -> String {
    let summary = format!("Failed to reconcile worksheet {}", worksheet);
    match err {
        ReconcileError::Platform(e) if e.is_auth_error() => format!(
            "{}: the server rejected the credentials; check --token or WORKSYNC_TOKEN",
            summary
        ),
        ReconcileError::Platform(e) if e.is_server_error() => format!(
            "{}: the server failed; re-running is safe, healthy bundles are skipped",
            summary
        ),
        _ => summary,
    }
}
