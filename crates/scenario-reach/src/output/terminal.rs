//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use scenario_core::{AttemptRecord, RetryState, SolveStatus};

use crate::coverage::CoverageReport;

/// Format a CoverageReport for human-readable terminal output.
///
/// The header shows the certified coverage 1 − ε at confidence 1 − δ.
pub fn format_report(report: &CoverageReport) -> String {
    let mut output = String::new();

    output.push_str(&format_box_top());
    output.push_str(&format_box_line(&format_header(report)));
    output.push_str(&format_box_separator());

    let guarantee = format!(
        "Guaranteed coverage: {:.4}%",
        report.guaranteed_coverage() * 100.0
    );
    let guarantee = if report.epsilon < 0.01 {
        guarantee.green()
    } else if report.epsilon < 0.1 {
        guarantee.yellow()
    } else {
        guarantee.red()
    };
    output.push_str(&format_box_line(&guarantee.to_string()));

    output.push_str(&format_box_line(&format!("Epsilon: {:.6}", report.epsilon)));
    output.push_str(&format_box_line(&format!(
        "Confidence: 1 - {:.0e}",
        report.risk_level
    )));

    output.push_str(&format_box_separator());

    output.push_str(&format_box_line(&format!(
        "Misses: {} of {}",
        report.misses, report.num_samples
    )));
    output.push_str(&format_box_line(&format!(
        "Empirical coverage: {:.2}%",
        report.coverage() * 100.0
    )));
    output.push_str(&format_box_line(&format!(
        "Tail solve: {}",
        format_status(report.tail_status)
    )));
    if report.conservative {
        output.push_str(&format_box_line(
            &"Misses are an upper bound (sufficient membership test)"
                .dimmed()
                .to_string(),
        ));
    }
    if !report.outside_points.is_empty() {
        output.push_str(&format_box_line(&format!(
            "Recorded outside points: {}",
            report.outside_points.len()
        )));
    }

    output.push_str(&format_box_bottom());
    output
}

/// Format the zonotope retry history, one line per attempt.
pub fn format_attempts(attempts: &[AttemptRecord]) -> String {
    let mut output = String::new();
    output.push_str(&format_box_top());
    output.push_str(&format_box_line(&"Solver Attempts".bold().to_string()));
    output.push_str(&format_box_separator());
    for a in attempts {
        let line = format!(
            "{} #{}: {} -> {}",
            a.stage,
            a.attempt,
            a.exit,
            format_retry_state(a.next)
        );
        output.push_str(&format_box_line(&line));
    }
    output.push_str(&format_box_bottom());
    output
}

fn format_header(report: &CoverageReport) -> String {
    if report.tail_status == SolveStatus::Failed || report.epsilon >= 1.0 {
        format!(
            "{} {}",
            "\u{26A0}".red().bold(),
            "NO COVERAGE GUARANTEE".red().bold()
        )
    } else if report.tail_status == SolveStatus::OptimalInaccurate || report.epsilon >= 0.1 {
        format!(
            "{} {}",
            "\u{26A0}".yellow().bold(),
            "WEAK COVERAGE CERTIFICATE".yellow().bold()
        )
    } else {
        format!(
            "{} {}",
            "\u{2713}".green().bold(),
            "COVERAGE CERTIFICATE".green().bold()
        )
    }
}

fn format_status(status: SolveStatus) -> String {
    match status {
        SolveStatus::Optimal => "Optimal".green().to_string(),
        SolveStatus::OptimalInaccurate => "Optimal (inaccurate)".yellow().to_string(),
        SolveStatus::Failed => "Failed".red().to_string(),
    }
}

fn format_retry_state(state: RetryState) -> String {
    match state {
        RetryState::Fitting => "fitting".to_string(),
        RetryState::Perturbing => "perturb".yellow().to_string(),
        RetryState::Reinitializing => "reinitialize".yellow().to_string(),
        RetryState::Failed => "failed".red().to_string(),
        RetryState::Succeeded => "done".green().to_string(),
    }
}

const BOX_WIDTH: usize = 60;

fn format_box_top() -> String {
    format!("\u{250C}{}\u{2510}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn format_box_bottom() -> String {
    format!("\u{2514}{}\u{2518}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn format_box_separator() -> String {
    format!("\u{251C}{}\u{2524}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn format_box_line(content: &str) -> String {
    let visible_len = strip_ansi_codes(content).chars().count();
    let padding = (BOX_WIDTH - 2).saturating_sub(visible_len);
    format!("\u{2502} {}{} \u{2502}\n", content, " ".repeat(padding))
}

/// Strip ANSI escape codes so padding counts visible characters only.
fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
