//! Suite inspection and report rendering
//!
//! Lists the scenarios a suite expands to, applies a rule to a captured
//! response body offline, and renders pipeline reports for humans.

use std::fmt::Write as _;
use std::sync::Arc;

use colored::Colorize;

use crate::common::{Error, Result};
use crate::intercept::{Disposition, InterceptOutcome, InterceptedRequest, Interceptor, UpstreamResponse};
use crate::pipeline::{PipelineOutcome, PipelineReport, SuiteReport};

use super::config::Suite;

/// Result of applying a rule offline
#[derive(Debug)]
pub enum DryRun {
    /// The URL is not covered by the named rule
    NotRouted {
        /// Rule that would take the call instead, if any
        winner: Option<String>,
    },
    Applied(InterceptOutcome),
}

/// Print every scenario the suite expands to
pub fn print_matrix(suite: &Suite) {
    println!(
        "\n{} {}",
        "Suite:".blue().bold(),
        suite.name.white().bold()
    );
    if let Some(desc) = &suite.description {
        println!("  {}", desc.dimmed());
    }

    println!("\n{}", "Fields:".cyan());
    for field in suite.matrix.fields() {
        let allowed: Vec<String> = field.allowed.iter().map(|v| v.to_string()).collect();
        println!("  {} {}", field.name.white(), allowed.join(" | ").dimmed());
    }

    println!("\n{} ({})", "Scenarios:".cyan(), suite.matrix.len());
    for scenario in &suite.matrix {
        println!("  {:>3}  {}", scenario.index().to_string().dimmed(), scenario.label());
    }

    if !suite.rules.is_empty() {
        println!("\n{}", "Rules:".cyan());
        for rule in &suite.rules {
            println!(
                "  {} {} {} {}",
                rule.name().white(),
                rule.pattern(),
                "→".dimmed(),
                rule.target()
            );
        }
    }
    println!();
}

/// Apply `rule` for scenario `scenario` to a captured body
///
/// With a `url`, the call is routed through the full rule set first so a
/// shadowing rule declared earlier is reported instead of applied.
pub fn dry_run(
    suite: &Suite,
    rule: &str,
    scenario: usize,
    body: Vec<u8>,
    url: Option<&str>,
) -> Result<DryRun> {
    let named = suite.rule(rule)?.clone();
    let picked = suite.matrix.get(scenario).cloned().ok_or_else(|| {
        Error::Config(format!(
            "Scenario #{} not in matrix (suite has {})",
            scenario,
            suite.matrix.len()
        ))
    })?;

    let interceptor = Interceptor::new(Arc::new(suite.rules.clone()), Arc::new(picked));

    if let Some(url) = url {
        let mut request = InterceptedRequest::get(url);
        if let Some(method) = named.pattern().method() {
            request.method = method.to_string();
        }
        match interceptor.route(&request) {
            Some(winner) if winner.name() == named.name() => {}
            other => {
                return Ok(DryRun::NotRouted {
                    winner: other.map(|r| r.name().to_string()),
                })
            }
        }
    }

    Ok(DryRun::Applied(
        interceptor.apply(&named, UpstreamResponse::json(200, body)),
    ))
}

/// Print a dry-run result; the (possibly rewritten) body goes to stdout
pub fn print_dry_run(result: &DryRun) {
    match result {
        DryRun::NotRouted { winner: None } => {
            eprintln!("{} No rule covers this URL", "✗".red());
        }
        DryRun::NotRouted { winner: Some(name) } => {
            eprintln!("{} URL is taken by earlier rule '{}'", "✗".red(), name);
        }
        DryRun::Applied(outcome) => {
            match &outcome.disposition {
                Disposition::Mutated { fields } => eprintln!(
                    "{} {} rewrote {}",
                    "✓".green(),
                    outcome.rule.white(),
                    fields.join(", ").dimmed()
                ),
                Disposition::PassedThrough(reason) => eprintln!(
                    "{} {} passed through: {}",
                    "-".yellow(),
                    outcome.rule.white(),
                    reason
                ),
            }
            println!("{}", String::from_utf8_lossy(&outcome.response.body));
        }
    }
}

/// Print one line per pipeline and a summary
pub fn print_suite_report(report: &SuiteReport, verbose: bool) {
    print!("{}", render_suite_report(report, verbose));
}

/// Render a suite report as [`print_suite_report`] prints it
pub fn render_suite_report(report: &SuiteReport, verbose: bool) -> String {
    let mut out = format!("\n{}\n", "Pipelines:".cyan());
    for r in &report.reports {
        render_pipeline(&mut out, r, verbose);
    }

    let summary = format!(
        "{} passed, {} failed ({:.1}s)",
        report.passed(),
        report.failed(),
        report.elapsed.as_secs_f64()
    );
    if report.all_passed() {
        let _ = writeln!(out, "\n{} {}\n", "✓".green().bold(), summary.green().bold());
    } else {
        let _ = writeln!(out, "\n{} {}\n", "✗".red().bold(), summary.red().bold());
    }
    out
}

// Writing to a String cannot fail
fn render_pipeline(out: &mut String, r: &PipelineReport, verbose: bool) {
    let steps = format!("{}/{}", r.steps_run, r.steps_total);
    match &r.outcome {
        PipelineOutcome::Passed => {
            let _ = writeln!(out, "  {} {} [{}] {}", "✓".green(), r.id(), r.scenario, steps.dimmed());
            if verbose && r.committed > 0 {
                let _ = writeln!(out, "      committed {} shared entries", r.committed);
            }
        }
        PipelineOutcome::StepFailed { index, step, failure } => {
            let _ = writeln!(out, "  {} {} [{}] {}", "✗".red(), r.id(), r.scenario, steps.dimmed());
            let _ = writeln!(out, "      step {} '{}': {}", index + 1, step, failure);
        }
        PipelineOutcome::SessionFailed(failure) => {
            let _ = writeln!(out, "  {} {} [{}] no session", "✗".red(), r.id(), r.scenario);
            let _ = writeln!(out, "      {}", failure);
        }
        PipelineOutcome::PersistFailed(failure) => {
            let _ = writeln!(out, "  {} {} [{}] {}", "✗".red(), r.id(), r.scenario, steps.dimmed());
            let _ = writeln!(out, "      state not persisted: {}", failure);
        }
        PipelineOutcome::Cancelled { before_step } => {
            let _ = writeln!(
                out,
                "  {} {} [{}] cancelled before step {}",
                "-".yellow(),
                r.id(),
                r.scenario,
                before_step + 1
            );
        }
    }
    if verbose {
        let _ = writeln!(out, "      branch {} in {}ms", r.branch.dimmed(), r.elapsed.as_millis());
    }
}
