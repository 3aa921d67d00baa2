//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the search code stays clean and testable
//! - output changes are localized

use crate::domain::{BestFit, ModelSettings, ResidualEntry};
use crate::fit::{top_candidates, FitSelection, ModelFit};
use crate::io::IngestedData;
use crate::math::Integrator;
use crate::report::FittedPoint;

/// Format the full run summary (dataset stats + per-model diagnostics + chosen fit).
pub fn format_run_summary(ingest: &IngestedData, selection: &FitSelection) -> String {
    let mut out = String::new();

    out.push_str("=== gridfit - least-squares grid search ===\n");
    out.push_str(&format!(
        "Data: x={} y={} | rows read={} used={} skipped={}\n",
        ingest.x_col,
        ingest.y_col,
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    out.push_str(&format!(
        "Points: n={} | x=[{}, {}] | y=[{}, {}]\n",
        ingest.stats.n_points,
        fmt_num(ingest.stats.x_min),
        fmt_num(ingest.stats.x_max),
        fmt_num(ingest.stats.y_min),
        fmt_num(ingest.stats.y_max)
    ));

    out.push_str("\nModel diagnostics:\n");
    for (i, fit) in selection.fits.iter().enumerate() {
        let chosen = if i == selection.best { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<15} SSE={} RMSE={} BIC={:.3} grid={} finite={}\n",
            fit.kind().display_name(),
            fmt_num(fit.quality.sse),
            fmt_num(fit.quality.rmse),
            fit.quality.bic,
            fit.table.len(),
            fit.table.finite_count()
        ));
    }
    for (kind, reason) in &selection.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.display_name()));
    }

    let best = selection.best_fit();
    out.push_str("\nBest fit:\n");
    out.push_str(&format!("- model: {}\n", best.kind().display_name()));
    out.push_str(&format!("- fixed: {}\n", fmt_settings(&best.settings)));
    out.push_str(&format!("- params: {}\n", fmt_params(&best.best)));
    out.push_str(&format!(
        "- grid index: {} of {}\n",
        best.best.index,
        best.table.len()
    ));
    out.push_str(&format!(
        "- SSE={} RMSE={} (n={}, k={})\n",
        fmt_num(best.quality.sse),
        fmt_num(best.quality.rmse),
        best.quality.n,
        best.quality.k
    ));
    out.push('\n');

    out
}

/// Format the `n` best grid points of a fit.
pub fn format_top_candidates(fit: &ModelFit, n: usize) -> String {
    let top = top_candidates(&fit.table, n);
    let names = fit.table.param_names();

    let mut out = String::new();
    out.push_str(&format!("Top {} grid points ({}):\n", top.len(), fit.kind().display_name()));

    let mut header = format!("{:>4} {:>8}", "rank", "index");
    for name in names {
        header.push_str(&format!(" {name:>12}"));
    }
    header.push_str(&format!(" {:>14}", "sse"));
    out.push_str(header.trim_end());
    out.push('\n');

    for (rank, e) in top.iter().enumerate() {
        out.push_str(&format_candidate_row(rank + 1, e));
        out.push('\n');
    }

    out
}

fn format_candidate_row(rank: usize, e: &ResidualEntry) -> String {
    let mut row = format!("{rank:>4} {:>8}", e.index);
    for p in &e.params {
        row.push_str(&format!(" {:>12}", fmt_num(*p)));
    }
    row.push_str(&format!(" {:>14}", fmt_num(e.sse)));
    row
}

/// Format per-observation residuals.
pub fn format_residuals(rows: &[FittedPoint]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>12} {:>12} {:>12} {:>12}\n", "x", "y_obs", "y_fit", "residual"));
    for r in rows {
        out.push_str(&format!(
            "{:>12} {:>12} {:>12} {:>12}\n",
            fmt_num(r.x),
            fmt_num(r.y_obs),
            fmt_num(r.y_fit),
            fmt_num(r.residual)
        ));
    }
    out
}

/// One-line description of a model's fixed settings.
pub fn fmt_settings(settings: &ModelSettings) -> String {
    match settings {
        ModelSettings::Exponential { n0, t0 } => format!("N0={} at t0={}", fmt_num(*n0), fmt_num(*t0)),
        ModelSettings::Sine {
            amplitude,
            period,
            offset,
        } => format!(
            "A={} T={} c={}",
            fmt_num(*amplitude),
            fmt_num(*period),
            fmt_num(*offset)
        ),
        ModelSettings::Logistic { n0, t0, integrator } => format!(
            "N0={} at t0={} | {}",
            fmt_num(*n0),
            fmt_num(*t0),
            fmt_integrator(integrator)
        ),
    }
}

fn fmt_integrator(integrator: &Integrator) -> String {
    match integrator {
        Integrator::Rk4 { step } => format!("rk4 step={step}"),
        Integrator::Dopri5 { rtol, atol, max_steps } => {
            format!("dopri5 rtol={rtol:e} atol={atol:e} max_steps={max_steps}")
        }
    }
}

fn fmt_params(best: &BestFit) -> String {
    let parts: Vec<String> = best
        .param_names
        .iter()
        .zip(&best.params)
        .map(|(n, v)| format!("{n}={}", fmt_num(*v)))
        .collect();
    parts.join(", ")
}

/// Compact number formatting: fixed for ordinary magnitudes, scientific otherwise.
pub fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let a = v.abs();
    if a != 0.0 && !(1e-4..1e7).contains(&a) {
        format!("{v:.4e}")
    } else {
        let s = format!("{v:.6}");
        let s = s.trim_end_matches('0').trim_end_matches('.');
        if s == "-0" { "0".to_string() } else { s.to_string() }
    }
}
