//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - runs the grid search + model selection
//! - prints reports/plots
//! - writes optional exports

use std::io::Write;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, FitArgs, IntegratorKind, ModelArgs, PlotArgs, SimulateArgs};
use crate::domain::{FitConfig, ModelKind, ModelSettings, SimulateConfig};
use crate::error::AppError;
use crate::math::Integrator;

pub mod pipeline;

/// Entry point for the `gridfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    if let Some(threads) = cli.threads {
        init_thread_pool(threads)?;
    }

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Plot(args) => handle_plot(args),
    }
}

/// Logs go to stderr so stdout stays the report.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn init_thread_pool(threads: usize) -> Result<(), AppError> {
    if threads == 0 {
        return Err(AppError::new(2, "Thread count must be >= 1."));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| AppError::new(2, format!("Failed to configure thread pool: {e}")))?;
    tracing::debug!(threads, "rayon pool configured");
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_run_summary(&run.ingest, &run.selection));

    let best = run.selection.best_fit();
    if config.top_n > 0 {
        println!("{}", crate::report::format_top_candidates(best, config.top_n));
    }

    let worst = crate::report::largest_residuals(&run.residuals, config.top_n.max(1));
    println!("Largest residuals:");
    println!("{}", crate::report::format_residuals(&worst));

    if config.plot {
        let plot = crate::plot::render_fit_plot(
            &run.ingest.observations,
            best,
            config.plot_width,
            config.plot_height,
        )?;
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::write_residual_table_csv(path, &best.table)?;
        tracing::info!(path = %path.display(), rows = best.table.len(), "residual table written");
    }
    if let Some(path) = &config.export_fit {
        let file = crate::io::build_fit_file(best, &run.ingest.observations)?;
        crate::io::write_fit_json(path, &file)?;
        tracing::info!(path = %path.display(), "fit written");
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = simulate_config_from_args(&args);
    let obs = pipeline::run_simulate(&config)?;

    match &config.out {
        Some(path) => {
            crate::io::write_observations_csv(path, &obs, &config.x_col, &config.y_col)?;
            tracing::info!(path = %path.display(), points = obs.len(), "observations written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            let write = |out: &mut dyn Write| -> std::io::Result<()> {
                writeln!(out, "{},{}", config.x_col, config.y_col)?;
                for p in obs.points() {
                    writeln!(out, "{},{}", p.x, p.y)?;
                }
                Ok(())
            };
            write(&mut stdout).map_err(|e| AppError::new(2, format!("Failed to write to stdout: {e}")))?;
        }
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::read_fit_json(&args.fit)?;
    println!(
        "{} | {} | SSE={}",
        file.settings.kind().display_name(),
        crate::report::fmt_settings(&file.settings),
        crate::report::fmt_num(file.quality.sse)
    );
    let plot = crate::plot::render_fit_file_plot(&file, args.width, args.height);
    println!("{plot}");
    Ok(())
}

fn integrator_from_args(args: &ModelArgs) -> Integrator {
    match args.integrator {
        IntegratorKind::Rk4 => Integrator::Rk4 { step: args.ode_step },
        IntegratorKind::Dopri5 => Integrator::Dopri5 {
            rtol: args.rtol,
            atol: args.atol,
            max_steps: args.max_steps,
        },
    }
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        data_path: args.data.clone(),
        x_col: args.x_col.clone(),
        y_col: args.y_col.clone(),
        model_spec: args.model,
        grid_specs: args.grid.clone(),
        n0: args.model_args.n0,
        amplitude: args.model_args.amplitude,
        period: args.model_args.period,
        offset: args.model_args.offset,
        integrator: integrator_from_args(&args.model_args),
        parallel: !args.serial,
        top_n: args.top,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_fit: args.export_fit.clone(),
    }
}

/// Without observations, `N0` defaults to 1 at `t0 = x_start`.
pub fn simulate_config_from_args(args: &SimulateArgs) -> SimulateConfig {
    let m = &args.model_args;
    let n0 = m.n0.unwrap_or(1.0);
    let settings = match args.model {
        ModelKind::Exponential => ModelSettings::Exponential { n0, t0: args.x_start },
        ModelKind::Sine => ModelSettings::Sine {
            amplitude: m.amplitude,
            period: m.period,
            offset: m.offset,
        },
        ModelKind::Logistic => ModelSettings::Logistic {
            n0,
            t0: args.x_start,
            integrator: integrator_from_args(m),
        },
    };

    SimulateConfig {
        settings,
        param_specs: args.params.clone(),
        x_start: args.x_start,
        x_stop: args.x_stop,
        x_step: args.x_step,
        noise_sd: args.noise_sd,
        seed: args.seed,
        x_col: args.x_col.clone(),
        y_col: args.y_col.clone(),
        out: args.out.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_flags_fold_into_config() {
        let cli = Cli::try_parse_from([
            "gridfit", "fit", "--data", "d.csv", "--model", "all", "--no-plot", "--serial", "--integrator", "rk4",
            "--ode-step", "0.05", "--export-fit", "out.json",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args);
        assert!(!config.plot);
        assert!(!config.parallel);
        assert_eq!(config.integrator, Integrator::Rk4 { step: 0.05 });
        assert_eq!(config.model_spec.kinds().len(), 3);
        assert_eq!(config.export_fit, Some("out.json".into()));
    }

    #[test]
    fn simulate_defaults_start_at_x_start() {
        let cli = Cli::try_parse_from([
            "gridfit", "simulate", "--model", "exponential", "--params", "r=0.2", "--x-start", "2", "--n0", "5",
        ])
        .unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let config = simulate_config_from_args(&args);
        assert_eq!(config.settings, ModelSettings::Exponential { n0: 5.0, t0: 2.0 });
        let obs = pipeline::run_simulate(&config).unwrap();
        assert_eq!(obs.first().y, 5.0);
    }
}
