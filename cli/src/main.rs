pub mod cli;
pub mod config;
pub mod monitor;

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use cli::Cli;
use common::logger::{init_logger, root_span, TraceId};
use config::Config;
use monitor::CsvFileMonitor;
use tracing::info;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger("nem-sim");

    let trace_id = TraceId::default();
    let _root = root_span("simulation_run", &trace_id).entered();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error reading config '{}': {err:#}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    let config = match config.validate_and_normalize() {
        Ok(config) => config,
        Err(errors) => {
            eprintln!("configuration is invalid:");
            for error in &errors {
                eprintln!("  - {error}");
            }
            return ExitCode::FAILURE;
        }
    };

    if cli.optimise {
        info!("--optimise accepted (no-op)");
    }

    let construction_start = Instant::now();
    let mut simulation = match config.build_simulation() {
        Ok(simulation) => simulation,
        Err(err) => {
            eprintln!("failed to build simulation: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    if cli.profile {
        info!(elapsed_ms = construction_start.elapsed().as_millis(), "construction and pre-roll complete");
    }

    let run_start = Instant::now();
    simulation.run();
    if cli.profile {
        info!(elapsed_ms = run_start.elapsed().as_millis(), "run loop complete");
    }

    if let Err(err) = CsvFileMonitor::write_report(&config.data_monitor.out_path, config.start_date, config.end_date, simulation.operators()) {
        eprintln!("failed to write monitor output: {err:#}");
        return ExitCode::FAILURE;
    }

    info!(out_path = %config.data_monitor.out_path, "run complete");
    ExitCode::SUCCESS
}
