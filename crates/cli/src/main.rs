// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod vcd_trace;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use wbharness_config::{parse_u32_addr, HarnessConfig};
use wbharness_core::cpu::Rv32Core;
use wbharness_core::{run_image, NullTrace, RunOutcome, RunReport, TraceSink};

use crate::vcd_trace::VcdTrace;

const EXIT_OK: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const ANSI_RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Runs raw RV32 test images against a Wishbone core model",
    long_about = None
)]
struct Cli {
    /// Raw binary images, loaded at address 0 and run in order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Harness configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the run-phase cycle budget
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Override the number of cycles reset is held
    #[arg(long)]
    reset_cycles: Option<u32>,

    /// Override the RAM size (e.g. "1MiB", "64KiB"; "KB" is 1024-based)
    #[arg(long)]
    ram_size: Option<String>,

    /// Override the result peripheral address
    #[arg(long, value_parser = parse_u32_addr)]
    uart_address: Option<u32>,

    /// Echo peripheral bytes to stdout as they arrive
    #[arg(long)]
    uart_stdout: bool,

    /// Write one VCD waveform per image into this directory
    #[arg(long)]
    vcd_dir: Option<PathBuf>,

    /// Print one JSON run report per image instead of the coloured label
    #[arg(long)]
    json: bool,

    /// Debug logging plus a register dump for runs that did not pass
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct ImageResult<'a> {
    image: String,
    #[serde(flatten)]
    report: &'a RunReport,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if let Some(dir) = &cli.vcd_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!("Failed to create VCD directory {:?}: {}", dir, e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    }

    let mut vcd_names = HashSet::new();
    let mut passed = 0usize;
    let mut failed_to_run = false;
    for image in &cli.images {
        let vcd_path = cli
            .vcd_dir
            .as_deref()
            .map(|dir| unique_vcd_path(dir, image, &mut vcd_names));
        match run_one(image, &config, vcd_path.as_deref()) {
            Ok(report) => {
                if report.outcome.is_pass() {
                    passed += 1;
                }
                if let Err(e) = print_report(&cli, image, &report) {
                    error!("Failed to print report for {:?}: {:#}", image, e);
                    failed_to_run = true;
                }
            }
            Err(e) => {
                error!("{:#}", e);
                failed_to_run = true;
            }
        }
    }

    if !cli.json {
        println!("---({}/{})---", passed, cli.images.len());
    }

    if failed_to_run {
        ExitCode::from(EXIT_RUNTIME_ERROR)
    } else {
        ExitCode::from(EXIT_OK)
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };

    if let Some(max_cycles) = cli.max_cycles {
        config.max_cycles = max_cycles;
    }
    if let Some(reset_cycles) = cli.reset_cycles {
        config.reset_cycles = reset_cycles;
    }
    if let Some(ram_size) = &cli.ram_size {
        config.ram_size = ram_size.clone();
    }
    if let Some(uart_address) = cli.uart_address {
        config.uart_address = uart_address;
    }
    if cli.uart_stdout {
        config.uart_echo = true;
    }

    config
        .validate()
        .context("Invalid harness configuration after command-line overrides")?;
    Ok(config)
}

/// `<dir>/<stem>.vcd`, or `<dir>/<stem>-<n>.vcd` when an earlier image in the batch took that name.
fn unique_vcd_path(dir: &Path, image: &Path, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());
    let mut path = dir.join(format!("{}.vcd", stem));
    let mut n = 1;
    while taken.contains(&path) {
        path = dir.join(format!("{}-{}.vcd", stem, n));
        n += 1;
    }
    taken.insert(path.clone());
    path
}

fn trace_for(vcd_path: Option<&Path>) -> anyhow::Result<Box<dyn TraceSink>> {
    let Some(path) = vcd_path else {
        return Ok(Box::new(NullTrace));
    };
    info!("Recording waveform to {:?}", path);
    let trace = VcdTrace::create(path)
        .with_context(|| format!("Failed to create VCD trace {:?}", path))?;
    Ok(Box::new(trace))
}

fn run_one(
    image: &Path,
    config: &HarnessConfig,
    vcd_path: Option<&Path>,
) -> anyhow::Result<RunReport> {
    let mut trace = trace_for(vcd_path)?;
    let report = run_image(image, config, Rv32Core::new(), trace.as_mut())?;
    Ok(report)
}

fn outcome_color(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Pass => "\x1b[1;32m",
        RunOutcome::Fail => "\x1b[1;31m",
        RunOutcome::Timeout => "\x1b[1;35m",
    }
}

fn print_report(cli: &Cli, image: &Path, report: &RunReport) -> anyhow::Result<()> {
    let name = image.display().to_string();

    if cli.json {
        let line = serde_json::to_string(&ImageResult {
            image: name,
            report,
        })?;
        println!("{}", line);
        return Ok(());
    }

    println!(
        "{:<25} : {}{}{}",
        name,
        outcome_color(report.outcome),
        report.outcome.label(),
        ANSI_RESET
    );

    if cli.verbose && !report.outcome.is_pass() {
        println!(
            "    cycles={} halted={} uart={:?}",
            report.cycles, report.halted, report.uart
        );
        for (reg, value) in &report.registers {
            println!("    {:<10} = {:#010x}", reg, value);
        }
    }
    Ok(())
}
