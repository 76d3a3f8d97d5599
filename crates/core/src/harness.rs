// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Clock sequencing and the per-image run protocol.
//!
//! A run is a reset phase (reset high, bus not serviced) followed by a run
//! phase in which every full clock cycle is:
//!
//! 1. clock high, eval, sample
//! 2. ack low, decode the master's outputs, drive ack/read-data
//! 3. clock low, eval, sample
//! 4. check the UART output against the result signatures
//!
//! The run phase ends on a verdict or when the cycle budget is spent.

use crate::bus::WishboneBus;
use crate::metrics::BusStats;
use crate::termination::{self, RunOutcome, Verdict};
use crate::{
    BusInputs, ClockedCore, HarnessConfig, SignalSample, SimResult, SimulationError, TraceSink,
};
use serde::Serialize;
use std::path::Path;

/// Result of one image run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Run-phase clock cycles executed, reset excluded.
    pub cycles: u64,
    pub uart: String,
    pub halted: bool,
    pub stats: BusStats,
    #[serde(skip)]
    pub registers: Vec<(String, u32)>,
}

pub struct Harness<C: ClockedCore> {
    pub core: C,
    pub bus: WishboneBus,
    reset_cycles: u32,
    max_cycles: u64,
    rst: bool,
    inputs: BusInputs,
    tick: u64,
    cycles: u64,
}

impl<C: ClockedCore> Harness<C> {
    pub fn new(core: C, bus: WishboneBus, config: &HarnessConfig) -> Self {
        Self::with_limits(core, bus, config.reset_cycles, config.max_cycles)
    }

    pub fn with_limits(core: C, bus: WishboneBus, reset_cycles: u32, max_cycles: u64) -> Self {
        Self {
            core,
            bus,
            reset_cycles,
            max_cycles,
            rst: false,
            inputs: BusInputs::default(),
            tick: 0,
            cycles: 0,
        }
    }

    /// Run-phase cycles executed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Trace ticks emitted so far (two per clock cycle).
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    fn record(&mut self, clk: bool, trace: &mut dyn TraceSink) -> SimResult<()> {
        let sample = SignalSample {
            clk,
            rst: self.rst,
            outputs: self.core.outputs(),
            inputs: self.inputs,
            halted: self.core.halted(),
        };
        trace
            .sample(self.tick, &sample)
            .map_err(SimulationError::Trace)?;
        self.tick += 1;
        Ok(())
    }

    fn edge(&mut self, level: bool, trace: &mut dyn TraceSink) -> SimResult<()> {
        self.core.set_clock(level);
        self.core.eval();
        self.record(level, trace)
    }

    /// Holds reset for the configured number of cycles. The bus is not serviced.
    pub fn reset_phase(&mut self, trace: &mut dyn TraceSink) -> SimResult<()> {
        self.rst = true;
        self.core.set_reset(true);
        for _ in 0..self.reset_cycles {
            self.edge(true, trace)?;
            self.edge(false, trace)?;
        }
        self.rst = false;
        self.core.set_reset(false);
        tracing::debug!("Reset released after {} cycles", self.reset_cycles);
        Ok(())
    }

    /// Executes one full run-phase clock cycle and returns the verdict after the falling edge.
    pub fn step_cycle(&mut self, trace: &mut dyn TraceSink) -> SimResult<Verdict> {
        self.edge(true, trace)?;

        // Ack is only ever high for the cycle the slave answered in.
        self.inputs.ack = false;
        self.core.set_inputs(self.inputs);

        let request = self.core.outputs();
        let tx = self.bus.service(&request);
        if tx.ack() {
            self.inputs.ack = true;
            if let Some(dat) = tx.read_data() {
                self.inputs.dat = dat;
            }
            self.core.set_inputs(self.inputs);
        }

        self.edge(false, trace)?;
        self.cycles += 1;

        Ok(termination::check(self.bus.uart.transmitted()))
    }

    /// Steps until a verdict or until the cycle budget is exhausted.
    pub fn run_phase(&mut self, trace: &mut dyn TraceSink) -> SimResult<RunOutcome> {
        while self.cycles < self.max_cycles {
            match self.step_cycle(trace)? {
                Verdict::Pass => return Ok(RunOutcome::Pass),
                Verdict::Fail => return Ok(RunOutcome::Fail),
                Verdict::Continue => {}
            }
        }
        Ok(RunOutcome::Timeout)
    }

    /// Reset phase then run phase. The trace is flushed on every exit path.
    ///
    /// Per-run bus state, ticks and driven inputs start fresh; RAM is left as loaded.
    pub fn run(&mut self, trace: &mut dyn TraceSink) -> SimResult<RunReport> {
        self.bus.begin_run();
        self.rst = false;
        self.inputs = BusInputs::default();
        self.core.set_inputs(self.inputs);
        self.tick = 0;
        self.cycles = 0;

        let result = self
            .reset_phase(trace)
            .and_then(|()| self.run_phase(trace));
        let flushed = trace.flush().map_err(SimulationError::Trace);
        let outcome = result?;
        flushed?;

        Ok(self.report(outcome))
    }

    pub fn report(&self, outcome: RunOutcome) -> RunReport {
        RunReport {
            outcome,
            cycles: self.cycles,
            uart: String::from_utf8_lossy(self.bus.uart.transmitted()).into_owned(),
            halted: self.core.halted(),
            stats: self.bus.stats,
            registers: self.core.registers(),
        }
    }
}

/// Runs one image from scratch: fresh memory, fresh sink, the given fresh core.
pub fn run_image<C: ClockedCore>(
    path: &Path,
    config: &HarnessConfig,
    core: C,
    trace: &mut dyn TraceSink,
) -> SimResult<RunReport> {
    let mut bus = WishboneBus::from_config(config)?;
    bus.ram.load_image(path)?;

    tracing::info!("Running {:?}", path);
    let mut harness = Harness::new(core, bus, config);
    let report = harness.run(trace)?;
    tracing::info!(
        "{:?}: {} after {} cycles ({} bus transfers)",
        path,
        report.outcome,
        report.cycles,
        report.stats.acknowledged()
    );
    Ok(report)
}
