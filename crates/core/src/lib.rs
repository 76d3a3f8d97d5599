// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod asm;
pub mod bus;
pub mod cpu;
pub mod decoder;
pub mod harness;
pub mod memory;
pub mod metrics;
pub mod peripherals;
pub mod termination;

use std::path::PathBuf;

mod tests;

pub use harness::{run_image, Harness, RunReport};
pub use termination::{RunOutcome, Verdict};
pub use wbharness_config::HarnessConfig;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Failed to open image {path:?}: {source}")]
    ImageOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read image {path:?}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid harness configuration: {0}")]
    Config(String),
    #[error("Trace recorder failed: {0}")]
    Trace(#[source] std::io::Error),
}

pub type SimResult<T> = Result<T, SimulationError>;

bitflags::bitflags! {
    /// Byte-lane select for a 32-bit bus transfer. Lane `i` carries bits `[8i, 8i+8)`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ByteLanes: u8 {
        const LANE0 = 1 << 0;
        const LANE1 = 1 << 1;
        const LANE2 = 1 << 2;
        const LANE3 = 1 << 3;
        const WORD = Self::LANE0.bits() | Self::LANE1.bits() | Self::LANE2.bits() | Self::LANE3.bits();
    }
}

impl ByteLanes {
    /// Select mask for the single lane `index` (0..=3).
    pub fn lane(index: u32) -> Self {
        Self::from_bits_truncate(1u8.wrapping_shl(index))
    }

    pub fn has_lane(&self, index: u32) -> bool {
        index < 4 && self.contains(Self::lane(index))
    }
}

/// Signals driven by the core towards the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusOutputs {
    pub cyc: bool,
    pub stb: bool,
    pub we: bool,
    pub sel: ByteLanes,
    pub adr: u32,
    pub dat: u32,
}

impl BusOutputs {
    pub const IDLE: Self = Self {
        cyc: false,
        stb: false,
        we: false,
        sel: ByteLanes::empty(),
        adr: 0,
        dat: 0,
    };

    pub fn read(adr: u32, sel: ByteLanes) -> Self {
        Self {
            cyc: true,
            stb: true,
            we: false,
            sel,
            adr,
            dat: 0,
        }
    }

    pub fn write(adr: u32, sel: ByteLanes, dat: u32) -> Self {
        Self {
            cyc: true,
            stb: true,
            we: true,
            sel,
            adr,
            dat,
        }
    }

    /// A transfer is outstanding when both cycle-valid and strobe are high.
    pub fn is_active(&self) -> bool {
        self.cyc && self.stb
    }
}

impl Default for BusOutputs {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Signals driven by the harness back into the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusInputs {
    pub ack: bool,
    pub dat: u32,
}

/// A clock-driven hardware model with a single Wishbone master port.
///
/// The harness writes inputs, toggles the clock and calls [`ClockedCore::eval`]
/// after every edge; the model only advances its state on rising edges.
pub trait ClockedCore {
    fn set_clock(&mut self, level: bool);
    fn set_reset(&mut self, level: bool);
    fn set_inputs(&mut self, inputs: BusInputs);
    fn outputs(&self) -> BusOutputs;
    fn eval(&mut self);

    /// True once the core has executed a halting instruction.
    fn halted(&self) -> bool {
        false
    }

    /// Architectural register dump for post-mortem reporting.
    fn registers(&self) -> Vec<(String, u32)> {
        Vec::new()
    }
}

/// One waveform sample: the full port state of the core at a trace tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSample {
    pub clk: bool,
    pub rst: bool,
    pub outputs: BusOutputs,
    pub inputs: BusInputs,
    pub halted: bool,
}

/// Receives periodic signal snapshots during a run.
pub trait TraceSink {
    fn sample(&mut self, tick: u64, sample: &SignalSample) -> std::io::Result<()>;
    fn flush(&mut self) -> std::io::Result<()>;
}

/// Trace sink that discards every sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn sample(&mut self, _tick: u64, _sample: &SignalSample) -> std::io::Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<T: TraceSink + ?Sized> TraceSink for Box<T> {
    fn sample(&mut self, tick: u64, sample: &SignalSample) -> std::io::Result<()> {
        (**self).sample(tick, sample)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        (**self).flush()
    }
}
