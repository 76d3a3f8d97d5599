// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use vcd::{IdCode, TimescaleUnit, Value, Writer};
use wbharness_core::{SignalSample, TraceSink};

#[derive(Clone, Copy)]
struct VcdIds {
    clk: IdCode,
    rst: IdCode,
    cyc: IdCode,
    stb: IdCode,
    we: IdCode,
    sel: IdCode,
    adr: IdCode,
    dat_w: IdCode,
    ack: IdCode,
    dat_r: IdCode,
    halted: IdCode,
}

/// Writes every harness sample as a VCD value change, one timestamp per tick.
pub struct VcdTrace {
    writer: Writer<BufWriter<File>>,
    ids: VcdIds,
    last: Option<SignalSample>,
}

impl VcdTrace {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let file = File::create(path)?;
        let mut writer = Writer::new(BufWriter::new(file));

        writer.timescale(1, TimescaleUnit::NS)?;
        writer.add_module("harness")?;
        let clk = writer.add_wire(1, "clk")?;
        let rst = writer.add_wire(1, "rst")?;

        writer.add_module("wb")?;
        let cyc = writer.add_wire(1, "cyc")?;
        let stb = writer.add_wire(1, "stb")?;
        let we = writer.add_wire(1, "we")?;
        let sel = writer.add_wire(4, "sel")?;
        let adr = writer.add_wire(32, "adr")?;
        let dat_w = writer.add_wire(32, "dat_w")?;
        let ack = writer.add_wire(1, "ack")?;
        let dat_r = writer.add_wire(32, "dat_r")?;
        writer.upscope()?; // wb

        let halted = writer.add_wire(1, "halted")?;
        writer.upscope()?; // harness
        writer.enddefinitions()?;

        Ok(Self {
            writer,
            ids: VcdIds {
                clk,
                rst,
                cyc,
                stb,
                we,
                sel,
                adr,
                dat_w,
                ack,
                dat_r,
                halted,
            },
            last: None,
        })
    }

    fn scalar(&mut self, id: IdCode, now: bool, before: Option<bool>) -> io::Result<()> {
        if before == Some(now) {
            return Ok(());
        }
        self.writer
            .change_scalar(id, if now { Value::V1 } else { Value::V0 })
    }

    fn vector(&mut self, id: IdCode, now: u32, width: u32, before: Option<u32>) -> io::Result<()> {
        if before == Some(now) {
            return Ok(());
        }
        self.writer.change_vector(id, u32_to_vec(now, width))
    }
}

// MSB first
fn u32_to_vec(val: u32, width: u32) -> Vec<Value> {
    (0..width)
        .rev()
        .map(|i| if (val >> i) & 1 == 1 { Value::V1 } else { Value::V0 })
        .collect()
}

impl TraceSink for VcdTrace {
    fn sample(&mut self, tick: u64, s: &SignalSample) -> io::Result<()> {
        let prev = self.last;
        let ids = self.ids;

        self.writer.timestamp(tick)?;
        self.scalar(ids.clk, s.clk, prev.map(|p| p.clk))?;
        self.scalar(ids.rst, s.rst, prev.map(|p| p.rst))?;
        self.scalar(ids.cyc, s.outputs.cyc, prev.map(|p| p.outputs.cyc))?;
        self.scalar(ids.stb, s.outputs.stb, prev.map(|p| p.outputs.stb))?;
        self.scalar(ids.we, s.outputs.we, prev.map(|p| p.outputs.we))?;
        self.vector(
            ids.sel,
            s.outputs.sel.bits() as u32,
            4,
            prev.map(|p| p.outputs.sel.bits() as u32),
        )?;
        self.vector(ids.adr, s.outputs.adr, 32, prev.map(|p| p.outputs.adr))?;
        self.vector(ids.dat_w, s.outputs.dat, 32, prev.map(|p| p.outputs.dat))?;
        self.scalar(ids.ack, s.inputs.ack, prev.map(|p| p.inputs.ack))?;
        self.vector(ids.dat_r, s.inputs.dat, 32, prev.map(|p| p.inputs.dat))?;
        self.scalar(ids.halted, s.halted, prev.map(|p| p.halted))?;

        self.last = Some(*s);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.writer().flush()
    }
}

impl Drop for VcdTrace {
    fn drop(&mut self) {
        if let Err(e) = self.writer.writer().flush() {
            tracing::error!("Failed to flush VCD trace: {}", e);
        }
    }
}

impl std::fmt::Debug for VcdTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VcdTrace")
    }
}
