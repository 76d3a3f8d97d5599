// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::decoder::riscv::{decode_rv32, Instruction, Width};
use crate::{BusInputs, BusOutputs, ByteLanes, ClockedCore};

const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    /// Coming out of reset; the first fetch is issued on the next rising edge.
    Boot,
    /// Instruction fetch outstanding at `pc`.
    Fetch,
    /// Load outstanding; the word lands in `rd` once acknowledged.
    Load {
        rd: u8,
        width: Width,
        signed: bool,
        offset: u32,
    },
    /// Store outstanding.
    Store,
    Halted,
}

/// Multi-cycle RV32I core with a Wishbone classic master port.
///
/// Every instruction is fetched over the bus; loads and stores issue a second
/// transfer on the aligned word with the lane mask derived from width and
/// address. State only advances on a rising clock edge.
#[derive(Debug)]
pub struct Rv32Core {
    pub x: [u32; 32],
    pub pc: u32,
    pub state: CoreState,
    pub retired: u64,

    clk: bool,
    prev_clk: bool,
    rst: bool,
    inputs: BusInputs,
    request: BusOutputs,
}

impl Default for Rv32Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Rv32Core {
    pub fn new() -> Self {
        Self {
            x: [0; 32],
            pc: 0,
            state: CoreState::Boot,
            retired: 0,
            clk: false,
            prev_clk: false,
            rst: false,
            inputs: BusInputs::default(),
            request: BusOutputs::IDLE,
        }
    }

    fn read_reg(&self, n: u8) -> u32 {
        if n == 0 {
            0
        } else {
            self.x[n as usize]
        }
    }

    fn write_reg(&mut self, n: u8, val: u32) {
        if n != 0 {
            self.x[n as usize] = val;
        }
    }

    fn reset_state(&mut self) {
        self.x = [0; 32];
        self.pc = 0;
        self.retired = 0;
        self.state = CoreState::Boot;
        self.request = BusOutputs::IDLE;
    }

    fn fetch(&mut self, pc: u32) {
        self.pc = pc;
        if pc & 3 != 0 {
            self.halt(format_args!("misaligned fetch at {:#x}", pc));
            return;
        }
        self.state = CoreState::Fetch;
        self.request = BusOutputs::read(pc, ByteLanes::WORD);
    }

    fn halt(&mut self, reason: std::fmt::Arguments<'_>) {
        tracing::warn!("Core halted at pc={:#x}: {}", self.pc, reason);
        self.state = CoreState::Halted;
        self.request = BusOutputs::IDLE;
    }

    /// Lane mask and byte offset for an access of `width` at `addr`, or `None` if misaligned.
    fn lanes_for(addr: u32, width: Width) -> Option<(ByteLanes, u32)> {
        let offset = addr & 3;
        if offset % width.bytes() != 0 {
            return None;
        }
        let mask = match width {
            Width::Byte => 0b0001u8,
            Width::Half => 0b0011,
            Width::Word => 0b1111,
        };
        Some((ByteLanes::from_bits_truncate(mask << offset), offset))
    }

    fn retire(&mut self, next_pc: u32) {
        self.retired += 1;
        self.fetch(next_pc);
    }

    fn execute(&mut self, opcode: u32) {
        let instruction = decode_rv32(opcode);
        tracing::trace!(
            "PC={:#x}, Op={:#010x}, Instr={:?}",
            self.pc,
            opcode,
            instruction
        );

        let pc = self.pc;
        let next_pc = pc.wrapping_add(4);

        match instruction {
            Instruction::Lui { rd, imm } => {
                self.write_reg(rd, imm);
                self.retire(next_pc);
            }
            Instruction::Auipc { rd, imm } => {
                self.write_reg(rd, pc.wrapping_add(imm));
                self.retire(next_pc);
            }
            Instruction::Jal { rd, imm } => {
                self.write_reg(rd, next_pc);
                self.retire(pc.wrapping_add(imm as u32));
            }
            Instruction::Jalr { rd, rs1, imm } => {
                let target = self.read_reg(rs1).wrapping_add(imm as u32) & !1;
                self.write_reg(rd, next_pc);
                self.retire(target);
            }
            Instruction::Branch {
                cond,
                rs1,
                rs2,
                imm,
            } => {
                let target = if cond.taken(self.read_reg(rs1), self.read_reg(rs2)) {
                    pc.wrapping_add(imm as u32)
                } else {
                    next_pc
                };
                self.retire(target);
            }
            Instruction::Load {
                width,
                signed,
                rd,
                rs1,
                imm,
            } => {
                let addr = self.read_reg(rs1).wrapping_add(imm as u32);
                let Some((sel, offset)) = Self::lanes_for(addr, width) else {
                    self.halt(format_args!("misaligned load at {:#x}", addr));
                    return;
                };
                self.state = CoreState::Load {
                    rd,
                    width,
                    signed,
                    offset,
                };
                self.request = BusOutputs::read(addr & !3, sel);
            }
            Instruction::Store {
                width,
                rs1,
                rs2,
                imm,
            } => {
                let addr = self.read_reg(rs1).wrapping_add(imm as u32);
                let Some((sel, offset)) = Self::lanes_for(addr, width) else {
                    self.halt(format_args!("misaligned store at {:#x}", addr));
                    return;
                };
                let dat = self.read_reg(rs2) << (8 * offset);
                self.state = CoreState::Store;
                self.request = BusOutputs::write(addr & !3, sel, dat);
            }
            Instruction::OpImm { op, rd, rs1, imm } => {
                let res = op.apply(self.read_reg(rs1), imm as u32);
                self.write_reg(rd, res);
                self.retire(next_pc);
            }
            Instruction::Op { op, rd, rs1, rs2 } => {
                let res = op.apply(self.read_reg(rs1), self.read_reg(rs2));
                self.write_reg(rd, res);
                self.retire(next_pc);
            }
            Instruction::Fence => self.retire(next_pc),
            Instruction::Ecall | Instruction::Ebreak => {
                tracing::debug!("{:?} at pc={:#x}", instruction, pc);
                self.retired += 1;
                self.state = CoreState::Halted;
                self.request = BusOutputs::IDLE;
            }
            Instruction::Unknown(raw) => {
                self.halt(format_args!("illegal instruction {:#010x}", raw));
            }
        }
    }

    fn complete_load(&mut self, rd: u8, width: Width, signed: bool, offset: u32) {
        let raw = self.inputs.dat >> (8 * offset);
        let val = match (width, signed) {
            (Width::Byte, true) => raw as u8 as i8 as i32 as u32,
            (Width::Byte, false) => raw & 0xFF,
            (Width::Half, true) => raw as u16 as i16 as i32 as u32,
            (Width::Half, false) => raw & 0xFFFF,
            (Width::Word, _) => raw,
        };
        self.write_reg(rd, val);
        self.retire(self.pc.wrapping_add(4));
    }

    /// One rising edge. A pending transfer only completes when ack was high.
    fn posedge(&mut self) {
        match self.state {
            CoreState::Boot => self.fetch(self.pc),
            CoreState::Fetch => {
                if self.inputs.ack {
                    self.execute(self.inputs.dat);
                }
            }
            CoreState::Load {
                rd,
                width,
                signed,
                offset,
            } => {
                if self.inputs.ack {
                    self.complete_load(rd, width, signed, offset);
                }
            }
            CoreState::Store => {
                if self.inputs.ack {
                    self.retire(self.pc.wrapping_add(4));
                }
            }
            CoreState::Halted => {}
        }
    }
}

impl ClockedCore for Rv32Core {
    fn set_clock(&mut self, level: bool) {
        self.clk = level;
    }

    fn set_reset(&mut self, level: bool) {
        self.rst = level;
    }

    fn set_inputs(&mut self, inputs: BusInputs) {
        self.inputs = inputs;
    }

    fn outputs(&self) -> BusOutputs {
        self.request
    }

    fn eval(&mut self) {
        let rising = self.clk && !self.prev_clk;
        self.prev_clk = self.clk;
        if !rising {
            return;
        }
        if self.rst {
            self.reset_state();
        } else {
            self.posedge();
        }
    }

    fn halted(&self) -> bool {
        self.state == CoreState::Halted
    }

    fn registers(&self) -> Vec<(String, u32)> {
        let mut regs = vec![("pc".to_string(), self.pc)];
        regs.extend(
            ABI_NAMES
                .iter()
                .enumerate()
                .map(|(i, name)| (format!("x{} ({})", i, name), self.read_reg(i as u8))),
        );
        regs
    }
}
