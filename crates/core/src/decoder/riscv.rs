// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Width of a load or store.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Width {
    Byte,
    Half,
    Word,
}

impl Width {
    pub fn bytes(self) -> u32 {
        match self {
            Width::Byte => 1,
            Width::Half => 2,
            Width::Word => 4,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BranchCond {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

impl BranchCond {
    pub fn taken(self, a: u32, b: u32) -> bool {
        match self {
            BranchCond::Eq => a == b,
            BranchCond::Ne => a != b,
            BranchCond::Lt => (a as i32) < (b as i32),
            BranchCond::Ge => (a as i32) >= (b as i32),
            BranchCond::Ltu => a < b,
            BranchCond::Geu => a >= b,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

impl AluOp {
    pub fn apply(self, a: u32, b: u32) -> u32 {
        let shamt = b & 0x1F;
        match self {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Sll => a << shamt,
            AluOp::Slt => ((a as i32) < (b as i32)) as u32,
            AluOp::Sltu => (a < b) as u32,
            AluOp::Xor => a ^ b,
            AluOp::Srl => a >> shamt,
            AluOp::Sra => ((a as i32) >> shamt) as u32,
            AluOp::Or => a | b,
            AluOp::And => a & b,
        }
    }
}

/// RV32I base integer instructions, grouped by how the core sequences them.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    Lui { rd: u8, imm: u32 },
    Auipc { rd: u8, imm: u32 },
    Jal { rd: u8, imm: i32 },
    Jalr { rd: u8, rs1: u8, imm: i32 },
    Branch {
        cond: BranchCond,
        rs1: u8,
        rs2: u8,
        imm: i32,
    },
    Load {
        width: Width,
        signed: bool,
        rd: u8,
        rs1: u8,
        imm: i32,
    },
    Store {
        width: Width,
        rs1: u8,
        rs2: u8,
        imm: i32,
    },
    OpImm {
        op: AluOp,
        rd: u8,
        rs1: u8,
        imm: i32,
    },
    Op { op: AluOp, rd: u8, rs1: u8, rs2: u8 },
    Fence,
    Ecall,
    Ebreak,
    Unknown(u32),
}

fn i_imm(inst: u32) -> i32 {
    (inst as i32) >> 20
}

fn s_imm(inst: u32) -> i32 {
    (((inst & 0xFE00_0000) as i32) >> 20) | ((inst >> 7) & 0x1F) as i32
}

fn b_imm(inst: u32) -> i32 {
    // imm[12|10:5] in [31:25], imm[4:1|11] in [11:7]
    (((inst & 0x8000_0000) as i32) >> 19)
        | ((inst & 0x80) << 4) as i32
        | ((inst >> 20) & 0x7E0) as i32
        | ((inst >> 7) & 0x1E) as i32
}

fn j_imm(inst: u32) -> i32 {
    // imm[20|10:1|11|19:12] in [31:12]
    (((inst & 0x8000_0000) as i32) >> 11)
        | (inst & 0xF_F000) as i32
        | ((inst >> 9) & 0x800) as i32
        | ((inst >> 20) & 0x7FE) as i32
}

pub fn decode_rv32(inst: u32) -> Instruction {
    let opcode = inst & 0x7F;
    let rd = ((inst >> 7) & 0x1F) as u8;
    let funct3 = (inst >> 12) & 0x7;
    let rs1 = ((inst >> 15) & 0x1F) as u8;
    let rs2 = ((inst >> 20) & 0x1F) as u8;
    let funct7 = inst >> 25;

    match opcode {
        0x37 => Instruction::Lui {
            rd,
            imm: inst & 0xFFFF_F000,
        },
        0x17 => Instruction::Auipc {
            rd,
            imm: inst & 0xFFFF_F000,
        },
        0x6F => Instruction::Jal {
            rd,
            imm: j_imm(inst),
        },
        0x67 if funct3 == 0 => Instruction::Jalr {
            rd,
            rs1,
            imm: i_imm(inst),
        },
        0x63 => {
            let cond = match funct3 {
                0 => BranchCond::Eq,
                1 => BranchCond::Ne,
                4 => BranchCond::Lt,
                5 => BranchCond::Ge,
                6 => BranchCond::Ltu,
                7 => BranchCond::Geu,
                _ => return Instruction::Unknown(inst),
            };
            Instruction::Branch {
                cond,
                rs1,
                rs2,
                imm: b_imm(inst),
            }
        }
        0x03 => {
            let (width, signed) = match funct3 {
                0 => (Width::Byte, true),
                1 => (Width::Half, true),
                2 => (Width::Word, true),
                4 => (Width::Byte, false),
                5 => (Width::Half, false),
                _ => return Instruction::Unknown(inst),
            };
            Instruction::Load {
                width,
                signed,
                rd,
                rs1,
                imm: i_imm(inst),
            }
        }
        0x23 => {
            let width = match funct3 {
                0 => Width::Byte,
                1 => Width::Half,
                2 => Width::Word,
                _ => return Instruction::Unknown(inst),
            };
            Instruction::Store {
                width,
                rs1,
                rs2,
                imm: s_imm(inst),
            }
        }
        0x13 => {
            let imm = i_imm(inst);
            let op = match funct3 {
                0 => AluOp::Add,
                2 => AluOp::Slt,
                3 => AluOp::Sltu, // immediate is sign-extended, then compared unsigned
                4 => AluOp::Xor,
                6 => AluOp::Or,
                7 => AluOp::And,
                1 if funct7 == 0x00 => AluOp::Sll,
                5 if funct7 == 0x00 => AluOp::Srl,
                5 if funct7 == 0x20 => AluOp::Sra,
                _ => return Instruction::Unknown(inst),
            };
            // Shift immediates carry funct7 in the upper bits.
            let imm = if matches!(op, AluOp::Sll | AluOp::Srl | AluOp::Sra) {
                imm & 0x1F
            } else {
                imm
            };
            Instruction::OpImm { op, rd, rs1, imm }
        }
        0x33 => {
            let op = match (funct3, funct7) {
                (0, 0x00) => AluOp::Add,
                (0, 0x20) => AluOp::Sub,
                (1, 0x00) => AluOp::Sll,
                (2, 0x00) => AluOp::Slt,
                (3, 0x00) => AluOp::Sltu,
                (4, 0x00) => AluOp::Xor,
                (5, 0x00) => AluOp::Srl,
                (5, 0x20) => AluOp::Sra,
                (6, 0x00) => AluOp::Or,
                (7, 0x00) => AluOp::And,
                _ => return Instruction::Unknown(inst),
            };
            Instruction::Op { op, rd, rs1, rs2 }
        }
        0x0F => Instruction::Fence,
        0x73 => match inst {
            0x0000_0073 => Instruction::Ecall,
            0x0010_0073 => Instruction::Ebreak,
            _ => Instruction::Unknown(inst),
        },
        _ => Instruction::Unknown(inst),
    }
}
