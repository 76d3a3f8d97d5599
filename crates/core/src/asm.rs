// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! RV32I instruction encoder for building raw test images.
//!
//! Registers are plain indices (`A0 = 10`). Immediates are taken as `i32` and
//! truncated to the field width, so out-of-range values wrap silently.

pub const ZERO: u8 = 0;
pub const RA: u8 = 1;
pub const SP: u8 = 2;
pub const T0: u8 = 5;
pub const T1: u8 = 6;
pub const A0: u8 = 10;
pub const A1: u8 = 11;
pub const A2: u8 = 12;
pub const A3: u8 = 13;
pub const A4: u8 = 14;

fn r_type(funct7: u32, rs2: u8, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    (funct7 << 25)
        | ((rs2 as u32 & 0x1F) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | (funct3 << 12)
        | ((rd as u32 & 0x1F) << 7)
        | opcode
}

fn i_type(imm: i32, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    ((imm as u32 & 0xFFF) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | (funct3 << 12)
        | ((rd as u32 & 0x1F) << 7)
        | opcode
}

fn s_type(imm: i32, rs2: u8, rs1: u8, funct3: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7F) << 25)
        | ((rs2 as u32 & 0x1F) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | (funct3 << 12)
        | ((imm & 0x1F) << 7)
        | 0x23
}

fn b_type(offset: i32, rs2: u8, rs1: u8, funct3: u32) -> u32 {
    let imm = offset as u32;
    (((imm >> 12) & 1) << 31)
        | (((imm >> 5) & 0x3F) << 25)
        | ((rs2 as u32 & 0x1F) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | (funct3 << 12)
        | (((imm >> 1) & 0xF) << 8)
        | (((imm >> 11) & 1) << 7)
        | 0x63
}

/// `lui rd, upper` where `upper` is the 20-bit value placed in bits [31:12].
pub fn lui(rd: u8, upper: u32) -> u32 {
    ((upper & 0xF_FFFF) << 12) | ((rd as u32 & 0x1F) << 7) | 0x37
}

pub fn addi(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(imm, rs1, 0, rd, 0x13)
}

pub fn andi(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(imm, rs1, 7, rd, 0x13)
}

pub fn add(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x00, rs2, rs1, 0, rd, 0x33)
}

pub fn sub(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x20, rs2, rs1, 0, rd, 0x33)
}

pub fn lw(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(imm, rs1, 2, rd, 0x03)
}

pub fn lbu(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(imm, rs1, 4, rd, 0x03)
}

pub fn sw(rs2: u8, rs1: u8, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 2)
}

pub fn sh(rs2: u8, rs1: u8, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 1)
}

pub fn sb(rs2: u8, rs1: u8, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 0)
}

pub fn beq(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0)
}

pub fn bne(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 1)
}

pub fn jal(rd: u8, offset: i32) -> u32 {
    let imm = offset as u32;
    (((imm >> 20) & 1) << 31)
        | (((imm >> 1) & 0x3FF) << 21)
        | (((imm >> 11) & 1) << 20)
        | (((imm >> 12) & 0xFF) << 12)
        | ((rd as u32 & 0x1F) << 7)
        | 0x6F
}

pub fn ebreak() -> u32 {
    0x0010_0073
}

pub fn nop() -> u32 {
    addi(ZERO, ZERO, 0)
}

/// Writes `text` to the UART one full-word store per byte, then `ebreak; j .`.
///
/// Clobbers `a0` and `a1`.
pub fn uart_puts(uart_base: u32, text: &[u8]) -> Vec<u32> {
    // The store offset is sign-extended, so round the upper part to compensate.
    let upper = uart_base.wrapping_add(0x800) >> 12;
    let lower = uart_base.wrapping_sub(upper << 12) as i32;
    let mut program = vec![lui(A0, upper)];
    for &byte in text {
        program.push(addi(A1, ZERO, byte as i32));
        program.push(sw(A1, A0, lower));
    }
    program.push(ebreak());
    program.push(jal(ZERO, 0));
    program
}

/// The `RVTEST_PASS` epilogue: `OK\n`.
pub fn rvtest_pass(uart_base: u32) -> Vec<u32> {
    uart_puts(uart_base, b"OK\n")
}

/// The `RVTEST_FAIL` epilogue: `ERROR\n`.
pub fn rvtest_fail(uart_base: u32) -> Vec<u32> {
    uart_puts(uart_base, b"ERROR\n")
}

/// Little-endian image bytes for a sequence of instruction words.
pub fn assemble(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
