// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::LinearMemory;
use crate::metrics::BusStats;
use crate::peripherals::uart::{Uart, UartAccess};
use crate::{BusOutputs, ByteLanes, HarnessConfig, SimResult, SimulationError};

/// Decoded effect of one bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// `cyc && stb` was low.
    Idle,
    RamRead { adr: u32, dat: u32 },
    RamWrite { adr: u32, sel: ByteLanes, dat: u32 },
    Uart(UartAccess),
    Unmapped(u32),
}

impl Transaction {
    pub fn ack(&self) -> bool {
        matches!(
            self,
            Transaction::RamRead { .. } | Transaction::RamWrite { .. } | Transaction::Uart(_)
        )
    }

    /// Data to present on the read port, if this cycle produced any.
    pub fn read_data(&self) -> Option<u32> {
        match self {
            Transaction::RamRead { dat, .. } => Some(*dat),
            _ => None,
        }
    }
}

/// Single-slave Wishbone interconnect: RAM at `[0, capacity)` plus the UART at one fixed address.
#[derive(Debug)]
pub struct WishboneBus {
    pub ram: LinearMemory,
    pub uart: Uart,
    pub uart_base: u32,
    pub stats: BusStats,
    last_unmapped: Option<u32>,
}

impl WishboneBus {
    pub fn new(ram_size: usize, uart_base: u32) -> Self {
        Self {
            ram: LinearMemory::new(ram_size),
            uart: Uart::new(),
            uart_base,
            stats: BusStats::default(),
            last_unmapped: None,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> SimResult<Self> {
        config
            .validate()
            .map_err(|e| SimulationError::Config(format!("{:#}", e)))?;
        let ram_size = config
            .ram_bytes()
            .map_err(|e| SimulationError::Config(format!("{:#}", e)))?;
        let mut bus = Self::new(ram_size, config.uart_address);
        bus.uart = Uart::with_echo(config.uart_echo);
        Ok(bus)
    }

    /// Clears everything a previous run left behind except RAM contents.
    pub fn begin_run(&mut self) {
        self.uart.clear();
        self.stats = BusStats::default();
        self.last_unmapped = None;
    }

    /// Address of the unmapped request the master is currently stalled on.
    pub fn stalled_at(&self) -> Option<u32> {
        self.last_unmapped
    }

    /// Services one cycle's worth of master outputs. First matching region wins.
    pub fn service(&mut self, req: &BusOutputs) -> Transaction {
        if !req.is_active() {
            return Transaction::Idle;
        }

        if self.ram.contains(req.adr) {
            self.last_unmapped = None;
            return if req.we {
                self.ram.write_lanes(req.adr, req.sel, req.dat);
                self.stats.ram_writes += 1;
                tracing::trace!(
                    "RAM write: [{:#x}] <- {:#010x} (sel={:#x})",
                    req.adr,
                    req.dat,
                    req.sel.bits()
                );
                Transaction::RamWrite {
                    adr: req.adr,
                    sel: req.sel,
                    dat: req.dat,
                }
            } else {
                let dat = self.ram.read_u32(req.adr);
                self.stats.ram_reads += 1;
                tracing::trace!("RAM read: [{:#x}] -> {:#010x}", req.adr, dat);
                Transaction::RamRead { adr: req.adr, dat }
            };
        }

        if req.adr == self.uart_base {
            self.last_unmapped = None;
            let access = self.uart.access(req.we, req.sel, req.dat);
            match access {
                UartAccess::Transmitted(byte) => {
                    self.stats.uart_writes += 1;
                    tracing::debug!("UART TX: {:#04x} ({:?})", byte, byte as char);
                }
                UartAccess::Ignored => {
                    self.stats.uart_ignored += 1;
                    tracing::debug!(
                        "UART access ignored (we={}, sel={:#x})",
                        req.we,
                        req.sel.bits()
                    );
                }
            }
            return Transaction::Uart(access);
        }

        self.stats.unmapped += 1;
        // A stalled master retries the same address every cycle; report it once.
        if self.last_unmapped != Some(req.adr) {
            tracing::warn!("Unhandled address: {:#x}", req.adr);
            self.last_unmapped = Some(req.adr);
        } else {
            tracing::trace!("Unhandled address (retry): {:#x}", req.adr);
        }
        Transaction::Unmapped(req.adr)
    }
}
