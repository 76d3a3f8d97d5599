// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::Serialize;

/// Per-run transaction counters kept by the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    pub ram_reads: u64,
    pub ram_writes: u64,
    pub uart_writes: u64,
    /// Reads and partial-mask writes to the peripheral address.
    pub uart_ignored: u64,
    pub unmapped: u64,
}

impl BusStats {
    pub fn acknowledged(&self) -> u64 {
        self.ram_reads + self.ram_writes + self.uart_writes + self.uart_ignored
    }
}
