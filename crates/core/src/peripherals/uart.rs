// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::ByteLanes;
use std::io::{self, Write};

/// What the UART did with one bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartAccess {
    Transmitted(u8),
    Ignored,
}

/// Write-only result port. Only full-word writes transmit; the low byte is the character.
#[derive(Debug, Default, Clone)]
pub struct Uart {
    tx: Vec<u8>,
    echo_stdout: bool,
}

impl Uart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_echo(echo_stdout: bool) -> Self {
        Self {
            tx: Vec::new(),
            echo_stdout,
        }
    }

    /// Everything transmitted since the last clear.
    pub fn transmitted(&self) -> &[u8] {
        &self.tx
    }

    pub fn clear(&mut self) {
        self.tx.clear();
    }

    pub fn access(&mut self, we: bool, sel: ByteLanes, dat: u32) -> UartAccess {
        if !we || sel != ByteLanes::WORD {
            return UartAccess::Ignored;
        }
        let value = (dat & 0xFF) as u8;
        self.push_tx(value);
        UartAccess::Transmitted(value)
    }

    fn push_tx(&mut self, value: u8) {
        self.tx.push(value);

        if self.echo_stdout {
            #[allow(unused_must_use)]
            {
                print!("{}", value as char);
                io::stdout().flush();
            }
        }
    }
}
