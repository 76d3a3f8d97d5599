// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::Serialize;
use std::fmt;

/// Written by `RVTEST_PASS`.
pub const PASS_SIGNATURE: &[u8] = b"OK\n";
/// Written by `RVTEST_FAIL`.
pub const FAIL_SIGNATURE: &[u8] = b"ERROR\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Pass,
    Fail,
}

/// Classifies the UART output collected so far.
///
/// The whole sink must equal a signature: any extra byte before or after it
/// means the image never reports a result.
pub fn check(uart: &[u8]) -> Verdict {
    if uart == PASS_SIGNATURE {
        Verdict::Pass
    } else if uart == FAIL_SIGNATURE {
        Verdict::Fail
    } else {
        Verdict::Continue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Pass,
    Fail,
    Timeout,
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Pass => "PASS",
            RunOutcome::Fail => "FAIL",
            RunOutcome::Timeout => "TIMEOUT",
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, RunOutcome::Pass)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
