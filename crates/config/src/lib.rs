// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest RAM region the harness will allocate for a single run.
pub const MAX_RAM_BYTES: u64 = 16 * 1024 * 1024;

pub const DEFAULT_RAM_SIZE: &str = "1MiB";
pub const DEFAULT_UART_ADDRESS: u32 = 0x8000_0000;
pub const DEFAULT_RESET_CYCLES: u32 = 5;
pub const DEFAULT_MAX_CYCLES: u64 = 2 * 2048;

fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_ram_size() -> String {
    DEFAULT_RAM_SIZE.to_string()
}

fn default_uart_address() -> u32 {
    DEFAULT_UART_ADDRESS
}

fn default_reset_cycles() -> u32 {
    DEFAULT_RESET_CYCLES
}

fn default_max_cycles() -> u64 {
    DEFAULT_MAX_CYCLES
}

/// Run parameters shared by every image in a batch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// RAM capacity, e.g. "1MiB" or "256KiB". "KB" and "MB" are 1024-based as well.
    /// RAM always starts at address 0.
    #[serde(default = "default_ram_size")]
    pub ram_size: String,
    /// Byte address of the write-only result peripheral.
    #[serde(default = "default_uart_address")]
    pub uart_address: u32,
    /// Clock cycles spent with reset asserted before the run phase.
    #[serde(default = "default_reset_cycles")]
    pub reset_cycles: u32,
    /// Run-phase budget in full clock cycles.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u64,
    /// Echo every transmitted UART byte to stdout as it arrives.
    #[serde(default)]
    pub uart_echo: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            ram_size: default_ram_size(),
            uart_address: default_uart_address(),
            reset_cycles: default_reset_cycles(),
            max_cycles: default_max_cycles(),
            uart_echo: false,
        }
    }
}

impl HarnessConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open harness config at {:?}", path.as_ref()))?;
        let config: Self =
            serde_yaml::from_reader(f).context("Failed to parse harness config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).context("Failed to parse harness config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// RAM capacity in bytes.
    pub fn ram_bytes(&self) -> Result<usize> {
        let bytes = parse_size(&self.ram_size)?;
        Ok(bytes as usize)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        let ram = parse_size(&self.ram_size)?;
        if ram == 0 {
            anyhow::bail!("'ram_size' must be greater than zero");
        }
        if ram > MAX_RAM_BYTES {
            anyhow::bail!(
                "'ram_size' of {} bytes exceeds the {} byte limit",
                ram,
                MAX_RAM_BYTES
            );
        }

        if (self.uart_address as u64) < ram {
            anyhow::bail!(
                "'uart_address' {:#x} lies inside the RAM region [0, {:#x})",
                self.uart_address,
                ram
            );
        }

        if self.max_cycles == 0 {
            anyhow::bail!("'max_cycles' must be greater than zero");
        }

        tracing::debug!(
            "Harness config: ram={} bytes, uart={:#x}, reset_cycles={}, max_cycles={}",
            ram,
            self.uart_address,
            self.reset_cycles,
            self.max_cycles
        );
        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format '{}': {}", size_str, e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

/// Parses a `0x`-prefixed hex or plain decimal 32-bit address.
pub fn parse_u32_addr(s: &str) -> Result<u32, String> {
    let trimmed = s.trim().replace('_', "");
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex address '{}': {}", s, e))
    } else {
        trimmed
            .parse::<u32>()
            .map_err(|e| format!("Invalid address '{}': {}", s, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HarnessConfig::default();
        assert_eq!(config.ram_bytes().unwrap(), 1024 * 1024);
        assert_eq!(config.uart_address, 0x8000_0000);
        assert_eq!(config.reset_cycles, 5);
        assert_eq!(config.max_cycles, 4096);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("128KiB").unwrap(), 128 * 1024);
        assert_eq!(parse_size("128KB").unwrap(), 131_072);
        assert_eq!(parse_size("1MiB").unwrap(), 1024 * 1024);
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_parse_u32_addr() {
        assert_eq!(parse_u32_addr("0x8000_0000"), Ok(0x8000_0000));
        assert_eq!(parse_u32_addr("0X10"), Ok(16));
        assert_eq!(parse_u32_addr("4096"), Ok(4096));
        assert!(parse_u32_addr("0xZZ").is_err());
        assert!(parse_u32_addr("0x1_0000_0000").is_err());
    }

    #[test]
    fn test_uart_inside_ram_rejected() {
        let config = HarnessConfig {
            uart_address: 0x100,
            ..HarnessConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("inside the RAM region"));
    }

    #[test]
    fn test_oversized_ram_rejected() {
        let config = HarnessConfig {
            ram_size: "64MiB".to_string(),
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let config = HarnessConfig {
            max_cycles: 0,
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
