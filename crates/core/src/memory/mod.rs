// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{ByteLanes, SimResult, SimulationError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Flat RAM backing both the program image and runtime traffic. Always based at address 0.
#[derive(Debug, Clone)]
pub struct LinearMemory {
    pub data: Vec<u8>,
}

impl LinearMemory {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn contains(&self, addr: u32) -> bool {
        (addr as u64) < self.data.len() as u64
    }

    pub fn read_u8(&self, addr: u32) -> Option<u8> {
        self.data.get(addr as usize).copied()
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) -> bool {
        match self.data.get_mut(addr as usize) {
            Some(byte) => {
                *byte = value;
                true
            }
            None => false,
        }
    }

    /// Little-endian word at `addr`. Bytes past the end of the array read as zero.
    pub fn read_u32(&self, addr: u32) -> u32 {
        (0..4u32).fold(0, |word, lane| {
            let byte = self.read_u8(addr.wrapping_add(lane)).unwrap_or(0);
            word | (byte as u32) << (8 * lane)
        })
    }

    /// Stores the lanes of `value` selected by `sel`; unselected bytes are left untouched.
    pub fn write_lanes(&mut self, addr: u32, sel: ByteLanes, value: u32) {
        for lane in 0..4u32 {
            if sel.has_lane(lane) {
                let byte = (value >> (8 * lane)) as u8;
                self.write_u8(addr.wrapping_add(lane), byte);
            }
        }
    }

    /// Zero-fills the array and copies `image` from offset 0. Returns the number of bytes loaded.
    pub fn load_bytes(&mut self, image: &[u8]) -> usize {
        self.data.fill(0);
        let len = image.len().min(self.data.len());
        self.data[..len].copy_from_slice(&image[..len]);
        if len < image.len() {
            tracing::warn!(
                "Image is {} bytes but memory holds {}; {} trailing bytes dropped",
                image.len(),
                self.data.len(),
                image.len() - len
            );
        }
        len
    }

    /// Loads a raw image file: byte `i` of the file becomes `memory[i]`.
    ///
    /// Reading stops at capacity; one extra byte is read only to detect truncation.
    pub fn load_image(&mut self, path: &Path) -> SimResult<usize> {
        let file = File::open(path).map_err(|source| SimulationError::ImageOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let capacity = self.capacity();
        let mut buffer = Vec::with_capacity(capacity.min(64 * 1024));
        file.take(capacity as u64 + 1)
            .read_to_end(&mut buffer)
            .map_err(|source| SimulationError::ImageRead {
                path: path.to_path_buf(),
                source,
            })?;

        if buffer.len() > capacity {
            tracing::warn!(
                "Image {:?} is larger than the {} byte memory; truncated",
                path,
                capacity
            );
            buffer.truncate(capacity);
        }

        let loaded = self.load_bytes(&buffer);
        tracing::debug!("Loaded {} bytes from {:?}", loaded, path);
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_read_write() {
        let mut mem = LinearMemory::new(1024);

        assert!(mem.write_u8(0x000, 42));
        assert!(mem.write_u8(0x3FF, 99)); // Last byte
        assert!(!mem.write_u8(0x400, 1));

        assert_eq!(mem.read_u8(0x000), Some(42));
        assert_eq!(mem.read_u8(0x3FF), Some(99));
        assert_eq!(mem.read_u8(0x400), None);
    }

    #[test]
    fn test_word_is_little_endian() {
        let mut mem = LinearMemory::new(16);
        mem.load_bytes(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(mem.read_u32(0), 0x1234_5678);
    }

    #[test]
    fn test_write_lanes_only_touches_selected_bytes() {
        let mut mem = LinearMemory::new(16);
        mem.write_lanes(4, ByteLanes::WORD, 0xAABB_CCDD);
        mem.write_lanes(4, ByteLanes::LANE1 | ByteLanes::LANE3, 0x1122_3344);
        assert_eq!(mem.read_u32(4), 0x11BB_33DD);
    }

    #[test]
    fn test_lanes_past_end_are_ignored() {
        let mut mem = LinearMemory::new(8);
        mem.write_lanes(6, ByteLanes::WORD, 0xDDCC_BBAA);
        assert_eq!(mem.data[6..], [0xAA, 0xBB]);
        assert_eq!(mem.read_u32(6), 0x0000_BBAA);
    }

    #[test]
    fn test_load_bytes_zeroes_previous_contents() {
        let mut mem = LinearMemory::new(8);
        mem.load_bytes(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let loaded = mem.load_bytes(&[9, 9]);
        assert_eq!(loaded, 2);
        assert_eq!(mem.data, vec![9, 9, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_load_bytes_truncates_at_capacity() {
        let mut mem = LinearMemory::new(4);
        let loaded = mem.load_bytes(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(loaded, 4);
        assert_eq!(mem.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_load_image_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x13, 0x00, 0x00, 0x00, 0xFF]).unwrap();

        let mut mem = LinearMemory::new(64);
        let loaded = mem.load_image(file.path()).unwrap();
        assert_eq!(loaded, 5);
        assert_eq!(mem.read_u32(0), 0x0000_0013);
        assert_eq!(mem.read_u8(4), Some(0xFF));
        assert_eq!(mem.read_u8(5), Some(0));
    }

    #[test]
    fn test_load_image_stops_at_capacity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x5A; 100]).unwrap();

        let mut mem = LinearMemory::new(16);
        let loaded = mem.load_image(file.path()).unwrap();
        assert_eq!(loaded, 16);
        assert!(mem.data.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_load_image_exactly_capacity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4]).unwrap();

        let mut mem = LinearMemory::new(4);
        assert_eq!(mem.load_image(file.path()).unwrap(), 4);
        assert_eq!(mem.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_load_image_missing_file() {
        let mut mem = LinearMemory::new(64);
        let err = mem
            .load_image(Path::new("/nonexistent/image.bin"))
            .unwrap_err();
        assert!(matches!(err, SimulationError::ImageOpen { .. }));
    }
}
