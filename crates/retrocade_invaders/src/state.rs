//! Save-state encoding.
//!
//! A state is the CPU register-file snapshot plus the full 64 KiB memory
//! image, serialized with a stable field order. Callers treat the bytes as
//! opaque; the only guaranteed property is a deterministic round trip.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::cpu::CpuState;
use crate::memory::MEMORY_SIZE;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    pub cpu: CpuState,
    pub memory: Vec<u8>,
}

impl SaveState {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("failed to encode save state")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let state: SaveState =
            serde_json::from_slice(bytes).context("failed to decode save state")?;
        ensure!(
            state.memory.len() == MEMORY_SIZE,
            "corrupt save state: memory image is {} bytes, want {}",
            state.memory.len(),
            MEMORY_SIZE,
        );
        Ok(state)
    }
}

/// Default state file: the ROM path with its extension replaced by `.state`.
pub fn state_file_path(rom_path: &Path) -> PathBuf {
    rom_path.with_extension("state")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> SaveState {
        let cpu = CpuState {
            a: 0x12,
            f: 0x97,
            b: 1,
            c: 2,
            d: 3,
            e: 4,
            h: 5,
            l: 6,
            pc: 0x1234,
            sp: 0x2345,
            cyc: 987_654_321,
            so: 5,
            sr: 0xBEEF,
            interrupts: true,
            io_ports: [0, 9, 0x80, 0, 0, 0x15, 0, 0],
        };
        let mut memory = vec![0u8; MEMORY_SIZE];
        memory[0x2400] = 0xAA;
        memory[0xFFFF] = 0x55;
        SaveState { cpu, memory }
    }

    #[test]
    fn round_trip_is_byte_exact() {
        let state = sample_state();
        let bytes = state.to_bytes().unwrap();
        let restored = SaveState::from_bytes(&bytes).unwrap();
        assert_eq!(restored, state);
        // Deterministic: encoding the restored state yields the same bytes.
        assert_eq!(restored.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn truncated_memory_image_is_rejected() {
        let mut state = sample_state();
        state.memory.truncate(100);
        let bytes = state.to_bytes().unwrap();
        let err = SaveState::from_bytes(&bytes).unwrap_err().to_string();
        assert!(err.contains("corrupt save state"), "{err}");
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(SaveState::from_bytes(b"not a state").is_err());
    }

    #[test]
    fn state_path_replaces_the_extension() {
        assert_eq!(
            state_file_path(Path::new("roms/invaders.zip")),
            PathBuf::from("roms/invaders.state")
        );
        assert_eq!(
            state_file_path(Path::new("TST8080.COM")),
            PathBuf::from("TST8080.state")
        );
    }
}
