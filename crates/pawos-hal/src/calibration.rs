//! Persistent per-joint calibration offsets.
//!
//! Offsets are small signed degrees added to every commanded angle by
//! [`ServoBus`](crate::ServoBus). On the board they live in EEPROM; on the
//! host they are a TOML file:
//!
//! ```toml
//! offsets = [0, 0, 0, 0, 0, 0, 0, 0, 3, -2, 0, 1, 0, 0, 4, 0]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use pawos_types::{DOF, PawError};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub trait CalibrationStore {
    /// # Errors
    ///
    /// [`PawError::Calibration`] if the backing storage cannot be read.
    fn load(&mut self) -> Result<[i8; DOF], PawError>;

    /// # Errors
    ///
    /// [`PawError::Calibration`] if the backing storage cannot be written.
    fn save(&mut self, offsets: &[i8; DOF]) -> Result<(), PawError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store
// ────────────────────────────────────────────────────────────────────────────

/// Volatile store; starts out all zeros unless seeded.
#[derive(Debug, Clone, Default)]
pub struct MemoryCalibrationStore {
    offsets: [i8; DOF],
    saves: usize,
}

impl MemoryCalibrationStore {
    pub fn new(offsets: [i8; DOF]) -> Self {
        Self { offsets, saves: 0 }
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&mut self) -> Result<[i8; DOF], PawError> {
        Ok(self.offsets)
    }

    fn save(&mut self, offsets: &[i8; DOF]) -> Result<(), PawError> {
        self.offsets = *offsets;
        self.saves += 1;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TOML file store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct OffsetsFile {
    offsets: Vec<i8>,
}

/// File-backed store. A missing file loads as all zeros.
#[derive(Debug, Clone)]
pub struct TomlCalibrationStore {
    path: PathBuf,
}

impl TomlCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for TomlCalibrationStore {
    fn load(&mut self) -> Result<[i8; DOF], PawError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no calibration file, using zero offsets");
            return Ok([0; DOF]);
        }
        let text = fs::read_to_string(&self.path)
            .map_err(|e| PawError::Calibration(format!("read {}: {e}", self.path.display())))?;
        let file: OffsetsFile =
            toml::from_str(&text).map_err(|e| PawError::Calibration(format!("parse: {e}")))?;
        <[i8; DOF]>::try_from(file.offsets.as_slice()).map_err(|_| {
            PawError::Calibration(format!(
                "expected {DOF} offsets, found {}",
                file.offsets.len()
            ))
        })
    }

    fn save(&mut self, offsets: &[i8; DOF]) -> Result<(), PawError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PawError::Calibration(format!("create dir: {e}")))?;
        }
        let text = toml::to_string(&OffsetsFile {
            offsets: offsets.to_vec(),
        })
        .map_err(|e| PawError::Calibration(format!("serialize: {e}")))?;
        fs::write(&self.path, text)
            .map_err(|e| PawError::Calibration(format!("write {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "calibration saved");
        Ok(())
    }
}
