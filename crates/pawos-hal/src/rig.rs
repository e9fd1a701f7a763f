//! [`Rig`] – the owned set of collaborators the control loop drives.
//!
//! Built once at start-up (by the board bring-up code, or by
//! [`SimRig`](crate::sim::SimRig) on the host) and then handed to the control
//! loop, which keeps it for the rest of the run.

use pawos_types::PawError;
use tracing::info;

use crate::calibration::CalibrationStore;
use crate::clock::Clock;
use crate::feedback::{Buzzer, Cue};
use crate::imu::ImuSensor;
use crate::power::PowerMonitor;
use crate::servo::ServoBus;

pub struct Rig {
    pub imu: Box<dyn ImuSensor>,
    pub servos: ServoBus,
    pub buzzer: Box<dyn Buzzer>,
    pub calibration: Box<dyn CalibrationStore>,
    pub power: Box<dyn PowerMonitor>,
    pub clock: Box<dyn Clock>,
}

impl Rig {
    /// Copy the stored offsets into the servo bus.
    ///
    /// # Errors
    ///
    /// Propagates [`PawError::Calibration`] from the store; the bus keeps its
    /// previous offsets in that case.
    pub fn reload_calibration(&mut self) -> Result<(), PawError> {
        let offsets = self.calibration.load()?;
        self.servos.replace_calibration(offsets);
        info!(?offsets, "calibration loaded");
        Ok(())
    }

    /// Persist the servo bus offsets.
    ///
    /// # Errors
    ///
    /// Propagates [`PawError::Calibration`] from the store.
    pub fn save_calibration(&mut self) -> Result<(), PawError> {
        let offsets = *self.servos.calibration();
        self.calibration.save(&offsets)?;
        info!(?offsets, "calibration saved");
        Ok(())
    }

    pub fn play(&mut self, cue: Cue) {
        self.buzzer.play(cue);
    }
}
