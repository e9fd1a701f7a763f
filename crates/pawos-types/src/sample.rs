//! Inertial measurement values.

use serde::{Deserialize, Serialize};

/// One timestamped 6-axis IMU reading, already normalized to the body frame.
///
/// `accel` may be in any consistent unit (raw counts or g); only its
/// direction is used. `gyro` is the angular rate about x/y/z in rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrientationSample {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub timestamp_us: u64,
}

impl OrientationSample {
    /// A motionless sample whose gravity vector corresponds to the given
    /// roll and pitch (radians).
    pub fn from_tilt(roll: f32, pitch: f32, timestamp_us: u64) -> Self {
        Self {
            accel: [
                -pitch.sin(),
                roll.sin() * pitch.cos(),
                roll.cos() * pitch.cos(),
            ],
            gyro: [0.0; 3],
            timestamp_us,
        }
    }

    /// Same sample with the given angular rates (rad/s).
    pub fn with_gyro(mut self, gyro: [f32; 3]) -> Self {
        self.gyro = gyro;
        self
    }
}

/// Roll and pitch estimate in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Angles {
    pub roll: f32,
    pub pitch: f32,
}

impl Angles {
    pub fn roll_deg(&self) -> f32 {
        self.roll.to_degrees()
    }

    pub fn pitch_deg(&self) -> f32 {
        self.pitch.to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_tilt_points_gravity_down_z() {
        let s = OrientationSample::from_tilt(0.0, 0.0, 0);
        assert!(s.accel[0].abs() < 1e-6);
        assert!(s.accel[1].abs() < 1e-6);
        assert!((s.accel[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tilt_vector_has_unit_length() {
        let s = OrientationSample::from_tilt(0.4, -0.7, 10);
        let norm = s.accel.iter().map(|a| a * a).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(s.timestamp_us, 10);
    }
}
