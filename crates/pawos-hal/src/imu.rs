//! IMU boundary.
//!
//! Register I/O and offset calibration live behind [`ImuSensor`]. The core
//! assumes every read succeeds; loss of the sensor bus is handled (or not)
//! by the driver.

use pawos_types::OrientationSample;

/// Source of body-frame orientation samples.
pub trait ImuSensor {
    fn read_sample(&mut self) -> OrientationSample;
}

/// Flips individual axes of a mounted sensor into the body frame.
///
/// The Bittle board mounts its MPU6050 rotated 180° about z, so x and y of
/// both the accelerometer and the gyroscope are inverted.
pub struct BodyFrameImu<S> {
    inner: S,
    accel_sign: [f32; 3],
    gyro_sign: [f32; 3],
}

impl<S: ImuSensor> BodyFrameImu<S> {
    pub fn new(inner: S, accel_sign: [f32; 3], gyro_sign: [f32; 3]) -> Self {
        Self {
            inner,
            accel_sign,
            gyro_sign,
        }
    }

    /// Sign map for a sensor mounted upside-down about z.
    pub fn rotated_half_turn(inner: S) -> Self {
        Self::new(inner, [-1.0, -1.0, 1.0], [-1.0, -1.0, 1.0])
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ImuSensor> ImuSensor for BodyFrameImu<S> {
    fn read_sample(&mut self) -> OrientationSample {
        let mut sample = self.inner.read_sample();
        for axis in 0..3 {
            sample.accel[axis] *= self.accel_sign[axis];
            sample.gyro[axis] *= self.gyro_sign[axis];
        }
        sample
    }
}
