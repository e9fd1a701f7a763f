//! Scalar filter helpers.

/// Single-pole IIR step: move `prev` toward `sample` by `weight` (0–1).
///
/// `weight = 1` tracks the input exactly, `weight = 0` never moves.
pub fn smooth(prev: f32, sample: f32, weight: f32) -> f32 {
    let w = weight.clamp(0.0, 1.0);
    (1.0 - w) * prev + w * sample
}

/// Zero any value whose magnitude is below `tolerance`.
pub fn deadband(value: f32, tolerance: f32) -> f32 {
    if value.abs() < tolerance { 0.0 } else { value }
}
