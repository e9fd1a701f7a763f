//! [`Skill`] – a motion program produced by the skill loader.
//!
//! | Kind | Played by |
//! |---|---|
//! | [`SkillKind::Posture`] | motion duty, every tick while motion is disabled |
//! | [`SkillKind::Gait`] | motion duty, one frame per tick while motion is enabled |
//! | [`SkillKind::Behaviour`] | router, synchronously and to completion |
//! | [`SkillKind::Invalid`] | never; the loader did not recognise the command |

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::{DOF, PawError, WALKING_DOF};

pub const MAX_GAIT_FRAMES: usize = 48;
pub const MAX_BEHAVIOUR_FRAMES: usize = 24;

/// One authored angle (degrees) per joint slot.
pub type JointAngles = [i8; DOF];

/// One authored angle (degrees) per leg joint.
pub type GaitFrame = [i8; WALKING_DOF];

/// Attitude condition that ends a behaviour frame.
///
/// `axis` selects the angle (see `AttitudeEstimator::angle_from_axis`); its
/// sign picks the crossing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub axis: i8,
    pub angle_deg: i8,
}

/// A single behaviour frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviourFrame {
    pub angles: JointAngles,
    /// Transition speed; larger is faster.
    pub speed: u8,
    /// Hold time in units of 50 ms, used when there is no trigger.
    pub delay: u8,
    #[serde(default)]
    pub trigger: Option<Trigger>,
}

/// Contiguous frame span `first..=last` played `count` times in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoopSpan {
    pub first: u8,
    pub last: u8,
    pub count: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum SkillKind {
    Posture {
        angles: JointAngles,
    },
    Gait {
        frames: Vec<GaitFrame, MAX_GAIT_FRAMES>,
    },
    Behaviour {
        frames: Vec<BehaviourFrame, MAX_BEHAVIOUR_FRAMES>,
        #[serde(default)]
        loop_span: LoopSpan,
    },
    #[default]
    Invalid,
}

/// Motion data plus the attitude it was authored for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Skill {
    pub kind: SkillKind,
    /// Joint amplitudes are doubled when played.
    #[serde(default)]
    pub double_angles: bool,
    /// Roll (degrees) the posture is authored for.
    #[serde(default)]
    pub nominal_roll: f32,
    /// Pitch (degrees) the posture is authored for.
    #[serde(default)]
    pub nominal_pitch: f32,
}

impl Skill {
    pub fn posture(angles: JointAngles) -> Self {
        Self::from_kind(SkillKind::Posture { angles })
    }

    /// # Errors
    ///
    /// [`PawError::SkillCapacityExceeded`] when `frames` is longer than
    /// [`MAX_GAIT_FRAMES`].
    pub fn gait(frames: &[GaitFrame]) -> Result<Self, PawError> {
        let frames = Vec::from_slice(frames).map_err(|_| PawError::SkillCapacityExceeded {
            capacity: MAX_GAIT_FRAMES,
        })?;
        Ok(Self::from_kind(SkillKind::Gait { frames }))
    }

    /// # Errors
    ///
    /// [`PawError::SkillCapacityExceeded`] when `frames` is longer than
    /// [`MAX_BEHAVIOUR_FRAMES`].
    pub fn behaviour(frames: &[BehaviourFrame], loop_span: LoopSpan) -> Result<Self, PawError> {
        let frames = Vec::from_slice(frames).map_err(|_| PawError::SkillCapacityExceeded {
            capacity: MAX_BEHAVIOUR_FRAMES,
        })?;
        Ok(Self::from_kind(SkillKind::Behaviour { frames, loop_span }))
    }

    pub fn invalid() -> Self {
        Self::default()
    }

    fn from_kind(kind: SkillKind) -> Self {
        Self {
            kind,
            double_angles: false,
            nominal_roll: 0.0,
            nominal_pitch: 0.0,
        }
    }

    pub fn with_nominal(mut self, roll_deg: f32, pitch_deg: f32) -> Self {
        self.nominal_roll = roll_deg;
        self.nominal_pitch = pitch_deg;
        self
    }

    pub fn with_double_angles(mut self) -> Self {
        self.double_angles = true;
        self
    }

    /// 2 when amplitudes are doubled, else 1.
    pub fn angle_multiplier(&self) -> f32 {
        if self.double_angles { 2.0 } else { 1.0 }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, SkillKind::Invalid)
    }

    pub fn is_gait(&self) -> bool {
        matches!(self.kind, SkillKind::Gait { .. })
    }

    pub fn is_posture(&self) -> bool {
        matches!(self.kind, SkillKind::Posture { .. })
    }

    /// Number of frames; postures count as one, invalid skills as zero.
    pub fn frame_count(&self) -> usize {
        match &self.kind {
            SkillKind::Posture { .. } => 1,
            SkillKind::Gait { frames } => frames.len(),
            SkillKind::Behaviour { frames, .. } => frames.len(),
            SkillKind::Invalid => 0,
        }
    }

    /// Posture angles, if this is a posture.
    pub fn posture_angles_mut(&mut self) -> Option<&mut JointAngles> {
        match &mut self.kind {
            SkillKind::Posture { angles } => Some(angles),
            _ => None,
        }
    }
}
