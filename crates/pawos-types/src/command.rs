//! [`Command`] – the canonical value produced by every input decoder.
//!
//! Decoders (infrared remote, serial tokens) and the control loop itself
//! (recovery override, rest-after-behaviour) all speak this one type. Commands
//! are immutable values compared by structural equality; [`Command::None`]
//! means "nothing new this tick".

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::PawError;

/// Maximum number of integer arguments carried by an [`ArgCommand`].
pub const MAX_ARGS: usize = 32;

/// Fixed-capacity argument list.
pub type Args = Vec<i16, MAX_ARGS>;

/// Argument-less action tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimpleCommand {
    Rest,
    Balance,
    Sit,
    Stretch,
    Greet,
    Recover,
    Pause,
    GyroToggle,
    SaveServoCalibration,
    AbortServoCalibration,
    ShowJointAngles,
}

/// Speed class of a gait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pace {
    Slow,
    Medium,
    Fast,
}

/// Heading of a gait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

/// Gait selector: speed class × direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub pace: Pace,
    pub direction: Direction,
}

impl Move {
    pub const fn new(pace: Pace, direction: Direction) -> Self {
        Self { pace, direction }
    }
}

impl Default for Move {
    fn default() -> Self {
        Self::new(Pace::Medium, Direction::Forward)
    }
}

/// Operation tag of an [`ArgCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgOp {
    /// `[]` enters calibration; `[joint, offset]` sets one offset.
    Calibrate,
    /// `[joint, angle, joint, angle, …]`, moved one joint at a time.
    MoveSequentially,
    /// One angle per joint, moved together.
    MoveSimultaneously,
    /// `[repeat, increment]`, both optional.
    Meow,
    /// `[note, duration]`, both optional.
    Beep,
}

/// An operation tag plus a short list of signed integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgCommand {
    pub op: ArgOp,
    pub args: Args,
}

impl ArgCommand {
    /// Build a command from a slice of arguments.
    ///
    /// # Errors
    ///
    /// Returns [`PawError::MalformedCommand`] if `args` exceeds [`MAX_ARGS`].
    pub fn new(op: ArgOp, args: &[i16]) -> Result<Self, PawError> {
        let args = Args::from_slice(args).map_err(|_| PawError::MalformedCommand {
            op,
            reason: "too many arguments",
        })?;
        Ok(Self { op, args })
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Argument `index`, or `default` when the list is shorter.
    pub fn arg_or(&self, index: usize, default: i16) -> i16 {
        self.args.get(index).copied().unwrap_or(default)
    }
}

/// Tagged command value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Command {
    #[default]
    None,
    Simple(SimpleCommand),
    Move(Move),
    WithArgs(ArgCommand),
}

impl Command {
    pub fn is_none(&self) -> bool {
        matches!(self, Command::None)
    }

    pub fn as_simple(&self) -> Option<SimpleCommand> {
        match self {
            Command::Simple(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_move(&self) -> Option<Move> {
        match self {
            Command::Move(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_args(&self) -> Option<&ArgCommand> {
        match self {
            Command::WithArgs(a) => Some(a),
            _ => None,
        }
    }
}

impl From<SimpleCommand> for Command {
    fn from(value: SimpleCommand) -> Self {
        Command::Simple(value)
    }
}

impl From<Move> for Command {
    fn from(value: Move) -> Self {
        Command::Move(value)
    }
}

impl From<ArgCommand> for Command {
    fn from(value: ArgCommand) -> Self {
        Command::WithArgs(value)
    }
}

impl PartialEq<SimpleCommand> for Command {
    fn eq(&self, other: &SimpleCommand) -> bool {
        self.as_simple() == Some(*other)
    }
}
