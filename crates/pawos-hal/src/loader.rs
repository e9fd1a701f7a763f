//! Skill loader boundary.
//!
//! A loader is a pure mapping from a [`Command`] to the [`Skill`] it names.
//! Unrecognised commands map to [`Skill::invalid`]; the router then leaves the
//! current motion untouched.

use std::collections::HashMap;

use pawos_types::{ArgOp, Command, Move, SimpleCommand, Skill};

pub trait SkillLoader {
    fn load(&self, command: &Command) -> Skill;
}

/// Lookup key derived from a command.
///
/// Argument payloads never select a skill, except that every `Calibrate`
/// command maps to the calibration posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillKey {
    Simple(SimpleCommand),
    Move(Move),
    Calibration,
}

impl SkillKey {
    pub fn for_command(command: &Command) -> Option<Self> {
        match command {
            Command::None => None,
            Command::Simple(s) => Some(SkillKey::Simple(*s)),
            Command::Move(m) => Some(SkillKey::Move(*m)),
            Command::WithArgs(a) => match a.op {
                ArgOp::Calibrate => Some(SkillKey::Calibration),
                ArgOp::MoveSequentially
                | ArgOp::MoveSimultaneously
                | ArgOp::Meow
                | ArgOp::Beep => None,
            },
        }
    }
}

/// In-memory skill table, filled once at start-up.
#[derive(Debug, Default, Clone)]
pub struct SkillBook {
    skills: HashMap<SkillKey, Skill>,
}

impl SkillBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the skill stored under `key`.
    pub fn insert(&mut self, key: SkillKey, skill: Skill) {
        self.skills.insert(key, skill);
    }

    pub fn with(mut self, key: SkillKey, skill: Skill) -> Self {
        self.insert(key, skill);
        self
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn contains(&self, key: &SkillKey) -> bool {
        self.skills.contains_key(key)
    }
}

impl SkillLoader for SkillBook {
    fn load(&self, command: &Command) -> Skill {
        SkillKey::for_command(command)
            .and_then(|key| self.skills.get(&key))
            .cloned()
            .unwrap_or_else(Skill::invalid)
    }
}
