//! Built-in skill book for host runs.
//!
//! Joint order: head pan (0), head tilt (1), unused (2–7), shoulders
//! left-front, right-front, right-hind, left-hind (8–11), then the knees in
//! the same leg order (12–15).

use std::f32::consts::PI;

use pawos_hal::{SkillBook, SkillKey};
use pawos_types::{
    BehaviourFrame, Direction, GaitFrame, JointAngles, LoopSpan, Move, Pace, PawError,
    SimpleCommand, Skill, WALKING_DOF,
};

const fn pose(head: [i8; 2], shoulders: [i8; 4], knees: [i8; 4]) -> JointAngles {
    [
        head[0], head[1], 0, 0, 0, 0, 0, 0, //
        shoulders[0], shoulders[1], shoulders[2], shoulders[3], //
        knees[0], knees[1], knees[2], knees[3],
    ]
}

const REST: JointAngles = pose([0, 0], [70, 70, 70, 70], [-55, -55, -55, -55]);
const BALANCE: JointAngles = pose([0, 0], [30, 30, 30, 30], [30, 30, 30, 30]);
const SIT: JointAngles = pose([0, -20], [10, 10, 75, 75], [40, 40, -30, -30]);
const STRETCH: JointAngles = pose([0, 20], [70, 70, 15, 15], [-15, -15, 45, 45]);
const CALIBRATION: JointAngles = pose([0, 0], [0, 0, 0, 0], [90, 90, 90, 90]);

/// Every skill the host binary knows.
///
/// # Errors
///
/// [`PawError::SkillCapacityExceeded`] if a generated skill does not fit its
/// frame table.
pub fn builtin() -> Result<SkillBook, PawError> {
    let mut book = SkillBook::new()
        .with(SkillKey::Simple(SimpleCommand::Rest), Skill::posture(REST))
        .with(SkillKey::Simple(SimpleCommand::Balance), Skill::posture(BALANCE))
        .with(
            SkillKey::Simple(SimpleCommand::Sit),
            Skill::posture(SIT).with_nominal(0.0, -10.0),
        )
        .with(
            SkillKey::Simple(SimpleCommand::Stretch),
            Skill::posture(STRETCH).with_nominal(0.0, 10.0),
        )
        .with(SkillKey::Simple(SimpleCommand::Greet), greet()?)
        .with(SkillKey::Simple(SimpleCommand::Recover), recover()?)
        .with(SkillKey::Calibration, Skill::posture(CALIBRATION));

    for pace in [Pace::Slow, Pace::Medium, Pace::Fast] {
        for direction in [
            Direction::Forward,
            Direction::Backward,
            Direction::Left,
            Direction::Right,
        ] {
            let selector = Move::new(pace, direction);
            book.insert(SkillKey::Move(selector), gait(selector)?);
        }
    }
    Ok(book)
}

/// Trot cycle: diagonal leg pairs swing in anti-phase.
fn gait(selector: Move) -> Result<Skill, PawError> {
    let (frames, stride) = match selector.pace {
        Pace::Slow => (24usize, 12.0f32),
        Pace::Medium => (16, 16.0),
        Pace::Fast => (12, 20.0),
    };
    // per-leg stride scale: turning shortens the inner side
    let (left, right) = match selector.direction {
        Direction::Forward => (1.0, 1.0),
        Direction::Backward => (-1.0, -1.0),
        Direction::Left => (0.4, 1.0),
        Direction::Right => (1.0, 0.4),
    };
    let side = [left, right, right, left];
    let phase = [0.0, PI, 0.0, PI];

    let cycle: Vec<GaitFrame> = (0..frames)
        .map(|i| {
            let t = 2.0 * PI * i as f32 / frames as f32;
            let mut frame = [0i8; WALKING_DOF];
            for leg in 0..4 {
                let swing = (t + phase[leg]).sin();
                let lift = (t + phase[leg]).cos().max(0.0);
                frame[leg] = (30.0 + stride * side[leg] * swing).round() as i8;
                frame[leg + 4] = (30.0 + 25.0 * lift).round() as i8;
            }
            frame
        })
        .collect();
    Skill::gait(&cycle)
}

fn frame(angles: JointAngles, speed: u8, delay: u8) -> BehaviourFrame {
    BehaviourFrame {
        angles,
        speed,
        delay,
        trigger: None,
    }
}

/// Sit, then wave the right front paw three times.
fn greet() -> Result<Skill, PawError> {
    let paw_up = pose([0, -20], [10, -60, 75, 75], [40, 40, -30, -30]);
    let paw_out = pose([0, -20], [10, -70, 75, 75], [40, -10, -30, -30]);
    Skill::behaviour(
        &[
            frame(SIT, 8, 2),
            frame(paw_up, 12, 2),
            frame(paw_out, 16, 1),
            frame(paw_up, 16, 1),
            frame(SIT, 8, 2),
        ],
        LoopSpan {
            first: 2,
            last: 3,
            count: 3,
        },
    )
}

/// Fold the legs, push off with the upper side, and stand.
fn recover() -> Result<Skill, PawError> {
    let tuck = pose([0, 0], [90, 90, 90, 90], [-70, -70, -70, -70]);
    let push = pose([0, 0], [-40, 90, 90, -40], [60, -70, -70, 60]);
    Skill::behaviour(
        &[
            frame(tuck, 8, 4),
            frame(push, 20, 6),
            frame(tuck, 12, 4),
            frame(BALANCE, 8, 2),
        ],
        LoopSpan::default(),
    )
}
