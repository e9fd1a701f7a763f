//! Serial-style text token decoder.
//!
//! One line of input is one command:
//!
//! | Token | Command |
//! |---|---|
//! | `d` | rest |
//! | `k<skill>` | posture or behaviour (`kbalance`, `ksit`, `kstretch`, `khi`, `krc`) |
//! | `wk[pace]<dir>` | gait; pace `s`/`m`/`f` (default `m`), direction `F`/`B`/`L`/`R` |
//! | `p` | pause / resume |
//! | `g` | toggle gyro checking |
//! | `s` / `a` | save / abort servo calibration |
//! | `j` | show joint angles |
//! | `c [joint offset]` | calibrate |
//! | `m joint angle ...` | move joints one after another |
//! | `i a0 .. a15` | move every joint at once |
//! | `u [repeat increment]` | meow |
//! | `b [note duration]` | beep |

use pawos_types::{ArgCommand, ArgOp, Command, Direction, Move, Pace, SimpleCommand};

/// Decode one input line. Blank lines decode to [`Command::None`].
pub fn decode(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::None);
    };
    let rest: Vec<&str> = words.collect();

    let simple = |cmd: SimpleCommand| -> Result<Command, String> {
        if rest.is_empty() {
            Ok(Command::Simple(cmd))
        } else {
            Err(format!("'{head}' takes no arguments"))
        }
    };

    match head {
        "d" => simple(SimpleCommand::Rest),
        "p" => simple(SimpleCommand::Pause),
        "g" => simple(SimpleCommand::GyroToggle),
        "s" => simple(SimpleCommand::SaveServoCalibration),
        "a" => simple(SimpleCommand::AbortServoCalibration),
        "j" => simple(SimpleCommand::ShowJointAngles),
        "c" => with_args(ArgOp::Calibrate, &rest),
        "m" => with_args(ArgOp::MoveSequentially, &rest),
        "i" => with_args(ArgOp::MoveSimultaneously, &rest),
        "u" => with_args(ArgOp::Meow, &rest),
        "b" => with_args(ArgOp::Beep, &rest),
        _ => {
            if let Some(gait) = head.strip_prefix("wk") {
                return parse_move(gait).map(Command::Move);
            }
            if let Some(skill) = head.strip_prefix('k') {
                let cmd = match skill {
                    "balance" | "up" => SimpleCommand::Balance,
                    "sit" => SimpleCommand::Sit,
                    "stretch" | "str" => SimpleCommand::Stretch,
                    "hi" | "greet" => SimpleCommand::Greet,
                    "rc" | "recover" => SimpleCommand::Recover,
                    _ => return Err(format!("unknown skill '{skill}'")),
                };
                return simple(cmd);
            }
            Err(format!("unknown token '{head}'"))
        }
    }
}

fn with_args(op: ArgOp, words: &[&str]) -> Result<Command, String> {
    let values = words
        .iter()
        .map(|w| w.parse::<i16>().map_err(|_| format!("'{w}' is not a number")))
        .collect::<Result<Vec<_>, _>>()?;
    ArgCommand::new(op, &values)
        .map(Command::WithArgs)
        .map_err(|e| e.to_string())
}

fn parse_move(token: &str) -> Result<Move, String> {
    let mut chars = token.chars();
    let (pace, dir) = match (chars.next(), chars.next(), chars.next()) {
        (Some(dir), None, None) => (Pace::Medium, dir),
        (Some(pace), Some(dir), None) => {
            let pace = match pace.to_ascii_lowercase() {
                's' => Pace::Slow,
                'm' => Pace::Medium,
                'f' => Pace::Fast,
                other => return Err(format!("unknown pace '{other}'")),
            };
            (pace, dir)
        }
        _ => return Err(format!("expected wk[pace]<direction>, got 'wk{token}'")),
    };
    let direction = match dir.to_ascii_uppercase() {
        'F' => Direction::Forward,
        'B' => Direction::Backward,
        'L' => Direction::Left,
        'R' => Direction::Right,
        other => return Err(format!("unknown direction '{other}'")),
    };
    Ok(Move::new(pace, direction))
}
