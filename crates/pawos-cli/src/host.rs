//! Host-side glue between the terminal and the simulated rig.

use std::sync::mpsc::Receiver;

use pawos_hal::sim::{SimClock, SimImu};
use pawos_hal::{ChannelSource, Clock, CommandSource, SystemClock};
use pawos_types::Command;
use tracing::info;

use crate::decoder;

pub const HELP: &str = "\
  d                 rest
  kbalance ksit kstretch khi krc
                    postures and behaviours
  wk[s|m|f]<F|B|L|R>
                    walk (pace, direction)
  p                 pause / resume
  g                 toggle gyro checking
  c [joint offset]  calibrate (offset >= 1001 or <= -1001 is relative)
  s / a             save / abort calibration
  j                 show joint angles
  m j a [j a ...]   move joints one by one
  i a0 .. a15       move all joints at once
  u [repeat inc]    meow
  b [note dur]      beep
  !tilt roll pitch  tilt the simulated body (degrees)
  !help             this list";

/// One line typed at the console.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Command(Command),
    Tilt { roll: f32, pitch: f32 },
    Help,
}

/// Split simulator directives (`!...`) from robot command tokens.
pub fn parse_line(line: &str) -> Result<Line, String> {
    let line = line.trim();
    let Some(directive) = line.strip_prefix('!') else {
        return decoder::decode(line).map(Line::Command);
    };
    let words: Vec<&str> = directive.split_whitespace().collect();
    match words.as_slice() {
        ["help"] => Ok(Line::Help),
        ["tilt", roll, pitch] => {
            let parse = |w: &str| w.parse::<f32>().map_err(|_| format!("'{w}' is not an angle"));
            Ok(Line::Tilt {
                roll: parse(roll)?,
                pitch: parse(pitch)?,
            })
        }
        _ => Err(format!("unknown directive '!{directive}'")),
    }
}

/// Console command source that also applies queued tilt directives to the
/// simulated IMU before handing out the next command.
pub struct SimConsole {
    commands: ChannelSource,
    tilts: Receiver<(f32, f32)>,
    imu: SimImu,
}

impl SimConsole {
    pub fn new(commands: ChannelSource, tilts: Receiver<(f32, f32)>, imu: SimImu) -> Self {
        Self {
            commands,
            tilts,
            imu,
        }
    }
}

impl CommandSource for SimConsole {
    fn name(&self) -> &str {
        self.commands.name()
    }

    fn poll(&mut self) -> Command {
        while let Ok((roll, pitch)) = self.tilts.try_recv() {
            info!(roll, pitch, "simulated tilt");
            self.imu.set_tilt_deg(roll, pitch);
        }
        self.commands.poll()
    }
}

/// Simulated clock that also sleeps in wall time, so the loop runs at the
/// configured rates.
pub struct PacedClock {
    sim: SimClock,
    wall: SystemClock,
}

impl PacedClock {
    pub fn new(sim: SimClock) -> Self {
        Self {
            sim,
            wall: SystemClock::new(),
        }
    }
}

impl Clock for PacedClock {
    fn now_us(&self) -> u64 {
        self.sim.now()
    }

    fn sleep_us(&mut self, us: u64) {
        self.wall.sleep_us(us);
        self.sim.sleep_us(us);
    }
}
