//! Audible feedback.

use serde::{Deserialize, Serialize};

/// Note used for the acknowledgement chirp after every command.
pub const ACK_NOTE: i8 = 8;

/// One buzzer pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cue {
    /// `repeat` tones of `note` lasting `duration_ms`, separated by `pause_ms`.
    Beep {
        note: i8,
        duration_ms: u16,
        pause_ms: u16,
        repeat: u8,
    },
    /// Rising chirp; each of the `repeat` tones is `increment` notes higher.
    Meow { repeat: u8, increment: u8 },
}

impl Cue {
    pub const fn beep(note: i8, duration_ms: u16) -> Self {
        Cue::Beep {
            note,
            duration_ms,
            pause_ms: 0,
            repeat: 1,
        }
    }

    /// Short chirp acknowledging a received command.
    pub const fn ack() -> Self {
        Self::beep(ACK_NOTE, 5)
    }

    /// Triple warning tone played while the battery is low.
    pub const fn low_battery() -> Self {
        Cue::Beep {
            note: 15,
            duration_ms: 50,
            pause_ms: 50,
            repeat: 3,
        }
    }

    pub const fn meow(repeat: u8, increment: u8) -> Self {
        Cue::Meow { repeat, increment }
    }
}

pub trait Buzzer {
    /// Play `cue`; may block for the cue's duration.
    fn play(&mut self, cue: Cue);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_battery_cue_repeats_three_times() {
        assert_eq!(
            Cue::low_battery(),
            Cue::Beep {
                note: 15,
                duration_ms: 50,
                pause_ms: 50,
                repeat: 3
            }
        );
    }

    #[test]
    fn ack_uses_ack_note() {
        match Cue::ack() {
            Cue::Beep { note, repeat, .. } => {
                assert_eq!(note, ACK_NOTE);
                assert_eq!(repeat, 1);
            }
            other => panic!("unexpected cue {other:?}"),
        }
    }
}
