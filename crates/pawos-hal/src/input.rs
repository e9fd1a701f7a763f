//! Command decoders feeding the input duty.
//!
//! The infrared and serial front ends turn raw bytes into a [`Command`]. The
//! control loop polls each registered source once per input tick; a source
//! with nothing new returns [`Command::None`].

use std::sync::mpsc::{Receiver, TryRecvError};

use pawos_types::Command;
use tracing::debug;

/// A non-blocking command decoder.
pub trait CommandSource {
    /// Short label used in log fields, e.g. `"infrared"` or `"serial"`.
    fn name(&self) -> &str;

    /// Return the next decoded command, or [`Command::None`].
    fn poll(&mut self) -> Command;
}

/// Drains commands pushed from another thread (stdin reader, socket, …).
pub struct ChannelSource {
    name: String,
    rx: Receiver<Command>,
    disconnected: bool,
}

impl ChannelSource {
    pub fn new(name: impl Into<String>, rx: Receiver<Command>) -> Self {
        Self {
            name: name.into(),
            rx,
            disconnected: false,
        }
    }
}

impl CommandSource for ChannelSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> Command {
        match self.rx.try_recv() {
            Ok(cmd) => cmd,
            Err(TryRecvError::Empty) => Command::None,
            Err(TryRecvError::Disconnected) => {
                if !self.disconnected {
                    debug!(source = %self.name, "command channel closed");
                    self.disconnected = true;
                }
                Command::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawos_types::SimpleCommand;
    use std::sync::mpsc;

    #[test]
    fn channel_source_yields_pushed_commands_in_order() {
        let (tx, rx) = mpsc::channel();
        let mut source = ChannelSource::new("serial", rx);
        assert_eq!(source.name(), "serial");
        assert!(source.poll().is_none());

        tx.send(Command::from(SimpleCommand::Sit)).unwrap();
        tx.send(Command::from(SimpleCommand::Rest)).unwrap();
        assert_eq!(source.poll(), SimpleCommand::Sit);
        assert_eq!(source.poll(), SimpleCommand::Rest);
        assert!(source.poll().is_none());
    }

    #[test]
    fn closed_channel_reads_as_none() {
        let (tx, rx) = mpsc::channel::<Command>();
        drop(tx);
        let mut source = ChannelSource::new("serial", rx);
        assert!(source.poll().is_none());
        assert!(source.poll().is_none());
    }
}
