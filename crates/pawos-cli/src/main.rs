//! `pawos` – host runner for the PawOS control core.
//!
//! This binary:
//!
//! 1. Loads `~/.pawos/config.toml` (defaults when absent) plus `PAWOS_*`
//!    environment overrides. `pawos --write-config` writes the defaults out.
//! 2. Builds a simulated rig with the built-in skill book and the servo
//!    offsets from the calibration file.
//! 3. Reads serial-style tokens from stdin on a helper thread and feeds them
//!    to the control loop's input duty.
//! 4. Intercepts **Ctrl-C** to stop the loop and release every servo.

mod config;
mod decoder;
mod host;
mod skills;

use colored::Colorize;
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::{error, info, warn};

use pawos_hal::sim::SimRig;
use pawos_hal::{ChannelSource, TomlCalibrationStore};
use pawos_runtime::{ControlLoop, init_tracing};
use pawos_types::Command;

use host::{Line, PacedClock, SimConsole};

fn main() -> ExitCode {
    init_tracing();

    if std::env::args().skip(1).any(|arg| arg == "--write-config") {
        return match config::save(&config::Config::default()) {
            Ok(path) => {
                println!("  Default config written to {}", path.display().to_string().bold());
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("{}: {}", "Error saving config".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    print_banner();

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let book = match skills::builtin() {
        Ok(book) => book,
        Err(e) => {
            error!(error = %e, "failed to build the skill book");
            return ExitCode::FAILURE;
        }
    };

    // ── Rig ───────────────────────────────────────────────────────────────
    let (mut rig, probe) = SimRig::new().build();
    if cfg.realtime {
        rig.clock = Box::new(PacedClock::new(probe.clock.clone()));
    }
    let calibration_path = cfg.calibration_path();
    rig.calibration = Box::new(TomlCalibrationStore::new(&calibration_path));
    if let Err(e) = rig.reload_calibration() {
        warn!(error = %e, path = %calibration_path.display(), "using zero servo offsets");
    }

    // ── Console input ─────────────────────────────────────────────────────
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (tilt_tx, tilt_rx) = mpsc::channel();
    spawn_stdin_reader(cmd_tx, tilt_tx);
    let console = SimConsole::new(ChannelSource::new("console", cmd_rx), tilt_rx, probe.imu.clone());

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the control loop …".yellow().bold());
        stop_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let mut control = match ControlLoop::new(&cfg.control, rig, Box::new(book), vec![Box::new(console)]) {
        Ok(control) => control,
        Err(e) => {
            error!(error = %e, "failed to start the control loop");
            return ExitCode::FAILURE;
        }
    };

    println!("  Type {} for the token list, Ctrl-C to stop.", "!help".bold());
    let result = control.run(&stop);
    control.rig_mut().servos.shut_all();

    match result {
        Ok(()) => {
            println!("{}", "  ✓ Servos released. Bye.".green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "control loop failed");
            ExitCode::FAILURE
        }
    }
}

/// Read stdin line by line, forwarding robot commands and tilt directives.
fn spawn_stdin_reader(commands: Sender<Command>, tilts: Sender<(f32, f32)>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let sent = match host::parse_line(&line) {
                Ok(Line::Command(Command::None)) => Ok(()),
                Ok(Line::Command(cmd)) => commands.send(cmd).map_err(|_| ()),
                Ok(Line::Tilt { roll, pitch }) => tilts.send((roll, pitch)).map_err(|_| ()),
                Ok(Line::Help) => {
                    println!("{}", host::HELP);
                    Ok(())
                }
                Err(e) => {
                    println!("{}: {}", "Input error".red(), e);
                    Ok(())
                }
            };
            if sent.is_err() {
                break;
            }
        }
        info!("console input closed");
    });
}

fn print_banner() {
    println!();
    println!("{}", r#"    ___                 ____  _____"#.bold().cyan());
    println!("{}", r#"   / _ \___ __    __   / __ \/ ___/"#.bold().cyan());
    println!("{}", r#"  / ___/ _ `/ |/|/ /  / /_/ /\__ \ "#.bold().cyan());
    println!("{}", r#" /_/   \_,_/|__,__/   \____/____/  "#.bold().cyan());
    println!();
    println!("  {} {}", "PawOS".bold(), env!("CARGO_PKG_VERSION").dimmed());
    println!("  Legged robot motion core (simulated rig)");
    println!();
}
