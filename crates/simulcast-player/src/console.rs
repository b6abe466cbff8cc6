//! Terminal front-end: stdin commands in, engine events out

use std::io::BufRead;
use std::thread;

use crossbeam::channel::{Receiver, Sender};

use simulcast_core::display::{format_countdown, render_disks, StatsSnapshot};
use simulcast_core::engine::{EngineMode, SimulcastClient, SimulcastEvent};

/// A keyboard command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    ToggleAudio,
    ToggleStats,
    GoOffline,
    GoOnline,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "a" => Some(ConsoleCommand::ToggleAudio),
            "s" => Some(ConsoleCommand::ToggleStats),
            "o" => Some(ConsoleCommand::GoOffline),
            "n" => Some(ConsoleCommand::GoOnline),
            "q" => Some(ConsoleCommand::Quit),
            _ => None,
        }
    }
}

pub const HELP: &str = "commands: [a] audio on/off  [s] stats  [o] offline  [n] online  [q] quit";

/// Read stdin lines on a background thread
///
/// The receiver disconnects at end of input.
pub fn spawn_stdin_reader() -> std::io::Result<Receiver<ConsoleCommand>> {
    let (tx, rx) = crossbeam::channel::unbounded();
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || read_commands(std::io::stdin().lock(), tx))?;
    Ok(rx)
}

fn read_commands(input: impl BufRead, tx: Sender<ConsoleCommand>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        match ConsoleCommand::parse(&line) {
            Some(cmd) => {
                if tx.send(cmd).is_err() {
                    break;
                }
            }
            None if line.trim().is_empty() => {}
            None => println!("{}", HELP),
        }
    }
    log::debug!("stdin closed");
}

/// Prints engine events
pub struct Console {
    show_stats: bool,
    mode: Option<EngineMode>,
}

impl Console {
    pub fn new(show_stats: bool) -> Self {
        Self {
            show_stats,
            mode: None,
        }
    }

    pub fn toggle_stats(&mut self) -> bool {
        self.show_stats = !self.show_stats;
        self.show_stats
    }

    pub fn handle_event(&mut self, event: &SimulcastEvent, client: &SimulcastClient) {
        match event {
            SimulcastEvent::ServiceStarted { service_name } => {
                log::debug!("{} started", service_name);
            }
            SimulcastEvent::ServiceStopped { service_name } => {
                log::debug!("{} stopped", service_name);
            }
            SimulcastEvent::ModeChanged(mode) => {
                if self.mode != Some(*mode) {
                    self.mode = Some(*mode);
                    println!("== {} ==", mode.to_string().to_uppercase());
                }
            }
            SimulcastEvent::Tick { current, .. } => {
                if let Some(turn) = current {
                    println!("turn {}", turn);
                }
                if self.show_stats {
                    match client.get_stats() {
                        Ok(stats) => println!("{}", StatsSnapshot::from(&stats).render()),
                        Err(e) => log::warn!("Stats unavailable: {}", e),
                    }
                }
            }
            SimulcastEvent::Rotations(disks) => println!("{}", render_disks(disks)),
            SimulcastEvent::Countdown { secs_remaining } => {
                println!("asleep, waking in {}", format_countdown(*secs_remaining));
            }
            SimulcastEvent::AudioEnabled(on) => {
                println!("audio {}", if *on { "on" } else { "off" });
            }
            SimulcastEvent::FetchFailed { message } => {
                println!("fetch failed: {}", message);
            }
        }
    }
}
