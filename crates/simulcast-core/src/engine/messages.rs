//! Message types for the simulcast service
//!
//! Commands flow into the service thread over a crossbeam channel; events
//! flow out on an [`EventBus`]. Queries that need an answer carry a tokio
//! oneshot sender and are awaited with `blocking_recv` on the caller side.

use tokio::sync::oneshot;

use crate::assets::CacheStats;
use crate::rotation::DiskView;
use crate::schedule::{PlaybackSink, SchedulerStats};
use crate::turn::{SequencerStats, Turn};
use crate::types::NUM_DISKS;

/// What the display is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Advancing turns on the tick
    Running,
    /// The endpoint reported off-hours; ticking is suspended until wake
    Asleep,
    /// The sleep sentinel became current; waiting for a fresh batch
    Idle,
    /// Connectivity lost; playback and rotation are suppressed
    Offline,
}

impl std::fmt::Display for EngineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineMode::Running => write!(f, "running"),
            EngineMode::Asleep => write!(f, "asleep"),
            EngineMode::Idle => write!(f, "idle"),
            EngineMode::Offline => write!(f, "offline"),
        }
    }
}

/// Point-in-time view of the engine, for the stats panel
#[derive(Debug, Clone)]
pub struct SimulcastStats {
    pub mode: EngineMode,
    pub current: Option<Turn>,
    pub next: Option<Turn>,
    pub diagnostic: Option<i64>,
    /// Buffered turns, head first
    pub upcoming: Vec<Turn>,
    /// Buffered diagnostic values, paired with `upcoming`
    pub upcoming_diagnostics: Vec<Option<i64>>,
    pub disks: [DiskView; NUM_DISKS],
    pub audio_enabled: bool,
    pub audio_attached: bool,
    pub sequencer: SequencerStats,
    pub scheduler: SchedulerStats,
    pub cache: CacheStats,
}

/// Commands sent to the simulcast service
pub enum SimulcastCommand {
    /// Toggle the output; the first enable also unlocks playback
    SetAudioEnabled(bool),
    /// Hand the service an audio output to schedule into
    AttachAudio(Box<dyn PlaybackSink>),
    /// Connectivity change
    SetOnline(bool),
    GetStats {
        reply: oneshot::Sender<SimulcastStats>,
    },
    Shutdown,
}

impl std::fmt::Debug for SimulcastCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulcastCommand::SetAudioEnabled(on) => write!(f, "SetAudioEnabled({})", on),
            SimulcastCommand::AttachAudio(_) => write!(f, "AttachAudio"),
            SimulcastCommand::SetOnline(on) => write!(f, "SetOnline({})", on),
            SimulcastCommand::GetStats { .. } => write!(f, "GetStats"),
            SimulcastCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Events published by the simulcast service
#[derive(Debug, Clone)]
pub enum SimulcastEvent {
    ServiceStarted { service_name: String },
    ServiceStopped { service_name: String },
    /// One tick of the driver
    Tick {
        ticker: bool,
        current: Option<Turn>,
        diagnostic: Option<i64>,
    },
    ModeChanged(EngineMode),
    /// Disk angles changed
    Rotations([DiskView; NUM_DISKS]),
    /// Whole seconds until wake, published once per second while asleep
    Countdown { secs_remaining: u64 },
    AudioEnabled(bool),
    FetchFailed { message: String },
}

/// Handle to a running service
pub struct ServiceHandle<Cmd> {
    /// Channel for sending commands to the service
    pub command_tx: crossbeam::channel::Sender<Cmd>,
    /// Thread handle for the service
    pub thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl<Cmd> ServiceHandle<Cmd> {
    /// Send a command to the service
    pub fn send(&self, cmd: Cmd) -> Result<(), crossbeam::channel::SendError<Cmd>> {
        self.command_tx.send(cmd)
    }

    /// Check if the service is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Wait for the service thread to exit
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Service thread panicked");
            }
        }
    }
}

/// Bounded channel the service publishes [`SimulcastEvent`]s on
pub struct EventBus {
    sender: crossbeam::channel::Sender<SimulcastEvent>,
    receiver: crossbeam::channel::Receiver<SimulcastEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam::channel::bounded(capacity);
        Self { sender, receiver }
    }

    pub fn sender(&self) -> crossbeam::channel::Sender<SimulcastEvent> {
        self.sender.clone()
    }

    pub fn subscribe(&self) -> crossbeam::channel::Receiver<SimulcastEvent> {
        self.receiver.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus() {
        let bus = EventBus::new(16);
        let rx = bus.subscribe();

        bus.sender()
            .send(SimulcastEvent::ModeChanged(EngineMode::Idle))
            .unwrap();

        match rx.recv().unwrap() {
            SimulcastEvent::ModeChanged(mode) => assert_eq!(mode, EngineMode::Idle),
            other => panic!("Wrong event type: {:?}", other),
        }
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(EngineMode::Asleep.to_string(), "asleep");
        assert_eq!(EngineMode::Offline.to_string(), "offline");
    }
}
