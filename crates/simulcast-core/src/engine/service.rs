//! SimulcastService - the engine's timeline thread
//!
//! Owns the [`Simulcast`] engine and the [`FetchWorker`]. The loop selects on
//! commands, fetch outcomes and the engine's next deadline, then polls the
//! engine and forwards whatever it produced: fetch requests to the worker,
//! events to the bus.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Sender};

use super::messages::{ServiceHandle, SimulcastCommand, SimulcastEvent, SimulcastStats};
use super::simulcast::Simulcast;
use crate::fetch::FetchWorker;
use crate::schedule::PlaybackSink;

/// Upper bound on how long the loop sleeps without re-polling
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

const SERVICE_NAME: &str = "SimulcastService";

pub struct SimulcastService {
    engine: Simulcast,
    worker: FetchWorker,
    command_rx: Receiver<SimulcastCommand>,
    event_tx: Sender<SimulcastEvent>,
}

impl SimulcastService {
    /// Spawn the service thread; the engine starts ticking immediately
    pub fn spawn(
        engine: Simulcast,
        worker: FetchWorker,
        event_tx: Sender<SimulcastEvent>,
    ) -> Result<ServiceHandle<SimulcastCommand>, String> {
        let (command_tx, command_rx) = crossbeam::channel::unbounded();

        let service = SimulcastService {
            engine,
            worker,
            command_rx,
            event_tx,
        };

        let handle = thread::Builder::new()
            .name("simulcast-service".into())
            .spawn(move || service.run())
            .map_err(|e| format!("Failed to spawn simulcast service thread: {}", e))?;

        Ok(ServiceHandle {
            command_tx,
            thread_handle: Some(handle),
        })
    }

    fn run(mut self) {
        log::info!("SimulcastService started");
        let _ = self.event_tx.send(SimulcastEvent::ServiceStarted {
            service_name: SERVICE_NAME.to_string(),
        });
        self.engine.start(Instant::now());
        self.pump(Instant::now());

        let command_rx = self.command_rx.clone();
        let outcome_rx = self.worker.outcomes().clone();

        loop {
            let now = Instant::now();
            let timeout = self
                .engine
                .next_deadline(now)
                .map(|at| at.saturating_duration_since(now))
                .unwrap_or(FRAME_INTERVAL)
                .min(FRAME_INTERVAL);

            crossbeam::select! {
                recv(command_rx) -> cmd => {
                    match cmd {
                        Ok(SimulcastCommand::Shutdown) => {
                            log::info!("SimulcastService shutting down");
                            break;
                        }
                        Ok(cmd) => self.handle_command(cmd),
                        Err(_) => {
                            log::info!("Command channel closed, shutting down");
                            break;
                        }
                    }
                }
                recv(outcome_rx) -> outcome => {
                    match outcome {
                        Ok(outcome) => self.engine.receive_fetch(outcome, Instant::now()),
                        Err(_) => log::warn!("Fetch worker is gone"),
                    }
                }
                default(timeout) => {}
            }

            self.pump(Instant::now());
        }

        self.engine.shutdown();
        self.publish_events();
        self.worker.shutdown();

        let _ = self.event_tx.send(SimulcastEvent::ServiceStopped {
            service_name: SERVICE_NAME.to_string(),
        });

        log::info!("SimulcastService stopped");
    }

    /// Poll the engine and forward what it produced
    fn pump(&mut self, now: Instant) {
        self.engine.poll(now);

        if let Some(request) = self.engine.take_fetch_request() {
            if let Err(e) = self.worker.request(request) {
                log::error!("Could not queue fetch: {}", e);
            }
        }

        self.publish_events();
    }

    fn publish_events(&mut self) {
        for event in self.engine.drain_events() {
            if self.event_tx.try_send(event).is_err() {
                log::trace!("Event bus full, dropping event");
            }
        }
    }

    fn handle_command(&mut self, cmd: SimulcastCommand) {
        match cmd {
            SimulcastCommand::SetAudioEnabled(enabled) => self.engine.set_audio_enabled(enabled),
            SimulcastCommand::AttachAudio(sink) => self.engine.attach_sink(sink),
            SimulcastCommand::SetOnline(online) => self.engine.set_online(online, Instant::now()),
            SimulcastCommand::GetStats { reply } => {
                let _ = reply.send(self.engine.stats());
            }
            SimulcastCommand::Shutdown => {}
        }
    }
}

/// Client for talking to a running [`SimulcastService`]
#[derive(Clone)]
pub struct SimulcastClient {
    command_tx: Sender<SimulcastCommand>,
}

impl SimulcastClient {
    pub fn new(handle: &ServiceHandle<SimulcastCommand>) -> Self {
        Self {
            command_tx: handle.command_tx.clone(),
        }
    }

    pub fn set_audio_enabled(&self, enabled: bool) -> Result<(), String> {
        self.send(SimulcastCommand::SetAudioEnabled(enabled))
    }

    pub fn attach_audio(&self, sink: Box<dyn PlaybackSink>) -> Result<(), String> {
        self.send(SimulcastCommand::AttachAudio(sink))
    }

    pub fn set_online(&self, online: bool) -> Result<(), String> {
        self.send(SimulcastCommand::SetOnline(online))
    }

    /// Get a stats snapshot (blocking)
    pub fn get_stats(&self) -> Result<SimulcastStats, String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send(SimulcastCommand::GetStats { reply: tx })?;
        rx.blocking_recv().map_err(|e| e.to_string())
    }

    pub fn shutdown(&self) -> Result<(), String> {
        self.send(SimulcastCommand::Shutdown)
    }

    fn send(&self, cmd: SimulcastCommand) -> Result<(), String> {
        self.command_tx.send(cmd).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetCache;
    use crate::engine::{EngineMode, EngineSettings, EventBus};
    use crate::fetch::{FetchRequest, FetchResponse, FetchResult, SleepWindow, TurnSource};
    use crate::turn::{Turn, TurnBatch};

    /// Endpoint stand-in that always returns the same batch
    struct FixedSource {
        turns: Vec<Turn>,
        sleep_secs: Option<f64>,
    }

    impl TurnSource for FixedSource {
        fn fetch_next_batch(&mut self, _request: &FetchRequest) -> FetchResult<FetchResponse> {
            Ok(FetchResponse {
                batch: TurnBatch {
                    diagnostics: vec![Some(7); self.turns.len()],
                    turns: self.turns.clone(),
                    initial_rotation: [1, 1, 1, 1],
                },
                initial_rotation_test: [0; 4],
                seconds_til_wake: self.sleep_secs,
            })
        }
    }

    fn spawn(source: FixedSource, bus: &EventBus) -> ServiceHandle<SimulcastCommand> {
        let engine = Simulcast::new(EngineSettings::default(), AssetCache::preloaded(&[]));
        let worker = FetchWorker::spawn(Box::new(source)).unwrap();
        SimulcastService::spawn(engine, worker, bus.sender()).unwrap()
    }

    fn wait_for<F: Fn(&SimulcastStats) -> bool>(client: &SimulcastClient, check: F) -> SimulcastStats {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let stats = client.get_stats().unwrap();
            if check(&stats) || Instant::now() > deadline {
                return stats;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_service_presents_first_batch() {
        let bus = EventBus::default();
        let mut handle = spawn(
            FixedSource {
                turns: vec![Turn::Reset { rotations: [0; 4] }, Turn::Reset { rotations: [0; 4] }],
                sleep_secs: None,
            },
            &bus,
        );
        let client = SimulcastClient::new(&handle);

        let stats = wait_for(&client, |s| s.current.is_some());
        assert_eq!(stats.current, Some(Turn::initial([1, 1, 1, 1])));
        assert_eq!(stats.diagnostic, Some(7));
        assert_eq!(stats.mode, EngineMode::Running);

        client.shutdown().unwrap();
        handle.join();

        let events: Vec<SimulcastEvent> = bus.subscribe().try_iter().collect();
        assert!(matches!(events.first(), Some(SimulcastEvent::ServiceStarted { .. })));
        assert!(matches!(events.last(), Some(SimulcastEvent::ServiceStopped { .. })));
        assert!(events.iter().any(|e| matches!(e, SimulcastEvent::Tick { .. })));
    }

    #[test]
    fn test_service_sleeps_on_request() {
        let bus = EventBus::default();
        let mut handle = spawn(
            FixedSource {
                turns: Vec::new(),
                sleep_secs: Some(3600.0),
            },
            &bus,
        );
        let client = SimulcastClient::new(&handle);

        let stats = wait_for(&client, |s| s.mode == EngineMode::Asleep);
        assert_eq!(stats.mode, EngineMode::Asleep);

        client.set_online(false).unwrap();
        let stats = wait_for(&client, |s| s.mode == EngineMode::Offline);
        assert_eq!(stats.mode, EngineMode::Offline);

        client.shutdown().unwrap();
        handle.join();
        assert!(!handle.is_running());
    }
}
