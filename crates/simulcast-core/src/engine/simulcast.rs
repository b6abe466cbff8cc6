//! The simulcast state machine
//!
//! `Simulcast` wires the sequencer, tick driver, scheduler, cache and disks
//! together. It never reads the wall clock and never blocks: every entry point
//! takes `now`, fetch results are handed in, and fetch requests and events are
//! collected in outboxes for the caller to drain. The service thread drives
//! it in production; tests drive it directly.

use std::time::{Duration, Instant};

use super::messages::{EngineMode, SimulcastEvent, SimulcastStats};
use super::tick::{TickDriver, TickFire};
use crate::assets::AssetCache;
use crate::fetch::{FetchOutcome, FetchRequest, FetchResponse, SleepWindow};
use crate::rotation::{DiskView, Disks};
use crate::schedule::{unique_files, PlaybackScheduler, PlaybackSink};
use crate::turn::{AdvanceOutcome, Sequencer, Turn};
use crate::types::{
    CHUNK_SIZE, NUM_DISKS, OUTPUT_GAIN_ON, SETTLE_DELAY_MS, TURN_DELAY_MS, TURN_INTERVAL_SECS,
    VOICE_LIFETIME_MS,
};

/// Timing and request parameters of the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub turn_interval: Duration,
    pub chunk_size: u32,
    pub turn_delay_ms: u32,
    pub settle_delay_ms: u32,
    pub voice_lifetime: Duration,
    /// Master gain applied while audio is enabled
    pub output_gain: f32,
    pub sleep: SleepWindow,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            turn_interval: Duration::from_secs_f64(TURN_INTERVAL_SECS),
            chunk_size: CHUNK_SIZE,
            turn_delay_ms: TURN_DELAY_MS,
            settle_delay_ms: SETTLE_DELAY_MS,
            voice_lifetime: Duration::from_millis(VOICE_LIFETIME_MS as u64),
            output_gain: OUTPUT_GAIN_ON,
            sleep: SleepWindow::default(),
        }
    }
}

/// Longest sleep the engine honours; longer wake times are clamped
pub const MAX_SLEEP: Duration = Duration::from_secs(24 * 60 * 60);

fn sleep_duration(secs: f64) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => duration.min(MAX_SLEEP),
        Err(e) => {
            log::warn!("Wake time {}s out of range ({}), clamping to {:?}", secs, e, MAX_SLEEP);
            MAX_SLEEP
        }
    }
}

pub struct Simulcast {
    settings: EngineSettings,
    sequencer: Sequencer,
    ticks: TickDriver,
    scheduler: PlaybackScheduler,
    cache: AssetCache,
    disks: Disks,
    sink: Option<Box<dyn PlaybackSink>>,
    mode: EngineMode,
    audio_enabled: bool,
    wake_at: Option<Instant>,
    last_countdown: Option<u64>,
    /// Single-slot pending fetch outcome, consumed at the next tick
    pending: Option<FetchOutcome>,
    fetch_request: Option<FetchRequest>,
    events: Vec<SimulcastEvent>,
}

impl Simulcast {
    pub fn new(settings: EngineSettings, cache: AssetCache) -> Self {
        Self {
            ticks: TickDriver::new(settings.turn_interval, settings.chunk_size),
            scheduler: PlaybackScheduler::new(settings.turn_delay_ms, settings.voice_lifetime),
            disks: Disks::new(
                Duration::from_millis(settings.turn_delay_ms as u64),
                Duration::from_millis(settings.settle_delay_ms as u64),
            ),
            settings,
            sequencer: Sequencer::new(),
            cache,
            sink: None,
            mode: EngineMode::Running,
            audio_enabled: false,
            wake_at: None,
            last_countdown: None,
            pending: None,
            fetch_request: None,
            events: Vec::new(),
        }
    }

    /// Start ticking; the first tick fires on the next poll
    pub fn start(&mut self, now: Instant) {
        log::info!(
            "Simulcast starting: {:?} per turn, fetch every {} turns",
            self.settings.turn_interval,
            self.settings.chunk_size
        );
        self.ticks.activate(now);
        self.set_mode(EngineMode::Running);
    }

    /// Run everything that is due at `now`
    pub fn poll(&mut self, now: Instant) {
        if self.mode == EngineMode::Asleep && self.wake_at.is_some_and(|at| now >= at) {
            log::info!("Wake time reached, resynchronizing");
            self.wake_at = None;
            self.last_countdown = None;
            self.ticks.activate(now);
            self.set_mode(EngineMode::Running);
        }

        // Spins due before a late tick land first, or the tick's turn would replace them
        if self.disks.update(now) {
            self.events.push(SimulcastEvent::Rotations(self.disks.views()));
        }

        if let Some(fire) = self.ticks.poll(now) {
            self.on_tick(fire, now);
        }

        self.scheduler.release_due(now);

        self.cache.poll();

        if let Some(secs) = self.countdown_secs(now) {
            if self.last_countdown != Some(secs) {
                self.last_countdown = Some(secs);
                self.events.push(SimulcastEvent::Countdown {
                    secs_remaining: secs,
                });
            }
        }
    }

    /// Hand in the result of a fetch
    ///
    /// A first-fetch result is applied at once so the display starts without
    /// waiting a full period. Anything else waits in the pending slot for the
    /// next tick; if the slot is taken, the older outcome is applied first.
    pub fn receive_fetch(&mut self, outcome: FetchOutcome, now: Instant) {
        if self.mode == EngineMode::Offline {
            log::debug!("Dropping fetch result that arrived while offline");
            return;
        }
        if self.pending.is_none() && self.sequencer.is_first_fetch() {
            self.apply_outcome(outcome, now);
            return;
        }
        if let Some(older) = self.pending.replace(outcome) {
            log::debug!("Pending fetch slot full, applying the older result first");
            self.apply_outcome(older, now);
        }
    }

    /// Take the fetch the last tick asked for, if any
    pub fn take_fetch_request(&mut self) -> Option<FetchRequest> {
        self.fetch_request.take()
    }

    pub fn drain_events(&mut self) -> Vec<SimulcastEvent> {
        std::mem::take(&mut self.events)
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        let countdown = self.wake_at.map(|_| now + Duration::from_secs(1));
        [
            self.ticks.next_fire(),
            self.wake_at,
            countdown,
            self.disks.next_due(),
            self.scheduler.next_release(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Toggle audio output
    ///
    /// The first enable unlocks playback for the rest of the process; disabling
    /// only mutes the master gain.
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        if enabled {
            self.scheduler.enable();
        }
        self.audio_enabled = enabled;
        let gain = self.output_gain();

        if let Some(sink) = self.sink.as_mut() {
            if enabled {
                sink.resume();
            }
            sink.set_output_gain(gain);
        }
        log::info!("Audio {}", if enabled { "enabled" } else { "muted" });
        self.events.push(SimulcastEvent::AudioEnabled(enabled));
    }

    /// Attach the audio output; a previous one has its voices stopped first
    pub fn attach_sink(&mut self, mut sink: Box<dyn PlaybackSink>) {
        if let Some(mut old) = self.sink.take() {
            self.scheduler.cancel_all(old.as_mut());
            old.stop_all();
        }
        self.scheduler.forget_all();

        if self.audio_enabled {
            sink.resume();
        }
        sink.set_output_gain(self.output_gain());
        self.sink = Some(sink);
        log::info!("Audio session attached");
    }

    /// Connectivity change
    ///
    /// Going offline drops all turn state and stops advancing. Coming back
    /// restarts the tick with an immediate first fetch.
    pub fn set_online(&mut self, online: bool, now: Instant) {
        match (online, self.mode == EngineMode::Offline) {
            (false, false) => {
                log::warn!("Connectivity lost, suspending playback");
                self.sequencer.reset();
                self.pending = None;
                self.fetch_request = None;
                self.cancel_voices();
                // The first batch after reconnecting carries absolute angles
                self.disks.reset();
                self.scheduler.set_suppressed(true);
                self.ticks.suspend();
                self.wake_at = None;
                self.last_countdown = None;
                self.set_mode(EngineMode::Offline);
                self.events.push(SimulcastEvent::Rotations(self.disks.views()));
            }
            (true, true) => {
                log::info!("Connectivity restored, resynchronizing");
                self.scheduler.set_suppressed(false);
                self.ticks.activate(now);
                self.set_mode(EngineMode::Running);
            }
            _ => {}
        }
    }

    /// Stop every voice and timer; the engine is inert afterwards
    pub fn shutdown(&mut self) {
        self.cancel_voices();
        if let Some(sink) = self.sink.as_mut() {
            sink.stop_all();
            sink.set_output_gain(0.0);
        }
        self.ticks.suspend();
        self.disks.cancel();
        self.wake_at = None;
        self.pending = None;
        self.fetch_request = None;
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn current(&self) -> Option<&Turn> {
        self.sequencer.current()
    }

    pub fn next(&self) -> Option<&Turn> {
        self.sequencer.next()
    }

    pub fn diagnostic(&self) -> Option<i64> {
        self.sequencer.diagnostic()
    }

    pub fn disks(&self) -> [DiskView; NUM_DISKS] {
        self.disks.views()
    }

    pub fn is_first_fetch(&self) -> bool {
        self.sequencer.is_first_fetch()
    }

    pub fn wake_at(&self) -> Option<Instant> {
        self.wake_at
    }

    pub fn stats(&self) -> SimulcastStats {
        SimulcastStats {
            mode: self.mode,
            current: self.sequencer.current().copied(),
            next: self.sequencer.next().copied(),
            diagnostic: self.sequencer.diagnostic(),
            upcoming: self.sequencer.buffer().turns().copied().collect(),
            upcoming_diagnostics: self.sequencer.buffer().diagnostics().copied().collect(),
            disks: self.disks.views(),
            audio_enabled: self.audio_enabled,
            audio_attached: self.sink.is_some(),
            sequencer: self.sequencer.stats(),
            scheduler: self.scheduler.stats(),
            cache: self.cache.stats(),
        }
    }

    fn on_tick(&mut self, fire: TickFire, now: Instant) {
        if let Some(outcome) = self.pending.take() {
            self.apply_outcome(outcome, now);
        }
        if self.mode == EngineMode::Asleep {
            return;
        }

        if fire.fetch {
            self.fetch_request = Some(FetchRequest {
                is_first_fetch: self.sequencer.is_first_fetch(),
                sleep: self.settings.sleep,
            });
        }

        self.advance(now);

        self.events.push(SimulcastEvent::Tick {
            ticker: fire.ticker,
            current: self.sequencer.current().copied(),
            diagnostic: self.sequencer.diagnostic(),
        });
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome, now: Instant) {
        match outcome.result {
            Err(e) => {
                log::error!("Fetch failed: {}", e);
                self.events.push(SimulcastEvent::FetchFailed {
                    message: e.to_string(),
                });
            }
            Ok(response) => self.apply_response(response, now),
        }
    }

    fn apply_response(&mut self, response: FetchResponse, now: Instant) {
        if let Some(secs) = response.sleep_secs() {
            self.enter_sleep(secs, now);
            return;
        }
        if self.mode == EngineMode::Asleep {
            log::debug!("Dropping batch that arrived while asleep");
            return;
        }

        let was_first = self.sequencer.apply_batch(response.batch);
        let head_is_sleep = self.sequencer.next().is_some_and(Turn::is_sleep);

        if self.mode == EngineMode::Idle && !head_is_sleep && self.sequencer.next().is_some() {
            log::info!("Fresh batch received, leaving idle");
            self.set_mode(EngineMode::Running);
        }

        if was_first && !head_is_sleep && self.sequencer.next().is_some() {
            self.advance(now);
        }
    }

    fn enter_sleep(&mut self, secs: f64, now: Instant) {
        log::info!("Endpoint is asleep, waking in {:.0}s", secs.min(MAX_SLEEP.as_secs_f64()));
        self.sequencer.reset();
        self.pending = None;
        self.fetch_request = None;
        self.cancel_voices();
        self.disks.reset();
        self.ticks.suspend();
        self.wake_at = Some(now + sleep_duration(secs));
        self.last_countdown = None;
        self.set_mode(EngineMode::Asleep);
        self.events.push(SimulcastEvent::Rotations(self.disks.views()));
    }

    fn advance(&mut self, now: Instant) {
        match self.sequencer.advance() {
            AdvanceOutcome::Underrun => {}
            AdvanceOutcome::SleepSentinel => {
                log::info!("Sleep sentinel reached, going idle");
                self.sequencer.reset();
                self.cancel_voices();
                self.disks.reset();
                self.ticks.activate(now);
                self.set_mode(EngineMode::Idle);
                self.events.push(SimulcastEvent::Rotations(self.disks.views()));
            }
            AdvanceOutcome::Advanced => self.present(now),
        }
    }

    /// Play and spin the newly current turn, then prefetch the next one
    fn present(&mut self, now: Instant) {
        let Some(turn) = self.sequencer.current().copied() else {
            return;
        };

        // Late cues for the current turn still land in the cache for later turns
        self.cache.ensure(unique_files(&turn, self.settings.turn_delay_ms));

        if self.mode != EngineMode::Offline {
            if let Some(sink) = self.sink.as_mut() {
                self.scheduler
                    .play_turn(&turn, &self.cache, sink.as_mut(), now);
            }
            self.disks.on_turn(&turn, now);
        }

        if let Some(next) = self.sequencer.next().copied() {
            self.scheduler.prefetch(&next, &mut self.cache);
        }
    }

    fn cancel_voices(&mut self) {
        match self.sink.as_mut() {
            Some(sink) => {
                self.scheduler.cancel_all(sink.as_mut());
            }
            None => self.scheduler.forget_all(),
        }
    }

    fn output_gain(&self) -> f32 {
        if self.audio_enabled {
            self.settings.output_gain
        } else {
            0.0
        }
    }

    fn countdown_secs(&self, now: Instant) -> Option<u64> {
        let wake_at = self.wake_at?;
        Some(wake_at.saturating_duration_since(now).as_secs_f64().ceil() as u64)
    }

    fn set_mode(&mut self, mode: EngineMode) {
        if self.mode != mode {
            log::info!("Mode: {} -> {}", self.mode, mode);
            self.mode = mode;
        }
        self.events.push(SimulcastEvent::ModeChanged(mode));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::schedule::{cue, RecordingSink};
    use crate::turn::TurnBatch;
    use crate::audio::{VoiceId, VoiceSpec};
    use std::sync::{Arc, Mutex};

    const PERIOD: Duration = Duration::from_millis(7250);

    /// Lets a test inspect a sink the engine owns
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<RecordingSink>>);

    impl PlaybackSink for SharedSink {
        fn current_time(&self) -> f64 {
            self.0.lock().unwrap().current_time()
        }
        fn is_suspended(&self) -> bool {
            self.0.lock().unwrap().is_suspended()
        }
        fn resume(&mut self) {
            self.0.lock().unwrap().resume()
        }
        fn start(&mut self, voice: VoiceSpec) -> bool {
            self.0.lock().unwrap().start(voice)
        }
        fn stop(&mut self, id: VoiceId) {
            self.0.lock().unwrap().stop(id)
        }
        fn stop_all(&mut self) {
            self.0.lock().unwrap().stop_all()
        }
        fn set_output_gain(&mut self, gain: f32) {
            self.0.lock().unwrap().set_output_gain(gain)
        }
    }

    impl SharedSink {
        fn started(&self) -> usize {
            self.0.lock().unwrap().started.len()
        }
        fn stopped(&self) -> usize {
            self.0.lock().unwrap().stopped.len()
        }
        fn gain(&self) -> f32 {
            self.0.lock().unwrap().gain
        }
    }

    fn turn(r: i32) -> Turn {
        Turn::Structured {
            rotations: [r, -r, r, -r],
            sounds: [1, 0, 0, 0, 0, 0],
        }
    }

    fn batch(turns: Vec<Turn>) -> FetchOutcome {
        let diagnostics = (0..turns.len() as i64).map(Some).collect();
        FetchOutcome {
            request: FetchRequest {
                is_first_fetch: true,
                sleep: SleepWindow::default(),
            },
            result: Ok(FetchResponse {
                batch: TurnBatch {
                    turns,
                    diagnostics,
                    initial_rotation: [2, 2, 2, 2],
                },
                initial_rotation_test: [0; 4],
                seconds_til_wake: None,
            }),
        }
    }

    fn sleep_response(secs: f64) -> FetchOutcome {
        let mut outcome = batch(Vec::new());
        if let Ok(response) = outcome.result.as_mut() {
            response.seconds_til_wake = Some(secs);
        }
        outcome
    }

    fn failure() -> FetchOutcome {
        FetchOutcome {
            request: FetchRequest {
                is_first_fetch: true,
                sleep: SleepWindow::default(),
            },
            result: Err(FetchError::Status { code: 500 }),
        }
    }

    fn engine() -> Simulcast {
        let cache = AssetCache::preloaded(&[
            ("Bass2-1.m4a", cue()),
            ("turn1.m4a", cue()),
            ("turn2.m4a", cue()),
            ("turn3.m4a", cue()),
            ("Num-00L.m4a", cue()),
        ]);
        Simulcast::new(EngineSettings::default(), cache)
    }

    fn started(now: Instant) -> Simulcast {
        let mut engine = engine();
        engine.start(now);
        engine.poll(now);
        engine
    }

    #[test]
    fn test_first_tick_requests_first_fetch() {
        let t0 = Instant::now();
        let mut engine = started(t0);

        let request = engine.take_fetch_request().unwrap();
        assert!(request.is_first_fetch);
        assert_eq!(request.sleep, SleepWindow::default());
        assert!(engine.current().is_none());
        assert_eq!(engine.stats().sequencer.underruns, 1);
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimulcastEvent::Tick { current: None, .. })));
    }

    #[test]
    fn test_first_batch_presents_synthetic_turn_at_once() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.take_fetch_request();

        engine.receive_fetch(batch(vec![turn(1), turn(2), turn(3)]), t0);

        assert_eq!(engine.current(), Some(&Turn::initial([2, 2, 2, 2])));
        assert_eq!(engine.next(), Some(&turn(2)));
        assert_eq!(engine.diagnostic(), Some(0));
        assert!(!engine.is_first_fetch());

        // Spin lands with the confirmation tones
        engine.poll(t0 + Duration::from_secs(3));
        let angles: Vec<f64> = engine.disks().iter().map(|d| d.angle).collect();
        assert_eq!(angles, [90.0; 4]);
    }

    #[test]
    fn test_ticks_advance_and_fetch_on_chunk_boundary() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.take_fetch_request();
        engine.receive_fetch(batch(vec![turn(1), turn(2), turn(3), turn(1)]), t0);

        engine.poll(t0 + PERIOD);
        assert_eq!(engine.current(), Some(&turn(2)));
        assert!(engine.take_fetch_request().is_none());

        engine.poll(t0 + PERIOD * 2);
        engine.poll(t0 + PERIOD * 3);
        assert_eq!(engine.current(), Some(&turn(1)));

        // Tick 4: a fetch is due and the buffer has run dry
        engine.poll(t0 + PERIOD * 4);
        let request = engine.take_fetch_request().unwrap();
        assert!(!request.is_first_fetch);
        assert_eq!(engine.current(), Some(&turn(1)));
        assert_eq!(engine.stats().sequencer.underruns, 2);
    }

    #[test]
    fn test_later_batches_wait_for_next_tick() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.receive_fetch(batch(vec![turn(1)]), t0);
        let before = engine.stats().upcoming.len();

        engine.receive_fetch(batch(vec![turn(2), turn(3)]), t0 + Duration::from_secs(1));
        assert_eq!(engine.stats().upcoming.len(), before);

        engine.poll(t0 + PERIOD);
        assert_eq!(engine.current(), Some(&turn(2)));
        assert_eq!(engine.next(), Some(&turn(3)));
    }

    #[test]
    fn test_full_pending_slot_applies_older_first() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.receive_fetch(batch(vec![turn(1)]), t0);

        engine.receive_fetch(batch(vec![turn(2)]), t0);
        engine.receive_fetch(batch(vec![turn(3)]), t0);
        engine.poll(t0 + PERIOD);
        assert_eq!(engine.current(), Some(&turn(2)));
        engine.poll(t0 + PERIOD * 2);
        assert_eq!(engine.current(), Some(&turn(3)));
    }

    #[test]
    fn test_failed_fetch_keeps_first_flag() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.take_fetch_request();

        engine.receive_fetch(failure(), t0);
        assert!(engine.is_first_fetch());
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimulcastEvent::FetchFailed { .. })));

        for i in 1..=4 {
            engine.poll(t0 + PERIOD * i);
        }
        assert!(engine.take_fetch_request().unwrap().is_first_fetch);
    }

    #[test]
    fn test_sleep_response_suspends_until_wake() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.take_fetch_request();

        engine.receive_fetch(sleep_response(5.0), t0);
        assert_eq!(engine.mode(), EngineMode::Asleep);
        assert!(engine.disks().iter().all(|d| d.angle == 0.0));

        engine.drain_events();
        engine.poll(t0 + Duration::from_millis(500));
        engine.poll(t0 + Duration::from_millis(1500));
        let countdown: Vec<u64> = engine
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                SimulcastEvent::Countdown { secs_remaining } => Some(secs_remaining),
                _ => None,
            })
            .collect();
        assert_eq!(countdown, [5, 4]);

        // No ticks while asleep
        engine.poll(t0 + Duration::from_millis(4900));
        assert!(engine.take_fetch_request().is_none());

        engine.poll(t0 + Duration::from_secs(5));
        assert_eq!(engine.mode(), EngineMode::Running);
        assert!(engine.take_fetch_request().unwrap().is_first_fetch);
    }

    #[test]
    fn test_sleep_sentinel_enters_idle_and_resyncs() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.receive_fetch(batch(vec![turn(1), Turn::Sleep]), t0);
        engine.take_fetch_request();

        engine.poll(t0 + PERIOD);
        assert_eq!(engine.mode(), EngineMode::Idle);
        assert!(engine.current().is_none());
        assert!(engine.is_first_fetch());

        // Ticking restarts with an immediate fire
        engine.poll(t0 + PERIOD);
        assert!(engine.take_fetch_request().unwrap().is_first_fetch);

        engine.receive_fetch(batch(vec![turn(3), turn(1)]), t0 + PERIOD);
        assert_eq!(engine.mode(), EngineMode::Running);
        assert_eq!(engine.current(), Some(&Turn::initial([2, 2, 2, 2])));
    }

    #[test]
    fn test_audio_gated_until_enabled() {
        let t0 = Instant::now();
        let sink = SharedSink::default();
        let mut engine = engine();
        engine.attach_sink(Box::new(sink.clone()));
        assert_eq!(sink.gain(), 0.0);
        engine.start(t0);
        engine.poll(t0);

        engine.receive_fetch(batch(vec![turn(1), turn(1), turn(1)]), t0);
        assert_eq!(sink.started(), 0);

        engine.set_audio_enabled(true);
        assert_eq!(sink.gain(), OUTPUT_GAIN_ON);
        engine.poll(t0 + PERIOD);
        // Bass2-1 plus four turn1 tones
        assert_eq!(sink.started(), 5);

        engine.set_audio_enabled(false);
        assert_eq!(sink.gain(), 0.0);
    }

    #[test]
    fn test_offline_cancels_and_suppresses() {
        let t0 = Instant::now();
        let sink = SharedSink::default();
        let mut engine = engine();
        engine.attach_sink(Box::new(sink.clone()));
        engine.set_audio_enabled(true);
        engine.start(t0);
        engine.poll(t0);
        engine.receive_fetch(batch(vec![turn(1), turn(1), turn(1)]), t0);
        engine.poll(t0 + PERIOD);
        let played = sink.started();
        assert!(played > 0);

        engine.set_online(false, t0 + PERIOD);
        assert_eq!(engine.mode(), EngineMode::Offline);
        assert!(engine.current().is_none());
        assert_eq!(sink.stopped(), played);

        // No advancing, and late results are dropped
        engine.poll(t0 + PERIOD * 2);
        engine.poll(t0 + PERIOD * 3);
        assert!(engine.take_fetch_request().is_none());
        engine.receive_fetch(batch(vec![turn(1), turn(1)]), t0 + PERIOD * 3);
        assert!(engine.current().is_none());
        assert_eq!(sink.started(), played);

        engine.set_online(true, t0 + PERIOD * 4);
        assert_eq!(engine.mode(), EngineMode::Running);
        engine.poll(t0 + PERIOD * 4);
        assert!(engine.take_fetch_request().unwrap().is_first_fetch);

        engine.receive_fetch(batch(vec![turn(1), turn(1)]), t0 + PERIOD * 4);
        assert_eq!(engine.current(), Some(&Turn::initial([2, 2, 2, 2])));
        assert!(sink.started() > played);
    }

    #[test]
    fn test_reconnect_restarts_disks_from_absolute_angle() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.receive_fetch(batch(vec![turn(1), turn(1)]), t0);
        engine.poll(t0 + Duration::from_secs(3));
        assert!(engine.disks().iter().all(|d| d.angle == 90.0));

        let t1 = t0 + Duration::from_secs(4);
        engine.drain_events();
        engine.set_online(false, t1);
        assert!(engine.disks().iter().all(|d| d.angle == 0.0));
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimulcastEvent::Rotations(_))));

        engine.set_online(true, t1);
        engine.poll(t1);
        assert!(engine.take_fetch_request().unwrap().is_first_fetch);
        engine.receive_fetch(batch(vec![turn(1), turn(1)]), t1);
        engine.poll(t1 + Duration::from_secs(3));

        let angles: Vec<f64> = engine.disks().iter().map(|d| d.angle).collect();
        assert_eq!(angles, [90.0; 4]);
    }

    #[test]
    fn test_huge_wake_time_is_clamped() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.take_fetch_request();

        engine.receive_fetch(sleep_response(1e300), t0);
        assert_eq!(engine.mode(), EngineMode::Asleep);
        assert_eq!(engine.wake_at(), Some(t0 + MAX_SLEEP));

        engine.poll(t0 + Duration::from_secs(1));
        assert_eq!(engine.mode(), EngineMode::Asleep);
    }

    #[test]
    fn test_stalled_poll_applies_spin_before_next_turn() {
        let t0 = Instant::now();
        let mut engine = started(t0);
        engine.receive_fetch(batch(vec![turn(1), turn(2), turn(3)]), t0);

        // Nothing polled between the first turn and the next tick
        engine.poll(t0 + PERIOD);
        assert_eq!(engine.current(), Some(&turn(2)));
        assert!(engine.disks().iter().all(|d| d.angle == 90.0));

        engine.poll(t0 + PERIOD + Duration::from_secs(3));
        let angles: Vec<f64> = engine.disks().iter().map(|d| d.angle).collect();
        assert_eq!(angles, [180.0, 0.0, 180.0, 0.0]);
    }

    #[test]
    fn test_next_deadline_tracks_tick() {
        let t0 = Instant::now();
        let mut engine = engine();
        assert_eq!(engine.next_deadline(t0), None);
        engine.start(t0);
        assert_eq!(engine.next_deadline(t0), Some(t0));
        engine.poll(t0);
        assert_eq!(engine.next_deadline(t0), Some(t0 + PERIOD));
    }

    #[test]
    fn test_shutdown_silences_everything() {
        let t0 = Instant::now();
        let sink = SharedSink::default();
        let mut engine = engine();
        engine.attach_sink(Box::new(sink.clone()));
        engine.set_audio_enabled(true);
        engine.start(t0);
        engine.poll(t0);
        engine.receive_fetch(batch(vec![turn(1), turn(1)]), t0);

        engine.shutdown();
        assert_eq!(sink.gain(), 0.0);
        assert_eq!(engine.next_deadline(t0), None);
    }
}
