//! Background cue loader
//!
//! Moves storage reads and decoding off the engine thread. Requests go in on
//! one channel, decoded cues (or the reason they failed) come back on another.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};

use super::decode::{decode_bytes, extension_of, DecodedAudio};
use super::error::AssetResult;
use super::store::{AssetLocation, AssetStore};

/// Request to load one cue
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub name: String,
    pub location: AssetLocation,
}

/// Result of loading one cue
#[derive(Debug)]
pub struct LoadResult {
    pub name: String,
    pub result: AssetResult<DecodedAudio>,
}

/// Handle to the loader thread
///
/// The thread exits once this handle (and with it the request sender) is
/// dropped.
pub struct AssetLoader {
    tx: Sender<LoadRequest>,
    rx: Receiver<LoadResult>,
    _handle: JoinHandle<()>,
}

impl AssetLoader {
    pub fn spawn(store: Arc<dyn AssetStore>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = crossbeam::channel::unbounded::<LoadRequest>();
        let (result_tx, result_rx) = crossbeam::channel::unbounded::<LoadResult>();

        let handle = thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || loader_thread(store, request_rx, result_tx))?;

        log::info!("AssetLoader spawned");

        Ok(Self {
            tx: request_tx,
            rx: result_rx,
            _handle: handle,
        })
    }

    /// Queue a load; returns false if the loader thread is gone
    pub fn request(&self, request: LoadRequest) -> bool {
        self.tx.send(request).is_ok()
    }

    pub fn try_recv(&self) -> Option<LoadResult> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<LoadResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Result channel, for callers that want to select on it
    pub fn results(&self) -> &Receiver<LoadResult> {
        &self.rx
    }
}

fn loader_thread(
    store: Arc<dyn AssetStore>,
    requests: Receiver<LoadRequest>,
    results: Sender<LoadResult>,
) {
    log::debug!("Asset loader thread started");

    while let Ok(LoadRequest { name, location }) = requests.recv() {
        let start = std::time::Instant::now();
        let result = store
            .read(&location)
            .and_then(|bytes| decode_bytes(bytes, extension_of(&name)));

        match &result {
            Ok(audio) => log::debug!(
                "Decoded {} ({} frames, {} Hz, {} ch) in {:?}",
                name,
                audio.frames(),
                audio.sample_rate,
                audio.channels,
                start.elapsed()
            ),
            Err(e) => log::debug!("Loading {} from {} failed: {}", name, location, e),
        }

        if results.send(LoadResult { name, result }).is_err() {
            break;
        }
    }

    log::debug!("Asset loader thread stopped");
}
