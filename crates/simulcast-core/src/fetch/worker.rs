//! Background fetch worker
//!
//! Runs the blocking [`TurnSource`] on its own thread so the tick never waits
//! on the network. Outcomes come back on a channel the service selects on.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender};

use super::error::{FetchError, FetchResult};
use super::http::TurnSource;
use super::wire::{FetchRequest, FetchResponse};

/// The result of one fetch, with the request that produced it
#[derive(Debug)]
pub struct FetchOutcome {
    pub request: FetchRequest,
    pub result: FetchResult<FetchResponse>,
}

pub struct FetchWorker {
    request_tx: Option<Sender<FetchRequest>>,
    outcome_rx: Receiver<FetchOutcome>,
    thread_handle: Option<JoinHandle<()>>,
}

impl FetchWorker {
    pub fn spawn(source: Box<dyn TurnSource>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = crossbeam::channel::unbounded::<FetchRequest>();
        let (outcome_tx, outcome_rx) = crossbeam::channel::unbounded::<FetchOutcome>();

        let handle = thread::Builder::new()
            .name("fetch-worker".to_string())
            .spawn(move || worker_thread(source, request_rx, outcome_tx))?;

        Ok(Self {
            request_tx: Some(request_tx),
            outcome_rx,
            thread_handle: Some(handle),
        })
    }

    /// Queue a fetch
    pub fn request(&self, request: FetchRequest) -> FetchResult<()> {
        self.request_tx
            .as_ref()
            .ok_or(FetchError::Disconnected)?
            .send(request)
            .map_err(|_| FetchError::Disconnected)
    }

    /// Outcome channel, for `crossbeam::select!`
    pub fn outcomes(&self) -> &Receiver<FetchOutcome> {
        &self.outcome_rx
    }

    pub fn try_recv(&self) -> Option<FetchOutcome> {
        self.outcome_rx.try_recv().ok()
    }

    /// Stop accepting requests and wait for an in-flight fetch to finish
    pub fn shutdown(&mut self) {
        self.request_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Fetch worker panicked");
            }
        }
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_thread(
    mut source: Box<dyn TurnSource>,
    requests: Receiver<FetchRequest>,
    outcomes: Sender<FetchOutcome>,
) {
    log::info!("Fetch worker started");

    while let Ok(request) = requests.recv() {
        log::debug!("Fetching next batch (first fetch: {})", request.is_first_fetch);
        let result = source.fetch_next_batch(&request);
        if outcomes.send(FetchOutcome { request, result }).is_err() {
            break;
        }
    }

    log::info!("Fetch worker stopped");
}
