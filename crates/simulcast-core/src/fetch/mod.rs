//! Remote fetch adapter
//!
//! - [`wire`]: endpoint request/response shapes and turn resolution
//! - [`TurnSource`]: the endpoint boundary, with an HTTP implementation
//! - [`FetchWorker`]: runs fetches off the engine thread

mod error;
mod http;
pub mod wire;
mod worker;

pub use error::{FetchError, FetchResult};
pub use http::{HttpTurnSource, TurnSource};
pub use wire::{parse_response, FetchRequest, FetchResponse, SleepWindow};
pub use worker::{FetchOutcome, FetchWorker};
