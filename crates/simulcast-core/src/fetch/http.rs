//! Turn sources
//!
//! [`TurnSource`] is the boundary to the remote endpoint. The HTTP source is
//! a thin blocking `ureq` call; it only ever runs on the fetch worker thread.

use std::time::Duration;

use super::error::{FetchError, FetchResult};
use super::wire::{parse_response, FetchRequest, FetchResponse};

/// Something that can produce the next batch of turns
pub trait TurnSource: Send {
    fn fetch_next_batch(&mut self, request: &FetchRequest) -> FetchResult<FetchResponse>;
}

/// Fetches turns from the HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpTurnSource {
    url: String,
    timeout: Duration,
}

impl HttpTurnSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TurnSource for HttpTurnSource {
    fn fetch_next_batch(&mut self, request: &FetchRequest) -> FetchResult<FetchResponse> {
        let mut call = ureq::get(&self.url).timeout(self.timeout);
        for (key, value) in request.query_pairs() {
            call = call.query(key, &value);
        }

        let response = call.call().map_err(|e| match e {
            ureq::Error::Status(code, _) => FetchError::Status { code },
            ureq::Error::Transport(t) => FetchError::Http(t.to_string()),
        })?;

        let body = response
            .into_string()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::wire::SleepWindow;

    #[test]
    fn test_unreachable_endpoint_is_http_error() {
        // Port 9 (discard) on localhost is closed on any sane test machine
        let mut source = HttpTurnSource::new("http://127.0.0.1:9/getSimulcast", Duration::from_millis(500));
        let request = FetchRequest {
            is_first_fetch: true,
            sleep: SleepWindow::default(),
        };
        let err = source.fetch_next_batch(&request).unwrap_err();
        assert!(matches!(err, FetchError::Http(_)), "{:?}", err);
    }
}
