//! Endpoint request and response shapes
//!
//! The response keeps the endpoint's loose JSON typing (`secretValues` mixes
//! arrays and a sentinel string). [`WireResponse::resolve`] turns it into
//! tagged [`Turn`]s in one pass and rejects the whole batch if any entry has
//! an unexpected shape.

use serde::{Deserialize, Serialize};

use super::error::{FetchError, FetchResult};
use crate::turn::{Turn, TurnBatch};
use crate::types::{NUM_DISKS, NUM_SOUND_SELECTORS};

/// Sentinel string for "the service is in off-hours"
pub const SLEEP_SENTINEL: &str = "SLEEP";

/// Daily off-hours window sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepWindow {
    pub start_hour: u8,
    pub end_hour: u8,
    pub start_minute: u8,
    pub end_minute: u8,
}

impl Default for SleepWindow {
    fn default() -> Self {
        Self {
            start_hour: 0,
            end_hour: 7,
            start_minute: 0,
            end_minute: 0,
        }
    }
}

/// Parameters of one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub is_first_fetch: bool,
    pub sleep: SleepWindow,
}

impl FetchRequest {
    /// Query string pairs in the endpoint's naming
    pub fn query_pairs(&self) -> [(&'static str, String); 5] {
        [
            ("isFirstFetch", self.is_first_fetch.to_string()),
            ("sleepStartHour", self.sleep.start_hour.to_string()),
            ("sleepEndHour", self.sleep.end_hour.to_string()),
            ("sleepStartMinute", self.sleep.start_minute.to_string()),
            ("sleepEndMinute", self.sleep.end_minute.to_string()),
        ]
    }
}

/// One `secretValues` entry as sent
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawTurn {
    Sentinel(String),
    Pair(Vec<Vec<i32>>),
}

/// Endpoint response body
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    #[serde(default)]
    pub test_values_increasing: Vec<Option<i64>>,
    #[serde(default)]
    pub secret_values: Vec<RawTurn>,
    #[serde(default)]
    pub initialize_rotation: [i32; NUM_DISKS],
    #[serde(default)]
    pub initialize_rotation_test: [i32; NUM_DISKS],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_til_wake: Option<f64>,
}

/// A fetched batch with every turn resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub batch: TurnBatch,
    pub initial_rotation_test: [i32; NUM_DISKS],
    /// Present and positive when the service is asleep
    pub seconds_til_wake: Option<f64>,
}

impl FetchResponse {
    /// Sleep duration if this response puts the display to sleep
    pub fn sleep_secs(&self) -> Option<f64> {
        self.seconds_til_wake.filter(|s| *s > 0.0)
    }
}

impl RawTurn {
    /// Resolve the wire shape into a tagged turn
    pub fn resolve(&self) -> FetchResult<Turn> {
        match self {
            RawTurn::Sentinel(s) if s == SLEEP_SENTINEL => Ok(Turn::Sleep),
            RawTurn::Sentinel(s) => Err(FetchError::Malformed(format!("unknown sentinel {:?}", s))),
            RawTurn::Pair(parts) => {
                let [rotations, sounds] = parts.as_slice() else {
                    return Err(FetchError::Malformed(format!(
                        "expected [rotations, sounds], got {} parts",
                        parts.len()
                    )));
                };
                let rotations: [i32; NUM_DISKS] = rotations.as_slice().try_into().map_err(|_| {
                    FetchError::Malformed(format!("expected {} rotations, got {}", NUM_DISKS, rotations.len()))
                })?;

                if sounds.is_empty() {
                    return Ok(Turn::Reset { rotations });
                }
                let sounds: [i32; NUM_SOUND_SELECTORS] = sounds.as_slice().try_into().map_err(|_| {
                    FetchError::Malformed(format!(
                        "expected {} sound selectors, got {}",
                        NUM_SOUND_SELECTORS,
                        sounds.len()
                    ))
                })?;
                Ok(Turn::Structured { rotations, sounds })
            }
        }
    }
}

impl WireResponse {
    pub fn resolve(self) -> FetchResult<FetchResponse> {
        let turns = self
            .secret_values
            .iter()
            .map(RawTurn::resolve)
            .collect::<FetchResult<Vec<Turn>>>()?;

        Ok(FetchResponse {
            batch: TurnBatch {
                turns,
                diagnostics: self.test_values_increasing,
                initial_rotation: self.initialize_rotation,
            },
            initial_rotation_test: self.initialize_rotation_test,
            seconds_til_wake: self.seconds_til_wake,
        })
    }
}

/// Parse and resolve a response body
pub fn parse_response(body: &str) -> FetchResult<FetchResponse> {
    serde_json::from_str::<WireResponse>(body)?.resolve()
}
