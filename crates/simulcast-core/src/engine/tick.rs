//! Fixed-cadence tick driver
//!
//! Fires once immediately on activation and then every `period`. Every
//! `chunk`-th fire (starting with the first) also asks for a fetch. The driver
//! never sleeps on its own; the service loop asks it for the next deadline.

use std::time::{Duration, Instant};

use crate::types::{CHUNK_SIZE, TURN_INTERVAL_SECS};

/// One fire of the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickFire {
    /// Position inside the current chunk
    pub counter: i32,
    /// A new batch should be requested
    pub fetch: bool,
    /// Flips on every fire
    pub ticker: bool,
}

#[derive(Debug, Clone)]
pub struct TickDriver {
    period: Duration,
    chunk: i32,
    counter: i32,
    next_fire: Option<Instant>,
    ticker: bool,
    fires: u64,
}

impl Default for TickDriver {
    fn default() -> Self {
        Self::new(Duration::from_secs_f64(TURN_INTERVAL_SECS), CHUNK_SIZE)
    }
}

impl TickDriver {
    /// Create a suspended driver
    pub fn new(period: Duration, chunk: u32) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            chunk: chunk.max(1) as i32,
            counter: -1,
            next_fire: None,
            ticker: false,
            fires: 0,
        }
    }

    /// Restart the chunk and fire on the next poll
    pub fn activate(&mut self, now: Instant) {
        self.counter = -1;
        self.next_fire = Some(now);
    }

    /// Stop firing until the next [`activate`](Self::activate)
    pub fn suspend(&mut self) {
        self.next_fire = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_fire.is_some()
    }

    pub fn next_fire(&self) -> Option<Instant> {
        self.next_fire
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn ticker(&self) -> bool {
        self.ticker
    }

    pub fn fires(&self) -> u64 {
        self.fires
    }

    /// Fire if due
    ///
    /// A stall of a full period or more yields a single fire and the schedule
    /// is re-anchored to `now`, so missed ticks are never replayed in a burst.
    pub fn poll(&mut self, now: Instant) -> Option<TickFire> {
        let due = self.next_fire?;
        if now < due {
            return None;
        }

        self.counter = (self.counter + 1) % self.chunk;
        self.ticker = !self.ticker;
        self.fires += 1;

        let next = due + self.period;
        self.next_fire = Some(if next <= now {
            log::debug!("Tick stalled for {:?}, re-anchoring", now - due);
            now + self.period
        } else {
            next
        });

        Some(TickFire {
            counter: self.counter,
            fetch: self.counter == 0,
            ticker: self.ticker,
        })
    }
}
