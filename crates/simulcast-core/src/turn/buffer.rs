//! Prefetch queue of not-yet-displayed turns

use std::collections::VecDeque;

use super::Turn;

/// Pending turns and their paired diagnostic values
///
/// The two queues are independent FIFOs. They are normally the same length
/// but nothing forces that: a batch with fewer diagnostics than turns simply
/// runs the diagnostic queue dry first.
#[derive(Debug, Default)]
pub struct TurnBuffer {
    turns: VecDeque<Turn>,
    diagnostics: VecDeque<Option<i64>>,
}

impl TurnBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a batch onto the tails of both queues
    pub fn append(&mut self, turns: Vec<Turn>, diagnostics: Vec<Option<i64>>) {
        self.turns.extend(turns);
        self.diagnostics.extend(diagnostics);
    }

    /// Pop the head of each queue
    ///
    /// The outer `Option` of the diagnostic is `None` when that queue is
    /// empty; the inner one is the endpoint's null.
    pub fn pop_front(&mut self) -> (Option<Turn>, Option<Option<i64>>) {
        (self.turns.pop_front(), self.diagnostics.pop_front())
    }

    /// Overwrite the head turn, if any
    pub fn replace_head(&mut self, turn: Turn) -> bool {
        match self.turns.front_mut() {
            Some(head) => {
                *head = turn;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.turns.clear();
        self.diagnostics.clear();
    }

    pub fn front(&self) -> Option<&Turn> {
        self.turns.front()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Option<i64>> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
