//! Waiting queue: ordered, duplicate-free.

use std::collections::VecDeque;

use super::spot::RequesterId;

#[derive(Debug, Clone, Default)]
pub struct WaitingQueue {
    entries: VecDeque<RequesterId>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the back unless already queued. Returns true if inserted.
    pub fn push_back(&mut self, requester: RequesterId) -> bool {
        if self.contains(&requester) {
            return false;
        }
        self.entries.push_back(requester);
        true
    }

    /// Move (or insert) the requester to position 0.
    pub fn push_front(&mut self, requester: RequesterId) {
        self.remove(&requester);
        self.entries.push_front(requester);
    }

    pub fn pop_front(&mut self) -> Option<RequesterId> {
        self.entries.pop_front()
    }

    /// Idempotent removal. Returns true if the requester was queued.
    pub fn remove(&mut self, requester: &RequesterId) -> bool {
        match self.entries.iter().position(|r| r == requester) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, requester: &RequesterId) -> bool {
        self.entries.iter().any(|r| r == requester)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequesterId> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
