//! Pairs utterance-end notifications with the utterance being waited on.
//!
//! Some engines report the end of an utterance that was interrupted by the
//! next `speak`. Without matching ids that late notification would complete
//! the new utterance early.

use super::OnComplete;

/// Finished ids remembered while nothing matching is armed
const FINISHED_MEMORY: usize = 8;

pub(crate) struct CompletionSlot<Id> {
    /// Id to wait for (`None` accepts the next end) and what to call
    pending: Option<(Option<Id>, OnComplete)>,
    /// Ends that arrived before their utterance was armed
    finished: Vec<Id>,
}

impl<Id: PartialEq> CompletionSlot<Id> {
    pub fn new() -> Self {
        Self {
            pending: None,
            finished: Vec::new(),
        }
    }

    /// Wait for utterance `id`
    ///
    /// Returns `done` straight back when `id` already finished; the caller
    /// fires it outside any lock.
    pub fn arm(&mut self, id: Option<Id>, done: OnComplete) -> Option<OnComplete> {
        if let Some(id) = &id {
            if let Some(position) = self.finished.iter().position(|f| f == id) {
                self.finished.remove(position);
                return Some(done);
            }
        }
        self.pending = Some((id, done));
        None
    }

    /// Record the end of utterance `id`; returns the completion to fire
    pub fn finish(&mut self, id: Id) -> Option<OnComplete> {
        let matches = match &self.pending {
            Some((None, _)) => true,
            Some((Some(expected), _)) => *expected == id,
            None => false,
        };
        if matches {
            return self.pending.take().map(|(_, done)| done);
        }

        if self.finished.len() == FINISHED_MEMORY {
            self.finished.remove(0);
        }
        self.finished.push(id);
        None
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.finished.clear();
    }
}
