// ============================================================================
// Submission Grace Tracker
// ============================================================================
//
// Records "a profile was just submitted for user U". The store is
// eventually consistent, so a gated request arriving right after the edit
// form posts can still read the old incomplete flag; a live grace entry
// suppresses that false negative. Entries expire lazily at read time.
//
// ============================================================================

use std::time::{Duration, Instant};

use dashmap::DashMap;

pub struct SubmissionGrace {
    window: Duration,
    submitted: DashMap<String, Instant>,
}

impl SubmissionGrace {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            submitted: DashMap::new(),
        }
    }

    /// Record a submission signal for this user, superseding any earlier one
    pub fn record(&self, user_id: &str) {
        self.submitted.insert(user_id.to_string(), Instant::now());
        tracing::debug!(user_id = %user_id, "Recorded profile submission grace window");
    }

    /// Whether a live (unexpired) submission record exists for this user
    pub fn is_active(&self, user_id: &str) -> bool {
        let live = match self.submitted.get(user_id) {
            Some(entry) => entry.elapsed() < self.window,
            None => return false,
        };
        if !live {
            self.submitted.remove(user_id);
        }
        live
    }
}
