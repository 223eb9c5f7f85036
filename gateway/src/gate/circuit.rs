// ============================================================================
// Failure Circuit
// ============================================================================
//
// Counts consecutive failed profile lookups per user. Once the count
// reaches the threshold the gate stops redirecting and lets the user
// through: store unavailability must never lock anyone out permanently.
// Records reset on any successful fetch and expire after a window of
// inactivity, again lazily at read time.
//
// ============================================================================

use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Clone, Copy)]
struct FailureRecord {
    consecutive_failures: u32,
    first_failure_at: Instant,
    last_failure_at: Instant,
}

pub struct FailureCircuit {
    threshold: u32,
    window: Duration,
    records: DashMap<String, FailureRecord>,
}

impl FailureCircuit {
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self {
            threshold,
            window,
            records: DashMap::new(),
        }
    }

    /// Record one failed lookup; returns the new consecutive count
    pub fn record_failure(&self, user_id: &str) -> u32 {
        let now = Instant::now();
        let mut entry = self
            .records
            .entry(user_id.to_string())
            .and_modify(|record| {
                if now.duration_since(record.last_failure_at) > self.window {
                    // Stale record: start a fresh streak
                    record.consecutive_failures = 0;
                    record.first_failure_at = now;
                }
            })
            .or_insert(FailureRecord {
                consecutive_failures: 0,
                first_failure_at: now,
                last_failure_at: now,
            });
        entry.consecutive_failures += 1;
        entry.last_failure_at = now;
        let count = entry.consecutive_failures;
        drop(entry);

        tracing::warn!(
            user_id = %user_id,
            consecutive_failures = count,
            threshold = self.threshold,
            "Profile lookup failure recorded"
        );
        count
    }

    /// Current consecutive failure count, honoring the inactivity window
    pub fn failures(&self, user_id: &str) -> u32 {
        let (count, stale) = match self.records.get(user_id) {
            Some(record) => (
                record.consecutive_failures,
                record.last_failure_at.elapsed() > self.window,
            ),
            None => return 0,
        };
        if stale {
            self.records.remove(user_id);
            return 0;
        }
        count
    }

    /// Whether the circuit is open (liveness override engaged) for this user
    pub fn is_open(&self, user_id: &str) -> bool {
        self.failures(user_id) >= self.threshold
    }

    /// Reset on a successful fetch
    pub fn reset(&self, user_id: &str) {
        if self.records.remove(user_id).is_some() {
            tracing::info!(user_id = %user_id, "Failure circuit reset after successful fetch");
        }
    }
}
