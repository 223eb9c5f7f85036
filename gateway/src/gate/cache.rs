// ============================================================================
// Profile Cache
// ============================================================================
//
// TTL-bounded map from user id to last-known profile, saving a store round
// trip on every gated request. Only successful lookups are stored; entries
// expire lazily at read time and writes are last-write-wins. A slightly
// stale read inside the TTL window is an accepted trade-off.
//
// ============================================================================

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::profile::Profile;

struct CacheEntry {
    profile: Profile,
    cached_at: Instant,
}

pub struct ProfileCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Live cached profile for this user, if any. Expired entries are
    /// removed on the way out.
    pub fn get(&self, user_id: &str) -> Option<Profile> {
        let result = match self.entries.get(user_id) {
            Some(entry) if entry.cached_at.elapsed() < self.ttl => {
                Some(entry.profile.clone())
            }
            Some(_) => None,
            None => return None,
        };
        if result.is_none() {
            self.entries.remove(user_id);
        }
        result
    }

    /// Store a freshly fetched profile, superseding any earlier entry
    pub fn insert(&self, profile: Profile) {
        self.entries.insert(
            profile.user_id.clone(),
            CacheEntry {
                profile,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, user_id: &str) {
        self.entries.remove(user_id);
    }
}
