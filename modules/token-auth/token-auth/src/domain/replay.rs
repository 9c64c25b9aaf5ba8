use std::collections::HashMap;

use parking_lot::Mutex;
use time::OffsetDateTime;

/// Remembers assertion ids, scoped by issuer, until they expire.
///
/// At capacity, expired entries are purged first; if none have expired the
/// entry closest to expiry is evicted.
pub struct ReplayCache {
    capacity: usize,
    entries: Mutex<HashMap<(String, String), OffsetDateTime>>,
}

impl ReplayCache {
    /// `capacity` is clamped to at least one entry.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Records `id` from `issuer` until `expires_at`.
    ///
    /// Returns `false` if the pair is already recorded and has not expired at `now`.
    pub fn try_insert(
        &self,
        issuer: &str,
        id: &str,
        expires_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> bool {
        let key = (issuer.to_owned(), id.to_owned());
        let mut entries = self.entries.lock();

        if entries.get(&key).is_some_and(|expiry| *expiry > now) {
            return false;
        }

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            entries.retain(|_, expiry| *expiry > now);
            if entries.len() >= self.capacity
                && let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, expiry)| **expiry)
                    .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(key, expires_at);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
