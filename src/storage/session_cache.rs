// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache of per-sender session keys.
//!
//! Each sender negotiates a shared key through `getServerPubKey`; the key is
//! held here until it expires or is evicted by newer senders.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use lru::LruCache;
use zeroize::Zeroizing;

/// Cached session: shared key + expiry.
struct SessionEntry {
    shared_key: Zeroizing<[u8; 32]>,
    expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLookup {
    Missing,
    Expired,
}

/// In-process LRU cache of negotiated session keys.
pub struct SessionCache {
    cache: Mutex<LruCache<Address, SessionEntry>>,
}

impl SessionCache {
    /// Create a new cache holding at most `capacity` senders.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Lock the cache. A panic while the lock was held leaves at worst a
    /// stale entry, so a poisoned lock is recovered rather than dropped.
    fn entries(&self) -> MutexGuard<'_, LruCache<Address, SessionEntry>> {
        self.cache.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("session cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Store the session for `sender`, replacing any previous one.
    pub fn insert(&self, sender: Address, shared_key: Zeroizing<[u8; 32]>, expiry: DateTime<Utc>) {
        self.entries().put(sender, SessionEntry { shared_key, expiry });
    }

    /// Shared key for `sender` as of `now`. Expired sessions are removed.
    pub fn get_at(
        &self,
        sender: Address,
        now: DateTime<Utc>,
    ) -> Result<Zeroizing<[u8; 32]>, SessionLookup> {
        let mut cache = self.entries();
        let expired = match cache.get(&sender) {
            Some(entry) if entry.expiry > now => return Ok(entry.shared_key.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.pop(&sender);
            return Err(SessionLookup::Expired);
        }
        Err(SessionLookup::Missing)
    }

    pub fn get(&self, sender: Address) -> Result<Zeroizing<[u8; 32]>, SessionLookup> {
        self.get_at(sender, Utc::now())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn cache_put_and_get() {
        let cache = SessionCache::new(10);
        let sender = Address::repeat_byte(1);
        assert_eq!(cache.get(sender).unwrap_err(), SessionLookup::Missing);

        cache.insert(sender, Zeroizing::new([7; 32]), Utc::now() + Duration::minutes(10));
        assert_eq!(*cache.get(sender).unwrap(), [7; 32]);
    }

    #[test]
    fn expired_session_is_evicted() {
        let cache = SessionCache::new(10);
        let sender = Address::repeat_byte(1);
        let now = Utc::now();
        cache.insert(sender, Zeroizing::new([7; 32]), now + Duration::minutes(10));

        let later = now + Duration::minutes(11);
        assert_eq!(cache.get_at(sender, later).unwrap_err(), SessionLookup::Expired);
        assert_eq!(cache.get_at(sender, later).unwrap_err(), SessionLookup::Missing);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn poisoned_lock_still_stores_sessions() {
        let cache = std::sync::Arc::new(SessionCache::new(10));
        let poisoner = std::sync::Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.cache.lock().unwrap();
            panic!("poison the session cache");
        })
        .join();
        assert!(cache.cache.is_poisoned());

        let sender = Address::repeat_byte(4);
        cache.insert(sender, Zeroizing::new([9; 32]), Utc::now() + Duration::minutes(10));
        assert_eq!(*cache.get(sender).unwrap(), [9; 32]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_evicts_least_recent_sender() {
        let cache = SessionCache::new(2);
        let expiry = Utc::now() + Duration::minutes(10);
        for b in 1..=3u8 {
            cache.insert(Address::repeat_byte(b), Zeroizing::new([b; 32]), expiry);
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(Address::repeat_byte(1)).is_err());
        assert!(cache.get(Address::repeat_byte(3)).is_ok());
    }
}
