//! Per-user risk policies published as immutable values.
//!
//! An update validates the candidate, writes it to the settings store and only
//! then swaps the user's published `Arc<RiskPolicy>`. Readers always see either
//! the previous policy or the new one in full. Writes for the same user are
//! serialized so the store and the published value cannot diverge.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::domain::error::TradeguardError;
use crate::domain::risk_policy::{RiskPolicy, validate_policy};
use crate::ports::settings_port::SettingsPort;

pub struct PolicyBook<S> {
    store: S,
    published: RwLock<HashMap<String, Arc<RiskPolicy>>>,
    writers: [Mutex<()>; WRITER_STRIPES],
}

/// Fixed number of writer locks; users hash onto a stripe so the lock set
/// never grows with the user count.
const WRITER_STRIPES: usize = 16;

fn writer_stripe(user: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    user.hash(&mut hasher);
    (hasher.finish() % WRITER_STRIPES as u64) as usize
}

impl<S: SettingsPort> PolicyBook<S> {
    pub fn new(store: S) -> Self {
        PolicyBook {
            store,
            published: RwLock::new(HashMap::new()),
            writers: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates `candidate` and makes it `user`'s policy.
    ///
    /// On any error the previously published policy stays in effect.
    pub fn update(
        &self,
        user: &str,
        candidate: RiskPolicy,
    ) -> Result<Arc<RiskPolicy>, TradeguardError> {
        let policy = validate_policy(candidate).inspect_err(|e| {
            warn!(user, error = %e, "rejected risk policy update");
        })?;

        let _guard = self.writers[writer_stripe(user)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.store.put(user, &policy).inspect_err(|e| {
            warn!(user, error = %e, "failed to persist risk policy");
        })?;

        let policy = Arc::new(policy);
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.to_string(), Arc::clone(&policy));

        info!(
            user,
            take_profit = policy.take_profit_pct,
            stop_loss = policy.stop_loss_pct,
            max_risk = policy.max_risk_per_trade_pct,
            trailing = policy.trailing_stop_enabled,
            "risk policy replaced"
        );
        Ok(policy)
    }

    /// Current policy for `user`, loading it from the store on first access.
    pub fn get(&self, user: &str) -> Result<Arc<RiskPolicy>, TradeguardError> {
        if let Some(policy) = self
            .published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
        {
            return Ok(Arc::clone(policy));
        }

        let stored = self
            .store
            .get(user)?
            .ok_or_else(|| TradeguardError::PolicyNotFound {
                user: user.to_string(),
            })?;
        // Stored records may predate current validation rules.
        let stored = validate_policy(stored)?;
        debug!(user, "loaded risk policy from store");

        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // A concurrent update may have published while we were reading the store.
        let policy = published
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(stored));
        Ok(Arc::clone(policy))
    }

    /// Like [`get`](Self::get) but falls back to [`RiskPolicy::default`] when
    /// nothing is stored. Store failures are still returned.
    pub fn get_or_default(&self, user: &str) -> Result<Arc<RiskPolicy>, TradeguardError> {
        match self.get(user) {
            Err(TradeguardError::PolicyNotFound { .. }) => Ok(Arc::new(RiskPolicy::default())),
            other => other,
        }
    }

    /// Starting point for a partial update: the published policy, else the
    /// stored record as-is, else [`RiskPolicy::default`].
    ///
    /// Unlike [`get`](Self::get) the stored record is not validated, so a
    /// record that fails current rules can still be repaired by an update.
    pub fn update_base(&self, user: &str) -> Result<RiskPolicy, TradeguardError> {
        if let Some(policy) = self
            .published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
        {
            return Ok(policy.as_ref().clone());
        }
        Ok(self.store.get(user)?.unwrap_or_default())
    }

    /// Drops the published copy so the next read goes to the store.
    pub fn evict(&self, user: &str) {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct MemoryStore {
        policies: Mutex<HashMap<String, RiskPolicy>>,
        fail_writes: bool,
        fail_reads: bool,
    }

    impl SettingsPort for MemoryStore {
        fn get(&self, user: &str) -> Result<Option<RiskPolicy>, TradeguardError> {
            if self.fail_reads {
                return Err(TradeguardError::SettingsIo {
                    reason: "read failed".into(),
                });
            }
            Ok(self.policies.lock().unwrap().get(user).cloned())
        }

        fn put(&self, user: &str, policy: &RiskPolicy) -> Result<(), TradeguardError> {
            if self.fail_writes {
                return Err(TradeguardError::SettingsIo {
                    reason: "disk full".into(),
                });
            }
            self.policies
                .lock()
                .unwrap()
                .insert(user.to_string(), policy.clone());
            Ok(())
        }
    }

    fn trailing_policy(distance: f64) -> RiskPolicy {
        RiskPolicy {
            take_profit_pct: 5.0,
            stop_loss_pct: 2.0,
            max_risk_per_trade_pct: 1.0,
            trailing_stop_enabled: true,
            trailing_stop_distance_pct: distance,
        }
    }

    #[test]
    fn update_publishes_and_persists() {
        let book = PolicyBook::new(MemoryStore::default());
        let published = book.update("alice", trailing_policy(1.5)).unwrap();
        assert_eq!(*published, trailing_policy(1.5));
        assert_eq!(*book.get("alice").unwrap(), trailing_policy(1.5));
        assert_eq!(
            book.store().get("alice").unwrap(),
            Some(trailing_policy(1.5))
        );
    }

    #[test]
    fn rejected_update_keeps_previous_policy() {
        let book = PolicyBook::new(MemoryStore::default());
        book.update("alice", trailing_policy(1.5)).unwrap();

        let err = book.update("alice", trailing_policy(0.0)).unwrap_err();
        assert!(matches!(err, TradeguardError::InvalidRange { .. }));
        assert_eq!(*book.get("alice").unwrap(), trailing_policy(1.5));
        assert_eq!(
            book.store().get("alice").unwrap(),
            Some(trailing_policy(1.5))
        );
    }

    #[test]
    fn store_failure_is_propagated_and_keeps_previous_policy() {
        let book = PolicyBook::new(MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        });
        let err = book.update("bob", trailing_policy(1.5)).unwrap_err();
        assert!(matches!(err, TradeguardError::SettingsIo { .. }));
        assert!(matches!(
            book.get("bob").unwrap_err(),
            TradeguardError::PolicyNotFound { .. }
        ));
    }

    #[test]
    fn users_are_independent() {
        let book = PolicyBook::new(MemoryStore::default());
        book.update("alice", trailing_policy(1.0)).unwrap();
        book.update("bob", RiskPolicy::default()).unwrap();
        assert_eq!(book.get("alice").unwrap().trailing_stop_distance_pct, 1.0);
        assert!(!book.get("bob").unwrap().trailing_stop_enabled);
    }

    #[test]
    fn get_loads_from_store_once() {
        struct CountingStore {
            reads: Cell<usize>,
        }
        impl SettingsPort for CountingStore {
            fn get(&self, _user: &str) -> Result<Option<RiskPolicy>, TradeguardError> {
                self.reads.set(self.reads.get() + 1);
                Ok(Some(RiskPolicy::default()))
            }
            fn put(&self, _user: &str, _policy: &RiskPolicy) -> Result<(), TradeguardError> {
                Ok(())
            }
        }

        let book = PolicyBook::new(CountingStore {
            reads: Cell::new(0),
        });
        book.get("carol").unwrap();
        book.get("carol").unwrap();
        assert_eq!(book.store().reads.get(), 1);

        book.evict("carol");
        book.get("carol").unwrap();
        assert_eq!(book.store().reads.get(), 2);
    }

    #[test]
    fn invalid_stored_record_is_rejected() {
        let store = MemoryStore::default();
        store
            .policies
            .lock()
            .unwrap()
            .insert("dave".into(), trailing_policy(0.0));
        let book = PolicyBook::new(store);
        assert!(matches!(
            book.get("dave").unwrap_err(),
            TradeguardError::InvalidRange { .. }
        ));
    }

    #[test]
    fn get_or_default_falls_back_only_when_missing() {
        let book = PolicyBook::new(MemoryStore::default());
        assert_eq!(*book.get_or_default("erin").unwrap(), RiskPolicy::default());

        let failing = PolicyBook::new(MemoryStore {
            fail_reads: true,
            ..MemoryStore::default()
        });
        assert!(matches!(
            failing.get_or_default("erin").unwrap_err(),
            TradeguardError::SettingsIo { .. }
        ));
    }

    #[test]
    fn update_base_returns_invalid_record_for_repair() {
        let store = MemoryStore::default();
        store
            .policies
            .lock()
            .unwrap()
            .insert("dave".into(), trailing_policy(0.0));
        let book = PolicyBook::new(store);

        let base = book.update_base("dave").unwrap();
        assert_eq!(base, trailing_policy(0.0));

        let repaired = RiskPolicy {
            trailing_stop_distance_pct: 1.0,
            ..base
        };
        book.update("dave", repaired).unwrap();
        assert_eq!(*book.get("dave").unwrap(), trailing_policy(1.0));
        assert_eq!(book.update_base("dave").unwrap(), trailing_policy(1.0));
    }

    #[test]
    fn update_base_defaults_when_missing_and_propagates_store_errors() {
        let book = PolicyBook::new(MemoryStore::default());
        assert_eq!(book.update_base("erin").unwrap(), RiskPolicy::default());

        let failing = PolicyBook::new(MemoryStore {
            fail_reads: true,
            ..MemoryStore::default()
        });
        assert!(matches!(
            failing.update_base("erin").unwrap_err(),
            TradeguardError::SettingsIo { .. }
        ));
    }

    #[test]
    fn writer_stripes_are_bounded_and_stable() {
        for i in 0..1000 {
            let user = format!("user-{i}");
            let stripe = writer_stripe(&user);
            assert!(stripe < WRITER_STRIPES);
            assert_eq!(stripe, writer_stripe(&user));
        }
    }

    #[test]
    fn many_users_update_concurrently() {
        let book = PolicyBook::new(MemoryStore::default());
        std::thread::scope(|s| {
            for t in 0..4 {
                let book = &book;
                s.spawn(move || {
                    for i in 0..50 {
                        let user = format!("user-{t}-{i}");
                        book.update(&user, trailing_policy(1.0 + i as f64)).unwrap();
                    }
                });
            }
        });
        assert_eq!(book.store().policies.lock().unwrap().len(), 200);
        assert_eq!(
            *book.get("user-3-49").unwrap(),
            trailing_policy(50.0)
        );
    }
}
