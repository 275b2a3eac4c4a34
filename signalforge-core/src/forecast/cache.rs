//! Trained-model caching, keyed by `ModelKey` (symbol + content fingerprint).
//!
//! The cache is an injected capability: the pipeline never holds global
//! state. `NoopModelCache` trains on every request; `InMemoryModelCache`
//! keeps one slot per key and guarantees that concurrent requests for the
//! same key train at most once.
//!
//! Training that runs inside a slot initializer must not submit work to the
//! rayon pool: pool workers may be blocked on that very slot. `filling_slot`
//! tells the model code when it is in that position.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use super::ensemble::FittedModels;
use super::FitError;
use crate::fingerprint::ModelKey;

/// Outcome of a training run. Failures are cached like successes.
pub type ModelFit = Result<Arc<FittedModels>, FitError>;

thread_local! {
    static FILLING: Cell<bool> = const { Cell::new(false) };
}

/// True while the current thread is training inside a cache slot initializer.
pub(crate) fn filling_slot() -> bool {
    FILLING.with(Cell::get)
}

/// Marks the current thread as filling a slot until dropped.
struct FillGuard {
    previous: bool,
}

impl FillGuard {
    fn enter() -> Self {
        Self {
            previous: FILLING.with(|f| f.replace(true)),
        }
    }
}

impl Drop for FillGuard {
    fn drop(&mut self) {
        FILLING.with(|f| f.set(self.previous));
    }
}

pub trait ModelCache: Send + Sync {
    fn get(&self, key: &ModelKey) -> Option<ModelFit>;

    fn put(&self, key: ModelKey, fit: ModelFit);

    /// Return the cached fit for `key`, training with `fit` on a miss.
    fn get_or_fit(&self, key: &ModelKey, fit: &dyn Fn() -> ModelFit) -> ModelFit {
        if let Some(hit) = self.get(key) {
            return hit;
        }
        let fitted = fit();
        self.put(key.clone(), fitted.clone());
        fitted
    }
}

/// Never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopModelCache;

impl ModelCache for NoopModelCache {
    fn get(&self, _key: &ModelKey) -> Option<ModelFit> {
        None
    }

    fn put(&self, _key: ModelKey, _fit: ModelFit) {}
}

/// Unbounded in-process cache with single-flight training per key.
#[derive(Debug, Default)]
pub struct InMemoryModelCache {
    slots: Mutex<HashMap<ModelKey, Arc<OnceLock<ModelFit>>>>,
    trainings: AtomicUsize,
}

impl InMemoryModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of training runs executed through `get_or_fit`.
    pub fn trainings(&self) -> usize {
        self.trainings.load(Ordering::SeqCst)
    }

    /// Number of keys holding a finished fit.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ModelKey, Arc<OnceLock<ModelFit>>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, key: &ModelKey) -> Arc<OnceLock<ModelFit>> {
        Arc::clone(self.lock().entry(key.clone()).or_default())
    }
}

impl ModelCache for InMemoryModelCache {
    fn get(&self, key: &ModelKey) -> Option<ModelFit> {
        self.lock().get(key).and_then(|slot| slot.get().cloned())
    }

    fn put(&self, key: ModelKey, fit: ModelFit) {
        let _ = self.slot(&key).set(fit);
    }

    fn get_or_fit(&self, key: &ModelKey, fit: &dyn Fn() -> ModelFit) -> ModelFit {
        // The map lock is released before training; waiters block on the slot.
        let slot = self.slot(key);
        slot.get_or_init(|| {
            self.trainings.fetch_add(1, Ordering::SeqCst);
            let _filling = FillGuard::enter();
            fit()
        })
        .clone()
    }
}
