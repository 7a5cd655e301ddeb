//! Parameter Store
//!
//! Source of truth for the user-editable filter parameters. Any thread may
//! write; readers take a whole [`FilterParameters`] snapshot so they never
//! see a half-applied edit. Writers notify registered
//! [`ParameterObserver`]s after the lock is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use contour_dsp::{ChainPosition, FilterParameters};

/// Notified after every write that changed a parameter
///
/// Called on the writing thread; implementations must not block.
pub trait ParameterObserver: Send + Sync {
    fn parameters_changed(&self);
}

/// Dirty flag set by parameter changes and consumed by the coordinator
///
/// `take()` clears with a compare-exchange, so a change that lands while the
/// previous one is being handled sets the flag again and is picked up on the
/// next tick.
#[derive(Debug)]
pub struct ChangeFlag {
    changed: AtomicBool,
}

impl ChangeFlag {
    pub fn new(initially_set: bool) -> Self {
        Self {
            changed: AtomicBool::new(initially_set),
        }
    }

    pub fn mark(&self) {
        self.changed.store(true, Ordering::Release);
    }

    /// Returns true exactly once per batch of marks
    pub fn take(&self) -> bool {
        self.changed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }
}

impl Default for ChangeFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ParameterObserver for ChangeFlag {
    fn parameters_changed(&self) {
        self.mark();
    }
}

/// Shared, lock-protected parameter state (never touched by the audio thread)
pub struct ParameterStore {
    params: RwLock<FilterParameters>,
    observers: RwLock<Vec<Arc<dyn ParameterObserver>>>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(FilterParameters::default())
    }
}

impl ParameterStore {
    pub fn new(params: FilterParameters) -> Self {
        Self {
            params: RwLock::new(params.clamped()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Consistent copy of every parameter
    pub fn snapshot(&self) -> FilterParameters {
        *self.params.read()
    }

    pub fn analyzer_enabled(&self) -> bool {
        self.params.read().analyzer_enabled
    }

    pub fn subscribe(&self, observer: Arc<dyn ParameterObserver>) {
        self.observers.write().push(observer);
    }

    /// Edit the parameters in one step. Values are clamped into range.
    ///
    /// Returns whether anything changed; observers are only notified if so.
    pub fn update<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&mut FilterParameters),
    {
        let changed = {
            let mut params = self.params.write();
            let mut next = *params;
            edit(&mut next);
            let next = next.clamped();
            let changed = next != *params;
            *params = next;
            changed
        };

        if changed {
            self.notify();
        }
        changed
    }

    /// Replace every parameter (e.g. when the host restores a session)
    pub fn replace(&self, params: FilterParameters) -> bool {
        self.update(|p| *p = params)
    }

    pub fn set_analyzer_enabled(&self, enabled: bool) -> bool {
        self.update(|p| p.analyzer_enabled = enabled)
    }

    pub fn set_bypassed(&self, position: ChainPosition, bypassed: bool) -> bool {
        self.update(|p| match position {
            ChainPosition::LowCut => p.low_cut_bypassed = bypassed,
            ChainPosition::Peak => p.peak_bypassed = bypassed,
            ChainPosition::HighCut => p.high_cut_bypassed = bypassed,
        })
    }

    fn notify(&self) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.parameters_changed();
        }
    }
}
