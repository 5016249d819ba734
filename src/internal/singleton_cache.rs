//! Three-tier singleton cache.
//!
//! Tier 1 holds finished beans, tier 2 holds early references handed out to
//! a dependency cycle, and tier 3 holds deferred factories producing those
//! early references. A name lives in at most one tier, and entries only
//! move upwards (3 -> 2 -> 1) until a failed creation evicts them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::ContainerResult;
use crate::traits::Object;

/// Deferred producer of the early reference for a bean in creation.
pub(crate) type EarlyFactory = Arc<dyn Fn() -> ContainerResult<Object> + Send + Sync>;

#[derive(Default)]
pub(crate) struct SingletonCache {
    tiers: Mutex<Tiers>,
}

#[derive(Default)]
struct Tiers {
    finished: HashMap<String, Object>,
    finished_order: Vec<String>,
    early: HashMap<String, Object>,
    factories: HashMap<String, EarlyFactory>,
}

impl Tiers {
    fn lookup(&self, name: &str) -> Option<Object> {
        self.finished
            .get(name)
            .or_else(|| self.early.get(name))
            .cloned()
    }
}

impl SingletonCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Tier 1 only. Safe for any caller.
    pub(crate) fn get_finished(&self, name: &str) -> Option<Object> {
        self.tiers.lock().finished.get(name).cloned()
    }

    /// Tier 2 only.
    pub(crate) fn get_early(&self, name: &str) -> Option<Object> {
        self.tiers.lock().early.get(name).cloned()
    }

    /// Looks through tiers 1, 2 and 3 in order. A tier-3 hit runs the
    /// factory outside the lock, then moves the result into tier 2.
    ///
    /// Only callers taking part in the creation of `name` may see tiers 2
    /// and 3, so this must be called with the creation lock held.
    pub(crate) fn get(&self, name: &str) -> ContainerResult<Option<Object>> {
        let factory = {
            let tiers = self.tiers.lock();
            if let Some(hit) = tiers.lookup(name) {
                return Ok(Some(hit));
            }
            match tiers.factories.get(name) {
                Some(factory) => factory.clone(),
                None => return Ok(None),
            }
        };

        let early = factory()?;

        let mut tiers = self.tiers.lock();
        if let Some(hit) = tiers.lookup(name) {
            return Ok(Some(hit));
        }
        if tiers.factories.remove(name).is_none() {
            // Creation failed and cleaned up while the factory ran.
            return Ok(None);
        }
        trace!(bean = %name, "promoted early factory to early reference");
        tiers.early.insert(name.to_string(), early.clone());
        Ok(Some(early))
    }

    /// Installs a tier-3 factory unless `name` is already present in any tier.
    pub(crate) fn register_early_factory(&self, name: &str, factory: EarlyFactory) -> bool {
        let mut tiers = self.tiers.lock();
        if tiers.finished.contains_key(name)
            || tiers.early.contains_key(name)
            || tiers.factories.contains_key(name)
        {
            return false;
        }
        tiers.factories.insert(name.to_string(), factory);
        true
    }

    /// Installs `object` into tier 1 and purges tiers 2 and 3 for `name`.
    pub(crate) fn promote_to_finished(&self, name: &str, object: Object) {
        let mut tiers = self.tiers.lock();
        tiers.early.remove(name);
        tiers.factories.remove(name);
        if tiers.finished.insert(name.to_string(), object).is_none() {
            tiers.finished_order.push(name.to_string());
        }
    }

    /// Drops the tier-2 and tier-3 entries of a failed creation.
    pub(crate) fn remove_early(&self, name: &str) {
        let mut tiers = self.tiers.lock();
        tiers.early.remove(name);
        tiers.factories.remove(name);
    }

    /// Evicts a finished bean. Returns whether it was cached.
    pub(crate) fn remove_finished(&self, name: &str) -> bool {
        let mut tiers = self.tiers.lock();
        if tiers.finished.remove(name).is_none() {
            return false;
        }
        tiers.finished_order.retain(|n| n != name);
        true
    }

    pub(crate) fn contains_finished(&self, name: &str) -> bool {
        self.tiers.lock().finished.contains_key(name)
    }

    /// Whether `name` has an early factory or early reference outstanding.
    pub(crate) fn is_in_creation(&self, name: &str) -> bool {
        let tiers = self.tiers.lock();
        tiers.early.contains_key(name) || tiers.factories.contains_key(name)
    }

    /// Finished beans in the order they were completed.
    pub(crate) fn finished_entries(&self) -> Vec<(String, Object)> {
        let tiers = self.tiers.lock();
        tiers
            .finished_order
            .iter()
            .filter_map(|name| tiers.finished.get(name).map(|obj| (name.clone(), obj.clone())))
            .collect()
    }

    pub(crate) fn clear(&self) {
        let mut tiers = self.tiers.lock();
        tiers.finished.clear();
        tiers.finished_order.clear();
        tiers.early.clear();
        tiers.factories.clear();
    }
}
