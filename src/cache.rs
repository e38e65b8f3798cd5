//! Bounded instance cache with cost-based retention.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::route::ParsedRoute;

/// Snapshot of the cache's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_cost: u32,
    pub budget: u32,
}

struct CacheEntry {
    route: ParsedRoute,
    /// Monotonic offer stamp; smaller means offered longer ago.
    stamp: u64,
}

/// Store of retired-but-reusable parsed routes, keyed by `(name, data id)`.
///
/// Total retained cost never exceeds the configured budget. Hits are
/// consumed: `try_take` moves the entry back to stack ownership. Eviction is
/// least-recently-offered first, preferring to keep entries whose data id is
/// still referenced by the live stack; dropping an entry releases its view
/// handle.
pub(crate) struct ViewCache {
    entries: HashMap<(String, Option<u32>), CacheEntry>,
    budget: u32,
    total_cost: u32,
    clock: u64,
}

impl ViewCache {
    pub fn new(budget: u32) -> Self {
        Self {
            entries: HashMap::new(),
            budget,
            total_cost: 0,
            clock: 0,
        }
    }

    /// Remove and return the cached entry for `(name, data_id)`, if present.
    pub fn try_take(&mut self, name: &str, data_id: Option<u32>) -> Option<ParsedRoute> {
        let key = (name.to_string(), data_id);
        let entry = self.entries.remove(&key)?;
        self.total_cost -= entry.route.cost;
        log::debug!("Cache hit for route '{name}' (data id: {data_id:?})");
        Some(entry.route)
    }

    /// Insert a retired route, evicting until the budget holds.
    ///
    /// Non-cacheable routes are dropped: callers are expected to destroy
    /// those instead of offering them. A route whose cost alone exceeds the
    /// budget is never admitted. `active_data_ids` are the data ids
    /// referenced by the live stack; their entries are preferred to survive
    /// eviction.
    pub fn offer(&mut self, route: ParsedRoute, active_data_ids: &HashSet<u32>) {
        if !route.cacheable {
            log::warn!("Dropping non-cacheable route '{}' offered to the cache", route.name);
            return;
        }
        if route.cost > self.budget {
            log::debug!(
                "Route '{}' (cost {}) exceeds the cache budget of {}, dropping",
                route.name,
                route.cost,
                self.budget
            );
            return;
        }

        let key = (route.name.clone(), route.data_id);
        if let Some(previous) = self.entries.remove(&key) {
            // Keep the newest instance for a key.
            self.total_cost -= previous.route.cost;
        }

        self.clock += 1;
        self.total_cost += route.cost;
        self.entries.insert(
            key,
            CacheEntry {
                route,
                stamp: self.clock,
            },
        );

        self.evict_to_budget(active_data_ids);
    }

    /// Evict everything; used on full teardown.
    pub fn clear(&mut self) {
        let evicted = self.entries.len();
        self.entries.clear();
        self.total_cost = 0;
        if evicted > 0 {
            log::debug!("Cleared {evicted} cached route instances");
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            total_cost: self.total_cost,
            budget: self.budget,
        }
    }

    fn evict_to_budget(&mut self, active_data_ids: &HashSet<u32>) {
        while self.total_cost > self.budget {
            // First pass skips entries still referencing live data ids; the
            // budget is a hard cap, so a second pass takes anything.
            let victim = self
                .oldest_key(|entry| {
                    entry
                        .route
                        .data_id
                        .is_none_or(|id| !active_data_ids.contains(&id))
                })
                .or_else(|| self.oldest_key(|_| true));

            let Some(key) = victim else { break };
            if let Some(entry) = self.entries.remove(&key) {
                self.total_cost -= entry.route.cost;
                log::debug!(
                    "Evicted route '{}' (data id: {:?}, cost {}) from the cache",
                    entry.route.name,
                    entry.route.data_id,
                    entry.route.cost
                );
            }
        }
    }

    fn oldest_key(&self, eligible: impl Fn(&CacheEntry) -> bool) -> Option<(String, Option<u32>)> {
        self.entries
            .iter()
            .filter(|(_, entry)| eligible(entry))
            .min_by_key(|(_, entry)| entry.stamp)
            .map(|(key, _)| key.clone())
    }
}
