/*! Per-procedure analysis result cache.
 *
 * Dependence graphs and slices are pure functions of a procedure, so repeated requests
 * (dump plus report, several subgraphs sharing a callee) can reuse the first result.
 * Values hand out as `Arc` clones; statistics make cache behavior observable in tests.
 */

use std::collections::HashMap;
use std::sync::Arc;

use crate::ir::ProcId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStatistics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache of one analysis kind, keyed by procedure.
#[derive(Debug)]
pub struct AnalysisCache<T> {
    entries: HashMap<ProcId, Arc<T>>,
    stats: CacheStatistics,
}

impl<T> AnalysisCache<T> {
    pub fn new() -> AnalysisCache<T> {
        AnalysisCache {
            entries: HashMap::new(),
            stats: CacheStatistics::default(),
        }
    }

    pub fn get(&mut self, proc: ProcId) -> Option<Arc<T>> {
        match self.entries.get(&proc) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Borrow a cached value without touching the hit/miss accounting.
    pub fn peek(&self, proc: ProcId) -> Option<&T> {
        self.entries.get(&proc).map(|value| value.as_ref())
    }

    /// Return the cached value or compute, store, and return it. A failing compute is not
    /// cached; the next request retries.
    pub fn get_or_try_insert<E>(
        &mut self,
        proc: ProcId,
        compute: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<Arc<T>, E> {
        if let Some(value) = self.entries.get(&proc) {
            self.stats.hits += 1;
            return Ok(value.clone());
        }
        self.stats.misses += 1;
        let value = Arc::new(compute()?);
        self.entries.insert(proc, value.clone());
        Ok(value)
    }

    pub fn insert(&mut self, proc: ProcId, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.insert(proc, value.clone());
        value
    }

    pub fn invalidate(&mut self, proc: ProcId) -> bool {
        self.entries.remove(&proc).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for AnalysisCache<T> {
    fn default() -> AnalysisCache<T> {
        AnalysisCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn computes_once_then_hits() {
        let mut cache: AnalysisCache<u32> = AnalysisCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let value = cache
                .get_or_try_insert(ProcId(0), || {
                    calls += 1;
                    Ok::<u32, ()>(7)
                })
                .expect("computes");
            assert_eq!(*value, 7);
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.statistics().hits, 2);
        assert_eq!(cache.statistics().misses, 1);
    }

    #[test]
    fn failing_compute_is_not_cached() {
        let mut cache: AnalysisCache<u32> = AnalysisCache::new();
        assert!(cache
            .get_or_try_insert(ProcId(0), || Err::<u32, &str>("boom"))
            .is_err());
        let value = cache
            .get_or_try_insert(ProcId(0), || Ok::<u32, &str>(1))
            .expect("retries");
        assert_eq!(*value, 1);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let mut cache: AnalysisCache<u32> = AnalysisCache::new();
        cache.insert(ProcId(4), 9);
        assert!(cache.invalidate(ProcId(4)));
        assert!(!cache.invalidate(ProcId(4)));
        assert!(cache.get(ProcId(4)).is_none());
    }

    #[test]
    fn hit_rate_tracks_lookups() {
        let mut cache: AnalysisCache<u32> = AnalysisCache::new();
        cache.insert(ProcId(1), 1);
        let _ = cache.get(ProcId(1));
        let _ = cache.get(ProcId(2));
        assert_eq!(cache.statistics().hit_rate(), 0.5);
    }
}
