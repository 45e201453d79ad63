//! Per-run result cache feeding reference resolution.
//!
//! Written by the post-dispatch step (successful results only), read by the
//! resolver. Runs are evicted eagerly via `finish_run` or lazily once idle
//! longer than the configured TTL, so runs that never signal completion
//! cannot leak.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

struct RunEntry {
    results: HashMap<String, Value>,
    touched: Instant,
}

pub struct ResultCache {
    inner: Mutex<HashMap<String, RunEntry>>,
    idle_ttl: Duration,
}

impl ResultCache {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Records the last successful result for `(run_id, node_id)`.
    pub fn record(&self, run_id: &str, node_id: &str, value: Value) {
        let mut g = self.inner.lock().unwrap();
        Self::evict_idle(&mut g, self.idle_ttl);
        let entry = g.entry(run_id.to_string()).or_insert_with(|| RunEntry {
            results: HashMap::new(),
            touched: Instant::now(),
        });
        entry.touched = Instant::now();
        entry.results.insert(node_id.to_string(), value);
    }

    /// Looks up a recorded result, refreshing the run's idle stamp.
    pub fn lookup(&self, run_id: &str, node_id: &str) -> Option<Value> {
        let mut g = self.inner.lock().unwrap();
        let expired = g.get(run_id)?.touched.elapsed() > self.idle_ttl;
        if expired {
            g.remove(run_id);
            return None;
        }
        let entry = g.get_mut(run_id).expect("checked above");
        entry.touched = Instant::now();
        entry.results.get(node_id).cloned()
    }

    /// Evicts a finished run. Returns whether anything was recorded for it.
    pub fn finish_run(&self, run_id: &str) -> bool {
        self.inner.lock().unwrap().remove(run_id).is_some()
    }

    pub fn run_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    fn evict_idle(g: &mut HashMap<String, RunEntry>, ttl: Duration) {
        g.retain(|_, entry| entry.touched.elapsed() <= ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_lookup() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.record("r1", "a", serde_json::json!({"result": 7}));
        assert_eq!(
            cache.lookup("r1", "a"),
            Some(serde_json::json!({"result": 7}))
        );
        assert_eq!(cache.lookup("r1", "missing"), None);
        assert_eq!(cache.lookup("r2", "a"), None);
    }

    #[test]
    fn later_results_replace_earlier_ones() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.record("r1", "a", serde_json::json!(1));
        cache.record("r1", "a", serde_json::json!(2));
        assert_eq!(cache.lookup("r1", "a"), Some(serde_json::json!(2)));
    }

    #[test]
    fn finish_run_evicts() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.record("r1", "a", serde_json::json!(1));
        assert!(cache.finish_run("r1"));
        assert!(!cache.finish_run("r1"));
        assert_eq!(cache.lookup("r1", "a"), None);
        assert_eq!(cache.run_count(), 0);
    }

    #[test]
    fn idle_runs_expire() {
        let cache = ResultCache::new(Duration::from_millis(20));
        cache.record("r1", "a", serde_json::json!(1));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.lookup("r1", "a"), None);

        // A write from another run sweeps expired entries too.
        cache.record("r1", "a", serde_json::json!(1));
        std::thread::sleep(Duration::from_millis(40));
        cache.record("r2", "b", serde_json::json!(2));
        assert_eq!(cache.run_count(), 1);
    }
}
