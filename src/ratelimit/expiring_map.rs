use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct Expiring<V> {
    value: V,
    last_touch: Instant,
}

/// Concurrent map whose entries lapse after sitting idle.
///
/// Updates run under the entry's shard lock, so a read-modify-write on a
/// single key is atomic without any map-wide lock. Expiry is amortized:
/// every `sweep_every` updates, entries idle longer than `idle_horizon` are
/// dropped. There is no background task.
pub struct ExpiringMap<K, V> {
    entries: DashMap<K, Expiring<V>>,
    idle_horizon: Duration,
    sweep_every: u64,
    ops: AtomicU64,
}

impl<K: Eq + Hash, V> ExpiringMap<K, V> {
    pub fn new(idle_horizon: Duration, sweep_every: u64) -> Self {
        Self {
            entries: DashMap::new(),
            idle_horizon,
            sweep_every: sweep_every.max(1),
            ops: AtomicU64::new(0),
        }
    }

    /// Atomically updates (or inserts) the entry for `key`, refreshing its
    /// idle clock.
    pub fn update<T>(
        &self,
        key: K,
        init: impl FnOnce() -> V,
        apply: impl FnOnce(&mut V) -> T,
    ) -> T {
        self.update_at(key, Instant::now(), init, apply)
    }

    pub fn update_at<T>(
        &self,
        key: K,
        now: Instant,
        init: impl FnOnce() -> V,
        apply: impl FnOnce(&mut V) -> T,
    ) -> T {
        let out = {
            let mut entry = self.entries.entry(key).or_insert_with(|| Expiring {
                value: init(),
                last_touch: now,
            });
            entry.last_touch = now;
            apply(&mut entry.value)
        };
        // The entry guard must be gone before the sweep takes shard locks.
        self.maybe_sweep(now);
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn maybe_sweep(&self, now: Instant) {
        let ops = self.ops.fetch_add(1, Ordering::Relaxed) + 1;
        if ops % self.sweep_every != 0 {
            return;
        }
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.last_touch) <= self.idle_horizon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_inserts_then_mutates() {
        let map: ExpiringMap<&str, u32> = ExpiringMap::new(Duration::from_secs(60), 1000);
        let v = map.update(
            "a",
            || 0,
            |n| {
                *n += 1;
                *n
            },
        );
        assert_eq!(v, 1);
        let v = map.update(
            "a",
            || 0,
            |n| {
                *n += 1;
                *n
            },
        );
        assert_eq!(v, 2);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn idle_entries_are_swept() {
        let map: ExpiringMap<&str, u32> = ExpiringMap::new(Duration::from_secs(10), 1);
        let t0 = Instant::now();
        map.update_at("old", t0, || 7, |_| ());
        // Touching another key past the horizon piggybacks the sweep.
        map.update_at("new", t0 + Duration::from_secs(11), || 0, |_| ());
        assert_eq!(map.len(), 1);
        // "old" was dropped, so its init runs again.
        let v = map.update_at("old", t0 + Duration::from_secs(11), || 99, |n| *n);
        assert_eq!(v, 99);
    }

    #[test]
    fn touched_entries_survive_the_sweep() {
        let map: ExpiringMap<&str, u32> = ExpiringMap::new(Duration::from_secs(10), 1);
        let t0 = Instant::now();
        for step in 0..4 {
            map.update_at(
                "a",
                t0 + Duration::from_secs(step * 6),
                || 0,
                |n| *n += 1,
            );
        }
        let v = map.update_at("a", t0 + Duration::from_secs(24), || 0, |n| *n);
        assert_eq!(v, 4);
    }

    #[test]
    fn sweep_runs_every_nth_update() {
        let map: ExpiringMap<&str, u32> = ExpiringMap::new(Duration::from_secs(10), 4);
        let t0 = Instant::now();
        map.update_at("old", t0, || 0, |_| ());
        let late = t0 + Duration::from_secs(20);
        map.update_at("b", late, || 0, |_| ());
        map.update_at("b", late, || 0, |_| ());
        // Three updates so far; "old" is overdue but unswept.
        assert_eq!(map.len(), 2);
        map.update_at("b", late, || 0, |_| ());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn concurrent_updates_do_not_lose_increments() {
        let map: ExpiringMap<u32, u64> = ExpiringMap::new(Duration::from_secs(60), 1_000_000);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        map.update(7, || 0, |n| *n += 1);
                    }
                });
            }
        });
        let total = map.update(7, || 0, |n| *n);
        assert_eq!(total, 8000);
    }
}
