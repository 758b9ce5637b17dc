//! Pending-request registry.
//!
//! Correlates a later asynchronous response with the continuation that
//! issued the original request. Every entry is keyed by a semantic kind plus
//! a generated id; the id only keeps many outstanding requests of the same
//! kind apart, matching is done on the kind alone.
//!
//! Firing removes the entry under the lock and runs the continuation after
//! the lock is released, so a continuation may register chained entries and
//! no entry can fire twice.
//!
//! Keys come in two flavours. A `PendingRegistry<String, Callback>` matches
//! by command-name prefix and fires boxed callbacks with the raw payload via
//! [`PendingRegistry::complete`]; a frame's name comes from
//! [`crate::DispatchTable::lookup`]. The engine parks typed discovery
//! workflows under [`crate::ResponseKind`] instead and drives them itself.
//!
//! There is no cap and no implicit expiry. A request whose response never
//! arrives stays registered until [`PendingRegistry::sweep_expired`] removes
//! it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Decides whether an incoming semantic name completes a registered entry.
pub trait Correlate {
    /// `self` is the registered kind, `incoming` the name computed for a
    /// received frame.
    fn completed_by(&self, incoming: &Self) -> bool;
}

/// Name-prefix correlation: `"AB"` is completed by `"A"`.
///
/// An empty incoming name completes nothing.
impl Correlate for String {
    fn completed_by(&self, incoming: &Self) -> bool {
        !incoming.is_empty() && self.starts_with(incoming.as_str())
    }
}

/// Identity of one registered entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingKey<K> {
    pub kind: K,
    pub id: u64,
}

impl<K: fmt::Display> fmt::Display for PendingKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.id)
    }
}

/// An entry removed from the registry by a matching response.
#[derive(Debug)]
pub struct Fired<K, C> {
    pub key: PendingKey<K>,
    pub continuation: C,
    /// Time between registration and firing.
    pub waited: Duration,
}

/// Boxed one-shot callback receiving the response payload.
pub type Callback = Box<dyn FnOnce(&[u8]) + Send>;

struct Entry<K, C> {
    kind: K,
    continuation: C,
    registered_at: Instant,
}

struct Slots<K, C> {
    entries: BTreeMap<u64, Entry<K, C>>,
    next_id: u64,
}

/// Mutex-guarded map from correlation key to one-shot continuation.
pub struct PendingRegistry<K, C> {
    inner: Mutex<Slots<K, C>>,
}

impl<K, C> PendingRegistry<K, C> {
    /// Create an empty registry. Ids start from 1.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Slots {
                entries: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots<K, C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of outstanding entries.
    pub fn len(&self) -> usize {
        self.slots().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, C> Default for PendingRegistry<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, C> fmt::Debug for PendingRegistry<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRegistry")
            .field("pending", &self.len())
            .finish()
    }
}

impl<K: Correlate + Clone, C> PendingRegistry<K, C> {
    /// Store a continuation under `kind` and return its key.
    pub fn register(&self, kind: K, continuation: C) -> PendingKey<K> {
        let mut slots = self.slots();
        let id = slots.next_id;
        slots.next_id += 1;
        slots.entries.insert(
            id,
            Entry {
                kind: kind.clone(),
                continuation,
                registered_at: Instant::now(),
            },
        );
        PendingKey { kind, id }
    }

    /// Remove and return every entry completed by `incoming`.
    ///
    /// The order of the returned entries is unspecified.
    pub fn dispatch(&self, incoming: &K) -> Vec<Fired<K, C>> {
        let mut slots = self.slots();
        let ids: Vec<u64> = slots
            .entries
            .iter()
            .filter(|(_, entry)| entry.kind.completed_by(incoming))
            .map(|(id, _)| *id)
            .collect();

        ids.into_iter()
            .filter_map(|id| slots.entries.remove(&id).map(|entry| fired(id, entry)))
            .collect()
    }

    /// Remove and return only the longest-waiting entry completed by
    /// `incoming`.
    pub fn dispatch_oldest(&self, incoming: &K) -> Option<Fired<K, C>> {
        let mut slots = self.slots();
        let id = slots
            .entries
            .iter()
            .find(|(_, entry)| entry.kind.completed_by(incoming))
            .map(|(id, _)| *id)?;
        slots.entries.remove(&id).map(|entry| fired(id, entry))
    }

    /// Remove entries registered at least `max_age` ago.
    pub fn sweep_expired(&self, max_age: Duration) -> Vec<PendingKey<K>> {
        let mut slots = self.slots();
        let ids: Vec<u64> = slots
            .entries
            .iter()
            .filter(|(_, entry)| entry.registered_at.elapsed() >= max_age)
            .map(|(id, _)| *id)
            .collect();

        ids.into_iter()
            .filter_map(|id| {
                slots
                    .entries
                    .remove(&id)
                    .map(|entry| PendingKey { kind: entry.kind, id })
            })
            .collect()
    }

    /// Keys of all outstanding entries, oldest first.
    pub fn keys(&self) -> Vec<PendingKey<K>> {
        self.slots()
            .entries
            .iter()
            .map(|(id, entry)| PendingKey {
                kind: entry.kind.clone(),
                id: *id,
            })
            .collect()
    }
}

impl<K, F> PendingRegistry<K, F>
where
    K: Correlate + Clone,
    F: FnOnce(&[u8]),
{
    /// Fire every callback completed by `incoming` with `payload`.
    ///
    /// Returns how many callbacks ran. Callbacks run after the registry lock
    /// is released.
    pub fn complete(&self, incoming: &K, payload: &[u8]) -> usize {
        let fired = self.dispatch(incoming);
        let count = fired.len();
        for entry in fired {
            (entry.continuation)(payload);
        }
        count
    }
}

fn fired<K, C>(id: u64, entry: Entry<K, C>) -> Fired<K, C> {
    Fired {
        key: PendingKey {
            kind: entry.kind,
            id,
        },
        continuation: entry.continuation,
        waited: entry.registered_at.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    type NameRegistry = PendingRegistry<String, Callback>;

    fn counting(counter: &Arc<AtomicUsize>) -> Callback {
        let counter = Arc::clone(counter);
        Box::new(move |_payload| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn prefix_correlation_fires_every_match_once() {
        let registry = NameRegistry::new();
        let a1 = Arc::new(AtomicUsize::new(0));
        let a2 = Arc::new(AtomicUsize::new(0));
        let ab = Arc::new(AtomicUsize::new(0));

        registry.register("A".to_string(), counting(&a1));
        registry.register("A".to_string(), counting(&a2));
        registry.register("AB".to_string(), counting(&ab));

        assert_eq!(registry.complete(&"A".to_string(), &[0x01]), 3);
        assert_eq!(a1.load(Ordering::SeqCst), 1);
        assert_eq!(a2.load(Ordering::SeqCst), 1);
        assert_eq!(ab.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn second_dispatch_is_noop() {
        let registry = NameRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        registry.register("UTIL_ASSOC_COUNT".to_string(), counting(&hits));

        let name = "UTIL_ASSOC_COUNT".to_string();
        assert_eq!(registry.complete(&name, &[]), 1);
        assert_eq!(registry.complete(&name, &[]), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn longer_incoming_name_does_not_match_shorter_entry() {
        let registry = NameRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        registry.register("A".to_string(), counting(&hits));

        assert_eq!(registry.complete(&"AB".to_string(), &[]), 0);
        assert_eq!(registry.complete(&"B".to_string(), &[]), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_name_completes_nothing() {
        let registry = NameRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        registry.register("ZDO_ACTIVE_EP_REQ".to_string(), counting(&hits));

        assert_eq!(registry.complete(&String::new(), &[]), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn callback_receives_payload() {
        let registry = NameRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.register(
            "LOOKUP".to_string(),
            Box::new(move |payload: &[u8]| sink.lock().unwrap().extend_from_slice(payload)),
        );

        registry.complete(&"LOOKUP".to_string(), &[0xAA, 0xBB]);
        assert_eq!(*seen.lock().unwrap(), vec![0xAA, 0xBB]);
    }

    #[test]
    fn continuation_can_register_chained_entry() {
        let registry: Arc<NameRegistry> = Arc::new(PendingRegistry::new());
        let done = Arc::new(AtomicUsize::new(0));

        let chained = Arc::clone(&registry);
        let done_in_chain = Arc::clone(&done);
        registry.register(
            "FIRST".to_string(),
            Box::new(move |_| {
                chained.register("SECOND".to_string(), counting(&done_in_chain));
            }),
        );

        assert_eq!(registry.complete(&"FIRST".to_string(), &[]), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.keys()[0].kind, "SECOND");

        assert_eq!(registry.complete(&"SECOND".to_string(), &[]), 1);
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn dispatch_oldest_takes_lowest_id() {
        let registry: PendingRegistry<String, &'static str> = PendingRegistry::new();
        registry.register("LOOKUP".to_string(), "first");
        registry.register("LOOKUP".to_string(), "second");

        let fired = registry.dispatch_oldest(&"LOOKUP".to_string()).unwrap();
        assert_eq!(fired.continuation, "first");
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.dispatch_oldest(&"LOOKUP".to_string()).unwrap().continuation,
            "second"
        );
        assert!(registry.dispatch_oldest(&"LOOKUP".to_string()).is_none());
    }

    #[test]
    fn keys_render_kind_and_id() {
        let registry: PendingRegistry<String, ()> = PendingRegistry::new();
        let first = registry.register("A".to_string(), ());
        let second = registry.register("A".to_string(), ());

        assert_eq!(first.to_string(), "A-1");
        assert_eq!(second.to_string(), "A-2");
        assert_ne!(first, second);
    }

    #[test]
    fn sweep_removes_only_expired() {
        let registry: PendingRegistry<String, ()> = PendingRegistry::new();
        registry.register("A".to_string(), ());
        registry.register("B".to_string(), ());

        assert!(registry.sweep_expired(Duration::from_secs(3600)).is_empty());
        assert_eq!(registry.len(), 2);

        let expired = registry.sweep_expired(Duration::ZERO);
        assert_eq!(expired.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_registration_assigns_unique_ids() {
        let registry: Arc<PendingRegistry<String, ()>> = Arc::new(PendingRegistry::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| registry.register("A".to_string(), ()).id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for worker in workers {
            for id in worker.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(registry.len(), 400);
        assert_eq!(registry.dispatch(&"A".to_string()).len(), 400);
    }
}
