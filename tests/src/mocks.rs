//! In-memory stand-ins for the broker, the stores and the lookup services.
//!
//! Each mock implements the same trait as its production counterpart, so
//! the pipeline under test runs exactly the code it runs against Redpanda
//! and ClickHouse.

use async_trait::async_trait;
use engine_core::error::{BrokerErrorCode, DbErrorCode};
use engine_core::{
    Address, CacheEntry, EnrichmentResult, Error, NameRecord, ProfileFact, Result, Source,
};
use parking_lot::Mutex;
use redpanda::{AddressPublisher, Delivery, GroupConsumer, Heartbeat, PublishResult, TopicRole};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use worker::sources::NameResolver;
use worker::EnrichmentSource;

use clickhouse_client::{CacheStore, FactStore, NameStore};

/// Store that keeps rows keyed the way the ClickHouse tables are.
#[derive(Default)]
pub struct MemoryStore {
    cache: Mutex<HashMap<(Address, Source), CacheEntry>>,
    facts: Mutex<HashMap<(Address, String), ProfileFact>>,
    names: Mutex<HashMap<(Address, String), NameRecord>>,
    name_writes: Mutex<Vec<Vec<NameRecord>>>,
    fail_facts: AtomicBool,
    fail_cache_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn cache_entry(&self, address: &Address, source: Source) -> Option<CacheEntry> {
        self.cache.lock().get(&(address.clone(), source)).cloned()
    }

    pub fn facts(&self) -> Vec<ProfileFact> {
        self.facts.lock().values().cloned().collect()
    }

    pub fn fact_count(&self) -> usize {
        self.facts.lock().len()
    }

    /// Every record for `address`, oldest first.
    pub fn names_of(&self, address: &Address) -> Vec<NameRecord> {
        let mut records: Vec<NameRecord> = self
            .names
            .lock()
            .values()
            .filter(|r| &r.address == address)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.valid_from);
        records
    }

    /// The currently valid name of `address`.
    pub fn current_name(&self, address: &Address) -> Option<String> {
        self.names_of(address)
            .into_iter()
            .find(NameRecord::is_valid)
            .map(|r| r.name)
    }

    /// Number of `write_names` statements issued.
    pub fn name_statements(&self) -> usize {
        self.name_writes.lock().len()
    }

    pub fn set_fail_facts(&self, fail: bool) {
        self.fail_facts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_cache_reads(&self, fail: bool) {
        self.fail_cache_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn cache_entries(&self, addresses: &[Address], source: Source) -> Result<Vec<CacheEntry>> {
        if self.fail_cache_reads.load(Ordering::SeqCst) {
            return Err(Error::database(DbErrorCode::ReadFailed, "Mock cache read failure"));
        }
        let cache = self.cache.lock();
        Ok(addresses
            .iter()
            .filter_map(|a| cache.get(&(a.clone(), source)).cloned())
            .collect())
    }

    async fn upsert_cache(&self, entries: &[CacheEntry]) -> Result<usize> {
        let mut cache = self.cache.lock();
        for entry in entries {
            let key = (entry.address.clone(), entry.source);
            // Highest next_lookup_at wins, like the ReplacingMergeTree version column.
            let keep_existing = cache
                .get(&key)
                .is_some_and(|current| current.next_lookup_at > entry.next_lookup_at);
            if !keep_existing {
                cache.insert(key, entry.clone());
            }
        }
        Ok(entries.len())
    }
}

#[async_trait]
impl FactStore for MemoryStore {
    async fn upsert_facts(&self, facts: &[ProfileFact]) -> Result<usize> {
        if self.fail_facts.load(Ordering::SeqCst) {
            return Err(Error::database(DbErrorCode::WriteFailed, "Mock fact write failure"));
        }
        let mut stored = self.facts.lock();
        for fact in facts {
            stored.insert((fact.address.clone(), fact.external_id.clone()), fact.clone());
        }
        Ok(facts.len())
    }
}

#[async_trait]
impl NameStore for MemoryStore {
    async fn name_records(&self, addresses: &[Address]) -> Result<Vec<NameRecord>> {
        let wanted: HashSet<&Address> = addresses.iter().collect();
        Ok(self
            .names
            .lock()
            .values()
            .filter(|r| wanted.contains(&r.address))
            .cloned()
            .collect())
    }

    async fn write_names(&self, records: &[NameRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut names = self.names.lock();
        for record in records {
            names.insert((record.address.clone(), record.name.clone()), record.clone());
        }
        self.name_writes.lock().push(records.to_vec());
        Ok(records.len())
    }
}

/// Heartbeat that only counts pings.
#[derive(Default)]
pub struct RecordingHeartbeat {
    pings: AtomicUsize,
}

impl RecordingHeartbeat {
    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Heartbeat for RecordingHeartbeat {
    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Consumer group over scripted per-topic delivery queues.
///
/// Topics are served in subscription order, so an unpaused first topic
/// always wins. Lag is the number of queued messages.
pub struct MockConsumer {
    group_id: String,
    queues: Mutex<HashMap<String, VecDeque<Delivery>>>,
    subscribed: Mutex<Vec<String>>,
    paused: Mutex<HashSet<String>>,
    delivered: Mutex<Vec<String>>,
    commits: Mutex<Vec<(String, i64)>>,
    pings: AtomicUsize,
    expire_commits: AtomicBool,
    fail_when_drained: AtomicBool,
}

impl MockConsumer {
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            queues: Mutex::new(HashMap::new()),
            subscribed: Mutex::new(Vec::new()),
            paused: Mutex::new(HashSet::new()),
            delivered: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            pings: AtomicUsize::new(0),
            expire_commits: AtomicBool::new(false),
            fail_when_drained: AtomicBool::new(false),
        }
    }

    pub fn push(&self, delivery: Delivery) {
        self.queues
            .lock()
            .entry(delivery.topic.clone())
            .or_default()
            .push_back(delivery);
    }

    /// Topics of the deliveries handed out so far, in order.
    pub fn delivered_topics(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }

    pub fn commits(&self) -> Vec<(String, i64)> {
        self.commits.lock().clone()
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().clone()
    }

    /// Reject every commit as if the session had expired.
    pub fn set_expire_commits(&self, expire: bool) {
        self.expire_commits.store(expire, Ordering::SeqCst);
    }

    /// Fail the next fetch once every queue is empty, ending `run()`.
    pub fn set_fail_when_drained(&self, fail: bool) {
        self.fail_when_drained.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Heartbeat for MockConsumer {
    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl GroupConsumer for MockConsumer {
    fn group_id(&self) -> &str {
        &self.group_id
    }

    async fn subscribe(&self, topics: &[String]) -> Result<()> {
        *self.subscribed.lock() = topics.to_vec();
        Ok(())
    }

    async fn next_batch(&self) -> Result<Option<Delivery>> {
        let topics = self.subscribed.lock().clone();
        let paused = self.paused.lock().clone();
        let mut queues = self.queues.lock();

        for topic in topics.iter().filter(|t| !paused.contains(*t)) {
            if let Some(delivery) = queues.get_mut(topic).and_then(VecDeque::pop_front) {
                self.delivered.lock().push(topic.clone());
                return Ok(Some(delivery));
            }
        }

        let drained = queues.values().all(VecDeque::is_empty);
        if drained && self.fail_when_drained.load(Ordering::SeqCst) {
            return Err(Error::broker(BrokerErrorCode::Transport, "Mock broker drained"));
        }
        Ok(None)
    }

    async fn commit(&self, delivery: &Delivery) -> Result<()> {
        if self.expire_commits.load(Ordering::SeqCst) {
            // Redeliver, as a rewound session would.
            self.queues
                .lock()
                .entry(delivery.topic.clone())
                .or_default()
                .push_front(delivery.clone());
            return Err(Error::broker(BrokerErrorCode::SessionExpired, "Mock session expired"));
        }
        if let Some(next) = delivery.next_offset() {
            self.commits.lock().push((delivery.topic.clone(), next));
        }
        Ok(())
    }

    fn pause(&self, topic: &str) {
        self.paused.lock().insert(topic.to_string());
    }

    fn resume(&self, topic: &str) {
        self.paused.lock().remove(topic);
    }

    fn is_paused(&self, topic: &str) -> bool {
        self.paused.lock().contains(topic)
    }

    async fn lag(&self, topic: &str) -> Result<i64> {
        Ok(self
            .queues
            .lock()
            .get(topic)
            .map(|q| q.iter().map(Delivery::len).sum::<usize>() as i64)
            .unwrap_or(0))
    }
}

/// Source answering from a fixed fact table; unknown addresses are empty.
pub struct MockSource {
    source: Source,
    facts: Mutex<HashMap<Address, ProfileFact>>,
    calls: Mutex<Vec<Vec<Address>>>,
    window_pause: Duration,
}

impl MockSource {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            facts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            window_pause: Duration::ZERO,
        }
    }

    pub fn with_window_pause(mut self, pause: Duration) -> Self {
        self.window_pause = pause;
        self
    }

    pub fn insert(&self, fact: ProfileFact) {
        self.facts.lock().insert(fact.address.clone(), fact);
    }

    pub fn remove(&self, address: &Address) {
        self.facts.lock().remove(address);
    }

    /// Address lists passed to `resolve_batch`, one per call.
    pub fn calls(&self) -> Vec<Vec<Address>> {
        self.calls.lock().clone()
    }

    pub fn resolved_count(&self) -> usize {
        self.calls.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl EnrichmentSource for MockSource {
    fn source(&self) -> Source {
        self.source
    }

    fn max_execution_time(&self) -> Duration {
        Duration::from_secs(300)
    }

    fn window_pause(&self) -> Duration {
        self.window_pause
    }

    async fn resolve_batch(&self, addresses: &[Address]) -> Vec<EnrichmentResult> {
        self.calls.lock().push(addresses.to_vec());
        let facts = self.facts.lock();
        addresses
            .iter()
            .map(|a| match facts.get(a) {
                Some(fact) => EnrichmentResult::Enriched(fact.clone()),
                None => EnrichmentResult::empty(a.clone(), self.source),
            })
            .collect()
    }
}

/// Name service with editable reverse and forward records.
#[derive(Default)]
pub struct MockNameResolver {
    reverse: Mutex<HashMap<Address, String>>,
    forward: Mutex<HashMap<String, String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
}

impl MockNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps inside every reverse call, to observe concurrency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets a reverse record that verifies forward.
    pub fn set_name(&self, address: &Address, name: &str) {
        self.reverse.lock().insert(address.clone(), name.to_string());
        self.forward.lock().insert(name.to_string(), address.to_string());
    }

    /// Sets a reverse record whose name points somewhere else.
    pub fn set_spoofed_name(&self, address: &Address, name: &str, owner: &Address) {
        self.reverse.lock().insert(address.clone(), name.to_string());
        self.forward.lock().insert(name.to_string(), owner.to_string());
    }

    pub fn clear_name(&self, address: &Address) {
        self.reverse.lock().remove(address);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameResolver for MockNameResolver {
    async fn reverse(&self, address: &Address) -> Result<Option<String>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.reverse.lock().get(address).cloned())
    }

    async fn forward(&self, name: &str) -> Result<Option<String>> {
        Ok(self.forward.lock().get(name).cloned())
    }
}

/// Publisher that captures addresses in memory.
#[derive(Clone, Default)]
pub struct MockPublisher {
    published: Arc<Mutex<Vec<(TopicRole, Address)>>>,
    should_fail: Arc<AtomicBool>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(TopicRole, Address)> {
        self.published.lock().clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AddressPublisher for MockPublisher {
    async fn publish(&self, role: TopicRole, addresses: &[Address]) -> Result<PublishResult> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Error::broker(BrokerErrorCode::Transport, "Mock publisher failure"));
        }
        self.published
            .lock()
            .extend(addresses.iter().map(|a| (role, a.clone())));
        Ok(PublishResult {
            published: addresses.len(),
            errors: vec![],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_mock_consumer_skips_paused_topics() {
        let consumer = MockConsumer::new("g");
        consumer.subscribe(&["low".to_string(), "high".to_string()]).await.unwrap();
        consumer.push(fixtures::delivery("low", 0, &fixtures::addresses(2)));
        consumer.push(fixtures::delivery("high", 0, &fixtures::addresses(1)));

        assert_eq!(consumer.lag("low").await.unwrap(), 2);
        consumer.pause("low");

        let delivery = consumer.next_batch().await.unwrap().unwrap();
        assert_eq!(delivery.topic, "high");
        assert!(consumer.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_keeps_latest_lookup() {
        let store = MemoryStore::new();
        let address = fixtures::address(1);
        let later = CacheEntry {
            address: address.clone(),
            source: Source::Ens,
            next_lookup_at: fixtures::t0() + chrono::Duration::days(14),
        };
        let earlier = CacheEntry {
            next_lookup_at: fixtures::t0(),
            ..later.clone()
        };

        store.upsert_cache(&[later.clone()]).await.unwrap();
        store.upsert_cache(&[earlier]).await.unwrap();
        assert_eq!(store.cache_entry(&address, Source::Ens), Some(later));
    }
}
