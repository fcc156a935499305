//! Roster aggregation.
//!
//! [`RosterAggregator::fetch_roster`] looks up every identifier of a working
//! set concurrently, drops the ones that fail, and returns the first `cap`
//! successes in input order. Individual failures are logged and swallowed;
//! the only hard error is a fan-out that cannot start at all.
//!
//! The whole aggregation runs under one deadline. Lookups still running when
//! it passes are aborted and awaited, so no task outlives the call. Aborted
//! lookups count as failures; one that completes before its abort lands keeps
//! its record.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::aircraft::{AircraftRecord, Identifier};
use crate::config::RosterConfig;
use crate::error::{Error, Result};
use crate::lookup::{AircraftLookup, FetchError, LookupResult};
use crate::pool::IdentifierPool;

/// Default maximum roster size.
pub const DEFAULT_CAP: usize = 15;

/// Default aggregation deadline.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(20);

/// Message shown for a roster with no records.
pub const EMPTY_ROSTER_MESSAGE: &str = "No aircraft found";

/// Outcome of one aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    /// Successful records in input order, at most `cap` of them.
    pub records: Vec<AircraftRecord>,
    /// Number of distinct identifiers looked up.
    pub requested: usize,
    /// Number of lookups that produced a record (before capping).
    pub succeeded: usize,
    /// Number of lookups cut off by the deadline.
    pub timed_out: usize,
}

impl Roster {
    /// Number of records in the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the roster has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of lookups that did not produce a record.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.requested - self.succeeded
    }

    /// Consume the roster, keeping only the records.
    #[must_use]
    pub fn into_records(self) -> Vec<AircraftRecord> {
        self.records
    }
}

/// Display state for a consumer rendering a roster.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RosterState {
    /// A fetch is in progress.
    #[default]
    Loading,
    /// The fetch ran but nothing came back.
    Empty,
    /// The fetch produced records.
    Loaded(Vec<AircraftRecord>),
    /// The fetch could not run.
    Failed(String),
}

impl RosterState {
    /// Map an aggregation result onto a display state.
    #[must_use]
    pub fn from_result(result: Result<Roster>) -> Self {
        match result {
            Ok(roster) if roster.is_empty() => Self::Empty,
            Ok(roster) => Self::Loaded(roster.into_records()),
            Err(err) => Self::Failed(err.to_string()),
        }
    }

    /// Check if the consumer should offer a retry.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        matches!(self, Self::Empty | Self::Failed(_))
    }

    /// Get the records, if any were loaded.
    #[must_use]
    pub fn records(&self) -> &[AircraftRecord] {
        match self {
            Self::Loaded(records) => records,
            _ => &[],
        }
    }

    /// Get the message to show in place of records, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Empty => Some(EMPTY_ROSTER_MESSAGE),
            Self::Failed(message) => Some(message),
            Self::Loading | Self::Loaded(_) => None,
        }
    }
}

/// Fans lookups out over a working set and collects a capped roster.
#[derive(Debug)]
pub struct RosterAggregator<L> {
    lookup: Arc<L>,
    cap: usize,
    deadline: Duration,
}

impl<L> RosterAggregator<L>
where
    L: AircraftLookup + 'static,
{
    /// Create an aggregator with the default cap and deadline.
    #[must_use]
    pub fn new(lookup: L) -> Self {
        Self::from_arc(Arc::new(lookup))
    }

    /// Create an aggregator over a shared lookup.
    #[must_use]
    pub fn from_arc(lookup: Arc<L>) -> Self {
        Self {
            lookup,
            cap: DEFAULT_CAP,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Create an aggregator using the roster configuration's cap and deadline.
    #[must_use]
    pub fn from_config(lookup: L, config: &RosterConfig) -> Self {
        Self::new(lookup)
            .with_cap(config.cap)
            .with_deadline(Duration::from_millis(config.deadline_ms))
    }

    /// Set the maximum roster size.
    #[must_use]
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    /// Set the overall aggregation deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Get the maximum roster size.
    #[must_use]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Get the aggregation deadline.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Get the underlying lookup.
    #[must_use]
    pub fn lookup(&self) -> &Arc<L> {
        &self.lookup
    }

    /// Look up every identifier concurrently and collect a capped roster.
    ///
    /// All lookups are started before any is awaited. Repeated identifiers
    /// are looked up once, at the position of their first occurrence.
    /// Records come back in input order regardless of completion order. A
    /// roster with fewer than `cap` records, or none, is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SystemFailure`] if no tokio runtime is available to
    /// run the lookups on.
    pub async fn fetch_roster(&self, identifiers: &[Identifier]) -> Result<Roster> {
        let handle = Handle::try_current()
            .map_err(|e| Error::system_failure(format!("cannot start lookups: {e}")))?;
        let deadline = Instant::now() + self.deadline;

        let mut slots: Vec<Option<AircraftRecord>> = vec![None; identifiers.len()];
        let mut seen = HashSet::with_capacity(identifiers.len());
        let mut tasks = JoinSet::new();

        for (index, identifier) in identifiers.iter().enumerate() {
            if !seen.insert(identifier) {
                debug!(%identifier, "Skipping repeated identifier");
                continue;
            }

            let lookup = Arc::clone(&self.lookup);
            let identifier = identifier.clone();
            tasks.spawn_on(
                async move {
                    let outcome = lookup.lookup(&identifier).await;
                    (index, identifier, outcome)
                },
                &handle,
            );
        }

        let requested = tasks.len();
        let mut timed_out = 0;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(joined)) => {
                    settle(&mut slots, joined);
                }
                Ok(None) => break,
                Err(_) => {
                    let deadline_ms = u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX);
                    warn!(
                        outstanding = tasks.len(),
                        deadline_ms,
                        "Aggregation deadline passed, cancelling outstanding lookups"
                    );
                    tasks.abort_all();
                    // A lookup already running on a worker finishes before
                    // the abort is observed; its outcome still counts.
                    while let Some(joined) = tasks.join_next().await {
                        if settle(&mut slots, joined) {
                            timed_out += 1;
                        }
                    }
                    break;
                }
            }
        }

        let succeeded = slots.iter().filter(|slot| slot.is_some()).count();
        let records: Vec<AircraftRecord> = slots.into_iter().flatten().take(self.cap).collect();

        info!(
            requested,
            succeeded,
            timed_out,
            returned = records.len(),
            "Roster fetched"
        );

        Ok(Roster {
            records,
            requested,
            succeeded,
            timed_out,
        })
    }
}

type Settled = (usize, Identifier, LookupResult);

/// Record one finished lookup task. Returns `true` if the task was cancelled.
fn settle(
    slots: &mut [Option<AircraftRecord>],
    joined: std::result::Result<Settled, JoinError>,
) -> bool {
    match joined {
        Ok((index, _, Ok(record))) => {
            slots[index] = Some(record);
            false
        }
        Ok((_, identifier, Err(error))) => {
            log_failure(&identifier, &error);
            false
        }
        Err(join_error) if join_error.is_cancelled() => true,
        Err(join_error) => {
            // Panicked lookups carry no identifier back.
            warn!(error = %join_error, "Lookup task did not complete");
            false
        }
    }
}

fn log_failure(identifier: &Identifier, error: &FetchError) {
    if error.is_no_aircraft() {
        debug!(%identifier, %error, "No aircraft for identifier");
    } else {
        warn!(%identifier, %error, "Aircraft lookup failed");
    }
}

/// Build a working set of `target` identifiers and fetch its roster.
///
/// # Errors
///
/// Returns [`Error::PoolExhausted`] if the working set cannot be filled, or
/// [`Error::SystemFailure`] if the lookups cannot be started.
pub async fn load_roster<L>(
    pool: &IdentifierPool,
    aggregator: &RosterAggregator<L>,
    target: usize,
) -> Result<Roster>
where
    L: AircraftLookup + 'static,
{
    let working_set = pool.build_working_set(target)?;
    aggregator.fetch_roster(&working_set).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll, Wake, Waker};

    use async_trait::async_trait;

    use super::*;
    use crate::lookup::lookup_fn;

    fn ids(values: &[&str]) -> Vec<Identifier> {
        values.iter().map(Identifier::new).collect()
    }

    fn record_for(identifier: &Identifier) -> AircraftRecord {
        AircraftRecord::new(
            identifier.clone(),
            "A320",
            "Airbus",
            "Test Owner",
            "Testland",
            None,
        )
    }

    fn identifiers_of(roster: &Roster) -> Vec<&str> {
        roster
            .records
            .iter()
            .map(|r| r.identifier.as_str())
            .collect()
    }

    /// Scripted lookup: per-identifier failures and delays, with call and
    /// concurrency accounting.
    #[derive(Debug, Default)]
    struct StubLookup {
        failures: HashMap<String, FetchError>,
        delays: HashMap<String, Duration>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        finished: AtomicUsize,
        dropped: Arc<AtomicUsize>,
    }

    impl StubLookup {
        fn failing(mut self, identifier: &str, error: FetchError) -> Self {
            self.failures.insert(identifier.to_string(), error);
            self
        }

        fn delayed(mut self, identifier: &str, delay: Duration) -> Self {
            self.delays.insert(identifier.to_string(), delay);
            self
        }
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AircraftLookup for StubLookup {
        async fn lookup(
            &self,
            identifier: &Identifier,
        ) -> std::result::Result<AircraftRecord, FetchError> {
            let _guard = DropCounter(Arc::clone(&self.dropped));
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delays.get(identifier.as_str()) {
                tokio::time::sleep(*delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
            match self.failures.get(identifier.as_str()) {
                Some(error) => Err(error.clone()),
                None => Ok(record_for(identifier)),
            }
        }
    }

    #[tokio::test]
    async fn test_all_lookups_fail_gives_empty_roster() {
        let aggregator = RosterAggregator::new(lookup_fn(|_id| async {
            Err::<AircraftRecord, _>(FetchError::Transport("connection refused".to_string()))
        }));

        let roster = aggregator
            .fetch_roster(&ids(&["A1", "B2", "C3"]))
            .await
            .unwrap();

        assert!(roster.is_empty());
        assert_eq!(roster.requested, 3);
        assert_eq!(roster.succeeded, 0);
        assert_eq!(roster.failed(), 3);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_skipped_in_order() {
        let stub = StubLookup::default().failing("B", FetchError::Status { status: 500 });
        let aggregator = RosterAggregator::new(stub).with_cap(2);

        let roster = aggregator.fetch_roster(&ids(&["A", "B", "C"])).await.unwrap();

        assert_eq!(identifiers_of(&roster), vec!["A", "C"]);
        assert_eq!(roster.succeeded, 2);
    }

    #[tokio::test]
    async fn test_no_aircraft_is_treated_like_failure() {
        let stub = StubLookup::default()
            .failing("B", FetchError::NoAircraft)
            .failing("D", FetchError::Transport("reset".to_string()));
        let aggregator = RosterAggregator::new(stub);

        let roster = aggregator
            .fetch_roster(&ids(&["A", "B", "C", "D"]))
            .await
            .unwrap();

        assert_eq!(identifiers_of(&roster), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_roster_is_capped() {
        let aggregator = RosterAggregator::new(StubLookup::default()).with_cap(3);
        let input = ids(&["A", "B", "C", "D", "E", "F"]);

        let roster = aggregator.fetch_roster(&input).await.unwrap();

        assert_eq!(roster.len(), 3);
        assert_eq!(roster.succeeded, 6);
        assert_eq!(identifiers_of(&roster), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_roster_returns_min_of_successes_and_cap() {
        for (failures, cap, expected) in [(0, 10, 6), (2, 10, 4), (2, 3, 3), (6, 3, 0)] {
            let mut stub = StubLookup::default();
            for name in ["A", "B", "C", "D", "E", "F"].iter().take(failures) {
                stub = stub.failing(name, FetchError::NoAircraft);
            }
            let aggregator = RosterAggregator::new(stub).with_cap(cap);

            let roster = aggregator
                .fetch_roster(&ids(&["A", "B", "C", "D", "E", "F"]))
                .await
                .unwrap();
            assert_eq!(roster.len(), expected, "failures={failures} cap={cap}");
        }
    }

    #[tokio::test]
    async fn test_zero_cap_returns_nothing() {
        let aggregator = RosterAggregator::new(StubLookup::default()).with_cap(0);
        let roster = aggregator.fetch_roster(&ids(&["A", "B"])).await.unwrap();
        assert!(roster.is_empty());
        assert_eq!(roster.succeeded, 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let aggregator = RosterAggregator::new(StubLookup::default());
        let roster = aggregator.fetch_roster(&[]).await.unwrap();
        assert!(roster.is_empty());
        assert_eq!(roster.requested, 0);
    }

    #[tokio::test]
    async fn test_order_follows_input_not_completion() {
        let stub = StubLookup::default()
            .delayed("A", Duration::from_millis(120))
            .delayed("B", Duration::from_millis(60))
            .delayed("C", Duration::from_millis(1));
        let aggregator = RosterAggregator::new(stub);

        let roster = aggregator.fetch_roster(&ids(&["A", "B", "C"])).await.unwrap();
        assert_eq!(identifiers_of(&roster), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_lookups_run_concurrently() {
        let names = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let mut stub = StubLookup::default();
        for name in names {
            stub = stub.delayed(name, Duration::from_millis(100));
        }
        let stub = Arc::new(stub);
        let aggregator = RosterAggregator::from_arc(Arc::clone(&stub));

        let started = std::time::Instant::now();
        let roster = aggregator.fetch_roster(&ids(&names)).await.unwrap();

        assert_eq!(roster.len(), names.len());
        assert_eq!(stub.max_in_flight.load(Ordering::SeqCst), names.len());
        // Sequential execution would take at least 800ms.
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_repeated_identifiers_looked_up_once() {
        let stub = Arc::new(StubLookup::default());
        let aggregator = RosterAggregator::from_arc(Arc::clone(&stub));

        let roster = aggregator
            .fetch_roster(&ids(&["A", "B", "A", "C", "B"]))
            .await
            .unwrap();

        assert_eq!(identifiers_of(&roster), vec!["A", "B", "C"]);
        assert_eq!(roster.requested, 3);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_roster() {
        crate::logging::init_test_logging();
        let stub = StubLookup::default()
            .delayed("SLOW1", Duration::from_secs(30))
            .delayed("SLOW2", Duration::from_secs(30));
        let stub = Arc::new(stub);
        let aggregator =
            RosterAggregator::from_arc(Arc::clone(&stub)).with_deadline(Duration::from_millis(150));

        let started = std::time::Instant::now();
        let roster = aggregator
            .fetch_roster(&ids(&["A", "SLOW1", "B", "SLOW2", "C"]))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(identifiers_of(&roster), vec!["A", "B", "C"]);
        assert_eq!(roster.timed_out, 2);
        assert_eq!(roster.failed(), 2);

        // Every lookup future, including the cancelled ones, is gone.
        assert_eq!(stub.calls.load(Ordering::SeqCst), 5);
        assert_eq!(stub.dropped.load(Ordering::SeqCst), 5);
        assert_eq!(stub.finished.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deadline_keeps_record_of_lookup_that_finishes_during_abort() {
        crate::logging::init_test_logging();
        let aggregator = RosterAggregator::new(lookup_fn(|id: Identifier| async move {
            match id.as_str() {
                // Holds its worker thread, so the abort cannot interrupt it.
                "BLOCKING" => std::thread::sleep(Duration::from_millis(400)),
                "HANG" => tokio::time::sleep(Duration::from_secs(30)).await,
                _ => {}
            }
            Ok(record_for(&id))
        }))
        .with_deadline(Duration::from_millis(100));

        let started = std::time::Instant::now();
        let roster = aggregator
            .fetch_roster(&ids(&["A1", "BLOCKING", "HANG"]))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(identifiers_of(&roster), vec!["A1", "BLOCKING"]);
        assert_eq!(roster.succeeded, 2);
        assert_eq!(roster.timed_out, 1);
    }

    struct NoopWaker;

    impl Wake for NoopWaker {
        fn wake(self: Arc<Self>) {}
    }

    #[test]
    fn test_fetch_without_runtime_is_system_failure() {
        let stub = Arc::new(StubLookup::default());
        let aggregator = RosterAggregator::from_arc(Arc::clone(&stub));
        let identifiers = ids(&["A1", "B2"]);

        let waker = Waker::from(Arc::new(NoopWaker));
        let mut cx = Context::from_waker(&waker);
        let mut future = std::pin::pin!(aggregator.fetch_roster(&identifiers));
        let result = match future.as_mut().poll(&mut cx) {
            Poll::Ready(result) => result,
            Poll::Pending => panic!("fetch without a runtime should fail immediately"),
        };

        let err = result.unwrap_err();
        assert!(err.is_system_failure());
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);

        let state = RosterState::from_result(Err(err));
        assert!(matches!(state, RosterState::Failed(_)));
        assert!(state.can_retry());
    }

    #[tokio::test]
    async fn test_panicking_lookup_does_not_abort_batch() {
        let aggregator = RosterAggregator::new(lookup_fn(|id: Identifier| async move {
            assert!(id.as_str() != "BOOM", "lookup exploded");
            Ok(record_for(&id))
        }));

        let roster = aggregator
            .fetch_roster(&ids(&["A", "BOOM", "C"]))
            .await
            .unwrap();

        assert_eq!(identifiers_of(&roster), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = RosterConfig {
            cap: 4,
            deadline_ms: 250,
            ..RosterConfig::default()
        };
        let aggregator = RosterAggregator::from_config(StubLookup::default(), &config);

        assert_eq!(aggregator.cap(), 4);
        assert_eq!(aggregator.deadline(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_load_roster_uses_working_set() {
        let pool = IdentifierPool::new(ids(&["A1", "B2"]));
        let stub = Arc::new(StubLookup::default());
        let aggregator = RosterAggregator::from_arc(Arc::clone(&stub)).with_cap(4);

        let roster = load_roster(&pool, &aggregator, 6).await.unwrap();

        assert_eq!(stub.calls.load(Ordering::SeqCst), 6);
        assert_eq!(roster.requested, 6);
        assert_eq!(roster.len(), 4);
        assert_eq!(identifiers_of(&roster)[..2], ["A1", "B2"]);
    }

    #[tokio::test]
    async fn test_load_roster_surfaces_pool_exhaustion() {
        let pool = IdentifierPool::new(ids(&["A1"])).with_max_attempts(1);
        let aggregator = RosterAggregator::new(StubLookup::default());

        let err = load_roster(&pool, &aggregator, 10).await.unwrap_err();
        assert!(err.is_pool_exhausted());
    }

    #[test]
    fn test_roster_state_from_result() {
        let empty = Roster {
            records: Vec::new(),
            requested: 3,
            succeeded: 0,
            timed_out: 0,
        };
        let state = RosterState::from_result(Ok(empty));
        assert_eq!(state, RosterState::Empty);
        assert!(state.can_retry());
        assert_eq!(state.message(), Some(EMPTY_ROSTER_MESSAGE));

        let loaded = Roster {
            records: vec![record_for(&Identifier::new("A"))],
            requested: 1,
            succeeded: 1,
            timed_out: 0,
        };
        let state = RosterState::from_result(Ok(loaded));
        assert_eq!(state.records().len(), 1);
        assert!(!state.can_retry());
        assert!(state.message().is_none());

        let state = RosterState::from_result(Err(Error::system_failure("no runtime")));
        assert!(matches!(state, RosterState::Failed(_)));
        assert!(state.can_retry());
        assert!(state.message().unwrap().contains("no runtime"));
        assert!(state.records().is_empty());
    }

    #[test]
    fn test_roster_state_default_is_loading() {
        let state = RosterState::default();
        assert_eq!(state, RosterState::Loading);
        assert!(!state.can_retry());
    }
}
