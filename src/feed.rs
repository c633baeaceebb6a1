//! Feed synchronization: one historical fetch plus one live subscription per
//! session, merged into a single append-only, deduplicated feed.
//!
//! Both sources may deliver in any interleaving. Every record goes through
//! [`Feed::merge`], which keeps the first-seen copy of each
//! `(author, timestamp, message)` triple and never reorders what is already
//! there. The ledger exposes no sequence id, so two distinct waves with the
//! same author, second and text collapse into one entry.
//!
//! Each (re)initialization advances an epoch. Fetch results and live
//! deliveries carry the epoch they were started for and are discarded once it
//! is stale, so a torn-down session cannot write into the next one's feed.

use crate::events::{spawn_effect, AppEvent, EventSender, FeedEvent};
use crate::gateway::{LedgerGateway, Subscription, UnsubscribeHandle};
use crate::notifications::Notice;
use crate::types::{Account, WaveRecord};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Where a record was first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Historical,
    Live,
}

/// State of one of the two feed sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// No session.
    Idle,
    Pending,
    Ready,
    /// Failed or closed; the other source keeps working.
    Degraded,
}

/// Ordered, append-only, deduplicated list of waves.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    records: Vec<WaveRecord>,
    seen: HashSet<WaveRecord>,
    historical: usize,
    live: usize,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` unless an identical one is already present. Returns whether it was added.
    pub fn merge(&mut self, record: WaveRecord, origin: Origin) -> bool {
        if self.seen.contains(&record) {
            return false;
        }
        self.seen.insert(record.clone());
        self.records.push(record);
        match origin {
            Origin::Historical => self.historical += 1,
            Origin::Live => self.live += 1,
        }
        true
    }

    /// Merge in order. Returns how many were new.
    pub fn merge_all(&mut self, records: impl IntoIterator<Item = WaveRecord>, origin: Origin) -> usize {
        let mut added = 0;
        for record in records {
            if self.merge(record, origin) {
                added += 1;
            }
        }
        added
    }

    pub fn records(&self) -> &[WaveRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn historical_count(&self) -> usize {
        self.historical
    }

    pub fn live_count(&self) -> usize {
        self.live
    }
}

struct ActiveSubscription {
    handle: UnsubscribeHandle,
    forwarder: JoinHandle<()>,
}

impl ActiveSubscription {
    fn detach(self) {
        self.forwarder.abort();
        self.handle.unsubscribe();
    }
}

pub struct FeedSynchronizer {
    gateway: Arc<dyn LedgerGateway>,
    events: EventSender,
    feed: Feed,
    epoch: u64,
    subscription: Option<ActiveSubscription>,
    history: SourceStatus,
    live: SourceStatus,
}

impl FeedSynchronizer {
    pub fn new(gateway: Arc<dyn LedgerGateway>, events: EventSender) -> Self {
        Self {
            gateway,
            events,
            feed: Feed::new(),
            epoch: 0,
            subscription: None,
            history: SourceStatus::Idle,
            live: SourceStatus::Idle,
        }
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn history_status(&self) -> SourceStatus {
        self.history
    }

    pub fn live_status(&self) -> SourceStatus {
        self.live
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    /// Start a fresh feed for `account`: drop the old listener and feed, then
    /// fetch history and subscribe concurrently.
    pub fn initialize(&mut self, account: Account) {
        self.teardown();
        self.feed = Feed::new();
        self.history = SourceStatus::Pending;
        self.live = SourceStatus::Pending;
        let epoch = self.epoch;
        info!("Initializing feed for {} (epoch {})", account, epoch);

        let gateway = self.gateway.clone();
        spawn_effect(&self.events, async move {
            AppEvent::Feed(FeedEvent::HistoryLoaded {
                epoch,
                result: gateway.fetch_all_records().await,
            })
        });

        let gateway = self.gateway.clone();
        spawn_effect(&self.events, async move {
            AppEvent::Feed(FeedEvent::Subscribed {
                epoch,
                result: gateway.subscribe().await,
            })
        });
    }

    /// Unsubscribe the live listener (if any) and invalidate in-flight results.
    pub fn teardown(&mut self) {
        self.epoch += 1;
        if let Some(active) = self.subscription.take() {
            debug!("Detaching live subscription");
            active.detach();
        }
        self.history = SourceStatus::Idle;
        self.live = SourceStatus::Idle;
    }

    /// Clear the feed entirely (session ended).
    pub fn reset(&mut self) {
        self.teardown();
        self.feed = Feed::new();
    }

    pub fn handle(&mut self, event: FeedEvent) -> Option<Notice> {
        match event {
            FeedEvent::HistoryLoaded { epoch, result } => {
                if epoch != self.epoch {
                    debug!("Ignoring history for stale epoch {}", epoch);
                    return None;
                }
                match result {
                    Ok(records) => {
                        let fetched = records.len();
                        let added = self.feed.merge_all(records, Origin::Historical);
                        self.history = SourceStatus::Ready;
                        info!("Merged {} of {} historical wave(s)", added, fetched);
                        None
                    }
                    Err(e) => {
                        self.history = SourceStatus::Degraded;
                        Some(Notice::warning(format!(
                            "Could not load wave history: {}. Showing live waves only.",
                            e.user_notice()
                        )))
                    }
                }
            }
            FeedEvent::Subscribed { epoch, result } => match result {
                Ok(subscription) if epoch != self.epoch => {
                    debug!("Subscription resolved for stale epoch {}, detaching", epoch);
                    subscription.handle.unsubscribe();
                    None
                }
                Ok(subscription) => {
                    self.attach(epoch, subscription);
                    None
                }
                Err(_) if epoch != self.epoch => None,
                Err(e) => {
                    self.live = SourceStatus::Degraded;
                    Some(Notice::warning(format!(
                        "Live updates unavailable: {}",
                        e.user_notice()
                    )))
                }
            },
            FeedEvent::LiveRecord { epoch, record } => {
                if epoch != self.epoch {
                    debug!("Dropping live wave from stale epoch {}", epoch);
                    return None;
                }
                if self.feed.merge(record, Origin::Live) {
                    debug!("Live wave appended, feed has {}", self.feed.len());
                }
                None
            }
            FeedEvent::LiveClosed { epoch } => {
                if epoch != self.epoch {
                    return None;
                }
                if let Some(active) = self.subscription.take() {
                    active.detach();
                }
                self.live = SourceStatus::Degraded;
                warn!("Live wave stream closed");
                Some(Notice::warning("Live updates stopped. Reconnect to resume."))
            }
        }
    }

    fn attach(&mut self, epoch: u64, subscription: Subscription) {
        let Subscription { records, handle } = subscription;
        let forwarder = spawn_forwarder(self.events.clone(), epoch, records);
        self.subscription = Some(ActiveSubscription { handle, forwarder });
        self.live = SourceStatus::Ready;
        info!("Live subscription active (epoch {})", epoch);
    }
}

impl Drop for FeedSynchronizer {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Relay live records into the controller's event stream, in arrival order.
fn spawn_forwarder(
    events: EventSender,
    epoch: u64,
    mut records: mpsc::UnboundedReceiver<WaveRecord>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(record) = records.recv().await {
            if events
                .send(AppEvent::Feed(FeedEvent::LiveRecord { epoch, record }))
                .is_err()
            {
                return;
            }
        }
        let _ = events.send(AppEvent::Feed(FeedEvent::LiveClosed { epoch }));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaveError;
    use crate::events::EventReceiver;
    use crate::testing::{account, wave, MockGateway};

    // ==================== Feed merge tests ====================

    #[test]
    fn test_duplicates_collapse_in_first_seen_order() {
        let mut feed = Feed::new();
        let deliveries = vec![
            wave(1, 10, "a"),
            wave(2, 20, "b"),
            wave(1, 10, "a"),
            wave(3, 30, "c"),
            wave(2, 20, "b"),
            wave(1, 10, "a"),
        ];
        for record in deliveries {
            feed.merge(record, Origin::Live);
        }
        assert_eq!(
            feed.records(),
            &[wave(1, 10, "a"), wave(2, 20, "b"), wave(3, 30, "c")]
        );
    }

    #[test]
    fn test_same_text_different_timestamp_is_distinct() {
        let mut feed = Feed::new();
        assert!(feed.merge(wave(1, 10, "gm"), Origin::Historical));
        assert!(feed.merge(wave(1, 11, "gm"), Origin::Historical));
        assert!(feed.merge(wave(2, 10, "gm"), Origin::Historical));
        assert_eq!(feed.len(), 3);
    }

    #[test]
    fn test_counts_never_decrease() {
        let mut feed = Feed::new();
        let mut last = (0, 0, 0);
        let deliveries = vec![
            (wave(1, 1, "x"), Origin::Historical),
            (wave(1, 1, "x"), Origin::Live),
            (wave(2, 2, "y"), Origin::Live),
            (wave(3, 3, "z"), Origin::Historical),
            (wave(2, 2, "y"), Origin::Historical),
        ];
        for (record, origin) in deliveries {
            feed.merge(record, origin);
            let now = (feed.len(), feed.historical_count(), feed.live_count());
            assert!(now.0 >= last.0 && now.1 >= last.1 && now.2 >= last.2);
            last = now;
        }
        assert_eq!(last, (3, 2, 1));
    }

    #[test]
    fn test_merge_all_reports_new_entries() {
        let mut feed = Feed::new();
        feed.merge(wave(1, 1, "x"), Origin::Live);
        let added = feed.merge_all(vec![wave(1, 1, "x"), wave(2, 2, "y")], Origin::Historical);
        assert_eq!(added, 1);
        assert_eq!(feed.historical_count(), 1);
        assert_eq!(feed.live_count(), 1);
    }

    // ==================== FeedSynchronizer tests ====================

    fn synchronizer(gateway: MockGateway) -> (FeedSynchronizer, EventReceiver, Arc<MockGateway>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gateway = Arc::new(gateway);
        (FeedSynchronizer::new(gateway.clone(), tx), rx, gateway)
    }

    async fn next_feed_event(rx: &mut EventReceiver) -> FeedEvent {
        match tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv()).await {
            Ok(Some(AppEvent::Feed(event))) => event,
            other => panic!("expected feed event, got {:?}", other),
        }
    }

    /// Apply events until both the history result and the subscription have been handled.
    async fn settle(sync: &mut FeedSynchronizer, rx: &mut EventReceiver) {
        while sync.history_status() == SourceStatus::Pending || sync.live_status() == SourceStatus::Pending {
            let event = next_feed_event(rx).await;
            sync.handle(event);
        }
    }

    async fn pump_live(sync: &mut FeedSynchronizer, rx: &mut EventReceiver, count: usize) {
        for _ in 0..count {
            let event = next_feed_event(rx).await;
            assert!(matches!(event, FeedEvent::LiveRecord { .. }));
            sync.handle(event);
        }
    }

    #[tokio::test]
    async fn test_late_replay_is_deduplicated() {
        let (mut sync, mut rx, gateway) = synchronizer(MockGateway::with_history(vec![wave(0xa, 1, "hi")]));
        sync.initialize(account(9));
        settle(&mut sync, &mut rx).await;

        gateway.deliver(wave(0xa, 1, "hi"));
        gateway.deliver(wave(0xb, 2, "yo"));
        pump_live(&mut sync, &mut rx, 2).await;

        assert_eq!(sync.feed().records(), &[wave(0xa, 1, "hi"), wave(0xb, 2, "yo")]);
        assert_eq!(sync.feed().historical_count(), 1);
        assert_eq!(sync.feed().live_count(), 1);
    }

    #[tokio::test]
    async fn test_live_before_history_keeps_arrival_order() {
        let (mut sync, _rx, _) = synchronizer(MockGateway::with_history(vec![]));
        sync.initialize(account(9));
        let epoch = sync.epoch();

        sync.handle(FeedEvent::LiveRecord {
            epoch,
            record: wave(0xb, 2, "yo"),
        });
        sync.handle(FeedEvent::HistoryLoaded {
            epoch,
            result: Ok(vec![wave(0xa, 1, "hi"), wave(0xb, 2, "yo")]),
        });

        assert_eq!(sync.feed().records(), &[wave(0xb, 2, "yo"), wave(0xa, 1, "hi")]);
        assert_eq!(sync.history_status(), SourceStatus::Ready);
    }

    #[tokio::test]
    async fn test_history_failure_leaves_live_working() {
        let gateway = MockGateway::with_history(vec![]);
        gateway.fail_history(WaveError::GatewayUnreachable("connection refused".into()));
        let (mut sync, mut rx, gateway) = synchronizer(gateway);
        sync.initialize(account(1));

        let mut notices = Vec::new();
        while sync.history_status() == SourceStatus::Pending || sync.live_status() == SourceStatus::Pending {
            let event = next_feed_event(&mut rx).await;
            notices.extend(sync.handle(event));
        }
        assert_eq!(sync.history_status(), SourceStatus::Degraded);
        assert_eq!(sync.live_status(), SourceStatus::Ready);
        assert_eq!(notices.len(), 1);

        gateway.deliver(wave(2, 5, "still here"));
        pump_live(&mut sync, &mut rx, 1).await;
        assert_eq!(sync.feed().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_failure_leaves_history_working() {
        let gateway = MockGateway::with_history(vec![wave(1, 1, "a")]);
        gateway.fail_subscribe(WaveError::RemoteError("filter not found".into()));
        let (mut sync, mut rx, _) = synchronizer(gateway);
        sync.initialize(account(1));
        settle(&mut sync, &mut rx).await;

        assert_eq!(sync.live_status(), SourceStatus::Degraded);
        assert_eq!(sync.history_status(), SourceStatus::Ready);
        assert_eq!(sync.feed().len(), 1);
        assert!(!sync.has_subscription());
    }

    #[tokio::test]
    async fn test_reinitialize_unsubscribes_once_and_ignores_old_stream() {
        let (mut sync, mut rx, gateway) = synchronizer(MockGateway::with_history(vec![wave(1, 1, "old")]));
        sync.initialize(account(1));
        settle(&mut sync, &mut rx).await;
        assert_eq!(gateway.subscribe_calls(), 1);

        gateway.set_history(vec![wave(2, 2, "new")]);
        sync.initialize(account(2));
        assert_eq!(gateway.unsubscribe_calls(), 1);
        assert!(sync.feed().is_empty());
        settle(&mut sync, &mut rx).await;
        assert_eq!(gateway.subscribe_calls(), 2);

        // The first transport keeps firing after it was detached.
        gateway.deliver_on(0, wave(1, 3, "stale"));
        gateway.deliver_on(1, wave(2, 4, "fresh"));
        loop {
            let event = next_feed_event(&mut rx).await;
            let fresh = matches!(&event, FeedEvent::LiveRecord { record, .. } if record.message == "fresh");
            sync.handle(event);
            if fresh {
                break;
            }
        }

        assert_eq!(sync.feed().records(), &[wave(2, 2, "new"), wave(2, 4, "fresh")]);
        assert_eq!(gateway.unsubscribe_calls(), 1);

        sync.teardown();
        assert_eq!(gateway.unsubscribe_calls(), 2);
        sync.teardown();
        assert_eq!(gateway.unsubscribe_calls(), 2);
    }

    #[tokio::test]
    async fn test_stale_results_are_discarded() {
        let (mut sync, mut rx, gateway) = synchronizer(MockGateway::with_history(vec![wave(1, 1, "a")]));
        sync.initialize(account(1));
        let stale = sync.epoch();
        sync.initialize(account(2));

        // Four results: history and subscription for each epoch.
        let mut events = Vec::new();
        for _ in 0..4 {
            events.push(next_feed_event(&mut rx).await);
        }
        for event in events {
            sync.handle(event);
        }

        assert_eq!(gateway.subscribe_calls(), 2);
        // The stale subscription was detached as soon as it resolved.
        assert_eq!(gateway.unsubscribe_calls(), 1);
        assert!(sync.has_subscription());
        assert_eq!(sync.feed().len(), 1);

        sync.handle(FeedEvent::LiveRecord {
            epoch: stale,
            record: wave(5, 5, "ghost"),
        });
        assert_eq!(sync.feed().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_stream_degrades_live_source() {
        let (mut sync, mut rx, gateway) = synchronizer(MockGateway::with_history(vec![]));
        sync.initialize(account(1));
        settle(&mut sync, &mut rx).await;

        gateway.close_streams();
        let event = next_feed_event(&mut rx).await;
        assert!(matches!(event, FeedEvent::LiveClosed { .. }));
        assert!(sync.handle(event).is_some());
        assert_eq!(sync.live_status(), SourceStatus::Degraded);
        assert_eq!(gateway.unsubscribe_calls(), 1);
    }
}
