//! # Correlation Table
//!
//! Pairs outstanding invocations with the responses that eventually arrive for
//! them. One table exists per channel; ids are only unique within it.
//!
//! ## Flow
//!
//! 1. The receiver calls `register()` and sends the request carrying the slot id.
//! 2. A protocol handler decodes the id of a response and calls `fulfill()` with
//!    a lazy `ResultProducer`.
//! 3. The caller awaits the `PendingSlot` and decodes the producer itself.
//!
//! ## Invariants
//! - At most one live entry per id. An id is handed out again only after its
//!   entry was removed (fulfilled, failed, cancelled, timed out or abandoned).
//! - Ids wrap, generations do not. A slot only ever removes or marks the entry
//!   of its own registration, never a newer one reusing the id.
//! - No more than `limit` entries are outstanding at once.
//! - Every entry owns its own oneshot channel and notifier; there is no lock
//!   shared between unrelated invocations.
//! - A result that nobody is waiting for is discarded, which releases its
//!   stream. Unknown ids are counted and logged, never propagated.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU16;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Notify;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::warn;

use crate::error::InvocationError;
use crate::producer::ResultProducer;

pub type CorrelationId = u16;

/// Number of distinct ids a channel can have in flight.
pub const MAX_CORRELATION_IDS: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrelationError {
    #[error("{limit} invocations already outstanding on this channel")]
    Exhausted { limit: usize },
    #[error("result of invocation {0} was already claimed")]
    AlreadyClaimed(CorrelationId),
}

enum Delivery {
    Result(Box<dyn ResultProducer>),
    Failed(InvocationError),
}

impl Delivery {
    fn into_result(self) -> Result<Box<dyn ResultProducer>, InvocationError> {
        match self {
            Self::Result(producer) => Ok(producer),
            Self::Failed(e) => Err(e),
        }
    }

    fn discard(self) {
        if let Self::Result(producer) = self {
            producer.discard_result();
        }
    }
}

struct PendingEntry {
    generation: u64,
    tx: oneshot::Sender<Delivery>,
    proceed: Arc<Notify>,
    /// Set once nobody will ever read the result.
    discard: bool,
    registered_at: Instant,
}

/// Counters describing the table's lifetime activity.
#[derive(Debug, Default)]
pub struct CorrelationStats {
    pub registered: AtomicU64,
    pub fulfilled: AtomicU64,
    pub failed: AtomicU64,
    /// Results that arrived for ids with no live entry.
    pub anomalies: AtomicU64,
    pub timeouts: AtomicU64,
    pub cancelled: AtomicU64,
    pub discarded: AtomicU64,
}

impl CorrelationStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct CorrelationTable {
    pending: DashMap<CorrelationId, PendingEntry>,
    next_id: AtomicU16,
    next_generation: AtomicU64,
    outstanding: AtomicUsize,
    limit: usize,
    stats: CorrelationStats,
}

impl CorrelationTable {
    /// Creates a table admitting at most `limit` outstanding entries.
    ///
    /// The limit is clamped to `1..=MAX_CORRELATION_IDS`.
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            pending: DashMap::new(),
            next_id: AtomicU16::new(1),
            next_generation: AtomicU64::new(0),
            outstanding: AtomicUsize::new(0),
            limit: limit.clamp(1, MAX_CORRELATION_IDS),
            stats: CorrelationStats::default(),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn pending_count(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn contains(&self, id: CorrelationId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn stats(&self) -> &CorrelationStats {
        &self.stats
    }

    /// Allocates an id that no outstanding entry uses.
    pub fn register(self: &Arc<Self>) -> Result<PendingSlot, CorrelationError> {
        self.outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < self.limit).then_some(n + 1))
            .map_err(|_| CorrelationError::Exhausted { limit: self.limit })?;

        let (tx, rx) = oneshot::channel();
        let proceed = Arc::new(Notify::new());
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        // A free id always exists: fewer than MAX_CORRELATION_IDS entries are live.
        let id = loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            match self.pending.entry(id) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(PendingEntry {
                        generation,
                        tx,
                        proceed: proceed.clone(),
                        discard: false,
                        registered_at: Instant::now(),
                    });
                    break id;
                }
            }
        };

        CorrelationStats::bump(&self.stats.registered);
        debug!(correlation_id = id, "Registered pending invocation");

        Ok(PendingSlot {
            id,
            generation,
            table: self.clone(),
            rx: Some(rx),
            proceed,
            detached: false,
        })
    }

    fn take(&self, id: CorrelationId) -> Option<PendingEntry> {
        let (_, entry) = self.pending.remove(&id)?;
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        Some(entry)
    }

    /// Removes the entry for `id` only if it still belongs to `generation`.
    fn take_own(&self, id: CorrelationId, generation: u64) -> Option<PendingEntry> {
        let (_, entry) = self.pending.remove_if(&id, |_, entry| entry.generation == generation)?;
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        Some(entry)
    }

    /// Hands a result to whoever waits on `id`.
    ///
    /// Returns false if no entry exists for `id`; the producer is then
    /// discarded and the anomaly counted.
    pub fn fulfill(&self, id: CorrelationId, producer: Box<dyn ResultProducer>) -> bool {
        let Some(entry) = self.take(id) else {
            warn!(correlation_id = id, "Result for unknown or expired correlation id");
            CorrelationStats::bump(&self.stats.anomalies);
            producer.discard_result();
            return false;
        };

        if entry.discard {
            CorrelationStats::bump(&self.stats.discarded);
            producer.discard_result();
            return true;
        }

        CorrelationStats::bump(&self.stats.fulfilled);
        debug!(
            correlation_id = id,
            elapsed_ms = entry.registered_at.elapsed().as_millis() as u64,
            "Fulfilled pending invocation"
        );
        if let Err(rejected) = entry.tx.send(Delivery::Result(producer)) {
            rejected.discard();
        }
        true
    }

    /// Fails the invocation waiting on `id`.
    pub fn fail(&self, id: CorrelationId, error: InvocationError) -> bool {
        let Some(entry) = self.take(id) else {
            warn!(correlation_id = id, error = %error, "Failure for unknown or expired correlation id");
            CorrelationStats::bump(&self.stats.anomalies);
            return false;
        };
        CorrelationStats::bump(&self.stats.failed);
        let _ = entry.tx.send(Delivery::Failed(error));
        true
    }

    /// Fails every outstanding invocation, e.g. once the channel is gone.
    pub fn fail_all(&self, reason: &str) -> usize {
        let ids: Vec<CorrelationId> = self.pending.iter().map(|e| *e.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some(entry) = self.take(id) {
                let _ = entry.tx.send(Delivery::Failed(InvocationError::ChannelClosed(reason.to_owned())));
                failed += 1;
            }
        }
        if failed > 0 {
            warn!(failed, reason, "Failed all pending invocations");
        }
        failed
    }

    /// Tells a synchronous waiter on `id` to stop waiting and continue
    /// asynchronously. The entry itself stays registered.
    pub fn proceed_async(&self, id: CorrelationId) -> bool {
        match self.pending.get(&id) {
            Some(entry) => {
                entry.proceed.notify_one();
                true
            }
            None => {
                warn!(correlation_id = id, "Proceed-async notification for unknown correlation id");
                CorrelationStats::bump(&self.stats.anomalies);
                false
            }
        }
    }

    fn mark_discard(&self, id: CorrelationId, generation: u64) -> bool {
        match self.pending.get_mut(&id) {
            Some(mut entry) if entry.generation == generation => {
                entry.discard = true;
                true
            }
            _ => false,
        }
    }

    fn cancel(&self, id: CorrelationId, generation: u64) -> bool {
        let Some(entry) = self.take_own(id, generation) else {
            return false;
        };
        CorrelationStats::bump(&self.stats.cancelled);
        debug!(correlation_id = id, "Cancelled pending invocation");
        let _ = entry.tx.send(Delivery::Failed(InvocationError::Cancelled(id)));
        true
    }

    fn expire(&self, id: CorrelationId, generation: u64) {
        if let Some(entry) = self.take_own(id, generation) {
            CorrelationStats::bump(&self.stats.timeouts);
            warn!(
                correlation_id = id,
                waited_ms = entry.registered_at.elapsed().as_millis() as u64,
                "Pending invocation timed out"
            );
        }
    }

    fn abandon(&self, id: CorrelationId, generation: u64) {
        if self.take_own(id, generation).is_some() {
            debug!(correlation_id = id, "Abandoned pending invocation");
        }
    }
}

impl fmt::Debug for CorrelationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationTable")
            .field("outstanding", &self.pending_count())
            .field("limit", &self.limit)
            .finish()
    }
}

/// How a synchronous wait ended.
pub enum Completion {
    Ready(Box<dyn ResultProducer>),
    /// The host asked the caller to continue asynchronously.
    ProceedAsync,
}

/// The caller's side of one correlation entry.
///
/// Dropping a slot that never received its result removes the entry; a result
/// arriving later is treated as an anomaly and discarded.
pub struct PendingSlot {
    id: CorrelationId,
    generation: u64,
    table: Arc<CorrelationTable>,
    rx: Option<oneshot::Receiver<Delivery>>,
    proceed: Arc<Notify>,
    detached: bool,
}

impl PendingSlot {
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// True once a wait has consumed (or given up on) the result.
    pub fn is_claimed(&self) -> bool {
        self.rx.is_none()
    }

    /// Waits for the result. Succeeds at most once per slot.
    pub async fn wait(&mut self, timeout: Duration) -> Result<Box<dyn ResultProducer>, InvocationError> {
        let rx = self.rx.take().ok_or(CorrelationError::AlreadyClaimed(self.id))?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(delivery)) => delivery.into_result(),
            Ok(Err(_)) => {
                self.table.abandon(self.id, self.generation);
                Err(InvocationError::ChannelClosed("correlation entry dropped".into()))
            }
            Err(_) => {
                self.table.expire(self.id, self.generation);
                Err(InvocationError::Timeout(self.id))
            }
        }
    }

    /// Waits for the result or for a proceed-asynchronously signal.
    ///
    /// After `ProceedAsync` the slot is still unclaimed and can be waited on.
    pub async fn wait_or_proceed(&mut self, timeout: Duration) -> Result<Completion, InvocationError> {
        let Some(rx) = self.rx.as_mut() else {
            return Err(CorrelationError::AlreadyClaimed(self.id).into());
        };
        let proceed = self.proceed.clone();

        let raced = tokio::time::timeout(timeout, async move {
            tokio::select! {
                biased;
                delivery = rx => Some(delivery),
                _ = proceed.notified() => None,
            }
        })
        .await;

        match raced {
            Ok(Some(Ok(delivery))) => {
                self.rx = None;
                delivery.into_result().map(Completion::Ready)
            }
            Ok(Some(Err(_))) => {
                self.rx = None;
                self.table.abandon(self.id, self.generation);
                Err(InvocationError::ChannelClosed("correlation entry dropped".into()))
            }
            Ok(None) => Ok(Completion::ProceedAsync),
            Err(_) => {
                self.rx = None;
                self.table.expire(self.id, self.generation);
                Err(InvocationError::Timeout(self.id))
            }
        }
    }

    /// Withdraws the entry locally. Returns true if no result had arrived yet.
    ///
    /// Says nothing about whether the host executed the call.
    pub fn cancel(&mut self) -> bool {
        self.table.cancel(self.id, self.generation)
    }

    /// Gives up on the result; it will be discarded whenever it arrives.
    pub fn discard(mut self) {
        self.detached = true;
        if self.table.mark_discard(self.id, self.generation) {
            return;
        }
        if let Some(mut rx) = self.rx.take() {
            if let Ok(delivery) = rx.try_recv() {
                CorrelationStats::bump(&self.table.stats.discarded);
                delivery.discard();
            }
        }
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        if let Some(mut rx) = self.rx.take() {
            // A result that arrived but was never read still holds its stream.
            if let Ok(delivery) = rx.try_recv() {
                delivery.discard();
            }
            self.table.abandon(self.id, self.generation);
        }
    }
}

impl fmt::Debug for PendingSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSlot")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("claimed", &self.is_claimed())
            .finish()
    }
}
