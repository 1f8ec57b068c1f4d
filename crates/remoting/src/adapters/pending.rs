//! Pending Call Registry - correlates replies with outstanding calls.
//!
//! Flow:
//! 1. Executor creates a `PendingCall` and keeps the `PendingReply` future
//! 2. Executor calls `register()` so the registry can find the call by id
//! 3. Transport publishes the request and later delivers the reply
//! 4. Reply path calls `fulfill()` / `fault()` (or `dispatch()`)
//! 5. Executor's `PendingReply` resolves exactly once
//!
//! The registry only holds weak references: the executor owns the call for
//! its whole lifetime. Removing an entry from the map is the linearization
//! point, so of two racing completions only the first one finds the call.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::{RemotingError, RemotingResult};
use crate::domain::message::RemoteMessage;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

type Completion = RemotingResult<String>;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A single-assignment slot for the outcome of one remote call.
pub struct PendingCall {
    correlation_id: CorrelationId,
    /// Routing key or method name (for logging)
    label: String,
    created_at: Instant,
    timeout: Option<Duration>,
    completer: Mutex<Option<oneshot::Sender<Completion>>>,
}

impl PendingCall {
    /// Create a call with a fresh correlation id.
    ///
    /// Returns the call and the future that resolves when it completes.
    pub fn new(label: impl Into<String>, timeout: Option<Duration>) -> (Arc<Self>, PendingReply) {
        let correlation_id = CorrelationId::new();
        let (tx, rx) = oneshot::channel();

        let call = Arc::new(Self {
            correlation_id,
            label: label.into(),
            created_at: Instant::now(),
            timeout,
            completer: Mutex::new(Some(tx)),
        });

        (call, PendingReply { correlation_id, rx })
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether a terminal outcome has been applied
    pub fn is_completed(&self) -> bool {
        self.completer.lock().is_none()
    }

    /// Whether the call's deadline has passed at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        self.timeout
            .is_some_and(|timeout| now.duration_since(self.created_at) > timeout)
    }

    /// Resolve the call with a success payload.
    pub fn set_result(&self, payload: String) -> RemotingResult<()> {
        self.complete(Ok(payload))
    }

    /// Resolve the call with an error.
    pub fn set_exception(&self, error: RemotingError) -> RemotingResult<()> {
        self.complete(Err(error))
    }

    fn complete(&self, outcome: Completion) -> RemotingResult<()> {
        let Some(sender) = self.completer.lock().take() else {
            error!(
                correlation_id = %self.correlation_id,
                call = %self.label,
                "Pending call completed more than once"
            );
            return Err(RemotingError::DoubleCompletion(self.correlation_id));
        };

        if sender.send(outcome).is_err() {
            // The outcome is still terminal; the caller stopped waiting.
            debug!(
                correlation_id = %self.correlation_id,
                call = %self.label,
                "Pending call receiver dropped"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("correlation_id", &self.correlation_id)
            .field("label", &self.label)
            .field("timeout", &self.timeout)
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Future resolving to the outcome of a `PendingCall`.
#[derive(Debug)]
pub struct PendingReply {
    correlation_id: CorrelationId,
    rx: oneshot::Receiver<Completion>,
}

impl PendingReply {
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }
}

impl Future for PendingReply {
    type Output = Completion;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RemotingError::ChannelClosed)))
    }
}

/// Statistics for the pending call registry
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Total calls registered
    pub total_registered: AtomicU64,
    /// Total calls resolved with a payload
    pub total_completed: AtomicU64,
    /// Total calls resolved with an error
    pub total_faulted: AtomicU64,
    /// Total replies that matched no outstanding call
    pub total_unmatched: AtomicU64,
    /// Total calls removed by the expiry sweep
    pub total_expired: AtomicU64,
    /// Total calls detached without completion
    pub total_cancelled: AtomicU64,
}

/// Concurrency-safe map from correlation id to outstanding call.
pub struct PendingCallRegistry {
    pending: DashMap<CorrelationId, Weak<PendingCall>>,
    stats: Arc<RegistryStats>,
}

impl PendingCallRegistry {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: Arc::new(RegistryStats::default()),
        }
    }

    /// Register a call under its correlation id.
    ///
    /// An id that is still outstanding is never replaced.
    pub fn register(&self, call: &Arc<PendingCall>) -> RemotingResult<()> {
        let correlation_id = call.correlation_id();

        match self.pending.entry(correlation_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().strong_count() > 0 {
                    error!(
                        correlation_id = %correlation_id,
                        call = %call.label(),
                        "Correlation id already registered"
                    );
                    return Err(RemotingError::DuplicateCorrelationId(correlation_id));
                }
                // Stale entry left by an owner that went away
                entry.insert(Arc::downgrade(call));
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::downgrade(call));
            }
        }

        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        debug!(
            correlation_id = %correlation_id,
            call = %call.label(),
            "Registered pending call"
        );
        Ok(())
    }

    /// Complete the call with a success payload and remove it.
    ///
    /// Unknown ids are logged and reported as `UnmatchedReply`; no other call
    /// is affected.
    pub fn fulfill(&self, correlation_id: CorrelationId, payload: String) -> RemotingResult<()> {
        self.resolve(correlation_id, Ok(payload))
    }

    /// Complete the call with an error and remove it.
    pub fn fault(&self, correlation_id: CorrelationId, error: RemotingError) -> RemotingResult<()> {
        self.resolve(correlation_id, Err(error))
    }

    /// Route a reply to `fulfill` or `fault`.
    ///
    /// Remote faults are passed on as they arrived; unwrapping is up to the
    /// executor.
    pub fn dispatch<M: RemoteMessage>(&self, message: M) -> RemotingResult<()> {
        let correlation_id = message.correlation_id();
        match message.into_outcome() {
            Ok(payload) => self.fulfill(correlation_id, payload),
            Err(fault) => self.fault(correlation_id, RemotingError::Remote(fault)),
        }
    }

    fn resolve(&self, correlation_id: CorrelationId, outcome: Completion) -> RemotingResult<()> {
        let Some(call) = self
            .pending
            .remove(&correlation_id)
            .and_then(|(_, call)| call.upgrade())
        else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(
                correlation_id = %correlation_id,
                "Reply for unknown or expired correlation ID"
            );
            return Err(RemotingError::UnmatchedReply(correlation_id));
        };

        let succeeded = outcome.is_ok();
        call.complete(outcome)?;

        if succeeded {
            self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.total_faulted.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            correlation_id = %correlation_id,
            call = %call.label(),
            succeeded,
            elapsed_ms = saturating_millis(call.created_at.elapsed()),
            "Completed pending call"
        );
        Ok(())
    }

    /// Detach a call without completing it.
    ///
    /// Returns false if the id was not registered.
    pub fn remove(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %correlation_id, "Removed pending call");
            true
        } else {
            false
        }
    }

    /// Fault every call whose deadline has passed and drop entries whose
    /// owner is gone.
    ///
    /// Returns the number of calls expired. A call that was already completed
    /// is unregistered but not counted.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<CorrelationId> = self
            .pending
            .iter()
            .filter(|entry| entry.value().upgrade().map_or(true, |call| call.is_expired(now)))
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for correlation_id in expired {
            // A reply may have won the race since the scan
            let Some((_, call)) = self.pending.remove(&correlation_id) else {
                continue;
            };

            let Some(call) = call.upgrade() else {
                // Owner went away without unregistering
                removed += 1;
                self.stats.total_expired.fetch_add(1, Ordering::Relaxed);
                continue;
            };

            let after = call.timeout().unwrap_or_default();
            match call.set_exception(RemotingError::Timeout {
                correlation_id,
                after,
            }) {
                Ok(()) => {
                    removed += 1;
                    self.stats.total_expired.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        correlation_id = %correlation_id,
                        call = %call.label(),
                        elapsed_ms = saturating_millis(now.duration_since(call.created_at)),
                        "Removed expired pending call"
                    );
                }
                Err(e) => {
                    debug!(
                        correlation_id = %correlation_id,
                        error = %e,
                        "Expired pending call was already completed"
                    );
                }
            }
        }

        removed
    }

    /// Fault every outstanding call, e.g. when the reply path shuts down.
    ///
    /// Returns the number of calls failed.
    pub fn fail_all(&self, make_error: impl Fn(CorrelationId) -> RemotingError) -> usize {
        let ids: Vec<CorrelationId> = self.pending.iter().map(|entry| *entry.key()).collect();

        let mut failed = 0;
        for correlation_id in ids {
            if let Some((_, call)) = self.pending.remove(&correlation_id) {
                if let Some(call) = call.upgrade() {
                    if call.set_exception(make_error(correlation_id)).is_ok() {
                        self.stats.total_faulted.fetch_add(1, Ordering::Relaxed);
                        failed += 1;
                    }
                }
            }
        }

        failed
    }

    /// Get number of currently pending calls
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation ID is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    /// Get statistics
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}

impl Default for PendingCallRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task to fault calls past their deadline
pub async fn cleanup_task(registry: Arc<PendingCallRegistry>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = registry.remove_expired();
        if removed > 0 {
            debug!(removed = removed, "Cleaned up expired pending calls");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::RemoteFault;
    use crate::domain::message::InboundReply;

    fn registered(registry: &PendingCallRegistry) -> (Arc<PendingCall>, PendingReply) {
        let (call, reply) = PendingCall::new("ITest.Method", None);
        registry.register(&call).unwrap();
        (call, reply)
    }

    #[tokio::test]
    async fn test_register_and_fulfill() {
        let registry = PendingCallRegistry::new();
        let (call, reply) = registered(&registry);
        let id = call.correlation_id();
        assert!(registry.is_pending(&id));
        assert_eq!(registry.pending_count(), 1);

        registry.fulfill(id, "true".into()).unwrap();

        assert_eq!(reply.await.unwrap(), "true");
        assert!(call.is_completed());
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.stats().total_completed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_fault_delivers_error() {
        let registry = PendingCallRegistry::new();
        let (call, reply) = registered(&registry);

        registry
            .fault(call.correlation_id(), RemotingError::Remote(RemoteFault::internal("boom")))
            .unwrap();

        let err = reply.await.unwrap_err();
        assert_eq!(err.remote_fault().unwrap().message, "boom");
        assert_eq!(registry.stats().total_faulted.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_fulfill_unknown_id() {
        let registry = PendingCallRegistry::new();
        let (other, _reply) = registered(&registry);
        let unknown = CorrelationId::new();

        let result = registry.fulfill(unknown, "null".into());
        assert!(matches!(result, Err(RemotingError::UnmatchedReply(id)) if id == unknown));

        // The unrelated call is untouched
        assert!(registry.is_pending(&other.correlation_id()));
        assert!(!other.is_completed());
        assert_eq!(registry.stats().total_unmatched.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_replay_is_unmatched() {
        let registry = PendingCallRegistry::new();
        let (call, reply) = registered(&registry);
        let id = call.correlation_id();

        registry.fulfill(id, "1".into()).unwrap();
        assert!(matches!(
            registry.fulfill(id, "2".into()),
            Err(RemotingError::UnmatchedReply(_))
        ));
        assert!(matches!(
            registry.fault(id, RemotingError::ChannelClosed),
            Err(RemotingError::UnmatchedReply(_))
        ));

        // First outcome wins
        assert_eq!(reply.await.unwrap(), "1");
    }

    #[test]
    fn test_double_completion_rejected() {
        let (call, _reply) = PendingCall::new("ITest.Method", None);

        call.set_result("first".into()).unwrap();
        assert!(matches!(
            call.set_result("second".into()),
            Err(RemotingError::DoubleCompletion(id)) if id == call.correlation_id()
        ));
        assert!(matches!(
            call.set_exception(RemotingError::ChannelClosed),
            Err(RemotingError::DoubleCompletion(_))
        ));
    }

    #[tokio::test]
    async fn test_first_completion_is_kept() {
        let (call, reply) = PendingCall::new("ITest.Method", None);

        call.set_exception(RemotingError::ChannelClosed).unwrap();
        let _ = call.set_result("late".into());

        assert!(matches!(reply.await, Err(RemotingError::ChannelClosed)));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = PendingCallRegistry::new();
        let (call, _reply) = registered(&registry);

        assert!(matches!(
            registry.register(&call),
            Err(RemotingError::DuplicateCorrelationId(_))
        ));
        assert_eq!(registry.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_owner_dropped_reply_is_unmatched() {
        let registry = PendingCallRegistry::new();
        let (call, reply) = registered(&registry);
        let id = call.correlation_id();
        drop(call);
        drop(reply);

        assert!(matches!(
            registry.fulfill(id, "true".into()),
            Err(RemotingError::UnmatchedReply(_))
        ));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_call_closes_reply() {
        let (call, reply) = PendingCall::new("ITest.Method", None);
        drop(call);
        assert!(matches!(reply.await, Err(RemotingError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_dispatch_routes_outcome() {
        let registry = PendingCallRegistry::new();
        let (ok_call, ok_reply) = registered(&registry);
        let (err_call, err_reply) = registered(&registry);

        registry
            .dispatch(InboundReply::success(ok_call.correlation_id(), "42"))
            .unwrap();
        registry
            .dispatch(InboundReply::fault(
                err_call.correlation_id(),
                RemoteFault::argument_null("x"),
            ))
            .unwrap();

        assert_eq!(ok_reply.await.unwrap(), "42");
        assert!(matches!(err_reply.await, Err(RemotingError::Remote(_))));
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = PendingCallRegistry::new();
        let (call, _reply) = registered(&registry);
        let id = call.correlation_id();

        assert!(registry.remove(&id));
        assert!(!registry.is_pending(&id));
        assert!(!registry.remove(&id));
        assert!(!call.is_completed());
        assert_eq!(registry.stats().total_cancelled.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_remove_expired() {
        let registry = PendingCallRegistry::new();
        let (expiring, expiring_reply) = PendingCall::new("ITest.Slow", Some(Duration::from_millis(10)));
        registry.register(&expiring).unwrap();
        let (patient, _patient_reply) = registered(&registry);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(registry.remove_expired(), 1);
        assert!(!registry.is_pending(&expiring.correlation_id()));
        assert!(registry.is_pending(&patient.correlation_id()));
        assert!(matches!(
            expiring_reply.await,
            Err(RemotingError::Timeout { after, .. }) if after == Duration::from_millis(10)
        ));
        assert_eq!(registry.stats().total_expired.load(Ordering::Relaxed), 1);

        // Late reply is a harmless drop
        assert!(registry
            .fulfill(expiring.correlation_id(), "true".into())
            .is_err());
    }

    #[tokio::test]
    async fn test_remove_expired_skips_completed_call() {
        let registry = PendingCallRegistry::new();
        let (call, reply) = PendingCall::new("ITest.Slow", Some(Duration::from_millis(10)));
        registry.register(&call).unwrap();

        // Completed behind the registry's back, entry still present
        call.set_result("true".into()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(registry.remove_expired(), 0);
        assert!(!registry.is_pending(&call.correlation_id()));
        assert_eq!(registry.stats().total_expired.load(Ordering::Relaxed), 0);
        assert_eq!(reply.await.unwrap(), "true");
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_fail_all() {
        let registry = PendingCallRegistry::new();
        let (_a, reply_a) = registered(&registry);
        let (_b, reply_b) = registered(&registry);

        assert_eq!(registry.fail_all(|_| RemotingError::ChannelClosed), 2);
        assert_eq!(registry.pending_count(), 0);
        assert!(matches!(reply_a.await, Err(RemotingError::ChannelClosed)));
        assert!(matches!(reply_b.await, Err(RemotingError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_concurrent_fulfill_and_fault_single_winner() {
        let registry = Arc::new(PendingCallRegistry::new());

        for _ in 0..200 {
            let (call, reply) = registered(&registry);
            let id = call.correlation_id();

            let r1 = Arc::clone(&registry);
            let r2 = Arc::clone(&registry);
            let fulfill = tokio::spawn(async move { r1.fulfill(id, "ok".into()).is_ok() });
            let fault =
                tokio::spawn(async move { r2.fault(id, RemotingError::ChannelClosed).is_ok() });

            let (fulfilled, faulted) = (fulfill.await.unwrap(), fault.await.unwrap());
            assert!(fulfilled ^ faulted, "exactly one completion must win");

            match reply.await {
                Ok(payload) => assert!(fulfilled && payload == "ok"),
                Err(_) => assert!(faulted),
            }
        }

        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.stats().total_unmatched.load(Ordering::Relaxed), 200);
    }
}
