// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// Layer 3: Internal module imports
use super::activity::ActivityTracker;
use super::adaptive::{AdaptiveMailboxOptions, AdaptiveState};
use crate::dlq::DeadLetterQueue;
use crate::message::Envelope;

/// Default capacity for fixed-size mailboxes
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1000;

/// Mailbox error types for the suspending post path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    /// Mailbox is full
    #[error("Mailbox is full (capacity: {capacity})")]
    Full { capacity: usize },

    /// Mailbox was disposed
    #[error("Mailbox is closed")]
    Closed,

    /// The caller's cancellation token tripped before space was available
    #[error("Post was cancelled")]
    Cancelled,
}

struct Shared {
    actor_type: String,
    actor_id: String,
    queue: Mutex<VecDeque<Envelope>>,
    capacity: AtomicUsize,
    closed: AtomicBool,
    /// Wakes the single consumer
    recv_notify: Notify,
    /// Wakes blocked `post_wait` callers as slots free up
    send_notify: Notify,
    /// Fires once on disposal so every waiter re-checks `closed`
    closed_token: CancellationToken,
    tracker: Option<Arc<dyn ActivityTracker>>,
    dead_letters: Option<Arc<DeadLetterQueue>>,
    adaptive: Option<Mutex<AdaptiveState>>,
}

/// Bounded FIFO mailbox feeding one activation's serialized worker.
///
/// Enqueue order is preserved; depth never exceeds the current capacity;
/// after disposal no post succeeds and the activity tracker's
/// `remove_actor` has been observed exactly once. Handles are cheap
/// clones sharing one queue.
///
/// # Example
/// ```rust
/// use granary_rt::mailbox::Mailbox;
/// use granary_rt::message::{Envelope, InvocationMessage};
/// use bytes::Bytes;
///
/// # tokio_test::block_on(async {
/// let mailbox = Mailbox::builder("Worker", "w1").capacity(8).build();
/// let message = InvocationMessage::new("Ping", Bytes::new());
/// assert!(mailbox.post(Envelope::invoke(message, None)));
/// assert_eq!(mailbox.message_count(), 1);
///
/// let envelope = mailbox.recv().await.unwrap();
/// assert_eq!(envelope.attempt(), 0);
/// # });
/// ```
#[derive(Clone)]
pub struct Mailbox {
    shared: Arc<Shared>,
}

/// Configures and builds a [`Mailbox`].
pub struct MailboxBuilder {
    actor_type: String,
    actor_id: String,
    capacity: usize,
    tracker: Option<Arc<dyn ActivityTracker>>,
    dead_letters: Option<Arc<DeadLetterQueue>>,
    adaptive: Option<AdaptiveMailboxOptions>,
}

impl MailboxBuilder {
    /// Fixed capacity, ignored when adaptive options are set and enabled.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Attach an activity tracker.
    pub fn tracker(mut self, tracker: Arc<dyn ActivityTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Attach a dead-letter queue for rejected messages.
    pub fn dead_letters(mut self, queue: Arc<DeadLetterQueue>) -> Self {
        self.dead_letters = Some(queue);
        self
    }

    /// Enable adaptive capacity per the options. Disabled options are a
    /// no-op.
    pub fn adaptive(mut self, options: AdaptiveMailboxOptions) -> Self {
        if options.enabled {
            self.adaptive = Some(options);
        }
        self
    }

    /// Build the mailbox.
    pub fn build(self) -> Mailbox {
        let (capacity, adaptive) = match self.adaptive {
            Some(options) => (
                options.initial_capacity.max(1),
                Some(Mutex::new(AdaptiveState::new(options))),
            ),
            None => (self.capacity, None),
        };
        Mailbox {
            shared: Arc::new(Shared {
                actor_type: self.actor_type,
                actor_id: self.actor_id,
                queue: Mutex::new(VecDeque::new()),
                capacity: AtomicUsize::new(capacity),
                closed: AtomicBool::new(false),
                recv_notify: Notify::new(),
                send_notify: Notify::new(),
                closed_token: CancellationToken::new(),
                tracker: self.tracker,
                dead_letters: self.dead_letters,
                adaptive,
            }),
        }
    }
}

impl Mailbox {
    /// Start building a mailbox for one activation.
    pub fn builder(actor_type: impl Into<String>, actor_id: impl Into<String>) -> MailboxBuilder {
        MailboxBuilder {
            actor_type: actor_type.into(),
            actor_id: actor_id.into(),
            capacity: DEFAULT_MAILBOX_CAPACITY,
            tracker: None,
            dead_letters: None,
            adaptive: None,
        }
    }

    /// The owning actor's type name.
    pub fn actor_type(&self) -> &str {
        &self.shared.actor_type
    }

    /// The owning actor's id.
    pub fn actor_id(&self) -> &str {
        &self.shared.actor_id
    }

    /// Current queue depth.
    pub fn message_count(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Current capacity (moves inside the configured bounds when adaptive).
    pub fn capacity(&self) -> usize {
        self.shared.capacity.load(Ordering::Relaxed)
    }

    /// Whether the mailbox has been disposed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// The attached activity tracker, if any.
    pub fn tracker(&self) -> Option<&Arc<dyn ActivityTracker>> {
        self.shared.tracker.as_ref()
    }

    /// The attached dead-letter queue, if any.
    pub fn dead_letters(&self) -> Option<&Arc<DeadLetterQueue>> {
        self.shared.dead_letters.as_ref()
    }

    /// Enqueue without suspending.
    ///
    /// Returns `true` on acceptance (the activity tracker sees
    /// `record_enqueued`), `false` when closed or at capacity (a configured
    /// dead-letter queue captures the message with reason `"rejected"`).
    pub fn post(&self, envelope: Envelope) -> bool {
        let shared = &self.shared;
        {
            let mut queue = shared.queue.lock();
            if !shared.closed.load(Ordering::Acquire) {
                if let Some(adaptive) = &shared.adaptive {
                    let capacity = shared.capacity.load(Ordering::Relaxed);
                    if let Some(next) = adaptive.lock().observe(queue.len(), capacity) {
                        shared.capacity.store(next, Ordering::Relaxed);
                        debug!(
                            actor_type = %shared.actor_type,
                            actor_id = %shared.actor_id,
                            capacity = next,
                            "mailbox capacity adapted"
                        );
                    }
                }
                if queue.len() < shared.capacity.load(Ordering::Relaxed) {
                    queue.push_back(envelope);
                    drop(queue);
                    if let Some(tracker) = &shared.tracker {
                        tracker.record_enqueued(&shared.actor_id, &shared.actor_type);
                    }
                    shared.recv_notify.notify_one();
                    return true;
                }
            }
        }
        if let Some(dead_letters) = &shared.dead_letters {
            dead_letters.push(
                envelope.dead_letter_view(),
                "rejected",
                None,
                envelope.attempt(),
            );
        }
        false
    }

    /// Enqueue, suspending until capacity is available or the mailbox
    /// closes. Cancellation returns [`MailboxError::Cancelled`] with the
    /// message not enqueued.
    pub async fn post_wait(
        &self,
        envelope: Envelope,
        cancel: &CancellationToken,
    ) -> Result<(), MailboxError> {
        let shared = &self.shared;
        let mut pending = Some(envelope);
        loop {
            if shared.closed.load(Ordering::Acquire) {
                return Err(MailboxError::Closed);
            }
            {
                let mut queue = shared.queue.lock();
                if !shared.closed.load(Ordering::Acquire)
                    && queue.len() < shared.capacity.load(Ordering::Relaxed)
                {
                    if let Some(envelope) = pending.take() {
                        queue.push_back(envelope);
                    }
                    drop(queue);
                    if let Some(tracker) = &shared.tracker {
                        tracker.record_enqueued(&shared.actor_id, &shared.actor_type);
                    }
                    shared.recv_notify.notify_one();
                    return Ok(());
                }
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MailboxError::Cancelled),
                _ = shared.closed_token.cancelled() => {}
                _ = shared.send_notify.notified() => {}
            }
        }
    }

    /// Dequeue the next envelope; `None` once the mailbox is disposed.
    ///
    /// Intended for the activation's single worker; strict FIFO.
    pub async fn recv(&self) -> Option<Envelope> {
        let shared = &self.shared;
        loop {
            {
                let mut queue = shared.queue.lock();
                if let Some(envelope) = queue.pop_front() {
                    drop(queue);
                    shared.send_notify.notify_one();
                    return Some(envelope);
                }
            }
            if shared.closed.load(Ordering::Acquire) {
                return None;
            }
            tokio::select! {
                _ = shared.recv_notify.notified() => {}
                _ = shared.closed_token.cancelled() => {}
            }
        }
    }

    /// Dispose the mailbox. Idempotent: the queue drains once, further
    /// posts are rejected, and the tracker's `remove_actor` fires exactly
    /// once.
    pub fn dispose(&self) {
        let shared = &self.shared;
        if shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let drained = {
            let mut queue = shared.queue.lock();
            let count = queue.len();
            queue.clear();
            count
        };
        shared.closed_token.cancel();
        if let Some(tracker) = &shared.tracker {
            tracker.remove_actor(&shared.actor_id);
        }
        debug!(
            actor_type = %shared.actor_type,
            actor_id = %shared.actor_id,
            drained,
            "mailbox disposed"
        );
    }
}
