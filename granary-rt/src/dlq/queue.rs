// Layer 1: Standard library imports
use std::collections::VecDeque;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::warn;

// Layer 3: Internal module imports
use super::config::EffectiveDlqConfig;
use crate::message::InvocationMessage;

/// One captured message with its failure metadata.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    /// The message as it was enqueued
    pub message: InvocationMessage,

    /// Why the message ended here, e.g. `"rejected"` or a failure rendering
    pub reason: String,

    /// Captured failure detail, when stack-trace capture is on
    pub stack_trace: Option<String>,

    /// Delivery attempts consumed before capture
    pub attempt: u32,

    /// When the entry was captured
    pub enqueued_at: DateTime<Utc>,
}

/// Bounded ring of dead-letter entries for one actor type.
///
/// Overflow evicts the oldest entry; within one actor the original
/// enqueue order is preserved.
pub struct DeadLetterQueue {
    actor_type: String,
    max_messages: usize,
    capture_stack_traces: bool,
    entries: Mutex<VecDeque<DeadLetterEntry>>,
}

impl DeadLetterQueue {
    /// Create a queue from the resolved per-type configuration.
    pub fn new(actor_type: impl Into<String>, config: &EffectiveDlqConfig) -> Self {
        Self {
            actor_type: actor_type.into(),
            max_messages: config.max_messages.max(1),
            capture_stack_traces: config.capture_stack_traces,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// The actor type this queue serves.
    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    /// Capture a message. `detail` is stored only when stack-trace capture
    /// is configured.
    pub fn push(
        &self,
        message: InvocationMessage,
        reason: impl Into<String>,
        detail: Option<String>,
        attempt: u32,
    ) {
        let reason = reason.into();
        warn!(
            actor_type = %self.actor_type,
            message_id = %message.message_id,
            method = %message.method,
            %reason,
            "message dead-lettered"
        );
        let entry = DeadLetterEntry {
            message,
            reason,
            stack_trace: if self.capture_stack_traces {
                detail
            } else {
                None
            },
            attempt,
            enqueued_at: Utc::now(),
        };
        let mut entries = self.entries.lock();
        if entries.len() == self.max_messages {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn entries(&self) -> Vec<DeadLetterEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Drop all retained entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
