// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// Layer 3: Internal module imports
use crate::actor::supervision::{ChildFailureContext, SupervisionDirective};
use crate::dispatch::DispatchError;
use crate::util::{MessageId, StreamId};

/// A single method invocation addressed to one activation.
///
/// Carries the method name and an opaque length-delimited binary payload;
/// the dispatcher for the actor's type interprets the payload. The record
/// is immutable after enqueue.
///
/// # Example
/// ```rust
/// use granary_rt::message::InvocationMessage;
/// use bytes::Bytes;
///
/// let msg = InvocationMessage::new("GetBalance", Bytes::new());
/// assert_eq!(msg.method, "GetBalance");
/// assert!(msg.correlation_id.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct InvocationMessage {
    /// Globally unique message id
    pub message_id: MessageId,

    /// Optional correlation id for request/response tracking
    pub correlation_id: Option<Uuid>,

    /// Message creation timestamp
    pub timestamp: DateTime<Utc>,

    /// Name of the actor method to invoke
    pub method: String,

    /// Opaque serialized request payload
    pub payload: Bytes,
}

impl InvocationMessage {
    /// Create a new invocation with a fresh message id and timestamp.
    pub fn new(method: impl Into<String>, payload: Bytes) -> Self {
        Self {
            message_id: MessageId::new(),
            correlation_id: None,
            timestamp: Utc::now(),
            method: method.into(),
            payload,
        }
    }

    /// Builder method: set the correlation id.
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }
}

/// A message flowing through a pub/sub stream.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// Globally unique message id
    pub message_id: MessageId,

    /// Publish timestamp
    pub timestamp: DateTime<Utc>,

    /// Opaque serialized payload
    pub payload: Bytes,
}

impl StreamMessage {
    /// Create a new stream message with a fresh id and timestamp.
    pub fn new(payload: Bytes) -> Self {
        Self {
            message_id: MessageId::new(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Convenience constructor for UTF-8 payloads.
    pub fn from_text(text: &str) -> Self {
        Self::new(Bytes::copy_from_slice(text.as_bytes()))
    }
}

/// One-shot channel the activation worker answers an invocation on.
pub type ReplySlot = oneshot::Sender<Result<Bytes, DispatchError>>;

/// The unit queued on a mailbox.
///
/// Invocations carry their retry attempt, an optional reply channel, and
/// the caller's cancellation token; stream deliveries carry the stream
/// identity so the subscriber callback can observe it.
#[derive(Debug)]
pub enum Envelope {
    /// A framed method invocation
    Invoke {
        message: InvocationMessage,
        attempt: u32,
        reply: Option<ReplySlot>,
        cancel: CancellationToken,
    },

    /// A stream delivery for `on_stream_message`
    Stream {
        stream: StreamId,
        message: StreamMessage,
    },

    /// A supervision question for `on_child_failure`
    ChildFailure {
        context: ChildFailureContext,
        respond: oneshot::Sender<SupervisionDirective>,
    },
}

impl Envelope {
    /// Wrap an invocation on its first delivery attempt.
    pub fn invoke(message: InvocationMessage, reply: Option<ReplySlot>) -> Self {
        Self::Invoke {
            message,
            attempt: 0,
            reply,
            cancel: CancellationToken::new(),
        }
    }

    /// The invocation-shaped view captured into dead-letter entries.
    ///
    /// Stream deliveries are rendered as `on_stream_message` invocations so
    /// the dead-letter queue stores one record shape.
    pub fn dead_letter_view(&self) -> InvocationMessage {
        match self {
            Self::Invoke { message, .. } => message.clone(),
            Self::Stream { message, .. } => InvocationMessage {
                message_id: message.message_id,
                correlation_id: None,
                timestamp: message.timestamp,
                method: "on_stream_message".to_owned(),
                payload: message.payload.clone(),
            },
            Self::ChildFailure { context, .. } => InvocationMessage {
                message_id: MessageId::new(),
                correlation_id: None,
                timestamp: context.timestamp,
                method: "on_child_failure".to_owned(),
                payload: Bytes::new(),
            },
        }
    }

    /// The delivery attempt counter (always 0 for non-invocation envelopes).
    pub fn attempt(&self) -> u32 {
        match self {
            Self::Invoke { attempt, .. } => *attempt,
            Self::Stream { .. } | Self::ChildFailure { .. } => 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_invocation_message_defaults() {
        let msg = InvocationMessage::new("Ping", Bytes::from_static(b"x"));
        assert_eq!(msg.method, "Ping");
        assert_eq!(&msg.payload[..], b"x");
        assert!(msg.correlation_id.is_none());
    }

    #[test]
    fn test_invocation_message_ids_unique() {
        let a = InvocationMessage::new("Ping", Bytes::new());
        let b = InvocationMessage::new("Ping", Bytes::new());
        assert_ne!(a.message_id, b.message_id);
    }

    #[test]
    fn test_with_correlation_id() {
        let id = Uuid::new_v4();
        let msg = InvocationMessage::new("Ping", Bytes::new()).with_correlation_id(id);
        assert_eq!(msg.correlation_id, Some(id));
    }

    #[test]
    fn test_stream_message_from_text() {
        let msg = StreamMessage::from_text("hello");
        assert_eq!(&msg.payload[..], b"hello");
    }

    #[test]
    fn test_dead_letter_view_of_invoke() {
        let msg = InvocationMessage::new("Work", Bytes::from_static(b"p"));
        let id = msg.message_id;
        let envelope = Envelope::invoke(msg, None);
        let view = envelope.dead_letter_view();
        assert_eq!(view.message_id, id);
        assert_eq!(view.method, "Work");
    }

    #[test]
    fn test_dead_letter_view_of_stream() {
        let stream = StreamId::new("orders", "a1").unwrap();
        let message = StreamMessage::from_text("m");
        let envelope = Envelope::Stream { stream, message };
        let view = envelope.dead_letter_view();
        assert_eq!(view.method, "on_stream_message");
        assert_eq!(&view.payload[..], b"m");
    }
}
