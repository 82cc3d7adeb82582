// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Errors raised while constructing identity values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Actor id was empty or whitespace-only
    #[error("Actor id must be a non-empty, non-whitespace string")]
    EmptyActorId,

    /// Actor type name was empty
    #[error("Actor type name must not be empty")]
    EmptyTypeName,

    /// Stream namespace was empty or whitespace-only
    #[error("Stream namespace must not be empty or whitespace")]
    EmptyNamespace,

    /// Stream key was empty or whitespace-only
    #[error("Stream key must not be empty or whitespace")]
    EmptyKey,
}

/// Logical address of a virtual actor: `(type_name, actor_id)`.
///
/// The pair is globally unique across the cluster and stable over the
/// actor's whole life; it says nothing about which silo currently hosts
/// the activation. The `actor_id` component is trimmed on construction
/// and must not be empty or whitespace.
///
/// # Example
/// ```rust
/// use granary_rt::util::ActorIdentity;
///
/// let identity = ActorIdentity::new("OrderActor", "order-42").unwrap();
/// assert_eq!(identity.actor_id(), "order-42");
/// assert_eq!(identity.to_string(), "OrderActor/order-42");
///
/// assert!(ActorIdentity::new("OrderActor", "   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorIdentity {
    type_name: String,
    actor_id: String,
}

impl ActorIdentity {
    /// Create a validated identity. The actor id is trimmed.
    pub fn new(
        type_name: impl Into<String>,
        actor_id: impl AsRef<str>,
    ) -> Result<Self, IdentityError> {
        let type_name = type_name.into();
        if type_name.is_empty() {
            return Err(IdentityError::EmptyTypeName);
        }
        let actor_id = actor_id.as_ref().trim();
        if actor_id.is_empty() {
            return Err(IdentityError::EmptyActorId);
        }
        Ok(Self {
            type_name,
            actor_id: actor_id.to_owned(),
        })
    }

    /// The actor type name (opaque, cluster-stable).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The per-type actor key.
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }
}

impl Display for ActorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_name, self.actor_id)
    }
}

/// Unique identifier for messages in the system.
///
/// UUID v4 backed, globally unique, cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a new random MessageId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create MessageId from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one silo (process) in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiloId(String);

impl SiloId {
    /// Wrap a silo name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The silo name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SiloId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SiloId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Identity of a pub/sub stream: `(namespace, key)`.
///
/// Equality is componentwise; the canonical rendering is
/// `namespace + "/" + key`. Neither component may be empty or whitespace.
///
/// # Example
/// ```rust
/// use granary_rt::util::StreamId;
///
/// let id = StreamId::new("orders/processed", "order-7").unwrap();
/// assert_eq!(id.to_string(), "orders/processed/order-7");
/// assert!(StreamId::new("  ", "k").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId {
    namespace: String,
    key: String,
}

impl StreamId {
    /// Create a validated stream identity.
    pub fn new(namespace: impl AsRef<str>, key: impl AsRef<str>) -> Result<Self, IdentityError> {
        let namespace = namespace.as_ref();
        if namespace.trim().is_empty() {
            return Err(IdentityError::EmptyNamespace);
        }
        let key = key.as_ref();
        if key.trim().is_empty() {
            return Err(IdentityError::EmptyKey);
        }
        Ok(Self {
            namespace: namespace.to_owned(),
            key: key.to_owned(),
        })
    }

    /// The stream namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The per-namespace routing key. Doubles as the subscriber actor id.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_actor_identity_valid() {
        let id = ActorIdentity::new("Test", "a3").unwrap();
        assert_eq!(id.type_name(), "Test");
        assert_eq!(id.actor_id(), "a3");
    }

    #[test]
    fn test_actor_identity_trims_id() {
        let id = ActorIdentity::new("Test", "  a3  ").unwrap();
        assert_eq!(id.actor_id(), "a3");
    }

    #[test]
    fn test_actor_identity_rejects_empty_id() {
        assert_eq!(
            ActorIdentity::new("Test", "").unwrap_err(),
            IdentityError::EmptyActorId
        );
        assert_eq!(
            ActorIdentity::new("Test", "   \t").unwrap_err(),
            IdentityError::EmptyActorId
        );
    }

    #[test]
    fn test_actor_identity_rejects_empty_type() {
        assert_eq!(
            ActorIdentity::new("", "a3").unwrap_err(),
            IdentityError::EmptyTypeName
        );
    }

    #[test]
    fn test_actor_identity_equality_componentwise() {
        let a = ActorIdentity::new("T", "x").unwrap();
        let b = ActorIdentity::new("T", "x").unwrap();
        let c = ActorIdentity::new("U", "x").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_actor_identity_display() {
        let id = ActorIdentity::new("Test", "a3").unwrap();
        assert_eq!(format!("{id}"), "Test/a3");
    }

    #[test]
    fn test_message_id_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn test_message_id_from_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(MessageId::from_uuid(uuid).as_uuid(), &uuid);
    }

    #[test]
    fn test_silo_id_display() {
        let silo = SiloId::new("silo-1");
        assert_eq!(silo.to_string(), "silo-1");
        assert_eq!(silo.as_str(), "silo-1");
    }

    #[test]
    fn test_stream_id_equality() {
        let a = StreamId::new("orders", "a1").unwrap();
        let b = StreamId::new("orders", "a1").unwrap();
        let c = StreamId::new("orders", "a2").unwrap();
        let d = StreamId::new("payments", "a1").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_stream_id_rendering() {
        let id = StreamId::new("orders/processed", "a1").unwrap();
        assert_eq!(id.to_string(), "orders/processed/a1");
    }

    #[test]
    fn test_stream_id_rejects_empty_namespace() {
        assert_eq!(
            StreamId::new("", "k").unwrap_err(),
            IdentityError::EmptyNamespace
        );
        assert_eq!(
            StreamId::new(" \t ", "k").unwrap_err(),
            IdentityError::EmptyNamespace
        );
    }

    #[test]
    fn test_stream_id_rejects_empty_key() {
        assert_eq!(StreamId::new("ns", "").unwrap_err(), IdentityError::EmptyKey);
    }
}
