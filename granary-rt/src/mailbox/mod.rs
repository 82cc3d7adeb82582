//! Bounded per-activation mailboxes with activity tracking and
//! adaptive back-pressure.

pub mod activity;
pub mod adaptive;
pub mod bounded;

pub use activity::{ActivityTracker, ActorActivity, InMemoryActivityTracker};
pub use adaptive::AdaptiveMailboxOptions;
pub use bounded::{Mailbox, MailboxBuilder, MailboxError, DEFAULT_MAILBOX_CAPACITY};
