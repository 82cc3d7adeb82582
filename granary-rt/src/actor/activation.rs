// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::factory::{ActorFactory, FactoryError};
use super::traits::{ActivationContext, VirtualActor};
use crate::dispatch::{DispatchError, DispatcherRegistry};
use crate::dlq::{DeadLetterQueue, RetryPolicy};
use crate::mailbox::Mailbox;
use crate::message::{Envelope, InvocationMessage};
use crate::util::ActorIdentity;

/// Errors surfaced by the client-side invoke path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    /// The mailbox was closed or at capacity
    #[error("Mailbox rejected the invocation for {actor}")]
    MailboxRejected { actor: String },

    /// Dispatch or user-method failure
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The worker stopped before replying
    #[error("Activation worker stopped before replying")]
    WorkerStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivationState {
    Created,
    Activating,
    Active,
    Deactivated,
}

/// The live in-memory instance bound to one actor identity on this silo.
///
/// Owns a mailbox and a single worker task; messages are processed
/// strictly one at a time, so user code for one identity never runs
/// concurrently with itself. The factory exclusively owns activations;
/// everything else holds lookups, never lifetime.
pub struct Activation {
    identity: ActorIdentity,
    mailbox: Mailbox,
    context: ActivationContext,
    dispatchers: Arc<DispatcherRegistry>,
    retry_policy: Option<RetryPolicy>,
    dead_letters: Option<Arc<DeadLetterQueue>>,
    factory: Weak<ActorFactory>,
    self_handle: Weak<Activation>,
    state: Mutex<ActivationState>,
    actor: Mutex<Option<Box<dyn VirtualActor>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    failures: AtomicU32,
}

impl Activation {
    #[allow(clippy::too_many_arguments)] // Assembled only by the factory
    pub(crate) fn new(
        identity: ActorIdentity,
        actor: Box<dyn VirtualActor>,
        mailbox: Mailbox,
        context: ActivationContext,
        dispatchers: Arc<DispatcherRegistry>,
        retry_policy: Option<RetryPolicy>,
        dead_letters: Option<Arc<DeadLetterQueue>>,
        factory: Weak<ActorFactory>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_handle| Self {
            identity,
            mailbox,
            context,
            dispatchers,
            retry_policy,
            dead_letters,
            factory,
            self_handle: self_handle.clone(),
            state: Mutex::new(ActivationState::Created),
            actor: Mutex::new(Some(actor)),
            worker: Mutex::new(None),
            failures: AtomicU32::new(0),
        })
    }

    /// The activation's logical identity.
    pub fn identity(&self) -> &ActorIdentity {
        &self.identity
    }

    /// The activation's mailbox handle.
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Whether the worker is running.
    pub fn is_active(&self) -> bool {
        *self.state.lock() == ActivationState::Active
    }

    /// Terminal method failures observed since activation.
    pub fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Run the activation callback and start the worker.
    ///
    /// Idempotent: the callback fires at most once over the activation's
    /// life. Failure restores the actor so a later attempt can retry, and
    /// the caller leaves no registration behind.
    pub async fn activate(&self) -> Result<(), FactoryError> {
        {
            let mut state = self.state.lock();
            match *state {
                ActivationState::Created => *state = ActivationState::Activating,
                ActivationState::Activating | ActivationState::Active => return Ok(()),
                ActivationState::Deactivated => {
                    return Err(FactoryError::ActivationFailed {
                        identity: self.identity.to_string(),
                        reason: "activation already deactivated".to_owned(),
                    })
                }
            }
        }

        let mut actor = match self.actor.lock().take() {
            Some(actor) => actor,
            None => {
                return Err(FactoryError::ActivationFailed {
                    identity: self.identity.to_string(),
                    reason: "actor instance already consumed".to_owned(),
                })
            }
        };

        match actor.on_activate(&self.context).await {
            Ok(()) => {
                let Some(this) = self.self_handle.upgrade() else {
                    *self.state.lock() = ActivationState::Created;
                    *self.actor.lock() = Some(actor);
                    return Err(FactoryError::ActivationFailed {
                        identity: self.identity.to_string(),
                        reason: "activation dropped during start".to_owned(),
                    });
                };
                *self.state.lock() = ActivationState::Active;
                let handle = tokio::spawn(run_worker(this, actor));
                *self.worker.lock() = Some(handle);
                debug!(identity = %self.identity, "activation started");
                Ok(())
            }
            Err(err) => {
                *self.state.lock() = ActivationState::Created;
                *self.actor.lock() = Some(actor);
                Err(FactoryError::ActivationFailed {
                    identity: self.identity.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Dispose the mailbox and wait for the worker to finish.
    ///
    /// The deactivation callback runs on the activation's own serialized
    /// domain, after the in-flight message completes, exactly once.
    pub async fn deactivate(&self) {
        {
            let mut state = self.state.lock();
            if matches!(
                *state,
                ActivationState::Created | ActivationState::Activating
            ) {
                *state = ActivationState::Deactivated;
            }
        }
        self.mailbox.dispose();
        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            let _ = handle.await;
        }
    }

    /// Client path: frame an invocation, enqueue it, await the reply.
    pub async fn invoke(
        &self,
        method: &str,
        payload: Bytes,
        cancel: CancellationToken,
    ) -> Result<Bytes, InvokeError> {
        let message = InvocationMessage::new(method, payload);
        let (tx, rx) = oneshot::channel();
        let envelope = Envelope::Invoke {
            message,
            attempt: 0,
            reply: Some(tx),
            cancel,
        };
        if !self.mailbox.post(envelope) {
            return Err(InvokeError::MailboxRejected {
                actor: self.identity.to_string(),
            });
        }
        match rx.await {
            Ok(result) => result.map_err(InvokeError::Dispatch),
            Err(_) => Err(InvokeError::WorkerStopped),
        }
    }

    fn notify_supervisor(&self, error: String) {
        if let Some(factory) = self.factory.upgrade() {
            factory.notify_child_failure(
                self.identity.clone(),
                error,
                self.failures.load(Ordering::Relaxed),
            );
        }
    }
}

/// The activation's single logical worker: pull one envelope at a time
/// and hand invocations to the dispatcher for the actor's type.
async fn run_worker(activation: Arc<Activation>, mut actor: Box<dyn VirtualActor>) {
    let identity = activation.identity.clone();
    while let Some(envelope) = activation.mailbox.recv().await {
        match envelope {
            Envelope::Invoke {
                message,
                attempt,
                reply,
                cancel,
            } => {
                let outcome = activation
                    .dispatchers
                    .invoke(
                        identity.type_name(),
                        actor.as_mut(),
                        &message.method,
                        message.payload.clone(),
                        cancel.clone(),
                    )
                    .await;
                if let Some(tracker) = activation.mailbox.tracker() {
                    tracker.record_processed(identity.actor_id(), identity.type_name());
                }
                match outcome {
                    Ok(bytes) => {
                        if let Some(reply) = reply {
                            let _ = reply.send(Ok(bytes));
                        }
                    }
                    Err(err @ DispatchError::MethodFailure { .. }) => {
                        let retry = activation
                            .retry_policy
                            .as_ref()
                            .filter(|policy| policy.should_retry(attempt));
                        if let Some(policy) = retry {
                            let delay = policy.delay_for(attempt);
                            debug!(
                                identity = %identity,
                                method = %message.method,
                                attempt,
                                ?delay,
                                "retrying failed method"
                            );
                            let mailbox = activation.mailbox.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(delay).await;
                                mailbox.post(Envelope::Invoke {
                                    message,
                                    attempt: attempt + 1,
                                    reply,
                                    cancel,
                                });
                            });
                        } else {
                            activation.failures.fetch_add(1, Ordering::Relaxed);
                            warn!(identity = %identity, error = %err, "actor method failed");
                            if let Some(dead_letters) = &activation.dead_letters {
                                dead_letters.push(
                                    message.clone(),
                                    err.to_string(),
                                    Some(format!("{err:?}")),
                                    attempt,
                                );
                            }
                            activation.notify_supervisor(err.to_string());
                            if let Some(reply) = reply {
                                let _ = reply.send(Err(err));
                            }
                        }
                    }
                    Err(err) => {
                        if let Some(reply) = reply {
                            let _ = reply.send(Err(err));
                        }
                    }
                }
            }
            Envelope::Stream { stream, message } => {
                let view = InvocationMessage {
                    message_id: message.message_id,
                    correlation_id: None,
                    timestamp: message.timestamp,
                    method: "on_stream_message".to_owned(),
                    payload: message.payload.clone(),
                };
                let result = actor
                    .on_stream_message(message, &stream, CancellationToken::new())
                    .await;
                if let Some(tracker) = activation.mailbox.tracker() {
                    tracker.record_processed(identity.actor_id(), identity.type_name());
                }
                if let Err(err) = result {
                    activation.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(identity = %identity, stream = %stream, error = %err, "stream callback failed");
                    if let Some(dead_letters) = &activation.dead_letters {
                        dead_letters.push(view, err.to_string(), Some(format!("{err:?}")), 0);
                    }
                    activation.notify_supervisor(err.to_string());
                }
            }
            Envelope::ChildFailure { context, respond } => {
                let directive = actor.on_child_failure(context).await;
                let _ = respond.send(directive);
            }
        }
    }

    // Mailbox closed: run the deactivation callback on this serialized
    // domain, exactly once.
    let run_callback = {
        let mut state = activation.state.lock();
        if *state == ActivationState::Active {
            *state = ActivationState::Deactivated;
            true
        } else {
            false
        }
    };
    if run_callback {
        if let Err(err) = actor.on_deactivate(&activation.context).await {
            warn!(identity = %identity, error = %err, "deactivation callback failed");
        }
        debug!(identity = %identity, "activation stopped");
    }
}
