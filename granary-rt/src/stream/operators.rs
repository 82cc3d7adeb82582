//! Lazy, single-pass operators over actor streams.
//!
//! Built on `futures::Stream`: nothing is consumed until the resulting
//! stream is polled, and every operator traverses its input exactly once.
//! Operators return [`ActorStream`], a boxed stream that composes freely.
//! `group_items` is the one aggregating operator: it drains the source
//! and then yields one `(key, items)` group per distinct key, in first-
//! appearance order.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::task::{Context, Poll};

// Layer 2: Third-party crate imports
use futures::stream::{self, Stream, StreamExt};

// Layer 3: Internal module imports
// (none)

/// A boxed item stream produced by the operators below.
pub struct ActorStream<T> {
    inner: Pin<Box<dyn Stream<Item = T> + Send>>,
}

impl<T> ActorStream<T> {
    fn new(inner: impl Stream<Item = T> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }
}

impl<T> Stream for ActorStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Transform every item. Output size equals input size.
pub fn map_items<S, F, U>(input: S, f: F) -> ActorStream<U>
where
    S: Stream + Send + 'static,
    S::Item: Send,
    F: FnMut(S::Item) -> U + Send + 'static,
    U: Send,
{
    let input = Box::pin(input);
    ActorStream::new(stream::unfold((input, f), |(mut input, mut f)| async move {
        let item = input.next().await?;
        let mapped = f(item);
        Some((mapped, (input, f)))
    }))
}

/// Transform every item through an async function.
pub fn map_items_async<S, F, Fut, U>(input: S, f: F) -> ActorStream<U>
where
    S: Stream + Send + 'static,
    S::Item: Send,
    F: FnMut(S::Item) -> Fut + Send + 'static,
    Fut: Future<Output = U> + Send,
    U: Send,
{
    let input = Box::pin(input);
    ActorStream::new(stream::unfold((input, f), |(mut input, mut f)| async move {
        let item = input.next().await?;
        let mapped = f(item).await;
        Some((mapped, (input, f)))
    }))
}

/// Keep items satisfying the predicate, preserving order.
pub fn filter_items<S, P>(input: S, predicate: P) -> ActorStream<S::Item>
where
    S: Stream + Send + 'static,
    S::Item: Send,
    P: FnMut(&S::Item) -> bool + Send + 'static,
{
    let input = Box::pin(input);
    ActorStream::new(stream::unfold(
        (input, predicate),
        |(mut input, mut predicate)| async move {
            loop {
                let item = input.next().await?;
                if predicate(&item) {
                    return Some((item, (input, predicate)));
                }
            }
        },
    ))
}

/// Keep items satisfying an async predicate, preserving order.
pub fn filter_items_async<S, P, Fut>(input: S, predicate: P) -> ActorStream<S::Item>
where
    S: Stream + Send + 'static,
    S::Item: Send,
    P: FnMut(&S::Item) -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send,
{
    let input = Box::pin(input);
    ActorStream::new(stream::unfold(
        (input, predicate),
        |(mut input, mut predicate)| async move {
            loop {
                let item = input.next().await?;
                if predicate(&item).await {
                    return Some((item, (input, predicate)));
                }
            }
        },
    ))
}

/// Consume the stream into a single aggregate.
pub async fn reduce_items<S, A, F>(input: S, seed: A, mut op: F) -> A
where
    S: Stream,
    F: FnMut(A, S::Item) -> A,
{
    let mut input = Box::pin(input);
    let mut accumulator = seed;
    while let Some(item) = input.next().await {
        accumulator = op(accumulator, item);
    }
    accumulator
}

/// Consume the stream into a single aggregate with an async accumulator.
pub async fn reduce_items_async<S, A, F, Fut>(input: S, seed: A, mut op: F) -> A
where
    S: Stream,
    F: FnMut(A, S::Item) -> Fut,
    Fut: Future<Output = A>,
{
    let mut input = Box::pin(input);
    let mut accumulator = seed;
    while let Some(item) = input.next().await {
        accumulator = op(accumulator, item).await;
    }
    accumulator
}

/// Group items by key. Each group collects every item emitted before
/// stream completion with that key; groups are yielded in the order keys
/// first appeared.
pub fn group_items<S, K, F>(input: S, mut key_fn: F) -> ActorStream<(K, Vec<S::Item>)>
where
    S: Stream + Send + 'static,
    S::Item: Send,
    K: Eq + Hash + Clone + Send,
    F: FnMut(&S::Item) -> K + Send + 'static,
{
    ActorStream::new(
        stream::once(async move {
            let mut input = Box::pin(input);
            let mut order: Vec<K> = Vec::new();
            let mut groups: HashMap<K, Vec<S::Item>> = HashMap::new();
            while let Some(item) = input.next().await {
                let key = key_fn(&item);
                if !groups.contains_key(&key) {
                    order.push(key.clone());
                }
                groups.entry(key).or_default().push(item);
            }
            let mut out = Vec::with_capacity(order.len());
            for key in order {
                let items = groups.remove(&key).unwrap_or_default();
                out.push((key, items));
            }
            stream::iter(out)
        })
        .flatten(),
    )
}

/// Operator methods for any sendable stream.
pub trait ActorStreamExt: Stream + Sized + Send + 'static
where
    Self::Item: Send,
{
    /// See [`map_items`].
    fn map_items<F, U>(self, f: F) -> ActorStream<U>
    where
        F: FnMut(Self::Item) -> U + Send + 'static,
        U: Send,
    {
        map_items(self, f)
    }

    /// See [`map_items_async`].
    fn map_items_async<F, Fut, U>(self, f: F) -> ActorStream<U>
    where
        F: FnMut(Self::Item) -> Fut + Send + 'static,
        Fut: Future<Output = U> + Send,
        U: Send,
    {
        map_items_async(self, f)
    }

    /// See [`filter_items`].
    fn filter_items<P>(self, predicate: P) -> ActorStream<Self::Item>
    where
        P: FnMut(&Self::Item) -> bool + Send + 'static,
    {
        filter_items(self, predicate)
    }

    /// See [`filter_items_async`].
    fn filter_items_async<P, Fut>(self, predicate: P) -> ActorStream<Self::Item>
    where
        P: FnMut(&Self::Item) -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        filter_items_async(self, predicate)
    }

    /// See [`reduce_items`].
    fn reduce_items<A, F>(self, seed: A, op: F) -> impl Future<Output = A>
    where
        F: FnMut(A, Self::Item) -> A,
    {
        reduce_items(self, seed, op)
    }

    /// See [`group_items`].
    fn group_items<K, F>(self, key_fn: F) -> ActorStream<(K, Vec<Self::Item>)>
    where
        K: Eq + Hash + Clone + Send,
        F: FnMut(&Self::Item) -> K + Send + 'static,
    {
        group_items(self, key_fn)
    }
}

impl<S> ActorStreamExt for S
where
    S: Stream + Sized + Send + 'static,
    S::Item: Send,
{
}
