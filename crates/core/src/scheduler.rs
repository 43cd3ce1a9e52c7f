//! Cooperative future/scheduler runtime.
//!
//! The original C library built its own futures (`DexFuture`), fibers, and a
//! thread-pool/main-thread scheduler split because C has none of this built
//! in. Rust does: `async fn` plus `tokio` give us the same cooperative,
//! non-blocking execution model natively, so this module is a thin layer
//! that preserves the shape of the original API (`spawn`, `Cancellable`,
//! `future_all`) without reimplementing a fiber machine underneath it.

use std::future::Future;
use std::pin::Pin;

use futures::future::try_join_all;
use tokio::sync::oneshot;
use tokio::task::LocalSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::errors::{FoundryError, Result};

/// A boxed, `Send` future resolving to a `foundry` `Result`.
///
/// This is the crate-wide stand-in for the original `DexFuture`: anything
/// that used to return a `DexFuture *` now returns a `FoundryFuture<T>`.
pub type FoundryFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Box an `async` block into a [`FoundryFuture`].
pub fn boxed<T, F>(fut: F) -> FoundryFuture<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
{
    Box::pin(fut)
}

/// Await every future in `futures`, short-circuiting on the first error,
/// mirroring `dex_future_all`.
pub async fn future_all<T>(
    futures: impl IntoIterator<Item = FoundryFuture<T>>,
) -> Result<Vec<T>> {
    try_join_all(futures).await
}

/// A resolve-once channel, the Rust analogue of `DexPromise`.
///
/// Resolving or rejecting a `Promise` more than once is a programming error
/// in the original API. Here a second call simply logs and is dropped rather
/// than panicking or aborting the process — a CLI tool should never crash
/// because a plugin mishandled a promise.
pub struct Promise<T> {
    tx: Option<oneshot::Sender<Result<T>>>,
}

impl<T> Promise<T> {
    pub fn new() -> (Self, FoundryFuture<T>)
    where
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let fut = boxed(async move {
            rx.await
                .map_err(|_| FoundryError::Cancelled)
                .and_then(|r| r)
        });
        (Promise { tx: Some(tx) }, fut)
    }

    #[instrument(skip(self, value))]
    pub fn resolve(&mut self, value: T)
    where
        T: std::fmt::Debug,
    {
        match self.tx.take() {
            Some(tx) => {
                let _ = tx.send(Ok(value));
            }
            None => tracing::warn!("promise resolved more than once, ignoring"),
        }
    }

    pub fn reject(&mut self, err: FoundryError) {
        match self.tx.take() {
            Some(tx) => {
                let _ = tx.send(Err(err));
            }
            None => tracing::warn!("promise rejected after already being settled, ignoring"),
        }
    }
}

/// A cooperative cancellation signal that is itself awaitable.
///
/// `await`ing a `Cancellable` resolves to `Err(FoundryError::Cancelled)` once
/// triggered and never resolves otherwise — exactly the "a cancellable is a
/// future that rejects when cancelled" contract of the original.
#[derive(Clone, Default)]
pub struct Cancellable {
    token: CancellationToken,
}

impl Cancellable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Cancellable {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn raise_if_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FoundryError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl Future for Cancellable {
    type Output = Result<()>;

    fn poll(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let mut fut = Box::pin(self.token.cancelled());
        match fut.as_mut().poll(cx) {
            std::task::Poll::Ready(()) => std::task::Poll::Ready(Err(FoundryError::Cancelled)),
            std::task::Poll::Pending => std::task::Poll::Pending,
        }
    }
}

/// Spawns work somewhere. Implemented by [`LocalScheduler`] (pinned to one
/// OS thread, for work that must run on "the main thread" the way the
/// original scheduled GTK-adjacent work) and [`ThreadPoolScheduler`] (for
/// everything else — I/O, subprocess orchestration, indexing).
pub trait Scheduler: Send + Sync {
    fn spawn<T, F>(&self, fut: F) -> FoundryFuture<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static;
}

/// Runs spawned work pinned to whichever thread is currently driving a
/// [`LocalSet`], the analogue of "the main thread" in the original.
///
/// Callers are expected to enter a `LocalSet::run_until` block (typically
/// once, near `main`) before scheduling work here; `spawn` itself just
/// forwards to `tokio::task::spawn_local`, which panics if called outside
/// that context — the same contract `LocalSet` already documents.
#[derive(Clone, Default)]
pub struct LocalScheduler {
    _private: (),
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body` to completion inside a fresh `LocalSet`, making
    /// `LocalScheduler::spawn` usable for its duration.
    pub async fn enter<F, T>(body: F) -> T
    where
        F: Future<Output = T>,
    {
        let local = LocalSet::new();
        local.run_until(body).await
    }
}

impl Scheduler for LocalScheduler {
    fn spawn<T, F>(&self, fut: F) -> FoundryFuture<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let join = tokio::task::spawn_local(fut);
        boxed(async move { join.await.map_err(|_| FoundryError::Cancelled)? })
    }
}

/// Runs spawned work on the ambient multi-thread `tokio` runtime, the
/// analogue of the original's background thread pool scheduler.
#[derive(Clone, Default)]
pub struct ThreadPoolScheduler;

impl ThreadPoolScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for ThreadPoolScheduler {
    fn spawn<T, F>(&self, fut: F) -> FoundryFuture<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let join = tokio::spawn(fut);
        boxed(async move { join.await.map_err(|_| FoundryError::Cancelled)? })
    }
}

/// Convenience: run `fut` to completion and cancel it if `cancellable` fires
/// first, mirroring the original's common `dex_future_disown`/cancellable
/// race pattern.
pub async fn race_cancellable<T>(fut: FoundryFuture<T>, cancellable: Cancellable) -> Result<T> {
    tokio::select! {
        res = fut => res,
        res = cancellable => Err(res.err().unwrap_or(FoundryError::Cancelled)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn promise_resolves_future() {
        let (mut promise, fut) = Promise::new();
        promise.resolve(42i32);
        assert_eq!(fut.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn double_resolve_is_ignored_not_fatal() {
        let (mut promise, fut) = Promise::new();
        promise.resolve(1i32);
        promise.resolve(2i32);
        assert_eq!(fut.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cancellable_rejects_when_triggered() {
        let cancellable = Cancellable::new();
        cancellable.cancel();
        let err = cancellable.clone().await.unwrap_err();
        assert!(matches!(err, FoundryError::Cancelled));
    }

    #[tokio::test]
    async fn threadpool_scheduler_spawns() {
        let scheduler = ThreadPoolScheduler::new();
        let fut = scheduler.spawn(async { Ok::<_, FoundryError>(7) });
        assert_eq!(fut.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn future_all_short_circuits() {
        let ok = boxed(async { Ok::<_, FoundryError>(1) });
        let err = boxed(async { Err::<i32, _>(FoundryError::NotSupported) });
        let result = future_all(vec![ok, err]).await;
        assert!(result.is_err());
    }
}
