//! Push adapter over a decoded row stream.
//!
//! A background task pulls rows and hands them to an [`Observer`] in order.
//! At most one terminal callback is delivered, and none after
//! [`Subscription::unsubscribe`] returns.

use crate::error::{KsqlError, KsqlResult};
use futures::{Stream, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Receives rows pushed by a [`Subscription`].
pub trait Observer<T>: Send + 'static {
    fn on_next(&mut self, row: T);

    /// The stream failed. No further callbacks follow.
    fn on_error(&mut self, error: KsqlError);

    /// The stream ended. No further callbacks follow.
    fn on_completed(&mut self);
}

/// Handle to a running subscription. Dropping it unsubscribes.
///
/// Do not unsubscribe or drop the handle from inside an observer callback:
/// the callback holds the delivery gate and would wait on itself.
pub struct Subscription {
    gate: Arc<Mutex<bool>>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Start pushing `rows` into `observer` on a spawned tokio task.
pub fn subscribe<T, S, O>(rows: S, observer: O) -> Subscription
where
    T: Send + 'static,
    S: Stream<Item = KsqlResult<T>> + Send + Unpin + 'static,
    O: Observer<T>,
{
    let gate = Arc::new(Mutex::new(true));
    let token = CancellationToken::new();

    let task_gate = Arc::clone(&gate);
    let task_token = token.clone();
    let handle = tokio::spawn(async move {
        let mut rows = rows;
        let mut observer = observer;
        tracing::debug!("subscription started");
        loop {
            let next = tokio::select! {
                _ = task_token.cancelled() => {
                    tracing::debug!("subscription cancelled");
                    return;
                }
                next = rows.next() => next,
            };
            if !deliver(&task_gate, &mut observer, next) {
                break;
            }
        }
        tracing::debug!("subscription finished");
    });

    Subscription {
        gate,
        token,
        handle: Some(handle),
    }
}

/// Hand one pulled item to the observer. Returns whether to keep pulling.
fn deliver<T, O: Observer<T>>(
    gate: &Mutex<bool>,
    observer: &mut O,
    next: Option<KsqlResult<T>>,
) -> bool {
    let mut open = lock(gate);
    if !*open {
        return false;
    }
    match next {
        Some(Ok(row)) => {
            observer.on_next(row);
            true
        }
        Some(Err(error)) => {
            *open = false;
            observer.on_error(error);
            false
        }
        None => {
            *open = false;
            observer.on_completed();
            false
        }
    }
}

fn lock(gate: &Mutex<bool>) -> MutexGuard<'_, bool> {
    gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Subscription {
    /// Stop delivery and cancel the pull. Once this returns, the observer
    /// is never called again.
    pub fn unsubscribe(&self) {
        *lock(&self.gate) = false;
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        *lock(&self.gate) && !self.token.is_cancelled()
    }

    /// Wait for the background task to stop, after completion, error or
    /// [`unsubscribe`](Self::unsubscribe).
    pub async fn join(mut self) -> KsqlResult<()> {
        if let Some(handle) = self.handle.take() {
            handle.await.map_err(|e| KsqlError::Io(std::io::Error::other(e)))?;
        }
        Ok(())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    enum Event {
        Next(i32),
        Error(String),
        Completed,
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Event>>>);

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl Observer<i32> for Recorder {
        fn on_next(&mut self, row: i32) {
            self.0.lock().unwrap().push(Event::Next(row));
        }

        fn on_error(&mut self, error: KsqlError) {
            self.0.lock().unwrap().push(Event::Error(error.to_string()));
        }

        fn on_completed(&mut self) {
            self.0.lock().unwrap().push(Event::Completed);
        }
    }

    #[tokio::test]
    async fn test_rows_in_order_then_completed() {
        let recorder = Recorder::default();
        let rows = stream::iter(vec![Ok(1), Ok(2), Ok(3)]);
        subscribe(rows, recorder.clone()).join().await.unwrap();
        assert_eq!(
            recorder.events(),
            vec![Event::Next(1), Event::Next(2), Event::Next(3), Event::Completed]
        );
    }

    #[tokio::test]
    async fn test_error_is_the_only_terminal_callback() {
        let recorder = Recorder::default();
        let rows = stream::iter(vec![
            Ok(1),
            Err(KsqlError::query("boom", 40001)),
            Ok(2),
        ]);
        subscribe(rows, recorder.clone()).join().await.unwrap();
        assert_eq!(
            recorder.events(),
            vec![
                Event::Next(1),
                Event::Error("Query error 40001: boom".to_string())
            ]
        );
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_source_once_without_callbacks() {
        let drops = Arc::new(AtomicUsize::new(0));
        let guard = DropCounter(Arc::clone(&drops));
        let rows = stream::pending::<KsqlResult<i32>>().map(move |row| {
            let _source = &guard;
            row
        });

        let recorder = Recorder::default();
        let subscription = subscribe(rows, recorder.clone());
        tokio::task::yield_now().await;
        assert!(subscription.is_active());

        subscription.unsubscribe();
        assert!(!subscription.is_active());
        subscription.join().await.unwrap();

        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(recorder.events().is_empty());
    }
}
