use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default quiet period before a burst of resize events is acted on.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(250);

/// Delivers only the last value of each burst, once `delay` passes without a new one.
///
/// Dropping the debouncer discards whatever is still pending.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn spawn<F>(delay: Duration, mut on_fire: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let task = tokio::spawn(async move {
            while let Some(mut latest) = rx.recv().await {
                loop {
                    match tokio::time::timeout(delay, rx.recv()).await {
                        Ok(Some(next)) => latest = next,
                        Ok(None) => return,
                        Err(_) => {
                            on_fire(latest);
                            break;
                        }
                    }
                }
            }
        });
        Self { tx, task }
    }

    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
