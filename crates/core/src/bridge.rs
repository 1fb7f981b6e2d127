//! Republishes a blocking fragment iterator to asynchronous callers.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::{Semaphore, mpsc};
use tokio::task;

use crate::fragment::Fragment;

/// An asynchronous sequence of fragments produced by a blocking worker.
///
/// The stream ends once the worker has drained the whole call. Dropping
/// it early does not cancel the worker.
#[derive(Debug)]
pub struct FragmentStream {
    rx: mpsc::Receiver<Fragment>,
}

impl Stream for FragmentStream {
    type Item = Fragment;

    #[inline]
    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Drives `fragments` on a blocking worker once one of `workers` is free,
/// forwarding every fragment through a channel of `capacity`.
pub(crate) fn spawn<I>(
    fragments: I,
    workers: Arc<Semaphore>,
    capacity: usize,
) -> FragmentStream
where
    I: Iterator<Item = Fragment> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(async move {
        let Ok(_permit) = workers.acquire_owned().await else {
            error!("worker slots are gone, dropping the call");
            return;
        };
        trace!("got a worker slot");
        let worker = task::spawn_blocking(move || drain(fragments, tx));
        if let Err(err) = worker.await {
            error!("blocking worker failed: {err}");
        }
    });
    FragmentStream { rx }
}

fn drain<I>(fragments: I, tx: mpsc::Sender<Fragment>)
where
    I: Iterator<Item = Fragment>,
{
    let mut tx = Some(tx);
    for fragment in fragments {
        let Some(sender) = &tx else {
            continue;
        };
        if sender.blocking_send(fragment).is_err() {
            debug!("receiver is gone, finishing the call in background");
            tx = None;
        }
    }
    trace!("worker finished");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::sleep;
    use std::time::Duration;

    use futures_util::StreamExt;
    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn test_order_is_preserved() {
        let fragments = (0..20).map(|i| Fragment::new(i.to_string()));
        let stream = spawn(fragments, Arc::new(Semaphore::new(1)), 2);
        let received: Vec<_> = stream.map(|f| f.content).collect().await;
        let expected: Vec<_> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_early_drop_still_drains() {
        let produced = Arc::new(AtomicUsize::new(0));
        let fragments = {
            let produced = Arc::clone(&produced);
            (0..10).map(move |i| {
                sleep(Duration::from_millis(2));
                produced.fetch_add(1, Ordering::SeqCst);
                Fragment::new(i.to_string())
            })
        };

        let mut stream = spawn(fragments, Arc::new(Semaphore::new(1)), 1);
        assert_eq!(stream.next().await.unwrap().content, "0");
        drop(stream);

        timeout(Duration::from_secs(2), async {
            while produced.load(Ordering::SeqCst) < 10 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_workers_are_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let workers = Arc::new(Semaphore::new(2));

        let streams: Vec<_> = (0..5)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                let call = std::iter::once(()).map(move |_| {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Fragment::new("done")
                });
                spawn(call, Arc::clone(&workers), 1)
            })
            .collect();

        for stream in streams {
            let received: Vec<_> = stream.collect().await;
            assert_eq!(received.len(), 1);
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
