use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::runtime;

type Callback = Box<dyn FnOnce() + Send>;

/// Runs registered cleanup callbacks when dropped.
///
/// Create the guard at the start of a scope and register cleanups as the
/// resources they release are set up. The callbacks run in reverse order of
/// registration on every way out of the scope, including early returns and
/// unwinding panics.
#[derive(Default)]
pub struct CleanupGuard {
    callbacks: Vec<Callback>,
}

impl CleanupGuard {
    /// Creates a guard without callbacks.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback to run when the guard is dropped.
    #[inline]
    pub fn on_cleanup(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        trace!("running {} cleanup callbacks", self.callbacks.len());
        while let Some(callback) = self.callbacks.pop() {
            callback();
        }
    }
}

/// Runs `future` to completion on a new current-thread runtime.
///
/// Blocking workers still running when `future` returns get `grace` to
/// finish. After that they are left behind, so an interrupted call cannot
/// hold up the exit.
pub fn block_on<F: Future>(
    future: F,
    grace: Duration,
) -> io::Result<F::Output> {
    let rt = runtime::Builder::new_current_thread().enable_all().build()?;
    let output = rt.block_on(future);
    trace!("shutting down the runtime");
    rt.shutdown_timeout(grace);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::panic;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Instant;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Callback) {
        let calls = Arc::new(Mutex::new(vec![]));
        let make = {
            let calls = Arc::clone(&calls);
            move |id| {
                let calls = Arc::clone(&calls);
                Box::new(move || calls.lock().unwrap().push(id)) as Callback
            }
        };
        (calls, make)
    }

    #[test]
    fn test_runs_in_reverse_order() {
        let (calls, make) = recorder();
        {
            let mut guard = CleanupGuard::new();
            guard.on_cleanup(make(1));
            guard.on_cleanup(make(2));
            assert!(calls.lock().unwrap().is_empty());
        }
        assert_eq!(*calls.lock().unwrap(), [2, 1]);
    }

    #[test]
    fn test_runs_on_panic() {
        let (calls, make) = recorder();
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let mut guard = CleanupGuard::new();
            guard.on_cleanup(make(1));
            panic!("interrupted");
        }));
        assert!(result.is_err());
        assert_eq!(*calls.lock().unwrap(), [1]);
    }

    #[test]
    fn test_block_on_leaves_slow_workers_behind() {
        let start = Instant::now();
        let output = block_on(
            async {
                let _worker = tokio::task::spawn_blocking(|| {
                    thread::sleep(Duration::from_secs(2));
                });
                7
            },
            Duration::from_millis(50),
        )
        .unwrap();
        assert_eq!(output, 7);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
