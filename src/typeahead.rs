//! Type-ahead clearing timer
//!
//! Predicted keystrokes shown before the application echoes them must be
//! dropped if no echo arrives. [`TypeAheadDebouncer`] is a one-shot deadline
//! timer on a worker thread: every keystroke re-arms it, and the action runs
//! once the deadline passes without a re-arm or a cancel.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

pub const DEFAULT_CLEAR_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct State {
    deadline: Option<Instant>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

/// Runs an action once, `delay` after the most recent [`arm`](Self::arm)
pub struct TypeAheadDebouncer {
    delay: Duration,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for TypeAheadDebouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeAheadDebouncer")
            .field("delay", &self.delay)
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl TypeAheadDebouncer {
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("typeahead-debouncer".into())
            .spawn(move || run_worker(&worker_shared, action))
            .map_err(|err| log::warn!("type-ahead timer thread failed to start: {}", err))
            .ok();
        Self { delay, shared, worker }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Start the timer, replacing any pending deadline
    pub fn arm(&self) {
        let mut state = self.shared.state.lock();
        state.deadline = Some(Instant::now() + self.delay);
        self.shared.wake.notify_one();
    }

    /// Drop the pending deadline, if any
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.deadline = None;
        self.shared.wake.notify_one();
    }

    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().deadline.is_some()
    }
}

fn run_worker<F: FnMut()>(shared: &Shared, mut action: F) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }
        match state.deadline {
            None => shared.wake.wait(&mut state),
            Some(deadline) if Instant::now() >= deadline => {
                state.deadline = None;
                MutexGuard::unlocked(&mut state, &mut action);
            },
            Some(deadline) => {
                shared.wake.wait_until(&mut state, deadline);
            },
        }
    }
}

impl Drop for TypeAheadDebouncer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.wake.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("type-ahead action panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_fires_once_after_delay() {
        let (count, action) = counter();
        let debouncer = TypeAheadDebouncer::new(Duration::from_millis(20), action);
        debouncer.arm();
        assert!(debouncer.is_armed());
        thread::sleep(Duration::from_millis(200));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_armed());
    }

    #[test]
    fn test_rearm_postpones() {
        let (count, action) = counter();
        let debouncer = TypeAheadDebouncer::new(Duration::from_millis(150), action);
        debouncer.arm();
        thread::sleep(Duration::from_millis(50));
        debouncer.arm();
        thread::sleep(Duration::from_millis(50));
        debouncer.arm();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        thread::sleep(Duration::from_millis(400));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_prevents_action() {
        let (count, action) = counter();
        let debouncer = TypeAheadDebouncer::new(Duration::from_millis(50), action);
        debouncer.arm();
        debouncer.cancel();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_stops_worker() {
        let (count, action) = counter();
        let debouncer = TypeAheadDebouncer::new(Duration::from_secs(60), action);
        debouncer.arm();
        drop(debouncer);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
