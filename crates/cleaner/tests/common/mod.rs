#![allow(dead_code)]
//! Shared helpers for cleaner integration tests

use lazyclean::{BoxError, Cleaner, CleanerConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Idle timeout used by test cleaners
pub const IDLE: Duration = Duration::from_millis(200);

/// Upper bound for anything the worker is expected to do eventually
pub const EVENTUALLY: Duration = Duration::from_secs(10);

pub fn cleaner() -> Cleaner {
    cleaner_with_idle(IDLE)
}

pub fn cleaner_with_idle(idle_timeout: Duration) -> Cleaner {
    // Several tests share a process; only the first init succeeds.
    let _ = lazyclean_utils::tracing::init();
    Cleaner::new(
        CleanerConfig::default()
            .with_idle_timeout(idle_timeout)
            .with_worker_name("lazyclean-test"),
    )
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Counts action runs by leak flag.
#[derive(Clone, Default)]
pub struct Recorder {
    explicit: Arc<AtomicUsize>,
    leaked: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(&self) -> impl FnOnce(bool) -> Result<(), BoxError> + Send + 'static {
        let recorder = self.clone();
        move |leak: bool| {
            recorder.record(leak);
            Ok(())
        }
    }

    pub fn failing_action(
        &self,
        message: &'static str,
    ) -> impl FnOnce(bool) -> Result<(), BoxError> + Send + 'static {
        let recorder = self.clone();
        move |leak: bool| {
            recorder.record(leak);
            Err(message.into())
        }
    }

    fn record(&self, leak: bool) {
        if leak {
            self.leaked.fetch_add(1, Ordering::SeqCst);
        } else {
            self.explicit.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn explicit(&self) -> usize {
        self.explicit.load(Ordering::SeqCst)
    }

    pub fn leaked(&self) -> usize {
        self.leaked.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.explicit() + self.leaked()
    }
}
