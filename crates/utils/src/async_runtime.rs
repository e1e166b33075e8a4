use lazyclean_core::{Error, Result};
use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

/// Worker threads of the shared background runtime
const SHARED_WORKER_THREADS: usize = 2;

/// Process-wide runtime used when the caller has no multi-thread runtime.
static SHARED_RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Get or create the shared background runtime.
///
/// The runtime is built on first use and lives for the rest of the process.
/// `thread_name` only takes effect for the call that builds it.
pub fn shared_runtime(thread_name: &str) -> Result<Handle> {
    let runtime = SHARED_RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .worker_threads(SHARED_WORKER_THREADS)
            .thread_name(thread_name)
            .enable_time()
            .build()
            .map_err(|e| Error::runtime(format!("failed to create shared runtime: {e}")))
    })?;

    Ok(runtime.handle().clone())
}

/// Pick the runtime a background task should be spawned on.
///
/// An explicit handle always wins. Otherwise the ambient runtime is used when
/// it is a multi-thread runtime, since a current-thread runtime only makes
/// progress while its owner blocks on it. Everything else lands on the
/// shared runtime.
pub fn spawn_handle(preferred: Option<&Handle>, thread_name: &str) -> Result<Handle> {
    if let Some(handle) = preferred {
        return Ok(handle.clone());
    }

    if let Ok(handle) = Handle::try_current() {
        if handle.runtime_flavor() == RuntimeFlavor::MultiThread {
            return Ok(handle);
        }
    }

    shared_runtime(thread_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_shared_runtime_runs_tasks() -> Result<()> {
        let handle = shared_runtime("lazyclean-test")?;
        let (tx, rx) = mpsc::channel();

        handle.spawn(async move {
            let _ = tx.send(42);
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).ok(), Some(42));
        Ok(())
    }

    #[test]
    fn test_outside_runtime_uses_shared() -> Result<()> {
        assert!(Handle::try_current().is_err());

        let handle = spawn_handle(None, "lazyclean-test")?;
        assert_eq!(handle.runtime_flavor(), RuntimeFlavor::MultiThread);

        Ok(())
    }

    #[test]
    fn test_explicit_handle_wins() -> Result<()> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let handle = spawn_handle(Some(runtime.handle()), "lazyclean-test")?;
        assert_eq!(handle.runtime_flavor(), RuntimeFlavor::CurrentThread);

        Ok(())
    }

    #[tokio::test]
    async fn test_current_thread_runtime_is_skipped() -> Result<()> {
        assert!(Handle::try_current().is_ok());

        let handle = spawn_handle(None, "lazyclean-test")?;
        assert_eq!(handle.runtime_flavor(), RuntimeFlavor::MultiThread);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ambient_multi_thread_runtime_is_used() -> Result<()> {
        let handle = spawn_handle(None, "lazyclean-test")?;
        let value = handle
            .spawn(async { 7 })
            .await
            .map_err(|e| Error::runtime(e.to_string()))?;

        assert_eq!(value, 7);
        Ok(())
    }
}
