use std::{
    collections::HashSet,
    fs,
    future::Future,
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use futures::FutureExt as _;
use tokio::{
    sync::Semaphore,
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, error};

use super::lock::KeyLock;
use crate::error::{DynError, StressError, panic_message};

/// Dispatches keyed jobs onto a shared, bounded worker pool while refusing a
/// second job for a key whose previous job is still registered.
///
/// Registration is the key's [`KeyLock`] plus an entry in the in-process
/// registry shared by every clone of the guard. Both are taken synchronously
/// in [`SingleFlightGuard::submit`] and moved into the job task, so they are
/// released exactly when the task ends, whether the job returned, failed or
/// panicked.
#[derive(Clone, Debug)]
pub struct SingleFlightGuard {
    lock_dir: PathBuf,
    workers: Arc<Semaphore>,
    active: Registry,
}

type Registry = Arc<Mutex<HashSet<String>>>;

fn entries(active: &Registry) -> MutexGuard<'_, HashSet<String>> {
    active
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A registered key. Unlocks the file before leaving the registry, so a
/// submitter that finds the key unregistered also finds the lock free.
#[derive(Debug)]
struct Registration {
    lock: Option<KeyLock>,
    key: String,
    active: Registry,
}

impl Registration {
    fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        drop(self.lock.take());
        entries(&self.active).remove(&self.key);
    }
}

/// Handle to a dispatched job. Dropping it does not cancel the job.
#[derive(Debug)]
pub struct JobHandle {
    key: String,
    task: JoinHandle<()>,
}

impl JobHandle {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits until the job task has ended and its key lock is released.
    pub async fn wait(self) {
        if let Err(err) = self.task.await {
            debug!(key = %self.key, %err, "single-flight task ended abnormally");
        }
    }
}

impl SingleFlightGuard {
    /// Creates the lock directory if needed.
    ///
    /// # Errors
    ///
    /// `StressError::Config` when `workers` is zero, `StressError::Lock` when
    /// the directory cannot be created.
    pub fn new(lock_dir: impl Into<PathBuf>, workers: usize) -> Result<Self, StressError> {
        if workers == 0 {
            return Err(StressError::Config(
                "single-flight worker pool needs at least one worker".to_owned(),
            ));
        }
        let lock_dir = lock_dir.into();
        fs::create_dir_all(&lock_dir).map_err(|source| StressError::Lock {
            path: lock_dir.clone(),
            source,
        })?;

        Ok(Self {
            lock_dir,
            workers: Arc::new(Semaphore::new(workers)),
            active: Arc::default(),
        })
    }

    #[must_use]
    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Registers `key` and runs `job` on the worker pool. Never waits for the
    /// key; must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// `StressError::DuplicateJob` while another job holds `key`, here or in
    /// another process sharing the lock directory.
    pub fn submit<F>(&self, key: &str, job: F) -> Result<JobHandle, StressError>
    where
        F: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        let lock = self.register(key)?;
        let workers = Arc::clone(&self.workers);
        let owned_key = key.to_owned();

        debug!(key, "single-flight job registered");
        let task = tokio::spawn(async move {
            let lock = lock;
            let Ok(_permit) = workers.acquire_owned().await else {
                error!(key = lock.key(), "single-flight worker pool closed");
                return;
            };

            let started = Instant::now();
            match AssertUnwindSafe(job).catch_unwind().await {
                Ok(Ok(())) => debug!(
                    key = lock.key(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "single-flight job finished"
                ),
                Ok(Err(err)) => error!(key = lock.key(), %err, "single-flight job failed"),
                Err(panic) => error!(
                    key = lock.key(),
                    panic = %panic_message(panic),
                    "single-flight job panicked"
                ),
            }
            drop(lock);
        });

        Ok(JobHandle {
            key: owned_key,
            task,
        })
    }

    /// Whether a job submitted through this guard or one of its clones still
    /// holds `key`. Reads the registry only and never touches the lock file.
    #[must_use]
    pub fn is_busy(&self, key: &str) -> bool {
        entries(&self.active).contains(key)
    }

    fn register(&self, key: &str) -> Result<Registration, StressError> {
        let mut active = entries(&self.active);
        if active.contains(key) {
            return Err(StressError::DuplicateJob {
                key: key.to_owned(),
            });
        }
        let lock = KeyLock::try_acquire(&self.lock_dir, key)?;
        active.insert(key.to_owned());

        Ok(Registration {
            lock: Some(lock),
            key: key.to_owned(),
            active: Arc::clone(&self.active),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    use tokio::sync::{Barrier, oneshot};

    use super::*;

    fn noop() -> impl Future<Output = Result<(), DynError>> + Send + 'static {
        async { Ok(()) }
    }

    async fn exploding_job() -> Result<(), DynError> {
        panic!("job blew up")
    }

    #[tokio::test]
    async fn duplicate_key_is_rejected_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let guard = SingleFlightGuard::new(dir.path(), 4).unwrap();
        let (release, hold) = oneshot::channel::<()>();

        let first = guard
            .submit("w1", async move {
                let _ = hold.await;
                Ok::<_, DynError>(())
            })
            .unwrap();

        let second = guard.submit("w1", noop());
        assert!(matches!(second, Err(StressError::DuplicateJob { ref key }) if key == "w1"));
        assert!(guard.is_busy("w1"));

        release.send(()).unwrap();
        first.wait().await;

        assert!(!guard.is_busy("w1"));
        guard.submit("w1", noop()).unwrap().wait().await;
    }

    #[tokio::test]
    async fn lock_is_released_after_failure_and_panic() {
        let dir = tempfile::tempdir().unwrap();
        let guard = SingleFlightGuard::new(dir.path(), 2).unwrap();

        guard
            .submit("fails", async { Err::<(), DynError>("boom".into()) })
            .unwrap()
            .wait()
            .await;
        assert!(!guard.is_busy("fails"));

        guard
            .submit("panics", exploding_job())
            .unwrap()
            .wait()
            .await;
        assert!(!guard.is_busy("panics"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn distinct_keys_run_in_parallel() {
        let dir = tempfile::tempdir().unwrap();
        let guard = SingleFlightGuard::new(dir.path(), 2).unwrap();
        // Both jobs must be inside their bodies at the same time to pass.
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["left", "right"]
            .into_iter()
            .map(|key| {
                let barrier = Arc::clone(&barrier);
                guard
                    .submit(key, async move {
                        barrier.wait().await;
                        Ok::<_, DynError>(())
                    })
                    .unwrap()
            })
            .collect();

        tokio::time::timeout(Duration::from_secs(5), async {
            for handle in handles {
                handle.wait().await;
            }
        })
        .await
        .expect("jobs for distinct keys should overlap");
    }

    #[tokio::test]
    async fn queued_job_still_holds_its_key() {
        let dir = tempfile::tempdir().unwrap();
        let guard = SingleFlightGuard::new(dir.path(), 1).unwrap();
        let (release, hold) = oneshot::channel::<()>();

        let busy = guard
            .submit("a", async move {
                let _ = hold.await;
                Ok::<_, DynError>(())
            })
            .unwrap();
        let queued = guard.submit("b", noop()).unwrap();

        assert!(matches!(
            guard.submit("b", noop()),
            Err(StressError::DuplicateJob { .. })
        ));

        release.send(()).unwrap();
        busy.wait().await;
        queued.wait().await;
        assert!(!guard.is_busy("b"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn polling_is_busy_never_rejects_a_free_key() {
        let dir = tempfile::tempdir().unwrap();
        let guard = SingleFlightGuard::new(dir.path(), 2).unwrap();
        let done = Arc::new(AtomicBool::new(false));

        let poller = std::thread::spawn({
            let guard = guard.clone();
            let done = Arc::clone(&done);
            move || {
                while !done.load(Ordering::Relaxed) {
                    let _ = guard.is_busy("k");
                }
            }
        });

        let mut rejected = 0;
        for _ in 0..2_000 {
            match guard.submit("k", noop()) {
                Ok(handle) => handle.wait().await,
                Err(_) => rejected += 1,
            }
        }
        done.store(true, Ordering::Relaxed);
        poller.join().unwrap();

        assert_eq!(rejected, 0);
        assert!(!guard.is_busy("k"));
    }

    #[test]
    fn other_processes_holding_the_file_lock_still_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let guard = SingleFlightGuard::new(dir.path(), 1).unwrap();
        let _foreign = KeyLock::try_acquire(dir.path(), "shared").unwrap();

        assert!(matches!(
            guard.submit("shared", noop()),
            Err(StressError::DuplicateJob { .. })
        ));
        assert!(!guard.is_busy("shared"));
    }

    #[test]
    fn zero_workers_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SingleFlightGuard::new(dir.path(), 0),
            Err(StressError::Config(_))
        ));
    }
}
