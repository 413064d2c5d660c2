use crate::utils::error::{CrptError, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A FIFO job queue served by one dedicated OS thread.
///
/// Jobs may be queued before [`start`](Self::start); they run once the worker
/// is up. A panicking job is logged and does not take the worker down.
pub struct SingleThreadPool {
    name: String,
    sender: Option<UnboundedSender<Job>>,
    receiver: Option<UnboundedReceiver<Job>>,
    worker: Option<JoinHandle<()>>,
    terminated: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
}

impl SingleThreadPool {
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            sender: Some(sender),
            receiver: Some(receiver),
            worker: None,
            terminated: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        let mut receiver = self.receiver.take().ok_or_else(|| CrptError::PoolError {
            message: format!("pool '{}' was already started or shut down", self.name),
        })?;

        let terminated = self.terminated.clone();
        let pending = self.pending.clone();
        let name = self.name.clone();

        let worker = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                tracing::debug!("Worker '{}' started", name);
                while let Some(job) = receiver.blocking_recv() {
                    if terminated.load(Ordering::SeqCst) {
                        break;
                    }
                    pending.fetch_sub(1, Ordering::SeqCst);

                    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        tracing::error!(
                            "Job on worker '{}' panicked: {}",
                            name,
                            panic_message(&*panic)
                        );
                    }
                }
                tracing::debug!("Worker '{}' stopped", name);
            })?;

        self.worker = Some(worker);
        Ok(())
    }

    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or_else(|| CrptError::PoolError {
            message: format!("pool '{}' is shut down", self.name),
        })?;

        self.pending.fetch_add(1, Ordering::SeqCst);
        sender.send(Box::new(job)).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            CrptError::PoolError {
                message: format!("worker '{}' is no longer running", self.name),
            }
        })
    }

    /// Runs every queued job, then joins the worker.
    pub fn stop(&mut self) -> Result<()> {
        self.sender.take();
        self.join()
    }

    /// Lets the current job finish, discards the rest of the queue and joins
    /// the worker.
    pub fn terminate(&mut self) -> Result<()> {
        self.terminated.store(true, Ordering::SeqCst);
        self.sender.take();
        let result = self.join();
        self.pending.store(0, Ordering::SeqCst);
        result
    }

    pub fn pending_jobs(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn join(&mut self) -> Result<()> {
        // Never started: nothing will drain the queue.
        if self.receiver.take().is_some() {
            self.pending.store(0, Ordering::SeqCst);
        }

        match self.worker.take() {
            Some(worker) => worker.join().map_err(|panic| CrptError::PoolError {
                message: format!(
                    "worker '{}' exited abnormally: {}",
                    self.name,
                    panic_message(&*panic)
                ),
            }),
            None => Ok(()),
        }
    }
}

impl Drop for SingleThreadPool {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("Failed to stop pool '{}': {}", self.name, e);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_runs_jobs_in_submission_order() {
        let mut pool = SingleThreadPool::new("order-test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        pool.start().unwrap();
        for i in 0..20 {
            let seen = seen.clone();
            pool.submit(move || seen.lock().unwrap().push(i)).unwrap();
        }
        pool.stop().unwrap();

        assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<_>>());
        assert_eq!(pool.pending_jobs(), 0);
    }

    #[test]
    fn test_jobs_run_on_a_single_named_thread() {
        let mut pool = SingleThreadPool::new("crpt-worker");
        let names = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..5 {
            let names = names.clone();
            pool.submit(move || {
                let name = thread::current().name().map(str::to_string);
                names.lock().unwrap().push(name);
            })
            .unwrap();
        }
        assert_eq!(pool.pending_jobs(), 5);

        pool.start().unwrap();
        pool.stop().unwrap();

        let names = names.lock().unwrap();
        assert_eq!(names.len(), 5);
        assert!(names.iter().all(|n| n.as_deref() == Some("crpt-worker")));
    }

    #[test]
    fn test_terminate_discards_queued_jobs() {
        let mut pool = SingleThreadPool::new("terminate-test");
        let ran = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = std::sync::mpsc::channel();

        pool.start().unwrap();
        {
            let ran = ran.clone();
            pool.submit(move || {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        for _ in 0..10 {
            let ran = ran.clone();
            pool.submit(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        started_rx.recv().unwrap();
        pool.terminate().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(pool.pending_jobs(), 0);
        assert!(matches!(pool.submit(|| {}), Err(CrptError::PoolError { .. })));
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let mut pool = SingleThreadPool::new("panic-test");
        let ran = Arc::new(AtomicUsize::new(0));

        pool.start().unwrap();
        pool.submit(|| panic!("boom")).unwrap();
        {
            let ran = ran.clone();
            pool.submit(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.stop().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_submit_after_stop_fails() {
        let mut pool = SingleThreadPool::new("closed-test");
        pool.start().unwrap();
        pool.stop().unwrap();

        assert!(matches!(
            pool.submit(|| {}),
            Err(CrptError::PoolError { .. })
        ));
    }

    #[test]
    fn test_start_twice_fails() {
        let mut pool = SingleThreadPool::new("double-start");
        pool.start().unwrap();

        assert!(matches!(pool.start(), Err(CrptError::PoolError { .. })));
        pool.stop().unwrap();
    }

    #[test]
    fn test_drop_drains_queue() {
        let ran = Arc::new(AtomicUsize::new(0));
        {
            let mut pool = SingleThreadPool::new("drop-test");
            pool.start().unwrap();
            for _ in 0..3 {
                let ran = ran.clone();
                pool.submit(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            }
        }
        assert_eq!(ran.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_stop_before_start_discards_queue() {
        let mut pool = SingleThreadPool::new("never-started");
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let ran = ran.clone();
            pool.submit(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert_eq!(pool.pending_jobs(), 3);

        pool.stop().unwrap();

        assert_eq!(pool.pending_jobs(), 0);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(matches!(pool.start(), Err(CrptError::PoolError { .. })));
    }

    #[test]
    fn test_terminate_before_start_discards_queue() {
        let mut pool = SingleThreadPool::new("terminated-early");
        pool.submit(|| {}).unwrap();
        pool.submit(|| {}).unwrap();

        pool.terminate().unwrap();

        assert_eq!(pool.pending_jobs(), 0);
        assert!(matches!(pool.submit(|| {}), Err(CrptError::PoolError { .. })));
    }

    #[test]
    fn test_start_after_stop_fails() {
        let mut pool = SingleThreadPool::new("restart-test");
        pool.start().unwrap();
        pool.stop().unwrap();

        assert!(matches!(pool.start(), Err(CrptError::PoolError { .. })));
    }
}
