//! Tokio-backed validation job queue.
//!
//! Jobs travel over a bounded `mpsc` channel to a single dispatcher task,
//! which runs each one on its own task while a semaphore caps how many
//! validator processes are alive at once. Failed jobs are logged and
//! dropped; there is no retry.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ports::{JobDispatchError, ValidationQueue};
use crate::domain::{ResponseValidationService, ValidationJob, ValidationOutcome};

/// Pending jobs accepted before `enqueue` reports saturation.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
/// Jobs validated concurrently.
pub const DEFAULT_WORKERS: usize = 2;

/// Largest worker count the queue honours.
///
/// Bounded by the semaphore's permit limit and by the `u32` permit count
/// used to drain in-flight jobs on shutdown.
#[must_use]
pub fn max_workers() -> usize {
    usize::try_from(u32::MAX).map_or(Semaphore::MAX_PERMITS, |limit| {
        limit.min(Semaphore::MAX_PERMITS)
    })
}

/// Sizing for [`TokioValidationQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Pending jobs accepted before `enqueue` reports saturation.
    pub capacity: usize,
    /// Jobs validated concurrently.
    pub workers: usize,
}

impl QueueConfig {
    /// Raise zero sizes to one and cap `workers` at [`max_workers`].
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            capacity: self.capacity.max(1),
            workers: self.workers.clamp(1, max_workers()),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// [`ValidationQueue`] adapter feeding a background Tokio worker.
#[derive(Debug, Clone)]
pub struct TokioValidationQueue {
    sender: mpsc::Sender<ValidationJob>,
    capacity: usize,
}

/// Handle on the background worker spawned with the queue.
#[derive(Debug)]
pub struct ValidationWorker {
    handle: JoinHandle<()>,
}

impl ValidationWorker {
    /// Wait until every queue handle has been dropped and all accepted jobs
    /// have finished.
    ///
    /// # Errors
    ///
    /// Returns the join error when the worker task panicked or was aborted.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.handle.await
    }
}

impl TokioValidationQueue {
    /// Spawn the background worker and return the queue feeding it.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Examples
    /// ```rust,ignore
    /// let (queue, worker) = TokioValidationQueue::spawn(service, QueueConfig::default());
    /// queue.enqueue(job).await?;
    /// drop(queue);
    /// worker.join().await?;
    /// ```
    #[must_use]
    pub fn spawn(
        service: Arc<ResponseValidationService>,
        config: QueueConfig,
    ) -> (Self, ValidationWorker) {
        let QueueConfig { capacity, workers } = config.clamped();
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = tokio::spawn(run_worker(service, receiver, workers));
        (Self { sender, capacity }, ValidationWorker { handle })
    }
}

#[async_trait]
impl ValidationQueue for TokioValidationQueue {
    async fn enqueue(&self, job: ValidationJob) -> Result<(), JobDispatchError> {
        self.sender.try_send(job).map_err(|error| match error {
            mpsc::error::TrySendError::Full(_) => JobDispatchError::saturated(self.capacity),
            mpsc::error::TrySendError::Closed(_) => {
                JobDispatchError::unavailable("validation worker has stopped")
            }
        })
    }
}

async fn run_worker(
    service: Arc<ResponseValidationService>,
    mut receiver: mpsc::Receiver<ValidationJob>,
    workers: usize,
) {
    let permits = Arc::new(Semaphore::new(workers));
    loop {
        // Take a permit before a job so waiting jobs stay in the channel and
        // count against its capacity.
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            warn!("validation worker semaphore closed; stopping");
            return;
        };
        let Some(job) = receiver.recv().await else {
            drop(permit);
            break;
        };
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            run_job(&service, &job).await;
            drop(permit);
        });
    }

    // Drain: wait for in-flight jobs by taking every permit back.
    let total = u32::try_from(workers).unwrap_or(u32::MAX);
    if permits.acquire_many(total).await.is_err() {
        warn!("validation worker semaphore closed while draining");
    }
    info!("validation worker stopped");
}

async fn run_job(service: &ResponseValidationService, job: &ValidationJob) {
    match service.validate(job).await {
        Ok(ValidationOutcome::Passed) => {
            debug!(job_id = %job.id, slug = %job.slug, "background validation passed");
        }
        Ok(ValidationOutcome::Failed { error_count, .. }) => {
            debug!(
                job_id = %job.id,
                slug = %job.slug,
                error_count,
                "background validation found errors"
            );
        }
        Err(error) => {
            warn!(%error, job_id = %job.id, slug = %job.slug, "background validation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the Tokio queue adapter.

    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rstest::rstest;
    use tokio::sync::Notify;

    use super::*;
    use crate::domain::ports::{
        HtmlValidator, HtmlValidatorError, MockDiagnosticsSink, MockPageStore,
    };
    use crate::domain::{PageSlug, ResponseValidationPorts, ValidationReport};

    /// Validator that blocks until released and tracks concurrency.
    #[derive(Default)]
    struct GatedValidator {
        release: Notify,
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HtmlValidator for GatedValidator {
        async fn validate(
            &self,
            _page: &std::path::Path,
        ) -> Result<ValidationReport, HtmlValidatorError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.release.notified().await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ValidationReport::new(1, vec!["error".to_owned()]))
        }
    }

    fn service(validator: Arc<GatedValidator>) -> Arc<ResponseValidationService> {
        let mut store = MockPageStore::new();
        store
            .expect_save()
            .returning(|slug, _| Ok(PathBuf::from(slug.file_name())));
        let mut sink = MockDiagnosticsSink::new();
        sink.expect_record().returning(|_| Ok(()));
        Arc::new(ResponseValidationService::new(ResponseValidationPorts {
            store: Arc::new(store),
            validator,
            sink: Arc::new(sink),
        }))
    }

    fn job(path: &str) -> ValidationJob {
        ValidationJob::new(PageSlug::from_request_path(path), &b"<p>"[..])
    }

    #[rstest]
    #[tokio::test]
    async fn full_queue_reports_saturation() {
        let validator = Arc::new(GatedValidator::default());
        let (queue, worker) = TokioValidationQueue::spawn(
            service(Arc::clone(&validator)),
            QueueConfig {
                capacity: 1,
                workers: 1,
            },
        );

        // The first job is taken by the worker and blocks in the validator;
        // the second fills the channel; the third is refused.
        queue.enqueue(job("/one")).await.expect("first job");
        while validator.active.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        queue.enqueue(job("/two")).await.expect("second job");
        let refused = queue.enqueue(job("/three")).await;
        assert_eq!(refused, Err(JobDispatchError::saturated(1_usize)));

        drop(queue);
        validator.release.notify_one();
        while validator.calls.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }
        validator.release.notify_one();
        worker.join().await.expect("worker joins");
        assert_eq!(validator.calls.load(Ordering::SeqCst), 2);
    }

    async fn release_until(validator: &Arc<GatedValidator>, calls: usize) {
        while validator.calls.load(Ordering::SeqCst) < calls {
            validator.release.notify_waiters();
            tokio::task::yield_now().await;
        }
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn capacity_counts_jobs_waiting_for_a_worker() {
        let validator = Arc::new(GatedValidator::default());
        let (queue, worker) = TokioValidationQueue::spawn(
            service(Arc::clone(&validator)),
            QueueConfig {
                capacity: 1,
                workers: 1,
            },
        );

        let mut accepted = 0;
        for index in 0..5 {
            if queue.enqueue(job(&format!("/page/{index}"))).await.is_ok() {
                accepted += 1;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        // One job held by the only worker, one waiting in the channel.
        assert_eq!(accepted, 2);

        drop(queue);
        release_until(&validator, 2).await;
        worker.join().await.expect("worker joins");
        assert_eq!(validator.calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    #[case(QueueConfig { capacity: 0, workers: 0 }, QueueConfig { capacity: 1, workers: 1 })]
    #[case(
        QueueConfig { capacity: 8, workers: usize::MAX },
        QueueConfig { capacity: 8, workers: max_workers() }
    )]
    #[case(QueueConfig { capacity: 8, workers: 3 }, QueueConfig { capacity: 8, workers: 3 })]
    fn queue_sizes_are_clamped(#[case] config: QueueConfig, #[case] expected: QueueConfig) {
        assert_eq!(config.clamped(), expected);
    }

    #[rstest]
    fn worker_limit_fits_the_semaphore_and_drain_count() {
        assert!(max_workers() <= Semaphore::MAX_PERMITS);
        assert!(u32::try_from(max_workers()).is_ok());
    }

    #[rstest]
    #[tokio::test]
    async fn oversized_worker_count_still_runs_jobs() {
        let validator = Arc::new(GatedValidator::default());
        let (queue, worker) = TokioValidationQueue::spawn(
            service(Arc::clone(&validator)),
            QueueConfig {
                capacity: 1,
                workers: usize::MAX,
            },
        );

        queue.enqueue(job("/one")).await.expect("enqueue");
        drop(queue);
        release_until(&validator, 1).await;
        worker.join().await.expect("worker joins");
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn worker_limit_caps_concurrent_validations() {
        let validator = Arc::new(GatedValidator::default());
        let (queue, worker) = TokioValidationQueue::spawn(
            service(Arc::clone(&validator)),
            QueueConfig {
                capacity: 8,
                workers: 2,
            },
        );
        for index in 0..5 {
            queue
                .enqueue(job(&format!("/page/{index}")))
                .await
                .expect("enqueue");
        }
        drop(queue);

        let releaser = {
            let validator = Arc::clone(&validator);
            tokio::spawn(async move { release_until(&validator, 5).await })
        };
        worker.join().await.expect("worker joins");
        releaser.await.expect("releaser joins");

        assert_eq!(validator.calls.load(Ordering::SeqCst), 5);
        assert!(validator.max_active.load(Ordering::SeqCst) <= 2);
    }

    #[rstest]
    #[tokio::test]
    async fn stopped_worker_reports_unavailable() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let queue = TokioValidationQueue {
            sender,
            capacity: 1,
        };

        let error = queue
            .enqueue(job("/gone"))
            .await
            .expect_err("closed queue");
        assert!(matches!(error, JobDispatchError::Unavailable { .. }));
    }
}
