//! Start/stop front door for translation jobs.
//!
//! The controller owns a fixed-size worker pool (a multi-threaded tokio
//! runtime) and lets at most one job run on it at a time. All methods are
//! synchronous and must be called from outside an async context.

use crate::config::Config;
use crate::engine::{JobEngine, JobOutcome, JobProgress, JobState, JobStateCell, JobSummary, QuotaMeter};
use crate::error::{Result, SubtransError};
use crate::language::LanguagePair;
use crate::observer::ProgressObserver;
use crate::subtitle::{SrtFile, SubtitleDocument};
use crate::translate::{DeepLClient, Translator};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct ActiveJob {
    cancel: CancellationToken,
    progress: Arc<JobProgress>,
    observer: Arc<dyn ProgressObserver>,
    handle: Option<JoinHandle<JobOutcome>>,
    outcome: Option<JobOutcome>,
}

pub struct JobController {
    config: Mutex<Config>,
    runtime: Mutex<Option<Runtime>>,
    state: Arc<JobStateCell>,
    quota: Arc<QuotaMeter>,
    active: Mutex<Option<ActiveJob>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn build_runtime(threads: usize) -> Result<Runtime> {
    Ok(Builder::new_multi_thread()
        .worker_threads(threads)
        .thread_name("subtrans-worker")
        .enable_all()
        .build()?)
}

impl JobController {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let runtime = build_runtime(config.threads)?;
        debug!("Worker pool started with {} threads", config.threads);

        Ok(Self {
            quota: Arc::new(QuotaMeter::new(config.quota_limit)),
            config: Mutex::new(config),
            runtime: Mutex::new(Some(runtime)),
            state: Arc::new(JobStateCell::default()),
            active: Mutex::new(None),
        })
    }

    /// Validate preconditions and hand the job to the worker pool.
    ///
    /// Returns once the job is queued. Precondition failures are returned and
    /// also reported through `observer.on_error`; no work is spawned for them.
    pub fn start(
        &self,
        source: &Path,
        destination: &Path,
        pair: LanguagePair,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<()> {
        let mut active = lock(&self.active);

        if self.state.get().is_active() {
            return Err(reject(observer.as_ref(), SubtransError::JobActive));
        }

        let config = lock(&self.config).clone();
        let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            return Err(reject(observer.as_ref(), SubtransError::MissingCredential));
        };

        let mut document = match SubtitleDocument::open(source) {
            Ok(document) => document,
            Err(e) => return Err(reject(observer.as_ref(), e)),
        };

        let handle = match lock(&self.runtime).as_ref() {
            Some(runtime) => runtime.handle().clone(),
            None => {
                let err = SubtransError::Config("worker pool is shut down".to_string());
                return Err(reject(observer.as_ref(), err));
            }
        };

        if !self.state.try_begin() {
            return Err(reject(observer.as_ref(), SubtransError::JobActive));
        }
        observer.on_status_change(JobState::Running);
        info!(
            "Translation started: {} -> {} ({})",
            source.display(),
            destination.display(),
            pair
        );

        let translator: Arc<dyn Translator> =
            Arc::new(DeepLClient::new(api_key).with_endpoint(config.api_url.clone()));
        let progress = Arc::new(JobProgress::new(document.len()));
        let engine = JobEngine::new(translator)
            .with_pacing(config.pacing())
            .with_state(self.state.clone())
            .with_progress(progress.clone())
            .with_quota(self.quota.clone());

        let cancel = CancellationToken::new();
        let writer = SrtFile::new(destination);
        let task_cancel = cancel.clone();
        let task_observer = observer.clone();

        let join = handle.spawn(async move {
            engine
                .run(
                    &mut document,
                    pair,
                    &writer,
                    task_observer.as_ref(),
                    &task_cancel,
                )
                .await
        });

        *active = Some(ActiveJob {
            cancel,
            progress,
            observer,
            handle: Some(join),
            outcome: None,
        });
        Ok(())
    }

    /// Ask the running job to stop before its next entry.
    ///
    /// A request already sent is not aborted; with no transport timeout, a
    /// hanging request delays the stop until it returns.
    pub fn stop(&self) {
        let active = lock(&self.active);
        let Some(job) = active.as_ref() else {
            debug!("Stop requested but no job was started");
            return;
        };

        if self.state.transition(JobState::Running, JobState::Cancelling) {
            job.observer.on_status_change(JobState::Cancelling);
            job.cancel.cancel();
            info!("Translation cancelled");
        } else {
            debug!("Stop requested while {}", self.state.get());
        }
    }

    /// Block until the current job finishes and return its outcome.
    ///
    /// Returns `None` if no job was started or its outcome was already taken.
    pub fn wait(&self) -> Option<JobOutcome> {
        let join = {
            let mut active = lock(&self.active);
            let job = active.as_mut()?;
            if let Some(outcome) = job.outcome.take() {
                return Some(outcome);
            }
            job.handle.take()?
        };
        let handle = lock(&self.runtime).as_ref()?.handle().clone();
        self.collect(&handle, join)
    }

    fn collect(&self, handle: &Handle, join: JoinHandle<JobOutcome>) -> Option<JobOutcome> {
        match handle.block_on(join) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("Translation worker stopped unexpectedly: {}", e);
                let _ = self.state.transition(JobState::Running, JobState::Failed)
                    || self.state.transition(JobState::Cancelling, JobState::Idle);
                None
            }
        }
    }

    pub fn state(&self) -> JobState {
        self.state.get()
    }

    /// Counters of the current (or last) job.
    pub fn progress(&self) -> Option<JobSummary> {
        lock(&self.active).as_ref().map(|job| job.progress.snapshot())
    }

    /// `(quota limit, characters used this session)`
    pub fn quota_snapshot(&self) -> (u64, u64) {
        self.quota.snapshot()
    }

    pub fn config(&self) -> Config {
        lock(&self.config).clone()
    }

    /// Replace the whole configuration. A changed thread count rebuilds the
    /// worker pool and is refused while a job is active.
    pub fn reconfigure(&self, config: Config) -> Result<()> {
        config.validate()?;
        if config.threads != lock(&self.config).threads {
            self.set_thread_count(config.threads)?;
        }
        self.quota.set_limit(config.quota_limit);
        *lock(&self.config) = config;
        Ok(())
    }

    pub fn update_api_key(&self, api_key: impl Into<String>) -> Result<()> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SubtransError::MissingCredential);
        }
        lock(&self.config).api_key = Some(api_key.trim().to_string());
        info!("API key updated");
        Ok(())
    }

    /// Forget the API key. Returns false if none was set.
    pub fn delete_api_key(&self) -> bool {
        let removed = lock(&self.config).api_key.take().is_some();
        if removed {
            info!("API key deleted");
        }
        removed
    }

    /// Rebuild the worker pool with `threads` workers. Only allowed when idle.
    pub fn set_thread_count(&self, threads: usize) -> Result<()> {
        if threads == 0 {
            return Err(SubtransError::Config(
                "Thread count must be greater than 0".to_string(),
            ));
        }

        let mut active = lock(&self.active);
        if self.state.get().is_active() {
            warn!("Refusing to resize the worker pool while a job is active");
            return Err(SubtransError::JobActive);
        }

        // The last job's task may still be returning on the old pool; keep its
        // outcome for `wait` before that pool goes away.
        if let Some(job) = active.as_mut() {
            let old = lock(&self.runtime).as_ref().map(|rt| rt.handle().clone());
            if let (Some(join), Some(old)) = (job.handle.take(), old) {
                job.outcome = self.collect(&old, join);
            }
        }

        let runtime = build_runtime(threads)?;
        if let Some(old) = lock(&self.runtime).replace(runtime) {
            old.shutdown_background();
        }
        lock(&self.config).threads = threads;
        info!("Worker pool resized to {} threads", threads);
        Ok(())
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        let runtime = self
            .runtime
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}

fn reject(observer: &dyn ProgressObserver, err: SubtransError) -> SubtransError {
    error!("Cannot start translation: {}", err);
    observer.on_error(&err.to_string());
    err
}
