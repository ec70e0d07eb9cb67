//! The per-job state machine: walks the entries in order, translates each one,
//! and keeps going past per-entry failures.

use crate::language::LanguagePair;
use crate::observer::ProgressObserver;
use crate::subtitle::{DocumentWriter, SubtitleDocument};
use crate::translate::{TranslationRequest, Translator};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Courtesy delay between two requests to the remote service.
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobState {
    Idle = 0,
    Running = 1,
    Cancelling = 2,
    Completed = 3,
    Failed = 4,
}

impl JobState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => JobState::Running,
            2 => JobState::Cancelling,
            3 => JobState::Completed,
            4 => JobState::Failed,
            _ => JobState::Idle,
        }
    }

    /// A job is occupying the controller.
    pub fn is_active(self) -> bool {
        matches!(self, JobState::Running | JobState::Cancelling)
    }

    /// Completed and Failed end a job; the next job may start from them.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Idle | Completed | Failed, Running)
                | (Running, Completed | Failed | Cancelling)
                | (Cancelling, Completed | Idle)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Idle => "Idle",
            JobState::Running => "Running",
            JobState::Cancelling => "Cancelling",
            JobState::Completed => "Completed",
            JobState::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Atomic holder for a [`JobState`] that only accepts legal transitions.
#[derive(Debug)]
pub struct JobStateCell(AtomicU8);

impl Default for JobStateCell {
    fn default() -> Self {
        Self::new(JobState::Idle)
    }
}

impl JobStateCell {
    pub fn new(state: JobState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> JobState {
        JobState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `from -> to` if the cell currently holds `from` and the move is legal.
    pub fn transition(&self, from: JobState, to: JobState) -> bool {
        if !from.can_transition_to(to) {
            return false;
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claim the cell for a new job. Fails while another job is active.
    pub fn try_begin(&self) -> bool {
        [JobState::Idle, JobState::Completed, JobState::Failed]
            .into_iter()
            .any(|from| self.transition(from, JobState::Running))
    }
}

/// Counters for the current job. Written by the job, read by anyone.
#[derive(Debug, Default)]
pub struct JobProgress {
    total: AtomicUsize,
    processed: AtomicUsize,
    failed: AtomicUsize,
    characters: AtomicU64,
}

/// Point-in-time copy of [`JobProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobSummary {
    pub total_entries: usize,
    pub entries_processed: usize,
    pub entries_failed: usize,
    pub characters_translated: u64,
}

impl JobSummary {
    /// Processed share of the document; an empty document counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total_entries == 0 {
            1.0
        } else {
            self.entries_processed as f64 / self.total_entries as f64
        }
    }
}

impl JobProgress {
    pub fn new(total: usize) -> Self {
        let progress = Self::default();
        progress.total.store(total, Ordering::Release);
        progress
    }

    fn reset(&self, total: usize) {
        self.processed.store(0, Ordering::Release);
        self.failed.store(0, Ordering::Release);
        self.characters.store(0, Ordering::Release);
        self.total.store(total, Ordering::Release);
    }

    fn record_success(&self, characters: u64) {
        self.characters.fetch_add(characters, Ordering::AcqRel);
        self.processed.fetch_add(1, Ordering::AcqRel);
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
        self.processed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn snapshot(&self) -> JobSummary {
        JobSummary {
            total_entries: self.total.load(Ordering::Acquire),
            entries_processed: self.processed.load(Ordering::Acquire),
            entries_failed: self.failed.load(Ordering::Acquire),
            characters_translated: self.characters.load(Ordering::Acquire),
        }
    }
}

/// Characters sent back by the service across every job of a session.
#[derive(Debug, Default)]
pub struct QuotaMeter {
    limit: AtomicU64,
    used: AtomicU64,
}

impl QuotaMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit: AtomicU64::new(limit),
            used: AtomicU64::new(0),
        }
    }

    /// Add to the usage and return the new total.
    pub fn add(&self, characters: u64) -> u64 {
        self.used.fetch_add(characters, Ordering::AcqRel) + characters
    }

    pub fn set_limit(&self, limit: u64) {
        self.limit.store(limit, Ordering::Release);
    }

    /// `(limit, used)`
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.limit.load(Ordering::Acquire),
            self.used.load(Ordering::Acquire),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(JobSummary),
    Cancelled(JobSummary),
    Failed { summary: JobSummary, error: String },
}

impl JobOutcome {
    pub fn summary(&self) -> &JobSummary {
        match self {
            JobOutcome::Completed(summary) | JobOutcome::Cancelled(summary) => summary,
            JobOutcome::Failed { summary, .. } => summary,
        }
    }
}

/// Runs one translation pass over a document.
pub struct JobEngine {
    translator: Arc<dyn Translator>,
    pacing: Duration,
    state: Arc<JobStateCell>,
    progress: Arc<JobProgress>,
    quota: Arc<QuotaMeter>,
}

impl JobEngine {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self {
            translator,
            pacing: DEFAULT_PACING,
            state: Arc::new(JobStateCell::default()),
            progress: Arc::new(JobProgress::default()),
            quota: Arc::new(QuotaMeter::default()),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_state(mut self, state: Arc<JobStateCell>) -> Self {
        self.state = state;
        self
    }

    pub fn with_progress(mut self, progress: Arc<JobProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_quota(mut self, quota: Arc<QuotaMeter>) -> Self {
        self.quota = quota;
        self
    }

    pub fn state(&self) -> JobState {
        self.state.get()
    }

    pub fn progress(&self) -> JobSummary {
        self.progress.snapshot()
    }

    /// Translate `document` in place, then hand it to `writer`.
    ///
    /// Per-entry failures leave that entry's text untouched and still count as
    /// processed. Cancellation is checked before each request; a request that
    /// is already in flight is allowed to finish and its result is applied.
    /// Cancelled jobs keep their partial translation and are written as well.
    pub async fn run(
        &self,
        document: &mut SubtitleDocument,
        pair: LanguagePair,
        writer: &dyn DocumentWriter,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        if self.state.try_begin() {
            observer.on_status_change(JobState::Running);
        }

        let total = document.len();
        self.progress.reset(total);
        info!(
            "Total subtitles to translate: {} ({}, via {})",
            total,
            pair,
            self.translator.name()
        );

        if total == 0 {
            observer.on_progress(1.0);
        }

        let mut cancelled = false;
        for (position, entry) in document.entries.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let request = TranslationRequest::new(entry.text.clone(), pair);
            match self.translator.translate(&request).await {
                Ok(translated) => {
                    // Blank entries are never sent, so they cost no quota.
                    let characters = if request.text.trim().is_empty() {
                        0
                    } else {
                        translated.chars().count() as u64
                    };
                    debug!("Entry {} translated ({} chars)", entry.index, characters);
                    entry.text = translated;
                    self.progress.record_success(characters);
                    observer.on_quota_update(self.quota.add(characters));
                }
                Err(e) => {
                    warn!("Entry {} left untranslated: {}", entry.index, e);
                    self.progress.record_failure();
                }
            }
            observer.on_progress(self.progress.snapshot().fraction());

            if position + 1 < total {
                tokio::select! {
                    _ = tokio::time::sleep(self.pacing) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        let summary = self.progress.snapshot();

        if let Err(e) = writer.write(&document.entries) {
            let message = format!("Failed to save translated subtitles: {}", e);
            error!("{}", message);
            observer.on_error(&message);
            let state = self.settle(JobState::Failed);
            observer.on_status_change(state);
            return JobOutcome::Failed {
                summary,
                error: message,
            };
        }

        if cancelled {
            info!(
                "Translation cancelled after {} of {} entries",
                summary.entries_processed, summary.total_entries
            );
            let state = self.settle(JobState::Idle);
            observer.on_status_change(state);
            JobOutcome::Cancelled(summary)
        } else {
            info!(
                "Translation completed: {} entries, {} failed, {} chars",
                summary.entries_processed, summary.entries_failed, summary.characters_translated
            );
            let state = self.settle(JobState::Completed);
            observer.on_status_change(state);
            JobOutcome::Completed(summary)
        }
    }

    /// Move the shared state to the end of the job. A failure while stopping
    /// returns to Idle since Cancelling cannot lead to Failed.
    fn settle(&self, target: JobState) -> JobState {
        match target {
            JobState::Completed => {
                let _ = self.state.transition(JobState::Running, JobState::Completed)
                    || self.state.transition(JobState::Cancelling, JobState::Completed);
            }
            JobState::Failed => {
                let _ = self.state.transition(JobState::Running, JobState::Failed)
                    || self.state.transition(JobState::Cancelling, JobState::Idle);
            }
            _ => {
                self.state.transition(JobState::Running, JobState::Cancelling);
                self.state.transition(JobState::Cancelling, JobState::Idle);
            }
        }
        self.state.get()
    }
}
