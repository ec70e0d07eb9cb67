//! Progress reporting from a running job to whatever presents it.

use crate::engine::JobState;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

/// Receives job updates. Calls arrive on a worker thread, in entry order,
/// and must return quickly.
pub trait ProgressObserver: Send + Sync {
    /// Fraction of entries processed, `0.0..=1.0`.
    fn on_progress(&self, fraction: f64);
    /// Characters translated so far in this session.
    fn on_quota_update(&self, used: u64);
    fn on_status_change(&self, status: JobState);
    fn on_error(&self, message: &str);
}

/// Observer that only writes to the log.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_progress(&self, fraction: f64) {
        info!("Progress: {:.2}%", fraction * 100.0);
    }

    fn on_quota_update(&self, used: u64) {
        info!("Quota used: {}", used);
    }

    fn on_status_change(&self, status: JobState) {
        info!("Status: {}", status);
    }

    fn on_error(&self, message: &str) {
        error!("{}", message);
    }
}

/// Terminal progress bar for the CLI.
pub struct ConsoleObserver {
    bar: ProgressBar,
    quota_limit: u64,
}

const BAR_LENGTH: u64 = 1000;

impl ConsoleObserver {
    pub fn new(quota_limit: u64) -> Self {
        let bar = ProgressBar::new(BAR_LENGTH);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar, quota_limit }
    }
}

impl ProgressObserver for ConsoleObserver {
    fn on_progress(&self, fraction: f64) {
        self.bar
            .set_position((fraction.clamp(0.0, 1.0) * BAR_LENGTH as f64).round() as u64);
    }

    fn on_quota_update(&self, used: u64) {
        self.bar
            .set_message(format!("quota {}/{}", used, self.quota_limit));
    }

    fn on_status_change(&self, status: JobState) {
        match status {
            JobState::Completed => self.bar.finish_with_message("✓ Translation completed"),
            JobState::Failed => self.bar.abandon_with_message("✗ Translation failed"),
            JobState::Idle => self.bar.abandon_with_message("Translation cancelled"),
            JobState::Cancelling => self.bar.set_message("Stopping..."),
            JobState::Running => self.bar.set_message("Translating..."),
        }
    }

    fn on_error(&self, message: &str) {
        self.bar.println(format!("Error: {}", message));
    }
}
