//! Shared fakes for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use subtrans::engine::JobState;
use subtrans::observer::ProgressObserver;
use subtrans::subtitle::{DocumentWriter, SubtitleDocument, SubtitleEntry};
use subtrans::translate::{TranslationError, TranslationRequest, TranslationResult, Translator};
use subtrans::SubtransError;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress(f64),
    Quota(u64),
    Status(JobState),
    Error(String),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<JobState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn quota(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Quota(q) => Some(q),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, fraction: f64) {
        self.push(Event::Progress(fraction));
    }

    fn on_quota_update(&self, used: u64) {
        self.push(Event::Quota(used));
    }

    fn on_status_change(&self, status: JobState) {
        self.push(Event::Status(status));
    }

    fn on_error(&self, message: &str) {
        self.push(Event::Error(message.to_string()));
    }
}

/// Upper-cases text; texts containing "FAIL" get a remote error. Optionally
/// cancels a token once a given number of calls has been made.
#[derive(Default)]
pub struct ScriptedTranslator {
    calls: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedTranslator {
    pub fn cancelling_after(calls: usize, token: CancellationToken) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            cancel_after: Some((calls, token)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, token)) = &self.cancel_after {
            if n >= *limit {
                token.cancel();
            }
        }

        if request.text.contains("FAIL") {
            return Err(TranslationError::Remote {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(request.text.to_uppercase())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Default)]
pub struct MemoryWriter {
    written: Mutex<Option<Vec<SubtitleEntry>>>,
}

impl MemoryWriter {
    pub fn written(&self) -> Option<Vec<SubtitleEntry>> {
        self.written.lock().unwrap().clone()
    }
}

impl DocumentWriter for MemoryWriter {
    fn write(&self, entries: &[SubtitleEntry]) -> subtrans::Result<()> {
        *self.written.lock().unwrap() = Some(entries.to_vec());
        Ok(())
    }
}

pub struct FailingWriter;

impl DocumentWriter for FailingWriter {
    fn write(&self, _entries: &[SubtitleEntry]) -> subtrans::Result<()> {
        Err(SubtransError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only destination",
        )))
    }
}

pub fn document(texts: &[&str]) -> SubtitleDocument {
    SubtitleDocument::new(
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| SubtitleEntry {
                index: i + 1,
                start: Duration::from_secs(i as u64 * 3),
                end: Duration::from_secs(i as u64 * 3 + 2),
                text: text.to_string(),
            })
            .collect(),
    )
}

pub fn srt_text(texts: &[&str]) -> String {
    subtrans::subtitle::srt::format(&document(texts).entries)
}
