pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod interactive;
pub mod language;
pub mod observer;
pub mod subtitle;
pub mod translate;

pub use config::Config;
pub use controller::JobController;
pub use engine::{JobEngine, JobOutcome, JobState, JobSummary};
pub use error::{Result, SubtransError};
pub use language::{Language, LanguagePair};
pub use observer::{ConsoleObserver, LogObserver, ProgressObserver};
