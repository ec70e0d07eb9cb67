pub mod deepl;

pub use deepl::DeepLClient;

use crate::language::LanguagePair;
use async_trait::async_trait;
use thiserror::Error;

/// One fragment to translate. Built fresh for every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub pair: LanguagePair,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, pair: LanguagePair) -> Self {
        Self {
            text: text.into(),
            pair,
        }
    }
}

/// Why a single fragment could not be translated. Every kind is recoverable:
/// the job skips the entry and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("request failed: {0}")]
    Transient(String),

    #[error("translation API error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

pub type TranslationResult = std::result::Result<String, TranslationError>;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> TranslationResult;
    fn name(&self) -> &'static str;
}
