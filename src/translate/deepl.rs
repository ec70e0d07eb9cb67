//! DeepL-backed translation over the v2 form API.

use crate::config::DEFAULT_API_URL;
use crate::translate::{TranslationError, TranslationRequest, TranslationResult, Translator};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Translator using the DeepL REST API.
///
/// No request timeout is set, so a hanging call delays how quickly a
/// cancelled job notices the stop request.
pub struct DeepLClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl DeepLClient {
    /// Create a new client for the free-tier endpoint.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: DEFAULT_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (e.g. the Pro API or a mock).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Deserialize, Debug)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize, Debug)]
struct DeepLTranslation {
    text: String,
}

#[async_trait]
impl Translator for DeepLClient {
    async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        if request.text.trim().is_empty() {
            return Ok(request.text.clone());
        }

        debug!(
            "Translating {} chars ({})",
            request.text.chars().count(),
            request.pair
        );

        let form = [
            ("auth_key", self.api_key.as_str()),
            ("text", request.text.as_str()),
            ("source_lang", request.pair.source.code()),
            ("target_lang", request.pair.target.code()),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| TranslationError::Transient(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::Transient(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(TranslationError::Remote {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: DeepLResponse = serde_json::from_str(&body)
            .map_err(|e| TranslationError::Unexpected(format!("Failed to parse response: {}", e)))?;

        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| TranslationError::Unexpected("Response contained no translations".to_string()))
    }

    fn name(&self) -> &'static str {
        "deepl"
    }
}
