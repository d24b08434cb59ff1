use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

use crate::errors::ProviderError;
use crate::glossary::Glossary;
use crate::language_utils::deepl_language_code;
use crate::providers::{Provider, TranslationRequest};

/// Endpoint for paid API keys
pub const DEEPL_PRO_ENDPOINT: &str = "https://api.deepl.com";

/// Endpoint for free API keys (suffix `:fx`)
pub const DEEPL_FREE_ENDPOINT: &str = "https://api-free.deepl.com";

/// DeepL client for interacting with the DeepL API
#[derive(Debug)]
pub struct DeepL {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL without path
    endpoint: String,
    /// `more`, `less`, `prefer_more`, `prefer_less` or `default`
    formality: Option<String>,
    /// Glossary created for this run; `None` when creation failed
    glossary_id: OnceCell<Option<String>>,
}

/// Translate request body
#[derive(Debug, Serialize)]
pub struct DeepLRequest {
    text: Vec<String>,
    source_lang: String,
    target_lang: String,
    /// Keep line breaks and punctuation as sent
    preserve_formatting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    formality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    glossary_id: Option<String>,
}

/// Translate response body
#[derive(Debug, Deserialize)]
pub struct DeepLResponse {
    pub translations: Vec<DeepLTranslation>,
}

/// One translated text
#[derive(Debug, Deserialize)]
pub struct DeepLTranslation {
    #[serde(default)]
    pub detected_source_language: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize)]
struct GlossaryRequest {
    name: String,
    source_lang: String,
    target_lang: String,
    entries: String,
    entries_format: String,
}

#[derive(Debug, Deserialize)]
struct GlossaryResponse {
    glossary_id: String,
}

/// Account usage returned by `/v2/usage`
#[derive(Debug, Deserialize)]
pub struct DeepLUsage {
    pub character_count: u64,
    pub character_limit: u64,
}

/// Map an unsuccessful HTTP status to a provider error
pub fn map_status(status: StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body.to_string()),
        456 => ProviderError::QuotaExceeded(body.to_string()),
        429 => ProviderError::RateLimitExceeded(body.to_string()),
        code => ProviderError::ApiError {
            status_code: code,
            message: body.to_string(),
        },
    }
}

fn map_transport(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(error.to_string())
    } else if error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Base URL for a key: explicit endpoint, else free or pro by key suffix
pub fn resolve_endpoint(api_key: &str, endpoint: &str) -> String {
    if !endpoint.trim().is_empty() {
        return endpoint.trim().trim_end_matches('/').to_string();
    }
    if api_key.ends_with(":fx") {
        DEEPL_FREE_ENDPOINT.to_string()
    } else {
        DEEPL_PRO_ENDPOINT.to_string()
    }
}

impl DeepL {
    /// Create a new DeepL client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl AsRef<str>,
        timeout_secs: u64,
        formality: Option<String>,
    ) -> Self {
        let api_key = api_key.into();
        let endpoint = resolve_endpoint(&api_key, endpoint.as_ref());
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key,
            endpoint,
            formality,
            glossary_id: OnceCell::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        Url::parse(&self.endpoint)
            .and_then(|base| base.join(path))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid DeepL endpoint '{}': {}", self.endpoint, e)))
    }

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        error!("DeepL API error ({}): {}", status, body);
        Err(map_status(status, &body))
    }

    /// Build the translate request body
    pub fn build_request(
        &self,
        request: &TranslationRequest,
        glossary_id: Option<String>,
    ) -> Result<DeepLRequest, ProviderError> {
        let source_lang = deepl_language_code(&request.source_language, false)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let target_lang = deepl_language_code(&request.target_language, true)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(DeepLRequest {
            text: vec![request.text.clone()],
            source_lang,
            target_lang,
            preserve_formatting: true,
            formality: self.formality.clone(),
            glossary_id,
        })
    }

    /// Create the glossary once; later calls reuse the id
    async fn ensure_glossary(&self, request: &TranslationRequest, glossary: &Glossary) -> Option<String> {
        self.glossary_id
            .get_or_init(|| async {
                match self.create_glossary(request, glossary).await {
                    Ok(id) => {
                        debug!("Created DeepL glossary {} with {} terms", id, glossary.len());
                        Some(id)
                    }
                    Err(e) => {
                        warn!("Could not create DeepL glossary, translating without it: {}", e);
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn create_glossary(&self, request: &TranslationRequest, glossary: &Glossary) -> Result<String, ProviderError> {
        // Glossaries take plain language codes, without regional variants
        let source_lang = deepl_language_code(&request.source_language, false)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let target_lang = deepl_language_code(&request.target_language, false)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let body = GlossaryRequest {
            name: format!("docshield {}-{}", source_lang, target_lang),
            source_lang,
            target_lang,
            entries: glossary.to_tsv(),
            entries_format: "tsv".to_string(),
        };

        let response = self
            .client
            .post(self.url("/v2/glossaries")?)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;
        let response = Self::check(response).await?;
        let created = response
            .json::<GlossaryResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok(created.glossary_id)
    }

    /// Character usage for the account
    pub async fn usage(&self) -> Result<DeepLUsage, ProviderError> {
        let response = self
            .client
            .get(self.url("/v2/usage")?)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(map_transport)?;
        let response = Self::check(response).await?;
        response
            .json::<DeepLUsage>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl Provider for DeepL {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let glossary_id = match &request.glossary {
            Some(glossary) if !glossary.is_empty() => self.ensure_glossary(request, glossary).await,
            _ => None,
        };
        let body = self.build_request(request, glossary_id)?;

        let response = self
            .client
            .post(self.url("/v2/translate")?)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;
        let response = Self::check(response).await?;

        let parsed = response
            .json::<DeepLResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| ProviderError::ParseError("Response contained no translations".to_string()))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let usage = self.usage().await?;
        debug!(
            "DeepL usage: {} of {} characters",
            usage.character_count, usage.character_limit
        );
        if usage.character_limit > 0 && usage.character_count >= usage.character_limit {
            return Err(ProviderError::QuotaExceeded(format!(
                "{} of {} characters used",
                usage.character_count, usage.character_limit
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "deepl"
    }
}
