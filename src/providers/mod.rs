/*!
 * Provider implementations for machine translation services.
 *
 * This module contains the boundary every translation service implements:
 * - DeepL: the production client
 * - Mock: scripted behaviours for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::glossary::Glossary;

/// One call to a translation service
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// Shielded text to translate
    pub text: String,
    /// ISO 639-1 source language code
    pub source_language: String,
    /// ISO 639-1 target language code
    pub target_language: String,
    /// Terms passed through to the service unmodified
    pub glossary: Option<Arc<Glossary>>,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            glossary: None,
        }
    }

    pub fn with_glossary(mut self, glossary: Option<Arc<Glossary>>) -> Self {
        self.glossary = glossary;
        self
    }
}

/// Common trait for all translation services
///
/// Implementations are used interchangeably by the pipeline through
/// `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Translate one segment
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or a classified error
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError>;

    /// Test the connection (and credentials) of the service
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

pub mod deepl;
pub mod mock;
