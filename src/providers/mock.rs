/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with a tagged translation
 * - `MockProvider::echo()` - Returns the shielded text unchanged
 * - `MockProvider::intermittent()` - Fails every Nth request with a 503
 * - `MockProvider::failing()` - Always fails with the chosen error class
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{Provider, TranslationRequest};

/// Error class produced by failing mocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// HTTP 503, retried by the pipeline
    Transient,
    /// Bad credentials, aborts the run
    Fatal,
    /// HTTP 400, fails the segment without retries
    Rejected,
}

impl MockFailure {
    fn to_error(self, count: usize) -> ProviderError {
        match self {
            Self::Transient => ProviderError::ApiError {
                status_code: 503,
                message: format!("Simulated outage (request #{})", count + 1),
            },
            Self::Fatal => ProviderError::AuthenticationError("Simulated invalid API key".to_string()),
            Self::Rejected => ProviderError::ApiError {
                status_code: 400,
                message: "Simulated rejected request".to_string(),
            },
        }
    }
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with `[<target>] <text>`
    Working,
    /// Returns the request text unchanged
    Echo,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Fails the first N requests, then works
    FailFirst { failures: usize, failure: MockFailure },
    /// Always fails
    Failing(MockFailure),
    /// Fails requests whose text contains `needle`, works otherwise
    FailMatching { needle: &'static str, failure: MockFailure },
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, shared between clones
    received: Arc<Mutex<Vec<TranslationRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&TranslationRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that hands the text back untouched
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing(failure: MockFailure) -> Self {
        Self::new(MockBehavior::Failing(failure))
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom response generator used by successful calls
    pub fn with_custom_response(mut self, generator: fn(&TranslationRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of calls made so far, across clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Counter handle that stays valid after the provider moves into an `Arc<dyn Provider>`
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.request_count)
    }

    /// Requests received so far
    pub fn received(&self) -> Vec<TranslationRequest> {
        self.received.lock().clone()
    }

    fn respond(&self, request: &TranslationRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None if self.behavior == MockBehavior::Echo => request.text.clone(),
            None => format!("[{}] {}", request.target_language, request.text),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            received: Arc::clone(&self.received),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working | MockBehavior::Echo => Ok(self.respond(request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(MockFailure::Transient.to_error(count))
                } else {
                    Ok(self.respond(request))
                }
            }

            MockBehavior::FailFirst { failures, failure } => {
                if count < failures {
                    Err(failure.to_error(count))
                } else {
                    Ok(self.respond(request))
                }
            }

            MockBehavior::Failing(failure) => Err(failure.to_error(count)),

            MockBehavior::FailMatching { needle, failure } => {
                if request.text.contains(needle) {
                    Err(failure.to_error(count))
                } else {
                    Ok(self.respond(request))
                }
            }

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(request))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing(MockFailure::Fatal) => Err(MockFailure::Fatal.to_error(0)),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
