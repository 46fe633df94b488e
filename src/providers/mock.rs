/*!
 * Mock provider implementations for testing.
 *
 * The mock understands the line-array request format used by the translation
 * client and answers with the `{"translate": {"lines": [...]}}` object:
 * - `MockProvider::working()` - Always succeeds, prefixing every line
 * - `MockProvider::wrong_line_count()` - Drops or adds a line
 * - `MockProvider::malformed()` - Answers with text that is not JSON
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::intermittent(n)` - Fails every nth request
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Prefix the working mock adds to every line
pub const MOCK_TRANSLATION_PREFIX: &str = "[TRANSLATED] ";

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Succeeds but returns one line too few (or one too many for single lines)
    WrongLineCount,
    /// Returns a body that is not a JSON object
    Malformed,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Always fails with an authentication error
    Unauthorized,
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
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom line transformation (optional)
    custom_lines: Option<fn(&[String]) -> Vec<String>>,
    /// Per-request delay computed from the request lines (optional)
    delay_for: Option<fn(&[String]) -> u64>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_lines: None,
            delay_for: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that never returns the right number of lines
    pub fn wrong_line_count() -> Self {
        Self::new(MockBehavior::WrongLineCount)
    }

    /// Create a mock that answers with non-JSON text
    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that rejects every request as unauthenticated
    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that waits before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom line transformation for the working behavior
    pub fn with_custom_lines(mut self, generator: fn(&[String]) -> Vec<String>) -> Self {
        self.custom_lines = Some(generator);
        self
    }

    /// Delay each answer by a duration derived from the request lines
    pub fn with_delay_fn(mut self, delay_for: fn(&[String]) -> u64) -> Self {
        self.delay_for = Some(delay_for);
        self
    }

    /// Number of requests received so far (across clones)
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Decode the line array carried in the user message
    pub fn request_lines(request: &CompletionRequest) -> Vec<String> {
        serde_json::from_str::<Vec<String>>(&request.user).unwrap_or_default()
    }

    /// Build a well-formed response object for the given lines
    pub fn generate_lines_response(lines: &[String]) -> String {
        serde_json::json!({ "translate": { "lines": lines } }).to_string()
    }

    fn translated(&self, lines: &[String]) -> Vec<String> {
        match self.custom_lines {
            Some(generator) => generator(lines),
            None => lines.iter()
                .map(|line| format!("{}{}", MOCK_TRANSLATION_PREFIX, line))
                .collect(),
        }
    }

    fn respond(lines: &[String]) -> CompletionResponse {
        let text = Self::generate_lines_response(lines);
        CompletionResponse {
            prompt_tokens: Some(lines.len() as u64 * 10),
            completion_tokens: Some((text.len() / 4) as u64),
            text,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_lines: self.custom_lines,
            delay_for: self.delay_for,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let lines = Self::request_lines(&request);

        if let Some(delay_for) = self.delay_for {
            let delay_ms = delay_for(&lines);
            if delay_ms > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
            }
        }

        match self.behavior {
            MockBehavior::Working => Ok(Self::respond(&self.translated(&lines))),

            MockBehavior::WrongLineCount => {
                let mut translated = self.translated(&lines);
                if translated.len() > 1 {
                    translated.pop();
                } else {
                    translated.push("extra line".to_string());
                }
                Ok(Self::respond(&translated))
            }

            MockBehavior::Malformed => Ok(CompletionResponse {
                text: "Sure! Here is the translation you asked for.".to_string(),
                prompt_tokens: Some(10),
                completion_tokens: Some(10),
            }),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::respond(&self.translated(&lines)))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),

            MockBehavior::Empty => Ok(CompletionResponse {
                text: String::new(),
                prompt_tokens: Some(0),
                completion_tokens: Some(0),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(Self::respond(&self.translated(&lines)))
            }
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
