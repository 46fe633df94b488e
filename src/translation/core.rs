/*!
 * Core translation service implementation.
 *
 * This module contains the `TranslationService`, which translates one chunk of
 * LaTeX lines per request. Each chunk runs through an explicit attempt state
 * machine: `Pending -> Attempted(n) -> {Succeeded | FailedFinal}`. An attempt
 * guards the markup, sends the lines, parses the structured answer, restores
 * the markup and passes the result through the fidelity gate. Only lines that
 * pass the gate are returned, with each source line's terminator re-attached.
 */

use anyhow::{Result, anyhow};
use log::{debug, warn};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::arxiv::PaperMetadata;
use crate::errors::TranslationError;
use crate::providers::anthropic::Anthropic;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::providers::{CompletionRequest, Provider};
use crate::validation::FidelityChecker;

use super::chunker::split_terminator;
use super::guard::MarkupGuard;
use super::prompts::{TranslationPromptBuilder, parse_translation_response};

/// Token usage statistics for tracking API consumption
#[derive(Clone, Debug)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self::with_provider_info(String::new(), String::new())
    }

    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            provider,
            model,
        }
    }

    /// Add token usage numbers
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Add time spent waiting on the service
    pub fn add_api_duration(&mut self, duration: Duration) {
        self.api_duration += duration;
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Use the API duration for rate calculation, with fallback to elapsed time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Token Usage Summary:\n\
             Provider: {}\n\
             Model: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.provider,
            self.model,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

/// Log entry for capturing translation process logs
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
}

impl LogEntry {
    /// Create an entry with the given level
    pub fn new(level: &str, message: impl Into<String>) -> Self {
        Self {
            level: level.to_string(),
            message: message.into(),
        }
    }
}

/// A chunk that passed the fidelity gate
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkTranslation {
    /// Translated lines, each with its source line's terminator
    pub lines: Vec<String>,
    /// Attempts used, including the successful one
    pub attempts: u32,
    /// Prompt tokens of the successful attempt
    pub prompt_tokens: Option<u64>,
    /// Completion tokens of the successful attempt
    pub completion_tokens: Option<u64>,
    /// Time spent in the successful request
    pub api_duration: Duration,
}

/// Per-chunk attempt state
#[derive(Debug)]
pub enum AttemptState {
    /// Nothing sent yet
    Pending,
    /// `attempt` requests made, the last one failed
    Attempted {
        /// Number of attempts made
        attempt: u32,
        /// Failure of the last attempt
        last_error: TranslationError,
    },
    /// An attempt passed the fidelity gate
    Succeeded(ChunkTranslation),
    /// No further attempt will be made
    FailedFinal {
        /// Number of attempts made
        attempts: u32,
        /// Failure of the last attempt
        error: TranslationError,
    },
}

/// Normalize a configured endpoint into a base URL
fn parse_endpoint(endpoint: &str) -> Result<String> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    if url.host_str().is_none() {
        return Err(anyhow!("Invalid host in endpoint: {}", endpoint));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Build the provider client selected by the configuration
fn build_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>> {
    let timeout_secs = config.get_timeout_secs();

    let provider: Arc<dyn Provider> = match config.provider {
        ConfigTranslationProvider::OpenAI => {
            Arc::new(OpenAI::new(config.get_api_key(), parse_endpoint(&config.get_endpoint())?, timeout_secs))
        },
        ConfigTranslationProvider::LMStudio => {
            // LM Studio often doesn't require an API key; use a default if empty
            let api_key = {
                let k = config.get_api_key();
                if k.is_empty() { "lm-studio".to_string() } else { k }
            };
            Arc::new(
                OpenAI::new(api_key, parse_endpoint(&config.get_endpoint())?, timeout_secs)
                    .with_label("LM Studio"),
            )
        },
        ConfigTranslationProvider::Anthropic => {
            Arc::new(Anthropic::new(config.get_api_key(), parse_endpoint(&config.get_endpoint())?, timeout_secs))
        },
        ConfigTranslationProvider::Ollama => {
            Arc::new(Ollama::new(parse_endpoint(&config.get_endpoint())?, timeout_secs))
        },
    };

    Ok(provider)
}

/// Main translation service for chunk translation
#[derive(Clone, Debug)]
pub struct TranslationService {
    /// Provider implementation
    provider: Arc<dyn Provider>,

    /// Configuration for the translation service
    pub config: TranslationConfig,

    /// Markup guard applied around each request
    guard: MarkupGuard,

    /// Fidelity gate applied to each response
    checker: FidelityChecker,
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let provider = build_provider(&config)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Create a translation service around an existing provider
    pub fn with_provider(config: TranslationConfig, provider: Arc<dyn Provider>) -> Self {
        let checker = FidelityChecker::new(config.common.check_brace_balance);
        Self {
            provider,
            config,
            guard: MarkupGuard::new(),
            checker,
        }
    }

    /// Name of the provider in use
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Translate one chunk of raw lines
    ///
    /// Retries failed attempts with exponential backoff up to
    /// `max_attempts`. Authentication failures are not retried. On success the
    /// returned lines have exactly the chunk's line count and terminators.
    pub async fn translate_chunk(
        &self,
        lines: &[String],
        metadata: &PaperMetadata,
        target_language: &str,
    ) -> Result<ChunkTranslation, TranslationError> {
        // Nothing to translate: keep the chunk as is without a request
        if lines.iter().all(|line| line.trim().is_empty()) {
            return Ok(ChunkTranslation {
                lines: lines.to_vec(),
                attempts: 0,
                prompt_tokens: None,
                completion_tokens: None,
                api_duration: Duration::ZERO,
            });
        }

        let max_attempts = self.config.common.max_attempts.max(1);
        let mut state = AttemptState::Pending;

        loop {
            state = match state {
                AttemptState::Pending => {
                    self.run_attempt(1, lines, metadata, target_language).await
                },
                AttemptState::Attempted { attempt, last_error } => {
                    if !last_error.is_retryable() || attempt >= max_attempts {
                        AttemptState::FailedFinal { attempts: attempt, error: last_error }
                    } else {
                        let delay = self.backoff_delay(attempt);
                        debug!("Retrying chunk in {:?} (attempt {} of {})", delay, attempt + 1, max_attempts);
                        tokio::time::sleep(delay).await;
                        self.run_attempt(attempt + 1, lines, metadata, target_language).await
                    }
                },
                AttemptState::Succeeded(translation) => return Ok(translation),
                AttemptState::FailedFinal { attempts, error } => {
                    return Err(TranslationError::RetriesExhausted {
                        attempts,
                        last_error: Box::new(error),
                    });
                },
            };
        }
    }

    /// Delay before the attempt following `attempt`
    ///
    /// `retry_backoff_ms * 2^(attempt-1)` plus up to a quarter of the base as jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.common.retry_backoff_ms;
        if base == 0 {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(10);
        let backoff = base.saturating_mul(1u64 << exponent);
        let jitter = rand::rng().random_range(0..=base / 4);
        Duration::from_millis(backoff.saturating_add(jitter))
    }

    async fn run_attempt(
        &self,
        attempt: u32,
        lines: &[String],
        metadata: &PaperMetadata,
        target_language: &str,
    ) -> AttemptState {
        match self.attempt_once(lines, metadata, target_language).await {
            Ok(mut translation) => {
                translation.attempts = attempt;
                AttemptState::Succeeded(translation)
            },
            Err(e) => {
                warn!("Translation attempt {} via {} failed: {}", attempt, self.provider.name(), e);
                AttemptState::Attempted { attempt, last_error: e }
            },
        }
    }

    async fn attempt_once(
        &self,
        lines: &[String],
        metadata: &PaperMetadata,
        target_language: &str,
    ) -> Result<ChunkTranslation, TranslationError> {
        let (contents, terminators): (Vec<&str>, Vec<&str>) = lines.iter()
            .map(|line| split_terminator(line))
            .unzip();
        let contents: Vec<String> = contents.into_iter().map(String::from).collect();

        let guarded = self.config.common.guard_markup && self.guard.can_protect_all(&contents);
        let outgoing: Vec<String> = if guarded {
            contents.iter().map(|line| self.guard.protect(line)).collect()
        } else {
            contents.clone()
        };

        let mut builder = TranslationPromptBuilder::new(target_language, metadata, &outgoing);
        if guarded {
            builder = builder.with_guard_token(self.guard.token());
        }
        let (system, user) = builder.build();

        let request = CompletionRequest {
            model: self.config.get_model(),
            system,
            user,
            temperature: self.config.common.temperature,
            max_tokens: self.config.get_max_tokens(),
            json_output: true,
        };

        let start_time = Instant::now();
        let response = self.provider.complete(request).await?;
        let api_duration = start_time.elapsed();

        let returned = parse_translation_response(&response.text)?;
        let restored: Vec<String> = returned.iter()
            .map(|line| {
                // A trailing terminator is tolerated; the source terminator is re-attached below
                let (content, _) = split_terminator(line);
                if guarded { self.guard.restore(content) } else { content.to_string() }
            })
            .collect();

        self.checker.verify(&contents, &restored)?;

        let lines = restored.into_iter()
            .zip(terminators)
            .map(|(content, terminator)| content + terminator)
            .collect();

        Ok(ChunkTranslation {
            lines,
            attempts: 1,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
            api_duration,
        })
    }
}
