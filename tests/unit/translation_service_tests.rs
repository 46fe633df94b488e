/*!
 * Tests for per-chunk translation through the translation service
 */

use std::sync::Arc;
use std::time::Duration;
use papertrans::app_config::TranslationConfig;
use papertrans::arxiv::PaperMetadata;
use papertrans::errors::{ProviderError, TranslationError};
use papertrans::providers::mock::{MockProvider, MOCK_TRANSLATION_PREFIX};
use papertrans::translation::TranslationService;

fn config(max_attempts: u32) -> TranslationConfig {
    let mut config = TranslationConfig::default();
    config.common.max_attempts = max_attempts;
    config.common.retry_backoff_ms = 0;
    config
}

fn service(provider: &MockProvider, max_attempts: u32) -> TranslationService {
    TranslationService::with_provider(config(max_attempts), Arc::new(provider.clone()))
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn metadata() -> PaperMetadata {
    PaperMetadata {
        title: "Attention Is All You Need".to_string(),
        abstract_text: "We propose the Transformer.".to_string(),
    }
}

#[tokio::test]
async fn test_translate_chunk_withWorkingProvider_shouldKeepTerminators() {
    let provider = MockProvider::working();
    let chunk = lines(&["\\section{Intro}\r\n", "Hello world\n", "last"]);

    let result = service(&provider, 3).translate_chunk(&chunk, &metadata(), "Korean").await.unwrap();

    assert_eq!(result.attempts, 1);
    assert_eq!(result.lines, vec![
        format!("{}\\section{{Intro}}\r\n", MOCK_TRANSLATION_PREFIX),
        format!("{}Hello world\n", MOCK_TRANSLATION_PREFIX),
        format!("{}last", MOCK_TRANSLATION_PREFIX),
    ]);
    assert_eq!(result.prompt_tokens, Some(30));
    assert_eq!(provider.request_count(), 1);
}

fn leak_backslashes(lines: &[String]) -> Vec<String> {
    lines.iter()
        .map(|line| if line.contains('\\') { "LEAKED".to_string() } else { line.clone() })
        .collect()
}

#[tokio::test]
async fn test_translate_chunk_withGuard_shouldNotSendBackslashes() {
    let provider = MockProvider::working().with_custom_lines(leak_backslashes);
    let chunk = lines(&["\\cite{a} and \\ref{b}\n"]);

    let result = service(&provider, 1).translate_chunk(&chunk, &metadata(), "Korean").await.unwrap();

    assert_eq!(result.lines, chunk);
}

#[tokio::test]
async fn test_translate_chunk_withGuardDisabled_shouldSendRawLines() {
    let provider = MockProvider::working().with_custom_lines(leak_backslashes);
    let mut config = config(1);
    config.common.guard_markup = false;
    let service = TranslationService::with_provider(config, Arc::new(provider));

    let result = service.translate_chunk(&lines(&["\\cite{a}\n"]), &metadata(), "Korean").await.unwrap();

    assert_eq!(result.lines, lines(&["LEAKED\n"]));
}

#[tokio::test]
async fn test_translate_chunk_withWrongLineCount_shouldExhaustAttempts() {
    let provider = MockProvider::wrong_line_count();
    let chunk = lines(&["a\n", "b\n"]);

    let error = service(&provider, 3).translate_chunk(&chunk, &metadata(), "Korean").await.unwrap_err();

    match error {
        TranslationError::RetriesExhausted { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last_error, TranslationError::LineCountMismatch { expected: 2, actual: 1 }));
        },
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_translate_chunk_withUnauthorized_shouldNotRetry() {
    let provider = MockProvider::unauthorized();

    let error = service(&provider, 5).translate_chunk(&lines(&["a\n"]), &metadata(), "Korean").await.unwrap_err();

    match error {
        TranslationError::RetriesExhausted { attempts, last_error } => {
            assert_eq!(attempts, 1);
            assert!(matches!(*last_error, TranslationError::Provider(ProviderError::AuthenticationError(_))));
        },
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_translate_chunk_withMalformedResponse_shouldFail() {
    let provider = MockProvider::malformed();

    let error = service(&provider, 2).translate_chunk(&lines(&["a\n"]), &metadata(), "Korean").await.unwrap_err();

    match error {
        TranslationError::RetriesExhausted { last_error, .. } => {
            assert!(matches!(*last_error, TranslationError::MalformedResponse(_)));
        },
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_translate_chunk_withIntermittentProvider_shouldSucceedOnRetry() {
    // Every second request fails
    let provider = MockProvider::intermittent(2);
    let service = service(&provider, 3);

    let first = service.translate_chunk(&lines(&["a\n"]), &metadata(), "Korean").await.unwrap();
    let second = service.translate_chunk(&lines(&["b\n"]), &metadata(), "Korean").await.unwrap();

    assert_eq!(first.attempts, 1);
    assert_eq!(second.attempts, 2);
    assert_eq!(provider.request_count(), 3);
}

fn split_line(lines: &[String]) -> Vec<String> {
    lines.iter().map(|line| format!("{}\nextra", line)).collect()
}

#[tokio::test]
async fn test_translate_chunk_withInsertedBreak_shouldReject() {
    let provider = MockProvider::working().with_custom_lines(split_line);

    let error = service(&provider, 1).translate_chunk(&lines(&["a\n"]), &metadata(), "Korean").await.unwrap_err();

    match error {
        TranslationError::RetriesExhausted { last_error, .. } => {
            assert!(matches!(*last_error, TranslationError::LineBreakInserted { line: 0 }));
        },
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_translate_chunk_withBlankLinesOnly_shouldSkipRequest() {
    let provider = MockProvider::failing();
    let chunk = lines(&["\n", "   \n", ""]);

    let result = service(&provider, 3).translate_chunk(&chunk, &metadata(), "Korean").await.unwrap();

    assert_eq!(result.lines, chunk);
    assert_eq!(result.attempts, 0);
    assert_eq!(provider.request_count(), 0);
}

#[test]
fn test_backoff_delay_shouldDoubleWithJitter() {
    let mut config = config(4);
    config.common.retry_backoff_ms = 100;
    let service = TranslationService::with_provider(config, Arc::new(MockProvider::working()));

    for (attempt, base) in [(1u32, 100u64), (2, 200), (3, 400)] {
        let delay = service.backoff_delay(attempt);
        assert!(delay >= Duration::from_millis(base), "attempt {}: {:?}", attempt, delay);
        assert!(delay <= Duration::from_millis(base + 25), "attempt {}: {:?}", attempt, delay);
    }
}
