/*!
 * Tests for configuration loading and validation
 */

use papertrans::app_config::{Config, TranslationProvider, LogLevel};

fn valid_config() -> Config {
    let mut config = Config::default();
    config.translation.active_provider_config_mut().api_key = "sk-test".to_string();
    config
}

#[test]
fn test_default_config_shouldHaveExpectedValues() {
    let config = Config::default();
    assert_eq!(config.target_language, "Korean");
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.common.lines_per_chunk, 30);
    assert_eq!(config.translation.common.max_attempts, 3);
    assert!(config.translation.common.guard_markup);
    assert!(!config.translation.common.check_brace_balance);
    assert_eq!(config.compile.compiler, "xelatex");
    assert!(config.compile.compile_twice);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_validate_withoutApiKey_shouldFailForHostedProvider() {
    let config = Config::default();
    let error = config.validate().unwrap_err();
    assert!(error.to_string().contains("API key"));
}

#[test]
fn test_validate_withLocalProvider_shouldNotRequireApiKey() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withUnknownTargetLanguage_shouldFail() {
    let mut config = valid_config();
    config.target_language = "Klingonese".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withTwoLetterTargetCode_shouldAccept() {
    let mut config = valid_config();
    config.target_language = "ko".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withZeroChunkSize_shouldFail() {
    let mut config = valid_config();
    config.translation.common.lines_per_chunk = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroAttempts_shouldFail() {
    let mut config = valid_config();
    config.translation.common.max_attempts = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() {
    let json = r#"{
        "target_language": "ja",
        "translation": {
            "provider": "anthropic",
            "available_providers": [
                { "type": "anthropic", "model": "claude-test", "api_key": "key" }
            ],
            "common": { "lines_per_chunk": 10 }
        },
        "compile": { "compile_twice": false }
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.target_language, "ja");
    assert_eq!(config.translation.provider, TranslationProvider::Anthropic);
    assert_eq!(config.translation.get_model(), "claude-test");
    assert_eq!(config.translation.get_endpoint(), "https://api.anthropic.com");
    assert_eq!(config.translation.common.lines_per_chunk, 10);
    assert_eq!(config.translation.common.concurrent_requests, 8);
    assert!(!config.compile.compile_twice);
    assert_eq!(config.compile.compiler, "xelatex");
    assert_eq!(config.arxiv.api_endpoint, "https://export.arxiv.org/api/query");
    assert!(config.validate().is_ok());
}

#[test]
fn test_serialize_defaultConfig_shouldRoundTripThroughJson() {
    let config = Config::default();
    let json = serde_json::to_string_pretty(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.target_language, config.target_language);
    assert_eq!(parsed.translation.available_providers.len(), 4);
    assert_eq!(parsed.download_dir, config.download_dir);
}

#[test]
fn test_provider_apiKeyEnvVar_shouldOnlyExistForHostedProviders() {
    assert_eq!(TranslationProvider::OpenAI.api_key_env_var(), Some("OPENAI_API_KEY"));
    assert_eq!(TranslationProvider::Anthropic.api_key_env_var(), Some("ANTHROPIC_API_KEY"));
    assert_eq!(TranslationProvider::Ollama.api_key_env_var(), None);
    assert!(!TranslationProvider::LMStudio.requires_api_key());
}
