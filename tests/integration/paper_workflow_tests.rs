/*!
 * End-to-end tests: fetch, translate and compile a paper
 */

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use papertrans::app_config::Config;
use papertrans::app_controller::{Controller, ISSUES_LOG_FILE};
use papertrans::providers::mock::{MockProvider, MOCK_TRANSLATION_PREFIX};
use crate::common::{self, Route, TestServer};

/// Serves the sample paper as `id` and returns the server and a matching config
async fn serve_sample_paper(id: &str, work: &std::path::Path) -> (TestServer, Config) {
    common::init_test_logging();
    let source = work.join("source");
    fs::create_dir_all(&source).unwrap();
    common::create_sample_paper(&source).unwrap();
    let archive = work.join("served.tar.gz");
    common::create_tar_gz(&source, &archive).unwrap();

    let mut routes = HashMap::new();
    routes.insert(
        "/api/query".to_string(),
        Route::ok(common::atom_feed(id, "Sample Paper", "An abstract.")),
    );
    routes.insert(format!("/src/{}", id), Route::ok(fs::read(&archive).unwrap()));
    let server = TestServer::start(routes).await.unwrap();

    let mut config = Config::default();
    config.download_dir = work.join("downloads");
    config.output_dir = work.join("output");
    config.arxiv.api_endpoint = format!("{}/api/query", server.base_url);
    config.arxiv.source_endpoint = format!("{}/src", server.base_url);
    config.translation.common.retry_backoff_ms = 0;
    config.translation.common.lines_per_chunk = 4;

    (server, config)
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_withWorkingProvider_shouldProducePdfAndTranslatedSources() {
    let work = common::create_temp_dir().unwrap();
    let (_server, mut config) = serve_sample_paper("2401.01234", work.path()).await;
    let compiler = common::create_fake_compiler(work.path(), 0, true).unwrap();
    config.compile.compiler = compiler.to_string_lossy().to_string();

    let controller = Controller::with_provider(config, Arc::new(MockProvider::working()));
    let pdf = controller.run("https://arxiv.org/abs/2401.01234").await.unwrap();

    assert_eq!(pdf, work.path().join("output/2401.01234.pdf"));
    assert!(pdf.is_file());

    let source_dir = work.path().join("downloads/2401.01234");
    let intro = fs::read_to_string(source_dir.join("sections/intro.tex")).unwrap();
    for (translated, original) in intro.lines().zip(common::SAMPLE_INTRO_TEX.lines()) {
        assert_eq!(translated, format!("{}{}", MOCK_TRANSLATION_PREFIX, original));
    }
    assert_eq!(
        fs::read_to_string(source_dir.join("main.tex_original")).unwrap(),
        common::SAMPLE_MAIN_TEX
    );
    assert!(!source_dir.join(ISSUES_LOG_FILE).exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_withFailingProvider_shouldStillCompileOriginalText() {
    let work = common::create_temp_dir().unwrap();
    let (_server, mut config) = serve_sample_paper("hep-th/9901001", work.path()).await;
    let compiler = common::create_fake_compiler(work.path(), 0, true).unwrap();
    config.compile.compiler = compiler.to_string_lossy().to_string();
    config.compile.inject_fonts = false;
    config.translation.common.max_attempts = 1;

    let controller = Controller::with_provider(config, Arc::new(MockProvider::failing()));
    let pdf = controller.run("hep-th/9901001").await.unwrap();

    assert_eq!(pdf, work.path().join("output/hep-th_9901001.pdf"));

    let source_dir = work.path().join("downloads/hep-th_9901001");
    assert_eq!(
        fs::read_to_string(source_dir.join("sections/intro.tex")).unwrap(),
        common::SAMPLE_INTRO_TEX
    );
    let issues = fs::read_to_string(source_dir.join(ISSUES_LOG_FILE)).unwrap();
    assert!(issues.contains("keeping original lines"));
}

#[tokio::test]
async fn test_run_withUnknownPaper_shouldAbortBeforeTranslation() {
    let work = common::create_temp_dir().unwrap();
    let mut routes = HashMap::new();
    routes.insert("/api/query".to_string(), Route::ok(common::atom_error_feed()));
    let server = TestServer::start(routes).await.unwrap();

    let mut config = Config::default();
    config.download_dir = work.path().join("downloads");
    config.arxiv.api_endpoint = format!("{}/api/query", server.base_url);
    config.arxiv.source_endpoint = format!("{}/src", server.base_url);
    let provider = MockProvider::working();

    let controller = Controller::with_provider(config, Arc::new(provider.clone()));
    let result = controller.run("2401.99999").await;

    assert!(result.is_err());
    assert_eq!(provider.request_count(), 0);
    assert!(!work.path().join("downloads").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_withCompilerFailure_shouldKeepTranslatedSources() {
    let work = common::create_temp_dir().unwrap();
    let (_server, mut config) = serve_sample_paper("2402.00001", work.path()).await;
    let compiler = common::create_fake_compiler(work.path(), 2, false).unwrap();
    config.compile.compiler = compiler.to_string_lossy().to_string();

    let controller = Controller::with_provider(config, Arc::new(MockProvider::working()));
    let result = controller.run("2402.00001").await;

    assert!(result.is_err());
    let intro = fs::read_to_string(work.path().join("downloads/2402.00001/sections/intro.tex")).unwrap();
    assert!(intro.starts_with(MOCK_TRANSLATION_PREFIX));
}
