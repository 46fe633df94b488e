use anyhow::{Result, Context};
use log::{error, warn, info, debug};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use crate::app_config::Config;
use crate::arxiv::{self, ArxivClient, ArxivId, PaperMetadata};
use crate::compiler::CompilationDriver;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::Provider;
use crate::translation::{DocumentRewriter, LogEntry, RewriteSummary, TranslationService};

// @module: Application controller for paper translation

/// Name of the issues log written next to the extracted sources
pub const ISSUES_LOG_FILE: &str = "papertrans.issues.log";

/// Main application controller for paper translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Provider override, used instead of the configured one
    provider: Option<Arc<dyn Provider>>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            provider: None,
        })
    }

    /// Create a controller that sends every request to `provider`
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Self {
        Self {
            config,
            provider: Some(provider),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole workflow for one paper and return the path of the compiled PDF
    ///
    /// Setup failures (identifier, metadata, download, extraction) abort the run.
    /// Chunk failures only degrade the translation. Compilation failures are returned
    /// after the translated sources have been written.
    pub async fn run(&self, paper_input: &str) -> Result<PathBuf> {
        let start_time = Instant::now();

        let id = arxiv::extract_arxiv_id(paper_input)?;
        info!("arXiv ID: {}", id);

        let client = ArxivClient::new(self.config.arxiv.clone());
        let metadata = client.fetch_metadata(&id).await?;
        info!("Title: {}", metadata.title);

        FileManager::ensure_dir(&self.config.download_dir)?;
        let archive = client.download_source(&id, &self.config.download_dir).await?;

        let source_dir = self.config.download_dir.join(id.file_stem());
        FileManager::extract_tar_gz(
            &archive,
            &source_dir,
            Duration::from_secs(self.config.arxiv.timeout_secs.max(1)),
        ).await?;
        info!("Sources extracted to {:?}", source_dir);

        let summary = self.translate_sources(&source_dir, &metadata).await?;
        if summary.has_failures() {
            warn!("{}; see {:?}", summary.failure_summary(), source_dir.join(ISSUES_LOG_FILE));
        }

        let pdf = self.compile_paper(&source_dir, &id).await?;

        info!("Done in {}: {}", Self::format_duration(start_time.elapsed()), pdf.display());
        Ok(pdf)
    }

    /// Translate every `.tex` file under `source_dir` in place, with a progress bar
    pub async fn translate_sources(&self, source_dir: &Path, metadata: &PaperMetadata) -> Result<RewriteSummary> {
        let translation_start_time = Instant::now();
        let target_language = language_utils::resolve_language_name(&self.config.target_language)?;

        let service = match &self.provider {
            Some(provider) => TranslationService::with_provider(self.config.translation.clone(), provider.clone()),
            None => TranslationService::new(self.config.translation.clone())?,
        };

        info!("papertrans: {} - {} -> {}",
            service.provider_name(),
            self.config.translation.get_model(),
            target_language);

        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("#>-"));
        progress_bar.set_message("Translating");

        let log_capture = Arc::new(Mutex::new(Vec::new()));
        let pb = progress_bar.clone();

        let summary = DocumentRewriter::new(service)
            .rewrite_directory(
                source_dir,
                metadata,
                &target_language,
                log_capture.clone(),
                move |completed, total| {
                    pb.set_length(total as u64);
                    pb.set_position(completed as u64);
                },
            )
            .await?;

        progress_bar.finish_and_clear();

        let logs = log_capture.lock().clone();
        let error_logs = logs.iter().filter(|log| log.level == "ERROR").count();
        let warning_logs = logs.iter().filter(|log| log.level == "WARN").count();

        if error_logs > 0 || warning_logs > 0 {
            info!("Translation completed with {} errors and {} warnings.", error_logs, warning_logs);

            if log::max_level() >= log::LevelFilter::Debug {
                for log in &logs {
                    match log.level.as_str() {
                        "ERROR" => error!("{}", log.message),
                        "WARN" => warn!("{}", log.message),
                        _ => debug!("{}", log.message),
                    }
                }
            }

            let log_file_path = source_dir.join(ISSUES_LOG_FILE);
            let context = format!("{} - {} ({})",
                self.config.translation.provider.display_name(),
                self.config.translation.get_model(),
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

            if let Err(e) = self.write_logs_to_file(&logs, &log_file_path, &context) {
                warn!("Failed to write logs to file: {}", e);
            } else {
                info!("Logs written to {}", log_file_path.display());
            }
        }

        info!("Translated {} of {} chunk(s) in {} file(s) ({})",
            summary.chunks_translated,
            summary.chunks_total,
            summary.documents_rewritten,
            Self::format_duration(translation_start_time.elapsed()));

        if summary.token_usage.total_tokens > 0 {
            info!("{}", summary.token_usage.summary());
        }

        Ok(summary)
    }

    /// Compile the translated sources and move the PDF to `<output_dir>/<id>.pdf`
    pub async fn compile_paper(&self, source_dir: &Path, id: &ArxivId) -> Result<PathBuf> {
        let final_path = self.config.output_dir.join(format!("{}.pdf", id.file_stem()));
        let driver = CompilationDriver::from_config(&self.config);

        let outcome = driver.run(source_dir, &final_path)
            .await
            .with_context(|| format!("Failed to compile {}", id))?;

        debug!("Compiled {:?} in {} pass(es)", outcome.main_file, outcome.passes);
        Ok(outcome.artifact)
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Write translation logs to a log file
    fn write_logs_to_file(&self, logs: &[LogEntry], file_path: &Path, translation_context: &str) -> Result<()> {
        let mut log_content = String::new();

        log_content.push_str(&format!("Translation Log - {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
        log_content.push_str(&format!("Context: {}\n\n", translation_context));

        for entry in logs {
            log_content.push_str(&format!("[{}] {}\n", entry.level, entry.message));
        }

        FileManager::write_to_file(file_path, &log_content)?;

        Ok(())
    }
}
