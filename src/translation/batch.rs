/*!
 * Parallel dispatch of chunk translations.
 *
 * Jobs are pushed onto a queue drained by a fixed number of worker tasks.
 * Each worker emits a `TranslationResult` onto a results channel as soon as
 * its job finishes, so results arrive in completion order. Every result
 * carries its chunk's document and index, and the caller restores the order
 * when reassembling. A job that fails after all retries yields a result with
 * the chunk's original lines and `success == false`; it never stops its
 * siblings.
 */

use log::{debug, error, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

use crate::arxiv::PaperMetadata;

use super::chunker::{Chunk, DocumentId};
use super::core::{LogEntry, TokenUsageStats, TranslationService};

/// The unit of work submitted to the dispatcher
#[derive(Debug, Clone)]
pub struct TranslationJob {
    /// Chunk to translate (document identity, index and lines)
    pub chunk: Chunk,
    /// Paper context shared by every job of a run
    pub metadata: Arc<PaperMetadata>,
    /// Human-readable target language
    pub target_language: Arc<str>,
}

/// Outcome of one job
#[derive(Debug, Clone)]
pub struct TranslationResult {
    /// Chunk holding either the translated lines or the original lines
    pub chunk: Chunk,
    /// Whether the lines are a verified translation
    pub success: bool,
    /// Attempts made for this chunk
    pub attempts: u32,
    /// Prompt tokens reported for the accepted attempt
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported for the accepted attempt
    pub completion_tokens: Option<u64>,
    /// Time spent in the accepted request
    pub api_duration: Duration,
}

impl TranslationResult {
    /// Result carrying the job's original lines
    pub fn fallback(job: TranslationJob, attempts: u32) -> Self {
        Self {
            chunk: job.chunk,
            success: false,
            attempts,
            prompt_tokens: None,
            completion_tokens: None,
            api_duration: Duration::ZERO,
        }
    }

    /// Document the result belongs to
    pub fn document(&self) -> &DocumentId {
        self.chunk.document()
    }

    /// Chunk index within the document
    pub fn index(&self) -> usize {
        self.chunk.index()
    }
}

/// Batch translator running jobs on a bounded worker pool
pub struct BatchTranslator {
    /// The translation service to use
    service: TranslationService,

    /// Maximum number of concurrent requests
    max_concurrent_requests: usize,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(service: TranslationService) -> Self {
        Self {
            max_concurrent_requests: service.config.common.concurrent_requests.max(1),
            service,
        }
    }

    /// Override the worker pool width
    pub fn with_concurrency(mut self, max_concurrent_requests: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests.max(1);
        self
    }

    /// Run every job and return one result per job, in completion order
    ///
    /// `progress_callback(completed, total)` is called once per finished job
    /// with a strictly increasing `completed` count.
    pub async fn run_all(
        &self,
        jobs: Vec<TranslationJob>,
        log_capture: Arc<Mutex<Vec<LogEntry>>>,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> Vec<TranslationResult> {
        let total_jobs = jobs.len();
        if total_jobs == 0 {
            return Vec::new();
        }

        let (job_tx, job_rx) = mpsc::unbounded_channel::<TranslationJob>();
        for job in jobs {
            // The receiver is alive until the workers finish
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let job_rx = Arc::new(AsyncMutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<TranslationResult>();
        let completed = Arc::new(AtomicUsize::new(0));

        let worker_count = self.max_concurrent_requests.min(total_jobs);
        debug!("Dispatching {} jobs to {} workers", total_jobs, worker_count);

        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let service = self.service.clone();
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let completed = completed.clone();
            let log_capture = log_capture.clone();
            let progress_callback = progress_callback.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    let next = job_rx.lock().await.recv().await;
                    let Some(job) = next else { break };

                    let result = translate_job(&service, job, &log_capture).await;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!("Translation progress: {}/{} ({:.1}%)", done, total_jobs, done as f64 * 100.0 / total_jobs as f64);
                    progress_callback(done, total_jobs);

                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        // Barrier: the channel closes once every worker has exited
        let mut results = Vec::with_capacity(total_jobs);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }

        for outcome in futures::future::join_all(workers).await {
            if let Err(e) = outcome {
                error!("Translation worker terminated abnormally: {}", e);
            }
        }

        if results.len() != total_jobs {
            warn!("Collected {} results for {} jobs", results.len(), total_jobs);
        }

        results
    }

    /// Sum the token usage reported by a set of results
    pub fn token_usage(&self, results: &[TranslationResult]) -> TokenUsageStats {
        let mut stats = TokenUsageStats::with_provider_info(
            self.service.provider_name().to_string(),
            self.service.config.get_model(),
        );
        for result in results {
            stats.add_token_usage(result.prompt_tokens, result.completion_tokens);
            stats.add_api_duration(result.api_duration);
        }
        stats
    }
}

/// Translate one job, substituting the original lines on failure
async fn translate_job(
    service: &TranslationService,
    job: TranslationJob,
    log_capture: &Mutex<Vec<LogEntry>>,
) -> TranslationResult {
    let outcome = service.translate_chunk(job.chunk.lines(), &job.metadata, &job.target_language).await;

    match outcome {
        Ok(translation) => {
            let attempts = translation.attempts;
            let prompt_tokens = translation.prompt_tokens;
            let completion_tokens = translation.completion_tokens;
            let api_duration = translation.api_duration;
            let document = job.chunk.document().clone();
            let index = job.chunk.index();

            match job.chunk.clone().with_lines(translation.lines) {
                Ok(chunk) => TranslationResult {
                    chunk,
                    success: true,
                    attempts,
                    prompt_tokens,
                    completion_tokens,
                    api_duration,
                },
                Err(e) => {
                    log_capture.lock().push(LogEntry::new(
                        "ERROR",
                        format!("{} chunk {}: {}; keeping original lines", document, index, e),
                    ));
                    TranslationResult::fallback(job, attempts)
                },
            }
        },
        Err(e) => {
            let attempts = match &e {
                crate::errors::TranslationError::RetriesExhausted { attempts, .. } => *attempts,
                _ => 1,
            };
            log_capture.lock().push(LogEntry::new(
                "ERROR",
                format!(
                    "{} chunk {} ({} lines): {}; keeping original lines",
                    job.chunk.document(), job.chunk.index(), job.chunk.line_count(), e
                ),
            ));
            TranslationResult::fallback(job, attempts)
        },
    }
}
