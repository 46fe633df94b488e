/*!
 * Document rewriting.
 *
 * Turns every `.tex` file of an extracted source tree into translation jobs,
 * hands them to the batch translator in one flat set, then reassembles each
 * document from its chunks and writes it back in place. The untouched file is
 * kept next to it with the `.tex_original` extension.
 */

use anyhow::{Result, Context};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::arxiv::PaperMetadata;
use crate::file_utils::FileManager;
use crate::typesetting;

use super::batch::{BatchTranslator, TranslationJob, TranslationResult};
use super::chunker::{Chunk, Document, DocumentId};
use super::core::{LogEntry, TokenUsageStats, TranslationService};

/// Counts gathered while rewriting a source tree
#[derive(Debug, Clone, Default)]
pub struct RewriteSummary {
    /// `.tex` files found in the tree
    pub documents_found: usize,
    /// Files written back with translated content
    pub documents_rewritten: usize,
    /// Files left untouched because of an error
    pub documents_skipped: usize,
    /// Chunks dispatched for translation
    pub chunks_total: usize,
    /// Chunks that passed the fidelity gate
    pub chunks_translated: usize,
    /// Chunks that kept their original lines
    pub chunks_failed: usize,
    /// Token usage of all requests
    pub token_usage: TokenUsageStats,
}

impl RewriteSummary {
    /// Whether any chunk fell back to its original lines or any file was left untouched
    pub fn has_failures(&self) -> bool {
        self.chunks_failed > 0 || self.documents_skipped > 0
    }

    /// One-line description of what did not get translated
    pub fn failure_summary(&self) -> String {
        let mut parts = Vec::new();
        if self.chunks_failed > 0 {
            parts.push(format!(
                "{} of {} chunk(s) kept their original text",
                self.chunks_failed, self.chunks_total
            ));
        }
        if self.documents_skipped > 0 {
            parts.push(format!(
                "{} of {} file(s) were skipped",
                self.documents_skipped, self.documents_found
            ));
        }
        parts.join("; ")
    }
}

/// Rewrites the LaTeX documents of one paper
pub struct DocumentRewriter {
    batch: BatchTranslator,
    lines_per_chunk: usize,
    strip_comments: bool,
}

impl DocumentRewriter {
    /// Create a rewriter using the chunk size and pool width from the service configuration
    pub fn new(service: TranslationService) -> Self {
        let lines_per_chunk = service.config.common.lines_per_chunk.max(1);
        let strip_comments = service.config.common.strip_comments;
        Self {
            batch: BatchTranslator::new(service),
            lines_per_chunk,
            strip_comments,
        }
    }

    /// Override the number of lines per chunk
    pub fn with_lines_per_chunk(mut self, lines_per_chunk: usize) -> Self {
        self.lines_per_chunk = lines_per_chunk.max(1);
        self
    }

    /// Translate every `.tex` file under `directory` in place
    ///
    /// Per-chunk failures degrade to the original lines and are recorded in
    /// `log_capture`; only a failure to list the directory is returned as an error.
    pub async fn rewrite_directory(
        &self,
        directory: &Path,
        metadata: &PaperMetadata,
        target_language: &str,
        log_capture: Arc<Mutex<Vec<LogEntry>>>,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> Result<RewriteSummary> {
        let files = FileManager::find_tex_files(directory)
            .with_context(|| format!("Failed to list .tex files in {:?}", directory))?;

        let mut summary = RewriteSummary {
            documents_found: files.len(),
            ..RewriteSummary::default()
        };

        if files.is_empty() {
            warn!("No .tex files found in {:?}", directory);
            return Ok(summary);
        }
        info!("Found {} .tex file(s) to translate", files.len());

        let documents = self.load_documents(&files, &log_capture, &mut summary);

        let metadata = Arc::new(metadata.clone());
        let target_language: Arc<str> = Arc::from(target_language);
        let mut jobs = Vec::new();
        for document in &documents {
            for chunk in document.split_into_chunks(self.lines_per_chunk) {
                jobs.push(TranslationJob {
                    chunk,
                    metadata: metadata.clone(),
                    target_language: target_language.clone(),
                });
            }
        }
        summary.chunks_total = jobs.len();
        debug!("{} document(s) split into {} chunk(s)", documents.len(), jobs.len());

        let results = self.batch.run_all(jobs, log_capture.clone(), progress_callback).await;
        summary.token_usage = self.batch.token_usage(&results);
        summary.chunks_translated = results.iter().filter(|r| r.success).count();
        summary.chunks_failed = results.len() - summary.chunks_translated;

        let mut grouped = group_by_document(results);

        for document in documents {
            let id = document.id().clone();
            let chunks = grouped.remove(&id).unwrap_or_default();

            let rebuilt = match Document::from_chunks(id.clone(), chunks) {
                Ok(rebuilt) => rebuilt,
                Err(e) => {
                    record(&log_capture, "ERROR", format!("{}: could not reassemble: {}; file left untouched", id, e));
                    summary.documents_skipped += 1;
                    continue;
                }
            };

            if rebuilt.line_count() != document.line_count() {
                record(&log_capture, "ERROR", format!(
                    "{}: {} lines after reassembly, expected {}; file left untouched",
                    id, rebuilt.line_count(), document.line_count()
                ));
                summary.documents_skipped += 1;
                continue;
            }

            if let Err(e) = FileManager::write_atomic(id.path(), &rebuilt.to_text()) {
                record(&log_capture, "ERROR", format!("{}: write failed: {}", id, e));
                summary.documents_skipped += 1;
                continue;
            }

            debug!("Rewrote {}", id);
            summary.documents_rewritten += 1;
        }

        Ok(summary)
    }

    /// Read, snapshot and prepare each file; unreadable files are skipped
    fn load_documents(
        &self,
        files: &[PathBuf],
        log_capture: &Mutex<Vec<LogEntry>>,
        summary: &mut RewriteSummary,
    ) -> Vec<Document> {
        let mut documents = Vec::with_capacity(files.len());

        for path in files {
            let text = match FileManager::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    record(log_capture, "ERROR", format!("{:?}: {}; file left untouched", path, e));
                    summary.documents_skipped += 1;
                    continue;
                }
            };

            if let Err(e) = FileManager::snapshot_original(path) {
                record(log_capture, "ERROR", format!("{:?}: snapshot failed: {}; file left untouched", path, e));
                summary.documents_skipped += 1;
                continue;
            }

            let lines: Vec<String> = text.split_inclusive('\n').map(String::from).collect();
            let lines = typesetting::prepare_lines(lines, self.strip_comments);
            let document = Document::new(DocumentId::new(path.clone()), lines);

            if document.is_empty() {
                debug!("{} is empty, nothing to translate", document.id());
                continue;
            }

            documents.push(document);
        }

        documents
    }
}

fn group_by_document(results: Vec<TranslationResult>) -> HashMap<DocumentId, Vec<Chunk>> {
    let mut grouped: HashMap<DocumentId, Vec<Chunk>> = HashMap::new();
    for result in results {
        grouped.entry(result.document().clone()).or_default().push(result.chunk);
    }
    grouped
}

fn record(log_capture: &Mutex<Vec<LogEntry>>, level: &str, message: String) {
    warn!("{}", message);
    log_capture.lock().push(LogEntry::new(level, message));
}
