/*!
 * Translation of LaTeX sources through a text-transformation service.
 *
 * This module contains the core functionality for translating paper sources
 * chunk by chunk. It is split into several submodules:
 *
 * - `chunker`: Documents, chunks and their reassembly
 * - `guard`: Reversible substitution of the LaTeX escape character
 * - `prompts`: Prompt templates and response parsing
 * - `core`: Per-chunk translation with retries and the fidelity gate
 * - `batch`: Bounded worker pool over all chunks of a paper
 * - `rewriter`: Reading, translating and writing back a source tree
 */

// Re-export main types for easier usage
pub use self::batch::{BatchTranslator, TranslationJob, TranslationResult};
pub use self::chunker::{Chunk, Document, DocumentId};
pub use self::core::{LogEntry, TokenUsageStats, TranslationService};
pub use self::guard::MarkupGuard;
pub use self::rewriter::{DocumentRewriter, RewriteSummary};

// Re-export prompt types
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};

// Submodules
pub mod batch;
pub mod chunker;
pub mod core;
pub mod guard;
pub mod prompts;
pub mod rewriter;
