/*!
 * # papertrans - arXiv paper translator
 *
 * A Rust library that translates the LaTeX sources of an arXiv paper with an
 * LLM and recompiles them into a PDF in the target language.
 *
 * ## Features
 *
 * - Resolve a paper from its identifier or any arXiv URL
 * - Fetch the title and abstract used as translation context
 * - Download and unpack the source archive
 * - Translate every `.tex` file line by line using various AI providers:
 *   - OpenAI API
 *   - Anthropic API
 *   - Ollama (local LLM)
 *   - LM Studio (OpenAI-compatible local server)
 * - Keep the LaTeX markup intact and fall back to the original text per chunk
 * - Inject fonts for the target script and compile with XeLaTeX
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `arxiv`: Identifier parsing, metadata feed and source download
 * - `translation`: AI-powered translation services:
 *   - `translation::chunker`: Documents and line chunks
 *   - `translation::guard`: Escape character protection
 *   - `translation::core`: Per-chunk translation with retries
 *   - `translation::batch`: Parallel dispatch of chunks
 *   - `translation::rewriter`: In-place rewriting of a source tree
 * - `validation`: Fidelity checks on translated lines
 * - `typesetting`: Line-level LaTeX edits (CJK cleanup, font setup)
 * - `compiler`: Main file selection and compiler invocation
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod arxiv;
pub mod compiler;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;
pub mod typesetting;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use arxiv::{ArxivId, PaperMetadata, extract_arxiv_id};
pub use translation::TranslationService;
pub use language_utils::{normalize_to_part2t, get_language_name};
pub use errors::{AppError, CompileError, FetchError, ProviderError, TranslationError};
