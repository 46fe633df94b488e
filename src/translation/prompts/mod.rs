/*!
 * Prompt engineering for LaTeX translation.
 *
 * This module provides:
 * - The system prompt carrying paper context and fidelity rules
 * - The JSON line-array user message
 * - Parsing of the structured response
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptTemplate, TranslationPromptBuilder, parse_translation_response};
