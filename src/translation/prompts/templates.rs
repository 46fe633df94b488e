/*!
 * Prompt templates for LaTeX paper translation.
 *
 * The user message is a JSON array of source lines (terminators removed) and
 * the service must answer with `{"translate": {"lines": [...]}}` holding
 * exactly one string per source line.
 */

use serde::{Deserialize, Serialize};

use crate::arxiv::PaperMetadata;
use crate::errors::TranslationError;

/// System prompt template for paper translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for LaTeX translation.
    pub const LATEX_TRANSLATOR: &'static str = r#"You are an expert translator of academic papers written in LaTeX. Translate the prose of the given lines into {target_language} using a formal, scholarly register.

## Paper
Title: {title}
Abstract: {abstract}

## Input
The user message is a JSON array of strings. Each string is exactly one line of a LaTeX source file.

## Fidelity Rules
- Keep every control sequence, environment name and option exactly as written (\section, \begin, \end, \cite, \ref, \label, TikZ keys).
- Keep citation keys, reference keys and labels unchanged.
- Keep URLs, DOIs and file paths unchanged.
- Keep math (inline and display) and code verbatim.
- Keep author names and other personal names in their original form.
- Keep the brace balance of every line: never add or remove { or }.
- Keep comment markers (%) where they are and never merge a comment into another line.
- Return exactly as many lines as you received, in the same order. A line that needs no translation (empty, markup only, a single character) is returned unchanged.
- Never add or remove line breaks. No returned string may contain a newline.
{guard_rule}
## Output
Return ONLY a JSON object of the form {"translate": {"lines": ["...", "..."]}} with one string per input line. Do not add explanations."#;

    /// Extra rule appended when backslashes are guarded.
    pub const GUARD_RULE: &'static str = "- The token {guard_token} stands for a backslash. Copy every {guard_token} exactly where it appears and never write a bare backslash instead.\n";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default LaTeX translator template.
    pub fn latex_translator() -> Self {
        Self::new(Self::LATEX_TRANSLATOR)
    }

    /// Render the template with the given variables.
    pub fn render(&self, target_language: &str, metadata: &PaperMetadata, guard_token: Option<&str>) -> String {
        let guard_rule = guard_token
            .map(|token| Self::GUARD_RULE.replace("{guard_token}", token))
            .unwrap_or_default();

        self.template
            .replace("{target_language}", target_language)
            .replace("{title}", or_unknown(&metadata.title))
            .replace("{abstract}", or_unknown(&metadata.abstract_text))
            .replace("{guard_rule}", &guard_rule)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::latex_translator()
    }
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() { "(not available)" } else { value }
}

/// Builder for the system and user messages of one chunk request.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder<'a> {
    /// Target language name
    target_language: &'a str,
    /// Paper context
    metadata: &'a PaperMetadata,
    /// Guard token explained to the service, if lines are guarded
    guard_token: Option<&'a str>,
    /// Lines to translate
    lines: &'a [String],
}

impl<'a> TranslationPromptBuilder<'a> {
    /// Create a new prompt builder for the given lines.
    pub fn new(target_language: &'a str, metadata: &'a PaperMetadata, lines: &'a [String]) -> Self {
        Self {
            target_language,
            metadata,
            guard_token: None,
            lines,
        }
    }

    /// Mention the guard token in the instructions.
    pub fn with_guard_token(mut self, token: &'a str) -> Self {
        self.guard_token = Some(token);
        self
    }

    /// Build the system prompt.
    pub fn build_system_prompt(&self) -> String {
        PromptTemplate::latex_translator().render(self.target_language, self.metadata, self.guard_token)
    }

    /// Build the user message as a JSON array of lines.
    pub fn build_user_prompt(&self) -> String {
        serde_json::to_string(self.lines).unwrap_or_else(|_| "[]".to_string())
    }

    /// Build both system and user prompts.
    pub fn build(&self) -> (String, String) {
        (self.build_system_prompt(), self.build_user_prompt())
    }
}

/// Expected response structure from the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResponse {
    /// Wrapped line list
    pub translate: TranslatedLines,
}

/// The translated lines of one chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedLines {
    /// One string per source line
    pub lines: Vec<String>,
}

/// Parse the service answer into its line list
///
/// Accepts the wrapped form, a bare `{"lines": [...]}` object, and either
/// one inside a Markdown code fence.
pub fn parse_translation_response(text: &str) -> Result<Vec<String>, TranslationError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(TranslationError::MalformedResponse("empty response".to_string()));
    }

    if let Ok(response) = serde_json::from_str::<TranslationResponse>(body) {
        return Ok(response.translate.lines);
    }

    serde_json::from_str::<TranslatedLines>(body)
        .map(|lines| lines.lines)
        .map_err(|e| {
            let preview: String = body.chars().take(120).collect();
            TranslationError::MalformedResponse(format!("{} (response starts with {:?})", e, preview))
        })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an info string such as "json"
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
