/*!
 * Language utilities for target-language handling.
 *
 * The translation prompt wants a human-readable language name ("Korean"),
 * while users often type an ISO 639-1 or ISO 639-2 code. These helpers
 * accept either form and resolve it through `isolang`.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }

        if let Some((_, part2t)) = PART2B_TO_PART2T.iter().find(|(b, _)| *b == normalized_code) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Look up a language by its English name, ignoring case
fn language_from_name(name: &str) -> Option<Language> {
    let trimmed = name.trim();
    if let Some(lang) = Language::from_name(trimmed) {
        return Some(lang);
    }

    // "korean" -> "Korean"
    let mut chars = trimmed.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => return None,
    };
    Language::from_name(&capitalized)
}

/// Look up a language by ISO 639-1 or 639-2 code
fn language_from_code(code: &str) -> Option<Language> {
    let trimmed = code.trim();
    if !(2..=3).contains(&trimmed.len()) || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let normalized = normalize_to_part2t(trimmed).ok()?;
    Language::from_639_3(&normalized)
}

/// Codes win over names: "ko" is Korean, not the language named "Ko"
fn lookup_language(input: &str) -> Option<Language> {
    language_from_code(input).or_else(|| language_from_name(input))
}

/// Resolve a target language given as a code or an English name
///
/// Returns the English language name used in prompts and log messages.
pub fn resolve_language_name(input: &str) -> Result<String> {
    if input.trim().is_empty() {
        return Err(anyhow!("Target language must not be empty"));
    }

    lookup_language(input)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Unknown target language: {}", input))
}

/// ISO 639-1 code for a language given as a code or an English name
pub fn language_part1(input: &str) -> Option<&'static str> {
    lookup_language(input).and_then(|lang| lang.to_639_1())
}

/// Whether the language is typeset with CJK font machinery
pub fn is_cjk_language(input: &str) -> bool {
    matches!(language_part1(input), Some("ko" | "ja" | "zh"))
}
