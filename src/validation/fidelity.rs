/*!
 * Structural fidelity checks for translated chunks.
 *
 * A translated chunk is only accepted when it can replace its source chunk
 * line for line:
 * - the number of lines is unchanged
 * - no returned line contains a line break of its own
 * - optionally, every line keeps the net brace depth of its source line
 */

use log::debug;

use crate::errors::TranslationError;

/// Validates a translated chunk against its source lines
#[derive(Debug, Clone, Copy, Default)]
pub struct FidelityChecker {
    /// Also compare brace balance line by line
    check_brace_balance: bool,
}

impl FidelityChecker {
    /// Create a checker
    pub fn new(check_brace_balance: bool) -> Self {
        Self { check_brace_balance }
    }

    /// Verify translated lines against source lines (both without terminators)
    pub fn verify(&self, source: &[String], translated: &[String]) -> Result<(), TranslationError> {
        if source.len() != translated.len() {
            debug!("Fidelity gate: expected {} lines, got {}", source.len(), translated.len());
            return Err(TranslationError::LineCountMismatch {
                expected: source.len(),
                actual: translated.len(),
            });
        }

        for (line, (original, candidate)) in source.iter().zip(translated).enumerate() {
            if contains_line_break(candidate) && !contains_line_break(original) {
                return Err(TranslationError::LineBreakInserted { line });
            }

            if self.check_brace_balance {
                let expected = brace_balance(original);
                let actual = brace_balance(candidate);
                if expected != actual {
                    return Err(TranslationError::BraceImbalance { line, expected, actual });
                }
            }
        }

        Ok(())
    }
}

fn contains_line_break(text: &str) -> bool {
    text.contains('\n') || text.contains('\r')
}

/// Net depth change of unescaped braces, ignoring anything after a comment marker
pub fn brace_balance(line: &str) -> i64 {
    let mut depth = 0i64;
    let mut escaped = false;

    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '%' => break,
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }

    depth
}
