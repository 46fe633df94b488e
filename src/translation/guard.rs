/*!
 * Markup guard for the remote transformation boundary.
 *
 * Every backslash (the control-sequence introducer) is replaced with a plain
 * token before text leaves the process, and the token is turned back into a
 * backslash when the response returns. `restore(protect(x)) == x` holds for
 * any `x` that does not already contain the token; callers check this with
 * `can_protect` and send such text unguarded.
 */

/// Token standing in for a backslash while text is outside the process
pub const GUARD_TOKEN: &str = "<<BS>>";

const CONTROL_INTRODUCER: char = '\\';

/// Protects control sequences from lenient handling by the remote service
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupGuard;

impl MarkupGuard {
    /// Create a guard
    pub fn new() -> Self {
        Self
    }

    /// Token used by this guard
    pub fn token(&self) -> &'static str {
        GUARD_TOKEN
    }

    /// Whether `text` can be protected without ambiguity
    pub fn can_protect(&self, text: &str) -> bool {
        !text.contains(GUARD_TOKEN)
    }

    /// Replace every control introducer with the guard token
    pub fn protect(&self, text: &str) -> String {
        text.replace(CONTROL_INTRODUCER, GUARD_TOKEN)
    }

    /// Replace every guard token with the control introducer
    pub fn restore(&self, text: &str) -> String {
        text.replace(GUARD_TOKEN, "\\")
    }

    /// Whether every line of a chunk can be protected
    pub fn can_protect_all(&self, lines: &[String]) -> bool {
        lines.iter().all(|line| self.can_protect(line))
    }
}
