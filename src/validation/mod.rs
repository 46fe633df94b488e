/*!
 * Validation of translated chunks.
 *
 * - `fidelity`: line count, inserted line breaks and brace balance checks
 *   that decide whether a translated chunk may replace its source
 */

pub mod fidelity;

// Re-export main types
pub use fidelity::FidelityChecker;
