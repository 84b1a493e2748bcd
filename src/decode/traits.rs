/*!
 * Decoder Traits
 * Architecture-agnostic instruction classification
 */

use super::types::{Domains, Outcome};

/// Instruction decoder backend
///
/// Classification must be total: garbage or truncated input yields
/// `Outcome::Failed`, never a panic.
pub trait InstructionDecoder: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Column domains this backend classifies into
    fn domains(&self) -> &Domains;

    /// Number of instruction bytes the sampler should capture
    fn max_insn_len(&self) -> usize;

    /// Classify the first instruction in `bytes`
    fn classify(&self, bytes: &[u8]) -> Outcome;
}
