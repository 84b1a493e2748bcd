/*!
 * Sample Classifier
 * Turns captured instruction bytes into a counted outcome
 */

use super::aarch64::Aarch64Decoder;
use super::traits::InstructionDecoder;
use super::types::{DecoderKind, Domains, Outcome};
use super::x86::X86Decoder;
use std::sync::Arc;
use tracing::{info, trace};

/// Shared, stateless front end over the selected decoder backend
#[derive(Clone)]
pub struct SampleClassifier {
    decoder: Arc<dyn InstructionDecoder>,
}

impl SampleClassifier {
    /// Build the classifier for a backend chosen at startup
    pub fn new(kind: DecoderKind) -> Self {
        let decoder: Arc<dyn InstructionDecoder> = match kind {
            DecoderKind::X86 => Arc::new(X86Decoder::new()),
            DecoderKind::Aarch64 => Arc::new(Aarch64Decoder::new()),
        };
        info!(
            decoder = decoder.name(),
            max_insn_len = decoder.max_insn_len(),
            "instruction decoder ready"
        );
        Self { decoder }
    }

    /// Wrap an existing backend
    pub fn with_decoder(decoder: Arc<dyn InstructionDecoder>) -> Self {
        Self { decoder }
    }

    #[inline]
    pub fn domains(&self) -> &Domains {
        self.decoder.domains()
    }

    #[inline]
    pub fn max_insn_len(&self) -> usize {
        self.decoder.max_insn_len()
    }

    /// Classify at most `max_insn_len()` bytes of a sample
    ///
    /// Never fails: undecodable bytes come back as `Outcome::Failed`.
    #[inline]
    pub fn classify(&self, bytes: &[u8]) -> Outcome {
        let len = bytes.len().min(self.decoder.max_insn_len());
        let outcome = self.decoder.classify(&bytes[..len]);
        if outcome.is_failed() {
            trace!(bytes = ?&bytes[..len], "decode failed");
        }
        outcome
    }
}

impl std::fmt::Debug for SampleClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleClassifier")
            .field("decoder", &self.decoder.name())
            .finish()
    }
}
