/*!
 * Decode Module
 * Instruction classification with swappable architecture backends
 */

pub mod aarch64;
pub mod classifier;
pub mod traits;
pub mod types;
pub mod x86;

// Re-export for convenience
pub use aarch64::Aarch64Decoder;
pub use classifier::SampleClassifier;
pub use traits::InstructionDecoder;
pub use types::{Classification, DecoderKind, Domains, GroupSet, Outcome};
pub use x86::X86Decoder;
