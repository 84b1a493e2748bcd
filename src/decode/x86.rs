/*!
 * x86-64 Decoder
 * Classification backed by iced-x86
 *
 * Mnemonics and extensions come straight from the decoder's own tables.
 * Categories are a coarse grouping derived from flow control, encoding
 * and CPUID features.
 */

use super::traits::InstructionDecoder;
use super::types::{Classification, Domains, GroupSet, Outcome};
use crate::core::limits::MAX_INSN_BYTES;
use iced_x86::{CpuidFeature, Decoder, DecoderOptions, EncodingKind, FlowControl, Mnemonic};

const BITNESS: u32 = 64;

/// Instruction categories reported for x86
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum X86Category {
    Base,
    CondBr,
    UncondBr,
    Call,
    Ret,
    Interrupt,
    System,
    X87,
    Mmx,
    Sse,
    Avx,
    Avx512,
    Amx,
    Xop,
    Amd3dnow,
}

impl X86Category {
    pub const NAMES: [&'static str; 15] = [
        "BASE",
        "COND_BR",
        "UNCOND_BR",
        "CALL",
        "RET",
        "INTERRUPT",
        "SYSTEM",
        "X87",
        "MMX",
        "SSE",
        "AVX",
        "AVX512",
        "AMX",
        "XOP",
        "AMD3DNOW",
    ];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// 64-bit mode x86 decoder
pub struct X86Decoder {
    domains: Domains,
}

impl X86Decoder {
    pub fn new() -> Self {
        let categories = X86Category::NAMES.iter().map(|s| s.to_string()).collect();
        let mnemonics = Mnemonic::values()
            .map(|m| format!("{:?}", m).to_lowercase())
            .collect();
        let extensions = CpuidFeature::values()
            .map(|f| format!("{:?}", f).to_uppercase())
            .collect();

        Self {
            domains: Domains::new(categories, mnemonics, extensions),
        }
    }
}

impl Default for X86Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionDecoder for X86Decoder {
    fn name(&self) -> &'static str {
        "x86"
    }

    fn domains(&self) -> &Domains {
        &self.domains
    }

    fn max_insn_len(&self) -> usize {
        MAX_INSN_BYTES
    }

    fn classify(&self, bytes: &[u8]) -> Outcome {
        let mut decoder = Decoder::new(BITNESS, bytes, DecoderOptions::NONE);
        if !decoder.can_decode() {
            return Outcome::Failed;
        }
        let instr = decoder.decode();
        if instr.is_invalid() {
            return Outcome::Failed;
        }

        let features = instr.cpuid_features();
        let mut categories = GroupSet::new();

        match instr.flow_control() {
            FlowControl::ConditionalBranch => categories.insert(X86Category::CondBr.index()),
            FlowControl::UnconditionalBranch | FlowControl::IndirectBranch => {
                categories.insert(X86Category::UncondBr.index())
            }
            FlowControl::Call | FlowControl::IndirectCall => {
                categories.insert(X86Category::Call.index())
            }
            FlowControl::Return => categories.insert(X86Category::Ret.index()),
            FlowControl::Interrupt => categories.insert(X86Category::Interrupt.index()),
            FlowControl::Exception | FlowControl::XbeginXabortXend => {
                categories.insert(X86Category::System.index())
            }
            FlowControl::Next => {}
        }

        if let Some(isa) = isa_category(instr.encoding(), features) {
            categories.insert(isa.index());
        }
        if categories.is_empty() {
            categories.insert(X86Category::Base.index());
        }

        Outcome::Decoded(Classification {
            mnemonic: instr.mnemonic() as usize,
            categories,
            extensions: features.iter().map(|&f| f as usize).collect(),
        })
    }
}

/// Vector / coprocessor category implied by encoding and CPUID features
fn isa_category(encoding: EncodingKind, features: &[CpuidFeature]) -> Option<X86Category> {
    let any = |pred: fn(&CpuidFeature) -> bool| features.iter().any(pred);

    match encoding {
        EncodingKind::EVEX | EncodingKind::MVEX => Some(X86Category::Avx512),
        EncodingKind::XOP => Some(X86Category::Xop),
        EncodingKind::D3NOW => Some(X86Category::Amd3dnow),
        EncodingKind::VEX
            if any(|f| {
                matches!(
                    f,
                    CpuidFeature::AMX_TILE
                        | CpuidFeature::AMX_INT8
                        | CpuidFeature::AMX_BF16
                        | CpuidFeature::AMX_FP16
                        | CpuidFeature::AMX_COMPLEX
                )
            }) =>
        {
            Some(X86Category::Amx)
        }
        // BMI and friends are VEX-encoded general-purpose instructions
        EncodingKind::VEX
            if any(|f| matches!(f, CpuidFeature::BMI1 | CpuidFeature::BMI2)) =>
        {
            None
        }
        EncodingKind::VEX => Some(X86Category::Avx),
        _ => {
            if any(|f| {
                matches!(
                    f,
                    CpuidFeature::FPU | CpuidFeature::FPU287 | CpuidFeature::FPU387
                )
            }) {
                Some(X86Category::X87)
            } else if any(|f| matches!(f, CpuidFeature::MMX)) {
                Some(X86Category::Mmx)
            } else if any(|f| {
                matches!(
                    f,
                    CpuidFeature::SSE
                        | CpuidFeature::SSE2
                        | CpuidFeature::SSE3
                        | CpuidFeature::SSSE3
                        | CpuidFeature::SSE4_1
                        | CpuidFeature::SSE4_2
                        | CpuidFeature::SSE4A
                )
            }) {
                Some(X86Category::Sse)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Dimension;

    fn classify(bytes: &[u8]) -> Classification {
        match X86Decoder::new().classify(bytes) {
            Outcome::Decoded(c) => c,
            Outcome::Failed => panic!("expected {:02x?} to decode", bytes),
        }
    }

    fn category_names(decoder: &X86Decoder, c: &Classification) -> Vec<String> {
        c.categories
            .iter()
            .map(|i| decoder.domains().name(Dimension::Category, i).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_add_is_base() {
        let decoder = X86Decoder::new();
        let c = classify(&[0x48, 0x01, 0xd8]);
        assert_eq!(decoder.domains().name(Dimension::Mnemonic, c.mnemonic), Some("add"));
        assert_eq!(category_names(&decoder, &c), vec!["BASE"]);
    }

    #[test]
    fn test_flow_control_categories() {
        let decoder = X86Decoder::new();
        assert_eq!(category_names(&decoder, &classify(&[0xc3])), vec!["RET"]);
        assert_eq!(
            category_names(&decoder, &classify(&[0xe8, 0, 0, 0, 0])),
            vec!["CALL"]
        );
        assert_eq!(category_names(&decoder, &classify(&[0x74, 0x00])), vec!["COND_BR"]);
    }

    #[test]
    fn test_vector_categories() {
        let decoder = X86Decoder::new();
        let sse = classify(&[0x0f, 0x58, 0xc1]);
        assert_eq!(category_names(&decoder, &sse), vec!["SSE"]);
        assert_eq!(decoder.domains().name(Dimension::Mnemonic, sse.mnemonic), Some("addps"));

        let avx = classify(&[0xc5, 0xf8, 0x58, 0xc1]);
        assert_eq!(category_names(&decoder, &avx), vec!["AVX"]);
        assert!(avx
            .extensions
            .iter()
            .any(|i| decoder.domains().name(Dimension::Extension, i) == Some("AVX")));
    }

    #[test]
    fn test_tile_instructions_are_amx_not_avx() {
        let decoder = X86Decoder::new();
        // tilerelease
        let amx = classify(&[0xc4, 0xe2, 0x78, 0x49, 0xc0]);
        assert_eq!(category_names(&decoder, &amx), vec!["AMX"]);
        assert_eq!(
            decoder.domains().name(Dimension::Mnemonic, amx.mnemonic),
            Some("tilerelease")
        );
    }

    #[test]
    fn test_truncated_and_garbage_fail() {
        let decoder = X86Decoder::new();
        assert_eq!(decoder.classify(&[]), Outcome::Failed);
        assert_eq!(decoder.classify(&[0xff]), Outcome::Failed);
        assert_eq!(decoder.classify(&[0xe8, 0x00]), Outcome::Failed);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut raw = [0xccu8; MAX_INSN_BYTES];
        raw[..3].copy_from_slice(&[0x48, 0x01, 0xd8]);
        let decoder = X86Decoder::new();
        let c = classify(&raw);
        assert_eq!(decoder.domains().name(Dimension::Mnemonic, c.mnemonic), Some("add"));
    }
}
