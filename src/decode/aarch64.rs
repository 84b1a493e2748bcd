/*!
 * AArch64 Decoder
 * Table-driven classification of fixed-width A64 instructions
 *
 * Categories follow the top-level encoding groups (op0, bits 28:25);
 * branches additionally carry a control-flow category. Mnemonics are
 * matched against a mask/value table of common opcodes, anything else in
 * an allocated group is reported as `other`.
 */

use super::traits::InstructionDecoder;
use super::types::{Classification, Domains, GroupSet, Outcome};
use crate::core::limits::AARCH64_INSN_BYTES;

/// Instruction categories reported for AArch64
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum A64Category {
    DpImm,
    Branch,
    LoadStore,
    DpReg,
    SimdFp,
    System,
    Exception,
    Sve,
    CondBr,
    Call,
    Ret,
}

impl A64Category {
    pub const NAMES: [&'static str; 11] = [
        "DP_IMM",
        "BRANCH",
        "LOAD_STORE",
        "DP_REG",
        "SIMD_FP",
        "SYSTEM",
        "EXCEPTION",
        "SVE",
        "COND_BR",
        "CALL",
        "RET",
    ];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }
}

const EXT_ASIMD_FP: usize = 0;
const EXT_SVE: usize = 1;
const EXTENSION_NAMES: [&str; 2] = ["ASIMD_FP", "SVE"];

/// (mask, value, mnemonic); first match wins
const MNEMONIC_TABLE: &[(u32, u32, &str)] = &[
    // System and exception generation
    (0xFFFF_FFFF, 0xD503_201F, "nop"),
    (0xFFFF_F0FF, 0xD503_30BF, "dmb"),
    (0xFFFF_F0FF, 0xD503_309F, "dsb"),
    (0xFFFF_F0FF, 0xD503_30DF, "isb"),
    (0xFFF0_0000, 0xD530_0000, "mrs"),
    (0xFFF0_0000, 0xD510_0000, "msr"),
    (0xFFE0_001F, 0xD400_0001, "svc"),
    (0xFFE0_001F, 0xD420_0000, "brk"),
    // Branches
    (0xFFFF_FC1F, 0xD65F_0000, "ret"),
    (0xFFFF_FC1F, 0xD61F_0000, "br"),
    (0xFFFF_FC1F, 0xD63F_0000, "blr"),
    (0xFC00_0000, 0x1400_0000, "b"),
    (0xFC00_0000, 0x9400_0000, "bl"),
    (0xFF00_0010, 0x5400_0000, "b.cond"),
    (0x7F00_0000, 0x3400_0000, "cbz"),
    (0x7F00_0000, 0x3500_0000, "cbnz"),
    (0x7F00_0000, 0x3600_0000, "tbz"),
    (0x7F00_0000, 0x3700_0000, "tbnz"),
    // Data processing, immediate
    (0x7F80_0000, 0x1100_0000, "add"),
    (0x7F80_0000, 0x3100_0000, "adds"),
    (0x7F80_0000, 0x5100_0000, "sub"),
    (0x7F80_0000, 0x7100_0000, "subs"),
    (0x7F80_0000, 0x5280_0000, "movz"),
    (0x7F80_0000, 0x7280_0000, "movk"),
    (0x7F80_0000, 0x1280_0000, "movn"),
    (0x7F80_0000, 0x1200_0000, "and"),
    (0x7F80_0000, 0x3200_0000, "orr"),
    (0x7F80_0000, 0x5200_0000, "eor"),
    (0x7F80_0000, 0x7200_0000, "ands"),
    (0x9F00_0000, 0x1000_0000, "adr"),
    (0x9F00_0000, 0x9000_0000, "adrp"),
    // Data processing, register
    (0x7F20_0000, 0x0B00_0000, "add"),
    (0x7F20_0000, 0x2B00_0000, "adds"),
    (0x7F20_0000, 0x4B00_0000, "sub"),
    (0x7F20_0000, 0x6B00_0000, "subs"),
    (0x7F20_0000, 0x0A00_0000, "and"),
    (0x7F20_0000, 0x2A00_0000, "orr"),
    (0x7F20_0000, 0x4A00_0000, "eor"),
    (0x7F20_0000, 0x6A00_0000, "ands"),
    (0x7FE0_8000, 0x1B00_0000, "madd"),
    (0x7FE0_8000, 0x1B00_8000, "msub"),
    (0x7FE0_FC00, 0x1AC0_0800, "udiv"),
    (0x7FE0_FC00, 0x1AC0_0C00, "sdiv"),
    (0x7FE0_0C00, 0x1A80_0000, "csel"),
    // Loads and stores
    (0xBFC0_0000, 0xB940_0000, "ldr"),
    (0xBFC0_0000, 0xB900_0000, "str"),
    (0xFFC0_0000, 0x3940_0000, "ldrb"),
    (0xFFC0_0000, 0x3900_0000, "strb"),
    (0x7FC0_0000, 0x2900_0000, "stp"),
    (0x7FC0_0000, 0x2980_0000, "stp"),
    (0x7FC0_0000, 0x2880_0000, "stp"),
    (0x7FC0_0000, 0x2940_0000, "ldp"),
    (0x7FC0_0000, 0x29C0_0000, "ldp"),
    (0x7FC0_0000, 0x28C0_0000, "ldp"),
    // Scalar floating point
    (0xFF20_FC00, 0x1E20_2800, "fadd"),
    (0xFF20_FC00, 0x1E20_3800, "fsub"),
    (0xFF20_FC00, 0x1E20_0800, "fmul"),
    (0xFF20_FC00, 0x1E20_1800, "fdiv"),
];

const OTHER_MNEMONIC: &str = "other";

/// A64 decoder
pub struct Aarch64Decoder {
    domains: Domains,
    /// Mnemonic domain index for each table row
    table_index: Vec<usize>,
    other_index: usize,
}

impl Aarch64Decoder {
    pub fn new() -> Self {
        let mut mnemonics: Vec<String> = Vec::new();
        let mut table_index = Vec::with_capacity(MNEMONIC_TABLE.len());
        for &(_, _, name) in MNEMONIC_TABLE {
            let index = match mnemonics.iter().position(|m| m == name) {
                Some(index) => index,
                None => {
                    mnemonics.push(name.to_string());
                    mnemonics.len() - 1
                }
            };
            table_index.push(index);
        }
        let other_index = mnemonics.len();
        mnemonics.push(OTHER_MNEMONIC.to_string());

        let categories = A64Category::NAMES.iter().map(|s| s.to_string()).collect();
        let extensions = EXTENSION_NAMES.iter().map(|s| s.to_string()).collect();

        Self {
            domains: Domains::new(categories, mnemonics, extensions),
            table_index,
            other_index,
        }
    }

    fn mnemonic(&self, word: u32) -> usize {
        MNEMONIC_TABLE
            .iter()
            .position(|&(mask, value, _)| word & mask == value)
            .map(|row| self.table_index[row])
            .unwrap_or(self.other_index)
    }
}

impl Default for Aarch64Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level encoding group, `None` for unallocated space
fn group(word: u32) -> Option<A64Category> {
    let op0 = (word >> 25) & 0xF;
    match op0 {
        0b0010 => Some(A64Category::Sve),
        0b1000 | 0b1001 => Some(A64Category::DpImm),
        0b1010 | 0b1011 => {
            if word & 0xFF00_0000 == 0xD400_0000 {
                Some(A64Category::Exception)
            } else if word & 0xFFC0_0000 == 0xD500_0000 {
                Some(A64Category::System)
            } else {
                Some(A64Category::Branch)
            }
        }
        0b0100 | 0b0110 | 0b1100 | 0b1110 => Some(A64Category::LoadStore),
        0b0101 | 0b1101 => Some(A64Category::DpReg),
        0b0111 | 0b1111 => Some(A64Category::SimdFp),
        _ => None,
    }
}

/// Control-flow refinement for the branch group
fn branch_kind(word: u32) -> Option<A64Category> {
    if word & 0xFC00_0000 == 0x9400_0000 || word & 0xFFFF_FC1F == 0xD63F_0000 {
        Some(A64Category::Call)
    } else if word & 0xFFFF_FC1F == 0xD65F_0000 {
        Some(A64Category::Ret)
    } else if word & 0xFF00_0010 == 0x5400_0000 || word & 0x7E00_0000 == 0x3400_0000 || word & 0x7E00_0000 == 0x3600_0000 {
        Some(A64Category::CondBr)
    } else {
        None
    }
}

impl InstructionDecoder for Aarch64Decoder {
    fn name(&self) -> &'static str {
        "aarch64"
    }

    fn domains(&self) -> &Domains {
        &self.domains
    }

    fn max_insn_len(&self) -> usize {
        AARCH64_INSN_BYTES
    }

    fn classify(&self, bytes: &[u8]) -> Outcome {
        let Some(raw) = bytes.get(..AARCH64_INSN_BYTES) else {
            return Outcome::Failed;
        };
        let word = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);

        let Some(group) = group(word) else {
            return Outcome::Failed;
        };

        let mut categories = GroupSet::new();
        categories.insert(group.index());
        if group == A64Category::Branch {
            if let Some(kind) = branch_kind(word) {
                categories.insert(kind.index());
            }
        }

        let mut extensions = GroupSet::new();
        match group {
            A64Category::SimdFp => extensions.insert(EXT_ASIMD_FP),
            A64Category::Sve => extensions.insert(EXT_SVE),
            _ => {}
        }

        Outcome::Decoded(Classification {
            mnemonic: self.mnemonic(word),
            categories,
            extensions,
        })
    }
}
