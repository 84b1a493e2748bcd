/*!
 * Decoder Types
 * Classification outcomes and the fixed column domains they index
 */

use crate::core::limits::MAX_GROUPS_PER_INSN;
use crate::core::types::Dimension;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inline set of domain indices (categories or extensions of one instruction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupSet {
    items: [u16; MAX_GROUPS_PER_INSN],
    len: u8,
}

impl GroupSet {
    pub const fn new() -> Self {
        Self {
            items: [0; MAX_GROUPS_PER_INSN],
            len: 0,
        }
    }

    /// Insert an index, ignoring duplicates and anything past capacity
    pub fn insert(&mut self, index: usize) {
        let index = index as u16;
        if self.contains(index as usize) || self.len as usize >= MAX_GROUPS_PER_INSN {
            return;
        }
        self.items[self.len as usize] = index;
        self.len += 1;
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.as_slice().iter().any(|&i| i as usize == index)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.items[..self.len as usize]
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.as_slice().iter().map(|&i| i as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromIterator<usize> for GroupSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = GroupSet::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

/// A successfully decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Index into the mnemonic domain
    pub mnemonic: usize,
    /// Indices into the category domain (at least one)
    pub categories: GroupSet,
    /// Indices into the extension domain (possibly none)
    pub extensions: GroupSet,
}

impl Classification {
    /// Column indices this instruction contributes to in `dimension`
    pub fn indices(&self, dimension: Dimension) -> impl Iterator<Item = usize> + '_ {
        let (single, set) = match dimension {
            Dimension::Mnemonic => (Some(self.mnemonic), None),
            Dimension::Category => (None, Some(&self.categories)),
            Dimension::Extension => (None, Some(&self.extensions)),
        };
        single
            .into_iter()
            .chain(set.into_iter().flat_map(|s| s.iter()))
    }
}

/// Result of classifying one raw sample
///
/// `Failed` is data, not an error: it feeds the failure percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Decoded(Classification),
    Failed,
}

impl Outcome {
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed)
    }
}

/// Named column tables for each dimension, immutable after startup
#[derive(Debug, Clone, Default)]
pub struct Domains {
    names: [Vec<String>; 3],
    lookup: [AHashMap<String, usize>; 3],
}

impl Domains {
    pub fn new(categories: Vec<String>, mnemonics: Vec<String>, extensions: Vec<String>) -> Self {
        let mut names: [Vec<String>; 3] = Default::default();
        names[Dimension::Category.index()] = categories;
        names[Dimension::Mnemonic.index()] = mnemonics;
        names[Dimension::Extension.index()] = extensions;

        let lookup = [0, 1, 2].map(|dim| {
            names[dim]
                .iter()
                .enumerate()
                .map(|(index, name)| (name.clone(), index))
                .collect::<AHashMap<_, _>>()
        });

        Self { names, lookup }
    }

    /// Number of entries in a dimension
    #[inline]
    pub fn len(&self, dimension: Dimension) -> usize {
        self.names[dimension.index()].len()
    }

    #[inline]
    pub fn names(&self, dimension: Dimension) -> &[String] {
        &self.names[dimension.index()]
    }

    pub fn name(&self, dimension: Dimension, index: usize) -> Option<&str> {
        self.names[dimension.index()].get(index).map(String::as_str)
    }

    pub fn index_of(&self, dimension: Dimension, name: &str) -> Option<usize> {
        self.lookup[dimension.index()].get(name).copied()
    }

    /// Resolve a user column filter to domain indices
    ///
    /// The name is case-normalized for the dimension. An exact match selects
    /// one column; otherwise every column starting with the name is selected.
    /// An empty result means the filter matched nothing.
    pub fn resolve_filter(&self, dimension: Dimension, filter: &str) -> Vec<usize> {
        let wanted = dimension.normalize(filter);
        if let Some(index) = self.index_of(dimension, &wanted) {
            return vec![index];
        }
        self.names(dimension)
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(&wanted))
            .map(|(index, _)| index)
            .collect()
    }
}

/// Decoder backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderKind {
    X86,
    Aarch64,
}

impl DecoderKind {
    /// Backend matching the architecture this binary was built for
    pub const fn host() -> Self {
        if cfg!(target_arch = "aarch64") {
            DecoderKind::Aarch64
        } else {
            DecoderKind::X86
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            DecoderKind::X86 => "x86",
            DecoderKind::Aarch64 => "aarch64",
        }
    }
}

impl Default for DecoderKind {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecoderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86" | "x86_64" | "x86-64" | "amd64" => Ok(Self::X86),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            _ => Err(format!("Invalid decoder '{}'. Valid: x86, aarch64", s)),
        }
    }
}
