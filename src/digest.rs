//! Digest values and their textual encoding.
//!
//! A [`Digest`] is an opaque, fixed-format content hash used only for
//! equality comparison, never for content retrieval. Digests are encoded as
//! `<algorithm>:<hex>` (e.g. `blake3:af1349b9...`), a self-describing form
//! that round-trips byte-for-byte through the persisted store and sorts
//! deterministically by its encoded string.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DriftError;

/// The hash algorithm used to produce a digest.
///
/// The algorithm is threaded explicitly through every hashing call and
/// defaulted once at the CLI entry point, so the scheme stays swappable and
/// testable rather than being implicit global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[non_exhaustive]
pub enum HashAlgorithm {
    /// BLAKE3, the default. Fast, parallel-friendly, cryptographically
    /// strong.
    #[default]
    Blake3,
}

impl HashAlgorithm {
    /// The canonical lowercase name used as the digest encoding prefix.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(DriftError::DigestParseError(other.to_string())),
        }
    }
}

/// A fixed-format content hash.
///
/// Two digests are equal iff their encoded forms are equal. The `Ord`
/// implementation is lexicographic on the encoded form, which is what gives
/// aggregation its deterministic, order-independent result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: HashAlgorithm,
    hex: String,
}

impl Digest {
    /// Hashes a byte slice with the given algorithm.
    pub fn of_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self {
                algorithm,
                hex: blake3::hash(bytes).to_hex().to_string(),
            },
        }
    }

    /// The canonical digest of zero bytes of input.
    ///
    /// This is the sentinel used for categories with no configured paths and
    /// for modules with no internal dependencies, so two modules both lacking
    /// a category compare equal.
    pub fn empty(algorithm: HashAlgorithm) -> Self {
        Self::of_bytes(algorithm, b"")
    }

    /// Wraps an already-computed hex digest produced by `algorithm`.
    pub(crate) fn from_hex(algorithm: HashAlgorithm, hex: String) -> Self {
        Self { algorithm, hex }
    }

    /// The canonical `<algorithm>:<hex>` encoding.
    pub fn encoded(&self) -> String {
        format!("{}:{}", self.algorithm, self.hex)
    }
}

impl PartialOrd for Digest {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Digest {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Encoded form is "<algo>:<hex>"; comparing the components in that
        // order is equivalent to comparing the encoded strings.
        self.algorithm
            .name()
            .cmp(other.algorithm.name())
            .then_with(|| self.hex.cmp(&other.hex))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Digest {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algo, hex) = s
            .split_once(':')
            .ok_or_else(|| DriftError::DigestParseError(s.to_string()))?;
        let algorithm: HashAlgorithm = algo.parse()?;
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DriftError::DigestParseError(s.to_string()));
        }
        Ok(Self {
            algorithm,
            hex: hex.to_ascii_lowercase(),
        })
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
