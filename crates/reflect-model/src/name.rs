//! Names and name hashing
//!
//! Every primitive is looked up by the 32-bit hash of its name. Records store
//! a [`NameSpan`] (hash plus a span into the image's name blob); queries hand
//! out a resolved [`Name`] whose text borrows from that blob.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::ops::Range;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// MurmurHash3 (x86, 32-bit) of `data`
#[must_use]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;

    let chunks = data.chunks_exact(4);
    let tail = chunks.remainder();
    for chunk in chunks {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h ^= scramble(k);
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, byte) in tail.iter().enumerate() {
            k |= u32::from(*byte) << (8 * i);
        }
        h ^= scramble(k);
    }

    // Length is mixed modulo 2^32, matching the reference implementation.
    #[allow(clippy::cast_possible_truncation)]
    let len = data.len() as u32;
    fmix(h ^ len)
}

#[inline]
fn scramble(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

#[inline]
fn fmix(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Hash of a name string; the empty string hashes to 0
#[inline]
#[must_use]
pub fn hash_name(text: &str) -> u32 {
    murmur3_32(text.as_bytes(), 0)
}

/// Hash of a name string with an explicit seed
#[inline]
#[must_use]
pub fn hash_name_seeded(text: &str, seed: u32) -> u32 {
    murmur3_32(text.as_bytes(), seed)
}

/// Combine two hashes, e.g. a scope hash with a member hash
///
/// Not commutative: `mix_hashes(a, b) != mix_hashes(b, a)` in general.
#[inline]
#[must_use]
pub fn mix_hashes(a: u32, b: u32) -> u32 {
    murmur3_32(&b.to_le_bytes(), a)
}

/// Byte span into a text blob
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    /// Byte offset of the first character
    pub start: u32,
    /// Length in bytes
    pub len: u32,
}

impl TextSpan {
    /// Span of nothing
    pub const EMPTY: Self = Self { start: 0, len: 0 };

    /// Create span
    #[inline]
    #[must_use]
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// Byte range within the blob
    #[inline]
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        let start = self.start as usize;
        start..start + self.len as usize
    }

    /// True for a zero-length span
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resolve against `blob`; `None` if out of range or not on a char boundary
    #[inline]
    #[must_use]
    pub fn resolve<'a>(&self, blob: &'a str) -> Option<&'a str> {
        blob.get(self.range())
    }
}

/// Stored form of a name: hash plus span into the name blob
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameSpan {
    /// Name hash (lookup key)
    pub hash: u32,
    /// Location of the text in the name blob
    pub text: TextSpan,
}

impl NameSpan {
    /// The empty name (hash 0, no text)
    pub const EMPTY: Self = Self {
        hash: 0,
        text: TextSpan::EMPTY,
    };

    /// Create stored name
    #[inline]
    #[must_use]
    pub const fn new(hash: u32, text: TextSpan) -> Self {
        Self { hash, text }
    }

    /// True for the empty name
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.hash == 0
    }

    /// Resolve text against the name blob
    #[inline]
    #[must_use]
    pub fn resolve<'a>(&self, blob: &'a str) -> Name<'a> {
        if self.is_empty() {
            return Name::EMPTY;
        }
        Name {
            hash: self.hash,
            text: self.text.resolve(blob),
        }
    }
}

/// A name as returned by queries: hash plus borrowed text
///
/// Two distinct names with equal hash are indistinguishable to every lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Name<'a> {
    /// Name hash
    pub hash: u32,
    /// Text, borrowed from the database's name blob
    pub text: Option<&'a str>,
}

impl<'a> Name<'a> {
    /// The empty name (hash 0, no text)
    pub const EMPTY: Name<'static> = Name {
        hash: 0,
        text: None,
    };

    /// Create name
    #[inline]
    #[must_use]
    pub const fn new(hash: u32, text: &'a str) -> Self {
        Self {
            hash,
            text: Some(text),
        }
    }

    /// True for the empty name
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.hash == 0
    }

    /// Text or `""`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        self.text.unwrap_or("")
    }
}

impl Display for Name<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.text {
            Some(text) => write!(f, "{text}"),
            None => write!(f, "#{:08x}", self.hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn murmur3_reference_vectors() {
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 1), 0x514e_28b7);
        assert_eq!(murmur3_32(b"", 0xffff_ffff), 0x81f1_6f39);
        assert_eq!(murmur3_32(&[0, 0, 0, 0], 0), 0x2362_f9de);
        assert_eq!(murmur3_32(b"aaaa", 0x9747_b28c), 0x5a97_808a);
        assert_eq!(murmur3_32(b"Hello, world!", 0x9747_b28c), 0x2488_4cba);
        assert_eq!(
            murmur3_32(b"The quick brown fox jumps over the lazy dog", 0x9747_b28c),
            0x2fa8_26cd
        );
    }

    #[test]
    fn hash_name_deterministic() {
        assert_eq!(hash_name("clcpp::Database"), hash_name("clcpp::Database"));
        assert_ne!(hash_name("int"), hash_name("float"));
    }

    #[test]
    fn empty_name_hashes_to_zero() {
        assert_eq!(hash_name(""), 0);
    }

    #[test]
    fn seeded_hash_differs() {
        assert_ne!(hash_name_seeded("int", 1), hash_name("int"));
        assert_eq!(hash_name_seeded("int", 0), hash_name("int"));
    }

    #[test]
    fn mix_hashes_is_order_sensitive() {
        let a = hash_name("outer");
        let b = hash_name("inner");
        assert_ne!(mix_hashes(a, b), mix_hashes(b, a));
        assert_eq!(mix_hashes(a, b), mix_hashes(a, b));
    }

    #[test]
    fn text_span_resolve() {
        let blob = "intfloat";
        assert_eq!(TextSpan::new(0, 3).resolve(blob), Some("int"));
        assert_eq!(TextSpan::new(3, 5).resolve(blob), Some("float"));
        assert_eq!(TextSpan::new(6, 5).resolve(blob), None);
    }

    #[test]
    fn name_span_resolve() {
        let blob = "int";
        let span = NameSpan::new(hash_name("int"), TextSpan::new(0, 3));
        let name = span.resolve(blob);

        assert_eq!(name.hash, hash_name("int"));
        assert_eq!(name.text, Some("int"));
        assert_eq!(NameSpan::EMPTY.resolve(blob), Name::EMPTY);
    }

    #[test]
    fn name_display() {
        assert_eq!(Name::new(1, "x").to_string(), "x");
        assert_eq!(Name { hash: 0xab, text: None }.to_string(), "#000000ab");
        assert_eq!(Name::EMPTY.as_str(), "");
    }
}
