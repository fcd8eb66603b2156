//! Attributes
//!
//! Attributes annotate enums, fields, functions and classes. They form a
//! closed union stored by value in one arena; downcasts are checked variant
//! matches.
//!
//! Well-known flag attributes are also folded into a [`FlagBits`] mask on the
//! owning record, so membership tests skip the attribute search. The
//! attribute list stays the complete record.

use crate::id::{kind_mismatch, PrimitiveId};
use crate::kind::Kind;
use crate::name::{hash_name, NameSpan, TextSpan};
use crate::primitive::{private, Header, Primitive, Variant};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Cached membership of well-known flag attributes
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FlagBits: u32 {
        /// Excluded from serialization
        const TRANSIENT = 1 << 0;
        /// Pointer is a null-terminated string
        const NULLSTR   = 1 << 1;
    }
}

impl FlagBits {
    /// Attribute names mapped to their bit
    pub const WELL_KNOWN: [(&'static str, FlagBits); 2] =
        [("transient", FlagBits::TRANSIENT), ("nullstr", FlagBits::NULLSTR)];

    /// Bit for a well-known attribute name, empty otherwise
    #[must_use]
    pub fn from_attribute_name(name: &str) -> Self {
        Self::from_attribute_hash(hash_name(name))
    }

    /// Bit for a well-known attribute name hash, empty otherwise
    #[must_use]
    pub fn from_attribute_hash(hash: u32) -> Self {
        Self::WELL_KNOWN
            .iter()
            .find(|(name, _)| hash_name(name) == hash)
            .map_or(Self::empty(), |(_, bit)| *bit)
    }
}

/// Attribute with no value; presence is the information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagAttribute {
    /// Shared header
    pub header: Header,
}

/// Attribute with an integer value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntAttribute {
    /// Shared header
    pub header: Header,
    /// Value
    pub value: i32,
}

/// Attribute with a floating point value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatAttribute {
    /// Shared header
    pub header: Header,
    /// Value
    pub value: f32,
}

/// Attribute whose value is a name in the name blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameAttribute {
    /// Shared header
    pub header: Header,
    /// Value
    pub value: NameSpan,
}

/// Attribute whose value is free text in the attribute-text blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAttribute {
    /// Shared header
    pub header: Header,
    /// Value
    pub value: TextSpan,
}

/// Any attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    /// Flag attribute
    Flag(FlagAttribute),
    /// Integer attribute
    Int(IntAttribute),
    /// Float attribute
    Float(FloatAttribute),
    /// Name attribute
    Name(NameAttribute),
    /// Text attribute
    Text(TextAttribute),
}

impl Attribute {
    /// Create flag attribute
    #[must_use]
    pub const fn flag(name: NameSpan, parent: Option<PrimitiveId>) -> Self {
        Self::Flag(FlagAttribute {
            header: Header::new(Kind::FlagAttribute, name, parent),
        })
    }

    /// Create integer attribute
    #[must_use]
    pub const fn int(name: NameSpan, parent: Option<PrimitiveId>, value: i32) -> Self {
        Self::Int(IntAttribute {
            header: Header::new(Kind::IntAttribute, name, parent),
            value,
        })
    }

    /// Create float attribute
    #[must_use]
    pub const fn float(name: NameSpan, parent: Option<PrimitiveId>, value: f32) -> Self {
        Self::Float(FloatAttribute {
            header: Header::new(Kind::FloatAttribute, name, parent),
            value,
        })
    }

    /// Create name attribute
    #[must_use]
    pub const fn name_value(name: NameSpan, parent: Option<PrimitiveId>, value: NameSpan) -> Self {
        Self::Name(NameAttribute {
            header: Header::new(Kind::NameAttribute, name, parent),
            value,
        })
    }

    /// Create text attribute
    #[must_use]
    pub const fn text(name: NameSpan, parent: Option<PrimitiveId>, value: TextSpan) -> Self {
        Self::Text(TextAttribute {
            header: Header::new(Kind::TextAttribute, name, parent),
            value,
        })
    }

    /// Mutable header, for id remapping during construction
    pub fn header_mut(&mut self) -> &mut Header {
        match self {
            Self::Flag(a) => &mut a.header,
            Self::Int(a) => &mut a.header,
            Self::Float(a) => &mut a.header,
            Self::Name(a) => &mut a.header,
            Self::Text(a) => &mut a.header,
        }
    }

    /// Flag attribute
    ///
    /// # Panics
    /// Panics if this is not a flag attribute
    #[must_use]
    pub fn as_flag(&self) -> &FlagAttribute {
        match self {
            Self::Flag(a) => a,
            other => kind_mismatch(Kind::FlagAttribute, other.kind()),
        }
    }

    /// Integer attribute
    ///
    /// # Panics
    /// Panics if this is not an integer attribute
    #[must_use]
    pub fn as_int(&self) -> &IntAttribute {
        match self {
            Self::Int(a) => a,
            other => kind_mismatch(Kind::IntAttribute, other.kind()),
        }
    }

    /// Float attribute
    ///
    /// # Panics
    /// Panics if this is not a float attribute
    #[must_use]
    pub fn as_float(&self) -> &FloatAttribute {
        match self {
            Self::Float(a) => a,
            other => kind_mismatch(Kind::FloatAttribute, other.kind()),
        }
    }

    /// Name attribute
    ///
    /// # Panics
    /// Panics if this is not a name attribute
    #[must_use]
    pub fn as_name(&self) -> &NameAttribute {
        match self {
            Self::Name(a) => a,
            other => kind_mismatch(Kind::NameAttribute, other.kind()),
        }
    }

    /// Text attribute
    ///
    /// # Panics
    /// Panics if this is not a text attribute
    #[must_use]
    pub fn as_text(&self) -> &TextAttribute {
        match self {
            Self::Text(a) => a,
            other => kind_mismatch(Kind::TextAttribute, other.kind()),
        }
    }

    /// Well-known bit this attribute maps to; only flag attributes map
    #[must_use]
    pub fn flag_bit(&self) -> FlagBits {
        match self {
            Self::Flag(a) => FlagBits::from_attribute_hash(a.header.name.hash),
            _ => FlagBits::empty(),
        }
    }
}

impl private::Sealed for Attribute {}

impl Primitive for Attribute {
    fn header(&self) -> &Header {
        match self {
            Self::Flag(a) => &a.header,
            Self::Int(a) => &a.header,
            Self::Float(a) => &a.header,
            Self::Name(a) => &a.header,
            Self::Text(a) => &a.header,
        }
    }
}

macro_rules! impl_attribute_variant {
    ($($ty:ident => $kind:ident),* $(,)?) => {
        $(
            impl private::Sealed for $ty {}

            impl Primitive for $ty {
                #[inline]
                fn header(&self) -> &Header {
                    &self.header
                }
            }

            impl Variant for $ty {
                const KIND: Kind = Kind::$kind;
            }
        )*
    };
}

impl_attribute_variant!(
    FlagAttribute => FlagAttribute,
    IntAttribute => IntAttribute,
    FloatAttribute => FloatAttribute,
    NameAttribute => NameAttribute,
    TextAttribute => TextAttribute,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> NameSpan {
        NameSpan::new(hash_name(text), TextSpan::EMPTY)
    }

    #[test]
    fn well_known_flags() {
        assert_eq!(FlagBits::from_attribute_name("transient"), FlagBits::TRANSIENT);
        assert_eq!(FlagBits::from_attribute_name("nullstr"), FlagBits::NULLSTR);
        assert_eq!(FlagBits::from_attribute_name("editable"), FlagBits::empty());
    }

    #[test]
    fn flag_bit_only_for_flag_attributes() {
        let flag = Attribute::flag(name("transient"), None);
        let int = Attribute::int(name("transient"), None, 1);

        assert_eq!(flag.flag_bit(), FlagBits::TRANSIENT);
        assert_eq!(int.flag_bit(), FlagBits::empty());
    }

    #[test]
    fn attribute_kinds() {
        assert_eq!(Attribute::flag(name("a"), None).kind(), Kind::FlagAttribute);
        assert_eq!(Attribute::int(name("a"), None, 1).kind(), Kind::IntAttribute);
        assert_eq!(Attribute::float(name("a"), None, 1.5).kind(), Kind::FloatAttribute);
        assert_eq!(Attribute::name_value(name("a"), None, name("b")).kind(), Kind::NameAttribute);
        assert_eq!(Attribute::text(name("a"), None, TextSpan::new(0, 3)).kind(), Kind::TextAttribute);
    }

    #[test]
    fn downcast_matching_variant() {
        let attribute = Attribute::int(name("min"), None, -3);
        assert_eq!(attribute.as_int().value, -3);
        assert_eq!(attribute.as_int().kind(), <IntAttribute as Variant>::KIND);
        assert_eq!(attribute.name().hash, hash_name("min"));
    }

    #[test]
    #[should_panic(expected = "primitive kind mismatch: expected FloatAttribute, found IntAttribute")]
    fn downcast_mismatch_panics() {
        let attribute = Attribute::int(name("min"), None, -3);
        let _ = attribute.as_float();
    }

    #[test]
    fn flag_bits_serialize() {
        let bits = FlagBits::TRANSIENT | FlagBits::NULLSTR;
        let json = serde_json::to_string(&bits).unwrap();
        let decoded: FlagBits = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, bits);
    }
}
