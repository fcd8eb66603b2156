//! Primitive kinds
//!
//! The closed set of record kinds. A record's kind is fixed when it is
//! constructed; every downcast checks it.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Discriminator for every reflected record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Kind {
    /// Flag attribute (presence only)
    FlagAttribute,
    /// Integer attribute
    IntAttribute,
    /// Floating point attribute
    FloatAttribute,
    /// Attribute whose value is a name
    NameAttribute,
    /// Attribute whose value is free text
    TextAttribute,
    /// Built-in or opaque type
    Type,
    /// Enumeration constant
    EnumConstant,
    /// Enumeration
    Enum,
    /// Field or function parameter
    Field,
    /// Function or method
    Function,
    /// Template instantiation
    TemplateType,
    /// Template declaration
    Template,
    /// Class or struct
    Class,
    /// Namespace
    Namespace,
}

impl Kind {
    /// Every kind, in declaration order
    pub const ALL: [Kind; 14] = [
        Kind::FlagAttribute,
        Kind::IntAttribute,
        Kind::FloatAttribute,
        Kind::NameAttribute,
        Kind::TextAttribute,
        Kind::Type,
        Kind::EnumConstant,
        Kind::Enum,
        Kind::Field,
        Kind::Function,
        Kind::TemplateType,
        Kind::Template,
        Kind::Class,
        Kind::Namespace,
    ];

    /// Stable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FlagAttribute => "FlagAttribute",
            Self::IntAttribute => "IntAttribute",
            Self::FloatAttribute => "FloatAttribute",
            Self::NameAttribute => "NameAttribute",
            Self::TextAttribute => "TextAttribute",
            Self::Type => "Type",
            Self::EnumConstant => "EnumConstant",
            Self::Enum => "Enum",
            Self::Field => "Field",
            Self::Function => "Function",
            Self::TemplateType => "TemplateType",
            Self::Template => "Template",
            Self::Class => "Class",
            Self::Namespace => "Namespace",
        }
    }

    /// True for attribute kinds
    #[inline]
    #[must_use]
    pub const fn is_attribute(self) -> bool {
        matches!(
            self,
            Self::FlagAttribute
                | Self::IntAttribute
                | Self::FloatAttribute
                | Self::NameAttribute
                | Self::TextAttribute
        )
    }

    /// True for kinds that extend `Type` (and appear in the type index)
    #[inline]
    #[must_use]
    pub const fn is_type(self) -> bool {
        matches!(self, Self::Type | Self::Enum | Self::Class | Self::TemplateType)
    }

    /// True for kinds that carry a flag bitmask
    #[inline]
    #[must_use]
    pub const fn has_flag_attributes(self) -> bool {
        matches!(self, Self::Enum | Self::Field | Self::Function | Self::Class)
    }

    /// Whether a record of this kind may be owned by a record of `parent` kind
    ///
    /// Fields owned by a function are its parameters. Template types are
    /// owned by the template they instantiate.
    #[must_use]
    pub const fn allows_parent(self, parent: Kind) -> bool {
        match self {
            Self::Namespace | Self::Type => matches!(parent, Self::Namespace),
            Self::Enum | Self::Class | Self::Function | Self::Template => {
                matches!(parent, Self::Namespace | Self::Class)
            }
            Self::EnumConstant => matches!(parent, Self::Enum),
            Self::Field => matches!(parent, Self::Class | Self::Function),
            Self::TemplateType => matches!(parent, Self::Template),
            Self::FlagAttribute
            | Self::IntAttribute
            | Self::FloatAttribute
            | Self::NameAttribute
            | Self::TextAttribute => parent.has_flag_attributes(),
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification() {
        let attributes = Kind::ALL.iter().filter(|k| k.is_attribute()).count();
        let types = Kind::ALL.iter().filter(|k| k.is_type()).count();

        assert_eq!(attributes, 5);
        assert_eq!(types, 4);
        assert!(Kind::Class.has_flag_attributes());
        assert!(!Kind::Namespace.has_flag_attributes());
    }

    #[test]
    fn parent_rules() {
        assert!(Kind::Class.allows_parent(Kind::Namespace));
        assert!(Kind::Class.allows_parent(Kind::Class));
        assert!(Kind::Field.allows_parent(Kind::Function));
        assert!(Kind::IntAttribute.allows_parent(Kind::Enum));
        assert!(!Kind::Field.allows_parent(Kind::Namespace));
        assert!(!Kind::Type.allows_parent(Kind::Class));
        assert!(!Kind::TextAttribute.allows_parent(Kind::Namespace));
        assert!(!Kind::TemplateType.allows_parent(Kind::Namespace));
    }

    #[test]
    fn kind_display() {
        assert_eq!(Kind::TemplateType.to_string(), "TemplateType");
    }
}
