//! Metadata profiles
//!
//! The reduced profile is a smaller surface of the same model: no attributes,
//! no templates, and type uses described by a single [`Modifier`] instead of
//! a [`Qualifier`]. Lookups and invariants are identical.

use crate::kind::Kind;
use crate::primitive::{Operator, Qualifier};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Which record kinds an image may contain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Every kind
    #[default]
    Full,
    /// No attributes, templates or template types
    Reduced,
}

impl Profile {
    /// Whether records of `kind` are allowed
    #[must_use]
    pub const fn allows(self, kind: Kind) -> bool {
        match self {
            Self::Full => true,
            Self::Reduced => !kind.is_attribute() && !matches!(kind, Kind::Template | Kind::TemplateType),
        }
    }

    /// Whether an image built for `self` satisfies a requirement of `required`
    #[must_use]
    pub const fn satisfies(self, required: Profile) -> bool {
        matches!((self, required), (_, Self::Full) | (Self::Reduced, Self::Reduced))
    }

    /// Wire tag
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Full => 0,
            Self::Reduced => 1,
        }
    }

    /// Parse wire tag
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Full),
            1 => Some(Self::Reduced),
            _ => None,
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Reduced => f.write_str("reduced"),
        }
    }
}

/// Discriminated type-use modifier of the reduced profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    /// Not recorded
    #[default]
    None,
    /// By value
    Value,
    /// Through a pointer
    Pointer,
    /// Through a reference
    Reference,
}

impl Modifier {
    /// Modifier and constness of a qualifier
    #[must_use]
    pub const fn from_qualifier(qualifier: Qualifier) -> (Self, bool) {
        let modifier = match qualifier.op {
            Operator::Value => Self::Value,
            Operator::Pointer => Self::Pointer,
            Operator::Reference => Self::Reference,
        };
        (modifier, qualifier.is_const)
    }

    /// Qualifier for this modifier; `None` reads as a plain value
    #[must_use]
    pub const fn to_qualifier(self, is_const: bool) -> Qualifier {
        let op = match self {
            Self::None | Self::Value => Operator::Value,
            Self::Pointer => Operator::Pointer,
            Self::Reference => Operator::Reference,
        };
        Qualifier::new(op, is_const)
    }
}
