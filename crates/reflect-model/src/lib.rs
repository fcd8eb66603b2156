//! Reflect Model
//!
//! The closed, kind-tagged set of reflection records and the sorted-by-hash
//! lookup that serves every query.
//!
//! # Overview
//!
//! - **Names**: MurmurHash3 name hashes, stored spans and resolved [`Name`]s
//! - **Ids**: typed arena indices ([`Id`], [`TypeId`], [`PrimitiveId`], [`IdList`])
//! - **Primitives**: plain-data records ([`Class`], [`Field`], [`Function`], ...)
//! - **Attributes**: closed [`Attribute`] union plus the [`FlagBits`] cache
//! - **Profiles**: full and reduced metadata surfaces
//! - **Search**: comparator-driven binary search over hash-sorted arrays
//!
//! # Example
//!
//! ```rust
//! use reflect_model::{hash_name, search, NameSpan, TextSpan};
//!
//! let mut names: Vec<NameSpan> = ["int", "float", "Vector3"]
//!     .iter()
//!     .map(|text| NameSpan::new(hash_name(text), TextSpan::EMPTY))
//!     .collect();
//! names.sort_by_key(|n| n.hash);
//!
//! assert!(search(&names, hash_name("float")).is_some());
//! assert!(search(&names, hash_name("double")).is_none());
//! ```

#![warn(missing_docs)]

pub mod attribute;
pub mod id;
pub mod kind;
pub mod name;
pub mod primitive;
pub mod profile;
pub mod search;

// Re-exports
pub use attribute::{Attribute, FlagAttribute, FlagBits, FloatAttribute, IntAttribute, NameAttribute, TextAttribute};
pub use id::{kind_mismatch, Id, IdList, PrimitiveId, TypeId};
pub use kind::Kind;
pub use name::{hash_name, hash_name_seeded, mix_hashes, murmur3_32, Name, NameSpan, TextSpan};
pub use primitive::{
    Attributed, Class, Enum, EnumConstant, Field, Function, Header, Namespace, Operator, Primitive, Qualifier,
    Template, TemplateType, Type, Variant,
};
pub use profile::{Modifier, Profile};
pub use search::{equal_range, find, first_unsorted_by, is_sorted_by_hash, search, search_by, search_by_key, Hashed};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with reflection records
    pub use crate::{
        hash_name, Attribute, Attributed, Class, Enum, EnumConstant, Field, FlagBits, Function, Hashed, Id, IdList,
        Kind, Name, Namespace, Primitive, PrimitiveId, Qualifier, Template, TemplateType, Type, TypeId, Variant,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
