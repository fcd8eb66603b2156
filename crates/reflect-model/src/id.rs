//! Typed arena ids
//!
//! Records never hold addresses of other records. A reference is an index
//! into the arena of the target kind ([`Id`]), a closed union of such indices
//! ([`TypeId`], [`PrimitiveId`]), or a span into a pooled id list ([`IdList`]).
//! Ids are resolved against the owning image at query time, so an image stays
//! valid wherever it is placed in memory.

use crate::kind::Kind;
use crate::primitive::{Class, Enum, EnumConstant, Field, Function, Namespace, Template, TemplateType, Type};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Range;

/// Index of a `T` record in its arena
pub struct Id<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Create id from raw index
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Create id from a `usize` position
    ///
    /// # Panics
    /// Panics if `index` does not fit in 32 bits
    #[inline]
    #[must_use]
    pub fn from_usize(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(index) => Self::new(index),
            Err(_) => panic!("arena index {index} exceeds u32 range"),
        }
    }

    /// Raw index
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.index
    }

    /// Index as `usize`
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl Id<Namespace> {
    /// The root namespace, stored outside the namespaces arena
    pub const ROOT: Self = Self::new(u32::MAX);

    /// True for [`Id::ROOT`]
    #[inline]
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.index == u32::MAX
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.index)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::new)
    }
}

/// Span of ids in an image's pool for `T`
///
/// Entries are sorted ascending by the target's name hash.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct IdList<T> {
    start: u32,
    len: u32,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> IdList<T> {
    /// The empty list
    pub const EMPTY: Self = Self::new(0, 0);

    /// Create list span
    #[inline]
    #[must_use]
    pub const fn new(start: u32, len: u32) -> Self {
        Self {
            start,
            len,
            _marker: PhantomData,
        }
    }

    /// First pool slot
    #[inline]
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// True when the list is empty
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pool range covered by the list
    #[inline]
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        let start = self.start as usize;
        start..start + self.len as usize
    }
}

impl<T> Clone for IdList<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IdList<T> {}

impl<T> Default for IdList<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T> PartialEq for IdList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.len == other.len
    }
}

impl<T> Eq for IdList<T> {}

impl<T> Debug for IdList<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "IdList({}..+{})", self.start, self.len)
    }
}

/// Reference to any type-like record: plain type, enum, class or template instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeId {
    /// Built-in or opaque type
    Type(Id<Type>),
    /// Enumeration
    Enum(Id<Enum>),
    /// Class or struct
    Class(Id<Class>),
    /// Template instantiation
    TemplateType(Id<TemplateType>),
}

impl TypeId {
    /// Kind of the referenced record
    #[inline]
    #[must_use]
    pub const fn kind(self) -> Kind {
        match self {
            Self::Type(_) => Kind::Type,
            Self::Enum(_) => Kind::Enum,
            Self::Class(_) => Kind::Class,
            Self::TemplateType(_) => Kind::TemplateType,
        }
    }

    /// Enum id
    ///
    /// # Panics
    /// Panics if this is not an enum reference
    #[inline]
    #[must_use]
    pub fn as_enum(self) -> Id<Enum> {
        match self {
            Self::Enum(id) => id,
            other => kind_mismatch(Kind::Enum, other.kind()),
        }
    }

    /// Class id
    ///
    /// # Panics
    /// Panics if this is not a class reference
    #[inline]
    #[must_use]
    pub fn as_class(self) -> Id<Class> {
        match self {
            Self::Class(id) => id,
            other => kind_mismatch(Kind::Class, other.kind()),
        }
    }

    /// Template type id
    ///
    /// # Panics
    /// Panics if this is not a template type reference
    #[inline]
    #[must_use]
    pub fn as_template_type(self) -> Id<TemplateType> {
        match self {
            Self::TemplateType(id) => id,
            other => kind_mismatch(Kind::TemplateType, other.kind()),
        }
    }

    /// Enum id, if this is one
    #[inline]
    #[must_use]
    pub const fn to_enum(self) -> Option<Id<Enum>> {
        match self {
            Self::Enum(id) => Some(id),
            _ => None,
        }
    }

    /// Class id, if this is one
    #[inline]
    #[must_use]
    pub const fn to_class(self) -> Option<Id<Class>> {
        match self {
            Self::Class(id) => Some(id),
            _ => None,
        }
    }

    /// Template type id, if this is one
    #[inline]
    #[must_use]
    pub const fn to_template_type(self) -> Option<Id<TemplateType>> {
        match self {
            Self::TemplateType(id) => Some(id),
            _ => None,
        }
    }
}

impl From<Id<Type>> for TypeId {
    fn from(id: Id<Type>) -> Self {
        Self::Type(id)
    }
}

impl From<Id<Enum>> for TypeId {
    fn from(id: Id<Enum>) -> Self {
        Self::Enum(id)
    }
}

impl From<Id<Class>> for TypeId {
    fn from(id: Id<Class>) -> Self {
        Self::Class(id)
    }
}

impl From<Id<TemplateType>> for TypeId {
    fn from(id: Id<TemplateType>) -> Self {
        Self::TemplateType(id)
    }
}

/// Reference to any record that can own other records
///
/// Attributes are leaves and never act as a parent, so they have no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveId {
    /// Built-in or opaque type
    Type(Id<Type>),
    /// Enumeration constant
    EnumConstant(Id<EnumConstant>),
    /// Enumeration
    Enum(Id<Enum>),
    /// Field or parameter
    Field(Id<Field>),
    /// Function or method
    Function(Id<Function>),
    /// Template instantiation
    TemplateType(Id<TemplateType>),
    /// Template declaration
    Template(Id<Template>),
    /// Class or struct
    Class(Id<Class>),
    /// Namespace, including [`Id::ROOT`]
    Namespace(Id<Namespace>),
}

impl PrimitiveId {
    /// The root namespace
    pub const ROOT: Self = Self::Namespace(Id::<Namespace>::ROOT);

    /// Kind of the referenced record
    #[must_use]
    pub const fn kind(self) -> Kind {
        match self {
            Self::Type(_) => Kind::Type,
            Self::EnumConstant(_) => Kind::EnumConstant,
            Self::Enum(_) => Kind::Enum,
            Self::Field(_) => Kind::Field,
            Self::Function(_) => Kind::Function,
            Self::TemplateType(_) => Kind::TemplateType,
            Self::Template(_) => Kind::Template,
            Self::Class(_) => Kind::Class,
            Self::Namespace(_) => Kind::Namespace,
        }
    }

    /// True for the root namespace
    #[inline]
    #[must_use]
    pub const fn is_root(self) -> bool {
        matches!(self, Self::Namespace(id) if id.is_root())
    }

    /// Index into the referenced arena, `u32::MAX` for the root namespace
    #[must_use]
    pub const fn raw(self) -> u32 {
        match self {
            Self::Type(id) => id.raw(),
            Self::EnumConstant(id) => id.raw(),
            Self::Enum(id) => id.raw(),
            Self::Field(id) => id.raw(),
            Self::Function(id) => id.raw(),
            Self::TemplateType(id) => id.raw(),
            Self::Template(id) => id.raw(),
            Self::Class(id) => id.raw(),
            Self::Namespace(id) => id.raw(),
        }
    }

    /// Class id
    ///
    /// # Panics
    /// Panics if this is not a class reference
    #[must_use]
    pub fn as_class(self) -> Id<Class> {
        match self {
            Self::Class(id) => id,
            other => kind_mismatch(Kind::Class, other.kind()),
        }
    }

    /// Function id
    ///
    /// # Panics
    /// Panics if this is not a function reference
    #[must_use]
    pub fn as_function(self) -> Id<Function> {
        match self {
            Self::Function(id) => id,
            other => kind_mismatch(Kind::Function, other.kind()),
        }
    }

    /// Namespace id
    ///
    /// # Panics
    /// Panics if this is not a namespace reference
    #[must_use]
    pub fn as_namespace(self) -> Id<Namespace> {
        match self {
            Self::Namespace(id) => id,
            other => kind_mismatch(Kind::Namespace, other.kind()),
        }
    }

    /// Type-like view of this id, if it refers to a type
    #[must_use]
    pub const fn to_type_id(self) -> Option<TypeId> {
        match self {
            Self::Type(id) => Some(TypeId::Type(id)),
            Self::Enum(id) => Some(TypeId::Enum(id)),
            Self::Class(id) => Some(TypeId::Class(id)),
            Self::TemplateType(id) => Some(TypeId::TemplateType(id)),
            _ => None,
        }
    }
}

impl From<TypeId> for PrimitiveId {
    fn from(id: TypeId) -> Self {
        match id {
            TypeId::Type(id) => Self::Type(id),
            TypeId::Enum(id) => Self::Enum(id),
            TypeId::Class(id) => Self::Class(id),
            TypeId::TemplateType(id) => Self::TemplateType(id),
        }
    }
}

macro_rules! primitive_id_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<Id<$variant>> for PrimitiveId {
                fn from(id: Id<$variant>) -> Self {
                    Self::$variant(id)
                }
            }
        )*
    };
}

primitive_id_from!(Type, EnumConstant, Enum, Field, Function, TemplateType, Template, Class, Namespace);

/// Fatal downcast failure
///
/// A kind mismatch means the database was produced by a broken generator or
/// the memory holding it is corrupt. Continuing would reinterpret one record
/// kind as another.
#[cold]
#[track_caller]
pub fn kind_mismatch(expected: Kind, actual: Kind) -> ! {
    panic!("primitive kind mismatch: expected {expected}, found {actual}")
}
