//! Primitive records
//!
//! Plain-data records for every reflected kind. They are stored by value in
//! per-kind arenas and refer to each other only through ids, so they can be
//! serialized, copied and relocated as-is.
//!
//! Polymorphism is tag-driven: each record carries a [`Header`] whose kind is
//! fixed at construction, and the closed unions [`TypeId`] / [`Attribute`]
//! downcast by checked variant match.

use crate::attribute::{Attribute, FlagBits};
use crate::id::{Id, IdList, PrimitiveId, TypeId};
use crate::kind::Kind;
use crate::name::NameSpan;
use serde::{Deserialize, Serialize};

/// Fields shared by every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    kind: Kind,
    /// Name (lookup key)
    pub name: NameSpan,
    /// Enclosing record; `None` only for the root namespace
    pub parent: Option<PrimitiveId>,
}

impl Header {
    /// Create header; the kind cannot be changed afterwards
    #[inline]
    #[must_use]
    pub const fn new(kind: Kind, name: NameSpan, parent: Option<PrimitiveId>) -> Self {
        Self { kind, name, parent }
    }

    /// Record kind
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }
}

/// Common read access to every record
///
/// Sealed: the set of record kinds is closed.
pub trait Primitive: private::Sealed {
    /// Shared header
    fn header(&self) -> &Header;

    /// Record kind
    #[inline]
    fn kind(&self) -> Kind {
        self.header().kind()
    }

    /// Stored name
    #[inline]
    fn name(&self) -> NameSpan {
        self.header().name
    }

    /// Enclosing record
    #[inline]
    fn parent(&self) -> Option<PrimitiveId> {
        self.header().parent
    }
}

/// A concrete record type with a single statically known kind
pub trait Variant: Primitive {
    /// Kind every record of this type carries
    const KIND: Kind;
}

/// Records that carry attributes and a well-known flag bitmask
pub trait Attributed: Primitive {
    /// Attribute list, sorted by name hash
    fn attributes(&self) -> IdList<Attribute>;

    /// Cached bits for well-known flag attributes
    fn flag_attributes(&self) -> FlagBits;

    /// Whether every bit in `flags` is set
    #[inline]
    fn has_flags(&self, flags: FlagBits) -> bool {
        self.flag_attributes().contains(flags)
    }
}

pub(crate) mod private {
    pub trait Sealed {}
}

/// How a field or parameter refers to its type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// By value
    #[default]
    Value,
    /// Through a pointer
    Pointer,
    /// Through a reference
    Reference,
}

/// Qualification of a type use
///
/// Kept apart from [`Type`] so `X`, `const X`, `X*` and `const X&` all share
/// one type record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Qualifier {
    /// Value, pointer or reference
    pub op: Operator,
    /// `const` qualified
    pub is_const: bool,
}

impl Qualifier {
    /// Create qualifier
    #[inline]
    #[must_use]
    pub const fn new(op: Operator, is_const: bool) -> Self {
        Self { op, is_const }
    }

    /// Plain value
    pub const VALUE: Self = Self::new(Operator::Value, false);
}

/// Built-in or opaque type; base of enums, classes and template types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Type {
    /// Shared header
    pub header: Header,
    /// Size in bytes
    pub size: u32,
}

impl Type {
    /// Create type record
    #[inline]
    #[must_use]
    pub const fn new(name: NameSpan, parent: Option<PrimitiveId>, size: u32) -> Self {
        Self {
            header: Header::new(Kind::Type, name, parent),
            size,
        }
    }
}

/// Name/value pair of an enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumConstant {
    /// Shared header
    pub header: Header,
    /// Constant value
    pub value: i32,
}

impl EnumConstant {
    /// Create enum constant record
    #[inline]
    #[must_use]
    pub const fn new(name: NameSpan, parent: Option<PrimitiveId>, value: i32) -> Self {
        Self {
            header: Header::new(Kind::EnumConstant, name, parent),
            value,
        }
    }
}

/// Enumeration of named constants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enum {
    /// Shared header
    pub header: Header,
    /// Size in bytes
    pub size: u32,
    /// Constants, sorted by name hash
    pub constants: IdList<EnumConstant>,
    /// Attributes, sorted by name hash
    pub attributes: IdList<Attribute>,
    /// Well-known flag attributes
    pub flag_attributes: FlagBits,
}

impl Enum {
    /// Create enum record with no members
    #[inline]
    #[must_use]
    pub const fn new(name: NameSpan, parent: Option<PrimitiveId>, size: u32) -> Self {
        Self {
            header: Header::new(Kind::Enum, name, parent),
            size,
            constants: IdList::EMPTY,
            attributes: IdList::EMPTY,
            flag_attributes: FlagBits::empty(),
        }
    }
}

/// Class/struct field or function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Shared header
    pub header: Header,
    /// Type of the field; `None` when the type was not reflected
    pub ty: Option<TypeId>,
    /// Qualification of the type use
    pub qualifier: Qualifier,
    /// Byte offset in the parent class, or parameter index for parameters
    pub offset: i32,
    /// Unique id of the owning function, for parameters
    pub parent_unique_id: u32,
    /// Attributes, sorted by name hash
    pub attributes: IdList<Attribute>,
    /// Well-known flag attributes
    pub flag_attributes: FlagBits,
}

impl Field {
    /// Create field record
    #[inline]
    #[must_use]
    pub const fn new(
        name: NameSpan,
        parent: Option<PrimitiveId>,
        ty: Option<TypeId>,
        qualifier: Qualifier,
        offset: i32,
    ) -> Self {
        Self {
            header: Header::new(Kind::Field, name, parent),
            ty,
            qualifier,
            offset,
            parent_unique_id: 0,
            attributes: IdList::EMPTY,
            flag_attributes: FlagBits::empty(),
        }
    }
}

/// Function or method
///
/// For methods the `this` parameter is listed explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Shared header
    pub header: Header,
    /// Callable location
    pub address: u32,
    /// Distinguishes overloads sharing a name
    pub unique_id: u32,
    /// Return value, if not void
    pub return_parameter: Option<Id<Field>>,
    /// Parameters, sorted by name hash
    pub parameters: IdList<Field>,
    /// Attributes, sorted by name hash
    pub attributes: IdList<Attribute>,
    /// Well-known flag attributes
    pub flag_attributes: FlagBits,
}

impl Function {
    /// Create function record with no parameters
    #[inline]
    #[must_use]
    pub const fn new(name: NameSpan, parent: Option<PrimitiveId>, address: u32, unique_id: u32) -> Self {
        Self {
            header: Header::new(Kind::Function, name, parent),
            address,
            unique_id,
            return_parameter: None,
            parameters: IdList::EMPTY,
            attributes: IdList::EMPTY,
            flag_attributes: FlagBits::empty(),
        }
    }
}

/// Instantiation of a template with concrete arguments
///
/// Members of the instantiation are not recorded; they vary per instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateType {
    /// Shared header
    pub header: Header,
    /// Size in bytes
    pub size: u32,
    /// Type of each argument
    pub parameter_types: [Option<TypeId>; TemplateType::MAX_ARGS],
    /// Whether each argument is a pointer
    pub parameter_ptrs: [bool; TemplateType::MAX_ARGS],
}

impl TemplateType {
    /// Arguments recorded per instantiation
    pub const MAX_ARGS: usize = 4;

    /// Create template type record with no arguments
    #[inline]
    #[must_use]
    pub const fn new(name: NameSpan, parent: Option<PrimitiveId>, size: u32) -> Self {
        Self {
            header: Header::new(Kind::TemplateType, name, parent),
            size,
            parameter_types: [None; Self::MAX_ARGS],
            parameter_ptrs: [false; Self::MAX_ARGS],
        }
    }

    /// Recorded `(type, is_pointer)` arguments in order
    pub fn arguments(&self) -> impl Iterator<Item = (TypeId, bool)> + '_ {
        self.parameter_types
            .iter()
            .zip(self.parameter_ptrs.iter())
            .filter_map(|(ty, ptr)| ty.map(|ty| (ty, *ptr)))
    }

    /// Number of recorded arguments
    #[must_use]
    pub fn argument_count(&self) -> usize {
        self.parameter_types.iter().filter(|ty| ty.is_some()).count()
    }
}

/// Template declaration; not itself a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Shared header
    pub header: Header,
    /// Instantiations, sorted by name hash
    pub instances: IdList<TemplateType>,
}

impl Template {
    /// Create template record with no instances
    #[inline]
    #[must_use]
    pub const fn new(name: NameSpan, parent: Option<PrimitiveId>) -> Self {
        Self {
            header: Header::new(Kind::Template, name, parent),
            instances: IdList::EMPTY,
        }
    }
}

/// Class or struct
///
/// Single inheritance only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    /// Shared header
    pub header: Header,
    /// Size in bytes
    pub size: u32,
    /// Base class, if any
    pub base_class: Option<Id<Class>>,
    /// Constructor, if reflected
    pub constructor: Option<Id<Function>>,
    /// Destructor, if reflected
    pub destructor: Option<Id<Function>>,
    /// Nested enums, sorted by name hash
    pub enums: IdList<Enum>,
    /// Nested classes, sorted by name hash
    pub classes: IdList<Class>,
    /// Methods, sorted by name hash
    pub methods: IdList<Function>,
    /// Fields, sorted by name hash
    pub fields: IdList<Field>,
    /// Attributes, sorted by name hash
    pub attributes: IdList<Attribute>,
    /// Nested templates, sorted by name hash
    pub templates: IdList<Template>,
    /// Well-known flag attributes
    pub flag_attributes: FlagBits,
}

impl Class {
    /// Create class record with no members
    #[inline]
    #[must_use]
    pub const fn new(name: NameSpan, parent: Option<PrimitiveId>, size: u32) -> Self {
        Self {
            header: Header::new(Kind::Class, name, parent),
            size,
            base_class: None,
            constructor: None,
            destructor: None,
            enums: IdList::EMPTY,
            classes: IdList::EMPTY,
            methods: IdList::EMPTY,
            fields: IdList::EMPTY,
            attributes: IdList::EMPTY,
            templates: IdList::EMPTY,
            flag_attributes: FlagBits::empty(),
        }
    }
}

/// Namespace; the one without a parent is the database root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Shared header
    pub header: Header,
    /// Nested namespaces, sorted by name hash
    pub namespaces: IdList<Namespace>,
    /// Plain types, sorted by name hash
    pub types: IdList<Type>,
    /// Enums, sorted by name hash
    pub enums: IdList<Enum>,
    /// Classes, sorted by name hash
    pub classes: IdList<Class>,
    /// Free functions, sorted by name hash
    pub functions: IdList<Function>,
    /// Templates, sorted by name hash
    pub templates: IdList<Template>,
}

impl Namespace {
    /// Create namespace record with no members
    #[inline]
    #[must_use]
    pub const fn new(name: NameSpan, parent: Option<PrimitiveId>) -> Self {
        Self {
            header: Header::new(Kind::Namespace, name, parent),
            namespaces: IdList::EMPTY,
            types: IdList::EMPTY,
            enums: IdList::EMPTY,
            classes: IdList::EMPTY,
            functions: IdList::EMPTY,
            templates: IdList::EMPTY,
        }
    }

    /// The root namespace: empty name, no parent
    #[inline]
    #[must_use]
    pub const fn root() -> Self {
        Self::new(NameSpan::EMPTY, None)
    }

    /// True when this namespace has no parent
    #[inline]
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.header.parent.is_none()
    }
}

macro_rules! impl_variant {
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

impl_variant!(
    Type => Type,
    EnumConstant => EnumConstant,
    Enum => Enum,
    Field => Field,
    Function => Function,
    TemplateType => TemplateType,
    Template => Template,
    Class => Class,
    Namespace => Namespace,
);

macro_rules! impl_attributed {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Attributed for $ty {
                #[inline]
                fn attributes(&self) -> IdList<Attribute> {
                    self.attributes
                }

                #[inline]
                fn flag_attributes(&self) -> FlagBits {
                    self.flag_attributes
                }
            }
        )*
    };
}

impl_attributed!(Enum, Field, Function, Class);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::{hash_name, TextSpan};

    fn name(text: &str) -> NameSpan {
        NameSpan::new(hash_name(text), TextSpan::EMPTY)
    }

    #[test]
    fn constructors_set_kind() {
        assert_eq!(Type::new(name("int"), None, 4).kind(), Kind::Type);
        assert_eq!(Enum::new(name("E"), None, 4).kind(), Kind::Enum);
        assert_eq!(Class::new(name("C"), None, 8).kind(), Kind::Class);
        assert_eq!(TemplateType::new(name("T<int>"), None, 8).kind(), Kind::TemplateType);
        assert_eq!(Template::new(name("T"), None).kind(), Kind::Template);
        assert_eq!(Namespace::root().kind(), Kind::Namespace);
        assert_eq!(EnumConstant::new(name("A"), None, 1).kind(), Kind::EnumConstant);
        assert_eq!(Function::new(name("f"), None, 0, 0).kind(), Kind::Function);
    }

    #[test]
    fn static_kinds_match_instances() {
        assert_eq!(<Class as Variant>::KIND, Class::new(name("C"), None, 0).kind());
        assert_eq!(<Field as Variant>::KIND, Kind::Field);
    }

    #[test]
    fn root_namespace_has_no_parent() {
        let root = Namespace::root();
        assert!(root.is_root());
        assert!(root.name().is_empty());

        let child = Namespace::new(name("N"), Some(PrimitiveId::ROOT));
        assert!(!child.is_root());
    }

    #[test]
    fn qualifier_default_is_value() {
        assert_eq!(Qualifier::default(), Qualifier::VALUE);
        assert_ne!(Qualifier::new(Operator::Pointer, true), Qualifier::VALUE);
    }

    #[test]
    fn template_type_arguments() {
        let mut tt = TemplateType::new(name("Map<int, C*>"), None, 16);
        tt.parameter_types[0] = Some(TypeId::Type(Id::new(0)));
        tt.parameter_types[1] = Some(TypeId::Class(Id::new(2)));
        tt.parameter_ptrs[1] = true;

        let args: Vec<_> = tt.arguments().collect();
        assert_eq!(args, vec![(TypeId::Type(Id::new(0)), false), (TypeId::Class(Id::new(2)), true)]);
        assert_eq!(tt.argument_count(), 2);
    }

    #[test]
    fn attributed_flags() {
        let mut field = Field::new(name("f"), None, None, Qualifier::VALUE, 0);
        assert!(!field.has_flags(FlagBits::TRANSIENT));

        field.flag_attributes |= FlagBits::TRANSIENT;
        assert!(field.has_flags(FlagBits::TRANSIENT));
        assert!(!field.has_flags(FlagBits::TRANSIENT | FlagBits::NULLSTR));
    }
}
