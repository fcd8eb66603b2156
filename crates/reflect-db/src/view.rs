//! Borrowed graph views
//!
//! [`Ref`] pairs a record with the image it lives in, so ids stored in the
//! record resolve to further `Ref`s. [`Refs`] is a member list; its `find`
//! runs the hash search over the list's ids. [`TypeRef`] and
//! [`PrimitiveRef`] are the closed unions returned by polymorphic queries;
//! their `as_*` downcasts panic on a kind mismatch and their `to_*`
//! counterparts return `None`.

use crate::image::{MemoryImage, Store};
use reflect_model::{
    kind_mismatch, search_by_key, Attribute, Attributed, Class, Enum, EnumConstant, Field, FlagBits, Function,
    Hashed, Header, Id, IdList, Kind, Modifier, Name, Namespace, Primitive, PrimitiveId, Template, TemplateType,
    Type, TypeId,
};
use std::fmt::{self, Debug, Formatter};
use std::ops::Deref;

/// A record borrowed from an image
pub struct Ref<'a, T> {
    image: &'a MemoryImage,
    id: Id<T>,
    record: &'a T,
}

impl<'a, T: 'a> Ref<'a, T>
where
    MemoryImage: Store<T>,
{
    /// Resolve `id` in `image`
    ///
    /// # Panics
    /// Panics if `id` is outside its arena
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn new(image: &'a MemoryImage, id: Id<T>) -> Self {
        Self {
            image,
            id,
            record: image.record(id),
        }
    }
}

impl<'a, T> Ref<'a, T> {
    /// Arena id
    #[inline]
    #[must_use]
    pub fn id(&self) -> Id<T> {
        self.id
    }

    /// Owning image
    #[inline]
    #[must_use]
    pub fn image(&self) -> &'a MemoryImage {
        self.image
    }

    /// The record itself, with the image's lifetime
    #[inline]
    #[must_use]
    pub fn record(&self) -> &'a T {
        self.record
    }
}

impl<'a, T: Primitive> Ref<'a, T> {
    /// Resolved name
    #[inline]
    #[must_use]
    pub fn name(&self) -> Name<'a> {
        self.image.resolve_name(self.record.name())
    }

    /// Record kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.record.kind()
    }

    /// Enclosing record; `None` only for the root namespace
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<PrimitiveRef<'a>> {
        self.record.parent().map(|id| self.image.resolve(id))
    }
}

impl<'a, T: Attributed> Ref<'a, T> {
    /// Attributes, ascending by name hash
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> Refs<'a, Attribute> {
        Refs::new(self.image, self.record.attributes())
    }

    /// Attribute with this name hash
    #[must_use]
    pub fn find_attribute(&self, hash: u32) -> Option<Ref<'a, Attribute>> {
        self.attributes().find(hash)
    }

    /// Whether every well-known flag in `flags` is set, without searching
    #[inline]
    #[must_use]
    pub fn has_flag(&self, flags: FlagBits) -> bool {
        self.record.has_flags(flags)
    }
}

impl<T> Clone for Ref<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<'_, T> {}

impl<T> Deref for Ref<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.record
    }
}

/// Identity: same record of the same image
impl<T> PartialEq for Ref<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.record, other.record)
    }
}

impl<T> Eq for Ref<'_, T> {}

impl<T: Debug> Debug for Ref<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.id)
            .field("record", self.record)
            .finish()
    }
}

/// A member list borrowed from an image, ascending by name hash
pub struct Refs<'a, T> {
    image: &'a MemoryImage,
    ids: &'a [Id<T>],
}

impl<'a, T: 'a> Refs<'a, T>
where
    MemoryImage: Store<T>,
{
    /// Resolve `list` in `image`
    ///
    /// # Panics
    /// Panics if the list span is outside its pool
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn new(image: &'a MemoryImage, list: IdList<T>) -> Self {
        Self {
            image,
            ids: image.ids(list),
        }
    }

    /// Number of members
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when the list is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Member ids
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &'a [Id<T>] {
        self.ids
    }

    /// Member at position `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Ref<'a, T>> {
        self.ids.get(index).map(|&id| Ref::new(self.image, id))
    }

    /// Members in hash order
    pub fn iter(&self) -> impl Iterator<Item = Ref<'a, T>> + 'a {
        let image = self.image;
        self.ids.iter().map(move |&id| Ref::new(image, id))
    }
}

impl<'a, T: Hashed + 'a> Refs<'a, T>
where
    MemoryImage: Store<T>,
{
    /// Member with this name hash
    ///
    /// When members collide on a hash, which of them is returned is
    /// unspecified.
    #[must_use]
    pub fn find(&self, hash: u32) -> Option<Ref<'a, T>> {
        let image = self.image;
        search_by_key(self.ids, hash, |&id| image.record(id).name_hash()).map(|i| Ref::new(image, self.ids[i]))
    }
}

impl<T> Clone for Refs<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Refs<'_, T> {}

impl<T> Debug for Refs<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids).finish()
    }
}

macro_rules! member_lists {
    ($owner:ty { $($list:ident / $find:ident : $member:ty),* $(,)? }) => {
        impl<'a> Ref<'a, $owner> {
            $(
                #[doc = concat!("`", stringify!($list), "` list, ascending by name hash")]
                #[inline]
                #[must_use]
                pub fn $list(&self) -> Refs<'a, $member> {
                    Refs::new(self.image, self.record.$list)
                }

                #[doc = concat!("Member of `", stringify!($list), "` with this name hash")]
                #[inline]
                #[must_use]
                pub fn $find(&self, hash: u32) -> Option<Ref<'a, $member>> {
                    self.$list().find(hash)
                }
            )*
        }
    };
}

member_lists!(Namespace {
    namespaces / find_namespace: Namespace,
    types / find_type: Type,
    enums / find_enum: Enum,
    classes / find_class: Class,
    functions / find_function: Function,
    templates / find_template: Template,
});

member_lists!(Class {
    enums / find_enum: Enum,
    classes / find_class: Class,
    methods / find_method: Function,
    fields / find_field: Field,
    templates / find_template: Template,
});

member_lists!(Function {
    parameters / find_parameter: Field,
});

member_lists!(Enum {
    constants / find_constant: EnumConstant,
});

member_lists!(Template {
    instances / find_instance: TemplateType,
});

impl<'a> Ref<'a, Namespace> {
    /// True for the root namespace
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }
}

impl<'a> Ref<'a, Class> {
    /// Base class
    #[must_use]
    pub fn base_class(&self) -> Option<Ref<'a, Class>> {
        self.record.base_class.map(|id| Ref::new(self.image, id))
    }

    /// Constructor
    #[must_use]
    pub fn constructor(&self) -> Option<Ref<'a, Function>> {
        self.record.constructor.map(|id| Ref::new(self.image, id))
    }

    /// Destructor
    #[must_use]
    pub fn destructor(&self) -> Option<Ref<'a, Function>> {
        self.record.destructor.map(|id| Ref::new(self.image, id))
    }

    /// Base classes from the direct base upwards
    pub fn bases(&self) -> impl Iterator<Item = Ref<'a, Class>> + 'a {
        std::iter::successors(self.base_class(), |class: &Ref<'a, Class>| class.base_class())
    }

    /// Whether `self` is `other` or derives from it
    #[must_use]
    pub fn derives_from(&self, other: Id<Class>) -> bool {
        self.id == other || self.bases().any(|base| base.id == other)
    }
}

impl<'a> Ref<'a, Field> {
    /// Type of the field, if reflected
    #[must_use]
    pub fn field_type(&self) -> Option<TypeRef<'a>> {
        self.record.ty.map(|id| self.image.resolve_type(id))
    }

    /// Qualifier in the reduced profile's terms: modifier and constness
    #[must_use]
    pub fn modifier(&self) -> (Modifier, bool) {
        Modifier::from_qualifier(self.record.qualifier)
    }
}

impl<'a> Ref<'a, Function> {
    /// Return value, if not void
    #[must_use]
    pub fn return_parameter(&self) -> Option<Ref<'a, Field>> {
        self.record.return_parameter.map(|id| Ref::new(self.image, id))
    }
}

impl<'a> Ref<'a, TemplateType> {
    /// Recorded `(type, is_pointer)` arguments in order
    pub fn arguments(&self) -> impl Iterator<Item = (TypeRef<'a>, bool)> + 'a {
        let image = self.image;
        self.record
            .arguments()
            .map(move |(ty, is_ptr)| (image.resolve_type(ty), is_ptr))
    }

    /// Template this type instantiates
    #[must_use]
    pub fn template(&self) -> Option<Ref<'a, Template>> {
        self.parent().and_then(PrimitiveRef::to_template)
    }
}

impl<'a> Ref<'a, Attribute> {
    /// Text of a text attribute
    ///
    /// # Panics
    /// Panics if this is not a text attribute
    #[must_use]
    pub fn text_value(&self) -> Option<&'a str> {
        self.image.text(self.record.as_text().value)
    }

    /// Name of a name attribute
    ///
    /// # Panics
    /// Panics if this is not a name attribute
    #[must_use]
    pub fn name_value(&self) -> Name<'a> {
        self.image.resolve_name(self.record.as_name().value)
    }
}

/// Any type-like record borrowed from an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef<'a> {
    /// Built-in or opaque type
    Type(Ref<'a, Type>),
    /// Enumeration
    Enum(Ref<'a, Enum>),
    /// Class or struct
    Class(Ref<'a, Class>),
    /// Template instantiation
    TemplateType(Ref<'a, TemplateType>),
}

impl<'a> TypeRef<'a> {
    /// Resolve `id` in `image`
    ///
    /// # Panics
    /// Panics if `id` is outside its arena
    #[must_use]
    pub fn new(image: &'a MemoryImage, id: TypeId) -> Self {
        match id {
            TypeId::Type(id) => Self::Type(Ref::new(image, id)),
            TypeId::Enum(id) => Self::Enum(Ref::new(image, id)),
            TypeId::Class(id) => Self::Class(Ref::new(image, id)),
            TypeId::TemplateType(id) => Self::TemplateType(Ref::new(image, id)),
        }
    }

    /// Id of the referenced record
    #[must_use]
    pub fn id(&self) -> TypeId {
        match self {
            Self::Type(r) => r.id.into(),
            Self::Enum(r) => r.id.into(),
            Self::Class(r) => r.id.into(),
            Self::TemplateType(r) => r.id.into(),
        }
    }

    /// Shared header
    #[must_use]
    pub fn header(&self) -> &'a Header {
        match self {
            Self::Type(r) => &r.record.header,
            Self::Enum(r) => &r.record.header,
            Self::Class(r) => &r.record.header,
            Self::TemplateType(r) => &r.record.header,
        }
    }

    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> u32 {
        match self {
            Self::Type(r) => r.size,
            Self::Enum(r) => r.size,
            Self::Class(r) => r.size,
            Self::TemplateType(r) => r.size,
        }
    }

    /// Record kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.header().kind()
    }

    /// Resolved name
    #[must_use]
    pub fn name(&self) -> Name<'a> {
        self.image().resolve_name(self.header().name)
    }

    /// Enclosing record
    #[must_use]
    pub fn parent(&self) -> Option<PrimitiveRef<'a>> {
        let image = self.image();
        self.header().parent.map(|id| image.resolve(id))
    }

    fn image(&self) -> &'a MemoryImage {
        match self {
            Self::Type(r) => r.image,
            Self::Enum(r) => r.image,
            Self::Class(r) => r.image,
            Self::TemplateType(r) => r.image,
        }
    }
}

/// Any record that can own other records, borrowed from an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveRef<'a> {
    /// Built-in or opaque type
    Type(Ref<'a, Type>),
    /// Enumeration constant
    EnumConstant(Ref<'a, EnumConstant>),
    /// Enumeration
    Enum(Ref<'a, Enum>),
    /// Field or parameter
    Field(Ref<'a, Field>),
    /// Function or method
    Function(Ref<'a, Function>),
    /// Template instantiation
    TemplateType(Ref<'a, TemplateType>),
    /// Template declaration
    Template(Ref<'a, Template>),
    /// Class or struct
    Class(Ref<'a, Class>),
    /// Namespace
    Namespace(Ref<'a, Namespace>),
}

impl<'a> PrimitiveRef<'a> {
    /// Resolve `id` in `image`
    ///
    /// # Panics
    /// Panics if `id` is outside its arena
    #[must_use]
    pub fn new(image: &'a MemoryImage, id: PrimitiveId) -> Self {
        match id {
            PrimitiveId::Type(id) => Self::Type(Ref::new(image, id)),
            PrimitiveId::EnumConstant(id) => Self::EnumConstant(Ref::new(image, id)),
            PrimitiveId::Enum(id) => Self::Enum(Ref::new(image, id)),
            PrimitiveId::Field(id) => Self::Field(Ref::new(image, id)),
            PrimitiveId::Function(id) => Self::Function(Ref::new(image, id)),
            PrimitiveId::TemplateType(id) => Self::TemplateType(Ref::new(image, id)),
            PrimitiveId::Template(id) => Self::Template(Ref::new(image, id)),
            PrimitiveId::Class(id) => Self::Class(Ref::new(image, id)),
            PrimitiveId::Namespace(id) => Self::Namespace(Ref::new(image, id)),
        }
    }

    fn primitive(&self) -> (&'a MemoryImage, &'a Header) {
        match self {
            Self::Type(r) => (r.image, &r.record.header),
            Self::EnumConstant(r) => (r.image, &r.record.header),
            Self::Enum(r) => (r.image, &r.record.header),
            Self::Field(r) => (r.image, &r.record.header),
            Self::Function(r) => (r.image, &r.record.header),
            Self::TemplateType(r) => (r.image, &r.record.header),
            Self::Template(r) => (r.image, &r.record.header),
            Self::Class(r) => (r.image, &r.record.header),
            Self::Namespace(r) => (r.image, &r.record.header),
        }
    }

    /// Id of the referenced record
    #[must_use]
    pub fn id(&self) -> PrimitiveId {
        match self {
            Self::Type(r) => r.id.into(),
            Self::EnumConstant(r) => r.id.into(),
            Self::Enum(r) => r.id.into(),
            Self::Field(r) => r.id.into(),
            Self::Function(r) => r.id.into(),
            Self::TemplateType(r) => r.id.into(),
            Self::Template(r) => r.id.into(),
            Self::Class(r) => r.id.into(),
            Self::Namespace(r) => r.id.into(),
        }
    }

    /// Shared header
    #[inline]
    #[must_use]
    pub fn header(&self) -> &'a Header {
        self.primitive().1
    }

    /// Record kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.header().kind()
    }

    /// Resolved name
    #[must_use]
    pub fn name(&self) -> Name<'a> {
        let (image, header) = self.primitive();
        image.resolve_name(header.name)
    }

    /// Enclosing record
    #[must_use]
    pub fn parent(&self) -> Option<PrimitiveRef<'a>> {
        let (image, header) = self.primitive();
        header.parent.map(|id| image.resolve(id))
    }

    /// Type-like view, if this is a type
    #[must_use]
    pub fn to_type_ref(self) -> Option<TypeRef<'a>> {
        match self {
            Self::Type(r) => Some(TypeRef::Type(r)),
            Self::Enum(r) => Some(TypeRef::Enum(r)),
            Self::Class(r) => Some(TypeRef::Class(r)),
            Self::TemplateType(r) => Some(TypeRef::TemplateType(r)),
            _ => None,
        }
    }
}

macro_rules! downcasts {
    ($union:ident { $($variant:ident => $as_fn:ident / $to_fn:ident),* $(,)? }) => {
        impl<'a> $union<'a> {
            $(
                #[doc = concat!("Downcast to `", stringify!($variant), "`")]
                ///
                /// # Panics
                /// Panics if the record has a different kind
                #[must_use]
                #[track_caller]
                pub fn $as_fn(self) -> Ref<'a, $variant> {
                    match self {
                        Self::$variant(r) => r,
                        #[allow(unreachable_patterns)]
                        other => kind_mismatch(Kind::$variant, other.kind()),
                    }
                }

                #[doc = concat!("`", stringify!($variant), "`, if this is one")]
                #[must_use]
                pub fn $to_fn(self) -> Option<Ref<'a, $variant>> {
                    match self {
                        Self::$variant(r) => Some(r),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            )*
        }
    };
}

downcasts!(TypeRef {
    Type => as_type / to_type,
    Enum => as_enum / to_enum,
    Class => as_class / to_class,
    TemplateType => as_template_type / to_template_type,
});

downcasts!(PrimitiveRef {
    Type => as_type / to_type,
    EnumConstant => as_enum_constant / to_enum_constant,
    Enum => as_enum / to_enum,
    Field => as_field / to_field,
    Function => as_function / to_function,
    TemplateType => as_template_type / to_template_type,
    Template => as_template / to_template,
    Class => as_class / to_class,
    Namespace => as_namespace / to_namespace,
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;
    use reflect_model::{hash_name, Qualifier};

    fn sample() -> MemoryImage {
        let mut builder = ImageBuilder::new();
        let int = builder.add_type("int", PrimitiveId::ROOT, 4).unwrap();
        let base = builder.add_class("Base", PrimitiveId::ROOT, 4).unwrap();
        let derived = builder.add_class("Derived", PrimitiveId::ROOT, 8).unwrap();
        builder.set_base_class(derived, base).unwrap();
        builder
            .add_field("x", derived, Some(int.into()), Qualifier::VALUE, 4)
            .unwrap();
        let ctor = builder.add_function("Derived::Derived", derived, 0x10, 1).unwrap();
        builder.set_constructor(derived, ctor).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn ref_resolves_names_and_parents() {
        let image = sample();
        let derived = image.get_class(hash_name("Derived")).unwrap();

        assert_eq!(derived.name().as_str(), "Derived");
        assert_eq!(derived.kind(), Kind::Class);
        assert!(derived.parent().unwrap().as_namespace().is_root());
    }

    #[test]
    fn class_links() {
        let image = sample();
        let derived = image.get_class(hash_name("Derived")).unwrap();
        let base = image.get_class(hash_name("Base")).unwrap();

        assert_eq!(derived.base_class(), Some(base));
        assert!(derived.derives_from(base.id()));
        assert!(!base.derives_from(derived.id()));
        assert_eq!(derived.constructor().unwrap().address, 0x10);
        assert!(derived.destructor().is_none());

        let field = derived.find_field(hash_name("x")).unwrap();
        assert_eq!(field.offset, 4);
        assert_eq!(field.field_type().unwrap().name().as_str(), "int");
        assert_eq!(field.modifier(), (Modifier::Value, false));
    }

    #[test]
    fn type_ref_downcast_identity() {
        let image = sample();
        let ty = image.get_type(hash_name("Derived")).unwrap();
        let class = ty.as_class();

        let i = class.id().index();
        assert!(std::ptr::eq(class.record(), &image.classes()[i]));
        assert_eq!(ty.to_enum(), None);
        assert_eq!(ty.id(), TypeId::Class(class.id()));
    }

    #[test]
    #[should_panic(expected = "primitive kind mismatch: expected Enum, found Type")]
    fn type_ref_downcast_mismatch_panics() {
        let image = sample();
        let ty = image.get_type(hash_name("int")).unwrap();
        let _ = ty.as_enum();
    }

    #[test]
    #[should_panic(expected = "primitive kind mismatch: expected Function, found Namespace")]
    fn primitive_ref_downcast_mismatch_panics() {
        let image = sample();
        let _ = image.resolve(PrimitiveId::ROOT).as_function();
    }

    #[test]
    fn refs_iterate_in_hash_order() {
        let image = sample();
        let root = image.root();
        let hashes: Vec<u32> = root.classes().iter().map(|c| c.name().hash).collect();

        let mut sorted = hashes.clone();
        sorted.sort_unstable();
        assert_eq!(hashes, sorted);
        assert_eq!(root.classes().len(), 2);
        assert!(root.find_class(hash_name("Nope")).is_none());
    }
}
