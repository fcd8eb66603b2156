//! Database memory image
//!
//! One aggregate owns every record of a loaded database: one arena per
//! record kind, the id pools that member lists index into, the name and
//! attribute-text blobs, the flattened type index and the root namespace.
//!
//! Every cross-reference is an arena index resolved against this image at
//! query time, so the image carries no addresses and can be moved, encoded
//! and decoded freely. Once built it is never mutated.

use crate::view::{PrimitiveRef, Ref, TypeRef};
use reflect_array::{AllocError, Allocator, ArrayView, OwnedArray};
use reflect_model::{
    hash_name, search_by_key, Attribute, Class, Enum, EnumConstant, Field, Function, Hashed, Id, IdList, Name,
    NameSpan, Namespace, PrimitiveId, Profile, Template, TemplateType, TextSpan, Type, TypeId,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Id pools backing every [`IdList`] in the image, one per target kind
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pools {
    pub(crate) namespaces: OwnedArray<Id<Namespace>>,
    pub(crate) types: OwnedArray<Id<Type>>,
    pub(crate) enum_constants: OwnedArray<Id<EnumConstant>>,
    pub(crate) enums: OwnedArray<Id<Enum>>,
    pub(crate) fields: OwnedArray<Id<Field>>,
    pub(crate) functions: OwnedArray<Id<Function>>,
    pub(crate) template_types: OwnedArray<Id<TemplateType>>,
    pub(crate) templates: OwnedArray<Id<Template>>,
    pub(crate) classes: OwnedArray<Id<Class>>,
    pub(crate) attributes: OwnedArray<Id<Attribute>>,
}

/// The entire storage of one database
///
/// # Invariants
/// - Every arena, the name table and the type index are ascending by name hash
/// - Every id and id list resolves inside this image
/// - Only the root namespace has no parent
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryImage {
    pub(crate) profile: Profile,
    pub(crate) name_blob: String,
    pub(crate) text_blob: String,
    pub(crate) names: OwnedArray<NameSpan>,
    pub(crate) types: OwnedArray<Type>,
    pub(crate) enum_constants: OwnedArray<EnumConstant>,
    pub(crate) enums: OwnedArray<Enum>,
    pub(crate) fields: OwnedArray<Field>,
    pub(crate) functions: OwnedArray<Function>,
    pub(crate) template_types: OwnedArray<TemplateType>,
    pub(crate) templates: OwnedArray<Template>,
    pub(crate) classes: OwnedArray<Class>,
    pub(crate) namespaces: OwnedArray<Namespace>,
    pub(crate) attributes: OwnedArray<Attribute>,
    pub(crate) type_index: OwnedArray<TypeId>,
    pub(crate) pools: Pools,
    pub(crate) root: Namespace,
}

/// Per-kind storage of a [`MemoryImage`]
///
/// Resolving an id that is not in the arena is a contract violation and
/// panics; a validated image never contains one.
pub trait Store<T> {
    /// Arena name used in diagnostics
    const ARRAY: &'static str;

    /// Records of this kind, ascending by name hash
    fn records(&self) -> &[T];

    /// Pool that lists of this kind index into
    fn pool(&self) -> &[Id<T>];

    /// Record for `id`
    ///
    /// # Panics
    /// Panics if `id` is outside the arena
    #[track_caller]
    fn record(&self, id: Id<T>) -> &T {
        let records = self.records();
        match records.get(id.index()) {
            Some(record) => record,
            None => panic!(
                "dangling {} id {} (arena holds {})",
                Self::ARRAY,
                id.raw(),
                records.len()
            ),
        }
    }

    /// Ids covered by `list`
    ///
    /// # Panics
    /// Panics if the list span is outside the pool
    #[track_caller]
    fn ids(&self, list: IdList<T>) -> &[Id<T>] {
        let pool = self.pool();
        match pool.get(list.range()) {
            Some(ids) => ids,
            None => panic!(
                "{} list {:?} exceeds pool of {}",
                Self::ARRAY,
                list,
                pool.len()
            ),
        }
    }
}

macro_rules! impl_store {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Store<$ty> for MemoryImage {
                const ARRAY: &'static str = stringify!($field);

                #[inline]
                fn records(&self) -> &[$ty] {
                    self.$field.as_slice()
                }

                #[inline]
                fn pool(&self) -> &[Id<$ty>] {
                    self.pools.$field.as_slice()
                }
            }
        )*
    };
}

impl_store!(
    Type => types,
    EnumConstant => enum_constants,
    Enum => enums,
    Field => fields,
    Function => functions,
    TemplateType => template_types,
    Template => templates,
    Class => classes,
    Attribute => attributes,
);

impl Store<Namespace> for MemoryImage {
    const ARRAY: &'static str = "namespaces";

    #[inline]
    fn records(&self) -> &[Namespace] {
        self.namespaces.as_slice()
    }

    #[inline]
    fn pool(&self) -> &[Id<Namespace>] {
        self.pools.namespaces.as_slice()
    }

    fn record(&self, id: Id<Namespace>) -> &Namespace {
        if id.is_root() {
            return &self.root;
        }
        match self.namespaces.get(id.index()) {
            Some(record) => record,
            None => panic!(
                "dangling namespaces id {} (arena holds {})",
                id.raw(),
                self.namespaces.len()
            ),
        }
    }
}

impl MemoryImage {
    /// Image with no records but the root namespace
    #[must_use]
    pub fn empty(profile: Profile) -> Self {
        Self {
            profile,
            name_blob: String::new(),
            text_blob: String::new(),
            names: OwnedArray::new(),
            types: OwnedArray::new(),
            enum_constants: OwnedArray::new(),
            enums: OwnedArray::new(),
            fields: OwnedArray::new(),
            functions: OwnedArray::new(),
            template_types: OwnedArray::new(),
            templates: OwnedArray::new(),
            classes: OwnedArray::new(),
            namespaces: OwnedArray::new(),
            attributes: OwnedArray::new(),
            type_index: OwnedArray::new(),
            pools: Pools::default(),
            root: Namespace::root(),
        }
    }

    /// Profile the image was built for
    #[inline]
    #[must_use]
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Raw name blob
    #[inline]
    #[must_use]
    pub fn name_blob(&self) -> &str {
        &self.name_blob
    }

    /// Raw attribute-text blob
    #[inline]
    #[must_use]
    pub fn text_blob(&self) -> &str {
        &self.text_blob
    }

    /// Text of a span in the attribute-text blob
    #[inline]
    #[must_use]
    pub fn text(&self, span: TextSpan) -> Option<&str> {
        span.resolve(&self.text_blob)
    }

    /// Resolve a stored name against the name blob
    #[inline]
    #[must_use]
    pub fn resolve_name(&self, name: NameSpan) -> Name<'_> {
        name.resolve(&self.name_blob)
    }

    /// Name table, ascending by hash
    #[inline]
    #[must_use]
    pub fn names(&self) -> ArrayView<'_, NameSpan> {
        self.names.view()
    }

    /// Plain types
    #[inline]
    #[must_use]
    pub fn types(&self) -> ArrayView<'_, Type> {
        self.types.view()
    }

    /// Enum constants
    #[inline]
    #[must_use]
    pub fn enum_constants(&self) -> ArrayView<'_, EnumConstant> {
        self.enum_constants.view()
    }

    /// Enums
    #[inline]
    #[must_use]
    pub fn enums(&self) -> ArrayView<'_, Enum> {
        self.enums.view()
    }

    /// Fields and parameters
    #[inline]
    #[must_use]
    pub fn fields(&self) -> ArrayView<'_, Field> {
        self.fields.view()
    }

    /// Functions and methods
    #[inline]
    #[must_use]
    pub fn functions(&self) -> ArrayView<'_, Function> {
        self.functions.view()
    }

    /// Template instantiations
    #[inline]
    #[must_use]
    pub fn template_types(&self) -> ArrayView<'_, TemplateType> {
        self.template_types.view()
    }

    /// Templates
    #[inline]
    #[must_use]
    pub fn templates(&self) -> ArrayView<'_, Template> {
        self.templates.view()
    }

    /// Classes
    #[inline]
    #[must_use]
    pub fn classes(&self) -> ArrayView<'_, Class> {
        self.classes.view()
    }

    /// Namespaces, excluding the root
    #[inline]
    #[must_use]
    pub fn namespaces(&self) -> ArrayView<'_, Namespace> {
        self.namespaces.view()
    }

    /// Attributes
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> ArrayView<'_, Attribute> {
        self.attributes.view()
    }

    /// Every type-like record, ascending by name hash
    #[inline]
    #[must_use]
    pub fn type_index(&self) -> ArrayView<'_, TypeId> {
        self.type_index.view()
    }

    /// Name hash of a type-like record
    #[must_use]
    pub fn type_hash(&self, id: TypeId) -> u32 {
        match id {
            TypeId::Type(id) => self.record(id).name_hash(),
            TypeId::Enum(id) => self.record(id).name_hash(),
            TypeId::Class(id) => self.record(id).name_hash(),
            TypeId::TemplateType(id) => self.record(id).name_hash(),
        }
    }

    /// Root namespace
    #[inline]
    #[must_use]
    pub fn root(&self) -> Ref<'_, Namespace> {
        Ref::new(self, Id::<Namespace>::ROOT)
    }

    /// Borrowed view of any record
    #[inline]
    #[must_use]
    pub fn resolve(&self, id: PrimitiveId) -> PrimitiveRef<'_> {
        PrimitiveRef::new(self, id)
    }

    /// Borrowed view of a type-like record
    #[inline]
    #[must_use]
    pub fn resolve_type(&self, id: TypeId) -> TypeRef<'_> {
        TypeRef::new(self, id)
    }

    /// Borrowed view of a record by id
    #[inline]
    #[must_use]
    pub fn get<T>(&self, id: Id<T>) -> Ref<'_, T>
    where
        Self: Store<T>,
    {
        Ref::new(self, id)
    }

    /// Name with this hash, or the empty name
    ///
    /// When distinct names collide on a hash, which of them is returned is
    /// unspecified.
    #[must_use]
    pub fn get_name(&self, hash: u32) -> Name<'_> {
        if hash == 0 {
            return Name::EMPTY;
        }
        let found = search_by_key(self.names.as_slice(), hash, |name| name.hash);
        tracing::trace!(hash, found = found.is_some(), "get_name");
        found.map_or(Name::EMPTY, |i| self.resolve_name(self.names[i]))
    }

    /// Name for this text, or the empty name
    ///
    /// Empty text short-circuits to the empty name.
    #[must_use]
    pub fn get_name_by_text(&self, text: &str) -> Name<'_> {
        match hash_name(text) {
            0 => Name::EMPTY,
            hash => self.get_name(hash),
        }
    }

    /// Type, enum, class or template instantiation with this name hash
    #[must_use]
    pub fn get_type(&self, hash: u32) -> Option<TypeRef<'_>> {
        let found = search_by_key(self.type_index.as_slice(), hash, |id| self.type_hash(*id));
        tracing::trace!(hash, found = found.is_some(), "get_type");
        found.map(|i| self.resolve_type(self.type_index[i]))
    }

    /// Non-root namespace with this name hash
    #[must_use]
    pub fn get_namespace(&self, hash: u32) -> Option<Ref<'_, Namespace>> {
        self.find_record(hash)
    }

    /// Function with this name hash
    #[must_use]
    pub fn get_function(&self, hash: u32) -> Option<Ref<'_, Function>> {
        self.find_record(hash)
    }

    /// Class with this name hash
    #[must_use]
    pub fn get_class(&self, hash: u32) -> Option<Ref<'_, Class>> {
        self.find_record(hash)
    }

    /// Enum with this name hash
    #[must_use]
    pub fn get_enum(&self, hash: u32) -> Option<Ref<'_, Enum>> {
        self.find_record(hash)
    }

    /// Template with this name hash
    #[must_use]
    pub fn get_template(&self, hash: u32) -> Option<Ref<'_, Template>> {
        self.find_record(hash)
    }

    fn find_record<T: Hashed>(&self, hash: u32) -> Option<Ref<'_, T>>
    where
        Self: Store<T>,
    {
        let found = reflect_model::search(<Self as Store<T>>::records(self), hash);
        tracing::trace!(hash, array = <Self as Store<T>>::ARRAY, found = found.is_some(), "find_record");
        found.map(|i| Ref::new(self, Id::from_usize(i)))
    }

    /// Record counts and blob sizes
    #[must_use]
    pub fn stats(&self) -> ImageStats {
        ImageStats {
            profile: self.profile,
            names: self.names.len(),
            types: self.types.len(),
            enum_constants: self.enum_constants.len(),
            enums: self.enums.len(),
            fields: self.fields.len(),
            functions: self.functions.len(),
            template_types: self.template_types.len(),
            templates: self.templates.len(),
            classes: self.classes.len(),
            namespaces: self.namespaces.len(),
            attributes: self.attributes.len(),
            name_bytes: self.name_blob.len(),
            text_bytes: self.text_blob.len(),
            charged_bytes: self.charged_bytes(),
        }
    }

    /// Bytes charged to allocators by the image's arrays
    #[must_use]
    pub fn charged_bytes(&self) -> usize {
        let pools = &self.pools;
        [
            self.names.charged_bytes(),
            self.types.charged_bytes(),
            self.enum_constants.charged_bytes(),
            self.enums.charged_bytes(),
            self.fields.charged_bytes(),
            self.functions.charged_bytes(),
            self.template_types.charged_bytes(),
            self.templates.charged_bytes(),
            self.classes.charged_bytes(),
            self.namespaces.charged_bytes(),
            self.attributes.charged_bytes(),
            self.type_index.charged_bytes(),
            pools.namespaces.charged_bytes(),
            pools.types.charged_bytes(),
            pools.enum_constants.charged_bytes(),
            pools.enums.charged_bytes(),
            pools.fields.charged_bytes(),
            pools.functions.charged_bytes(),
            pools.template_types.charged_bytes(),
            pools.templates.charged_bytes(),
            pools.classes.charged_bytes(),
            pools.attributes.charged_bytes(),
        ]
        .iter()
        .sum()
    }

    /// Re-home every array on `allocator`
    ///
    /// On failure the blocks charged so far are released as the partially
    /// converted arrays drop.
    ///
    /// # Errors
    /// Returns error if the allocator refuses any array
    pub fn charge(self, allocator: &Arc<dyn Allocator>) -> Result<Self, AllocError> {
        let Self {
            profile,
            name_blob,
            text_blob,
            names,
            types,
            enum_constants,
            enums,
            fields,
            functions,
            template_types,
            templates,
            classes,
            namespaces,
            attributes,
            type_index,
            pools,
            root,
        } = self;

        Ok(Self {
            profile,
            name_blob,
            text_blob,
            names: recharge(names, allocator)?,
            types: recharge(types, allocator)?,
            enum_constants: recharge(enum_constants, allocator)?,
            enums: recharge(enums, allocator)?,
            fields: recharge(fields, allocator)?,
            functions: recharge(functions, allocator)?,
            template_types: recharge(template_types, allocator)?,
            templates: recharge(templates, allocator)?,
            classes: recharge(classes, allocator)?,
            namespaces: recharge(namespaces, allocator)?,
            attributes: recharge(attributes, allocator)?,
            type_index: recharge(type_index, allocator)?,
            pools: Pools {
                namespaces: recharge(pools.namespaces, allocator)?,
                types: recharge(pools.types, allocator)?,
                enum_constants: recharge(pools.enum_constants, allocator)?,
                enums: recharge(pools.enums, allocator)?,
                fields: recharge(pools.fields, allocator)?,
                functions: recharge(pools.functions, allocator)?,
                template_types: recharge(pools.template_types, allocator)?,
                templates: recharge(pools.templates, allocator)?,
                classes: recharge(pools.classes, allocator)?,
                attributes: recharge(pools.attributes, allocator)?,
            },
            root,
        })
    }
}

fn recharge<T>(array: OwnedArray<T>, allocator: &Arc<dyn Allocator>) -> Result<OwnedArray<T>, AllocError> {
    OwnedArray::from_vec_in(array.into_vec(), Arc::clone(allocator))
}

/// Record counts and blob sizes of an image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStats {
    /// Profile
    pub profile: Profile,
    /// Distinct names
    pub names: usize,
    /// Plain types
    pub types: usize,
    /// Enum constants
    pub enum_constants: usize,
    /// Enums
    pub enums: usize,
    /// Fields and parameters
    pub fields: usize,
    /// Functions and methods
    pub functions: usize,
    /// Template instantiations
    pub template_types: usize,
    /// Templates
    pub templates: usize,
    /// Classes
    pub classes: usize,
    /// Namespaces excluding the root
    pub namespaces: usize,
    /// Attributes
    pub attributes: usize,
    /// Name blob size
    pub name_bytes: usize,
    /// Attribute-text blob size
    pub text_bytes: usize,
    /// Bytes charged to allocators
    pub charged_bytes: usize,
}

impl ImageStats {
    /// Total records of every kind, excluding the root namespace
    #[must_use]
    pub fn records(&self) -> usize {
        self.types
            + self.enum_constants
            + self.enums
            + self.fields
            + self.functions
            + self.template_types
            + self.templates
            + self.classes
            + self.namespaces
            + self.attributes
    }
}

impl Display for ImageStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "profile:        {}", self.profile)?;
        writeln!(f, "namespaces:     {}", self.namespaces)?;
        writeln!(f, "types:          {}", self.types)?;
        writeln!(f, "enums:          {}", self.enums)?;
        writeln!(f, "enum constants: {}", self.enum_constants)?;
        writeln!(f, "classes:        {}", self.classes)?;
        writeln!(f, "fields:         {}", self.fields)?;
        writeln!(f, "functions:      {}", self.functions)?;
        writeln!(f, "templates:      {}", self.templates)?;
        writeln!(f, "template types: {}", self.template_types)?;
        writeln!(f, "attributes:     {}", self.attributes)?;
        writeln!(f, "names:          {} ({} bytes)", self.names, self.name_bytes)?;
        write!(f, "text:           {} bytes", self.text_bytes)
    }
}
