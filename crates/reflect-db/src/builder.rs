//! Image builder
//!
//! Generator-side construction of a [`MemoryImage`]. Records are added in any
//! order with provisional ids and a parent link; [`ImageBuilder::build`] then
//! produces the query layout:
//!
//! 1. every arena is sorted by name hash (stable, so colliding names keep
//!    insertion order) and every id is remapped
//! 2. member lists are derived from parent links into pooled, hash-sorted spans
//! 3. well-known flag attributes are folded into their owner's bitmask
//! 4. the flattened type index and the name table are built
//! 5. arrays are charged to the allocator, if any, and the image is validated
//!
//! Ids returned by the `add_*` methods are only meaningful to this builder.

use crate::error::BuildError;
use crate::image::{MemoryImage, Pools};
use reflect_array::{Allocator, OwnedArray};
use reflect_model::{
    hash_name, Attribute, Class, Enum, EnumConstant, Field, FlagBits, Function, Hashed, Id, IdList, Kind,
    NameSpan, Namespace, Primitive, PrimitiveId, Profile, Qualifier, Template, TemplateType, TextSpan, Type,
    TypeId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Name as given to the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameInput<'a> {
    /// Text; the hash is computed with [`hash_name`]
    Text(&'a str),
    /// Text with a precomputed hash
    Hashed(u32, &'a str),
}

impl<'a> NameInput<'a> {
    /// Hash and text
    #[must_use]
    pub fn resolve(self) -> (u32, &'a str) {
        match self {
            Self::Text(text) => (hash_name(text), text),
            Self::Hashed(hash, text) => (hash, text),
        }
    }
}

impl<'a> From<&'a str> for NameInput<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for NameInput<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<(u32, &'a str)> for NameInput<'a> {
    fn from((hash, text): (u32, &'a str)) -> Self {
        Self::Hashed(hash, text)
    }
}

/// Builds a validated [`MemoryImage`]
#[derive(Debug, Default)]
pub struct ImageBuilder {
    profile: Profile,
    allocator: Option<Arc<dyn Allocator>>,
    name_blob: String,
    name_spans: HashMap<String, TextSpan>,
    names: Vec<NameSpan>,
    seen_names: HashSet<NameSpan>,
    text_blob: String,
    text_spans: HashMap<String, TextSpan>,
    types: Vec<Type>,
    enum_constants: Vec<EnumConstant>,
    enums: Vec<Enum>,
    fields: Vec<Field>,
    functions: Vec<Function>,
    template_types: Vec<TemplateType>,
    templates: Vec<Template>,
    classes: Vec<Class>,
    namespaces: Vec<Namespace>,
    attributes: Vec<Attribute>,
}

impl ImageBuilder {
    /// Create builder for the full profile
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With profile; the reduced profile rejects attributes and templates
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// With allocator charged for every array of the built image
    #[inline]
    #[must_use]
    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Profile
    #[inline]
    #[must_use]
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Intern a name; equal texts share one span of the name blob
    ///
    /// # Errors
    /// Returns error if the name blob outgrows 32-bit offsets
    pub fn intern_name<'n>(&mut self, name: impl Into<NameInput<'n>>) -> Result<NameSpan, BuildError> {
        let (hash, text) = name.into().resolve();
        if hash == 0 && text.is_empty() {
            return Ok(NameSpan::EMPTY);
        }
        let span = intern(&mut self.name_blob, &mut self.name_spans, text, "name bytes")?;
        let name = NameSpan::new(hash, span);
        if self.seen_names.insert(name) {
            self.names.push(name);
        }
        Ok(name)
    }

    /// Add namespace
    ///
    /// # Errors
    /// Returns error if the parent is unknown or not a namespace
    pub fn add_namespace<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        parent: impl Into<PrimitiveId>,
    ) -> Result<Id<Namespace>, BuildError> {
        let parent = self.check_parent(Kind::Namespace, parent.into())?;
        let name = self.intern_name(name)?;
        Ok(push(&mut self.namespaces, Namespace::new(name, Some(parent))))
    }

    /// Add built-in or opaque type
    ///
    /// # Errors
    /// Returns error if the parent is unknown or not a namespace
    pub fn add_type<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        parent: impl Into<PrimitiveId>,
        size: u32,
    ) -> Result<Id<Type>, BuildError> {
        let parent = self.check_parent(Kind::Type, parent.into())?;
        let name = self.intern_name(name)?;
        Ok(push(&mut self.types, Type::new(name, Some(parent), size)))
    }

    /// Add enum
    ///
    /// # Errors
    /// Returns error if the parent is unknown or cannot own enums
    pub fn add_enum<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        parent: impl Into<PrimitiveId>,
        size: u32,
    ) -> Result<Id<Enum>, BuildError> {
        let parent = self.check_parent(Kind::Enum, parent.into())?;
        let name = self.intern_name(name)?;
        Ok(push(&mut self.enums, Enum::new(name, Some(parent), size)))
    }

    /// Add enum constant
    ///
    /// # Errors
    /// Returns error if the parent is unknown or not an enum
    pub fn add_enum_constant<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        parent: impl Into<PrimitiveId>,
        value: i32,
    ) -> Result<Id<EnumConstant>, BuildError> {
        let parent = self.check_parent(Kind::EnumConstant, parent.into())?;
        let name = self.intern_name(name)?;
        Ok(push(&mut self.enum_constants, EnumConstant::new(name, Some(parent), value)))
    }

    /// Add class
    ///
    /// # Errors
    /// Returns error if the parent is unknown or cannot own classes
    pub fn add_class<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        parent: impl Into<PrimitiveId>,
        size: u32,
    ) -> Result<Id<Class>, BuildError> {
        let parent = self.check_parent(Kind::Class, parent.into())?;
        let name = self.intern_name(name)?;
        Ok(push(&mut self.classes, Class::new(name, Some(parent), size)))
    }

    /// Set the base class of `class`
    ///
    /// # Errors
    /// Returns error if either class is unknown
    pub fn set_base_class(&mut self, class: Id<Class>, base: Id<Class>) -> Result<(), BuildError> {
        self.check_id(base.into())?;
        self.class_mut(class)?.base_class = Some(base);
        Ok(())
    }

    /// Set the constructor of `class`
    ///
    /// # Errors
    /// Returns error if the class or function is unknown
    pub fn set_constructor(&mut self, class: Id<Class>, function: Id<Function>) -> Result<(), BuildError> {
        self.check_id(function.into())?;
        self.class_mut(class)?.constructor = Some(function);
        Ok(())
    }

    /// Set the destructor of `class`
    ///
    /// # Errors
    /// Returns error if the class or function is unknown
    pub fn set_destructor(&mut self, class: Id<Class>, function: Id<Function>) -> Result<(), BuildError> {
        self.check_id(function.into())?;
        self.class_mut(class)?.destructor = Some(function);
        Ok(())
    }

    /// Add field of a class, or parameter of a function
    ///
    /// For parameters `offset` is the parameter index and the owning
    /// function's unique id is recorded on the field.
    ///
    /// # Errors
    /// Returns error if the parent or type is unknown, or the parent is
    /// neither a class nor a function
    pub fn add_field<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        parent: impl Into<PrimitiveId>,
        ty: Option<TypeId>,
        qualifier: Qualifier,
        offset: i32,
    ) -> Result<Id<Field>, BuildError> {
        let parent = self.check_parent(Kind::Field, parent.into())?;
        if let Some(ty) = ty {
            self.check_id(ty.into())?;
        }
        let name = self.intern_name(name)?;
        let mut field = Field::new(name, Some(parent), ty, qualifier, offset);
        if let PrimitiveId::Function(function) = parent {
            field.parent_unique_id = self.functions[function.index()].unique_id;
        }
        Ok(push(&mut self.fields, field))
    }

    /// Add parameter `index` of `function`
    ///
    /// # Errors
    /// Returns error if the function or type is unknown
    pub fn add_parameter<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        function: Id<Function>,
        ty: Option<TypeId>,
        qualifier: Qualifier,
        index: i32,
    ) -> Result<Id<Field>, BuildError> {
        self.add_field(name, function, ty, qualifier, index)
    }

    /// Set the return value of `function`
    ///
    /// The return value is a field named `return` owned by the function; it
    /// is not listed among the parameters.
    ///
    /// # Errors
    /// Returns error if the function or type is unknown, or the function
    /// already has a return value
    pub fn set_return(
        &mut self,
        function: Id<Function>,
        ty: TypeId,
        qualifier: Qualifier,
    ) -> Result<Id<Field>, BuildError> {
        self.check_id(function.into())?;
        if self.functions[function.index()].return_parameter.is_some() {
            return Err(BuildError::ReturnAlreadySet { function: function.raw() });
        }
        let field = self.add_field("return", function, Some(ty), qualifier, -1)?;
        self.functions[function.index()].return_parameter = Some(field);
        Ok(field)
    }

    /// Add function, or method when the parent is a class
    ///
    /// # Errors
    /// Returns error if the parent is unknown or cannot own functions
    pub fn add_function<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        parent: impl Into<PrimitiveId>,
        address: u32,
        unique_id: u32,
    ) -> Result<Id<Function>, BuildError> {
        let parent = self.check_parent(Kind::Function, parent.into())?;
        let name = self.intern_name(name)?;
        Ok(push(
            &mut self.functions,
            Function::new(name, Some(parent), address, unique_id),
        ))
    }

    /// Add template declaration
    ///
    /// # Errors
    /// Returns error if the parent is unknown or cannot own templates, or
    /// the profile excludes templates
    pub fn add_template<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        parent: impl Into<PrimitiveId>,
    ) -> Result<Id<Template>, BuildError> {
        self.check_profile(Kind::Template)?;
        let parent = self.check_parent(Kind::Template, parent.into())?;
        let name = self.intern_name(name)?;
        Ok(push(&mut self.templates, Template::new(name, Some(parent))))
    }

    /// Add instantiation of `template` with `(type, is_pointer)` arguments
    ///
    /// # Errors
    /// Returns error if the template or an argument type is unknown, there
    /// are more than [`TemplateType::MAX_ARGS`] arguments, or the profile
    /// excludes templates
    pub fn add_template_type<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        template: Id<Template>,
        size: u32,
        arguments: &[(TypeId, bool)],
    ) -> Result<Id<TemplateType>, BuildError> {
        self.check_profile(Kind::TemplateType)?;
        let parent = self.check_parent(Kind::TemplateType, template.into())?;
        let name = name.into();
        if arguments.len() > TemplateType::MAX_ARGS {
            return Err(BuildError::TooManyTemplateArgs {
                name: name.resolve().1.to_string(),
                count: arguments.len(),
                max: TemplateType::MAX_ARGS,
            });
        }
        for (ty, _) in arguments {
            self.check_id((*ty).into())?;
        }

        let name = self.intern_name(name)?;
        let mut record = TemplateType::new(name, Some(parent), size);
        for (slot, (ty, is_ptr)) in arguments.iter().enumerate() {
            record.parameter_types[slot] = Some(*ty);
            record.parameter_ptrs[slot] = *is_ptr;
        }
        Ok(push(&mut self.template_types, record))
    }

    /// Add flag attribute; `transient` and `nullstr` also set the owner's flag bits
    ///
    /// # Errors
    /// Returns error if the owner is unknown or cannot carry attributes, or
    /// the profile excludes attributes
    pub fn add_flag_attribute<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        owner: impl Into<PrimitiveId>,
    ) -> Result<Id<Attribute>, BuildError> {
        let owner = self.check_attribute_owner(Kind::FlagAttribute, owner.into())?;
        let name = self.intern_name(name)?;
        Ok(push(&mut self.attributes, Attribute::flag(name, Some(owner))))
    }

    /// Add integer attribute
    ///
    /// # Errors
    /// Returns error if the owner is unknown or cannot carry attributes, or
    /// the profile excludes attributes
    pub fn add_int_attribute<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        owner: impl Into<PrimitiveId>,
        value: i32,
    ) -> Result<Id<Attribute>, BuildError> {
        let owner = self.check_attribute_owner(Kind::IntAttribute, owner.into())?;
        let name = self.intern_name(name)?;
        Ok(push(&mut self.attributes, Attribute::int(name, Some(owner), value)))
    }

    /// Add float attribute
    ///
    /// # Errors
    /// Returns error if the owner is unknown or cannot carry attributes, or
    /// the profile excludes attributes
    pub fn add_float_attribute<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        owner: impl Into<PrimitiveId>,
        value: f32,
    ) -> Result<Id<Attribute>, BuildError> {
        let owner = self.check_attribute_owner(Kind::FloatAttribute, owner.into())?;
        let name = self.intern_name(name)?;
        Ok(push(&mut self.attributes, Attribute::float(name, Some(owner), value)))
    }

    /// Add attribute whose value is a name
    ///
    /// # Errors
    /// Returns error if the owner is unknown or cannot carry attributes, or
    /// the profile excludes attributes
    pub fn add_name_attribute<'n, 'v>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        owner: impl Into<PrimitiveId>,
        value: impl Into<NameInput<'v>>,
    ) -> Result<Id<Attribute>, BuildError> {
        let owner = self.check_attribute_owner(Kind::NameAttribute, owner.into())?;
        let name = self.intern_name(name)?;
        let value = self.intern_name(value)?;
        Ok(push(
            &mut self.attributes,
            Attribute::name_value(name, Some(owner), value),
        ))
    }

    /// Add attribute whose value is free text
    ///
    /// # Errors
    /// Returns error if the owner is unknown or cannot carry attributes, or
    /// the profile excludes attributes
    pub fn add_text_attribute<'n>(
        &mut self,
        name: impl Into<NameInput<'n>>,
        owner: impl Into<PrimitiveId>,
        text: &str,
    ) -> Result<Id<Attribute>, BuildError> {
        let owner = self.check_attribute_owner(Kind::TextAttribute, owner.into())?;
        let name = self.intern_name(name)?;
        let value = intern(&mut self.text_blob, &mut self.text_spans, text, "attribute text bytes")?;
        Ok(push(&mut self.attributes, Attribute::text(name, Some(owner), value)))
    }

    fn check_profile(&self, kind: Kind) -> Result<(), BuildError> {
        if self.profile.allows(kind) {
            Ok(())
        } else {
            Err(BuildError::ProfileViolation {
                kind,
                profile: self.profile,
            })
        }
    }

    fn check_parent(&self, child: Kind, parent: PrimitiveId) -> Result<PrimitiveId, BuildError> {
        self.check_id(parent)?;
        if child.allows_parent(parent.kind()) {
            Ok(parent)
        } else {
            Err(BuildError::InvalidParent {
                child,
                parent: parent.kind(),
            })
        }
    }

    fn check_attribute_owner(&self, kind: Kind, owner: PrimitiveId) -> Result<PrimitiveId, BuildError> {
        self.check_profile(kind)?;
        self.check_parent(kind, owner)
    }

    fn check_id(&self, id: PrimitiveId) -> Result<(), BuildError> {
        let (index, len) = match id {
            PrimitiveId::Namespace(id) if id.is_root() => return Ok(()),
            PrimitiveId::Namespace(id) => (id.raw(), self.namespaces.len()),
            PrimitiveId::Type(id) => (id.raw(), self.types.len()),
            PrimitiveId::EnumConstant(id) => (id.raw(), self.enum_constants.len()),
            PrimitiveId::Enum(id) => (id.raw(), self.enums.len()),
            PrimitiveId::Field(id) => (id.raw(), self.fields.len()),
            PrimitiveId::Function(id) => (id.raw(), self.functions.len()),
            PrimitiveId::TemplateType(id) => (id.raw(), self.template_types.len()),
            PrimitiveId::Template(id) => (id.raw(), self.templates.len()),
            PrimitiveId::Class(id) => (id.raw(), self.classes.len()),
        };
        if (index as usize) < len {
            Ok(())
        } else {
            Err(BuildError::UnknownId {
                kind: id.kind(),
                index,
            })
        }
    }

    fn class_mut(&mut self, class: Id<Class>) -> Result<&mut Class, BuildError> {
        self.classes.get_mut(class.index()).ok_or(BuildError::UnknownId {
            kind: Kind::Class,
            index: class.raw(),
        })
    }

    /// Sort, remap, derive lists and produce the validated image
    ///
    /// # Errors
    /// Returns error if a count overflows 32-bit indices, the allocator
    /// refuses storage, or the result fails validation
    pub fn build(self) -> Result<MemoryImage, BuildError> {
        let Self {
            profile,
            allocator,
            name_blob,
            mut names,
            text_blob,
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
            ..
        } = self;

        // Sort every arena by hash and remap ids to the new positions.
        let remap = Remap {
            types: sort_order(&types),
            enum_constants: sort_order(&enum_constants),
            enums: sort_order(&enums),
            fields: sort_order(&fields),
            functions: sort_order(&functions),
            template_types: sort_order(&template_types),
            templates: sort_order(&templates),
            classes: sort_order(&classes),
            namespaces: sort_order(&namespaces),
            attributes: sort_order(&attributes),
        };

        let mut types = permute(types, &remap.types);
        let mut enum_constants = permute(enum_constants, &remap.enum_constants);
        let mut enums = permute(enums, &remap.enums);
        let mut fields = permute(fields, &remap.fields);
        let mut functions = permute(functions, &remap.functions);
        let mut template_types = permute(template_types, &remap.template_types);
        let mut templates = permute(templates, &remap.templates);
        let mut classes = permute(classes, &remap.classes);
        let mut namespaces = permute(namespaces, &remap.namespaces);
        let mut attributes = permute(attributes, &remap.attributes);

        for record in &mut types {
            remap.header(&mut record.header.parent);
        }
        for record in &mut enum_constants {
            remap.header(&mut record.header.parent);
        }
        for record in &mut enums {
            remap.header(&mut record.header.parent);
        }
        for record in &mut fields {
            remap.header(&mut record.header.parent);
            record.ty = record.ty.map(|ty| remap.type_id(ty));
        }
        for record in &mut functions {
            remap.header(&mut record.header.parent);
            record.return_parameter = record.return_parameter.map(|id| remapped(&remap.fields, id));
        }
        for record in &mut template_types {
            remap.header(&mut record.header.parent);
            for ty in record.parameter_types.iter_mut().flatten() {
                *ty = remap.type_id(*ty);
            }
        }
        for record in &mut templates {
            remap.header(&mut record.header.parent);
        }
        for record in &mut classes {
            remap.header(&mut record.header.parent);
            record.base_class = record.base_class.map(|id| remapped(&remap.classes, id));
            record.constructor = record.constructor.map(|id| remapped(&remap.functions, id));
            record.destructor = record.destructor.map(|id| remapped(&remap.functions, id));
        }
        for record in &mut namespaces {
            remap.header(&mut record.header.parent);
        }
        for record in &mut attributes {
            remap.header(&mut record.header_mut().parent);
        }
        tracing::debug!(
            types = types.len(),
            enums = enums.len(),
            classes = classes.len(),
            functions = functions.len(),
            fields = fields.len(),
            namespaces = namespaces.len(),
            "sorted and remapped arenas"
        );

        // Derive member lists from parent links. Children are visited in
        // arena order, so every list comes out sorted by hash.
        let mut pools = PoolBuilder::default();
        let root_slot = namespaces.len();
        let owners_ns = namespaces.len() + 1;

        let ns_namespaces = group(&mut pools.namespaces, &parent_links(&namespaces), Kind::Namespace, owners_ns, root_slot)?;
        let ns_types = group(&mut pools.types, &parent_links(&types), Kind::Namespace, owners_ns, root_slot)?;
        let enum_parents = parent_links(&enums);
        let ns_enums = group(&mut pools.enums, &enum_parents, Kind::Namespace, owners_ns, root_slot)?;
        let class_enums = group(&mut pools.enums, &enum_parents, Kind::Class, classes.len(), 0)?;
        let class_parents = parent_links(&classes);
        let ns_classes = group(&mut pools.classes, &class_parents, Kind::Namespace, owners_ns, root_slot)?;
        let class_classes = group(&mut pools.classes, &class_parents, Kind::Class, classes.len(), 0)?;
        let function_parents = parent_links(&functions);
        let ns_functions = group(&mut pools.functions, &function_parents, Kind::Namespace, owners_ns, root_slot)?;
        let class_methods = group(&mut pools.functions, &function_parents, Kind::Class, classes.len(), 0)?;
        let template_parents = parent_links(&templates);
        let ns_templates = group(&mut pools.templates, &template_parents, Kind::Namespace, owners_ns, root_slot)?;
        let class_templates = group(&mut pools.templates, &template_parents, Kind::Class, classes.len(), 0)?;

        // Return values are owned by their function but are not parameters.
        let field_parents: Vec<Option<PrimitiveId>> = fields
            .iter()
            .enumerate()
            .map(|(index, field)| match field.header.parent {
                Some(PrimitiveId::Function(f)) if functions[f.index()].return_parameter == Some(Id::from_usize(index)) => {
                    None
                }
                parent => parent,
            })
            .collect();
        let class_fields = group(&mut pools.fields, &field_parents, Kind::Class, classes.len(), 0)?;
        let function_parameters = group(&mut pools.fields, &field_parents, Kind::Function, functions.len(), 0)?;

        let constant_parents = parent_links(&enum_constants);
        let enum_constants_lists = group(&mut pools.enum_constants, &constant_parents, Kind::Enum, enums.len(), 0)?;
        let instance_parents = parent_links(&template_types);
        let template_instances = group(&mut pools.template_types, &instance_parents, Kind::Template, templates.len(), 0)?;

        let attribute_parents = parent_links(&attributes);
        let enum_attributes = group(&mut pools.attributes, &attribute_parents, Kind::Enum, enums.len(), 0)?;
        let field_attributes = group(&mut pools.attributes, &attribute_parents, Kind::Field, fields.len(), 0)?;
        let function_attributes = group(&mut pools.attributes, &attribute_parents, Kind::Function, functions.len(), 0)?;
        let class_attributes = group(&mut pools.attributes, &attribute_parents, Kind::Class, classes.len(), 0)?;

        let mut root = Namespace::root();
        for (slot, namespace) in namespaces.iter_mut().chain(std::iter::once(&mut root)).enumerate() {
            namespace.namespaces = ns_namespaces[slot];
            namespace.types = ns_types[slot];
            namespace.enums = ns_enums[slot];
            namespace.classes = ns_classes[slot];
            namespace.functions = ns_functions[slot];
            namespace.templates = ns_templates[slot];
        }
        for (slot, class) in classes.iter_mut().enumerate() {
            class.enums = class_enums[slot];
            class.classes = class_classes[slot];
            class.methods = class_methods[slot];
            class.fields = class_fields[slot];
            class.templates = class_templates[slot];
            class.attributes = class_attributes[slot];
        }
        for (slot, function) in functions.iter_mut().enumerate() {
            function.parameters = function_parameters[slot];
            function.attributes = function_attributes[slot];
        }
        for (slot, e) in enums.iter_mut().enumerate() {
            e.constants = enum_constants_lists[slot];
            e.attributes = enum_attributes[slot];
        }
        for (slot, field) in fields.iter_mut().enumerate() {
            field.attributes = field_attributes[slot];
        }
        for (slot, template) in templates.iter_mut().enumerate() {
            template.instances = template_instances[slot];
        }

        // Fold well-known flag attributes into their owner's bitmask.
        for attribute in &attributes {
            let bit = attribute.flag_bit();
            if bit.is_empty() {
                continue;
            }
            match attribute.parent() {
                Some(PrimitiveId::Enum(id)) => enums[id.index()].flag_attributes |= bit,
                Some(PrimitiveId::Field(id)) => fields[id.index()].flag_attributes |= bit,
                Some(PrimitiveId::Function(id)) => functions[id.index()].flag_attributes |= bit,
                Some(PrimitiveId::Class(id)) => classes[id.index()].flag_attributes |= bit,
                _ => {}
            }
        }

        // Flattened index over every type-like record.
        let mut type_index: Vec<(u32, TypeId)> = Vec::with_capacity(
            types.len() + enums.len() + classes.len() + template_types.len(),
        );
        type_index.extend(keyed(&types).map(|(hash, id)| (hash, TypeId::Type(id))));
        type_index.extend(keyed(&enums).map(|(hash, id)| (hash, TypeId::Enum(id))));
        type_index.extend(keyed(&classes).map(|(hash, id)| (hash, TypeId::Class(id))));
        type_index.extend(keyed(&template_types).map(|(hash, id)| (hash, TypeId::TemplateType(id))));
        type_index.sort_by_key(|(hash, _)| *hash);

        names.retain(|name| !name.is_empty());
        names.sort_by_key(|name| name.hash);
        tracing::debug!(
            names = names.len(),
            name_bytes = name_blob.len(),
            type_index = type_index.len(),
            "built name table and type index"
        );

        let alloc = allocator.as_ref();
        let image = MemoryImage {
            profile,
            name_blob,
            text_blob,
            names: OwnedArray::from_vec_with(names, alloc)?,
            types: OwnedArray::from_vec_with(types, alloc)?,
            enum_constants: OwnedArray::from_vec_with(enum_constants, alloc)?,
            enums: OwnedArray::from_vec_with(enums, alloc)?,
            fields: OwnedArray::from_vec_with(fields, alloc)?,
            functions: OwnedArray::from_vec_with(functions, alloc)?,
            template_types: OwnedArray::from_vec_with(template_types, alloc)?,
            templates: OwnedArray::from_vec_with(templates, alloc)?,
            classes: OwnedArray::from_vec_with(classes, alloc)?,
            namespaces: OwnedArray::from_vec_with(namespaces, alloc)?,
            attributes: OwnedArray::from_vec_with(attributes, alloc)?,
            type_index: OwnedArray::from_vec_with(type_index.into_iter().map(|(_, id)| id).collect(), alloc)?,
            pools: pools.finish(alloc)?,
            root,
        };
        image.validate()?;
        Ok(image)
    }
}

fn push<T>(records: &mut Vec<T>, record: T) -> Id<T> {
    let id = Id::from_usize(records.len());
    records.push(record);
    id
}

fn intern(
    blob: &mut String,
    spans: &mut HashMap<String, TextSpan>,
    text: &str,
    what: &'static str,
) -> Result<TextSpan, BuildError> {
    if let Some(span) = spans.get(text) {
        return Ok(*span);
    }
    let overflow = || BuildError::Overflow { what };
    let start = u32::try_from(blob.len()).map_err(|_| overflow())?;
    let len = u32::try_from(text.len()).map_err(|_| overflow())?;
    start.checked_add(len).ok_or_else(overflow)?;

    blob.push_str(text);
    let span = TextSpan::new(start, len);
    spans.insert(text.to_string(), span);
    Ok(span)
}

/// Old index to new index after a stable sort by hash
fn sort_order<T: Hashed>(records: &[T]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&i| records[i].name_hash());

    let mut remap = vec![0u32; records.len()];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = Id::<T>::from_usize(new).raw();
    }
    remap
}

/// Move records to their new positions
fn permute<T>(records: Vec<T>, remap: &[u32]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(records.len()).collect();
    for (old, record) in records.into_iter().enumerate() {
        slots[remap[old] as usize] = Some(record);
    }
    slots.into_iter().flatten().collect()
}

fn parent_links<T: Primitive>(records: &[T]) -> Vec<Option<PrimitiveId>> {
    records.iter().map(T::parent).collect()
}

fn keyed<T: Hashed>(records: &[T]) -> impl Iterator<Item = (u32, Id<T>)> + '_ {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.name_hash(), Id::from_usize(index)))
}

/// Slot of the owner of a child, when the child's parent has kind `owner`
fn owner_slot(parent: Option<PrimitiveId>, owner: Kind, root_slot: usize) -> Option<usize> {
    let parent = parent?;
    if parent.kind() != owner {
        return None;
    }
    let index = match parent {
        PrimitiveId::Namespace(id) if id.is_root() => return Some(root_slot),
        PrimitiveId::Namespace(id) => id.index(),
        PrimitiveId::Type(id) => id.index(),
        PrimitiveId::EnumConstant(id) => id.index(),
        PrimitiveId::Enum(id) => id.index(),
        PrimitiveId::Field(id) => id.index(),
        PrimitiveId::Function(id) => id.index(),
        PrimitiveId::TemplateType(id) => id.index(),
        PrimitiveId::Template(id) => id.index(),
        PrimitiveId::Class(id) => id.index(),
    };
    Some(index)
}

/// Group children under owners of one kind and append the groups to `pool`
fn group<C>(
    pool: &mut Vec<Id<C>>,
    parents: &[Option<PrimitiveId>],
    owner: Kind,
    owners: usize,
    root_slot: usize,
) -> Result<Vec<IdList<C>>, BuildError> {
    let mut buckets: Vec<Vec<Id<C>>> = vec![Vec::new(); owners];
    for (child, parent) in parents.iter().enumerate() {
        if let Some(slot) = owner_slot(*parent, owner, root_slot) {
            buckets[slot].push(Id::from_usize(child));
        }
    }

    let overflow = || BuildError::Overflow { what: "pooled ids" };
    buckets
        .into_iter()
        .map(|ids| {
            let start = u32::try_from(pool.len()).map_err(|_| overflow())?;
            let len = u32::try_from(ids.len()).map_err(|_| overflow())?;
            pool.extend(ids);
            Ok(IdList::new(start, len))
        })
        .collect()
}

fn remapped<T>(table: &[u32], id: Id<T>) -> Id<T> {
    Id::new(table[id.index()])
}

/// New positions per arena, indexed by old position
struct Remap {
    types: Vec<u32>,
    enum_constants: Vec<u32>,
    enums: Vec<u32>,
    fields: Vec<u32>,
    functions: Vec<u32>,
    template_types: Vec<u32>,
    templates: Vec<u32>,
    classes: Vec<u32>,
    namespaces: Vec<u32>,
    attributes: Vec<u32>,
}

impl Remap {
    fn type_id(&self, id: TypeId) -> TypeId {
        match id {
            TypeId::Type(id) => TypeId::Type(remapped(&self.types, id)),
            TypeId::Enum(id) => TypeId::Enum(remapped(&self.enums, id)),
            TypeId::Class(id) => TypeId::Class(remapped(&self.classes, id)),
            TypeId::TemplateType(id) => TypeId::TemplateType(remapped(&self.template_types, id)),
        }
    }

    fn primitive(&self, id: PrimitiveId) -> PrimitiveId {
        match id {
            PrimitiveId::Namespace(id) if id.is_root() => PrimitiveId::ROOT,
            PrimitiveId::Namespace(id) => PrimitiveId::Namespace(remapped(&self.namespaces, id)),
            PrimitiveId::Type(id) => PrimitiveId::Type(remapped(&self.types, id)),
            PrimitiveId::EnumConstant(id) => PrimitiveId::EnumConstant(remapped(&self.enum_constants, id)),
            PrimitiveId::Enum(id) => PrimitiveId::Enum(remapped(&self.enums, id)),
            PrimitiveId::Field(id) => PrimitiveId::Field(remapped(&self.fields, id)),
            PrimitiveId::Function(id) => PrimitiveId::Function(remapped(&self.functions, id)),
            PrimitiveId::TemplateType(id) => PrimitiveId::TemplateType(remapped(&self.template_types, id)),
            PrimitiveId::Template(id) => PrimitiveId::Template(remapped(&self.templates, id)),
            PrimitiveId::Class(id) => PrimitiveId::Class(remapped(&self.classes, id)),
        }
    }

    fn header(&self, parent: &mut Option<PrimitiveId>) {
        *parent = parent.map(|id| self.primitive(id));
    }
}

/// Pools under construction
#[derive(Default)]
struct PoolBuilder {
    namespaces: Vec<Id<Namespace>>,
    types: Vec<Id<Type>>,
    enum_constants: Vec<Id<EnumConstant>>,
    enums: Vec<Id<Enum>>,
    fields: Vec<Id<Field>>,
    functions: Vec<Id<Function>>,
    template_types: Vec<Id<TemplateType>>,
    templates: Vec<Id<Template>>,
    classes: Vec<Id<Class>>,
    attributes: Vec<Id<Attribute>>,
}

impl PoolBuilder {
    fn finish(self, alloc: Option<&Arc<dyn Allocator>>) -> Result<Pools, BuildError> {
        Ok(Pools {
            namespaces: OwnedArray::from_vec_with(self.namespaces, alloc)?,
            types: OwnedArray::from_vec_with(self.types, alloc)?,
            enum_constants: OwnedArray::from_vec_with(self.enum_constants, alloc)?,
            enums: OwnedArray::from_vec_with(self.enums, alloc)?,
            fields: OwnedArray::from_vec_with(self.fields, alloc)?,
            functions: OwnedArray::from_vec_with(self.functions, alloc)?,
            template_types: OwnedArray::from_vec_with(self.template_types, alloc)?,
            templates: OwnedArray::from_vec_with(self.templates, alloc)?,
            classes: OwnedArray::from_vec_with(self.classes, alloc)?,
            attributes: OwnedArray::from_vec_with(self.attributes, alloc)?,
        })
    }
}
