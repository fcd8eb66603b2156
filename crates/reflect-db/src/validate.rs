//! Structural validation of a memory image
//!
//! Queries trust the image: they assume every id resolves and every array is
//! sorted. Images from untrusted bytes are checked here once, after decoding
//! and before the first query.

use crate::error::ImageError;
use crate::image::{MemoryImage, Store};
use reflect_model::{
    first_unsorted_by, Attribute, Class, Enum, EnumConstant, Field, Function, Hashed, Header, Id, IdList, Kind,
    NameSpan, Namespace, Primitive, PrimitiveId, Profile, Template, TemplateType, TextSpan, Type, TypeId, Variant,
};
use std::collections::HashSet;

impl MemoryImage {
    /// Check sortedness and reference validity of the whole image
    ///
    /// # Errors
    /// Returns the first violation found
    pub fn validate(&self) -> Result<(), ImageError> {
        Validator { image: self }.run()
    }
}

struct Validator<'a> {
    image: &'a MemoryImage,
}

impl Validator<'_> {
    fn run(&self) -> Result<(), ImageError> {
        self.profile()?;
        self.root()?;

        self.arena::<Type>()?;
        self.arena::<EnumConstant>()?;
        self.arena::<Enum>()?;
        self.arena::<Field>()?;
        self.arena::<Function>()?;
        self.arena::<TemplateType>()?;
        self.arena::<Template>()?;
        self.arena::<Class>()?;
        self.arena::<Namespace>()?;
        self.attributes()?;

        let image = self.image;
        let namespaces = image
            .namespaces
            .iter()
            .enumerate()
            .map(|(index, namespace)| (PrimitiveId::Namespace(Id::from_usize(index)), namespace));
        for (owner, namespace) in namespaces.chain(std::iter::once((PrimitiveId::ROOT, &image.root))) {
            self.list(owner, namespace.namespaces)?;
            self.list(owner, namespace.types)?;
            self.list(owner, namespace.enums)?;
            self.list(owner, namespace.classes)?;
            self.list(owner, namespace.functions)?;
            self.list(owner, namespace.templates)?;
        }
        for (index, class) in image.classes.iter().enumerate() {
            let owner = PrimitiveId::Class(Id::from_usize(index));
            self.optional(class.base_class)?;
            self.optional(class.constructor)?;
            self.optional(class.destructor)?;
            self.list(owner, class.enums)?;
            self.list(owner, class.classes)?;
            self.list(owner, class.methods)?;
            self.list(owner, class.fields)?;
            self.list(owner, class.attributes)?;
            self.list(owner, class.templates)?;
        }
        for (index, e) in image.enums.iter().enumerate() {
            let owner = PrimitiveId::Enum(Id::from_usize(index));
            self.list(owner, e.constants)?;
            self.list(owner, e.attributes)?;
        }
        for (index, field) in image.fields.iter().enumerate() {
            if let Some(ty) = field.ty {
                self.type_id(ty)?;
            }
            self.list(PrimitiveId::Field(Id::from_usize(index)), field.attributes)?;
        }
        for (index, function) in image.functions.iter().enumerate() {
            let owner = PrimitiveId::Function(Id::from_usize(index));
            self.list(owner, function.parameters)?;
            self.list(owner, function.attributes)?;
            self.return_parameter(index, function)?;
        }
        for template_type in image.template_types.iter() {
            for ty in template_type.parameter_types.iter().flatten() {
                self.type_id(*ty)?;
            }
        }
        for (index, template) in image.templates.iter().enumerate() {
            self.list(PrimitiveId::Template(Id::from_usize(index)), template.instances)?;
        }

        self.parents()?;
        self.inheritance()?;
        self.type_index()?;
        self.names()
    }

    fn profile(&self) -> Result<(), ImageError> {
        let image = self.image;
        let profile = image.profile;
        if profile == Profile::Full {
            return Ok(());
        }
        let present = [
            (Kind::FlagAttribute, image.attributes.is_empty()),
            (Kind::Template, image.templates.is_empty()),
            (Kind::TemplateType, image.template_types.is_empty()),
        ];
        match present.iter().find(|(kind, empty)| !empty && !profile.allows(*kind)) {
            Some((kind, _)) => Err(ImageError::ProfileViolation { kind: *kind, profile }),
            None => Ok(()),
        }
    }

    fn root(&self) -> Result<(), ImageError> {
        let root = &self.image.root;
        if root.kind() != Kind::Namespace || root.parent().is_some() || !root.name().is_empty() {
            return Err(ImageError::InvalidRoot);
        }
        Ok(())
    }

    fn arena<T>(&self) -> Result<(), ImageError>
    where
        T: Variant + Hashed,
        MemoryImage: Store<T>,
    {
        let records = <MemoryImage as Store<T>>::records(self.image);
        let array = <MemoryImage as Store<T>>::ARRAY;

        for (index, record) in records.iter().enumerate() {
            if record.kind() != T::KIND {
                return Err(ImageError::KindMismatch {
                    array,
                    index,
                    expected: T::KIND,
                    found: record.kind(),
                });
            }
            self.header(record.header(), index)?;
        }
        match first_unsorted_by(records, Hashed::name_hash) {
            Some(index) => Err(ImageError::Unsorted { array, index }),
            None => Ok(()),
        }
    }

    fn attributes(&self) -> Result<(), ImageError> {
        let image = self.image;
        let array = <MemoryImage as Store<Attribute>>::ARRAY;

        for (index, attribute) in image.attributes.iter().enumerate() {
            let expected = match attribute {
                Attribute::Flag(_) => Kind::FlagAttribute,
                Attribute::Int(_) => Kind::IntAttribute,
                Attribute::Float(_) => Kind::FloatAttribute,
                Attribute::Name(a) => {
                    self.name(Kind::NameAttribute, a.value)?;
                    Kind::NameAttribute
                }
                Attribute::Text(a) => {
                    self.text(Kind::TextAttribute, a.value, &image.text_blob)?;
                    Kind::TextAttribute
                }
            };
            if attribute.kind() != expected {
                return Err(ImageError::KindMismatch {
                    array,
                    index,
                    expected,
                    found: attribute.kind(),
                });
            }
            self.header(attribute.header(), index)?;
        }
        match first_unsorted_by(image.attributes.as_slice(), Hashed::name_hash) {
            Some(index) => Err(ImageError::Unsorted { array, index }),
            None => Ok(()),
        }
    }

    fn header(&self, header: &Header, index: usize) -> Result<(), ImageError> {
        let kind = header.kind();
        let Some(parent) = header.parent else {
            return Err(ImageError::MissingParent { kind, index });
        };
        self.primitive_id(parent)?;
        if !kind.allows_parent(parent.kind()) {
            return Err(ImageError::InvalidParent {
                child: kind,
                index,
                parent: parent.kind(),
            });
        }
        self.name(kind, header.name)
    }

    fn name(&self, kind: Kind, name: NameSpan) -> Result<(), ImageError> {
        self.text(kind, name.text, &self.image.name_blob)
    }

    fn text(&self, kind: Kind, span: TextSpan, blob: &str) -> Result<(), ImageError> {
        match span.resolve(blob) {
            Some(_) => Ok(()),
            None => Err(ImageError::TextOutOfBounds {
                kind,
                start: span.start,
                len: span.len,
                blob_len: blob.len(),
            }),
        }
    }

    fn id<T>(&self, id: Id<T>) -> Result<(), ImageError>
    where
        MemoryImage: Store<T>,
    {
        let len = <MemoryImage as Store<T>>::records(self.image).len();
        if id.index() < len {
            Ok(())
        } else {
            Err(ImageError::DanglingId {
                array: <MemoryImage as Store<T>>::ARRAY,
                index: id.raw(),
                len,
            })
        }
    }

    fn optional<T>(&self, id: Option<Id<T>>) -> Result<(), ImageError>
    where
        MemoryImage: Store<T>,
    {
        id.map_or(Ok(()), |id| self.id(id))
    }

    fn type_id(&self, id: TypeId) -> Result<(), ImageError> {
        match id {
            TypeId::Type(id) => self.id(id),
            TypeId::Enum(id) => self.id(id),
            TypeId::Class(id) => self.id(id),
            TypeId::TemplateType(id) => self.id(id),
        }
    }

    fn primitive_id(&self, id: PrimitiveId) -> Result<(), ImageError> {
        match id {
            PrimitiveId::Type(id) => self.id(id),
            PrimitiveId::EnumConstant(id) => self.id(id),
            PrimitiveId::Enum(id) => self.id(id),
            PrimitiveId::Field(id) => self.id(id),
            PrimitiveId::Function(id) => self.id(id),
            PrimitiveId::TemplateType(id) => self.id(id),
            PrimitiveId::Template(id) => self.id(id),
            PrimitiveId::Class(id) => self.id(id),
            PrimitiveId::Namespace(id) if id.is_root() => Ok(()),
            PrimitiveId::Namespace(id) => self.id(id),
        }
    }

    fn list<T: Hashed + Primitive>(&self, owner: PrimitiveId, list: IdList<T>) -> Result<(), ImageError>
    where
        MemoryImage: Store<T>,
    {
        let image = self.image;
        let pool = <MemoryImage as Store<T>>::pool(image);
        let array = <MemoryImage as Store<T>>::ARRAY;

        let Some(ids) = pool.get(list.range()) else {
            return Err(ImageError::ListOutOfBounds {
                pool: array,
                start: list.start(),
                len: u32::try_from(list.len()).unwrap_or(u32::MAX),
                pool_len: pool.len(),
            });
        };
        for &id in ids {
            self.id(id)?;
            if image.record(id).parent() != Some(owner) {
                return Err(ImageError::ForeignMember {
                    owner: owner.kind(),
                    owner_index: owner.raw(),
                    array,
                    index: id.index(),
                });
            }
        }
        match first_unsorted_by(ids, |&id| image.record(id).name_hash()) {
            Some(index) => Err(ImageError::Unsorted { array, index }),
            None => Ok(()),
        }
    }

    fn return_parameter(&self, index: usize, function: &Function) -> Result<(), ImageError> {
        let Some(field) = function.return_parameter else {
            return Ok(());
        };
        self.id(field)?;

        let image = self.image;
        let owner = PrimitiveId::Function(Id::from_usize(index));
        let listed = image.ids(function.parameters).contains(&field);
        if image.record(field).parent() != Some(owner) || listed {
            return Err(ImageError::ForeignReturn { function: index });
        }
        Ok(())
    }

    /// Every parent chain ends at the root namespace
    fn parents(&self) -> Result<(), ImageError> {
        let limit = self.image.stats().records();
        let mut rooted = HashSet::from([PrimitiveId::ROOT]);

        self.chains::<Type>(limit, &mut rooted)?;
        self.chains::<EnumConstant>(limit, &mut rooted)?;
        self.chains::<Enum>(limit, &mut rooted)?;
        self.chains::<Field>(limit, &mut rooted)?;
        self.chains::<Function>(limit, &mut rooted)?;
        self.chains::<TemplateType>(limit, &mut rooted)?;
        self.chains::<Template>(limit, &mut rooted)?;
        self.chains::<Class>(limit, &mut rooted)?;
        self.chains::<Namespace>(limit, &mut rooted)
    }

    fn chains<T>(&self, limit: usize, rooted: &mut HashSet<PrimitiveId>) -> Result<(), ImageError>
    where
        T: Variant,
        MemoryImage: Store<T>,
        Id<T>: Into<PrimitiveId>,
    {
        let mut path = Vec::new();
        for index in 0..<MemoryImage as Store<T>>::records(self.image).len() {
            let mut next: Option<PrimitiveId> = Some(Id::<T>::from_usize(index).into());
            while let Some(id) = next {
                if rooted.contains(&id) {
                    break;
                }
                // More distinct steps than records means the chain repeats.
                if path.len() > limit {
                    break;
                }
                path.push(id);
                next = self.parent_of(id);
            }
            match next {
                Some(id) if rooted.contains(&id) => rooted.extend(path.drain(..)),
                _ => return Err(ImageError::ParentCycle { kind: T::KIND, index }),
            }
        }
        Ok(())
    }

    fn parent_of(&self, id: PrimitiveId) -> Option<PrimitiveId> {
        let image = self.image;
        match id {
            PrimitiveId::Type(id) => image.record(id).parent(),
            PrimitiveId::EnumConstant(id) => image.record(id).parent(),
            PrimitiveId::Enum(id) => image.record(id).parent(),
            PrimitiveId::Field(id) => image.record(id).parent(),
            PrimitiveId::Function(id) => image.record(id).parent(),
            PrimitiveId::TemplateType(id) => image.record(id).parent(),
            PrimitiveId::Template(id) => image.record(id).parent(),
            PrimitiveId::Class(id) => image.record(id).parent(),
            PrimitiveId::Namespace(id) => image.record(id).parent(),
        }
    }

    fn inheritance(&self) -> Result<(), ImageError> {
        let classes = &self.image.classes;
        for (index, class) in classes.iter().enumerate() {
            let mut next = class.base_class;
            let mut steps = 0;
            while let Some(base) = next {
                steps += 1;
                if base.index() == index || steps > classes.len() {
                    return Err(ImageError::InheritanceCycle { index });
                }
                next = classes[base.index()].base_class;
            }
        }
        Ok(())
    }

    fn type_index(&self) -> Result<(), ImageError> {
        let image = self.image;
        for &id in image.type_index.iter() {
            self.type_id(id)?;
        }
        match first_unsorted_by(image.type_index.as_slice(), |&id| image.type_hash(id)) {
            Some(index) => Err(ImageError::Unsorted {
                array: "type index",
                index,
            }),
            None => Ok(()),
        }
    }

    fn names(&self) -> Result<(), ImageError> {
        let names = &self.image.names;
        for name in names.iter() {
            self.text(Kind::Namespace, name.text, &self.image.name_blob)?;
        }
        match first_unsorted_by(names.as_slice(), |name| name.hash) {
            Some(index) => Err(ImageError::Unsorted {
                array: "names",
                index,
            }),
            None => Ok(()),
        }
    }
}
