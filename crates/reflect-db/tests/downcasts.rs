//! Downcast safety
//!
//! Casting a record to its own kind yields the same record; any other kind
//! is a fatal contract violation.

use reflect_db::{MemoryImage, PrimitiveRef};
use reflect_model::{hash_name, Id, Kind, PrimitiveId, TypeId};
use reflect_test_utils::sample_image;
use std::ptr;

fn every_primitive(image: &MemoryImage) -> Vec<PrimitiveId> {
    let mut ids: Vec<PrimitiveId> = vec![PrimitiveId::ROOT];
    ids.extend((0..image.types().len()).map(|i| PrimitiveId::Type(Id::from_usize(i))));
    ids.extend((0..image.enum_constants().len()).map(|i| PrimitiveId::EnumConstant(Id::from_usize(i))));
    ids.extend((0..image.enums().len()).map(|i| PrimitiveId::Enum(Id::from_usize(i))));
    ids.extend((0..image.fields().len()).map(|i| PrimitiveId::Field(Id::from_usize(i))));
    ids.extend((0..image.functions().len()).map(|i| PrimitiveId::Function(Id::from_usize(i))));
    ids.extend((0..image.template_types().len()).map(|i| PrimitiveId::TemplateType(Id::from_usize(i))));
    ids.extend((0..image.templates().len()).map(|i| PrimitiveId::Template(Id::from_usize(i))));
    ids.extend((0..image.classes().len()).map(|i| PrimitiveId::Class(Id::from_usize(i))));
    ids.extend((0..image.namespaces().len()).map(|i| PrimitiveId::Namespace(Id::from_usize(i))));
    ids
}

fn same_record<T>(a: &T, b: &T) -> bool {
    ptr::eq(a, b)
}

#[test]
fn test_downcast_to_own_kind_is_identity() {
    let image = sample_image();

    for id in every_primitive(&image) {
        let any = image.resolve(id);
        assert_eq!(any.kind(), id.kind());

        let identical = match any {
            PrimitiveRef::Type(r) => same_record(any.as_type().record(), r.record()),
            PrimitiveRef::EnumConstant(r) => same_record(any.as_enum_constant().record(), r.record()),
            PrimitiveRef::Enum(r) => same_record(any.as_enum().record(), r.record()),
            PrimitiveRef::Field(r) => same_record(any.as_field().record(), r.record()),
            PrimitiveRef::Function(r) => same_record(any.as_function().record(), r.record()),
            PrimitiveRef::TemplateType(r) => same_record(any.as_template_type().record(), r.record()),
            PrimitiveRef::Template(r) => same_record(any.as_template().record(), r.record()),
            PrimitiveRef::Class(r) => same_record(any.as_class().record(), r.record()),
            PrimitiveRef::Namespace(r) => same_record(any.as_namespace().record(), r.record()),
        };
        assert!(identical, "{:?} did not downcast to itself", id.kind());
    }
}

#[test]
fn test_non_panicking_downcasts_reject_other_kinds() {
    let image = sample_image();
    let class = image.resolve_type(image.get_type(hash_name("Player")).unwrap().id());

    assert!(class.to_class().is_some());
    assert!(class.to_enum().is_none());
    assert!(class.to_template_type().is_none());
    assert!(class.to_type().is_none());
}

#[test]
fn test_type_index_entries_downcast_to_their_kind() {
    let image = sample_image();

    for &id in image.type_index().iter() {
        let ty = image.resolve_type(id);
        match id {
            TypeId::Type(_) => assert_eq!(ty.as_type().kind(), Kind::Type),
            TypeId::Enum(_) => assert_eq!(ty.as_enum().kind(), Kind::Enum),
            TypeId::Class(_) => assert_eq!(ty.as_class().kind(), Kind::Class),
            TypeId::TemplateType(_) => assert_eq!(ty.as_template_type().kind(), Kind::TemplateType),
        }
    }
}

#[test]
fn test_attribute_downcasts() {
    let image = sample_image();
    let color = image.get_enum(hash_name("Color")).unwrap();
    let max = color.find_attribute(hash_name("max")).unwrap();

    assert_eq!(max.kind(), Kind::IntAttribute);
    assert_eq!(max.as_int().value, 2);
}

#[test]
#[should_panic(expected = "primitive kind mismatch: expected Class, found Enum")]
fn test_type_downcast_to_wrong_kind_panics() {
    let image = sample_image();
    let _ = image.get_type(hash_name("Color")).unwrap().as_class();
}

#[test]
#[should_panic(expected = "primitive kind mismatch: expected Field, found Function")]
fn test_primitive_downcast_to_wrong_kind_panics() {
    let image = sample_image();
    let update = image.get_function(hash_name("update")).unwrap();
    let _ = image.resolve(update.id().into()).as_field();
}

#[test]
#[should_panic(expected = "primitive kind mismatch: expected FloatAttribute, found IntAttribute")]
fn test_attribute_downcast_to_wrong_kind_panics() {
    let image = sample_image();
    let color = image.get_enum(hash_name("Color")).unwrap();
    let _ = color.find_attribute(hash_name("max")).unwrap().as_float();
}

#[test]
#[should_panic(expected = "primitive kind mismatch")]
fn test_type_id_downcast_panics() {
    let _ = TypeId::Type(Id::new(0)).as_class();
}

#[test]
#[should_panic(expected = "dangling classes id")]
fn test_out_of_range_id_panics() {
    let image = sample_image();
    let _ = image.get(Id::<reflect_model::Class>::new(999));
}
