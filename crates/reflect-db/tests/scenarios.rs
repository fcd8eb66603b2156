//! End-to-end scenario tests
//!
//! Build, encode, load through the façade, then query.

use pretty_assertions::assert_eq;
use reflect_db::prelude::*;
use reflect_db::{encode_image, Store};
use reflect_model::{equal_range, Modifier, Profile};
use reflect_test_utils::*;
use std::io::Cursor;

fn load(image: &MemoryImage) -> Database {
    let mut db = Database::new();
    assert!(db.load(&mut Cursor::new(encode_image(image).unwrap()), None));
    db
}

#[test]
fn test_scenario_a_class_with_one_field() {
    let db = load(&scenario_a());

    let ty = db.get_type(CLASS_C).unwrap();
    assert_eq!(ty.kind(), Kind::Class);

    let class = ty.as_class();
    let fields = class.fields();
    assert_eq!(fields.len(), 1);

    let field = fields.get(0).unwrap();
    assert_eq!(field.name().hash, FIELD_F);
    assert_eq!(field.offset, 4);
    assert_eq!(field.field_type().unwrap().size(), 4);

    let namespace = db.get_namespace(NAMESPACE_N).unwrap();
    assert_eq!(class.parent().unwrap().as_namespace(), namespace);
    assert_eq!(namespace.find_class(CLASS_C), Some(class));
}

#[test]
fn test_scenario_b_function_lookup() {
    let db = load(&scenario_b());

    for hash in FUNCTION_HASHES {
        let function = db.get_function(hash).unwrap();
        assert_eq!(function.name().hash, hash);
        assert_eq!(function.address, hash * 0x10);
    }
    assert!(db.get_function(ABSENT_FUNCTION).is_none());

    let hashes: Vec<u32> = db.image().functions().iter().map(|f| f.header.name.hash).collect();
    assert_eq!(hashes, vec![5, 17, 42, 99, 256]);
}

#[test]
fn test_scenario_c_colliding_names() {
    let db = load(&scenario_c());

    // Either colliding text is acceptable.
    let name = db.get_name(COLLIDING_HASH);
    assert_eq!(name.hash, COLLIDING_HASH);
    assert!(COLLIDING_TEXTS.contains(&name.as_str()), "unexpected text {name}");

    let function = db.get_function(COLLIDING_HASH).unwrap();
    assert!(COLLIDING_TEXTS.contains(&function.name().as_str()));

    // Every colliding entry stays reachable.
    let image = db.image();
    let all = equal_range(image.functions().as_slice(), COLLIDING_HASH, |f| f.header.name.hash);
    assert_eq!(all.len(), 2);
}

#[test]
fn test_sample_graph_traversal() {
    let db = load(&sample_image());

    let engine = db.get_namespace(hash_name("engine")).unwrap();
    assert!(engine.parent().unwrap().as_namespace().is_root());
    let math = engine.find_namespace(hash_name("math")).unwrap();
    assert_eq!(math.classes().len(), 1);

    let player = db.get_class(hash_name("Player")).unwrap();
    let entity = player.base_class().unwrap();
    assert_eq!(entity.name().as_str(), "Entity");
    assert!(player.derives_from(entity.id()));
    assert_eq!(player.bases().count(), 1);

    let position = entity.find_field(hash_name("position")).unwrap();
    let vector = position.field_type().unwrap().as_class();
    assert_eq!(vector.fields().len(), 3);

    let update = player.find_method(hash_name("update")).unwrap();
    assert_eq!(update.parameters().len(), 1);
    assert_eq!(update.find_parameter(hash_name("dt")).unwrap().parent_unique_id, 42);
    assert_eq!(update.return_parameter().unwrap().field_type().unwrap().name().as_str(), "int");

    let color = db.get_type(hash_name("Color")).unwrap().as_enum();
    let values: Vec<i32> = color.constants().iter().map(|c| c.value).collect();
    let mut sorted = values.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2]);
    assert_eq!(color.find_attribute(hash_name("max")).unwrap().as_int().value, 2);
}

#[test]
fn test_sample_attributes_and_flags() {
    let db = load(&sample_image());

    let entity = db.get_class(hash_name("Entity")).unwrap();
    let cache = entity.find_field(hash_name("cache")).unwrap();
    assert!(cache.has_flag(FlagBits::TRANSIENT));
    assert_eq!(cache.modifier(), (Modifier::Pointer, false));

    let player = db.get_class(hash_name("Player")).unwrap();
    let doc = player.find_attribute(hash_name("doc")).unwrap();
    assert_eq!(doc.text_value(), Some("A controllable entity"));
    assert!(!player.has_flag(FlagBits::TRANSIENT));
}

#[test]
fn test_sample_templates() {
    let db = load(&sample_image());

    let array = db.get_template(hash_name("Array")).unwrap();
    let instance = db.get_type(hash_name("Array<float>")).unwrap().as_template_type();

    assert_eq!(instance.template(), Some(array));
    assert_eq!(array.instances().len(), 1);
    let (arg, is_ptr) = instance.arguments().next().unwrap();
    assert_eq!(arg.name().as_str(), "float");
    assert!(!is_ptr);
}

#[test]
fn test_reduced_sample_has_no_attributes_or_templates() {
    let image = sample_reduced_image();
    assert_eq!(image.profile(), Profile::Reduced);

    let db = load(&image);
    assert!(db.get_template(hash_name("Array")).is_none());
    assert!(db.image().attributes().is_empty());
    assert!(db.get_class(hash_name("Player")).is_some());
}

#[test]
fn test_every_sample_name_resolves() {
    let db = load(&sample_image());

    for (text, hash) in SAMPLE_NAMES.iter().zip(sample_hashes()) {
        assert_eq!(db.get_name(hash).as_str(), *text);
        assert_eq!(db.get_name_by_text(text).hash, hash);
    }
    assert!(db.get_name_by_text("").is_empty());
    assert!(db.get_name(0).is_empty());
}

#[test]
fn test_store_records_match_accessors() {
    let image = sample_image();
    let classes: &[Class] = <MemoryImage as Store<Class>>::records(&image);
    assert_eq!(classes.len(), image.classes().len());
    assert_eq!(image.stats().classes, 3);
}
