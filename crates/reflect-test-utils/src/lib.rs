//! Testing utilities for the reflect workspace
//!
//! Shared fixtures: the three end-to-end scenario images, a richer sample
//! image, and helpers for encoding and allocator accounting.

#![allow(missing_docs)]

use reflect_array::{Allocator, TrackingAllocator};
use reflect_db::{encode_image, ImageBuilder, MemoryImage};
use reflect_model::{hash_name, Operator, PrimitiveId, Profile, Qualifier};
use std::sync::Arc;

/// Scenario A hashes
pub const NAMESPACE_N: u32 = 10;
pub const CLASS_C: u32 = 20;
pub const FIELD_F: u32 = 30;

/// Scenario B function hashes, in insertion order
pub const FUNCTION_HASHES: [u32; 5] = [99, 5, 256, 17, 42];
pub const ABSENT_FUNCTION: u32 = 7;

/// Scenario C shared hash and colliding texts
pub const COLLIDING_HASH: u32 = 0x00C0_11DE;
pub const COLLIDING_TEXTS: [&str; 2] = ["alpha", "omega"];

/// Namespace `N` owning class `C` with an `int` field `f` at offset 4
pub fn scenario_a() -> MemoryImage {
    let mut builder = ImageBuilder::new();
    let int = builder.add_type("int", PrimitiveId::ROOT, 4).unwrap();
    let n = builder.add_namespace((NAMESPACE_N, "N"), PrimitiveId::ROOT).unwrap();
    let c = builder.add_class((CLASS_C, "C"), n, 8).unwrap();
    builder
        .add_field((FIELD_F, "f"), c, Some(int.into()), Qualifier::VALUE, 4)
        .unwrap();
    builder.build().unwrap()
}

/// Five functions with distinct hashes added out of order
pub fn scenario_b() -> MemoryImage {
    let mut builder = ImageBuilder::new();
    for (unique_id, hash) in (1u32..).zip(FUNCTION_HASHES) {
        let name = format!("f{hash}");
        builder
            .add_function((hash, name.as_str()), PrimitiveId::ROOT, hash * 0x10, unique_id)
            .unwrap();
    }
    builder.build().unwrap()
}

/// Two functions whose names collide on one hash
pub fn scenario_c() -> MemoryImage {
    let mut builder = ImageBuilder::new();
    for (unique_id, text) in (1u32..).zip(COLLIDING_TEXTS) {
        builder
            .add_function((COLLIDING_HASH, text), PrimitiveId::ROOT, 0, unique_id)
            .unwrap();
    }
    builder.build().unwrap()
}

/// Names used by [`sample_image`]
pub const SAMPLE_NAMES: &[&str] = &[
    "int",
    "float",
    "engine",
    "math",
    "Vector3",
    "Entity",
    "Player",
    "Color",
    "Red",
    "Green",
    "Blue",
    "x",
    "y",
    "z",
    "position",
    "cache",
    "health",
    "update",
    "dt",
    "Array",
    "Array<float>",
    "transient",
    "doc",
    "max",
];

/// Namespaces, inheritance, enums, methods, templates and attributes
pub fn sample_image() -> MemoryImage {
    sample_builder(Profile::Full).build().unwrap()
}

/// Like [`sample_image`] without attributes and templates
pub fn sample_reduced_image() -> MemoryImage {
    sample_builder(Profile::Reduced).build().unwrap()
}

fn sample_builder(profile: Profile) -> ImageBuilder {
    let mut b = ImageBuilder::new().with_profile(profile);
    let int = b.add_type("int", PrimitiveId::ROOT, 4).unwrap();
    let float = b.add_type("float", PrimitiveId::ROOT, 4).unwrap();

    let engine = b.add_namespace("engine", PrimitiveId::ROOT).unwrap();
    let math = b.add_namespace("math", engine).unwrap();

    let vector = b.add_class("Vector3", math, 12).unwrap();
    for (offset, axis) in [(0, "x"), (4, "y"), (8, "z")] {
        b.add_field(axis, vector, Some(float.into()), Qualifier::VALUE, offset)
            .unwrap();
    }

    let entity = b.add_class("Entity", engine, 24).unwrap();
    b.add_field("position", entity, Some(vector.into()), Qualifier::VALUE, 8)
        .unwrap();
    let cache = b
        .add_field("cache", entity, Some(int.into()), Qualifier::new(Operator::Pointer, false), 20)
        .unwrap();

    let player = b.add_class("Player", engine, 32).unwrap();
    b.set_base_class(player, entity).unwrap();
    b.add_field("health", player, Some(int.into()), Qualifier::VALUE, 24)
        .unwrap();
    let update = b.add_function("update", player, 0x2000, 42).unwrap();
    b.add_parameter("dt", update, Some(float.into()), Qualifier::new(Operator::Value, true), 0)
        .unwrap();
    b.set_return(update, int.into(), Qualifier::VALUE).unwrap();

    let color = b.add_enum("Color", engine, 4).unwrap();
    for (value, name) in [(0, "Red"), (1, "Green"), (2, "Blue")] {
        b.add_enum_constant(name, color, value).unwrap();
    }

    if profile == Profile::Full {
        let array = b.add_template("Array", engine).unwrap();
        b.add_template_type("Array<float>", array, 16, &[(float.into(), false)])
            .unwrap();
        b.add_flag_attribute("transient", cache).unwrap();
        b.add_text_attribute("doc", player, "A controllable entity").unwrap();
        b.add_int_attribute("max", color, 2).unwrap();
    }
    b
}

/// Encoded database file
pub fn encode(image: &MemoryImage) -> Vec<u8> {
    encode_image(image).unwrap()
}

/// Tracking allocator and the same allocator as a trait object
pub fn tracking_allocator() -> (Arc<TrackingAllocator>, Arc<dyn Allocator>) {
    let tracking = Arc::new(TrackingAllocator::new());
    let allocator: Arc<dyn Allocator> = tracking.clone();
    (tracking, allocator)
}

/// Hash of every name in [`SAMPLE_NAMES`]
pub fn sample_hashes() -> Vec<u32> {
    SAMPLE_NAMES.iter().map(|name| hash_name(name)).collect()
}
