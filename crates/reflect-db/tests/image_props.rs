use proptest::prelude::*;
use reflect_db::{encode_image, BinaryLoader, ImageBuilder, ImageLoader, MemoryImage};
use reflect_model::{hash_name, is_sorted_by_hash, Hashed, PrimitiveId, Qualifier};
use std::collections::BTreeSet;
use std::io::Cursor;

fn identifiers() -> impl Strategy<Value = BTreeSet<String>> {
    proptest::collection::btree_set("[A-Za-z_][A-Za-z0-9_]{0,12}", 1..40)
}

/// Types, classes with one field each, and free functions named from `names`
fn build(names: &BTreeSet<String>) -> MemoryImage {
    let mut builder = ImageBuilder::new();
    let int = builder.add_type("__int", PrimitiveId::ROOT, 4).unwrap();
    for (i, name) in names.iter().enumerate() {
        match i % 3 {
            0 => {
                builder.add_function(name, PrimitiveId::ROOT, 0, 1).unwrap();
            }
            1 => {
                let class = builder.add_class(name, PrimitiveId::ROOT, 4).unwrap();
                builder
                    .add_field("value", class, Some(int.into()), Qualifier::VALUE, 0)
                    .unwrap();
            }
            _ => {
                let ns = builder.add_namespace(name, PrimitiveId::ROOT).unwrap();
                builder.add_type(format!("{name}_t").as_str(), ns, 8).unwrap();
            }
        }
    }
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn prop_every_arena_sorted_by_hash(names in identifiers()) {
        let image = build(&names);

        prop_assert!(is_sorted_by_hash(image.names().as_slice()));
        prop_assert!(is_sorted_by_hash(image.types().as_slice()));
        prop_assert!(is_sorted_by_hash(image.classes().as_slice()));
        prop_assert!(is_sorted_by_hash(image.functions().as_slice()));
        prop_assert!(is_sorted_by_hash(image.namespaces().as_slice()));
        prop_assert!(is_sorted_by_hash(image.fields().as_slice()));

        let index: Vec<u32> = image.type_index().iter().map(|&id| image.type_hash(id)).collect();
        prop_assert!(index.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(image.validate().is_ok());
    }

    #[test]
    fn prop_lookup_returns_matching_record(names in identifiers()) {
        let image = build(&names);

        for (i, name) in names.iter().enumerate() {
            let hash = hash_name(name);
            prop_assert_eq!(image.get_name(hash).hash, hash);
            match i % 3 {
                0 => prop_assert_eq!(image.get_function(hash).unwrap().name_hash(), hash),
                1 => prop_assert_eq!(image.get_type(hash).unwrap().name().hash, hash),
                _ => prop_assert_eq!(image.get_namespace(hash).unwrap().name_hash(), hash),
            }
        }
    }

    #[test]
    fn prop_absent_hash_not_found(names in identifiers(), probe in any::<u32>()) {
        let image = build(&names);
        let present: BTreeSet<u32> = image.names().iter().map(|n| n.hash).collect();
        prop_assume!(!present.contains(&probe) && probe != 0);

        prop_assert!(image.get_name(probe).is_empty());
        prop_assert!(image.get_type(probe).is_none());
        prop_assert!(image.get_function(probe).is_none());
        prop_assert!(image.get_namespace(probe).is_none());
        prop_assert!(image.get_class(probe).is_none());
    }

    #[test]
    fn prop_wire_round_trip_preserves_image(names in identifiers()) {
        let image = build(&names);
        let bytes = encode_image(&image).unwrap();
        let loaded = BinaryLoader::new().load(&mut Cursor::new(bytes), None).unwrap();

        prop_assert_eq!(&loaded, &image);
    }

    #[test]
    fn prop_single_byte_corruption_rejected(names in identifiers(), at in any::<prop::sample::Index>(), flip in 1u8..) {
        let image = build(&names);
        let mut bytes = encode_image(&image).unwrap();
        let i = at.index(bytes.len());
        bytes[i] ^= flip;

        prop_assert!(BinaryLoader::new().load(&mut Cursor::new(bytes), None).is_err());
    }
}
