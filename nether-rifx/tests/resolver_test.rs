//! Integration tests for nether-rifx
//!
//! Builds synthetic Director archives and resolves them end to end:
//! index build, random access, key lookups, caching and corruption handling.


use std::sync::Arc;

use archive_builder::*;
use nether_rifx::chunks::{CastDetail, Slot, UNUSED_SENTINEL};
use nether_rifx::{
    CastType, ChunkBody, Corruption, Resolver, ResolverConfig, RifxError, Tag,
};

fn resolve(bytes: Vec<u8>) -> Resolver {
    Resolver::new(bytes, ResolverConfig::default()).expect("Failed to resolve archive")
}

/// One mmap (max=1, used=1) indexing one CASt
#[test]
fn test_single_cast_archive() {
    let bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", cast_payload(0x01, &bitmap_detail(2, 16, 2)))
        .build();
    let resolver = resolve(bytes);

    assert_eq!(resolver.form_type(), Tag(*b"MV93"));
    assert_eq!(resolver.memory_map().entries_max, 1);
    assert_eq!(resolver.memory_map().entries_used, 1);

    let casts = resolver.casts();
    assert_eq!(casts.len(), 1);
    let (id, chunk) = &casts[0];
    assert_eq!(*id, 0);

    let cast = chunk.as_ref().unwrap().cast().unwrap();
    assert_eq!(cast.cast_type, Some(CastType::Bitmap));
    let bitmap = cast.bitmap().unwrap();
    assert_eq!(bitmap.pitch, 2);
    assert_eq!(bitmap.initial_rect.width(), 16);
}

#[test]
fn test_chunk_longer_than_remaining_bytes() {
    let mut bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", cast_payload(0x06, &[0; 3]))
        .build();

    // Claim 1000 bytes where only the 10-byte payload remains
    let offset = u32::from_be_bytes(bytes[entry_at(0) + 8..entry_at(0) + 12].try_into().unwrap());
    let length_at = offset as usize + 4;
    bytes[length_at..length_at + 4].copy_from_slice(&1000u32.to_be_bytes());

    let resolver = resolve(bytes);
    assert!(matches!(
        resolver.chunk(0),
        Err(RifxError::ContainerCorrupt(Corruption::ChunkOverrun {
            declared: 1000,
            available: 10,
            ..
        }))
    ));

    // Sequential traversal reports the same corruption and stops
    let walked: Vec<_> = resolver.walk().collect();
    assert_eq!(walked.len(), 2);
    assert!(walked[0].is_ok());
    assert!(matches!(walked[1], Err(RifxError::ContainerCorrupt(_))));
}

#[test]
fn test_unused_slots_never_resolve() {
    let bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", cast_payload(0x04, &[]))
        .spare_slots(2)
        .build();
    let resolver = resolve(bytes);

    assert_eq!(resolver.memory_map().entries_max, 3);
    for id in 1..3 {
        assert_eq!(resolver.slot(id), Some(Slot::Unused(&UNUSED_SENTINEL[..])));
        assert_eq!(
            resolver.chunk(id).unwrap_err(),
            RifxError::ContainerCorrupt(Corruption::ChunkIdOutOfRange { id, used: 1 })
        );
    }
    assert!(matches!(resolver.slot(0), Some(Slot::Live(_))));
    assert_eq!(resolver.slot(3), None);
    assert_eq!(resolver.decode_all().len(), 1);
}

#[test]
fn test_cached_chunks_are_shared() {
    let bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", cast_payload(0x01, &bitmap_detail(1, 8, 1)))
        .chunk(b"BITD", vec![0x00, 0xFF])
        .build();
    let resolver = resolve(bytes);

    let first = resolver.chunk(0).unwrap();
    let second = resolver.chunk(0).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // Concurrent first access to another id still decodes once
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| resolver.chunk(1).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for chunk in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], chunk));
    }
}

#[test]
fn test_uncached_chunks_are_equal_but_fresh() {
    let bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", cast_payload(0x01, &bitmap_detail(1, 8, 1)))
        .build();
    let resolver = Resolver::new(bytes, ResolverConfig::uncached()).unwrap();

    let first = resolver.chunk(0).unwrap();
    let second = resolver.chunk(0).unwrap();
    assert_eq!(first, second);
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_failures_are_cached_and_isolated() {
    let bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", vec![0x00])
        .chunk(b"CASt", cast_payload(0x42, &[1, 2, 3]))
        .build();
    let resolver = resolve(bytes);

    let all = resolver.decode_all();
    assert_eq!(all.len(), 2);
    assert!(matches!(all[0].1, Err(RifxError::UnexpectedEof { .. })));
    assert_eq!(resolver.chunk(0), all[0].1.clone());

    // The sibling decodes, keeping the unknown cast's bytes
    let sibling = all[1].1.as_ref().unwrap().cast().unwrap().clone();
    assert_eq!(sibling.cast_type, None);
    assert_eq!(sibling.detail, CastDetail::Unknown(vec![1, 2, 3]));
}

#[test]
fn test_key_table_lookups() {
    let bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", cast_payload(0x01, &bitmap_detail(1, 8, 2)))
        .chunk(b"BITD", vec![0x00, 0xF0, 0x00, 0x0F])
        .chunk(b"KEY*", key_payload(&[(1, 0, b"BITD"), (9, 0, b"snd ")]))
        .build();
    let resolver = resolve(bytes);

    assert_eq!(resolver.key_table().entries.len(), 2);

    let bitd = resolver.resource_for_cast(0, Tag::BITD).unwrap().unwrap();
    assert_eq!(bitd.tag, Tag::BITD);
    assert!(Arc::ptr_eq(&bitd, &resolver.chunk(1).unwrap()));

    assert!(resolver.resource_for_cast(0, Tag(*b"STXT")).unwrap().is_none());
    assert!(resolver.resource_for_cast(5, Tag::BITD).unwrap().is_none());

    // Entry points past the index
    assert!(matches!(
        resolver.resource_for_cast(0, Tag(*b"snd ")),
        Err(RifxError::ContainerCorrupt(Corruption::ChunkIdOutOfRange { id: 9, .. }))
    ));

    let owned = resolver.resources_of(0);
    assert_eq!(owned.len(), 2);
    assert_eq!(owned[0].section_index, 1);
    assert!(resolver.resources_of(1).is_empty());
}

#[test]
fn test_monochrome_bitmap_end_to_end() {
    // 8x2 image: row 0 = 0xF0, row 1 = 0x0F, as one literal run
    let bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", cast_payload(0x01, &bitmap_detail(1, 8, 2)))
        .chunk(b"BITD", vec![0x01, 0xF0, 0x0F])
        .chunk(b"KEY*", key_payload(&[(1, 0, b"BITD")]))
        .build();
    let resolver = resolve(bytes);

    let cast = resolver.chunk(0).unwrap();
    let bitmap = cast.cast().and_then(|c| c.bitmap()).unwrap();
    let bitd = resolver.resource_for_cast(0, Tag::BITD).unwrap().unwrap();
    let image = bitmap.decode_monochrome(&bitd.payload).unwrap();

    assert_eq!((image.width, image.height), (8, 2));
    assert_eq!(image.pixels, vec![1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
}

#[test]
fn test_archive_without_key_table() {
    let bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", cast_payload(0x01, &bitmap_detail(1, 8, 1)))
        .build();
    let resolver = resolve(bytes);
    assert!(resolver.key_table().entries.is_empty());
    assert!(resolver.resource_for_cast(0, Tag::BITD).unwrap().is_none());
}

#[test]
fn test_vacant_entries() {
    let bytes = ArchiveBuilder::new(b"MV93")
        .vacant(b"free")
        .chunk(b"CASt", cast_payload(0x04, &[]))
        .vacant(b"junk")
        .build();
    let resolver = resolve(bytes);

    assert_eq!(resolver.chunk(0).unwrap().body, ChunkBody::Vacant);
    assert_eq!(resolver.chunk(2).unwrap().tag, Tag::JUNK);
    assert!(resolver.chunk(1).unwrap().cast().is_some());
}

#[test]
fn test_tag_mismatch() {
    let mut bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"CASt", cast_payload(0x04, &[]))
        .build();
    bytes[entry_at(0)..entry_at(0) + 4].copy_from_slice(b"BITD");

    let resolver = resolve(bytes);
    assert_eq!(
        resolver.chunk(0).unwrap_err(),
        RifxError::ContainerCorrupt(Corruption::TagMismatch {
            id: 0,
            expected: Tag::BITD,
            found: Tag::CAST,
        })
    );
}

#[test]
fn test_header_length_wins_over_index() {
    let mut bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"STXT", vec![1, 2, 3, 4])
        .build();
    bytes[entry_at(0) + 4..entry_at(0) + 8].copy_from_slice(&2u32.to_be_bytes());

    let resolver = resolve(bytes);
    let chunk = resolver.chunk(0).unwrap();
    assert_eq!(chunk.length, 4);
    assert_eq!(chunk.payload, vec![1, 2, 3, 4]);
    assert!(chunk.is_opaque());
}

#[test]
fn test_nested_container_through_index() {
    let inner = nested_payload(
        b"MV93",
        &[
            chunk(b"CASt", &cast_payload(0x03, &[0xAA])),
            chunk(b"Sord", &{
                let mut sord = vec![0; 12];
                sord.extend_from_slice(&1u32.to_be_bytes());
                sord.extend_from_slice(&[0, 0, 0, 0, 0x00, 0x07]);
                sord
            }),
        ],
    );
    let bytes = ArchiveBuilder::new(b"MV93").chunk(b"RIFX", inner).build();
    let resolver = resolve(bytes);

    let chunk = resolver.chunk(0).unwrap();
    let container = chunk.container().unwrap();
    assert_eq!(container.chunks.len(), 2);
    assert_eq!(
        container.chunks[0].as_ref().unwrap().cast().unwrap().cast_type,
        Some(CastType::Text)
    );
    match &container.chunks[1].as_ref().unwrap().body {
        ChunkBody::ScoreOrder(sord) => assert_eq!(sord.index, vec![7]),
        other => panic!("expected score order, got {other:?}"),
    }
}

#[test]
fn test_nesting_limit_from_config() {
    let innermost = chunk(b"RIFX", &nested_payload(b"MV93", &[]));
    let bytes = ArchiveBuilder::new(b"MV93")
        .chunk(b"RIFX", nested_payload(b"MV93", &[innermost]))
        .build();

    let config = ResolverConfig::from_toml_str("max_nesting = 1").unwrap();
    let resolver = Resolver::new(bytes, config).unwrap();

    let chunk = resolver.chunk(0).unwrap();
    assert_eq!(
        chunk.container().unwrap().chunks[0],
        Err(RifxError::ContainerCorrupt(Corruption::NestingTooDeep { limit: 1 }))
    );
}

#[test]
fn test_invalid_root() {
    let mut bytes = ArchiveBuilder::new(b"MV93").build();
    bytes[..4].copy_from_slice(b"RIFF");
    assert!(matches!(
        Resolver::new(bytes, ResolverConfig::default()),
        Err(RifxError::ContainerCorrupt(Corruption::InvalidRoot { .. }))
    ));

    // Root longer than the input
    let mut bytes = ArchiveBuilder::new(b"MV93").build();
    bytes.truncate(bytes.len() - 2);
    assert!(matches!(
        Resolver::new(bytes, ResolverConfig::default()),
        Err(RifxError::ContainerCorrupt(Corruption::ChunkOverrun { .. }))
    ));
}

#[test]
fn test_missing_index() {
    let mut stream = b"MV93".to_vec();
    stream.extend(chunk(b"CASt", &cast_payload(0x04, &[])));
    let bytes = chunk(b"RIFX", &stream);

    assert_eq!(
        Resolver::new(bytes, ResolverConfig::default()).err(),
        Some(RifxError::ContainerCorrupt(Corruption::MissingIndex))
    );
}

#[test]
fn test_projector_wrapper() {
    const RIFX_AT: usize = 0x40;
    let archive = ArchiveBuilder::new(b"MV93")
        .base(RIFX_AT)
        .chunk(b"CASt", cast_payload(0x01, &bitmap_detail(1, 8, 1)))
        .build();

    let mut bytes = projector_header(RIFX_AT as u32);
    bytes.resize(RIFX_AT, 0);
    bytes.extend(archive);

    let resolver = Resolver::from_projector(bytes, ResolverConfig::default()).unwrap();
    let chunk = resolver.chunk(0).unwrap();
    assert!(chunk.offset > RIFX_AT);
    assert_eq!(chunk.cast().unwrap().cast_type, Some(CastType::Bitmap));

    let mut bad = projector_header(RIFX_AT as u32);
    bad[..4].copy_from_slice(b"XXXX");
    assert!(matches!(
        Resolver::from_projector(bad, ResolverConfig::default()),
        Err(RifxError::FormatViolation { .. })
    ));
}

#[test]
fn test_resolver_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Resolver>();
}
