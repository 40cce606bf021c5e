//! End-to-end behaviour across the led crates.

use std::path::Path;

use led_format::{FormatError, HEADER_SIZE};
use rand::seq::SliceRandom;

use crate::prelude::*;
use crate::{from_vec, IdRecord, IdSchema, LedError, LedHeader, ManagedIndexedAllocator, StoreError};

fn ids_led(ids: &[i64]) -> Vec<IdRecord> {
    let mut alloc = ManagedIndexedAllocator::new(IdSchema, ids.len(), &LedConfig::default());
    ids.iter()
        .map(|&id| {
            let mut r = alloc.malloc().unwrap();
            r.set_id(id).unwrap();
            r
        })
        .collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn header(path: &Path) -> LedHeader {
    let bytes = std::fs::read(path).unwrap();
    LedHeader::read_from(&mut &bytes[..]).unwrap()
}

#[test]
fn empty_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.led");
    let files = LedFiles::new(IdSchema);
    assert_eq!(files.write(&path, from_vec(Vec::<IdRecord>::new())).unwrap(), 0);

    assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_SIZE as u64);
    assert_eq!(header(&path).count(), Some(0));
    assert_eq!(files.reader(&path).unwrap().count().unwrap(), 0);
}

#[test]
fn sorting_builder_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("b.led");
    let files = LedFiles::new(IdSchema);
    let mut builder = files.sorting_builder();
    for r in ids_led(&[3, 1, 2]) {
        builder.append(&r).unwrap();
    }
    files.write(&path, builder.build().unwrap().into_stream()).unwrap();
    assert_eq!(files.reader(&path).unwrap().collect_ids().unwrap(), vec![1, 2, 3]);
}

#[test]
fn external_sort_of_descending_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("desc.led");
    let dest = dir.path().join("asc.led");
    let n = 50_021i64;
    let files = LedFiles::new(IdSchema)
        .with_sort_config(SortConfig::default().with_records_in_memory(4_096))
        .unwrap();

    let mut writer = files.writer(&source).unwrap();
    let mut r = IdSchema.view(ByteStore::managed(8, ByteOrder::Little));
    for id in (0..n).rev() {
        r.set_id(id).unwrap();
        writer.append(&r).unwrap();
    }
    writer.finish().unwrap();

    let report = files.sort(&source, &dest).unwrap();
    assert_eq!(report.records, n as u64);
    assert_eq!(header(&dest).count(), Some(n as u64));
    let mut expected = 0;
    let mut reader = files.reader(&dest).unwrap();
    while let Some(record) = reader.next_record().unwrap() {
        assert_eq!(record.id().unwrap(), expected);
        expected += 1;
    }
    assert_eq!(expected, n);
}

#[test]
fn fingerprint_mismatch_before_any_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.led");
    let written = LayoutBuilder::new("v1").int("temp", 16).build().unwrap();
    let expected = LayoutBuilder::new("v2").uint("temp", 16).build().unwrap();
    assert!(written.fingerprint().conflicts_with(&expected.fingerprint()));

    let mut r = written.view(ByteStore::managed(written.size(), ByteOrder::Little));
    r.set_id(1).unwrap();
    let files = LedFiles::new(written);
    let mut writer = files.writer(&path).unwrap();
    writer.append(&r).unwrap();
    writer.finish().unwrap();

    let result = LedFiles::new(expected).reader(&path);
    assert!(matches!(
        result,
        Err(LedError::Format(FormatError::FingerprintMismatch { .. }))
    ));
}

#[test]
fn remove_and_retain_against_sorted_ids() {
    let source = [1, 2, 3, 5];
    let other = [2, 5, 6, 8, 10];
    let removed = from_vec(ids_led(&source))
        .remove_all(ids(from_vec(ids_led(&other))))
        .collect_ids()
        .unwrap();
    assert_eq!(removed, vec![1, 3]);
    let retained = from_vec(ids_led(&source))
        .retain_all(sorted_ids(other))
        .collect_ids()
        .unwrap();
    assert_eq!(retained, vec![2, 5]);
}

#[test]
fn pipeline_over_files() {
    let dir = tempfile::tempdir().unwrap();
    let files = LedFiles::new(IdSchema);
    let a = dir.path().join("a.led");
    let b = dir.path().join("b.led");
    let out = dir.path().join("out.led");
    files.write(&a, from_vec(ids_led(&[1, 4, 4, 9]))).unwrap();
    files.write(&b, from_vec(ids_led(&[2, 4, 7]))).unwrap();

    let merged = files
        .reader(&a)
        .unwrap()
        .merge(files.reader(&b).unwrap())
        .remove_all(sorted_ids([7]))
        .filter(|r| r.id().unwrap() != 1);
    files.write(&out, merged).unwrap();

    assert_eq!(files.verify(&out).unwrap(), 5);
    let led = files.load(&out).unwrap();
    assert_eq!(led.stream().collect_ids().unwrap(), vec![2, 4, 4, 4, 9]);
    assert_eq!(led.lower_bound(4).unwrap(), 1);
}

#[test]
fn spilling_builder_from_shuffled_input() {
    let files = LedFiles::new(IdSchema)
        .with_sort_config(SortConfig::default().with_records_in_memory(100))
        .unwrap();
    let mut ids: Vec<i64> = (0..1_000).collect();
    ids.shuffle(&mut rand::thread_rng());

    let builder = files.spilling_builder().unwrap();
    for r in ids_led(&ids) {
        builder.append(&r).unwrap();
    }
    let led = builder.build().unwrap();
    assert_eq!(led.len(), 1_000);
    assert_eq!(led.first().unwrap().unwrap().id().unwrap(), 0);
    assert_eq!(led.last().unwrap().unwrap().id().unwrap(), 999);
}

#[test]
fn records_fail_after_their_allocator_is_freed() {
    let mut alloc = ManagedIndexedAllocator::new(IdSchema, 4, &LedConfig::default());
    let mut r = alloc.malloc().unwrap();
    r.set_id(5).unwrap();
    alloc.free();
    assert!(matches!(
        r.id(),
        Err(crate::SchemaError::Store(StoreError::Released { .. }))
    ));
    assert!(!r.same_record(&r.clone()));
}
