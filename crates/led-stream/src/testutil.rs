use led_alloc::{Allocator, ManagedIndexedAllocator};
use led_schema::{IdRecord, IdSchema, Schema};
use led_types::LedConfig;

/// Id-only records carrying `ids`, in the given order.
pub(crate) fn id_records(ids: &[i64]) -> Vec<IdRecord> {
    let mut alloc = ManagedIndexedAllocator::new(IdSchema, ids.len(), &LedConfig::default());
    ids.iter()
        .map(|&id| {
            let mut r = alloc.malloc().unwrap();
            r.set_id(id).unwrap();
            r
        })
        .collect()
}
