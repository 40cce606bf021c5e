use led_store::{BitBuffer, ByteStore};
use led_types::Fingerprint;

use crate::error::SchemaResult;

/// Byte size of the mandatory `id` field at the start of every record.
pub const ID_SIZE: usize = 8;

/// A fixed-size typed view over one record's bytes.
///
/// The `id` is a signed 64-bit integer at byte 0 in the store's byte order;
/// every sorted collection and stream in Led orders records by it.
pub trait Schema: Clone + Send + Sync + 'static {
    fn buffer(&self) -> &BitBuffer;

    fn buffer_mut(&mut self) -> &mut BitBuffer;

    fn store(&self) -> &ByteStore {
        self.buffer().store()
    }

    /// Record length in bytes.
    fn size(&self) -> usize {
        self.store().len()
    }

    fn id(&self) -> SchemaResult<i64> {
        Ok(self.store().get_i64(0)?)
    }

    fn set_id(&mut self, id: i64) -> SchemaResult<()> {
        Ok(self.store().set_i64(0, id)?)
    }

    /// Make this view permanently read-only. Other views of the same bytes
    /// are unaffected.
    fn invalidate(&mut self) {
        self.buffer_mut().store_mut().make_read_only();
    }

    fn is_invalidated(&self) -> bool {
        self.store().is_read_only()
    }

    /// Both records are live and carry the same id.
    fn same_record<S: Schema>(&self, other: &S) -> bool {
        if !self.store().is_live() || !other.store().is_live() {
            return false;
        }
        matches!((self.id(), other.id()), (Ok(a), Ok(b)) if a == b)
    }

    /// Overwrite this record with the bytes of an equally sized record.
    fn copy_from<S: Schema>(&mut self, other: &S) -> SchemaResult<()> {
        Ok(self.store().copy_from(other.store())?)
    }
}

/// Everything Led needs to know about one record type.
///
/// A descriptor is an ordinary value handed to allocators, readers and
/// writers; it is the only way new views are built from raw bytes.
pub trait SchemaDescriptor: Clone + Send + Sync + 'static {
    type Record: Schema;

    /// Human-readable type name, used in logs.
    fn name(&self) -> &str;

    /// Fixed record length in bytes, at least [`ID_SIZE`].
    fn size(&self) -> usize;

    /// Layout fingerprint checked against file headers. Null disables the
    /// check.
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::NULL
    }

    /// Build a view over `store`, which must be exactly [`size`](Self::size)
    /// bytes long.
    fn view(&self, store: ByteStore) -> Self::Record;
}
