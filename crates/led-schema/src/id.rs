use led_store::{BitBuffer, ByteStore};

use crate::schema::{Schema, SchemaDescriptor, ID_SIZE};

/// Descriptor of the bare 8-byte id record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdSchema;

impl SchemaDescriptor for IdSchema {
    type Record = IdRecord;

    fn name(&self) -> &str {
        "id"
    }

    fn size(&self) -> usize {
        ID_SIZE
    }

    fn view(&self, store: ByteStore) -> IdRecord {
        IdRecord {
            buf: BitBuffer::new(store),
        }
    }
}

/// A record holding nothing but its id.
#[derive(Clone, Debug)]
pub struct IdRecord {
    buf: BitBuffer,
}

impl Schema for IdRecord {
    fn buffer(&self) -> &BitBuffer {
        &self.buf
    }

    fn buffer_mut(&mut self) -> &mut BitBuffer {
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use led_types::{ByteOrder, Fingerprint};

    use super::*;

    #[test]
    fn id_record_roundtrip() {
        let mut r = IdSchema.view(ByteStore::managed(ID_SIZE, ByteOrder::Big));
        r.set_id(i64::MIN + 1).unwrap();
        assert_eq!(r.id().unwrap(), i64::MIN + 1);
        assert_eq!(r.size(), 8);
        assert_eq!(r.store().to_vec().unwrap()[0], 0x80);
    }

    #[test]
    fn no_layout_check() {
        assert_eq!(IdSchema.fingerprint(), Fingerprint::NULL);
        assert_eq!(IdSchema.name(), "id");
    }
}
