use std::collections::VecDeque;

use bytes::Bytes;

/// Per-entry overhead counted against the table size.
const ENTRY_OVERHEAD: usize = 32;

fn entry_size(name: &[u8], value: &[u8]) -> usize {
    name.len() + value.len() + ENTRY_OVERHEAD
}

/// Decoder side dynamic table.
///
/// New entries go to the front; when the table grows past its maximum
/// size the oldest entries are evicted. An entry larger than the maximum
/// empties the table and is not inserted.
pub(crate) struct DynamicTable {
    table: VecDeque<(Bytes, Bytes)>,
    size: usize,
    max_size: usize,
}

impl DynamicTable {
    pub fn with_size(max_size: usize) -> DynamicTable {
        DynamicTable {
            table: VecDeque::new(),
            size: 0,
            max_size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict();
    }

    pub fn add_header(&mut self, name: Bytes, value: Bytes) {
        self.size += entry_size(&name, &value);
        self.table.push_front((name, value));
        self.evict();
    }

    /// Entry by zero-based index, most recent first.
    pub fn get(&self, index: usize) -> Option<&(Bytes, Bytes)> {
        self.table.get(index)
    }

    fn evict(&mut self) {
        while self.size > self.max_size {
            match self.table.pop_back() {
                Some((name, value)) => self.size -= entry_size(&name, &value),
                None => break,
            }
        }
    }
}
