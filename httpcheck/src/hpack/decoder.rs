use bytes::Bytes;

use crate::hpack::decode_integer;
use crate::hpack::dynamic_table::DynamicTable;
use crate::hpack::huffman;
use crate::hpack::static_table::STATIC_TABLE;
use crate::hpack::DecoderError;

/// `SETTINGS_HEADER_TABLE_SIZE` we advertise, the HTTP/2 default.
const MAX_TABLE_SIZE: usize = 4096;

/// HPACK decoder, one per connection direction.
pub(crate) struct Decoder {
    table: DynamicTable,
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder {
            table: DynamicTable::with_size(MAX_TABLE_SIZE),
        }
    }

    /// Decode a complete header block into `(name, value)` pairs.
    pub fn decode(&mut self, buf: &[u8]) -> Result<Vec<(Bytes, Bytes)>, DecoderError> {
        let mut headers = Vec::new();
        let mut pos = 0;

        while pos < buf.len() {
            let rest = &buf[pos..];
            let first = rest[0];

            pos += if first & 0x80 != 0 {
                let (index, consumed) = decode_integer(rest, 7)?;
                headers.push(self.get(index)?);
                consumed
            } else if first & 0xc0 == 0x40 {
                let (header, consumed) = self.decode_literal(rest, 6)?;
                self.table.add_header(header.0.clone(), header.1.clone());
                headers.push(header);
                consumed
            } else if first & 0xe0 == 0x20 {
                if !headers.is_empty() {
                    return Err(DecoderError::SizeUpdateNotAtStart);
                }
                let (size, consumed) = decode_integer(rest, 5)?;
                if size > MAX_TABLE_SIZE {
                    return Err(DecoderError::InvalidMaxDynamicSize(size));
                }
                self.table.set_max_size(size);
                consumed
            } else {
                // without indexing or never indexed, same for a decoder
                let (header, consumed) = self.decode_literal(rest, 4)?;
                headers.push(header);
                consumed
            };
        }

        trace!(
            "decoded {} headers, dynamic table {} entries, {} octets",
            headers.len(),
            self.table.len(),
            self.table.size()
        );
        Ok(headers)
    }

    fn decode_literal(
        &self,
        buf: &[u8],
        prefix_size: u8,
    ) -> Result<((Bytes, Bytes), usize), DecoderError> {
        let (index, mut pos) = decode_integer(buf, prefix_size)?;
        let name = if index == 0 {
            let (name, consumed) = decode_string(&buf[pos..])?;
            pos += consumed;
            name
        } else {
            self.get(index)?.0
        };
        let (value, consumed) = decode_string(&buf[pos..])?;
        Ok(((name, value), pos + consumed))
    }

    /// Entry of the combined static and dynamic index space, `1`-based.
    fn get(&self, index: usize) -> Result<(Bytes, Bytes), DecoderError> {
        if index == 0 {
            return Err(DecoderError::HeaderIndexOutOfBounds(index));
        }
        match STATIC_TABLE.get(index - 1) {
            Some(&(name, value)) => Ok((Bytes::from_static(name), Bytes::from_static(value))),
            None => self
                .table
                .get(index - 1 - STATIC_TABLE.len())
                .cloned()
                .ok_or(DecoderError::HeaderIndexOutOfBounds(index)),
        }
    }
}

fn decode_string(buf: &[u8]) -> Result<(Bytes, usize), DecoderError> {
    let huffman_coded = buf.first().map_or(false, |b| b & 0x80 != 0);
    let (len, pos) = decode_integer(buf, 7)?;
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= buf.len())
        .ok_or(DecoderError::NotEnoughOctets)?;

    let raw = &buf[pos..end];
    let s = if huffman_coded {
        Bytes::from(huffman::decode(raw)?)
    } else {
        Bytes::copy_from_slice(raw)
    };
    Ok((s, end))
}
