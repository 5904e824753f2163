use crate::hpack::encode_integer_into;
use crate::hpack::static_table::STATIC_TABLE;

/// HPACK encoder.
///
/// Fields matching a static table entry are sent indexed. Everything else
/// is a literal without indexing, with the name indexed when the static
/// table has it. Values are sent as raw octets, so a request target is
/// delivered exactly as given, spaces included.
#[derive(Default)]
pub(crate) struct Encoder;

impl Encoder {
    pub fn new() -> Encoder {
        Default::default()
    }

    pub fn encode<'a, I>(&mut self, headers: I) -> Vec<u8>
    where
        I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
    {
        let mut buf = Vec::new();
        for (name, value) in headers {
            self.encode_header_into(name, value, &mut buf);
        }
        buf
    }

    fn encode_header_into(&mut self, name: &[u8], value: &[u8], buf: &mut Vec<u8>) {
        let mut name_index = None;
        for (i, &(n, v)) in STATIC_TABLE.iter().enumerate() {
            if n == name {
                if v == value {
                    encode_integer_into(i + 1, 7, 0x80, buf);
                    return;
                }
                name_index.get_or_insert(i + 1);
            }
        }

        match name_index {
            Some(index) => encode_integer_into(index, 4, 0x00, buf),
            None => {
                buf.push(0x00);
                encode_string_into(name, buf);
            }
        }
        encode_string_into(value, buf);
    }
}

fn encode_string_into(s: &[u8], buf: &mut Vec<u8>) {
    encode_integer_into(s.len(), 7, 0x00, buf);
    buf.extend_from_slice(s);
}
