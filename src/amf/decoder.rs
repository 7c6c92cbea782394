use crate::amf::amf0::{markers, Amf0Object, Amf0Value};
use crate::{ByteBuffer, Error, Result};

/// Deepest object nesting accepted from the server
pub const MAX_NESTING_DEPTH: usize = 32;

pub struct Amf0Decoder<'a> {
    buffer: &'a mut ByteBuffer,
    depth: usize,
    too_deep: bool,
}

impl<'a> Amf0Decoder<'a> {
    pub fn new(buffer: &'a mut ByteBuffer) -> Self {
        Amf0Decoder {
            buffer,
            depth: 0,
            too_deep: false,
        }
    }

    /// Whether decoding stopped on the nesting limit
    pub fn nesting_exceeded(&self) -> bool {
        self.too_deep
    }

    /// Check if decoder has remaining data to decode
    pub fn has_remaining(&self) -> bool {
        self.buffer.remaining() > 0
    }

    pub fn decode(&mut self) -> Result<Amf0Value> {
        let marker = self.buffer.read_u8()?;
        match marker {
            markers::NUMBER => Ok(Amf0Value::Number(self.buffer.read_f64_be()?)),
            markers::BOOLEAN => Ok(Amf0Value::Boolean(self.buffer.read_u8()? != 0)),
            markers::STRING => Ok(Amf0Value::String(self.read_utf8()?)),
            markers::OBJECT => self.decode_properties(),
            markers::ECMA_ARRAY => {
                let _count = self.buffer.read_u32_be()?;
                self.decode_properties()
            }
            markers::NULL | markers::UNDEFINED => Ok(Amf0Value::Null),
            _ => Err(Error::amf_decode(format!("Unsupported AMF0 marker: 0x{:02x}", marker))),
        }
    }

    fn decode_properties(&mut self) -> Result<Amf0Value> {
        if self.depth >= MAX_NESTING_DEPTH {
            self.too_deep = true;
            return Err(Error::amf_decode(format!(
                "Objects nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }

        self.depth += 1;
        let object = self.decode_property_list();
        self.depth -= 1;
        object
    }

    fn decode_property_list(&mut self) -> Result<Amf0Value> {
        let mut object = Amf0Object::new();
        loop {
            let name = self.read_utf8()?;
            if name.is_empty() {
                let end = self.buffer.read_u8()?;
                if end != markers::OBJECT_END {
                    return Err(Error::amf_decode(format!(
                        "Expected object end marker, found 0x{:02x}",
                        end
                    )));
                }
                break;
            }
            let value = self.decode()?;
            object.insert(name, value);
        }
        Ok(Amf0Value::Object(object))
    }

    fn read_utf8(&mut self) -> Result<String> {
        let len = self.buffer.read_u16_be()? as usize;
        let bytes = self.buffer.read_bytes(len)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::amf_decode(format!("Invalid UTF-8 in string: {}", e)))
    }
}

/// Name and transaction id at the head of a command message
#[derive(Debug, Clone, PartialEq)]
pub struct CommandHead {
    pub name: String,
    pub transaction_id: f64,
}

/// Decode just the name and transaction id of a command message
pub fn decode_command_head(payload: &[u8]) -> Result<CommandHead> {
    let mut buffer = ByteBuffer::new(payload.to_vec());
    let mut decoder = Amf0Decoder::new(&mut buffer);

    let name = decoder
        .decode()?
        .as_string()
        .ok_or_else(|| Error::amf_decode("Command name must be string"))?
        .to_string();

    let transaction_id = decoder
        .decode()?
        .as_number()
        .ok_or_else(|| Error::amf_decode("Transaction ID must be number"))?;

    Ok(CommandHead { name, transaction_id })
}

/// Find the stream id in a `createStream` result.
///
/// The values after the command name and transaction id are decoded in
/// order and the first number wins. If a value cannot be decoded the rest
/// of the payload is scanned for a number marker followed by eight bytes.
/// Objects nested past [`MAX_NESTING_DEPTH`] are an error, not a scan.
pub fn extract_stream_id(payload: &[u8]) -> Result<Option<f64>> {
    let mut buffer = ByteBuffer::new(payload.to_vec());
    let mut decoder = Amf0Decoder::new(&mut buffer);

    // name, transaction id
    for _ in 0..2 {
        if let Err(e) = decoder.decode() {
            if decoder.nesting_exceeded() {
                return Err(e);
            }
            return Ok(scan_for_number(payload));
        }
    }

    while decoder.has_remaining() {
        match decoder.decode() {
            Ok(Amf0Value::Number(n)) => return Ok(Some(n)),
            Ok(_) => continue,
            Err(e) if decoder.nesting_exceeded() => return Err(e),
            Err(_) => break,
        }
    }

    let position = buffer.position();
    Ok(scan_for_number(&payload[position.min(payload.len())..]))
}

/// Byte-level search for the first AMF0 number (marker + f64)
pub fn scan_for_number(bytes: &[u8]) -> Option<f64> {
    let start = bytes.iter().position(|&b| b == markers::NUMBER)?;
    let raw: [u8; 8] = bytes.get(start + 1..start + 9)?.try_into().ok()?;
    Some(f64::from_be_bytes(raw))
}
