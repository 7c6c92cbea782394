use crate::amf::amf0::{markers, Amf0Object, Amf0Value};
use crate::{ByteBuffer, Error, Result};

pub struct Amf0Encoder {
    buffer: ByteBuffer,
}

impl Amf0Encoder {
    pub fn new() -> Self {
        Amf0Encoder {
            buffer: ByteBuffer::with_capacity(256),
        }
    }

    fn encode_number(&mut self, value: f64) -> Result<()> {
        self.buffer.write_u8(markers::NUMBER)?;
        self.buffer.write_f64_be(value)?;
        Ok(())
    }

    fn encode_string(&mut self, value: &str) -> Result<()> {
        self.buffer.write_u8(markers::STRING)?;
        self.write_string_no_marker(value)
    }

    fn encode_object(&mut self, obj: &Amf0Object) -> Result<()> {
        self.buffer.write_u8(markers::OBJECT)?;
        for (key, value) in obj.iter() {
            self.write_string_no_marker(key)?;
            match value {
                Amf0Value::String(s) => self.encode_string(s)?,
                Amf0Value::Number(n) => self.encode_number(*n)?,
                other => {
                    return Err(Error::amf_encode(format!(
                        "property '{}' has unsupported type {}",
                        key,
                        other.type_name()
                    )));
                }
            }
        }
        self.buffer.write_bytes(&markers::OBJECT_END_SEQUENCE)?;
        Ok(())
    }

    /// Helper to write string without type marker (for object keys)
    fn write_string_no_marker(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let len = u16::try_from(bytes.len()).map_err(|_| {
            Error::amf_encode(format!("string of {} bytes exceeds AMF0 limit", bytes.len()))
        })?;
        self.buffer.write_u16_be(len)?;
        self.buffer.write_bytes(bytes)?;
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.into_vec()
    }
}

/// Encode a command: name, transaction id, then the parameter object.
///
/// Parameter values must be strings or numbers.
pub fn encode_command(name: &str, transaction_id: u32, params: &Amf0Object) -> Result<Vec<u8>> {
    let mut encoder = Amf0Encoder::new();
    encoder.encode_string(name)?;
    encoder.encode_number(f64::from(transaction_id))?;
    encoder.encode_object(params)?;
    Ok(encoder.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_command_bytes() {
        let params = Amf0Object::new().with("app", "live");
        let bytes = encode_command("connect", 1, &params).unwrap();

        let mut expected = vec![0x02, 0x00, 0x07];
        expected.extend_from_slice(b"connect");
        expected.push(0x00);
        expected.extend_from_slice(&1.0f64.to_be_bytes());
        expected.push(0x03);
        expected.extend_from_slice(&[0x00, 0x03]);
        expected.extend_from_slice(b"app");
        expected.extend_from_slice(&[0x02, 0x00, 0x04]);
        expected.extend_from_slice(b"live");
        expected.extend_from_slice(&[0x00, 0x00, 0x09]);

        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_empty_params_still_terminated() {
        let bytes = encode_command("createStream", 2, &Amf0Object::new()).unwrap();

        // 3 + 12 name, 9 transaction id, marker, end sequence
        assert_eq!(bytes.len(), 15 + 9 + 1 + 3);
        assert_eq!(&bytes[bytes.len() - 4..], &[0x03, 0x00, 0x00, 0x09]);
    }

    #[test]
    fn test_number_property() {
        let params = Amf0Object::new().with("capabilities", 15.0);
        let bytes = encode_command("connect", 1, &params).unwrap();

        let tail = &bytes[bytes.len() - 12..];
        assert_eq!(tail[0], markers::NUMBER);
        assert_eq!(&tail[1..9], &15.0f64.to_be_bytes());
        assert_eq!(&tail[9..], &markers::OBJECT_END_SEQUENCE);
    }

    #[test]
    fn test_unsupported_property_fails() {
        let mut params = Amf0Object::new().with("app", "live");
        params.insert("fpad", Amf0Value::Boolean(false));

        let err = encode_command("connect", 1, &params).unwrap_err();
        assert!(matches!(err, Error::AmfEncode(ref msg) if msg.contains("fpad")));

        let nested = Amf0Object::new().with("inner", Amf0Value::Object(Amf0Object::new()));
        assert!(encode_command("connect", 1, &nested).is_err());
    }

    #[test]
    fn test_oversized_string_fails() {
        let params = Amf0Object::new().with("tcUrl", "x".repeat(70_000));
        assert!(matches!(
            encode_command("connect", 1, &params),
            Err(Error::AmfEncode(_))
        ));
    }
}
