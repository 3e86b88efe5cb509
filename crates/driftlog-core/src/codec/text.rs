//! Plain-text codec: UTF-8 strings, written raw.

use std::io::{Read, Write};

use crate::codec::{Codec, CodecFactory, Value, ValueKind};
use crate::error::{Result, StreamError};

/// Headerless codec for UTF-8 text payloads (`text/plain`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl PlainText {
    /// Keyframe encoding string.
    pub const ENCODING: &'static str = "text/plain";
}

impl Codec for PlainText {
    fn encoding(&self) -> &'static str {
        Self::ENCODING
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn size(&self, value: &Value) -> Result<usize> {
        match value {
            Value::Text(text) => Ok(text.len()),
            _ => Err(StreamError::TypeMismatch(Self::ENCODING)),
        }
    }

    fn write(&mut self, out: &mut dyn Write, value: &Value) -> Result<()> {
        match value {
            Value::Text(text) => {
                out.write_all(text.as_bytes())?;
                Ok(())
            }
            _ => Err(StreamError::TypeMismatch(Self::ENCODING)),
        }
    }

    fn read(&mut self, input: &mut dyn Read, length: usize) -> Result<Value> {
        let mut bytes = vec![0u8; length];
        input.read_exact(&mut bytes)?;
        let text = String::from_utf8(bytes)
            .map_err(|err| StreamError::PayloadDecode(err.to_string()))?;
        Ok(Value::Text(text))
    }
}

impl CodecFactory for PlainText {
    fn encoding(&self) -> &'static str {
        Self::ENCODING
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn create(&self, header: Option<Value>) -> Result<Box<dyn Codec>> {
        if header.is_some() {
            return Err(StreamError::HeaderUnsupported(Self::ENCODING));
        }
        Ok(Box::new(Self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut codec = PlainText;
        let value = Value::from("Hey there");

        let mut wire = Vec::new();
        codec.write(&mut wire, &value).unwrap();
        assert_eq!(wire.len(), codec.size(&value).unwrap());

        let decoded = codec.read(&mut wire.as_slice(), wire.len()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn empty_string_roundtrips() {
        let mut codec = PlainText;
        let value = Value::from("");

        let mut wire = Vec::new();
        codec.write(&mut wire, &value).unwrap();
        assert!(wire.is_empty());

        let decoded = codec.read(&mut wire.as_slice(), 0).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn reject_wrong_variant() {
        let mut codec = PlainText;
        let value = Value::from(vec![1u8, 2, 3]);

        assert!(matches!(codec.size(&value), Err(StreamError::TypeMismatch(_))));
        assert!(matches!(
            codec.write(&mut Vec::new(), &value),
            Err(StreamError::TypeMismatch(_))
        ));
    }

    #[test]
    fn reject_invalid_utf8() {
        let mut codec = PlainText;
        let bytes = [0xff, 0xfe, 0x01];
        assert!(matches!(
            codec.read(&mut &bytes[..], bytes.len()),
            Err(StreamError::PayloadDecode(_))
        ));
    }
}
