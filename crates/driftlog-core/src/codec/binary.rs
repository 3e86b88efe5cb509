//! Binary blob codec: opaque bytes, written raw.

use std::io::{Read, Write};

use bytes::Bytes;

use crate::codec::{Codec, CodecFactory, Value, ValueKind};
use crate::error::{Result, StreamError};

/// Headerless codec for opaque byte payloads (`application/octet-stream`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Binary;

impl Binary {
    /// Keyframe encoding string.
    pub const ENCODING: &'static str = "application/octet-stream";
}

impl Codec for Binary {
    fn encoding(&self) -> &'static str {
        Self::ENCODING
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Binary
    }

    fn size(&self, value: &Value) -> Result<usize> {
        match value {
            Value::Binary(data) => Ok(data.len()),
            _ => Err(StreamError::TypeMismatch(Self::ENCODING)),
        }
    }

    fn write(&mut self, out: &mut dyn Write, value: &Value) -> Result<()> {
        match value {
            Value::Binary(data) => {
                out.write_all(data)?;
                Ok(())
            }
            _ => Err(StreamError::TypeMismatch(Self::ENCODING)),
        }
    }

    fn read(&mut self, input: &mut dyn Read, length: usize) -> Result<Value> {
        let mut bytes = vec![0u8; length];
        input.read_exact(&mut bytes)?;
        Ok(Value::Binary(Bytes::from(bytes)))
    }
}

impl CodecFactory for Binary {
    fn encoding(&self) -> &'static str {
        Self::ENCODING
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Binary
    }

    fn create(&self, header: Option<Value>) -> Result<Box<dyn Codec>> {
        if header.is_some() {
            return Err(StreamError::HeaderUnsupported(Self::ENCODING));
        }
        Ok(Box::new(Self))
    }
}
