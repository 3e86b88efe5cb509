//! Headered, delta-capable integer codec for exercising the full codec
//! surface.
//!
//! The header carries a bias. Keyframes encode `value - bias`; deltas
//! encode `value - last_keyframe - bias`. All arithmetic wraps, so the
//! roundtrip is an identity over the whole `i64` domain. Decoding a delta
//! requires the keyframe preceding it, which is exactly the invariant the
//! reader-side tests need to probe.

use std::io::{Read, Write};

use driftlog_core::{Codec, CodecFactory, StreamError, Value, ValueKind};

type Result<T> = std::result::Result<T, StreamError>;

/// Biased integer codec family: header = bias, keyframes and deltas are
/// 8-byte big-endian integers.
///
/// The unit struct is the [`CodecFactory`]; [`CodecFactory::create`]
/// returns the stateful codec instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiasedI64;

impl BiasedI64 {
    /// Keyframe encoding string.
    pub const ENCODING: &'static str = "application/x-biased-int64";
    /// Header encoding string.
    pub const HEADER_ENCODING: &'static str = "application/x-biased-int64-header";
    /// Delta encoding string.
    pub const DELTA_ENCODING: &'static str = "application/x-biased-int64-delta";

    const WIDTH: usize = 8;
}

struct BiasedI64Codec {
    bias: i64,
    /// Last keyframe value seen on this channel, unbiased.
    last_keyframe: Option<i64>,
}

fn read_i64(input: &mut dyn Read, length: usize) -> Result<i64> {
    if length != BiasedI64::WIDTH {
        return Err(StreamError::PayloadDecode(format!(
            "biased int64 payload must be {} bytes, got {length}",
            BiasedI64::WIDTH
        )));
    }
    let mut buf = [0u8; BiasedI64::WIDTH];
    input.read_exact(&mut buf)?;
    Ok(i64::from_be_bytes(buf))
}

fn expect_int(value: &Value) -> Result<i64> {
    match value {
        Value::Int(value) => Ok(*value),
        _ => Err(StreamError::TypeMismatch(BiasedI64::ENCODING)),
    }
}

impl Codec for BiasedI64Codec {
    fn encoding(&self) -> &'static str {
        BiasedI64::ENCODING
    }

    fn header_encoding(&self) -> Option<&'static str> {
        Some(BiasedI64::HEADER_ENCODING)
    }

    fn delta_encoding(&self) -> Option<&'static str> {
        Some(BiasedI64::DELTA_ENCODING)
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Int
    }

    fn size(&self, value: &Value) -> Result<usize> {
        expect_int(value)?;
        Ok(BiasedI64::WIDTH)
    }

    fn write(&mut self, out: &mut dyn Write, value: &Value) -> Result<()> {
        let value = expect_int(value)?;
        out.write_all(&value.wrapping_sub(self.bias).to_be_bytes())?;
        self.last_keyframe = Some(value);
        Ok(())
    }

    fn read(&mut self, input: &mut dyn Read, length: usize) -> Result<Value> {
        let value = read_i64(input, length)?.wrapping_add(self.bias);
        self.last_keyframe = Some(value);
        Ok(Value::Int(value))
    }

    fn size_delta(&self, value: &Value) -> Result<usize> {
        expect_int(value)?;
        Ok(BiasedI64::WIDTH)
    }

    fn write_delta(&mut self, out: &mut dyn Write, value: &Value) -> Result<()> {
        let value = expect_int(value)?;
        let keyframe = self.last_keyframe.ok_or(StreamError::MissingKeyframe)?;
        let delta = value.wrapping_sub(keyframe);
        out.write_all(&delta.wrapping_sub(self.bias).to_be_bytes())?;
        Ok(())
    }

    fn read_delta(&mut self, input: &mut dyn Read, length: usize) -> Result<Value> {
        let keyframe = self.last_keyframe.ok_or(StreamError::MissingKeyframe)?;
        let delta = read_i64(input, length)?.wrapping_add(self.bias);
        Ok(Value::Int(keyframe.wrapping_add(delta)))
    }

    fn header(&self) -> Option<Value> {
        Some(Value::Int(self.bias))
    }

    fn size_header(&self) -> Result<usize> {
        Ok(BiasedI64::WIDTH)
    }

    fn write_header(&mut self, out: &mut dyn Write) -> Result<()> {
        out.write_all(&self.bias.to_be_bytes())?;
        Ok(())
    }
}

impl CodecFactory for BiasedI64 {
    fn encoding(&self) -> &'static str {
        Self::ENCODING
    }

    fn header_encoding(&self) -> Option<&'static str> {
        Some(Self::HEADER_ENCODING)
    }

    fn delta_encoding(&self) -> Option<&'static str> {
        Some(Self::DELTA_ENCODING)
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Int
    }

    fn header_kind(&self) -> Option<ValueKind> {
        Some(ValueKind::Int)
    }

    fn create(&self, header: Option<Value>) -> Result<Box<dyn Codec>> {
        let Some(header) = header else {
            return Err(StreamError::MissingHeader(Self::ENCODING));
        };
        let bias = expect_int(&header)?;
        Ok(Box::new(BiasedI64Codec { bias, last_keyframe: None }))
    }

    fn read_header(&self, input: &mut dyn Read, length: usize) -> Result<Value> {
        Ok(Value::Int(read_i64(input, length)?))
    }
}
