//! Payload codecs and their registry.
//!
//! The framing layer treats payloads opaquely; interpretation is delegated
//! to a codec chosen by the envelope's encoding string. Per-channel state
//! (a stored header, the last keyframe for delta reconstruction) lives
//! inside the codec instance, so readers and writers hold one boxed codec
//! per channel.
//!
//! Codecs come in three capability tiers:
//!
//! - headerless (plain text, binary blobs): every frame is a keyframe
//! - headered: a one-shot header frame carries persistent parameters and
//!   `encode`/`decode` may be stateful (e.g. biasing against the header)
//! - delta-capable: additionally encode differences against the last
//!   keyframe
//!
//! The registry replaces compile-time codec lists with a runtime lookup by
//! encoding string, header encoding, or value variant.

mod binary;
mod text;

use std::io::{Read, Write};
use std::sync::Arc;

use bytes::Bytes;

pub use binary::Binary;
pub use text::PlainText;

use crate::error::{Result, StreamError};

/// Runtime payload value routed through multi-channel writers and readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// UTF-8 text
    Text(String),
    /// Opaque bytes
    Binary(Bytes),
    /// Signed integer
    Int(i64),
}

impl Value {
    /// The variant tag, used to deduce a codec for a value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Binary(_) => ValueKind::Binary,
            Self::Int(_) => ValueKind::Int,
        }
    }

    /// JSON rendering of the decoded value, for the dump surfaces.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(text) => serde_json::json!({ "text": text }),
            Self::Binary(data) => serde_json::json!({ "length": data.len() }),
            Self::Int(value) => serde_json::json!({ "value": value }),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Bytes> for Value {
    fn from(data: Bytes) -> Self {
        Self::Binary(data)
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(data))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Variant tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// [`Value::Text`]
    Text,
    /// [`Value::Binary`]
    Binary,
    /// [`Value::Int`]
    Int,
}

/// A payload codec driving one channel.
///
/// Implementations may be stateful: headered codecs keep their header for
/// the life of the channel, delta-capable codecs retain the last keyframe.
/// The default method bodies give headerless, delta-less codecs for free.
pub trait Codec {
    /// Encoding string written into keyframe envelopes.
    fn encoding(&self) -> &'static str;

    /// Encoding string of header frames, for headered codecs.
    fn header_encoding(&self) -> Option<&'static str> {
        None
    }

    /// Encoding string of delta frames, for delta-capable codecs.
    fn delta_encoding(&self) -> Option<&'static str> {
        None
    }

    /// The value variant this codec accepts.
    fn value_kind(&self) -> ValueKind;

    /// Serialized size of a keyframe payload for `value`.
    fn size(&self, value: &Value) -> Result<usize>;

    /// Write a keyframe payload. Must emit exactly [`Codec::size`] bytes.
    fn write(&mut self, out: &mut dyn Write, value: &Value) -> Result<()>;

    /// Read a keyframe payload of exactly `length` bytes.
    fn read(&mut self, input: &mut dyn Read, length: usize) -> Result<Value>;

    /// Serialized size of a delta payload for `value`.
    fn size_delta(&self, _value: &Value) -> Result<usize> {
        Err(StreamError::DeltaUnsupported(self.encoding()))
    }

    /// Write a delta payload against the last keyframe.
    fn write_delta(&mut self, _out: &mut dyn Write, _value: &Value) -> Result<()> {
        Err(StreamError::DeltaUnsupported(self.encoding()))
    }

    /// Read a delta payload of exactly `length` bytes and reconstruct the
    /// value from the last keyframe.
    fn read_delta(&mut self, _input: &mut dyn Read, _length: usize) -> Result<Value> {
        Err(StreamError::DeltaUnsupported(self.encoding()))
    }

    /// The persistent header, for headered codecs.
    fn header(&self) -> Option<Value> {
        None
    }

    /// Serialized size of the header payload.
    fn size_header(&self) -> Result<usize> {
        Err(StreamError::HeaderUnsupported(self.encoding()))
    }

    /// Write the header payload.
    fn write_header(&mut self, _out: &mut dyn Write) -> Result<()> {
        Err(StreamError::HeaderUnsupported(self.encoding()))
    }
}

/// Constructor and static predicates for one codec family.
///
/// Registered with a [`CodecRegistry`]; readers and writers instantiate
/// codecs lazily through the factory on first observation of an encoding
/// (readers) or first write to a channel (writers).
pub trait CodecFactory {
    /// Keyframe encoding string.
    fn encoding(&self) -> &'static str;

    /// Header encoding string, for headered codec families.
    fn header_encoding(&self) -> Option<&'static str> {
        None
    }

    /// Delta encoding string, for delta-capable codec families.
    fn delta_encoding(&self) -> Option<&'static str> {
        None
    }

    /// The value variant the codec accepts.
    fn value_kind(&self) -> ValueKind;

    /// The value variant of the header, for headered codec families.
    fn header_kind(&self) -> Option<ValueKind> {
        None
    }

    /// Whether construction requires a header.
    fn requires_header(&self) -> bool {
        self.header_encoding().is_some()
    }

    /// Instantiate a codec. Headered families require `Some(header)`,
    /// headerless families require `None`.
    fn create(&self, header: Option<Value>) -> Result<Box<dyn Codec>>;

    /// Read a header payload of exactly `length` bytes.
    fn read_header(&self, _input: &mut dyn Read, _length: usize) -> Result<Value> {
        Err(StreamError::HeaderUnsupported(self.encoding()))
    }
}

/// Runtime registry of codec factories.
///
/// Lookup order is registration order; the first match wins, so more
/// specific encodings should be registered before catch-alls.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    factories: Vec<Arc<dyn CodecFactory>>,
}

impl CodecRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in codecs: [`PlainText`] and [`Binary`].
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PlainText));
        registry.register(Arc::new(Binary));
        registry
    }

    /// Register a codec factory.
    pub fn register(&mut self, factory: Arc<dyn CodecFactory>) {
        self.factories.push(factory);
    }

    /// Factory whose keyframe or delta encoding matches `encoding`.
    #[must_use]
    pub fn by_encoding(&self, encoding: &str) -> Option<&Arc<dyn CodecFactory>> {
        self.factories
            .iter()
            .find(|f| f.encoding() == encoding || f.delta_encoding() == Some(encoding))
    }

    /// Headerless factory whose keyframe encoding matches `encoding`.
    ///
    /// Used by readers to install codecs for identifiers first seen on a
    /// data frame; headered families need their header frame instead.
    #[must_use]
    pub fn headerless_by_encoding(&self, encoding: &str) -> Option<&Arc<dyn CodecFactory>> {
        self.factories.iter().find(|f| !f.requires_header() && f.encoding() == encoding)
    }

    /// Factory whose header encoding matches `encoding`.
    #[must_use]
    pub fn by_header_encoding(&self, encoding: &str) -> Option<&Arc<dyn CodecFactory>> {
        self.factories.iter().find(|f| f.header_encoding() == Some(encoding))
    }

    /// Factory accepting the runtime variant of `value`.
    #[must_use]
    pub fn by_value(&self, value: &Value) -> Option<&Arc<dyn CodecFactory>> {
        self.factories.iter().find(|f| f.value_kind() == value.kind())
    }

    /// Factory whose header variant matches `header`.
    ///
    /// Used by writers to pre-register channels from a header map.
    #[must_use]
    pub fn by_header_value(&self, header: &Value) -> Option<&Arc<dyn CodecFactory>> {
        self.factories.iter().find(|f| f.header_kind() == Some(header.kind()))
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.iter().map(|factory| factory.encoding())).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_lookup() {
        let registry = CodecRegistry::standard();

        assert!(registry.by_encoding("text/plain").is_some());
        assert!(registry.by_encoding("application/octet-stream").is_some());
        assert!(registry.by_encoding("application/x-unknown").is_none());
        assert!(registry.by_header_encoding("text/plain").is_none());
    }

    #[test]
    fn lookup_by_value_variant() {
        let registry = CodecRegistry::standard();

        let text = Value::from("hi");
        assert_eq!(registry.by_value(&text).map(|f| f.encoding()), Some("text/plain"));

        let blob = Value::from(vec![1u8, 2, 3]);
        assert_eq!(
            registry.by_value(&blob).map(|f| f.encoding()),
            Some("application/octet-stream")
        );

        assert!(registry.by_value(&Value::Int(7)).is_none());
    }
}
