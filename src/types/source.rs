//! Reply sources and their variety classification.
//!
//! A handler can reply with anything from nothing at all to a lazy byte
//! stream. [`Source`] is the tagged form of those inputs and [`Variety`] the
//! classification the response records. Classification follows a fixed
//! priority: buffer, then stream, then deferred, then plain.
//!
//! The harness never polls a stream or awaits a deferred value; that is left
//! to whatever driver consumes the response.

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{Future, FutureExt, Stream, StreamExt};
use serde_json::Value;
use std::fmt;
use std::io;

/// A lazily produced byte sequence.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// A value that resolves to another source later.
pub type Deferred = BoxFuture<'static, Source>;

/// The raw value a handler replied with.
#[derive(Default)]
pub enum Source {
    /// No payload
    #[default]
    Null,
    /// Textual payload
    Text(String),
    /// Any other structured payload
    Json(Value),
    /// Raw binary payload
    Buffer(Bytes),
    /// Lazy byte stream
    Stream(ByteStream),
    /// Deferred value, resolved by the driver
    Deferred(Deferred),
}

/// Classification tag of a response source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variety {
    /// Null, text or structured value
    Plain,
    /// Binary buffer
    Buffer,
    /// Byte stream
    Stream,
    /// Deferred value
    Promise,
}

impl Variety {
    /// Lower-case label of this variety.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Variety::Plain => "plain",
            Variety::Buffer => "buffer",
            Variety::Stream => "stream",
            Variety::Promise => "promise",
        }
    }
}

impl fmt::Display for Variety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Source {
    /// Wrap a byte stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Source::Stream(stream.boxed())
    }

    /// Wrap a future that yields the eventual source.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Source> + Send + 'static,
    {
        Source::Deferred(future.boxed())
    }

    /// Classify this source.
    #[must_use]
    pub fn variety(&self) -> Variety {
        match self {
            Source::Buffer(_) => Variety::Buffer,
            Source::Stream(_) => Variety::Stream,
            Source::Deferred(_) => Variety::Promise,
            Source::Null | Source::Text(_) | Source::Json(_) => Variety::Plain,
        }
    }

    /// Whether this is the empty source.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Source::Null)
    }

    /// The textual payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Source::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The structured payload, if any.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Source::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The binary payload, if any.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Source::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Null => f.write_str("Null"),
            Source::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Source::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Source::Buffer(bytes) => f.debug_tuple("Buffer").field(bytes).finish(),
            Source::Stream(_) => f.write_str("Stream(..)"),
            Source::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<()> for Source {
    fn from(_: ()) -> Self {
        Source::Null
    }
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Source::Text(text.to_string())
    }
}

impl From<String> for Source {
    fn from(text: String) -> Self {
        Source::Text(text)
    }
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Source::Null,
            Value::String(text) => Source::Text(text),
            other => Source::Json(other),
        }
    }
}

impl From<Bytes> for Source {
    fn from(bytes: Bytes) -> Self {
        Source::Buffer(bytes)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Buffer(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Source {
    fn from(bytes: &'static [u8]) -> Self {
        Source::Buffer(Bytes::from_static(bytes))
    }
}

impl<T: Into<Source>> From<Option<T>> for Source {
    fn from(value: Option<T>) -> Self {
        value.map_or(Source::Null, Into::into)
    }
}

macro_rules! json_source {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Source {
                fn from(value: $ty) -> Self {
                    Source::Json(Value::from(value))
                }
            }
        )*
    };
}

json_source!(bool, i32, i64, u32, u64, f64);
