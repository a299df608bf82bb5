use bytes::{Buf, Bytes};
use http_body::SizeHint;

/// Represents an item in the HTTP message payload stream.
///
/// The body producer emits either data chunks or the end-of-stream marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// Represents the size information of an HTTP payload.
///
/// - Known length: exact number of bytes will be produced
/// - Chunked: produced via chunked transfer encoding, total unknown
/// - Empty: no payload at all
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// Returns a reference to the contained bytes if this is a `Chunk`
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    /// Consumes the item and returns the contained bytes if this is a `Chunk`
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

impl From<PayloadSize> for SizeHint {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(length) => SizeHint::with_exact(length),
            PayloadSize::Chunked => SizeHint::new(),
            PayloadSize::Empty => SizeHint::with_exact(0),
        }
    }
}

impl From<SizeHint> for PayloadSize {
    fn from(size_hint: SizeHint) -> Self {
        match size_hint.exact() {
            Some(0) => PayloadSize::Empty,
            Some(length) => PayloadSize::Length(length),
            None => PayloadSize::Chunked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_item_accessors() {
        let chunk = PayloadItem::Chunk(Bytes::from_static(b"abc"));
        assert!(chunk.is_chunk());
        assert!(!chunk.is_eof());
        assert_eq!(chunk.as_bytes().map(|b| b.len()), Some(3));
        assert_eq!(chunk.into_bytes(), Some(Bytes::from_static(b"abc")));

        let eof: PayloadItem = PayloadItem::Eof;
        assert!(eof.is_eof());
        assert_eq!(eof.into_bytes(), None);
    }

    #[test]
    fn payload_size_round_trip() {
        assert_eq!(PayloadSize::from(SizeHint::with_exact(0)), PayloadSize::Empty);
        assert_eq!(PayloadSize::from(SizeHint::with_exact(10)), PayloadSize::Length(10));
        assert_eq!(PayloadSize::from(SizeHint::new()), PayloadSize::Chunked);

        assert_eq!(SizeHint::from(PayloadSize::Length(10)).exact(), Some(10));
        assert_eq!(SizeHint::from(PayloadSize::Empty).exact(), Some(0));
        assert_eq!(SizeHint::from(PayloadSize::Chunked).exact(), None);
    }
}
