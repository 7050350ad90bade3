//! Encoded frames.

use std::fmt;

/// A complete compressed image.
///
/// The bytes live in a boxed slice that is never reallocated, so
/// [`as_ptr`](EncodedFrame::as_ptr) stays valid for as long as the frame
/// itself is alive.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    bytes: Box<[u8]>,
}

impl EncodedFrame {
    /// Take ownership of compressed bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// The compressed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Start of the compressed bytes.
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the frame holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Give up the bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes.into_vec()
    }
}

impl fmt::Debug for EncodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedFrame")
            .field("len", &self.bytes.len())
            .finish()
    }
}
