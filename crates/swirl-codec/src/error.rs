//! Codec errors.

use thiserror::Error;

/// Compression failed; no frame was produced.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The codec cannot represent an image of this size, or the sample
    /// count disagrees with it.
    #[error("{codec} cannot encode {width}x{height} from {samples} samples")]
    Dimensions {
        /// Codec name.
        codec: &'static str,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// RGB samples supplied.
        samples: usize,
    },
    /// The codec library reported an error.
    #[error("{codec} compression failed: {reason}")]
    Compression {
        /// Codec name.
        codec: &'static str,
        /// Library diagnostic.
        reason: String,
    },
    /// The codec reported success but wrote nothing.
    #[error("{codec} produced an empty frame")]
    EmptyOutput {
        /// Codec name.
        codec: &'static str,
    },
}
