//! Error types for the GIF decoder

use std::io;
use thiserror::Error;

use crate::blocks::BlockKind;

/// Result type for GIF operations
pub type Result<T> = std::result::Result<T, GifError>;

/// Errors that can occur while decoding a GIF stream
///
/// Stream-level errors carry the byte offset at which they were detected and
/// the kind of block being parsed, so a corrupt file can be located.
#[derive(Error, Debug)]
pub enum GifError {
    /// I/O error from the underlying byte source
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream does not start with `GIF`
    #[error("Invalid GIF signature: {found:02x?}")]
    InvalidSignature {
        /// The first three bytes of the stream
        found: [u8; 3],
    },

    /// The signature is present but the version is neither 87a nor 89a
    #[error("Unsupported GIF version: {version:?}")]
    UnsupportedVersion {
        /// The version bytes as read
        version: String,
    },

    /// End of stream reached before the trailer
    #[error("Truncated stream at offset {offset} while reading {block}")]
    TruncatedStream {
        /// Offset of the first missing byte
        offset: u64,
        /// Block being parsed
        block: BlockKind,
    },

    /// The LZW code stream is inconsistent with the frame it describes
    #[error("LZW desync at offset {offset} in {block}: {reason}")]
    DecodeDesync {
        /// Offset of the byte holding the offending code
        offset: u64,
        /// Block being parsed
        block: BlockKind,
        /// What went wrong
        reason: String,
    },

    /// LZW minimum code size outside 2..=8
    #[error("Invalid LZW minimum code size {size} at offset {offset}")]
    InvalidCodeSize {
        /// Offset of the code size byte
        offset: u64,
        /// Declared size
        size: u8,
    },

    /// A block tag other than image separator, extension introducer or trailer
    #[error("Unknown block tag 0x{tag:02x} at offset {offset}")]
    UnknownBlock {
        /// Offset of the tag byte
        offset: u64,
        /// Tag value
        tag: u8,
    },

    /// A fixed-layout block has the wrong size
    #[error("Malformed {block} at offset {offset}: {reason}")]
    Malformed {
        /// Offset just past the offending field
        offset: u64,
        /// Block being parsed
        block: BlockKind,
        /// What went wrong
        reason: String,
    },

    /// Restore-to-previous disposal with no saved canvas region
    #[error("Frame {frame} disposal restores a previous canvas that was never saved")]
    InconsistentDisposal {
        /// Index of the frame being composited
        frame: usize,
    },

    /// Frame rectangle extends past the logical screen
    #[error(
        "Frame rectangle {width}x{height}+{left}+{top} exceeds logical screen {screen_width}x{screen_height}"
    )]
    FrameOutOfBounds {
        /// Frame left offset
        left: u16,
        /// Frame top offset
        top: u16,
        /// Frame width
        width: u16,
        /// Frame height
        height: u16,
        /// Logical screen width
        screen_width: u16,
        /// Logical screen height
        screen_height: u16,
    },

    /// A configured decoder limit was hit
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
}

impl GifError {
    /// Returns true if the error describes corrupt or unsupported input,
    /// as opposed to an I/O fault, a limit, or an internal invariant violation.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            GifError::InvalidSignature { .. }
                | GifError::UnsupportedVersion { .. }
                | GifError::TruncatedStream { .. }
                | GifError::DecodeDesync { .. }
                | GifError::InvalidCodeSize { .. }
                | GifError::UnknownBlock { .. }
                | GifError::Malformed { .. }
                | GifError::FrameOutOfBounds { .. }
        )
    }

    /// Byte offset at which the error was detected, when known.
    pub fn offset(&self) -> Option<u64> {
        match self {
            GifError::TruncatedStream { offset, .. }
            | GifError::DecodeDesync { offset, .. }
            | GifError::InvalidCodeSize { offset, .. }
            | GifError::UnknownBlock { offset, .. }
            | GifError::Malformed { offset, .. } => Some(*offset),
            GifError::InvalidSignature { .. } | GifError::UnsupportedVersion { .. } => Some(0),
            _ => None,
        }
    }
}

impl From<GifError> for io::Error {
    fn from(err: GifError) -> Self {
        match err {
            GifError::Io(e) => e,
            GifError::TruncatedStream { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
