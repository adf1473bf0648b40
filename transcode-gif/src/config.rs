//! Decoder configuration and resource limits.

/// Default budget for bytes read from data sub-blocks across a stream.
pub const DEFAULT_MAX_DATA_BYTES: u64 = 512 * 1024 * 1024;

/// Default cap on logical screen area, in pixels.
pub const DEFAULT_MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Which comment extensions are retained in [`StreamInfo`](crate::StreamInfo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommentPolicy {
    /// Keep the first comment in the stream, parse and discard the rest.
    #[default]
    FirstOnly,
    /// Keep every comment.
    All,
}

/// What to do with a frame whose rectangle extends past the logical screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundsPolicy {
    /// Fail with [`GifError::FrameOutOfBounds`](crate::GifError::FrameOutOfBounds).
    #[default]
    Reject,
    /// Composite only the part of the frame that lies on the screen.
    Clip,
}

/// GIF decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecoderConfig {
    /// Comment retention policy.
    pub comment_policy: CommentPolicy,
    /// Out-of-bounds frame handling.
    pub out_of_bounds: BoundsPolicy,
    /// Maximum bytes consumed from data sub-blocks over the whole stream (None = unlimited).
    pub max_data_bytes: Option<u64>,
    /// Maximum logical screen area in pixels (None = unlimited).
    pub max_canvas_pixels: Option<u64>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            comment_policy: CommentPolicy::FirstOnly,
            out_of_bounds: BoundsPolicy::Reject,
            max_data_bytes: Some(DEFAULT_MAX_DATA_BYTES),
            max_canvas_pixels: Some(DEFAULT_MAX_CANVAS_PIXELS),
        }
    }
}

impl DecoderConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comment retention policy.
    pub fn comment_policy(mut self, policy: CommentPolicy) -> Self {
        self.comment_policy = policy;
        self
    }

    /// Set the out-of-bounds frame policy.
    pub fn out_of_bounds(mut self, policy: BoundsPolicy) -> Self {
        self.out_of_bounds = policy;
        self
    }

    /// Set the sub-block byte budget.
    pub fn max_data_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_data_bytes = limit;
        self
    }

    /// Set the logical screen area limit.
    pub fn max_canvas_pixels(mut self, limit: Option<u64>) -> Self {
        self.max_canvas_pixels = limit;
        self
    }

    /// Remove all resource limits.
    pub fn unlimited(self) -> Self {
        self.max_data_bytes(None).max_canvas_pixels(None)
    }
}
