//! # transcode-gif
//!
//! An animated GIF decoder producing fully composited palette-indexed frames.
//!
//! ## Features
//!
//! - GIF87a and GIF89a block parsing
//! - Variable-width LZW decompression across data sub-blocks
//! - Interlaced row reordering
//! - Frame compositing with all disposal methods and transparency
//! - Loop count and comment extraction
//! - Configurable resource limits
//!
//! ## Decoding Example
//!
//! ```rust,no_run
//! use transcode_gif::GifDecoder;
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = File::open("animation.gif").unwrap();
//! let mut decoder = GifDecoder::new(BufReader::new(file)).unwrap();
//! while let Some(frame) = decoder.next_frame().unwrap() {
//!     println!("frame {} lasts {} ms", frame.index, frame.duration_ms());
//! }
//! ```
//!
//! ## Configuration Example
//!
//! ```rust,no_run
//! use transcode_gif::{BoundsPolicy, DecoderConfig, GifDecoder};
//!
//! let data = std::fs::read("animation.gif").unwrap();
//! let config = DecoderConfig::new()
//!     .out_of_bounds(BoundsPolicy::Clip)
//!     .max_canvas_pixels(Some(4096 * 4096));
//! let animation = GifDecoder::with_config(data.as_slice(), config)
//!     .unwrap()
//!     .decode_all()
//!     .unwrap();
//! println!("{} frames", animation.frames.len());
//! ```

pub mod error;
pub mod config;
pub mod blocks;
pub mod palette;
pub mod interlace;
pub mod compositor;
pub mod decoder;
mod reader;
mod bitreader;
mod lzw;

use std::io::BufReader;
use std::path::Path;

pub use error::{GifError, Result};
pub use config::{BoundsPolicy, CommentPolicy, DecoderConfig};
pub use blocks::{BlockKind, DisposalMethod, GraphicControl, LogicalScreen, Version};
pub use palette::{ColorTable, PaletteSource};
pub use compositor::{Canvas, CompositorState, FrameUpdate, Rect};
pub use decoder::{Animation, DecodedFrame, GifDecoder, StreamInfo};
pub use lzw::{MAX_CODE_SIZE, MIN_CODE_SIZE};

/// Decode every frame of an in-memory GIF.
pub fn decode_gif(data: &[u8]) -> Result<Animation> {
    GifDecoder::new(data)?.decode_all()
}

/// Decode every frame of a GIF file.
pub fn decode_gif_file(path: impl AsRef<Path>) -> Result<Animation> {
    let file = std::fs::File::open(path)?;
    GifDecoder::new(BufReader::new(file))?.decode_all()
}
