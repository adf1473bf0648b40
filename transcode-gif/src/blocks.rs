//! GIF block structures and the block parser.
//!
//! A stream is a header, a logical screen descriptor with an optional global
//! color table, then a sequence of blocks each introduced by a one-byte tag:
//! image separator, extension introducer or trailer.

use std::fmt;
use std::io::Read;

use tracing::{debug, trace, warn};

use crate::error::{GifError, Result};
use crate::palette::ColorTable;
use crate::reader::{ByteReader, MAX_SUB_BLOCK_LEN};

/// GIF signature.
pub const SIGNATURE: &[u8; 3] = b"GIF";

/// Extension introducer byte.
pub const EXTENSION_INTRODUCER: u8 = 0x21;
/// Image separator byte.
pub const IMAGE_SEPARATOR: u8 = 0x2C;
/// File trailer byte.
pub const TRAILER: u8 = 0x3B;

/// Plain text extension label.
pub const PLAIN_TEXT_LABEL: u8 = 0x01;
/// Graphic control extension label.
pub const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
/// Comment extension label.
pub const COMMENT_LABEL: u8 = 0xFE;
/// Application extension label.
pub const APPLICATION_LABEL: u8 = 0xFF;

const NETSCAPE_ID: &[u8; 11] = b"NETSCAPE2.0";
const ANIMEXTS_ID: &[u8; 11] = b"ANIMEXTS1.0";
const PLAIN_TEXT_HEADER_LEN: usize = 12;
/// Payload size of a graphic control extension.
const GRAPHIC_CONTROL_LEN: usize = 4;

/// The part of the stream being parsed, attached to errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Signature and version.
    Header,
    /// Logical screen descriptor.
    LogicalScreen,
    /// Global color table.
    GlobalColorTable,
    /// A block tag byte.
    BlockTag,
    /// Image descriptor.
    ImageDescriptor,
    /// Local color table.
    LocalColorTable,
    /// LZW code size and data sub-blocks.
    ImageData,
    /// Graphic control extension.
    GraphicControl,
    /// Comment extension.
    Comment,
    /// Application extension.
    Application,
    /// Plain text extension.
    PlainText,
    /// Extension with an unrecognized label.
    UnknownExtension(u8),
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Header => f.write_str("header"),
            BlockKind::LogicalScreen => f.write_str("logical screen descriptor"),
            BlockKind::GlobalColorTable => f.write_str("global color table"),
            BlockKind::BlockTag => f.write_str("block tag"),
            BlockKind::ImageDescriptor => f.write_str("image descriptor"),
            BlockKind::LocalColorTable => f.write_str("local color table"),
            BlockKind::ImageData => f.write_str("image data"),
            BlockKind::GraphicControl => f.write_str("graphic control extension"),
            BlockKind::Comment => f.write_str("comment extension"),
            BlockKind::Application => f.write_str("application extension"),
            BlockKind::PlainText => f.write_str("plain text extension"),
            BlockKind::UnknownExtension(label) => write!(f, "extension 0x{label:02x}"),
        }
    }
}

/// GIF version from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Version {
    /// GIF87a.
    Gif87a,
    /// GIF89a.
    Gif89a,
}

/// Logical screen descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogicalScreen {
    /// Canvas width.
    pub width: u16,
    /// Canvas height.
    pub height: u16,
    /// A global color table follows the descriptor.
    pub has_global_color_table: bool,
    /// Color resolution (bits per primary).
    pub color_resolution: u8,
    /// Global color table is sorted by importance.
    pub sorted: bool,
    /// Global color table bit depth; the table has 2^n entries.
    pub global_table_bits: u8,
    /// Background color index.
    pub background_index: u8,
    /// Pixel aspect ratio byte (informational).
    pub pixel_aspect_ratio: u8,
}

impl LogicalScreen {
    /// Parse the 7-byte descriptor.
    pub fn from_bytes(data: &[u8; 7]) -> Self {
        let packed = data[4];
        Self {
            width: u16::from_le_bytes([data[0], data[1]]),
            height: u16::from_le_bytes([data[2], data[3]]),
            has_global_color_table: packed & 0x80 != 0,
            color_resolution: ((packed >> 4) & 0x07) + 1,
            sorted: packed & 0x08 != 0,
            global_table_bits: (packed & 0x07) + 1,
            background_index: data[5],
            pixel_aspect_ratio: data[6],
        }
    }

    /// Number of pixels on the canvas.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Image descriptor of a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Left offset on the canvas.
    pub left: u16,
    /// Top offset on the canvas.
    pub top: u16,
    /// Frame width.
    pub width: u16,
    /// Frame height.
    pub height: u16,
    /// Rows are transmitted in interlaced order.
    pub interlaced: bool,
    /// Local table is sorted.
    pub sorted: bool,
    /// Local color table, if present.
    pub local_table: Option<ColorTable>,
}

impl FrameDescriptor {
    /// Number of indices in the frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns true if the frame rectangle lies within a `width`x`height` screen.
    pub fn fits(&self, width: u16, height: u16) -> bool {
        u32::from(self.left) + u32::from(self.width) <= u32::from(width)
            && u32::from(self.top) + u32::from(self.height) <= u32::from(height)
    }
}

/// What happens to a frame's region before the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisposalMethod {
    /// No disposal specified. Also used for reserved values 4-7.
    #[default]
    Unspecified,
    /// Leave the frame in place.
    Leave,
    /// Restore the region to the background.
    RestoreToBackground,
    /// Restore the region to what it was before the frame was drawn.
    RestoreToPrevious,
}

impl DisposalMethod {
    /// Parse disposal method from the graphic control packed byte.
    pub fn from_byte(byte: u8) -> Self {
        match (byte >> 2) & 0x07 {
            0 => DisposalMethod::Unspecified,
            1 => DisposalMethod::Leave,
            2 => DisposalMethod::RestoreToBackground,
            3 => DisposalMethod::RestoreToPrevious,
            reserved => {
                warn!(value = reserved, "reserved disposal method, treating as unspecified");
                DisposalMethod::Unspecified
            }
        }
    }
}

/// Graphic control extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphicControl {
    /// Disposal method for the frame this extension applies to.
    pub disposal: DisposalMethod,
    /// Viewer should wait for user input.
    pub user_input: bool,
    /// Transparent color index, if the transparency flag is set.
    pub transparent_index: Option<u8>,
    /// Delay in centiseconds.
    pub delay: u16,
}

impl GraphicControl {
    /// Parse the 4-byte extension payload.
    pub fn from_bytes(data: &[u8; 4]) -> Self {
        let flags = data[0];
        Self {
            disposal: DisposalMethod::from_byte(flags),
            user_input: flags & 0x02 != 0,
            transparent_index: (flags & 0x01 != 0).then_some(data[3]),
            delay: u16::from_le_bytes([data[1], data[2]]),
        }
    }
}

/// One parsed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Image descriptor and optional local table; image data follows in the stream.
    Image(FrameDescriptor),
    /// Graphic control extension.
    GraphicControl(GraphicControl),
    /// Comment text.
    Comment(Vec<u8>),
    /// Application extension carrying a loop count (already adjusted, 0 = forever).
    LoopCount(u32),
    /// Any other application extension, skipped.
    Application([u8; 11]),
    /// Plain text extension, skipped.
    PlainText,
    /// Extension with an unknown label, skipped.
    UnknownExtension(u8),
    /// End of stream.
    Trailer,
}

/// Read the signature, version and logical screen descriptor.
pub(crate) fn read_header<R: Read>(reader: &mut ByteReader<R>) -> Result<(Version, LogicalScreen)> {
    reader.set_block(BlockKind::Header);
    let mut header = [0u8; 6];
    reader.read_bytes(&mut header)?;
    if &header[..3] != SIGNATURE {
        return Err(GifError::InvalidSignature {
            found: [header[0], header[1], header[2]],
        });
    }
    let version = match &header[3..] {
        b"87a" => Version::Gif87a,
        b"89a" => Version::Gif89a,
        other => {
            return Err(GifError::UnsupportedVersion {
                version: String::from_utf8_lossy(other).into_owned(),
            })
        }
    };

    reader.set_block(BlockKind::LogicalScreen);
    let mut descriptor = [0u8; 7];
    reader.read_bytes(&mut descriptor)?;
    let screen = LogicalScreen::from_bytes(&descriptor);

    debug!(
        ?version,
        width = screen.width,
        height = screen.height,
        global_table = screen.has_global_color_table,
        "parsed GIF header"
    );
    Ok((version, screen))
}

/// Read the next block.
///
/// Extensions are consumed through their terminator. For an image block only
/// the descriptor and local table are consumed; the caller must then read
/// the image data.
pub(crate) fn read_block<R: Read>(reader: &mut ByteReader<R>) -> Result<Block> {
    reader.set_block(BlockKind::BlockTag);
    let tag_offset = reader.offset();
    match reader.read_u8()? {
        IMAGE_SEPARATOR => read_image_descriptor(reader).map(Block::Image),
        EXTENSION_INTRODUCER => read_extension(reader),
        TRAILER => Ok(Block::Trailer),
        tag => Err(GifError::UnknownBlock {
            offset: tag_offset,
            tag,
        }),
    }
}

fn read_image_descriptor<R: Read>(reader: &mut ByteReader<R>) -> Result<FrameDescriptor> {
    reader.set_block(BlockKind::ImageDescriptor);
    let left = reader.read_u16()?;
    let top = reader.read_u16()?;
    let width = reader.read_u16()?;
    let height = reader.read_u16()?;
    let flags = reader.read_u8()?;

    let local_table = if flags & 0x80 != 0 {
        reader.set_block(BlockKind::LocalColorTable);
        Some(ColorTable::read(reader, (flags & 0x07) + 1)?)
    } else {
        None
    };

    Ok(FrameDescriptor {
        left,
        top,
        width,
        height,
        interlaced: flags & 0x40 != 0,
        sorted: flags & 0x20 != 0,
        local_table,
    })
}

fn read_extension<R: Read>(reader: &mut ByteReader<R>) -> Result<Block> {
    let label = reader.read_u8()?;
    match label {
        GRAPHIC_CONTROL_LABEL => read_graphic_control(reader).map(Block::GraphicControl),
        COMMENT_LABEL => {
            reader.set_block(BlockKind::Comment);
            reader.collect_sub_blocks().map(Block::Comment)
        }
        APPLICATION_LABEL => read_application(reader),
        PLAIN_TEXT_LABEL => read_plain_text(reader),
        other => {
            reader.set_block(BlockKind::UnknownExtension(other));
            let skipped = reader.skip_sub_blocks()?;
            warn!(label = other, skipped, "skipped unknown extension");
            Ok(Block::UnknownExtension(other))
        }
    }
}

fn read_graphic_control<R: Read>(reader: &mut ByteReader<R>) -> Result<GraphicControl> {
    reader.set_block(BlockKind::GraphicControl);
    let mut buf = [0u8; MAX_SUB_BLOCK_LEN];
    let len = reader.read_sub_block(&mut buf)?;
    if len != GRAPHIC_CONTROL_LEN {
        return Err(reader.malformed(format!(
            "payload is {len} bytes, expected {GRAPHIC_CONTROL_LEN}"
        )));
    }
    let control = GraphicControl::from_bytes(&[buf[0], buf[1], buf[2], buf[3]]);
    reader.skip_sub_blocks()?;
    Ok(control)
}

fn read_application<R: Read>(reader: &mut ByteReader<R>) -> Result<Block> {
    reader.set_block(BlockKind::Application);
    let mut buf = [0u8; MAX_SUB_BLOCK_LEN];
    let len = reader.read_sub_block(&mut buf)?;
    if len == 0 {
        return Ok(Block::Application([0; 11]));
    }
    if len != 11 {
        trace!(len, "application extension with non-standard identifier block");
        reader.skip_sub_blocks()?;
        return Ok(Block::Application([0; 11]));
    }

    let mut identifier = [0u8; 11];
    identifier.copy_from_slice(&buf[..11]);

    if &identifier == NETSCAPE_ID || &identifier == ANIMEXTS_ID {
        let len = reader.read_sub_block(&mut buf)?;
        if len == 0 {
            return Ok(Block::Application(identifier));
        }
        let loop_count = netscape_loop_count(&buf[..len]);
        reader.skip_sub_blocks()?;
        if let Some(count) = loop_count {
            debug!(loop_count = count, "found loop extension");
            return Ok(Block::LoopCount(count));
        }
        return Ok(Block::Application(identifier));
    }

    let skipped = reader.skip_sub_blocks()?;
    trace!(
        identifier = %String::from_utf8_lossy(&identifier),
        skipped,
        "skipped application extension"
    );
    Ok(Block::Application(identifier))
}

fn read_plain_text<R: Read>(reader: &mut ByteReader<R>) -> Result<Block> {
    reader.set_block(BlockKind::PlainText);
    let mut buf = [0u8; MAX_SUB_BLOCK_LEN];
    let len = reader.read_sub_block(&mut buf)?;
    if len != PLAIN_TEXT_HEADER_LEN {
        return Err(reader.malformed(format!(
            "header is {len} bytes, expected {PLAIN_TEXT_HEADER_LEN}"
        )));
    }
    let skipped = reader.skip_sub_blocks()?;
    trace!(skipped, "skipped plain text extension");
    Ok(Block::PlainText)
}

/// Loop count from a NETSCAPE2.0 data sub-block `[1, lo, hi]`.
///
/// A stored count N > 0 means the animation plays N + 1 times in total; 0 means forever.
pub fn netscape_loop_count(sub_block: &[u8]) -> Option<u32> {
    match sub_block {
        [1, lo, hi] => {
            let stored = u32::from(u16::from_le_bytes([*lo, *hi]));
            Some(if stored == 0 { 0 } else { stored + 1 })
        }
        _ => None,
    }
}
