//! GIF decode driver.
//!
//! [`GifDecoder`] reads the header on construction, then produces one fully
//! composited frame per call to [`GifDecoder::next_frame`], skipping
//! extension blocks along the way.

use std::io::Read;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::blocks::{
    self, Block, BlockKind, DisposalMethod, FrameDescriptor, GraphicControl, LogicalScreen, Version,
};
use crate::compositor::{CompositorState, FrameUpdate, Rect};
use crate::config::{BoundsPolicy, CommentPolicy, DecoderConfig};
use crate::error::{GifError, Result};
use crate::interlace;
use crate::lzw::{LzwDecoder, MAX_CODE_SIZE, MIN_CODE_SIZE};
use crate::palette::{self, ColorTable, PaletteSource};
use crate::reader::ByteReader;

/// A fully composited output frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Zero-based frame number.
    pub index: usize,
    /// Canvas width.
    pub width: u16,
    /// Canvas height.
    pub height: u16,
    /// Row-major palette indices for the whole canvas.
    pub pixels: Vec<u8>,
    /// Color table in effect for this frame.
    pub palette: Arc<ColorTable>,
    /// Where the color table came from.
    pub palette_source: PaletteSource,
    /// Delay in centiseconds (0 without a graphic control extension).
    pub delay: u16,
    /// Transparent color index.
    pub transparent_index: Option<u8>,
    /// Disposal applied before the next frame.
    pub disposal: DisposalMethod,
    /// Viewer should wait for user input.
    pub user_input: bool,
    /// Region this frame updated.
    pub rect: Rect,
    /// Frame data was interlaced.
    pub interlaced: bool,
}

impl DecodedFrame {
    /// Frame duration in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        u32::from(self.delay) * 10
    }

    /// Palette index at (x, y).
    pub fn index_at(&self, x: u16, y: u16) -> Option<u8> {
        (x < self.width && y < self.height)
            .then(|| self.pixels[y as usize * self.width as usize + x as usize])
    }

    /// Expand to RGBA8 using the frame's color table.
    ///
    /// The transparent index becomes fully transparent black; indices past the
    /// end of the table become opaque black.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixels.len() * 4);
        for &index in &self.pixels {
            if self.transparent_index == Some(index) {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            let [r, g, b] = self.palette.get(index).unwrap_or([0, 0, 0]);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
        rgba
    }
}

/// Stream-wide information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Header version.
    pub version: Version,
    /// Logical screen descriptor.
    pub screen: LogicalScreen,
    /// Global color table.
    pub global_color_table: Option<Arc<ColorTable>>,
    /// Total plays from a loop extension (0 = forever), if one has been seen.
    pub loop_count: Option<u32>,
    /// Retained comment texts.
    pub comments: Vec<Vec<u8>>,
    /// Frames emitted so far.
    pub frame_count: usize,
}

impl StreamInfo {
    /// First comment as text, if any.
    pub fn comment(&self) -> Option<String> {
        self.comments
            .first()
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }
}

/// A decoded stream: its information and every frame.
#[derive(Debug, Clone)]
pub struct Animation {
    /// Stream information after the trailer.
    pub info: StreamInfo,
    /// All frames in order.
    pub frames: Vec<DecodedFrame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitBlock,
    Done,
    Failed,
}

/// Pull-based GIF decoder.
///
/// Not restartable: once the trailer is reached or an error is returned,
/// every further call yields `Ok(None)`.
pub struct GifDecoder<R: Read> {
    reader: ByteReader<R>,
    config: DecoderConfig,
    state: State,
    info: StreamInfo,
    compositor: CompositorState,
    pending_control: Option<GraphicControl>,
    lzw: LzwDecoder,
}

impl<R: Read> GifDecoder<R> {
    /// Create a decoder with default configuration and read the header.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_config(reader, DecoderConfig::default())
    }

    /// Create a decoder with a custom configuration and read the header.
    pub fn with_config(reader: R, config: DecoderConfig) -> Result<Self> {
        let mut reader = ByteReader::new(reader, config.max_data_bytes);
        let (version, screen) = blocks::read_header(&mut reader)?;

        if let Some(limit) = config.max_canvas_pixels {
            if screen.pixel_count() as u64 > limit {
                return Err(GifError::LimitExceeded(format!(
                    "logical screen {}x{} exceeds {} pixels",
                    screen.width, screen.height, limit
                )));
            }
        }

        let global_color_table = if screen.has_global_color_table {
            reader.set_block(BlockKind::GlobalColorTable);
            Some(Arc::new(ColorTable::read(&mut reader, screen.global_table_bits)?))
        } else {
            None
        };

        let background = global_color_table
            .as_ref()
            .map(|_| screen.background_index);
        let compositor = CompositorState::new(screen.width, screen.height, background);

        Ok(Self {
            reader,
            config,
            state: State::AwaitBlock,
            info: StreamInfo {
                version,
                screen,
                global_color_table,
                loop_count: None,
                comments: Vec::new(),
                frame_count: 0,
            },
            compositor,
            pending_control: None,
            lzw: LzwDecoder::new(),
        })
    }

    /// Stream information gathered so far.
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Logical screen descriptor.
    pub fn screen(&self) -> &LogicalScreen {
        &self.info.screen
    }

    /// Loop count seen so far (0 = forever).
    pub fn loop_count(&self) -> Option<u32> {
        self.info.loop_count
    }

    /// Bytes consumed from the source.
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    /// Returns true once the trailer has been read or decoding has failed.
    pub fn is_finished(&self) -> bool {
        self.state != State::AwaitBlock
    }

    /// Decode the next frame, or `None` at the end of the stream.
    pub fn next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        if self.state != State::AwaitBlock {
            return Ok(None);
        }
        match self.advance() {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => {
                self.state = State::Done;
                debug!(frames = self.info.frame_count, "reached trailer");
                Ok(None)
            }
            Err(err) => {
                self.state = State::Failed;
                warn!(error = %err, offset = self.reader.offset(), "GIF decode failed");
                Err(err)
            }
        }
    }

    /// Decode every remaining frame.
    pub fn decode_all(mut self) -> Result<Animation> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(Animation {
            info: self.info,
            frames,
        })
    }

    fn advance(&mut self) -> Result<Option<DecodedFrame>> {
        loop {
            match blocks::read_block(&mut self.reader)? {
                Block::Image(descriptor) => return self.decode_frame(descriptor).map(Some),
                Block::GraphicControl(control) => {
                    if self.pending_control.is_some() {
                        debug!("graphic control extension replaced before use");
                    }
                    self.pending_control = Some(control);
                }
                Block::Comment(text) => self.retain_comment(text),
                Block::LoopCount(count) => self.info.loop_count = Some(count),
                Block::PlainText => {
                    // A graphic control block applies to the next graphic rendering block.
                    self.pending_control = None;
                }
                Block::Application(_) | Block::UnknownExtension(_) => {}
                Block::Trailer => return Ok(None),
            }
        }
    }

    fn retain_comment(&mut self, text: Vec<u8>) {
        match self.config.comment_policy {
            CommentPolicy::FirstOnly if !self.info.comments.is_empty() => {
                warn!(len = text.len(), "discarding comment after the first");
            }
            _ => self.info.comments.push(text),
        }
    }

    fn decode_frame(&mut self, mut descriptor: FrameDescriptor) -> Result<DecodedFrame> {
        let screen = self.info.screen;
        if !descriptor.fits(screen.width, screen.height) {
            let err = GifError::FrameOutOfBounds {
                left: descriptor.left,
                top: descriptor.top,
                width: descriptor.width,
                height: descriptor.height,
                screen_width: screen.width,
                screen_height: screen.height,
            };
            match self.config.out_of_bounds {
                BoundsPolicy::Reject => return Err(err),
                BoundsPolicy::Clip => warn!("{err}; clipping"),
            }
        }
        if let Some(limit) = self.config.max_canvas_pixels {
            if descriptor.pixel_count() as u64 > limit {
                return Err(GifError::LimitExceeded(format!(
                    "frame {}x{} exceeds {} pixels",
                    descriptor.width, descriptor.height, limit
                )));
            }
        }

        self.reader.set_block(BlockKind::ImageData);
        let code_size_offset = self.reader.offset();
        let min_code_size = self.reader.read_u8()?;
        if !(MIN_CODE_SIZE..=MAX_CODE_SIZE).contains(&min_code_size) {
            return Err(GifError::InvalidCodeSize {
                offset: code_size_offset,
                size: min_code_size,
            });
        }

        let (palette, palette_source) = palette::resolve(
            descriptor.local_table.take(),
            self.info.global_color_table.as_ref(),
            min_code_size,
        );

        let width = descriptor.width as usize;
        let height = descriptor.height as usize;
        let mut indices = vec![0u8; descriptor.pixel_count()];
        self.lzw.decompress(&mut self.reader, min_code_size, &mut indices)?;
        let indices = if descriptor.interlaced {
            interlace::deinterlace(&indices, width, height, true)
        } else {
            indices
        };

        let control = self.pending_control.take().unwrap_or_default();
        let rect = Rect::new(
            descriptor.left,
            descriptor.top,
            descriptor.width,
            descriptor.height,
        );
        let pixels = self.compositor.composite(&FrameUpdate {
            rect,
            disposal: control.disposal,
            transparent_index: control.transparent_index,
            pixels: &indices,
        })?;

        let index = self.info.frame_count;
        self.info.frame_count += 1;
        debug!(
            index,
            left = rect.left,
            top = rect.top,
            width = rect.width,
            height = rect.height,
            disposal = ?control.disposal,
            delay = control.delay,
            "decoded frame"
        );

        Ok(DecodedFrame {
            index,
            width: screen.width,
            height: screen.height,
            pixels,
            palette,
            palette_source,
            delay: control.delay,
            transparent_index: control.transparent_index,
            disposal: control.disposal,
            user_input: control.user_input,
            rect,
            interlaced: descriptor.interlaced,
        })
    }
}

impl<R: Read> Iterator for GifDecoder<R> {
    type Item = Result<DecodedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl<R: Read> std::iter::FusedIterator for GifDecoder<R> {}
