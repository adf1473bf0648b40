//! Frame compositing onto a persistent canvas.
//!
//! Each frame first disposes the previous frame's region according to the
//! previous frame's disposal method, optionally saves its own region for a
//! later restore, writes its non-transparent pixels, and is emitted as a
//! copy of the whole canvas.

use crate::blocks::DisposalMethod;
use crate::error::{GifError, Result};

/// A frame rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Left offset.
    pub left: u16,
    /// Top offset.
    pub top: u16,
    /// Width.
    pub width: u16,
    /// Height.
    pub height: u16,
}

impl Rect {
    /// Create a rectangle.
    pub fn new(left: u16, top: u16, width: u16, height: u16) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    fn clip(&self, width: usize, height: usize) -> Area {
        let left = self.left as usize;
        let top = self.top as usize;
        Area {
            x0: left.min(width),
            y0: top.min(height),
            x1: (left + self.width as usize).min(width),
            y1: (top + self.height as usize).min(height),
        }
    }
}

/// A rectangle clipped to the canvas, as half-open pixel ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Area {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl Area {
    fn width(&self) -> usize {
        self.x1 - self.x0
    }
}

/// Full-screen raster of palette indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Create a canvas filled with `fill`.
    pub fn new(width: u16, height: u16, fill: u8) -> Self {
        let width = width as usize;
        let height = height as usize;
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    /// Canvas width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Canvas height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major palette indices.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Index at (x, y).
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    fn row_mut(&mut self, y: usize, x0: usize, x1: usize) -> &mut [u8] {
        let start = y * self.width;
        &mut self.pixels[start + x0..start + x1]
    }

    fn fill(&mut self, area: Area, value: u8) {
        for y in area.y0..area.y1 {
            self.row_mut(y, area.x0, area.x1).fill(value);
        }
    }

    fn copy_out(&self, area: Area) -> Vec<u8> {
        let mut out = Vec::with_capacity(area.width() * (area.y1 - area.y0));
        for y in area.y0..area.y1 {
            let start = y * self.width;
            out.extend_from_slice(&self.pixels[start + area.x0..start + area.x1]);
        }
        out
    }

    fn copy_in(&mut self, area: Area, data: &[u8]) {
        let w = area.width();
        if w == 0 {
            return;
        }
        for (y, row) in (area.y0..area.y1).zip(data.chunks_exact(w)) {
            self.row_mut(y, area.x0, area.x1).copy_from_slice(row);
        }
    }
}

/// Copy `src` over `dst`, leaving pixels equal to `transparent` untouched.
///
/// Non-transparent pixels are copied in maximal contiguous runs.
pub fn blit_row(dst: &mut [u8], src: &[u8], transparent: Option<u8>) {
    debug_assert_eq!(dst.len(), src.len());
    let Some(t) = transparent else {
        dst.copy_from_slice(src);
        return;
    };

    let mut i = 0;
    while i < src.len() {
        while i < src.len() && src[i] == t {
            i += 1;
        }
        let start = i;
        while i < src.len() && src[i] != t {
            i += 1;
        }
        dst[start..i].copy_from_slice(&src[start..i]);
    }
}

/// Canvas region saved before a restore-to-previous frame was drawn.
#[derive(Debug, Clone)]
struct PreviousSnapshot {
    area: Area,
    pixels: Vec<u8>,
}

/// Disposal owed by the most recently composited frame.
#[derive(Debug, Clone, Copy)]
struct PendingDisposal {
    area: Area,
    method: DisposalMethod,
    transparent_index: Option<u8>,
}

/// One frame's contribution to the canvas.
#[derive(Debug, Clone, Copy)]
pub struct FrameUpdate<'a> {
    /// Frame rectangle.
    pub rect: Rect,
    /// Disposal to apply before the next frame.
    pub disposal: DisposalMethod,
    /// Pixels with this index are not drawn.
    pub transparent_index: Option<u8>,
    /// `rect.width * rect.height` indices, top-to-bottom.
    pub pixels: &'a [u8],
}

/// Compositing state carried from frame to frame within one stream.
#[derive(Debug, Clone)]
pub struct CompositorState {
    canvas: Canvas,
    background: Option<u8>,
    pending: Option<PendingDisposal>,
    snapshot: Option<PreviousSnapshot>,
    frames: usize,
}

impl CompositorState {
    /// Create the state for a `width`x`height` screen.
    ///
    /// `background` is the background color index when the stream has a
    /// global color table; the canvas starts filled with it, otherwise with 0.
    pub fn new(width: u16, height: u16, background: Option<u8>) -> Self {
        Self {
            canvas: Canvas::new(width, height, background.unwrap_or(0)),
            background,
            pending: None,
            snapshot: None,
            frames: 0,
        }
    }

    /// Current canvas.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Number of frames composited so far.
    pub fn frames_composited(&self) -> usize {
        self.frames
    }

    /// Composite a frame and return a copy of the whole canvas.
    ///
    /// The parts of `update.rect` outside the canvas are ignored.
    pub fn composite(&mut self, update: &FrameUpdate<'_>) -> Result<Vec<u8>> {
        debug_assert_eq!(
            update.pixels.len(),
            update.rect.width as usize * update.rect.height as usize
        );

        if let Some(pending) = self.pending.take() {
            self.dispose(pending)?;
        }

        let area = update.rect.clip(self.canvas.width, self.canvas.height);

        if update.disposal == DisposalMethod::RestoreToPrevious {
            self.snapshot = Some(PreviousSnapshot {
                area,
                pixels: self.canvas.copy_out(area),
            });
        }

        self.write_delta(update, area);

        self.pending = Some(PendingDisposal {
            area,
            method: update.disposal,
            transparent_index: update.transparent_index,
        });
        self.frames += 1;

        Ok(self.canvas.pixels.clone())
    }

    fn dispose(&mut self, pending: PendingDisposal) -> Result<()> {
        match pending.method {
            DisposalMethod::Unspecified | DisposalMethod::Leave => {}
            DisposalMethod::RestoreToBackground => {
                if let Some(fill) = pending.transparent_index.or(self.background) {
                    self.canvas.fill(pending.area, fill);
                }
            }
            DisposalMethod::RestoreToPrevious => {
                let snapshot = self
                    .snapshot
                    .take()
                    .filter(|s| s.area == pending.area)
                    .ok_or(GifError::InconsistentDisposal { frame: self.frames })?;
                self.canvas.copy_in(snapshot.area, &snapshot.pixels);
            }
        }
        Ok(())
    }

    fn write_delta(&mut self, update: &FrameUpdate<'_>, area: Area) {
        // Offsets are unsigned, so clipping only ever trims the right and bottom edges.
        let frame_width = update.rect.width as usize;
        let top = update.rect.top as usize;
        let cols = area.width();

        for y in area.y0..area.y1 {
            let row_start = (y - top) * frame_width;
            let src = &update.pixels[row_start..row_start + cols];
            let dst = self.canvas.row_mut(y, area.x0, area.x1);
            blit_row(dst, src, update.transparent_index);
        }
    }
}
