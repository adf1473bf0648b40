//! Shared helpers for building GIF streams in tests and benchmarks.

#![allow(dead_code)]

use std::collections::HashMap;

/// Disposal method field values as written in a graphic control extension.
pub const DISPOSE_NONE: u8 = 0;
pub const DISPOSE_LEAVE: u8 = 1;
pub const DISPOSE_BACKGROUND: u8 = 2;
pub const DISPOSE_PREVIOUS: u8 = 3;

/// LZW-compress `pixels` with the given minimum code size.
///
/// Emits a clear code first, a clear code whenever the table fills, and an
/// end-of-information code last.
pub fn lzw_encode(pixels: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let end = clear + 1;

    let mut writer = CodeWriter::default();
    let mut size = min_code_size + 1;
    let mut next = end + 1;
    let mut table: HashMap<(u16, u8), u16> = HashMap::new();

    writer.write(clear, size);
    let mut iter = pixels.iter();
    let Some(&first) = iter.next() else {
        writer.write(end, size);
        return writer.finish();
    };

    let mut current = u16::from(first);
    for &pixel in iter {
        if let Some(&code) = table.get(&(current, pixel)) {
            current = code;
            continue;
        }
        writer.write(current, size);
        if next < 4096 {
            table.insert((current, pixel), next);
            next += 1;
            if next > (1 << size) && size < 12 {
                size += 1;
            }
        } else {
            writer.write(clear, size);
            table.clear();
            next = end + 1;
            size = min_code_size + 1;
        }
        current = u16::from(pixel);
    }
    writer.write(current, size);
    writer.write(end, size);
    writer.finish()
}

#[derive(Default)]
struct CodeWriter {
    out: Vec<u8>,
    acc: u32,
    bits: u8,
}

impl CodeWriter {
    fn write(&mut self, code: u16, size: u8) {
        self.acc |= u32::from(code) << self.bits;
        self.bits += size;
        while self.bits >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.out.push(self.acc as u8);
        }
        self.out
    }
}

/// Split `data` into length-prefixed sub-blocks followed by a terminator.
pub fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 255 + 2);
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

/// Reorder top-to-bottom rows into interlaced transmission order.
pub fn interlace_rows(pixels: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len());
    for (start, step) in [(0, 8), (4, 8), (2, 4), (1, 2)] {
        for y in (start..height).step_by(step) {
            out.extend_from_slice(&pixels[y * width..(y + 1) * width]);
        }
    }
    out
}

/// Smallest power-of-two exponent (at least 1) covering `len` entries.
fn table_bits(len: usize) -> u8 {
    let mut bits = 1;
    while (1usize << bits) < len {
        bits += 1;
    }
    bits
}

/// One image block to be written by [`GifBuilder`].
#[derive(Debug, Clone)]
pub struct Frame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<u8>,
    pub local_table: Option<Vec<[u8; 3]>>,
    pub interlaced: bool,
    pub min_code_size: Option<u8>,
}

impl Frame {
    pub fn new(left: u16, top: u16, width: u16, height: u16, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            left,
            top,
            width,
            height,
            pixels,
            local_table: None,
            interlaced: false,
            min_code_size: None,
        }
    }

    /// A frame covering `width` x `height` at the origin filled with `index`.
    pub fn solid(width: u16, height: u16, index: u8) -> Self {
        Self::new(0, 0, width, height, vec![index; width as usize * height as usize])
    }

    pub fn local_table(mut self, colors: &[[u8; 3]]) -> Self {
        self.local_table = Some(colors.to_vec());
        self
    }

    pub fn interlaced(mut self) -> Self {
        self.interlaced = true;
        self
    }

    pub fn min_code_size(mut self, size: u8) -> Self {
        self.min_code_size = Some(size);
        self
    }

    fn code_size(&self) -> u8 {
        self.min_code_size.unwrap_or_else(|| {
            let max = self.pixels.iter().copied().max().unwrap_or(0);
            table_bits(max as usize + 1).clamp(2, 8)
        })
    }
}

/// Writes a GIF stream block by block.
pub struct GifBuilder {
    data: Vec<u8>,
}

impl GifBuilder {
    /// GIF89a header with no global color table.
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_header(b"GIF89a", width, height, None, 0)
    }

    /// GIF89a header with a global color table and background index.
    pub fn with_global_table(width: u16, height: u16, colors: &[[u8; 3]], background: u8) -> Self {
        Self::with_header(b"GIF89a", width, height, Some(colors), background)
    }

    /// Arbitrary signature and version bytes.
    pub fn with_header(
        magic: &[u8; 6],
        width: u16,
        height: u16,
        colors: Option<&[[u8; 3]]>,
        background: u8,
    ) -> Self {
        let mut data = magic.to_vec();
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        match colors {
            Some(colors) => {
                let bits = table_bits(colors.len());
                data.push(0x80 | 0x70 | (bits - 1));
                data.push(background);
                data.push(0);
                write_table(&mut data, colors, bits);
            }
            None => {
                data.push(0x70);
                data.push(background);
                data.push(0);
            }
        }
        Self { data }
    }

    /// NETSCAPE2.0 looping extension with the raw stored count.
    pub fn loop_count(mut self, count: u16) -> Self {
        self.data.extend_from_slice(&[0x21, 0xFF, 11]);
        self.data.extend_from_slice(b"NETSCAPE2.0");
        let [lo, hi] = count.to_le_bytes();
        self.data.extend_from_slice(&[3, 1, lo, hi, 0]);
        self
    }

    pub fn application(mut self, id: &[u8; 11], payload: &[u8]) -> Self {
        self.data.extend_from_slice(&[0x21, 0xFF, 11]);
        self.data.extend_from_slice(id);
        self.data.extend(sub_blocks(payload));
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        self.data.extend_from_slice(&[0x21, 0xFE]);
        self.data.extend(sub_blocks(text.as_bytes()));
        self
    }

    /// Graphic control extension.
    pub fn control(mut self, disposal: u8, transparent: Option<u8>, delay: u16) -> Self {
        let mut flags = (disposal & 0x07) << 2;
        if transparent.is_some() {
            flags |= 0x01;
        }
        let [lo, hi] = delay.to_le_bytes();
        self.data
            .extend_from_slice(&[0x21, 0xF9, 4, flags, lo, hi, transparent.unwrap_or(0), 0]);
        self
    }

    /// Plain text extension with an empty text body.
    pub fn plain_text(mut self) -> Self {
        self.data.extend_from_slice(&[0x21, 0x01, 12]);
        self.data.extend_from_slice(&[0; 12]);
        self.data.push(0);
        self
    }

    pub fn frame(mut self, frame: &Frame) -> Self {
        self.data.push(0x2C);
        for v in [frame.left, frame.top, frame.width, frame.height] {
            self.data.extend_from_slice(&v.to_le_bytes());
        }
        let mut flags = 0;
        if frame.interlaced {
            flags |= 0x40;
        }
        let local_bits = frame.local_table.as_ref().map(|t| table_bits(t.len()));
        if let Some(bits) = local_bits {
            flags |= 0x80 | (bits - 1);
        }
        self.data.push(flags);
        if let (Some(colors), Some(bits)) = (&frame.local_table, local_bits) {
            write_table(&mut self.data, colors, bits);
        }

        let code_size = frame.code_size();
        let pixels = if frame.interlaced {
            interlace_rows(&frame.pixels, frame.width as usize, frame.height as usize)
        } else {
            frame.pixels.clone()
        };
        self.data.push(code_size);
        self.data.extend(sub_blocks(&lzw_encode(&pixels, code_size)));
        self
    }

    /// Image block whose data sub-blocks are written verbatim.
    pub fn raw_image(mut self, width: u16, height: u16, code_size: u8, data: &[u8]) -> Self {
        self.data.push(0x2C);
        for v in [0, 0, width, height] {
            self.data.extend_from_slice(&v.to_le_bytes());
        }
        self.data.push(0);
        self.data.push(code_size);
        self.data.extend(sub_blocks(data));
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Stream without its trailer.
    pub fn unterminated(self) -> Vec<u8> {
        self.data
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.data.push(0x3B);
        self.data
    }
}

fn write_table(data: &mut Vec<u8>, colors: &[[u8; 3]], bits: u8) {
    for i in 0..(1usize << bits) {
        data.extend_from_slice(&colors.get(i).copied().unwrap_or([0, 0, 0]));
    }
}

/// Four-entry palette: black, white, red, green.
pub const PALETTE4: [[u8; 3]; 4] = [[0, 0, 0], [255, 255, 255], [255, 0, 0], [0, 255, 0]];
