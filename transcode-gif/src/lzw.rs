//! Variable-width LZW decompression as used by GIF image data.
//!
//! Codes start at `min_code_size + 1` bits and grow by one bit each time the
//! dictionary fills the current width, up to 12 bits. Once 4096 entries exist
//! the dictionary is frozen until the next clear code.

use std::io::Read;

use tracing::{debug, trace};

use crate::bitreader::BitReader;
use crate::error::Result;
use crate::reader::{ByteReader, SubBlockReader};

/// Smallest LZW minimum code size accepted in image data.
pub const MIN_CODE_SIZE: u8 = 2;
/// Largest LZW minimum code size accepted in image data.
pub const MAX_CODE_SIZE: u8 = 8;

const MAX_CODE_WIDTH: u8 = 12;
const MAX_CODES: usize = 1 << MAX_CODE_WIDTH;
const NO_PREFIX: u16 = u16::MAX;

/// How a code stream finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The output buffer was filled.
    Filled,
    /// End-of-information arrived after `written` indices; the rest is zero.
    EarlyEnd {
        /// Indices produced before the end code.
        written: usize,
    },
}

/// LZW dictionary, reused across the frames of one stream.
pub(crate) struct LzwDecoder {
    prefix: Box<[u16; MAX_CODES]>,
    suffix: Box<[u8; MAX_CODES]>,
    first: Box<[u8; MAX_CODES]>,
    stack: Vec<u8>,
}

impl LzwDecoder {
    pub fn new() -> Self {
        Self {
            prefix: Box::new([NO_PREFIX; MAX_CODES]),
            suffix: Box::new([0; MAX_CODES]),
            first: Box::new([0; MAX_CODES]),
            stack: Vec::with_capacity(MAX_CODES),
        }
    }

    /// Decode one frame's image data into `out`.
    ///
    /// The reader must be positioned on the first data sub-block (just past
    /// the minimum code size byte). On success it is left on the byte after
    /// the block terminator.
    pub fn decompress<R: Read>(
        &mut self,
        reader: &mut ByteReader<R>,
        min_code_size: u8,
        out: &mut [u8],
    ) -> Result<Termination> {
        let mut bits = BitReader::new(SubBlockReader::new(reader));
        let termination = self.decode(&mut bits, min_code_size, out)?;
        let trailing = bits.into_inner().drain()?;
        if trailing > 0 {
            trace!(trailing, "skipped image data past end of frame");
        }
        if let Termination::EarlyEnd { written } = termination {
            debug!(written, expected = out.len(), "end code before frame was complete");
        }
        Ok(termination)
    }

    fn reset(&mut self, clear: u16) {
        for code in 0..clear {
            self.prefix[code as usize] = NO_PREFIX;
            self.suffix[code as usize] = code as u8;
            self.first[code as usize] = code as u8;
        }
    }

    fn decode<R: Read>(
        &mut self,
        bits: &mut BitReader<'_, R>,
        min_code_size: u8,
        out: &mut [u8],
    ) -> Result<Termination> {
        debug_assert!((MIN_CODE_SIZE..=MAX_CODE_SIZE).contains(&min_code_size));
        let clear = 1u16 << min_code_size;
        let end = clear + 1;

        self.reset(clear);
        let mut width = min_code_size + 1;
        let mut next = end + 1;
        let mut prev: Option<u16> = None;
        let mut written = 0;

        while written < out.len() {
            let code = match bits.read_bits(width)? {
                Some(code) => code,
                None => {
                    return Err(bits.desync(format!(
                        "code stream ended after {} of {} indices without an end code",
                        written,
                        out.len()
                    )))
                }
            };

            if code == clear {
                trace!(written, "clear code");
                width = min_code_size + 1;
                next = end + 1;
                prev = None;
                continue;
            }
            if code == end {
                return Ok(Termination::EarlyEnd { written });
            }

            let Some(prev_code) = prev else {
                if code >= clear {
                    return Err(bits.desync(format!(
                        "first code {code} after clear is not a literal"
                    )));
                }
                out[written] = code as u8;
                written += 1;
                prev = Some(code);
                continue;
            };

            let lead = if code < next {
                self.first[code as usize]
            } else if code == next {
                self.first[prev_code as usize]
            } else {
                return Err(bits.desync(format!("code {code} beyond dictionary size {next}")));
            };

            if (next as usize) < MAX_CODES {
                let slot = next as usize;
                self.prefix[slot] = prev_code;
                self.suffix[slot] = lead;
                self.first[slot] = self.first[prev_code as usize];
                next += 1;
                if next == 1 << width && width < MAX_CODE_WIDTH {
                    width += 1;
                }
            }

            written += self.emit(code, &mut out[written..]);
            prev = Some(code);
        }

        Ok(Termination::Filled)
    }

    /// Write the string for `code` into `out`, truncated to fit.
    fn emit(&mut self, code: u16, out: &mut [u8]) -> usize {
        self.stack.clear();
        let mut current = code;
        loop {
            self.stack.push(self.suffix[current as usize]);
            let parent = self.prefix[current as usize];
            if parent == NO_PREFIX {
                break;
            }
            current = parent;
        }

        let n = self.stack.len().min(out.len());
        for (dst, &src) in out.iter_mut().zip(self.stack.iter().rev()) {
            *dst = src;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GifError;

    fn decode(stream: &[u8], min_code_size: u8, len: usize) -> Result<(Vec<u8>, Termination)> {
        let mut framed = Vec::new();
        for chunk in stream.chunks(255) {
            framed.push(chunk.len() as u8);
            framed.extend_from_slice(chunk);
        }
        framed.push(0);
        framed.push(0x3B);

        let mut reader = ByteReader::new(framed.as_slice(), None);
        let mut out = vec![0u8; len];
        let termination = LzwDecoder::new().decompress(&mut reader, min_code_size, &mut out)?;
        assert_eq!(reader.read_u8().unwrap(), 0x3B, "cursor must land on the next block");
        Ok((out, termination))
    }

    #[test]
    fn test_reference_image() {
        // 10x10 sample from the GIF89a walkthrough
        let stream = [
            0x8C, 0x2D, 0x99, 0x87, 0x2A, 0x1C, 0xDC, 0x33, 0xA0, 0x02, 0x75, 0xEC, 0x95, 0xFA,
            0xA8, 0xDE, 0x60, 0x8C, 0x04, 0x91, 0x4C, 0x01,
        ];
        let (pixels, termination) = decode(&stream, 2, 100).unwrap();
        assert_eq!(termination, Termination::Filled);
        assert_eq!(&pixels[0..10], &[1, 1, 1, 1, 1, 2, 2, 2, 2, 2]);
        assert_eq!(&pixels[30..40], &[1, 1, 1, 0, 0, 0, 0, 2, 2, 2]);
        assert_eq!(&pixels[50..60], &[2, 2, 2, 0, 0, 0, 0, 1, 1, 1]);
        assert_eq!(&pixels[90..100], &[2, 2, 2, 2, 2, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_code_not_yet_in_table() {
        let (pixels, _) = decode(&[0x84, 0x5F], 2, 6).unwrap();
        assert_eq!(pixels, vec![0; 6]);
    }

    #[test]
    fn test_clear_mid_stream() {
        let (pixels, termination) = decode(&[140, 184, 2], 2, 3).unwrap();
        assert_eq!(pixels, vec![1, 2, 3]);
        assert_eq!(termination, Termination::Filled);
    }

    #[test]
    fn test_early_end_zero_fills() {
        let (pixels, termination) = decode(&[76, 1], 2, 4).unwrap();
        assert_eq!(pixels, vec![1, 0, 0, 0]);
        assert_eq!(termination, Termination::EarlyEnd { written: 1 });
    }

    #[test]
    fn test_code_beyond_dictionary() {
        let err = decode(&[204, 1], 2, 4).unwrap_err();
        assert!(matches!(err, GifError::DecodeDesync { .. }));
    }

    #[test]
    fn test_first_code_must_be_literal() {
        let err = decode(&[52], 2, 4).unwrap_err();
        assert!(matches!(err, GifError::DecodeDesync { .. }));
    }

    #[test]
    fn test_exhausted_input() {
        let err = decode(&[140, 0], 2, 10).unwrap_err();
        assert!(err.to_string().contains("without an end code"));
    }

    /// LZW encoder that never emits a clear code once the table is full.
    fn encode_without_reset(pixels: &[u8], min_code_size: u8) -> (Vec<u8>, usize) {
        let clear = 1u16 << min_code_size;
        let mut out = Vec::new();
        let (mut acc, mut bits) = (0u32, 0u8);
        let mut write = |code: u16, size: u8, out: &mut Vec<u8>| {
            acc |= u32::from(code) << bits;
            bits += size;
            while bits >= 8 {
                out.push(acc as u8);
                acc >>= 8;
                bits -= 8;
            }
        };

        let mut table = std::collections::HashMap::new();
        let mut size = min_code_size + 1;
        let mut next = clear + 2;
        write(clear, size, &mut out);
        let mut current = u16::from(pixels[0]);
        for &pixel in &pixels[1..] {
            if let Some(&code) = table.get(&(current, pixel)) {
                current = code;
                continue;
            }
            write(current, size, &mut out);
            if (next as usize) < MAX_CODES {
                table.insert((current, pixel), next);
                next += 1;
                if next > 1 << size && size < MAX_CODE_WIDTH {
                    size += 1;
                }
            }
            current = u16::from(pixel);
        }
        write(current, size, &mut out);
        write(clear + 1, size, &mut out);
        if bits > 0 {
            out.push(acc as u8);
        }
        (out, next as usize)
    }

    #[test]
    fn test_full_table_is_frozen_until_clear() {
        let mut state = 7u32;
        let pixels: Vec<u8> = (0..20_000)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                (state >> 16) as u8
            })
            .collect();
        let (stream, entries) = encode_without_reset(&pixels, 8);
        assert_eq!(entries, MAX_CODES);

        let (decoded, termination) = decode(&stream, 8, pixels.len()).unwrap();
        assert_eq!(termination, Termination::Filled);
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn test_empty_frame_drains_data() {
        let (pixels, termination) = decode(&[0x84, 0x5F], 2, 0).unwrap();
        assert!(pixels.is_empty());
        assert_eq!(termination, Termination::Filled);
    }
}
