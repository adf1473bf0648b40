//! LSB-first bit reader over a sub-block chain.

use std::io::Read;

use crate::error::{GifError, Result};
use crate::reader::SubBlockReader;

/// Reads variable-width codes, least significant bit first, across
/// sub-block boundaries.
pub(crate) struct BitReader<'a, R> {
    blocks: SubBlockReader<'a, R>,
    acc: u32,
    bits: u8,
}

impl<'a, R: Read> BitReader<'a, R> {
    pub fn new(blocks: SubBlockReader<'a, R>) -> Self {
        Self {
            blocks,
            acc: 0,
            bits: 0,
        }
    }

    /// Read an `n`-bit code (1..=16). Returns None if the chain ends first.
    pub fn read_bits(&mut self, n: u8) -> Result<Option<u16>> {
        debug_assert!((1..=16).contains(&n));
        while self.bits < n {
            match self.blocks.next_byte()? {
                Some(byte) => {
                    self.acc |= u32::from(byte) << self.bits;
                    self.bits += 8;
                }
                None => return Ok(None),
            }
        }
        let value = (self.acc & ((1u32 << n) - 1)) as u16;
        self.acc >>= n;
        self.bits -= n;
        Ok(Some(value))
    }

    pub fn desync(&self, reason: impl Into<String>) -> GifError {
        self.blocks.desync(reason)
    }

    /// Give back the sub-block reader, dropping any buffered bits.
    pub fn into_inner(self) -> SubBlockReader<'a, R> {
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ByteReader;

    #[test]
    fn test_lsb_first_across_sub_blocks() {
        // 0b1010_1100, 0b0000_0011 split over two sub-blocks
        let data: &[u8] = &[1, 0xAC, 1, 0x03, 0];
        let mut reader = ByteReader::new(data, None);
        let mut bits = BitReader::new(SubBlockReader::new(&mut reader));
        assert_eq!(bits.read_bits(3).unwrap(), Some(0b100));
        assert_eq!(bits.read_bits(3).unwrap(), Some(0b101));
        assert_eq!(bits.read_bits(4).unwrap(), Some(0b1110));
        assert_eq!(bits.read_bits(6).unwrap(), Some(0));
        assert_eq!(bits.read_bits(1).unwrap(), None);
    }

    #[test]
    fn test_twelve_bit_codes() {
        let data: &[u8] = &[3, 0xFF, 0x0F, 0x00, 0];
        let mut reader = ByteReader::new(data, None);
        let mut bits = BitReader::new(SubBlockReader::new(&mut reader));
        assert_eq!(bits.read_bits(12).unwrap(), Some(0xFFF));
        assert_eq!(bits.read_bits(12).unwrap(), Some(0));
        assert_eq!(bits.read_bits(12).unwrap(), None);
    }
}
