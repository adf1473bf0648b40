//! Byte-level access to a GIF stream.
//!
//! [`ByteReader`] wraps the caller's source, counts consumed bytes so errors
//! can report offsets, and enforces the sub-block byte budget. [`SubBlockReader`]
//! presents a chain of length-prefixed data sub-blocks as one byte sequence.

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::blocks::BlockKind;
use crate::error::{GifError, Result};

/// Maximum payload of one data sub-block.
pub const MAX_SUB_BLOCK_LEN: usize = 255;

/// Counting reader over the underlying byte source.
pub(crate) struct ByteReader<R> {
    inner: R,
    offset: u64,
    block: BlockKind,
    data_budget: Option<u64>,
}

impl<R: Read> Read for ByteReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

impl<R: Read> ByteReader<R> {
    pub fn new(inner: R, data_budget: Option<u64>) -> Self {
        Self {
            inner,
            offset: 0,
            block: BlockKind::Header,
            data_budget,
        }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Block kind attached to errors raised from here on.
    pub fn set_block(&mut self, block: BlockKind) {
        self.block = block;
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        ReadBytesExt::read_u8(self).map_err(|e| self.map_io(e))
    }

    /// Read a little-endian 16-bit field.
    pub fn read_u16(&mut self) -> Result<u16> {
        ReadBytesExt::read_u16::<LittleEndian>(self).map_err(|e| self.map_io(e))
    }

    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_exact(buf).map_err(|e| self.map_io(e))
    }

    /// Read one data sub-block into `buf`, returning its length.
    ///
    /// A return of 0 means the block terminator was consumed.
    pub fn read_sub_block(&mut self, buf: &mut [u8; MAX_SUB_BLOCK_LEN]) -> Result<usize> {
        let len = self.read_u8()? as usize;
        if len == 0 {
            return Ok(0);
        }
        self.charge(len)?;
        self.read_bytes(&mut buf[..len])?;
        Ok(len)
    }

    /// Skip sub-blocks up to and including the terminator. Returns the payload size skipped.
    pub fn skip_sub_blocks(&mut self) -> Result<usize> {
        let mut buf = [0u8; MAX_SUB_BLOCK_LEN];
        let mut skipped = 0;
        loop {
            let len = self.read_sub_block(&mut buf)?;
            if len == 0 {
                return Ok(skipped);
            }
            skipped += len;
        }
    }

    /// Collect the payload of all remaining sub-blocks.
    pub fn collect_sub_blocks(&mut self) -> Result<Vec<u8>> {
        let mut buf = [0u8; MAX_SUB_BLOCK_LEN];
        let mut collected = Vec::new();
        loop {
            let len = self.read_sub_block(&mut buf)?;
            if len == 0 {
                return Ok(collected);
            }
            collected.extend_from_slice(&buf[..len]);
        }
    }

    /// Build a malformed-block error at the current position.
    pub fn malformed(&self, reason: impl Into<String>) -> GifError {
        GifError::Malformed {
            offset: self.offset,
            block: self.block,
            reason: reason.into(),
        }
    }

    /// Build an LZW desync error at the current position.
    pub fn desync(&self, reason: impl Into<String>) -> GifError {
        GifError::DecodeDesync {
            offset: self.offset,
            block: self.block,
            reason: reason.into(),
        }
    }

    fn charge(&mut self, len: usize) -> Result<()> {
        if let Some(remaining) = self.data_budget.as_mut() {
            let len = len as u64;
            if len > *remaining {
                return Err(GifError::LimitExceeded(format!(
                    "sub-block data budget exhausted at offset {}",
                    self.offset
                )));
            }
            *remaining -= len;
        }
        Ok(())
    }

    fn map_io(&self, err: io::Error) -> GifError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            GifError::TruncatedStream {
                offset: self.offset,
                block: self.block,
            }
        } else {
            GifError::Io(err)
        }
    }
}

/// Reads the payload of a sub-block chain one byte at a time.
pub(crate) struct SubBlockReader<'a, R> {
    reader: &'a mut ByteReader<R>,
    buf: [u8; MAX_SUB_BLOCK_LEN],
    pos: usize,
    len: usize,
    finished: bool,
}

impl<'a, R: Read> SubBlockReader<'a, R> {
    /// The reader must be positioned on the size byte of the first sub-block.
    pub fn new(reader: &'a mut ByteReader<R>) -> Self {
        Self {
            reader,
            buf: [0; MAX_SUB_BLOCK_LEN],
            pos: 0,
            len: 0,
            finished: false,
        }
    }

    /// Next payload byte, or None once the terminator has been read.
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        if self.pos == self.len {
            if self.finished {
                return Ok(None);
            }
            let len = self.reader.read_sub_block(&mut self.buf)?;
            if len == 0 {
                self.finished = true;
                return Ok(None);
            }
            self.pos = 0;
            self.len = len;
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    /// Consume any remaining sub-blocks so the stream lands on the next block tag.
    pub fn drain(self) -> Result<usize> {
        if self.finished {
            return Ok(0);
        }
        self.reader.skip_sub_blocks()
    }

    pub fn desync(&self, reason: impl Into<String>) -> GifError {
        self.reader.desync(reason)
    }
}
