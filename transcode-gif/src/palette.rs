//! Color tables and palette resolution.

use std::io::Read;
use std::sync::Arc;

use crate::error::Result;
use crate::reader::ByteReader;

/// An ordered table of RGB triples with 2^n entries (n in 1..=8).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorTable {
    entries: Vec<[u8; 3]>,
}

impl ColorTable {
    /// Build a table from raw RGB bytes. A trailing partial triple is ignored.
    pub fn from_rgb(data: &[u8]) -> Self {
        Self {
            entries: data.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
        }
    }

    /// Synthesize the default grayscale table with `2^bits` entries.
    ///
    /// Entry 0 is white; entry `i >= 1` is gray level `i * 255 / (n - 1)`.
    pub fn grayscale(bits: u8) -> Self {
        let len = 1usize << bits.clamp(1, 8);
        let max = len - 1;
        let entries = (0..len)
            .map(|i| {
                if i == 0 {
                    [255, 255, 255]
                } else {
                    let v = (i * 255 / max) as u8;
                    [v, v, v]
                }
            })
            .collect();
        Self { entries }
    }

    /// Read `2^bits` triples from the stream.
    pub(crate) fn read<R: Read>(reader: &mut ByteReader<R>, bits: u8) -> Result<Self> {
        let mut data = vec![0u8; 3 * (1usize << bits)];
        reader.read_bytes(&mut data)?;
        Ok(Self::from_rgb(&data))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry.
    pub fn get(&self, index: u8) -> Option<[u8; 3]> {
        self.entries.get(index as usize).copied()
    }

    /// All entries in order.
    pub fn entries(&self) -> &[[u8; 3]] {
        &self.entries
    }
}

/// Where a frame's effective color table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaletteSource {
    /// The frame's own local table.
    Local,
    /// The stream's global table.
    Global,
    /// The synthesized grayscale table.
    Default,
}

/// Pick the color table in effect for a frame.
///
/// A local table wins, then the global table (shared, not copied), then a
/// grayscale table of `2^default_bits` entries.
pub fn resolve(
    local: Option<ColorTable>,
    global: Option<&Arc<ColorTable>>,
    default_bits: u8,
) -> (Arc<ColorTable>, PaletteSource) {
    match (local, global) {
        (Some(table), _) => (Arc::new(table), PaletteSource::Local),
        (None, Some(table)) => (Arc::clone(table), PaletteSource::Global),
        (None, None) => (Arc::new(ColorTable::grayscale(default_bits)), PaletteSource::Default),
    }
}
