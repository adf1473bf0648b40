//! Row ordering for interlaced frames.
//!
//! Interlaced GIF data transmits rows in four passes: every 8th row from 0,
//! every 8th row from 4, every 4th row from 2, then every 2nd row from 1.

/// (first row, step) of each interlace pass.
const PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Iterator over destination row indices, in the order rows arrive.
#[derive(Debug, Clone)]
pub struct ScanlineOrder {
    height: usize,
    interlaced: bool,
    pass: usize,
    next: usize,
}

impl ScanlineOrder {
    /// Row order for a frame of `height` rows.
    pub fn new(height: usize, interlaced: bool) -> Self {
        let next = if interlaced { PASSES[0].0 } else { 0 };
        Self {
            height,
            interlaced,
            pass: 0,
            next,
        }
    }
}

impl Iterator for ScanlineOrder {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if !self.interlaced {
            if self.next >= self.height {
                return None;
            }
            self.next += 1;
            return Some(self.next - 1);
        }

        while self.pass < PASSES.len() {
            if self.next < self.height {
                let row = self.next;
                self.next += PASSES[self.pass].1;
                return Some(row);
            }
            self.pass += 1;
            if let Some(&(start, _)) = PASSES.get(self.pass) {
                self.next = start;
            }
        }
        None
    }
}

/// Reorder rows delivered in transmission order into top-to-bottom order.
pub fn deinterlace(data: &[u8], width: usize, height: usize, interlaced: bool) -> Vec<u8> {
    if !interlaced || width == 0 {
        return data.to_vec();
    }

    let mut output = vec![0u8; width * height];
    for (src_row, dst_row) in ScanlineOrder::new(height, true).enumerate() {
        let src = &data[src_row * width..(src_row + 1) * width];
        output[dst_row * width..(dst_row + 1) * width].copy_from_slice(src);
    }
    output
}
