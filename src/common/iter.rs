use super::metadata::Version;

pub const VERT_TIMING_COL: i16 = 6;

// Iterator for placing data in encoding region of QR
//------------------------------------------------------------------------------

// Walks column pairs right to left starting bottom right. The vertical timing
// column is skipped and the direction flips at every pair. Yields every
// coordinate of the symbol except column 6; callers filter by module type.
pub struct EncRegionIter {
    r: i16,
    c: i16,
    width: i16,
    upward: bool,
    left: bool,
}

impl EncRegionIter {
    pub const fn new(version: Version) -> Self {
        let w = version.width() as i16;
        Self { r: w - 1, c: w - 1, width: w, upward: true, left: false }
    }
}

impl Iterator for EncRegionIter {
    type Item = (i16, i16);
    fn next(&mut self) -> Option<Self::Item> {
        if self.c < 0 {
            return None;
        }
        let res = if self.left { (self.r, self.c - 1) } else { (self.r, self.c) };

        if !self.left {
            self.left = true;
            return Some(res);
        }

        self.left = false;
        let next_r = if self.upward { self.r - 1 } else { self.r + 1 };
        if (0..self.width).contains(&next_r) {
            self.r = next_r;
        } else {
            self.upward = !self.upward;
            self.c -= 2;
            if self.c == VERT_TIMING_COL {
                self.c -= 1;
            }
        }
        Some(res)
    }
}
