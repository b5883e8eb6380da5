use crate::common::bit_utils::BitStream;
use crate::common::error::{QRError, QRResult};
use crate::common::iter::{EncRegionIter, VERT_TIMING_COL};
use crate::common::mask::MaskPattern;
use crate::common::metadata::{Color, Version, FORMAT_INFO_BIT_LEN, VERSION_INFO_BIT_LEN};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ModuleType {
    Empty,
    Finder,
    Separator,
    Timing,
    Alignment,
    Format,
    Version,
    Data,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Module {
    pub kind: ModuleType,
    pub value: Option<Color>,
}

// Symbol matrix with a value grid and a parallel module type grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    values: Vec<Option<Color>>,
    types: Vec<ModuleType>,
    w: usize,
    ver: Version,
}

impl Matrix {
    pub fn new(ver: Version) -> Self {
        let w = ver.width();
        Self { values: vec![None; w * w], types: vec![ModuleType::Empty; w * w], w, ver }
    }

    pub fn version(&self) -> Version {
        self.ver
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn values(&self) -> &[Option<Color>] {
        &self.values
    }

    pub fn types(&self) -> &[ModuleType] {
        &self.types
    }

    pub fn count_dark_modules(&self) -> usize {
        self.values.iter().filter(|&&v| v == Some(Color::Dark)).count()
    }

    pub fn count_modules(&self, kind: ModuleType) -> usize {
        self.types.iter().filter(|&&t| t == kind).count()
    }

    // Rows of 0/1. Unfilled cells read as 0
    pub fn to_bits(&self) -> Vec<Vec<u8>> {
        self.values
            .chunks(self.w)
            .map(|row| row.iter().map(|v| v.map_or(0, Color::bit)).collect())
            .collect()
    }

    pub fn to_debug_str(&self) -> String {
        let w = self.w as i16;
        let mut res = String::with_capacity(self.w * (self.w + 1) + 1);
        res.push('\n');
        for i in 0..w {
            for j in 0..w {
                let Module { kind, value } = self.get(i, j);
                let c = match (kind, value) {
                    (ModuleType::Empty, _) => '.',
                    (ModuleType::Data, None) => ',',
                    (ModuleType::Finder, Some(v)) => v.select('F', 'f'),
                    (ModuleType::Separator, Some(v)) => v.select('S', 's'),
                    (ModuleType::Timing, Some(v)) => v.select('T', 't'),
                    (ModuleType::Alignment, Some(v)) => v.select('A', 'a'),
                    (ModuleType::Format, Some(v)) => v.select('M', 'm'),
                    (ModuleType::Version, Some(v)) => v.select('V', 'v'),
                    (ModuleType::Data, Some(v)) => v.select('D', 'd'),
                    (_, None) => '?',
                };
                res.push(c);
            }
            res.push('\n');
        }
        res
    }

    fn coord_to_index(&self, r: i16, c: i16) -> usize {
        let w = self.w as i16;
        debug_assert!(-w <= r && r < w, "row should be greater than or equal to w");
        debug_assert!(-w <= c && c < w, "column should be greater than or equal to w");

        let r = if r < 0 { r + w } else { r };
        let c = if c < 0 { c + w } else { c };
        (r * w + c) as _
    }

    pub fn get(&self, r: i16, c: i16) -> Module {
        let i = self.coord_to_index(r, c);
        Module { kind: self.types[i], value: self.values[i] }
    }

    pub fn set(&mut self, r: i16, c: i16, kind: ModuleType, value: Option<Color>) {
        let i = self.coord_to_index(r, c);
        self.types[i] = kind;
        self.values[i] = value;
    }

    fn set_value(&mut self, r: i16, c: i16, value: Color) {
        let i = self.coord_to_index(r, c);
        self.values[i] = Some(value);
    }
}


// Finder pattern & separators
//------------------------------------------------------------------------------

impl Matrix {
    fn finder_origins(&self) -> [(i16, i16); 3] {
        let last = self.w as i16 - 7;
        [(0, 0), (0, last), (last, 0)]
    }

    pub fn draw_finder_patterns(&mut self) {
        for (r, c) in self.finder_origins() {
            for i in 0..7 {
                for j in 0..7 {
                    let ring = matches!(i, 0 | 6) || matches!(j, 0 | 6);
                    let core = (2..=4).contains(&i) && (2..=4).contains(&j);
                    self.set(r + i, c + j, ModuleType::Finder, Some((ring || core).into()));
                }
            }
        }
    }

    pub fn draw_separators(&mut self) {
        let w = self.w as i16;
        for (r, c) in self.finder_origins() {
            for i in -1..=7 {
                for j in -1..=7 {
                    let (y, x) = (r + i, c + j);
                    if (0..w).contains(&y)
                        && (0..w).contains(&x)
                        && self.get(y, x).kind == ModuleType::Empty
                    {
                        self.set(y, x, ModuleType::Separator, Some(Color::Light));
                    }
                }
            }
        }
    }
}


// Timing pattern
//------------------------------------------------------------------------------

impl Matrix {
    pub fn draw_timing_patterns(&mut self) {
        let last = self.w as i16 - 9;
        self.draw_line(VERT_TIMING_COL, 8, VERT_TIMING_COL, last);
        self.draw_line(8, VERT_TIMING_COL, last, VERT_TIMING_COL);
    }

    fn draw_line(&mut self, r1: i16, c1: i16, r2: i16, c2: i16) {
        debug_assert!(r1 == r2 || c1 == c2, "Line is neither vertical nor horizontal");

        if r1 == r2 {
            for j in c1..=c2 {
                self.set(r1, j, ModuleType::Timing, Some((j & 1 == 0).into()));
            }
        } else {
            for i in r1..=r2 {
                self.set(i, c1, ModuleType::Timing, Some((i & 1 == 0).into()));
            }
        }
    }
}

#[cfg(test)]
mod timing_pattern_tests {
    use super::Matrix;
    use crate::common::metadata::Version;

    #[test]
    fn test_timing_pattern_1() {
        let mut m = Matrix::new(Version::new(1).unwrap());
        m.draw_timing_patterns();
        assert_eq!(
            m.to_debug_str(),
            "\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             ........tTtTt........\n\
             .....................\n\
             ......t..............\n\
             ......T..............\n\
             ......t..............\n\
             ......T..............\n\
             ......t..............\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n"
        );
    }
}

// Alignment pattern
//------------------------------------------------------------------------------

impl Matrix {
    pub fn draw_alignment_patterns(&mut self) {
        let poses = self.ver.alignment_pattern();
        for &r in poses {
            for &c in poses {
                self.draw_alignment_pattern_at(r, c)
            }
        }
    }

    fn draw_alignment_pattern_at(&mut self, r: i16, c: i16) {
        let w = self.w as i16;
        if (r == 6 && (c == 6 || c - w == -7)) || (r - w == -7 && c == 6) {
            return;
        }
        for i in -2..=2i16 {
            for j in -2..=2i16 {
                let dark = i.abs().max(j.abs()) != 1;
                self.set(r + i, c + j, ModuleType::Alignment, Some(dark.into()))
            }
        }
    }
}


// Format & version info
//------------------------------------------------------------------------------

// MSB first around the top left finder
pub(crate) static FORMAT_INFO_COORDS_MAIN: [(i16, i16); FORMAT_INFO_BIT_LEN] = [
    (8, 0),
    (8, 1),
    (8, 2),
    (8, 3),
    (8, 4),
    (8, 5),
    (8, 7),
    (8, 8),
    (7, 8),
    (5, 8),
    (4, 8),
    (3, 8),
    (2, 8),
    (1, 8),
    (0, 8),
];

// MSB first under the top right and beside the bottom left finder
pub(crate) static FORMAT_INFO_COORDS_SIDE: [(i16, i16); FORMAT_INFO_BIT_LEN] = [
    (-1, 8),
    (-2, 8),
    (-3, 8),
    (-4, 8),
    (-5, 8),
    (-6, 8),
    (-7, 8),
    (8, -8),
    (8, -7),
    (8, -6),
    (8, -5),
    (8, -4),
    (8, -3),
    (8, -2),
    (8, -1),
];

impl Matrix {
    // Coordinates of version info bit i in the top right and bottom left blocks
    pub(crate) fn version_info_coords(&self, i: usize) -> [(i16, i16); 2] {
        let a = self.w as i16 - 11 + (i % 3) as i16;
        let b = (i / 3) as i16;
        [(b, a), (a, b)]
    }

    // Reserves format and version areas with light modules, sets the dark
    // module, then types every remaining empty cell as data
    pub fn reserve_info_areas(&mut self) {
        for &(r, c) in FORMAT_INFO_COORDS_MAIN.iter().chain(FORMAT_INFO_COORDS_SIDE.iter()) {
            self.set(r, c, ModuleType::Format, Some(Color::Light));
        }
        self.set(-8, 8, ModuleType::Format, Some(Color::Dark));

        if self.ver.info().is_some() {
            for i in 0..VERSION_INFO_BIT_LEN {
                for (r, c) in self.version_info_coords(i) {
                    self.set(r, c, ModuleType::Version, Some(Color::Light));
                }
            }
        }

        for (kind, value) in self.types.iter_mut().zip(self.values.iter()) {
            if *kind == ModuleType::Empty {
                debug_assert!(value.is_none(), "Empty module holds a value");
                *kind = ModuleType::Data;
            }
        }
    }

    pub fn draw_format_info(&mut self, format_info: u32) {
        self.draw_number(format_info, FORMAT_INFO_BIT_LEN, &FORMAT_INFO_COORDS_MAIN);
        self.draw_number(format_info, FORMAT_INFO_BIT_LEN, &FORMAT_INFO_COORDS_SIDE);
    }

    // LSB first
    pub fn draw_version_info(&mut self, version_info: u32) {
        for i in 0..VERSION_INFO_BIT_LEN {
            let clr = Color::from((version_info >> i) & 1 == 1);
            for (r, c) in self.version_info_coords(i) {
                self.set_value(r, c, clr);
            }
        }
    }

    fn draw_number(&mut self, number: u32, bit_len: usize, coords: &[(i16, i16)]) {
        let mut mask = 1 << (bit_len - 1);
        for &(r, c) in coords {
            self.set_value(r, c, Color::from(number & mask != 0));
            mask >>= 1;
        }
    }

    fn read_number(&self, coords: &[(i16, i16)]) -> u32 {
        coords.iter().fold(0, |acc, &(r, c)| {
            (acc << 1) | self.get(r, c).value.map_or(0, |v| v.bit() as u32)
        })
    }

    // Both format info copies, main copy first
    pub fn read_format_info(&self) -> (u32, u32) {
        (self.read_number(&FORMAT_INFO_COORDS_MAIN), self.read_number(&FORMAT_INFO_COORDS_SIDE))
    }

    // Both version info copies, top right first. Absent below version 7
    pub fn read_version_info(&self) -> Option<(u32, u32)> {
        self.ver.info()?;
        let mut res = (0, 0);
        for i in 0..VERSION_INFO_BIT_LEN {
            let [tr, bl] = self.version_info_coords(i);
            let bit = |(r, c): (i16, i16)| self.get(r, c).value.map_or(0, |v| v.bit() as u32);
            res.0 |= bit(tr) << i;
            res.1 |= bit(bl) << i;
        }
        Some(res)
    }
}

#[cfg(test)]
mod info_area_tests {
    use super::{Matrix, ModuleType};
    use crate::common::metadata::Version;

    #[test]
    fn test_reserve_info_areas_1() {
        let mut m = Matrix::new(Version::new(1).unwrap());
        m.draw_finder_patterns();
        m.draw_separators();
        m.draw_timing_patterns();
        m.draw_alignment_patterns();
        m.reserve_info_areas();
        assert_eq!(
            m.to_debug_str(),
            "\n\
             fffffffSM,,,,Sfffffff\n\
             fFFFFFfSM,,,,SfFFFFFf\n\
             fFfffFfSM,,,,SfFfffFf\n\
             fFfffFfSM,,,,SfFfffFf\n\
             fFfffFfSM,,,,SfFfffFf\n\
             fFFFFFfSM,,,,SfFFFFFf\n\
             fffffffStTtTtSfffffff\n\
             SSSSSSSSM,,,,SSSSSSSS\n\
             MMMMMMtMM,,,,MMMMMMMM\n\
             ,,,,,,T,,,,,,,,,,,,,,\n\
             ,,,,,,t,,,,,,,,,,,,,,\n\
             ,,,,,,T,,,,,,,,,,,,,,\n\
             ,,,,,,t,,,,,,,,,,,,,,\n\
             SSSSSSSSm,,,,,,,,,,,,\n\
             fffffffSM,,,,,,,,,,,,\n\
             fFFFFFfSM,,,,,,,,,,,,\n\
             fFfffFfSM,,,,,,,,,,,,\n\
             fFfffFfSM,,,,,,,,,,,,\n\
             fFfffFfSM,,,,,,,,,,,,\n\
             fFFFFFfSM,,,,,,,,,,,,\n\
             fffffffSM,,,,,,,,,,,,\n"
        );
        assert_eq!(m.count_modules(ModuleType::Data), 208);
        assert_eq!(m.count_modules(ModuleType::Empty), 0);
    }

    #[test]
    fn test_reserve_version_areas_7() {
        let mut m = Matrix::new(Version::new(7).unwrap());
        m.reserve_info_areas();
        assert_eq!(m.count_modules(ModuleType::Version), 36);
        assert_eq!(m.count_modules(ModuleType::Format), 31);
        assert_eq!(m.read_version_info(), Some((0, 0)));
    }

    #[test]
    fn test_version_info_7() {
        let mut m = Matrix::new(Version::new(7).unwrap());
        m.reserve_info_areas();
        m.draw_version_info(0x07C94);
        let rows = m.to_debug_str();
        let rows = rows.lines().skip(1).collect::<Vec<_>>();
        let top_right = (0..6).map(|r| &rows[r][34..37]).collect::<Vec<_>>();
        assert_eq!(top_right, ["VVv", "VvV", "VvV", "Vvv", "vvv", "VVV"]);
        let bottom_left = (34..37).map(|r| &rows[r][..6]).collect::<Vec<_>>();
        assert_eq!(bottom_left, ["VVVVvV", "VvvvvV", "vVVvvV"]);
        assert_eq!(m.read_version_info(), Some((0x07C94, 0x07C94)));
    }

    #[test]
    fn test_format_info_round_trip() {
        let mut m = Matrix::new(Version::new(2).unwrap());
        m.reserve_info_areas();
        m.draw_format_info(0x0D0C);
        assert_eq!(m.read_format_info(), (0x0D0C, 0x0D0C));
        assert_eq!(m.read_version_info(), None);
        // Dark module stays dark
        assert_eq!(m.get(-8, 8).value, Some(crate::common::metadata::Color::Dark));
    }
}

// Data placement
//------------------------------------------------------------------------------

impl Matrix {
    // Places the message into data cells in zigzag order. The stream must
    // cover every data cell exactly.
    pub fn place_data(&mut self, message: &BitStream) -> QRResult<usize> {
        let expected = message.len();
        let mut bits = message.iter();
        let mut placed = 0;
        for (r, c) in EncRegionIter::new(self.ver) {
            let module = self.get(r, c);
            if module.kind != ModuleType::Data || module.value.is_some() {
                continue;
            }
            match bits.next() {
                Some(bit) => {
                    self.set_value(r, c, bit.into());
                    placed += 1;
                }
                None => {
                    let capacity = self.count_modules(ModuleType::Data);
                    log::error!("Message ran out after {placed} of {capacity} data modules");
                    return Err(QRError::StructuralInconsistency { placed, expected: capacity });
                }
            }
        }
        if placed != expected {
            log::error!("Data modules filled after {placed} of {expected} message bits");
            return Err(QRError::StructuralInconsistency { placed, expected });
        }
        Ok(placed)
    }

    // Data modules in placement order. Unfilled modules read as light
    pub fn read_data(&self) -> BitStream {
        let mut bits = BitStream::new(self.count_modules(ModuleType::Data));
        for (r, c) in EncRegionIter::new(self.ver) {
            let module = self.get(r, c);
            if module.kind == ModuleType::Data {
                bits.push(module.value == Some(Color::Dark));
            }
        }
        bits
    }

    // XORs the mask predicate onto data modules only. Applying the same
    // pattern twice restores the unmasked data
    pub fn apply_mask(&mut self, pattern: MaskPattern) {
        let mask_fn = pattern.mask_function();
        let w = self.w as i16;
        for r in 0..w {
            for c in 0..w {
                let i = self.coord_to_index(r, c);
                if self.types[i] == ModuleType::Data && mask_fn(r, c) {
                    self.values[i] = self.values[i].map(|v| !v);
                }
            }
        }
    }
}
