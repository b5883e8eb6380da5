use std::fmt::{Display, Formatter};
use std::ops::{Deref, Not};

use super::codec::Mode;
use super::ec::ECBlockPlan;
use super::error::{QRError, QRResult};
use super::version_db::{
    ALIGNMENT_PATTERN_POSITIONS, DATA_BIT_CAPACITY, EC_BLOCK_PLANS, REMAINDER_BITS, VERSION_INFOS,
};

pub const MAX_VERSION: usize = 40;
pub const FORMAT_INFO_BIT_LEN: usize = 15;
pub const VERSION_INFO_BIT_LEN: usize = 18;

// Version
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub struct Version(usize);

impl Version {
    pub fn new(version: usize) -> QRResult<Self> {
        match version {
            1..=MAX_VERSION => Ok(Self(version)),
            _ => Err(QRError::InvalidVersion),
        }
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        debug_assert!(index < MAX_VERSION, "Version index out of range");
        Self(index + 1)
    }

    pub fn all() -> impl Iterator<Item = Version> {
        (0..MAX_VERSION).map(Self::from_index)
    }

    pub const fn width(self) -> usize {
        self.0 * 4 + 17
    }

    pub fn alignment_pattern(self) -> &'static [i16] {
        ALIGNMENT_PATTERN_POSITIONS[self.0 - 1]
    }

    pub fn remainder_bits(self) -> usize {
        REMAINDER_BITS[self.0 - 1]
    }

    pub fn data_bit_capacity(self, ecl: ECLevel) -> usize {
        DATA_BIT_CAPACITY[self.0 - 1][ecl as usize]
    }

    pub fn data_codewords(self, ecl: ECLevel) -> usize {
        self.data_bit_capacity(ecl) >> 3
    }

    pub fn total_codewords(self) -> usize {
        let plan = self.ec_block_plan(ECLevel::L);
        plan.total_data_codewords() + plan.total_ec_codewords()
    }

    pub fn ecc_per_block(self, ecl: ECLevel) -> usize {
        EC_BLOCK_PLANS[self.0 - 1][ecl as usize].0
    }

    pub fn ec_block_plan(self, ecl: ECLevel) -> ECBlockPlan {
        let (ecc, b1, d1, b2, d2) = EC_BLOCK_PLANS[self.0 - 1][ecl as usize];
        ECBlockPlan::new(ecc, (b1, d1), (b2, d2))
    }

    // Width of the character count indicator per version band 1-9, 10-26, 27-40
    pub fn char_cnt_bits(self, mode: Mode) -> usize {
        let band = match self.0 {
            1..=9 => 0,
            10..=26 => 1,
            _ => 2,
        };
        match mode {
            Mode::Numeric => [10, 12, 14][band],
            Mode::Alphanumeric => [9, 11, 13][band],
            Mode::Byte => [8, 16, 16][band],
            Mode::Kanji => [8, 10, 12][band],
        }
    }

    // Canonical version info from the reference table. Absent below version 7
    pub fn info(self) -> Option<u32> {
        match self.0 {
            7..=MAX_VERSION => Some(VERSION_INFOS[self.0 - 7]),
            _ => None,
        }
    }
}

impl Deref for Version {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}


// Error correction level
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub enum ECLevel {
    L = 0,
    M = 1,
    Q = 2,
    H = 3,
}

impl ECLevel {
    pub const ALL: [ECLevel; 4] = [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H];

    // 2-bit indicator used in format info
    pub fn format_bits(self) -> u32 {
        match self {
            Self::L => 0b01,
            Self::M => 0b00,
            Self::Q => 0b11,
            Self::H => 0b10,
        }
    }

    pub fn from_format_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b01 => Self::L,
            0b00 => Self::M,
            0b11 => Self::Q,
            _ => Self::H,
        }
    }
}

// Color
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Color {
    Light,
    Dark,
}

impl Color {
    pub fn select<T>(&self, light: T, dark: T) -> T {
        match self {
            Self::Light => light,
            Self::Dark => dark,
        }
    }

    pub fn bit(self) -> u8 {
        self.select(0, 1)
    }
}

impl From<bool> for Color {
    fn from(dark: bool) -> Self {
        if dark {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

impl Not for Color {
    type Output = Self;
    fn not(self) -> Self::Output {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}
