use std::sync::OnceLock;

use super::error::{QRError, QRResult};
use super::mask::MaskPattern;
use super::metadata::{ECLevel, Version, FORMAT_INFO_BIT_LEN, VERSION_INFO_BIT_LEN};
use crate::builder::Matrix;

pub const FORMAT_GENERATOR: u32 = 0b10100110111;
pub const FORMAT_MASK: u32 = 0b101010000010010;
pub const VERSION_GENERATOR: u32 = 0b1111100100101;

pub const MAX_CORRECTABLE_BITS: u32 = 3;

// Decode outcome
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoDecode<T> {
    Corrected { value: T, error_bits: u32 },
    Uncorrectable,
}

impl<T> InfoDecode<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Corrected { value, .. } => Some(value),
            Self::Uncorrectable => None,
        }
    }

    pub fn error_bits(&self) -> Option<u32> {
        match self {
            Self::Corrected { error_bits, .. } => Some(*error_bits),
            Self::Uncorrectable => None,
        }
    }

    pub fn into_result(self) -> QRResult<T> {
        match self {
            Self::Corrected { value, .. } => Ok(value),
            Self::Uncorrectable => Err(QRError::UncorrectableInfo),
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> Option<U>) -> InfoDecode<U> {
        match self {
            Self::Corrected { value, error_bits } => match f(value) {
                Some(value) => InfoDecode::Corrected { value, error_bits },
                None => InfoDecode::Uncorrectable,
            },
            Self::Uncorrectable => InfoDecode::Uncorrectable,
        }
    }
}

// BCH code
//------------------------------------------------------------------------------

// Remainder of polynomial division over GF(2)
fn poly_rem(mut value: u32, generator: u32) -> u32 {
    let deg = 31 - generator.leading_zeros();
    while value != 0 {
        let top = 31 - value.leading_zeros();
        if top < deg {
            break;
        }
        value ^= generator << (top - deg);
    }
    value
}

#[derive(Debug)]
pub struct BchCode {
    bits: usize,
    generator: u32,
    // Syndrome of a single flipped bit, indexed by bit position
    single_bit_syndromes: Vec<u32>,
}

static FORMAT_CODE: OnceLock<BchCode> = OnceLock::new();
static VERSION_CODE: OnceLock<BchCode> = OnceLock::new();

impl BchCode {
    fn new(bits: usize, generator: u32) -> Self {
        let single_bit_syndromes = (0..bits).map(|i| poly_rem(1 << i, generator)).collect();
        Self { bits, generator, single_bit_syndromes }
    }

    pub fn format() -> &'static BchCode {
        FORMAT_CODE.get_or_init(|| Self::new(FORMAT_INFO_BIT_LEN, FORMAT_GENERATOR))
    }

    pub fn version() -> &'static BchCode {
        VERSION_CODE.get_or_init(|| Self::new(VERSION_INFO_BIT_LEN, VERSION_GENERATOR))
    }

    fn check_bits(&self) -> usize {
        (31 - self.generator.leading_zeros()) as usize
    }

    pub fn encode(&self, data: u32) -> u32 {
        let shifted = data << self.check_bits();
        debug_assert!(shifted >> self.bits == 0, "Data doesn't fit the code: {data}");
        shifted | poly_rem(shifted, self.generator)
    }

    pub fn syndrome(&self, word: u32) -> u32 {
        poly_rem(word, self.generator)
    }

    // Finds the lightest error pattern of up to MAX_CORRECTABLE_BITS bits
    // that zeroes the syndrome
    fn error_pattern(&self, syndrome: u32) -> Option<(u32, u32)> {
        (0..=MAX_CORRECTABLE_BITS)
            .find_map(|weight| self.pattern_of_weight(syndrome, weight, 0).map(|p| (p, weight)))
    }

    // Pattern of exactly `weight` bits at positions from `start` on whose
    // single bit syndromes sum to `syndrome`
    fn pattern_of_weight(&self, syndrome: u32, weight: u32, start: usize) -> Option<u32> {
        if weight == 0 {
            return (syndrome == 0).then_some(0);
        }
        (start..self.bits).find_map(|i| {
            let rest = syndrome ^ self.single_bit_syndromes[i];
            self.pattern_of_weight(rest, weight - 1, i + 1).map(|p| p | (1 << i))
        })
    }

    // Corrected codeword and number of flipped bits
    pub fn correct(&self, word: u32) -> InfoDecode<u32> {
        let word = word & ((1 << self.bits) - 1);
        match self.error_pattern(self.syndrome(word)) {
            Some((pattern, error_bits)) => InfoDecode::Corrected { value: word ^ pattern, error_bits },
            None => InfoDecode::Uncorrectable,
        }
    }
}

// Format info
//------------------------------------------------------------------------------

pub fn format_info(ecl: ECLevel, mask: MaskPattern) -> u32 {
    let data = (ecl.format_bits() << 3) | *mask as u32;
    BchCode::format().encode(data) ^ FORMAT_MASK
}

pub fn decode_format_info(raw: u32) -> InfoDecode<(ECLevel, MaskPattern)> {
    let code = BchCode::format();
    code.correct(raw ^ FORMAT_MASK).map(|cw| {
        let data = cw >> code.check_bits();
        let mask = MaskPattern::new((data & 0b111) as u8).ok()?;
        Some((ECLevel::from_format_bits(data >> 3), mask))
    })
}

#[cfg(test)]
mod format_info_tests {
    use proptest::prelude::*;

    use super::{decode_format_info, format_info, InfoDecode, MAX_CORRECTABLE_BITS};
    use crate::common::error::QRError;
    use crate::common::mask::MaskPattern;
    use crate::common::metadata::ECLevel;

    static FORMAT_INFOS: [[u32; 8]; 4] = [
        [0x77C4, 0x72F3, 0x7DAA, 0x789D, 0x662F, 0x6318, 0x6C41, 0x6976],
        [0x5412, 0x5125, 0x5E7C, 0x5B4B, 0x45F9, 0x40CE, 0x4F97, 0x4AA0],
        [0x355F, 0x3068, 0x3F31, 0x3A06, 0x24B4, 0x2183, 0x2EDA, 0x2BED],
        [0x1689, 0x13BE, 0x1CE7, 0x19D0, 0x0762, 0x0255, 0x0D0C, 0x083B],
    ];

    #[test]
    fn test_format_info_table() {
        for ecl in ECLevel::ALL {
            for mask in MaskPattern::all() {
                assert_eq!(format_info(ecl, mask), FORMAT_INFOS[ecl as usize][*mask as usize]);
            }
        }
    }

    #[test]
    fn test_round_trip_with_single_flip() {
        for ecl in ECLevel::ALL {
            for mask in MaskPattern::all() {
                let info = format_info(ecl, mask);
                let exp = InfoDecode::Corrected { value: (ecl, mask), error_bits: 0 };
                assert_eq!(decode_format_info(info), exp);
                for i in 0..15 {
                    let exp = InfoDecode::Corrected { value: (ecl, mask), error_bits: 1 };
                    assert_eq!(decode_format_info(info ^ (1 << i)), exp);
                }
            }
        }
    }

    #[test]
    fn test_three_flips() {
        let info = format_info(ECLevel::H, MaskPattern::new(6).unwrap());
        let res = decode_format_info(info ^ 0b100_0000_0100_0001);
        assert_eq!(res.error_bits(), Some(3));
        assert_eq!(res.value(), Some(&(ECLevel::H, MaskPattern::new(6).unwrap())));
    }

    #[test]
    fn test_beyond_correctable_bits() {
        let value = (ECLevel::Q, MaskPattern::new(2).unwrap());
        let info = format_info(value.0, value.1);
        for shift in 0..15 - MAX_CORRECTABLE_BITS {
            let flips = ((1 << (MAX_CORRECTABLE_BITS + 1)) - 1) << shift;
            let res = decode_format_info(info ^ flips);
            assert_ne!(res.value(), Some(&value), "Flips {flips:015b}");
        }
    }

    #[test]
    fn test_into_result() {
        assert_eq!(InfoDecode::<u32>::Uncorrectable.into_result(), Err(QRError::UncorrectableInfo));
        assert_eq!(InfoDecode::Corrected { value: 3, error_bits: 1 }.into_result(), Ok(3));
    }

    proptest! {
        #[test]
        fn proptest_corrects_up_to_three(
            ecl in 0..4usize,
            mask in 0..8u8,
            flips in proptest::sample::subsequence((0..15u32).collect::<Vec<_>>(), 0..=3),
        ) {
            let ecl = ECLevel::ALL[ecl];
            let mask = MaskPattern::new(mask).unwrap();
            let err = flips.iter().fold(0, |acc, b| acc | (1 << b));
            let res = decode_format_info(format_info(ecl, mask) ^ err);
            let exp = InfoDecode::Corrected { value: (ecl, mask), error_bits: flips.len() as u32 };
            prop_assert_eq!(res, exp);
        }
    }
}

// Version info
//------------------------------------------------------------------------------

pub fn version_info(ver: Version) -> Option<u32> {
    ver.info()?;
    Some(BchCode::version().encode(*ver as u32))
}

// Corrects up to 3 flipped bits and validates against the canonical table
pub fn decode_version_info(raw: u32) -> InfoDecode<Version> {
    let code = BchCode::version();
    code.correct(raw).map(|cw| {
        let ver = Version::new((cw >> code.check_bits()) as usize).ok()?;
        (ver.info()? == cw).then_some(ver)
    })
}


// Info extraction from a symbol
//------------------------------------------------------------------------------

// Decodes both format copies and keeps the one needing fewer corrections
pub fn read_format(m: &Matrix) -> InfoDecode<(ECLevel, MaskPattern)> {
    let (main, side) = m.read_format_info();
    pick_best(decode_format_info(main), decode_format_info(side))
}

// Absent below version 7
pub fn read_version(m: &Matrix) -> Option<InfoDecode<Version>> {
    let (tr, bl) = m.read_version_info()?;
    Some(pick_best(decode_version_info(tr), decode_version_info(bl)))
}

fn pick_best<T>(first: InfoDecode<T>, second: InfoDecode<T>) -> InfoDecode<T> {
    match (first.error_bits(), second.error_bits()) {
        (Some(a), Some(b)) if b < a => second,
        (None, Some(_)) => second,
        _ => first,
    }
}
