use std::ops::{Add, AddAssign, Div, Mul, MulAssign};
use std::sync::OnceLock;

// Primitive polynomial x^8 + x^4 + x^3 + x^2 + 1
pub const PRIMITIVE_POLYNOMIAL: u16 = 0x11D;

// Galois field tables
//------------------------------------------------------------------------------

#[derive(Debug)]
pub struct GaloisField {
    exp: [u8; 256],
    log: [u8; 256],
}

static GF256: OnceLock<GaloisField> = OnceLock::new();

impl GaloisField {
    // Tables are built on first access and shared read-only afterwards
    pub fn get() -> &'static GaloisField {
        GF256.get_or_init(Self::build)
    }

    fn build() -> Self {
        log::trace!("Building GF(256) exp/log tables");
        let mut exp = [0u8; 256];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        for (i, e) in exp.iter_mut().enumerate().take(255) {
            *e = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= PRIMITIVE_POLYNOMIAL;
            }
        }
        exp[255] = exp[0];
        Self { exp, log }
    }

    pub fn exp(&self, power: usize) -> u8 {
        self.exp[power % 255]
    }

    pub fn log(&self, a: u8) -> u8 {
        debug_assert!(a != 0, "Log of zero is undefined");
        self.log[a as usize]
    }

    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[(self.log[a as usize] as usize + self.log[b as usize] as usize) % 255]
    }

    pub fn div(&self, a: u8, b: u8) -> u8 {
        debug_assert!(b != 0, "Division by zero");
        if a == 0 {
            return 0;
        }
        self.exp[(self.log[a as usize] as usize + 255 - self.log[b as usize] as usize) % 255]
    }
}

// Galois field element
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct G(pub u8);

impl G {
    pub fn gen_pow(power: usize) -> Self {
        Self(GaloisField::get().exp(power))
    }
}

impl Add for G {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl AddAssign for G {
    fn add_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0;
    }
}

impl Mul for G {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Self(GaloisField::get().mul(self.0, rhs.0))
    }
}

impl MulAssign for G {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Div for G {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        Self(GaloisField::get().div(self.0, rhs.0))
    }
}

#[cfg(test)]
mod galois_tests {
    use test_case::test_case;

    use super::{GaloisField, G};

    #[test]
    fn test_tables() {
        let gf = GaloisField::get();
        assert_eq!(gf.exp(0), 1);
        assert_eq!(gf.exp(8), 0x1D);
        assert_eq!(gf.exp(255), gf.exp(0));
        assert_eq!(gf.exp[255], 1);
        for a in 1..=255u8 {
            assert_eq!(gf.exp(gf.log(a) as usize), a);
        }
    }

    #[test]
    fn test_single_instance() {
        assert!(std::ptr::eq(GaloisField::get(), GaloisField::get()));
    }

    #[test_case(0, 0x53, 0)]
    #[test_case(1, 0x53, 0x53)]
    #[test_case(2, 0x80, 0x1D)]
    #[test_case(0x53, 0xCA, 0x8F)]
    fn test_mul(a: u8, b: u8, exp: u8) {
        assert_eq!(G(a) * G(b), G(exp));
        assert_eq!(G(b) * G(a), G(exp));
    }

    #[test]
    fn test_div() {
        for a in 1..=255u8 {
            assert_eq!(G(a) / G(a), G(1));
            assert_eq!(G(a) * G(0x53) / G(0x53), G(a));
        }
        assert_eq!(G(0) / G(7), G(0));
        assert_eq!(G(0x1D) / G(0x80), G(2));
    }

    #[test]
    fn test_add() {
        assert_eq!(G(0b1010) + G(0b0110), G(0b1100));
        let mut g = G(7);
        g += G(7);
        assert_eq!(g, G(0));
    }
}
