use std::fmt::Display;
use std::mem;

use num_traits::PrimInt;

// Bit stream
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStream {
    data: Vec<u8>,
    // Bit length
    len: usize,
    // Max bit capacity
    capacity: usize,
    // Pointer to take bits
    cursor: usize,
}

impl BitStream {
    pub fn new(capacity: usize) -> Self {
        Self { data: vec![0; (capacity + 7) >> 3], len: 0, capacity, cursor: 0 }
    }

    pub fn from_bytes(inp: &[u8]) -> Self {
        let bit_len = inp.len() << 3;
        Self { data: inp.to_vec(), len: bit_len, capacity: bit_len, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.len
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..(self.len + 7) >> 3]
    }

    pub fn bit(&self, i: usize) -> bool {
        debug_assert!(i < self.len, "Bit index out of range: Index {i}, Length {}", self.len);
        (self.data[i >> 3] << (i & 7)) & 0b10000000 != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.bit(i))
    }

    pub fn to_bit_string(&self) -> String {
        self.iter().map(|b| if b { '1' } else { '0' }).collect()
    }
}

// Push bits for bit stream
//------------------------------------------------------------------------------

impl BitStream {
    // Appends the low `size` bits of `bits`, MSB first
    pub fn push_bits<T>(&mut self, bits: T, size: usize)
    where
        T: PrimInt + Display,
    {
        let max_bits = mem::size_of::<T>() * 8;
        debug_assert!(size <= 32, "Cannot push more than 32 bits at once: Size {size}");
        debug_assert!(
            size >= max_bits - bits.leading_zeros() as usize,
            "Bit count shouldn't exceed bit length: Length {size}, Bits {bits}"
        );
        debug_assert!(
            self.len + size <= self.capacity,
            "Insufficient capacity: Capacity {}, Size {}",
            self.capacity,
            self.len + size
        );

        let value = bits.to_u32().unwrap_or_default();
        let mut remaining = size;
        while remaining > 0 {
            let offset = self.len & 7;
            let pos = self.len >> 3;
            let room = 8 - offset;
            let n = room.min(remaining);
            let chunk = ((value >> (remaining - n)) & ((1 << n) - 1)) as u8;
            self.data[pos] |= chunk << (room - n);
            self.len += n;
            remaining -= n;
        }
    }

    pub fn push(&mut self, bit: bool) {
        debug_assert!(
            self.len < self.capacity,
            "Insufficient capacity: Capacity {}, Size {}",
            self.capacity,
            self.len + 1
        );

        if bit {
            let offset = self.len & 7;
            let pos = self.len >> 3;
            self.data[pos] |= 0b10000000 >> offset;
        }

        self.len += 1;
    }

    pub fn extend(&mut self, arr: &[u8]) {
        debug_assert!(
            (self.len & 7) == 0,
            "Bit offset must be zero to extend from another array: Bit offset {}",
            self.len & 7
        );
        let pos = self.len >> 3;
        let arr_bits = arr.len() << 3;
        debug_assert!(
            self.len + arr_bits <= self.capacity,
            "Extension shouldn't overflow capacity: Capacity {}, Size {}",
            self.capacity,
            self.len + arr_bits
        );
        self.data[pos..pos + arr.len()].copy_from_slice(arr);
        self.len += arr_bits;
    }
}

#[cfg(test)]
mod bit_stream_push_tests {

    use super::BitStream;

    #[test]
    fn test_len() {
        let bit_capacity = 152;
        let mut bs = BitStream::new(bit_capacity);
        assert_eq!(bs.len(), 0);
        bs.push_bits(0, 0);
        assert_eq!(bs.len(), 0);
        bs.push_bits(0b1000, 4);
        assert_eq!(bs.len(), 4);
        bs.push_bits(0b1000, 8);
        assert_eq!(bs.len(), 12);
        bs.push_bits(0b1111111, 7);
        assert_eq!(bs.len(), 19);
        bs.push_bits(0b111111111111, 12);
        assert_eq!(bs.len(), 31);
        bs.push_bits(0b111111111111u16, 16);
        assert_eq!(bs.len(), 47);
        assert_eq!(bs.remaining_capacity(), 105);
    }

    #[test]
    #[should_panic]
    fn test_invalid_len() {
        let mut bs = BitStream::new(152);
        bs.push_bits(256, 8);
    }

    #[test]
    fn test_push() {
        let mut bs = BitStream::new(2);
        bs.push(false);
        assert_eq!(bs.data(), [0b00000000]);
        bs.push(true);
        assert_eq!(bs.data(), [0b01000000]);
        assert_eq!(bs.to_bit_string(), "01");
    }

    #[test]
    fn test_push_bits() {
        let exp_vec = [210u8, 52, 141, 35, 72, 210, 183, 42, 7, 219, 91, 14, 253, 68, 120, 193];
        let exp_bits = exp_vec.iter().map(|b| format!("{b:08b}")).collect::<String>();
        let mut out = BitStream::new(152);
        let mut start = 0;
        for n in [0, 1, 2, 3, 4, 5, 6, 7, 8, 4, 8, 9, 11, 15, 16, 5, 16] {
            let chunk = &exp_bits[start..start + n];
            let bits = if n == 0 { 0 } else { u32::from_str_radix(chunk, 2).unwrap() };
            out.push_bits(bits, n);
            start += n;
            assert_eq!(out.to_bit_string(), exp_bits[..start], "n {n}");
        }
        assert_eq!(out.data(), &exp_vec[..out.len() >> 3]);
    }

    #[test]
    fn test_push_bits_across_bytes() {
        let mut bs = BitStream::new(24);
        bs.push_bits(0b0001, 4);
        bs.push_bits(0b0000001000, 10);
        bs.push_bits(0b0000001100, 10);
        assert_eq!(bs.to_bit_string(), "000100000010000000001100");
        assert_eq!(bs.data(), [0x10, 0x20, 0x0C]);
    }

    #[test]
    #[should_panic]
    fn test_push_bits_capacity_overflow() {
        let mut bs = BitStream::new(8);
        bs.push_bits(0xFFu8, 8);
        bs.push_bits(1, 1)
    }

    #[test]
    fn test_extend() {
        let mut bs = BitStream::new(24);
        bs.push_bits(0xA5u8, 8);
        bs.extend(&[0x01, 0x80]);
        assert_eq!(bs.data(), [0xA5, 0x01, 0x80]);
        assert_eq!(bs.len(), 24);
    }
}

// Take bits for bit stream
//------------------------------------------------------------------------------

impl BitStream {
    pub fn take_bits(&mut self, n: usize) -> Option<u16> {
        debug_assert!(n <= 16, "Cannot take more than 16 bits: N {n}");

        if self.cursor + n > self.len {
            return None;
        }

        let res = (self.cursor..self.cursor + n).fold(0u16, |acc, i| (acc << 1) | self.bit(i) as u16);
        self.cursor += n;
        Some(res)
    }

    // Bits left between the cursor and the end of the stream
    pub fn remaining(&self) -> usize {
        self.len - self.cursor
    }
}

#[cfg(test)]
mod bit_stream_take_tests {

    use super::BitStream;

    #[test]
    fn test_take_bits() {
        let data = [
            0b11010010, 0b00110100, 0b10001101, 0b00100011, 0b01001000, 0b11010010, 0b00110100,
            0b10001101, 0b00100011, 0b01001000, 0b11010010, 0b00110100, 0b10001100,
        ];
        let mut bs = BitStream::from_bytes(&data);
        assert_eq!(bs.take_bits(0), Some(0));
        assert_eq!(bs.take_bits(4), Some(0b1101));
        assert_eq!(bs.take_bits(4), Some(0b0010));
        assert_eq!(bs.take_bits(8), Some(0b00110100));
        assert_eq!(bs.take_bits(9), Some(0b100011010));
        assert_eq!(bs.take_bits(7), Some(0b0100011));
        assert_eq!(bs.take_bits(16), Some(0b01001000_11010010));
        assert_eq!(bs.take_bits(1), Some(0b0));
        assert_eq!(bs.take_bits(11), Some(0b01101001000));
        assert_eq!(bs.take_bits(14), Some(0b11010010001101));
        assert_eq!(bs.take_bits(16), Some(0b0010001101001000));
        assert_eq!(bs.take_bits(4), Some(0b1101));
        assert_eq!(bs.take_bits(4), Some(0b0010));
        assert_eq!(bs.take_bits(7), None);
        assert_eq!(bs.remaining(), 6);
        assert_eq!(bs.take_bits(6), Some(0b001100));
        assert_eq!(bs.remaining(), 0);
        assert_eq!(bs.take_bits(1), None);
    }

    #[test]
    fn test_take_bits_over_capacity() {
        let mut bs = BitStream::from_bytes(&[]);
        assert_eq!(bs.take_bits(5), None);
    }
}
