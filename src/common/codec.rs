use encoding_rs::SHIFT_JIS;

use super::bit_utils::BitStream;
use super::error::{QRError, QRResult};
use super::metadata::{ECLevel, Version};

pub const MODE_INDICATOR_BITS: usize = 4;
pub const PAD_CODEWORDS: [u8; 2] = [0b11101100, 0b00010001];

// Mode
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Mode {
    Numeric = 0b0001,
    Alphanumeric = 0b0010,
    Byte = 0b0100,
    Kanji = 0b1000,
}

impl Mode {
    pub fn indicator(self) -> u8 {
        self as u8
    }

    pub fn of_char(ch: char) -> Self {
        if ch.is_ascii_digit() {
            Self::Numeric
        } else if alphanumeric_digit(ch).is_some() {
            Self::Alphanumeric
        } else if is_kanji(ch) {
            Self::Kanji
        } else {
            Self::Byte
        }
    }

    // Number of characters counted by the character count indicator
    pub fn char_count(self, text: &str) -> usize {
        match self {
            Self::Byte => text.len(),
            _ => text.chars().count(),
        }
    }

    // Bits needed for the data segment, excluding mode and count indicators
    pub fn data_bits(self, text: &str) -> usize {
        let len = self.char_count(text);
        match self {
            Self::Numeric => len / 3 * 10 + [0, 4, 7][len % 3],
            Self::Alphanumeric => len / 2 * 11 + (len % 2) * 6,
            Self::Byte => len * 8,
            Self::Kanji => len * 13,
        }
    }
}

pub fn alphanumeric_digit(ch: char) -> Option<u16> {
    let v = match ch {
        '0'..='9' => ch as u16 - '0' as u16,
        'A'..='Z' => ch as u16 - 'A' as u16 + 10,
        ' ' => 36,
        '$' => 37,
        '%' => 38,
        '*' => 39,
        '+' => 40,
        '-' => 41,
        '.' => 42,
        '/' => 43,
        ':' => 44,
        _ => return None,
    };
    Some(v)
}

// Double byte Shift JIS character inside the QR kanji ranges
pub fn is_kanji(ch: char) -> bool {
    let mut buf = [0u8; 4];
    let (bytes, _, unmappable) = SHIFT_JIS.encode(ch.encode_utf8(&mut buf));
    if unmappable || bytes.len() != 2 {
        return false;
    }
    let code = u16::from_be_bytes([bytes[0], bytes[1]]);
    matches!(code, 0x8140..=0x9FFC | 0xE040..=0xEBBF)
}

#[cfg(test)]
mod mode_tests {
    use test_case::test_case;

    use super::{is_kanji, Mode};

    #[test_case('0', Mode::Numeric)]
    #[test_case('9', Mode::Numeric)]
    #[test_case('A', Mode::Alphanumeric)]
    #[test_case(' ', Mode::Alphanumeric)]
    #[test_case(':', Mode::Alphanumeric)]
    #[test_case('a', Mode::Byte)]
    #[test_case('#', Mode::Byte)]
    #[test_case('é', Mode::Byte)]
    #[test_case('点', Mode::Kanji)]
    #[test_case('茗', Mode::Kanji)]
    #[test_case('🌎', Mode::Byte)]
    fn test_of_char(ch: char, mode: Mode) {
        assert_eq!(Mode::of_char(ch), mode);
    }

    #[test]
    fn test_kanji_excludes_single_byte_katakana() {
        assert!(!is_kanji('ｱ'));
        assert!(!is_kanji('A'));
    }

    #[test_case(Mode::Numeric, "01234567", 27)]
    #[test_case(Mode::Numeric, "0123", 14)]
    #[test_case(Mode::Numeric, "01", 7)]
    #[test_case(Mode::Alphanumeric, "HELLO WORLD", 61)]
    #[test_case(Mode::Alphanumeric, "AC", 11)]
    #[test_case(Mode::Byte, "héllo", 48)]
    fn test_data_bits(mode: Mode, text: &str, bits: usize) {
        assert_eq!(mode.data_bits(text), bits);
    }
}

// Mode analysis
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Analysis {
    // Single mode the input classifies as
    pub detected_mode: Mode,
    // Mode used for packing. Kanji falls back to byte
    pub mode: Mode,
    pub char_count: usize,
    pub minimum_version: Version,
    pub is_valid: bool,
}

impl Analysis {
    // Mode indicator + character count indicator + data bits at the given version
    pub fn required_bits(&self, text: &str, version: Version) -> usize {
        MODE_INDICATOR_BITS + version.char_cnt_bits(self.mode) + self.mode.data_bits(text)
    }
}

pub fn select_mode(text: &str) -> Mode {
    let mut modes = text.chars().map(Mode::of_char);
    let Some(first) = modes.next() else {
        return Mode::Byte;
    };
    modes.try_fold(first, |acc, m| match (acc, m) {
        (a, b) if a == b => Some(a),
        (Mode::Numeric | Mode::Alphanumeric, Mode::Numeric | Mode::Alphanumeric) => {
            Some(Mode::Alphanumeric)
        }
        _ => None,
    })
    .unwrap_or(Mode::Byte)
}

pub fn analyze(text: &str, ecl: ECLevel) -> Analysis {
    if text.is_empty() {
        return Analysis {
            detected_mode: Mode::Byte,
            mode: Mode::Byte,
            char_count: 0,
            minimum_version: Version::from_index(0),
            is_valid: false,
        };
    }

    let detected_mode = select_mode(text);
    let mode = match detected_mode {
        Mode::Kanji => {
            log::warn!("Kanji mode is not supported, encoding as byte mode");
            Mode::Byte
        }
        m => m,
    };

    let mut analysis = Analysis {
        detected_mode,
        mode,
        char_count: mode.char_count(text),
        minimum_version: Version::from_index(0),
        is_valid: false,
    };

    match Version::all().find(|&v| analysis.required_bits(text, v) <= v.data_bit_capacity(ecl)) {
        Some(v) => {
            analysis.minimum_version = v;
            analysis.is_valid = true;
        }
        None => {
            log::debug!("No version fits {} bits at level {ecl:?}", mode.data_bits(text));
            analysis.minimum_version = Version::from_index(39);
        }
    }
    analysis
}


// Bit packer
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedData {
    pub mode: Mode,
    pub version: Version,
    pub ec_level: ECLevel,
    pub char_count: usize,
    pub bits: BitStream,
    count_bits: usize,
    data_bits: usize,
    terminator_bits: usize,
    boundary_bits: usize,
}

impl EncodedData {
    fn slice(&self, start: usize, len: usize) -> String {
        self.bits.iter().skip(start).take(len).map(|b| if b { '1' } else { '0' }).collect()
    }

    pub fn mode_indicator(&self) -> String {
        self.slice(0, MODE_INDICATOR_BITS)
    }

    pub fn char_count_indicator(&self) -> String {
        self.slice(MODE_INDICATOR_BITS, self.count_bits)
    }

    pub fn data_bits(&self) -> String {
        self.slice(MODE_INDICATOR_BITS + self.count_bits, self.data_bits)
    }

    pub fn terminator_bits(&self) -> usize {
        self.terminator_bits
    }

    pub fn boundary_bits(&self) -> usize {
        self.boundary_bits
    }

    // Pad codewords appended after byte alignment
    pub fn pad_codewords(&self) -> usize {
        let used = MODE_INDICATOR_BITS
            + self.count_bits
            + self.data_bits
            + self.terminator_bits
            + self.boundary_bits;
        (self.bits.len() - used) >> 3
    }

    pub fn codewords(&self) -> &[u8] {
        self.bits.data()
    }
}

pub fn encode(text: &str, analysis: &Analysis, version: Version, ecl: ECLevel) -> QRResult<EncodedData> {
    let mode = analysis.mode;
    let capacity = version.data_bit_capacity(ecl);
    let required = analysis.required_bits(text, version);
    if required > capacity {
        log::debug!("Version {version} holds {capacity} bits at {ecl:?}, {required} required");
        return Err(QRError::DataTooLarge);
    }

    let mut bs = BitStream::new(capacity);
    let count_bits = version.char_cnt_bits(mode);
    bs.push_bits(mode.indicator(), MODE_INDICATOR_BITS);
    bs.push_bits(analysis.char_count as u32, count_bits);

    match mode {
        Mode::Numeric => push_numeric(&mut bs, text),
        Mode::Alphanumeric => push_alphanumeric(&mut bs, text),
        Mode::Byte => push_bytes(&mut bs, text.as_bytes()),
        Mode::Kanji => unreachable!("Kanji is packed as byte mode"),
    }
    let data_bits = mode.data_bits(text);

    let terminator_bits = push_terminator(&mut bs);
    let boundary_bits = pad_to_byte_boundary(&mut bs);
    pad_remaining_capacity(&mut bs);
    log::trace!("Packed bits: {}", bs.to_bit_string());

    Ok(EncodedData {
        mode,
        version,
        ec_level: ecl,
        char_count: analysis.char_count,
        bits: bs,
        count_bits,
        data_bits,
        terminator_bits,
        boundary_bits,
    })
}

fn push_numeric(bs: &mut BitStream, text: &str) {
    for chunk in text.as_bytes().chunks(3) {
        let value = chunk.iter().fold(0u16, |acc, b| acc * 10 + (b - b'0') as u16);
        bs.push_bits(value, [0, 4, 7, 10][chunk.len()]);
    }
}

fn push_alphanumeric(bs: &mut BitStream, text: &str) {
    let digits = text.chars().filter_map(alphanumeric_digit).collect::<Vec<_>>();
    for pair in digits.chunks(2) {
        match *pair {
            [a, b] => bs.push_bits(a * 45 + b, 11),
            [a] => bs.push_bits(a, 6),
            _ => unreachable!(),
        }
    }
}

fn push_bytes(bs: &mut BitStream, bytes: &[u8]) {
    for &b in bytes {
        bs.push_bits(b, 8);
    }
}

fn push_terminator(bs: &mut BitStream) -> usize {
    let n = bs.remaining_capacity().min(4);
    bs.push_bits(0, n);
    n
}

fn pad_to_byte_boundary(bs: &mut BitStream) -> usize {
    let n = (8 - (bs.len() & 7)) & 7;
    bs.push_bits(0, n);
    n
}

fn pad_remaining_capacity(bs: &mut BitStream) {
    debug_assert!(bs.len() & 7 == 0, "Padding must start at a byte boundary");
    for pad in PAD_CODEWORDS.iter().cycle() {
        if bs.remaining_capacity() < 8 {
            break;
        }
        bs.push_bits(*pad, 8);
    }
}


// Decoder
//------------------------------------------------------------------------------

pub const ALPHANUMERIC_CHARSET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub mode: Mode,
    pub char_count: usize,
    pub text: String,
}

// Reads segments until the terminator or until fewer bits than a mode
// indicator remain, which happens when the data fills the capacity
pub fn decode_segments(inp: &mut BitStream, version: Version) -> QRResult<Vec<Segment>> {
    let mut segments = Vec::new();
    while inp.remaining() >= MODE_INDICATOR_BITS {
        match take_segment(inp, version)? {
            Some(seg) => segments.push(seg),
            None => break,
        }
    }
    Ok(segments)
}

fn take_segment(inp: &mut BitStream, version: Version) -> QRResult<Option<Segment>> {
    let (mode, char_count) = match take_header(inp, version)? {
        Some(header) => header,
        None => return Ok(None),
    };

    let mut text = String::with_capacity(char_count);
    match mode {
        Mode::Numeric => take_numeric(inp, char_count, &mut text)?,
        Mode::Alphanumeric => take_alphanumeric(inp, char_count, &mut text)?,
        Mode::Byte => take_bytes(inp, char_count, &mut text)?,
        Mode::Kanji => take_kanji(inp, char_count, &mut text)?,
    }
    log::trace!("Decoded {mode:?} segment of {char_count} chars");

    Ok(Some(Segment { mode, char_count, text }))
}

// Mode and char count. None for the terminator
fn take_header(inp: &mut BitStream, version: Version) -> QRResult<Option<(Mode, usize)>> {
    let mode_bits = inp.take_bits(MODE_INDICATOR_BITS).unwrap_or(0);
    let mode = match mode_bits {
        0b0000 => return Ok(None),
        0b0001 => Mode::Numeric,
        0b0010 => Mode::Alphanumeric,
        0b0100 => Mode::Byte,
        0b1000 => Mode::Kanji,
        _ => return Err(QRError::InvalidMode(mode_bits as u8)),
    };

    let len_bits = version.char_cnt_bits(mode);
    let char_count = inp.take_bits(len_bits).ok_or(QRError::CorruptDataSegment)?;
    Ok(Some((mode, char_count as usize)))
}

fn take_numeric(inp: &mut BitStream, mut char_count: usize, out: &mut String) -> QRResult<()> {
    while char_count > 0 {
        let n = char_count.min(3);
        let chunk = inp.take_bits([0, 4, 7, 10][n]).ok_or(QRError::CorruptDataSegment)?;
        if chunk >= 10u16.pow(n as u32) {
            return Err(QRError::CorruptDataSegment);
        }
        out.push_str(&format!("{chunk:0n$}"));
        char_count -= n;
    }
    Ok(())
}

fn alphanumeric_char(digit: u16) -> QRResult<char> {
    ALPHANUMERIC_CHARSET.get(digit as usize).map(|&b| b as char).ok_or(QRError::CorruptDataSegment)
}

fn take_alphanumeric(inp: &mut BitStream, mut char_count: usize, out: &mut String) -> QRResult<()> {
    while char_count > 1 {
        let chunk = inp.take_bits(11).ok_or(QRError::CorruptDataSegment)?;
        out.push(alphanumeric_char(chunk / 45)?);
        out.push(alphanumeric_char(chunk % 45)?);
        char_count -= 2;
    }
    if char_count == 1 {
        let chunk = inp.take_bits(6).ok_or(QRError::CorruptDataSegment)?;
        out.push(alphanumeric_char(chunk)?);
    }
    Ok(())
}

// UTF-8 when valid, otherwise each byte is read as ISO-8859-1
fn take_bytes(inp: &mut BitStream, char_count: usize, out: &mut String) -> QRResult<()> {
    let mut bytes = Vec::with_capacity(char_count);
    for _ in 0..char_count {
        let chunk = inp.take_bits(8).ok_or(QRError::CorruptDataSegment)?;
        bytes.push(chunk as u8);
    }

    match String::from_utf8(bytes) {
        Ok(utf8) => out.push_str(&utf8),
        Err(e) => out.extend(e.as_bytes().iter().map(|&b| b as char)),
    }
    Ok(())
}

// 13 bit values expand back to double byte Shift JIS
fn take_kanji(inp: &mut BitStream, char_count: usize, out: &mut String) -> QRResult<()> {
    let mut bytes = Vec::with_capacity(char_count * 2);
    for _ in 0..char_count {
        let chunk = inp.take_bits(13).ok_or(QRError::CorruptDataSegment)?;
        let offset = ((chunk / 0xC0) << 8) | (chunk % 0xC0);
        let code = if offset + 0x8140 <= 0x9FFC { offset + 0x8140 } else { offset + 0xC140 };
        bytes.extend(code.to_be_bytes());
    }

    let (kanji, _, has_err) = SHIFT_JIS.decode(&bytes);
    if has_err {
        return Err(QRError::InvalidCharacterEncoding);
    }
    out.push_str(&kanji);
    Ok(())
}
