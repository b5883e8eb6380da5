use crate::builder::Matrix;
use crate::common::{
    bit_utils::BitStream,
    codec::{decode_segments, Segment},
    ec::{deinterleave, rectify},
    error::{QRError, QRResult},
    info::{read_format, read_version, InfoDecode},
    mask::MaskPattern,
    metadata::{ECLevel, Version},
};

// Decoded symbol
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub version: Version,
    pub ec_level: ECLevel,
    pub mask: MaskPattern,
    // Interleaved codewords as read from the unmasked grid
    pub codewords: Vec<u8>,
    // Corrected data codewords in block order
    pub data_codewords: Vec<u8>,
    // Corrected codewords per block
    pub corrections: Vec<usize>,
    pub segments: Vec<Segment>,
}

impl Decoded {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn total_corrections(&self) -> usize {
        self.corrections.iter().sum()
    }
}

// Decoder
//------------------------------------------------------------------------------

// Reads the message back out of a finished matrix. The grid size fixes the
// version; version info, when present, has to agree with it.
pub fn decode(m: &Matrix) -> QRResult<Decoded> {
    let version = m.version();
    let (ec_level, mask) = read_format(m).into_result()?;
    if let Some(InfoDecode::Corrected { value, .. }) = read_version(m) {
        if value != version {
            log::debug!("Version info reads {value} on a version {version} grid");
            return Err(QRError::InvalidVersion);
        }
    }
    log::debug!("Decoding QR {{ Version: {version}, Ec level: {ec_level:?}, Mask: {mask} }}...");

    let mut unmasked = m.clone();
    unmasked.apply_mask(mask);
    // Remainder bits trail the last codeword
    let codewords = unmasked.read_data().data()[..version.total_codewords()].to_vec();

    let plan = version.ec_block_plan(ec_level);
    let ecc_count = plan.ecc_per_block();
    let mut data_codewords = Vec::with_capacity(plan.total_data_codewords());
    let mut corrections = Vec::with_capacity(plan.block_count());
    for (i, mut block) in deinterleave(&codewords, &plan).into_iter().enumerate() {
        let corrected = rectify(&mut block, ecc_count).inspect_err(|_| {
            log::debug!("Block {i} of {} is beyond correction", plan.block_count());
        })?;
        corrections.push(corrected);
        data_codewords.extend_from_slice(&block[..block.len() - ecc_count]);
    }

    let mut encoded = BitStream::from_bytes(&data_codewords);
    let segments = decode_segments(&mut encoded, version)?;

    let decoded = Decoded { version, ec_level, mask, codewords, data_codewords, corrections, segments };
    log::info!(
        "QR decoded: {} segments, {} corrected codewords",
        decoded.segments.len(),
        decoded.total_corrections()
    );
    Ok(decoded)
}
