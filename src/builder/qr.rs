use std::fmt::{Display, Formatter};

use image::{GrayImage, Luma};

use super::Matrix;
use crate::common::{
    bit_utils::BitStream,
    codec::{Analysis, EncodedData},
    ec::ErrorCorrection,
    mask::{MaskEvaluation, MaskPattern},
    metadata::{Color, ECLevel, Version},
};

pub const QUIET_ZONE_MODULES: usize = 4;

// Construction steps
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Step {
    Empty,
    FinderPatterns,
    Separators,
    TimingPatterns,
    AlignmentPatterns,
    ReservedInfo,
    DataPlaced,
    Masked,
    FormatStamped,
    VersionStamped,
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::FinderPatterns => "finder patterns",
            Self::Separators => "separators",
            Self::TimingPatterns => "timing patterns",
            Self::AlignmentPatterns => "alignment patterns",
            Self::ReservedInfo => "reserved info areas",
            Self::DataPlaced => "data placed",
            Self::Masked => "masked",
            Self::FormatStamped => "format stamped",
            Self::VersionStamped => "version stamped",
        };
        f.write_str(name)
    }
}

// Copy of the matrix taken right after a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub step: Step,
    pub matrix: Matrix,
}

// Final symbol
//------------------------------------------------------------------------------

/// A fully constructed QR symbol together with every intermediate artifact
/// produced on the way: mode analysis, packed codewords, error correction
/// blocks, the final message, all eight mask scores and a matrix snapshot
/// per construction step.
#[derive(Debug, Clone)]
pub struct QR {
    pub(crate) version: Version,
    pub(crate) ec_level: ECLevel,
    pub(crate) mask: MaskPattern,
    pub(crate) format_info: u32,
    pub(crate) version_info: Option<u32>,
    pub(crate) matrix: Matrix,
    pub(crate) analysis: Analysis,
    pub(crate) encoded: EncodedData,
    pub(crate) error_correction: ErrorCorrection,
    pub(crate) message: BitStream,
    pub(crate) mask_evaluations: Vec<MaskEvaluation>,
    pub(crate) snapshots: Vec<Snapshot>,
}

impl QR {
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn width(&self) -> usize {
        self.version.width()
    }

    pub fn ec_level(&self) -> ECLevel {
        self.ec_level
    }

    pub fn mask(&self) -> MaskPattern {
        self.mask
    }

    pub fn format_info(&self) -> u32 {
        self.format_info
    }

    /// `None` below version 7.
    pub fn version_info(&self) -> Option<u32> {
        self.version_info
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn encoded(&self) -> &EncodedData {
        &self.encoded
    }

    pub fn error_correction(&self) -> &ErrorCorrection {
        &self.error_correction
    }

    /// Interleaved data and ec codewords followed by the remainder bits.
    pub fn message(&self) -> &BitStream {
        &self.message
    }

    /// Penalty scores of all eight masks in pattern order. Empty when the
    /// mask was forced.
    pub fn mask_evaluations(&self) -> &[MaskEvaluation] {
        &self.mask_evaluations
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn stage(&self, step: Step) -> Option<&Matrix> {
        self.snapshots.iter().find(|s| s.step == step).map(|s| &s.matrix)
    }

    /// Row major grid of 0 (light) and 1 (dark).
    pub fn final_bits(&self) -> Vec<Vec<u8>> {
        self.matrix.to_bits()
    }

    pub fn count_dark_modules(&self) -> usize {
        self.matrix.count_dark_modules()
    }

    pub fn metadata(&self) -> String {
        format!(
            "{{ Version: {}, Ec level: {:?}, Mask: {} }}",
            *self.version, self.ec_level, *self.mask
        )
    }
}

// Render
//------------------------------------------------------------------------------

impl QR {
    fn color_at(&self, r: usize, c: usize) -> Color {
        self.matrix.get(r as i16, c as i16).value.unwrap_or(Color::Light)
    }

    pub fn to_image(&self, module_sz: u32) -> GrayImage {
        let qz_sz = QUIET_ZONE_MODULES as u32 * module_sz;
        let qr_sz = self.width() as u32 * module_sz;
        let total_sz = qz_sz + qr_sz + qz_sz;

        GrayImage::from_fn(total_sz, total_sz, |j, i| {
            if i < qz_sz || i >= qz_sz + qr_sz || j < qz_sz || j >= qz_sz + qr_sz {
                return Luma([255]);
            }
            let r = ((i - qz_sz) / module_sz) as usize;
            let c = ((j - qz_sz) / module_sz) as usize;
            Luma([self.color_at(r, c).select(255, 0)])
        })
    }

    pub fn to_str(&self, module_sz: usize) -> String {
        let qz_sz = QUIET_ZONE_MODULES * module_sz;
        let qr_sz = self.width() * module_sz;
        let total_sz = qz_sz + qr_sz + qz_sz;

        let mut canvas = String::with_capacity(total_sz * (total_sz + 1) * 3);
        for i in 0..total_sz {
            for j in 0..total_sz {
                if i < qz_sz || i >= qz_sz + qr_sz || j < qz_sz || j >= qz_sz + qr_sz {
                    canvas.push('█');
                    continue;
                }
                let clr = self.color_at((i - qz_sz) / module_sz, (j - qz_sz) / module_sz);
                canvas.push(clr.select('█', ' '));
            }
            canvas.push('\n');
        }
        canvas
    }
}
