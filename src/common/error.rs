use std::fmt::{Debug, Display, Error, Formatter};

// Error
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum QRError {
    // Builder
    EmptyData,
    DataTooLarge,
    InvalidVersion,
    InvalidMaskingPattern,
    StructuralInconsistency { placed: usize, expected: usize },

    // Info decoder
    UncorrectableInfo,

    // Data decoder
    UncorrectableData,
    InvalidMode(u8),
    CorruptDataSegment,
    InvalidCharacterEncoding,
}

impl Display for QRError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        match *self {
            Self::EmptyData => f.write_str("Empty data"),
            Self::DataTooLarge => f.write_str("Data too large for any version at this level"),
            Self::InvalidVersion => f.write_str("Invalid version"),
            Self::InvalidMaskingPattern => f.write_str("Invalid masking pattern"),
            Self::StructuralInconsistency { placed, expected } => write!(
                f,
                "Placement consumed {placed} bits but the message holds {expected} bits"
            ),
            Self::UncorrectableInfo => f.write_str("Too many errors to correct info bits"),
            Self::UncorrectableData => f.write_str("Too many errors to correct data codewords"),
            Self::InvalidMode(bits) => write!(f, "Invalid mode indicator: {bits:04b}"),
            Self::CorruptDataSegment => f.write_str("Data segment ends before its character count"),
            Self::InvalidCharacterEncoding => f.write_str("Invalid character encoding"),
        }
    }
}

impl std::error::Error for QRError {}

pub type QRResult<T> = Result<T, QRError>;
