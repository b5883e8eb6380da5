//! # qrstage
//!
//! A QR code symbol builder that keeps every construction step inspectable.
//! Text goes through mode analysis, bit packing, Reed-Solomon error correction,
//! interleaving, module placement, masking and BCH format/version stamping,
//! and the output of each stage is kept on the final [`QR`].
//!
//! ## Features
//!
//! - **Mode Analysis**: Numeric, alphanumeric and byte modes with minimum version search
//! - **Reed-Solomon Error Correction**: Block split and interleave for all 40 versions and levels L, M, Q, H
//! - **Mask Selection**: All eight masks scored with the four penalty rules, lowest wins
//! - **Snapshots**: A copy of the matrix after every drawing step
//! - **Info Decoding**: Format and version info decoding correcting up to 3 bit errors
//! - **Symbol Decoding**: Reads a finished matrix back to text with Reed-Solomon correction
//!
//! ## Quick Start
//!
//! ### Simple QR Code Generation
//!
//! ```rust
//! use qrstage::QRBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Version is the smallest that fits, level defaults to M and the best mask is picked
//! let qr = QRBuilder::new("Hello, World!").build()?;
//!
//! let img = qr.to_image(4); // 4 pixels per module
//! assert_eq!(img.width(), (21 + 8) * 4);
//! # Ok(())
//! # }
//! ```
//!
//! ### Full Configuration
//!
//! ```rust
//! use qrstage::{ECLevel, MaskPattern, QRBuilder, Step, Version};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new("HELLO WORLD")
//!     .version(Version::new(2)?)      // Rejected with DataTooLarge if the text doesn't fit
//!     .ec_level(ECLevel::Q)
//!     .mask(MaskPattern::new(3)?)     // Skips mask evaluation
//!     .build()?;
//!
//! let placed = qr.stage(Step::DataPlaced).unwrap();
//! println!("{}", placed.to_debug_str());
//! println!("{}", qr.to_str(1));
//! # Ok(())
//! # }
//! ```
//!
//! ### Decoding Info Bits
//!
//! ```rust
//! use qrstage::{decode_version_info, InfoDecode, Version};
//!
//! let damaged = 0x07C94 ^ 0b101; // Version 7 info with two flipped bits
//! let res = decode_version_info(damaged);
//! assert_eq!(res, InfoDecode::Corrected { value: Version::new(7).unwrap(), error_bits: 2 });
//! ```
//!
//! ### Reading a Symbol Back
//!
//! ```rust
//! use qrstage::{decode, ECLevel, QRBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new("HELLO WORLD").ec_level(ECLevel::Q).build()?;
//! let decoded = decode(qr.matrix())?;
//! assert_eq!(decoded.text(), "HELLO WORLD");
//! assert_eq!(decoded.total_corrections(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Correction Levels
//! - **L (Low)**: ~7% error correction
//! - **M (Medium)**: ~15% error correction
//! - **Q (Quartile)**: ~25% error correction
//! - **H (High)**: ~30% error correction

#![allow(clippy::items_after_test_module)]

pub mod builder;
pub(crate) mod common;
pub mod reader;

pub use builder::{Matrix, Module, ModuleType, QRBuilder, Snapshot, Step, QR};
pub use common::bit_utils::BitStream;
pub use common::codec::{analyze, Analysis, EncodedData, Mode, Segment};
pub use common::ec::{ECBlockPlan, ErrorCorrection};
pub use common::error::{QRError, QRResult};
pub use common::info::{
    decode_format_info, decode_version_info, format_info, read_format, read_version, version_info,
    InfoDecode,
};
pub use common::mask::{MaskEvaluation, MaskPattern, PenaltyScore};
pub use common::metadata::{Color, ECLevel, Version};
pub use reader::{decode, Decoded};
