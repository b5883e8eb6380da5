pub mod bit_utils;
pub mod codec;
pub mod ec;
pub mod error;
pub mod galois;
pub mod info;
pub mod iter;
pub mod mask;
pub mod metadata;
mod version_db;

