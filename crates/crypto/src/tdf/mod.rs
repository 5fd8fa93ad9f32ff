//! NanoTDF envelope cryptography

pub mod binding;
pub mod dataset;
pub mod nanotdf;
pub mod nanotdf_crypto;

pub use dataset::NanoTdfDataset;
pub use nanotdf::{NanoTdfBuilder, NanoTdfExt};
pub use nanotdf_crypto::{decrypt, encrypt, open, seal, NanoTdfIv, TagSize};
