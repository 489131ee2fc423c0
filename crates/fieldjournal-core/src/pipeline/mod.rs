//! Image-side stages of the upload pipeline.
//!
//! - **validate**: type allow-list, size ceiling and magic-byte checks
//! - **variant**: AI proxy, thumbnail and preview generation
//! - **metadata**: EXIF and GPS extraction
//! - **hash**: content-addressed storage object names
//! - **discovery**: find uploadable images in directories

pub mod discovery;
pub mod hash;
pub mod metadata;
pub mod validate;
pub mod variant;

pub use discovery::{DiscoveredFile, FileDiscovery};
pub use hash::Hasher;
pub use metadata::MetadataExtractor;
pub use validate::UploadValidator;
pub use variant::{ImageSet, Variant, VariantGenerator, VariantOptions};
