//! Metadata extraction and bounded thumbnail synthesis for FITS images.
//!
//! The crate is organized around a small pipeline:
//!
//! - [`preview::FitsPreview`] owns the lifecycle: attach a stream once,
//!   then answer property and thumbnail queries lazily.
//! - [`extract`] holds the pure stages: size guards, header-to-property
//!   projection, the read-only property cache, and thumbnail synthesis.
//! - [`decoder::Decoder`] is the seam between the pipeline and format
//!   knowledge; [`fits::FitsReader`] is the bundled implementation.
//!
//! ```no_run
//! use std::fs::File;
//! use fitspeek_core::{FitsPreview, FitsReader, PropertyReader, StreamInitialize, ThumbnailSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("m31.fits")?;
//! let mut preview = FitsPreview::<FitsReader<File>>::new();
//! preview.initialize(file)?;
//! for i in 0..preview.property_count()? {
//!     let key = preview.property_key_at(i)?;
//!     println!("{key} = {:?}", preview.property(key)?);
//! }
//! let thumb = preview.thumbnail(256)?;
//! # Ok(())
//! # }
//! ```

pub mod decoder;
pub mod extract;
pub mod fits;
pub mod preview;

pub use decoder::{DecodeLimits, Decoder, ReadOptions};
pub use extract::{
    AlphaMode, CanonicalProperty, CaptureDate, ExtractError, HeaderState, ImageDimensions,
    PropertyCache, PropertyKey, PropertyKind, PropertyValue, StorageType, Thumbnail,
};
pub use fits::{FitsHeader, FitsReader};
pub use preview::{FitsPreview, PropertyReader, StreamInitialize, ThumbnailSource};
