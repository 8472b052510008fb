//! Validation, projection, and caching pipeline.
//!
//! This module holds the pieces that decide whether an input is safe to
//! decode and what the host sees once it is:
//! - Size guard: fixed ceilings checked before any decoding
//! - Property projector: header state -> canonical (key, value) pairs
//! - Property cache: build-once, read-only memoized store
//! - Thumbnail synthesizer: bounded BGRA raster from decoded pixels
//!
//! The lazy loading that ties these together around a decoder lives in
//! [`crate::preview`].

mod cache;
mod guard;
mod project;
mod thumbnail;
mod types;

pub use cache::PropertyCache;
pub use guard::{
    check_input_size, check_staging_budget, MAX_GRID_EDGE, MAX_INPUT_BYTES, MAX_OUTPUT_BYTES,
    MAX_THUMB_HEIGHT, MAX_THUMB_WIDTH, THUMB_STAGING_BYTES_PER_PIXEL,
};
pub use project::project;
pub use thumbnail::synthesize;
pub use types::{
    AlphaMode, CanonicalProperty, CaptureDate, ExtractError, HeaderState, ImageDimensions,
    PropertyKey, PropertyKind, PropertyValue, StorageType, Thumbnail,
};
