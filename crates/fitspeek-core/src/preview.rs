//! The preview source: one input stream, lazily derived header state,
//! memoized properties, and thumbnail access.
//!
//! `FitsPreview` answers three independent query protocols over a single
//! input: stream attachment, property reads, and thumbnail synthesis. Every
//! query first ensures the header has loaded (lazy, retryable on failure);
//! property queries additionally ensure the cache has been built (lazy,
//! build-once-on-success).
//!
//! # Concurrency
//!
//! Single-threaded synchronous model: every operation runs to completion on
//! the calling thread, and the caller is expected to serialize access to an
//! instance. The stream, header state, and property cache are each owned
//! exclusively and released exactly once on drop, regardless of which
//! operations were attempted or how often they failed.

use std::io::{Seek, SeekFrom};

use tracing::{debug, warn};

use crate::decoder::{DecodeLimits, Decoder};
use crate::extract::{
    check_input_size, project, synthesize, ExtractError, HeaderState, PropertyCache, PropertyKey,
    PropertyValue, Thumbnail,
};

/// Attach an input stream to a preview source. An instance accepts exactly
/// one attachment over its lifetime.
pub trait StreamInitialize {
    type Stream;

    fn initialize(&mut self, stream: Self::Stream) -> Result<(), ExtractError>;
}

/// Read-only access to the canonical property set.
pub trait PropertyReader {
    fn property_count(&mut self) -> Result<usize, ExtractError>;

    fn property_key_at(&mut self, index: usize) -> Result<PropertyKey, ExtractError>;

    fn property(&mut self, key: PropertyKey) -> Result<PropertyValue, ExtractError>;

    /// Always fails with `NotSupported`; the store is read-only by design.
    fn set_property(&mut self, key: PropertyKey, value: PropertyValue)
        -> Result<(), ExtractError>;

    fn is_property_writable(&self, key: PropertyKey) -> bool;
}

/// Bounded-size raster preview access.
pub trait ThumbnailSource {
    /// Synthesize a preview raster. The requested edge length is accepted
    /// for protocol compatibility but does not rescale the output.
    fn thumbnail(&mut self, requested_edge: u32) -> Result<Thumbnail, ExtractError>;
}

/// Lazy-load state machine for the header pipeline.
///
/// `Failed` retains the decoder so a later query can retry the full parse;
/// `Loaded` is terminal and never re-parses.
enum LoadState<D: Decoder> {
    Unattached,
    Attached(D::Stream),
    Failed(D),
    Loaded(D, HeaderState),
}

/// A single loaded input: stream ownership, header state, property cache,
/// and thumbnail synthesis behind the capability traits.
pub struct FitsPreview<D: Decoder> {
    state: LoadState<D>,
    properties: PropertyCache,
    limits: DecodeLimits,
}

impl<D: Decoder> Default for FitsPreview<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Decoder> FitsPreview<D> {
    pub fn new() -> Self {
        Self::with_limits(DecodeLimits::default())
    }

    pub fn with_limits(limits: DecodeLimits) -> Self {
        Self {
            state: LoadState::Unattached,
            properties: PropertyCache::new(),
            limits,
        }
    }

    /// Header state, if a load has succeeded.
    pub fn header(&self) -> Option<&HeaderState> {
        match &self.state {
            LoadState::Loaded(_, header) => Some(header),
            _ => None,
        }
    }
}

impl<D: Decoder> FitsPreview<D>
where
    D::Stream: Seek,
{
    /// Ensure header state exists, loading it on first need.
    ///
    /// Idempotent: a loaded header is returned as-is without re-invoking
    /// the decoder. A failed attempt leaves the instance retryable; the
    /// next call re-runs the pipeline from where it failed.
    pub fn ensure_loaded(&mut self) -> Result<(), ExtractError> {
        match std::mem::replace(&mut self.state, LoadState::Unattached) {
            LoadState::Unattached => Err(ExtractError::StreamUnavailable),
            LoadState::Loaded(decoder, header) => {
                self.state = LoadState::Loaded(decoder, header);
                Ok(())
            }
            LoadState::Attached(mut stream) => {
                let declared = match stream_len(&mut stream) {
                    Ok(len) => len,
                    Err(_) => {
                        self.state = LoadState::Attached(stream);
                        return Err(ExtractError::DecodeFailure);
                    }
                };
                if let Err(err) = check_input_size(declared) {
                    warn!(declared, "input rejected by size guard");
                    self.state = LoadState::Attached(stream);
                    return Err(err);
                }
                let decoder = D::open(stream, self.limits);
                self.parse_and_validate(decoder)
            }
            LoadState::Failed(decoder) => self.parse_and_validate(decoder),
        }
    }

    fn parse_and_validate(&mut self, mut decoder: D) -> Result<(), ExtractError> {
        let parsed = decoder.parse_header();

        if parsed.is_ok() && decoder.header_valid() {
            let header = HeaderState {
                valid: true,
                input: decoder.input_dimensions(),
                output: decoder.output_dimensions(),
                storage: decoder.storage_type(),
                date: decoder.capture_date(),
                exposure_seconds: decoder.exposure_seconds(),
                focal_length_mm: decoder.focal_length_mm(),
                aperture_f_number: decoder.aperture_f_number(),
            };
            if header.input.is_valid() && header.output.is_valid() {
                debug!(
                    width = header.input.width,
                    height = header.input.height,
                    channels = header.input.channels,
                    bit_depth = header.storage.bit_depth,
                    "header loaded"
                );
                self.state = LoadState::Loaded(decoder, header);
                return Ok(());
            }
        }

        warn!("header rejected; input remains retryable");
        self.state = LoadState::Failed(decoder);
        Err(ExtractError::InvalidHeader)
    }

    /// Ensure the property cache has been built from the loaded header.
    ///
    /// No-op once the cache holds at least one entry. A failure during
    /// header load leaves the cache fully empty and eligible for another
    /// build attempt on the next query.
    pub fn ensure_properties(&mut self) -> Result<(), ExtractError> {
        if !self.properties.is_empty() {
            return Ok(());
        }
        self.ensure_loaded()?;
        match &self.state {
            LoadState::Loaded(_, header) => {
                self.properties.fill(project(header));
                Ok(())
            }
            // ensure_loaded succeeded, so the state is Loaded
            _ => Err(ExtractError::StreamUnavailable),
        }
    }
}

impl<D: Decoder> StreamInitialize for FitsPreview<D> {
    type Stream = D::Stream;

    fn initialize(&mut self, stream: Self::Stream) -> Result<(), ExtractError> {
        if !matches!(self.state, LoadState::Unattached) {
            return Err(ExtractError::AlreadyInitialized);
        }
        self.state = LoadState::Attached(stream);
        Ok(())
    }
}

impl<D: Decoder> PropertyReader for FitsPreview<D>
where
    D::Stream: Seek,
{
    fn property_count(&mut self) -> Result<usize, ExtractError> {
        self.ensure_properties()?;
        Ok(self.properties.len())
    }

    fn property_key_at(&mut self, index: usize) -> Result<PropertyKey, ExtractError> {
        self.ensure_properties()?;
        self.properties.key_at(index)
    }

    fn property(&mut self, key: PropertyKey) -> Result<PropertyValue, ExtractError> {
        self.ensure_properties()?;
        self.properties.get(key).cloned()
    }

    fn set_property(
        &mut self,
        key: PropertyKey,
        value: PropertyValue,
    ) -> Result<(), ExtractError> {
        self.properties.set(key, value)
    }

    fn is_property_writable(&self, key: PropertyKey) -> bool {
        self.properties.is_writable(key)
    }
}

impl<D: Decoder> ThumbnailSource for FitsPreview<D>
where
    D::Stream: Seek,
{
    fn thumbnail(&mut self, _requested_edge: u32) -> Result<Thumbnail, ExtractError> {
        self.ensure_loaded()?;
        match &mut self.state {
            LoadState::Loaded(decoder, header) => synthesize(decoder, header),
            _ => Err(ExtractError::StreamUnavailable),
        }
    }
}

/// Declared stream size from seek metadata, preserving the position.
fn stream_len<S: Seek>(stream: &mut S) -> std::io::Result<u64> {
    let position = stream.stream_position()?;
    let len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(position))?;
    Ok(len)
}
