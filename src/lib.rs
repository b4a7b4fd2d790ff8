/*
    AaruFormat
    https://github.com/dbalsom/fluxfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! # aaruformat
//!
//! `aaruformat` is a Rust library for reading and writing the AARUFMT disk and
//! tape image container: a block-oriented, deduplicating, optionally compressed
//! format for preserving bit-exact dumps of optical, magnetic and tape media.
//!
//! A container is a header, a sequence of variable-length typed blocks, and a
//! trailing index that locates them. Sector data is split into fixed-size runs
//! of sectors ("data blocks"), each compressed independently and deduplicated
//! by content hash through a deduplication table (DDT) that maps every logical
//! sector to the block holding its bytes.
//!
//! The two entry points are [`writer::Writer`], which builds a new container
//! (or appends to a previously-closed one), and [`reader::Reader`], which opens
//! a container for random-access reading. Both are built from independently
//! testable collaborators — [`packer::BlockPacker`], [`dedup::DedupStore`],
//! [`ddt::Ddt`], and the [`cdrom`] long-sector splitter — rather than as a
//! single monolithic type.

pub mod cdrom;
pub mod codec;
pub mod ddt;
pub mod dedup;
pub mod format;
pub mod geometry;
pub mod media_type;
pub mod packer;
pub mod reader;
pub mod sidechannel;
pub mod tape;
pub mod tracks;
pub mod util;
pub mod writer;

use std::io;

use thiserror::Error;

/// The largest sector size the container format can describe (DVD/BD L2 ECC blocks are smaller
/// than this; this bound exists to keep block-packer buffers sane).
pub const MAXIMUM_SECTOR_SIZE: usize = 8192;
/// The sector size assumed when a format doesn't otherwise specify one.
pub const DEFAULT_SECTOR_SIZE: usize = 512;
/// The size in bytes of a raw CD-ROM sector: 12-byte sync + 4-byte header/subheader + 2048/2336
/// byte user data + ECC/EDC, or the full 2352-byte frame for audio.
pub const CD_RAW_SECTOR_SIZE: usize = 2352;
/// The size in bytes of a CD-ROM sector's user data region (Mode 1 and Mode 2 Form 1).
pub const CD_SECTOR_SIZE: usize = 2048;
/// The size in bytes of the Q subchannel deinterleaved from a CD-ROM sector.
pub const CD_SUBCHANNEL_SIZE: usize = 96;

/// The "AARUFMT" little-endian magic number stamped into every [`format::Header`] this crate
/// writes. The legacy "DICMFMT" magic is still accepted on read (see
/// [`format::Header::is_legacy`]) but is never written (resolves Open Question 3).
pub const AARUFMT_MAGIC: u64 = u64::from_le_bytes(*b"AARUFMT\0");
/// The magic number of the predecessor format, accepted on read only.
pub const DICMFMT_MAGIC: u64 = u64::from_le_bytes(*b"DICMFMT\0");

/// The current on-disk format version this crate writes, and the newest version it will open.
pub const CURRENT_VERSION: u8 = 2;

/// The single error type returned by every fallible operation in this crate.
///
/// This maps directly onto the error taxonomy of the container format: a caller that only wants
/// a yes/no answer for whether an operation failed can match on [`AaruError::message`], while a
/// caller integrating more deeply can match on the specific variant.
#[derive(Debug, Error)]
pub enum AaruError {
    /// Wraps an underlying [`std::io::Error`].
    #[error("I/O error: {0}")]
    Io(String),
    /// Wraps a [`binrw::Error`] encountered decoding or encoding a fixed-layout record.
    #[error("malformed container structure: {0}")]
    BinaryFormat(String),
    /// A write-family method was called on a [`reader::Reader`], or after [`writer::Writer::close`].
    #[error("image is not open for writing")]
    NotWriting,
    /// A sector address, block index, or count argument fell outside the valid range.
    #[error("argument out of range")]
    OutOfRange,
    /// A caller supplied a buffer of the wrong size for the operation (e.g. a sector write that
    /// doesn't match the image's sector size).
    #[error("expected a buffer of {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },
    /// No track covers the requested sector address.
    #[error("no track covers the requested sector")]
    TrackNotFound,
    /// The requested operation is not valid for the image's media type.
    #[error("unsupported media type for this operation")]
    UnsupportedMedia,
    /// `Writer::reopen` was called against a container whose fixed parameters (sector size,
    /// sectors-per-block, media type) don't match the options passed to reopen it.
    #[error("cannot append: {0}")]
    IncompatibleAppend(String),
    /// `Writer::reopen` was called against a container with no deduplication table block.
    #[error("cannot append: image has no deduplication table")]
    MissingDdtOnAppend,
    /// A block's stored CRC-64 did not match its decompressed contents. Non-fatal on append: the
    /// block is treated as absent and the condition is logged via `log::warn!`.
    #[error("corrupt block at offset {offset}: {reason}")]
    CorruptBlock { offset: u64, reason: String },
    /// A data block or DDT header named a compression algorithm this build doesn't support (the
    /// `lzma`/`flac` cargo features are both optional).
    #[error("unsupported compression algorithm: {0}")]
    UnsupportedCompression(u8),
    /// An enabled codec failed to encode or decode a block's payload.
    #[error("codec failure: {0}")]
    EncoderFailure(String),
    /// A caller-supplied parameter failed validation (e.g. a non-power-of-two `sectors_per_block`).
    #[error("invalid parameter: {0}")]
    ParameterError(String),
}

impl AaruError {
    /// Render a short, caller-facing message for code that only wants a string, mirroring the
    /// boolean-plus-message surface the original format's error reporting exposes at its edge.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<io::Error> for AaruError {
    fn from(err: io::Error) -> Self {
        AaruError::Io(err.to_string())
    }
}

impl From<binrw::Error> for AaruError {
    fn from(err: binrw::Error) -> Self {
        AaruError::BinaryFormat(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AaruError>;

pub use crate::codec::Compression;
pub use crate::ddt::Ddt;
pub use crate::dedup::DedupStore;
pub use crate::media_type::MediaType;
pub use crate::packer::BlockPacker;
pub use crate::reader::Reader;
pub use crate::writer::{CreateOptions, Writer};
