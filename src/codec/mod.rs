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

//! The primitive codecs (C1): block compression, CRC-64 block/index checksums, and the optional
//! whole-image running digests. Each codec is a free function or small stateless type rather than
//! a trait object — the packer and writer pick the concrete path with a `match` on [`Compression`].

pub mod crc64;
pub mod digest;

#[cfg(feature = "flac")]
pub mod flac;
#[cfg(feature = "lzma")]
pub mod lzma;

use strum::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{AaruError, Result};

/// The compression algorithm a data block was encoded with.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Compression {
    #[default]
    None = 0,
    Lzma = 1,
    Flac = 2,
}

impl TryFrom<u8> for Compression {
    type Error = AaruError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Lzma),
            2 => Ok(Compression::Flac),
            other => Err(AaruError::UnsupportedCompression(other)),
        }
    }
}

impl From<Compression> for u8 {
    fn from(value: Compression) -> Self {
        value as u8
    }
}

/// Compress `data` with `algorithm`, returning the encoded bytes.
///
/// `sector_size` is only meaningful for [`Compression::Flac`], which needs to know the PCM frame
/// shape; it is ignored by the other variants.
pub fn compress(algorithm: Compression, data: &[u8], sector_size: u32) -> Result<Vec<u8>> {
    match algorithm {
        Compression::None => Ok(data.to_vec()),
        #[cfg(feature = "lzma")]
        Compression::Lzma => lzma::compress(data),
        #[cfg(not(feature = "lzma"))]
        Compression::Lzma => Err(AaruError::UnsupportedCompression(Compression::Lzma as u8)),
        #[cfg(feature = "flac")]
        Compression::Flac => flac::compress(data, sector_size),
        #[cfg(not(feature = "flac"))]
        Compression::Flac => Err(AaruError::UnsupportedCompression(Compression::Flac as u8)),
    }
}

/// Decompress `data` (which was encoded with `algorithm`) back to `expected_len` raw bytes.
pub fn decompress(algorithm: Compression, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    match algorithm {
        Compression::None => {
            if data.len() != expected_len {
                return Err(AaruError::WrongSize {
                    expected: expected_len,
                    actual: data.len(),
                });
            }
            Ok(data.to_vec())
        }
        #[cfg(feature = "lzma")]
        Compression::Lzma => lzma::decompress(data, expected_len),
        #[cfg(not(feature = "lzma"))]
        Compression::Lzma => Err(AaruError::UnsupportedCompression(Compression::Lzma as u8)),
        #[cfg(feature = "flac")]
        Compression::Flac => flac::decompress(data, expected_len),
        #[cfg(not(feature = "flac"))]
        Compression::Flac => Err(AaruError::UnsupportedCompression(Compression::Flac as u8)),
    }
}
