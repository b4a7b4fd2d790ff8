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

//! CRC-64/ECMA-182, the checksum stored in every [`DataBlockHeader`](crate::format::DataBlockHeader)
//! and in the [`IndexEntry`](crate::format::IndexEntry) covering the index itself.

use crc::{Crc, CRC_64_ECMA_182};

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// Compute the CRC-64/ECMA-182 of `data`.
pub fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// An incremental CRC-64/ECMA-182 accumulator, for checksumming a block's payload as it is
/// assembled sector-by-sector rather than copying it into one contiguous buffer first.
pub struct Crc64Digest {
    digest: crc::Digest<'static, u64>,
}

impl Default for Crc64Digest {
    fn default() -> Self {
        Self {
            digest: CRC64.digest(),
        }
    }
}

impl Crc64Digest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    pub fn finalize(self) -> u64 {
        self.digest.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_matches_incremental() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let whole = checksum(data);

        let mut digest = Crc64Digest::new();
        digest.update(&data[..10]);
        digest.update(&data[10..]);
        assert_eq!(digest.finalize(), whole);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(checksum(&[]), CRC64.checksum(&[]));
    }
}
