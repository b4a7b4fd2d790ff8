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

//! The default block codec for non-audio data, backed by `lzma-rs`'s standard `.lzma` stream
//! (properties byte, dictionary size and uncompressed size header, followed by the LZMA1 range
//! coder payload). The uncompressed size is self-describing in the stream, so
//! [`decompress`] only uses `expected_len` to validate what came back.

use std::io::{BufReader, Cursor};

use lzma_rs::{lzma_compress, lzma_decompress};

use crate::{AaruError, Result};

/// Compress `data` with LZMA1, matching the packer's one-shot-per-block compression model.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = BufReader::new(Cursor::new(data));
    let mut output = Vec::new();
    lzma_compress(&mut reader, &mut output).map_err(|e| AaruError::EncoderFailure(e.to_string()))?;
    Ok(output)
}

/// Decompress an LZMA1 stream produced by [`compress`] back to `expected_len` bytes.
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut reader = BufReader::new(Cursor::new(data));
    let mut output = Vec::new();
    lzma_decompress(&mut reader, &mut output).map_err(|e| AaruError::EncoderFailure(e.to_string()))?;
    if output.len() != expected_len {
        return Err(AaruError::WrongSize {
            expected: expected_len,
            actual: output.len(),
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let data: Vec<u8> = (0..4096u32).map(|v| (v % 251) as u8).collect();
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_round_trip_all_zero() {
        let data = vec![0u8; 2048];
        let compressed = compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }
}
