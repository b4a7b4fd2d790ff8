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

//! The block codec used for Red Book audio data: encode with `flacenc`, decode with `claxon`.
//! FLAC is a lossless codec for 16-bit stereo PCM, exactly the shape of a Red Book audio sector
//! run, and is selected by the packer only for blocks flagged `Audio` on CD-family, non-special
//! media (see [`MediaType::is_special_cd_family`](crate::media_type::MediaType::is_special_cd_family)).

use std::io::Cursor;

use claxon::FlacReader;
use flacenc::{component::BitRepr, error::Verify};

use crate::{AaruError, Result, CD_RAW_SECTOR_SIZE};

const CHANNELS: usize = 2;
const BITS_PER_SAMPLE: usize = 16;
const SAMPLE_RATE: usize = 44100;

/// Encode raw interleaved 16-bit stereo PCM bytes (as they appear in a CD audio sector run) to FLAC.
pub fn compress(data: &[u8], sector_size: u32) -> Result<Vec<u8>> {
    if sector_size as usize != CD_RAW_SECTOR_SIZE {
        return Err(AaruError::ParameterError(
            "FLAC codec requires full 2352-byte Red Book audio sectors".into(),
        ));
    }
    if data.len() % 4 != 0 {
        return Err(AaruError::ParameterError(
            "audio block length is not a whole number of 16-bit stereo frames".into(),
        ));
    }

    let samples: Vec<i32> = data
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]) as i32)
        .collect();

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| AaruError::EncoderFailure(format!("{e:?}")))?;

    let source = flacenc::source::MemSource::from_samples(&samples, CHANNELS, BITS_PER_SAMPLE, SAMPLE_RATE);
    let flac_stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| AaruError::EncoderFailure(format!("{e:?}")))?;

    let mut sink = flacenc::bitsink::ByteSink::new();
    flac_stream
        .write(&mut sink)
        .map_err(|e| AaruError::EncoderFailure(format!("{e:?}")))?;
    Ok(sink.into_inner())
}

/// Decode a FLAC stream produced by [`compress`] back to raw interleaved 16-bit stereo PCM bytes.
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut reader = FlacReader::new(Cursor::new(data)).map_err(|e| AaruError::EncoderFailure(e.to_string()))?;

    let mut out = Vec::with_capacity(expected_len);
    for sample in reader.samples() {
        let sample = sample.map_err(|e| AaruError::EncoderFailure(e.to_string()))?;
        out.extend_from_slice(&(sample as i16).to_le_bytes());
    }

    if out.len() != expected_len {
        return Err(AaruError::WrongSize {
            expected: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_audio_block(sectors: usize) -> Vec<u8> {
        let samples_per_sector = CD_RAW_SECTOR_SIZE / 4;
        let mut out = Vec::with_capacity(sectors * CD_RAW_SECTOR_SIZE);
        for i in 0..(sectors * samples_per_sector) {
            let value = ((i as f64 * 0.05).sin() * 8000.0) as i16;
            out.extend_from_slice(&value.to_le_bytes());
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_round_trip() {
        let data = sine_audio_block(4);
        let compressed = compress(&data, CD_RAW_SECTOR_SIZE as u32).unwrap();
        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_rejects_non_audio_sector_size() {
        let data = vec![0u8; 2048];
        assert!(compress(&data, 2048).is_err());
    }
}
