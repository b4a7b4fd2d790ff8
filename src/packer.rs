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

//! The block packer (C3): accumulates equal-size sectors into one open compressed block, and
//! flushes it into a [`FlushedBlock`] ready for [`Writer`](crate::writer::Writer) to append to
//! the backing file (§4.3).
//!
//! The packer owns the decompressed shadow buffer and a running CRC-64 over it; compression
//! itself is one-shot at flush time through [`crate::codec`], since none of the codecs this crate
//! wraps (`lzma-rs`, `flacenc`/`claxon`) expose an incremental block-at-a-time streaming API worth
//! threading through here.

use crate::{
    codec::{self, crc64::Crc64Digest, Compression},
    format::{DataBlockHeader, DataType, DATA_BLOCK_IDENTIFIER},
    AaruError, Result,
};

/// The five-byte LZMA properties prefix stored immediately before the compressed payload (§6).
pub const LZMA_PROPERTIES_LENGTH: usize = 5;

/// Whether the packer's current block holds Red Book audio samples or anything else. Only
/// meaningful for the FLAC flush condition (§4.3, flush condition 3): a track-kind transition
/// forces a flush exactly when the open block is FLAC-compressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Other,
}

/// A filled, compressed (or not) block ready to be written to the backing file: header plus the
/// bytes that follow it (LZMA property prefix, if any, then the payload).
pub struct FlushedBlock {
    pub header: DataBlockHeader,
    /// The 5-byte LZMA properties prefix, present only when `header.compression == Lzma`.
    pub properties: Option<[u8; LZMA_PROPERTIES_LENGTH]>,
    pub payload: Vec<u8>,
    /// The absolute file offset this block occupies — the value DDT entries pointing into it
    /// were built from at `open`.
    pub file_offset: u64,
    pub sector_count: u32,
}

/// The open, unflushed block a [`Writer`] is appending sectors into.
pub struct BlockPacker {
    data_type: DataType,
    sector_size: u32,
    shift: u8,
    compression: Compression,
    track_kind: TrackKind,
    file_offset: u64,
    sectors: u32,
    buffer: Vec<u8>,
    crc: Crc64Digest,
}

impl BlockPacker {
    /// Open a new block at `file_offset` (the position it will occupy once flushed).
    pub fn open(
        data_type: DataType,
        sector_size: u32,
        shift: u8,
        compression: Compression,
        track_kind: TrackKind,
        file_offset: u64,
    ) -> Self {
        Self {
            data_type,
            sector_size,
            shift,
            compression,
            track_kind,
            file_offset,
            sectors: 0,
            buffer: Vec::new(),
            crc: Crc64Digest::new(),
        }
    }

    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    pub fn sector_count(&self) -> u32 {
        self.sectors
    }

    pub fn sector_capacity(&self) -> u32 {
        1u32 << self.shift
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// The DDT entry an in-flight append would be assigned, computed before the byte is actually
    /// appended (§4.4: `ddtEntry = (currentFileOffsetOfOpenBlock << shift) | currentBlockOffset`).
    pub fn next_entry(&self) -> u64 {
        crate::ddt::Ddt::encode_entry(self.file_offset, self.sectors, self.shift)
    }

    /// True if appending a sector of `sector_size` bytes on a track of `track_kind` would first
    /// require flushing the current block (§4.3, flush conditions 1-3).
    pub fn would_force_flush(&self, sector_size: u32, track_kind: TrackKind) -> bool {
        if self.sectors == 0 {
            return false;
        }
        self.sectors >= self.sector_capacity()
            || sector_size != self.sector_size
            || (self.compression == Compression::Flac && track_kind != self.track_kind)
    }

    /// Append one sector's raw bytes to the open block. Caller must have already checked
    /// [`would_force_flush`](Self::would_force_flush) and flushed if needed.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.sector_size as usize {
            return Err(AaruError::WrongSize {
                expected: self.sector_size as usize,
                actual: data.len(),
            });
        }
        self.buffer.extend_from_slice(data);
        self.crc.update(data);
        self.sectors += 1;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sectors == 0
    }

    /// Flush the block: compress the accumulated bytes (demoting to `None` if compression didn't
    /// shrink the payload, for LZMA only — §4.3 flush sequence step 3), and produce the header and
    /// bytes a [`Writer`] appends to the file.
    pub fn flush(self) -> Result<FlushedBlock> {
        let length = self.buffer.len() as u64;
        let crc64 = self.crc.finalize();

        let (compression, properties, payload, cmp_crc64) = match self.compression {
            Compression::None => {
                let crc = crc64;
                (Compression::None, None, self.buffer, crc)
            }
            Compression::Lzma => {
                let compressed = codec::compress(Compression::Lzma, &self.buffer, self.sector_size)?;
                if compressed.len() >= self.buffer.len() {
                    // Demote: store the decompressed shadow instead (§4.3 step 3).
                    let crc = crc64;
                    (Compression::None, None, self.buffer, crc)
                }
                else {
                    let mut props = [0u8; LZMA_PROPERTIES_LENGTH];
                    props.copy_from_slice(&compressed[..LZMA_PROPERTIES_LENGTH]);
                    let payload = compressed[LZMA_PROPERTIES_LENGTH..].to_vec();
                    let cmp_crc = codec::crc64::checksum(&compressed);
                    (Compression::Lzma, Some(props), payload, cmp_crc)
                }
            }
            Compression::Flac => {
                let compressed = codec::compress(Compression::Flac, &self.buffer, self.sector_size)?;
                let cmp_crc = codec::crc64::checksum(&compressed);
                (Compression::Flac, None, compressed, cmp_crc)
            }
        };

        let cmp_length = properties.map(|p| p.len()).unwrap_or(0) as u64 + payload.len() as u64;

        let header = DataBlockHeader {
            identifier: DATA_BLOCK_IDENTIFIER,
            data_type: self.data_type.into(),
            compression: compression.into(),
            sector_size: self.sector_size,
            length,
            cmp_length,
            crc64,
            cmp_crc64,
        };

        Ok(FlushedBlock {
            header,
            properties,
            payload,
            file_offset: self.file_offset,
            sector_count: self.sectors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(byte: u8) -> Vec<u8> {
        vec![byte; 512]
    }

    #[test]
    fn test_flush_condition_full_block() {
        let packer = BlockPacker::open(DataType::UserData, 512, 2, Compression::None, TrackKind::Other, 0);
        assert!(!packer.would_force_flush(512, TrackKind::Other));

        let mut packer = packer;
        for _ in 0..4 {
            packer.append(&sector(0xAA)).unwrap();
        }
        assert!(packer.would_force_flush(512, TrackKind::Other));
    }

    #[test]
    fn test_flush_condition_sector_size_change() {
        let mut packer = BlockPacker::open(DataType::UserData, 512, 12, Compression::None, TrackKind::Other, 0);
        packer.append(&sector(0)).unwrap();
        assert!(packer.would_force_flush(2048, TrackKind::Other));
    }

    #[test]
    fn test_flush_condition_audio_transition_only_for_flac() {
        let mut lzma_packer = BlockPacker::open(DataType::UserData, 512, 12, Compression::Lzma, TrackKind::Other, 0);
        lzma_packer.append(&sector(0)).unwrap();
        assert!(!lzma_packer.would_force_flush(512, TrackKind::Audio));

        let mut flac_packer = BlockPacker::open(DataType::UserData, 512, 12, Compression::Flac, TrackKind::Other, 0);
        flac_packer.append(&sector(0)).unwrap();
        assert!(flac_packer.would_force_flush(512, TrackKind::Audio));
    }

    #[test]
    fn test_flush_none_header_shape() {
        let mut packer = BlockPacker::open(DataType::UserData, 512, 12, Compression::None, TrackKind::Other, 4096);
        packer.append(&sector(0xAA)).unwrap();
        packer.append(&sector(0xAA)).unwrap();
        let flushed = packer.flush().unwrap();
        assert_eq!(flushed.header.length, 1024);
        assert_eq!(flushed.header.cmp_length, 1024);
        assert_eq!(flushed.header.crc64, flushed.header.cmp_crc64);
        assert!(flushed.properties.is_none());
        assert_eq!(flushed.sector_count, 2);
        assert_eq!(flushed.file_offset, 4096);
    }

    #[test]
    fn test_next_entry_tracks_sector_count() {
        let mut packer = BlockPacker::open(DataType::UserData, 512, 12, Compression::None, TrackKind::Other, 4096);
        assert_eq!(packer.next_entry(), crate::ddt::Ddt::encode_entry(4096, 0, 12));
        packer.append(&sector(0)).unwrap();
        assert_eq!(packer.next_entry(), crate::ddt::Ddt::encode_entry(4096, 1, 12));
    }
}
