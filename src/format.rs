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

//! Structure (de)serialization (C2): the fixed, little-endian, packed records that make up a
//! container — [`Header`], the trailing [`IndexHeader`]/[`IndexEntry`] table, [`DataBlockHeader`],
//! [`DdtHeader`], and the small fixed records for tracks, geometry, tape partitions/files and
//! whole-image checksums. Every record round-trips through `binrw`'s [`BinRead`]/[`BinWrite`]
//! traits; nothing here relies on host byte order or struct padding.

use binrw::binrw;

use crate::{AaruError, Result, AARUFMT_MAGIC, DICMFMT_MAGIC};

/// `identifier` stamped into every [`IndexHeader`] (§3 "IndexHeader { identifier=Index, ... }").
pub const INDEX_IDENTIFIER: u32 = u32::from_le_bytes(*b"IDX\0");
/// `identifier` stamped into every [`DataBlockHeader`].
pub const DATA_BLOCK_IDENTIFIER: u32 = u32::from_le_bytes(*b"DATA");
/// `identifier` stamped into every [`DdtHeader`].
pub const DDT_IDENTIFIER: u32 = u32::from_le_bytes(*b"DEDU");

/// The kind of object a trailing [`IndexEntry`] points at.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockType {
    DataBlock = 0,
    DeDuplicationTable = 1,
    ChecksumBlock = 2,
    CicmBlock = 3,
    DumpHardwareBlock = 4,
    GeometryBlock = 5,
    MetadataBlock = 6,
    TapePartitionBlock = 7,
    TapeFileBlock = 8,
    TracksBlock = 9,
}

impl TryFrom<u32> for BlockType {
    type Error = AaruError;

    fn try_from(value: u32) -> Result<Self> {
        Ok(match value {
            0 => BlockType::DataBlock,
            1 => BlockType::DeDuplicationTable,
            2 => BlockType::ChecksumBlock,
            3 => BlockType::CicmBlock,
            4 => BlockType::DumpHardwareBlock,
            5 => BlockType::GeometryBlock,
            6 => BlockType::MetadataBlock,
            7 => BlockType::TapePartitionBlock,
            8 => BlockType::TapeFileBlock,
            9 => BlockType::TracksBlock,
            other => {
                return Err(AaruError::BinaryFormat(format!("unknown block type {other}")));
            }
        })
    }
}

impl From<BlockType> for u32 {
    fn from(value: BlockType) -> Self {
        value as u32
    }
}

/// The shape of the bytes behind a [`BlockType::DataBlock`] or [`BlockType::DeDuplicationTable`]
/// entry, and (for `DataBlock`) the kind of media tag a `MediaTag`-typed entry carries.
///
/// Structural kinds occupy the low discriminant range; `MediaTag` is a catch-all carrying the
/// caller's own tag code (`WriteMediaTag`'s `tag` argument), since the container format treats
/// media tags as an open-ended key space rather than a fixed enumeration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    UserData,
    CdSectorPrefix,
    CdSectorSuffix,
    CdSectorPrefixCorrected,
    CdSectorSuffixCorrected,
    CdSectorSubchannel,
    CdSectorSubheader,
    MediaTag(u32),
}

const DATA_TYPE_USER_DATA: u32 = 0;
const DATA_TYPE_CD_PREFIX: u32 = 1;
const DATA_TYPE_CD_SUFFIX: u32 = 2;
const DATA_TYPE_CD_PREFIX_CORRECTED: u32 = 3;
const DATA_TYPE_CD_SUFFIX_CORRECTED: u32 = 4;
const DATA_TYPE_CD_SUBCHANNEL: u32 = 5;
const DATA_TYPE_CD_SUBHEADER: u32 = 6;
/// Values at or above this threshold decode as `DataType::MediaTag(value - MEDIA_TAG_BASE)`.
const MEDIA_TAG_BASE: u32 = 1_000;

impl From<DataType> for u32 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::UserData => DATA_TYPE_USER_DATA,
            DataType::CdSectorPrefix => DATA_TYPE_CD_PREFIX,
            DataType::CdSectorSuffix => DATA_TYPE_CD_SUFFIX,
            DataType::CdSectorPrefixCorrected => DATA_TYPE_CD_PREFIX_CORRECTED,
            DataType::CdSectorSuffixCorrected => DATA_TYPE_CD_SUFFIX_CORRECTED,
            DataType::CdSectorSubchannel => DATA_TYPE_CD_SUBCHANNEL,
            DataType::CdSectorSubheader => DATA_TYPE_CD_SUBHEADER,
            DataType::MediaTag(code) => MEDIA_TAG_BASE + code,
        }
    }
}

impl TryFrom<u32> for DataType {
    type Error = AaruError;

    fn try_from(value: u32) -> Result<Self> {
        Ok(match value {
            DATA_TYPE_USER_DATA => DataType::UserData,
            DATA_TYPE_CD_PREFIX => DataType::CdSectorPrefix,
            DATA_TYPE_CD_SUFFIX => DataType::CdSectorSuffix,
            DATA_TYPE_CD_PREFIX_CORRECTED => DataType::CdSectorPrefixCorrected,
            DATA_TYPE_CD_SUFFIX_CORRECTED => DataType::CdSectorSuffixCorrected,
            DATA_TYPE_CD_SUBCHANNEL => DataType::CdSectorSubchannel,
            DATA_TYPE_CD_SUBHEADER => DataType::CdSectorSubheader,
            value if value >= MEDIA_TAG_BASE => DataType::MediaTag(value - MEDIA_TAG_BASE),
            other => return Err(AaruError::BinaryFormat(format!("unknown data type {other}"))),
        })
    }
}

/// The fixed-size, rewritten-at-close header at offset 0. Written with zeros on creation and
/// updated last, so a crash before `Close` leaves the file recoverable from the previous
/// `index_offset`.
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug)]
pub struct Header {
    pub identifier: u64,
    pub image_major_version: u8,
    pub image_minor_version: u8,
    pub application_major_version: u8,
    pub application_minor_version: u8,
    /// NUL-padded ASCII application identifier.
    pub application: [u8; 64],
    pub media_type: u32,
    pub creation_time: i64,
    pub last_written_time: i64,
    pub index_offset: u64,
}

impl Header {
    pub const SIZE: usize = 8 + 1 + 1 + 1 + 1 + 64 + 4 + 8 + 8 + 8;

    pub fn new(media_type: u32, application: &str, app_major: u8, app_minor: u8) -> Self {
        let mut app_bytes = [0u8; 64];
        let bytes = application.as_bytes();
        let copy_len = bytes.len().min(63);
        app_bytes[..copy_len].copy_from_slice(&bytes[..copy_len]);

        let now = crate::util::now_filetime();
        Self {
            identifier: AARUFMT_MAGIC,
            image_major_version: 2,
            image_minor_version: 0,
            application_major_version: app_major,
            application_minor_version: app_minor,
            application: app_bytes,
            media_type,
            creation_time: now,
            last_written_time: now,
            index_offset: 0,
        }
    }

    /// True if `identifier` matches either the current or legacy magic.
    pub fn is_valid_magic(&self) -> bool {
        self.identifier == AARUFMT_MAGIC || self.identifier == DICMFMT_MAGIC
    }

    /// True if this header was written by the predecessor format.
    pub fn is_legacy(&self) -> bool {
        self.identifier == DICMFMT_MAGIC
    }

    pub fn application_str(&self) -> String {
        let end = self.application.iter().position(|&b| b == 0).unwrap_or(64);
        String::from_utf8_lossy(&self.application[..end]).into_owned()
    }
}

/// The trailing table-of-contents header, immediately followed by `entries` [`IndexEntry`] records.
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug)]
pub struct IndexHeader {
    pub identifier: u32,
    pub entries: u32,
    pub crc64: u64,
}

/// One entry in the index: the kind of block, its data shape, and its absolute byte offset.
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug)]
pub struct IndexEntry {
    pub block_type: u32,
    pub data_type: u32,
    pub offset: u64,
}

impl IndexEntry {
    pub fn new(block_type: BlockType, data_type: DataType, offset: u64) -> Self {
        Self {
            block_type: block_type.into(),
            data_type: data_type.into(),
            offset,
        }
    }

    pub fn block_type(&self) -> Result<BlockType> {
        BlockType::try_from(self.block_type)
    }

    pub fn data_type(&self) -> Result<DataType> {
        DataType::try_from(self.data_type)
    }
}

/// The fixed header in front of a [`BlockType::DataBlock`]'s payload.
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug)]
pub struct DataBlockHeader {
    pub identifier: u32,
    pub data_type: u32,
    pub compression: u8,
    pub sector_size: u32,
    /// Uncompressed length in bytes.
    pub length: u64,
    /// Compressed length in bytes, including any codec property prefix.
    pub cmp_length: u64,
    /// CRC-64/ECMA of the uncompressed bytes.
    pub crc64: u64,
    /// CRC-64/ECMA of the compressed stream (including property prefix, for LZMA).
    pub cmp_crc64: u64,
}

impl DataBlockHeader {
    pub const SIZE: usize = 4 + 4 + 1 + 4 + 8 + 8 + 8 + 8;
}

/// The fixed header in front of a [`BlockType::DeDuplicationTable`]'s payload.
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug)]
pub struct DdtHeader {
    pub identifier: u32,
    pub data_type: u32,
    pub compression: u8,
    /// `log2(sectorsPerBlock)`; see [`crate::ddt`].
    pub shift: u8,
    pub entries: u64,
    pub length: u64,
    pub cmp_length: u64,
    pub crc64: u64,
    pub cmp_crc64: u64,
}

impl DdtHeader {
    pub const SIZE: usize = 4 + 4 + 1 + 1 + 8 + 8 + 8 + 8 + 8;
}

/// One CD track record inside a [`BlockType::TracksBlock`].
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug)]
pub struct TrackRecord {
    pub sequence: u32,
    pub track_type: u8,
    pub start: u64,
    pub end: u64,
    pub pregap: u64,
    pub session: u32,
    /// BCD-packed or zeroed ISRC digits; interpreted as ASCII by [`crate::tracks`].
    pub isrc: [u8; 12],
    pub flags: u8,
}

/// One C/H/S geometry record (the sole member of a [`BlockType::GeometryBlock`]).
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug)]
pub struct GeometryRecord {
    pub cylinders: u32,
    pub heads: u32,
    pub sectors_per_track: u32,
}

/// One record inside a [`BlockType::TapePartitionBlock`].
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug)]
pub struct TapePartitionRecord {
    pub number: u32,
    pub first_block: u64,
    pub last_block: u64,
}

/// One record inside a [`BlockType::TapeFileBlock`].
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug)]
pub struct TapeFileRecord {
    pub partition: u32,
    pub file_number: u32,
    pub first_block: u64,
    pub last_block: u64,
}

/// One whole-image digest entry inside a [`BlockType::ChecksumBlock`].
#[binrw]
#[brw(little)]
#[derive(Clone, Debug)]
pub struct ChecksumEntry {
    /// 0 = MD5, 1 = SHA-1, 2 = SHA-256, 3 = SpamSum (stored as UTF-8 bytes, not fixed-length).
    pub kind: u8,
    pub length: u32,
    #[br(count = length)]
    pub digest: Vec<u8>,
}

/// The fixed header of a [`BlockType::MetadataBlock`]: byte offset/length pairs into the trailing
/// UTF-16LE string pool, 0/0 meaning "absent."
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Debug, Default)]
pub struct MetadataBlockHeader {
    pub creator_offset: u32,
    pub creator_length: u32,
    pub comments_offset: u32,
    pub comments_length: u32,
    pub media_title_offset: u32,
    pub media_title_length: u32,
    pub media_manufacturer_offset: u32,
    pub media_manufacturer_length: u32,
    pub media_model_offset: u32,
    pub media_model_length: u32,
    pub media_serial_number_offset: u32,
    pub media_serial_number_length: u32,
    pub media_barcode_offset: u32,
    pub media_barcode_length: u32,
    pub drive_manufacturer_offset: u32,
    pub drive_manufacturer_length: u32,
    pub drive_model_offset: u32,
    pub drive_model_length: u32,
    pub drive_serial_number_offset: u32,
    pub drive_serial_number_length: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_type_round_trip() {
        for v in 0..10u32 {
            let bt = BlockType::try_from(v).unwrap();
            assert_eq!(u32::from(bt), v);
        }
        assert!(BlockType::try_from(999).is_err());
    }

    #[test]
    fn test_data_type_round_trip_structural() {
        for dt in [
            DataType::UserData,
            DataType::CdSectorPrefix,
            DataType::CdSectorSuffix,
            DataType::CdSectorPrefixCorrected,
            DataType::CdSectorSuffixCorrected,
            DataType::CdSectorSubchannel,
            DataType::CdSectorSubheader,
        ] {
            let raw: u32 = dt.into();
            assert_eq!(DataType::try_from(raw).unwrap(), dt);
        }
    }

    #[test]
    fn test_data_type_media_tag_round_trip() {
        let dt = DataType::MediaTag(42);
        let raw: u32 = dt.into();
        assert_eq!(DataType::try_from(raw).unwrap(), DataType::MediaTag(42));
    }

    #[test]
    fn test_header_application_round_trip() {
        let header = Header::new(0, "aaruformat", 1, 0);
        assert_eq!(header.application_str(), "aaruformat");
        assert!(header.is_valid_magic());
        assert!(!header.is_legacy());
    }

    #[test]
    fn test_header_size_matches_binrw_layout() {
        use binrw::BinWrite;
        let header = Header::new(0, "x", 0, 0);
        let mut buf = std::io::Cursor::new(Vec::new());
        header.write(&mut buf).unwrap();
        assert_eq!(buf.into_inner().len(), Header::SIZE);
    }
}
