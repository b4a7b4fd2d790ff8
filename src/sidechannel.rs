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

//! Everything that isn't user-data sectors: media tags, the CD subchannel stream, Mode 2
//! subheaders, dump-hardware provenance, and the free-form metadata string pool (C9, §4.9).
//!
//! Each of these is owned in memory by [`Writer`](crate::writer::Writer) while an image is open
//! and flushed to its own block kind at `Close`; [`Reader`](crate::reader::Reader) loads them back
//! lazily.

use std::collections::HashMap;

use crate::format::MetadataBlockHeader;
use crate::util::{decode_utf16le, encode_utf16le, pack_nul_terminated, read_nul_terminated};
use crate::Result;

/// A mapping from an open-ended tag kind (the caller's own code, matching
/// [`DataType::MediaTag`](crate::format::DataType::MediaTag)) to its raw bytes. `WriteMediaTag`
/// replaces any previous value silently (§4.7).
#[derive(Debug, Default, Clone)]
pub struct MediaTagStore {
    tags: HashMap<u32, Vec<u8>>,
}

impl MediaTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: u32, bytes: Vec<u8>) {
        self.tags.insert(kind, bytes);
    }

    pub fn get(&self, kind: u32) -> Option<&[u8]> {
        self.tags.get(&kind).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate tags in ascending kind order, so `Close` writes a deterministic block sequence.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u8])> {
        let mut kinds: Vec<_> = self.tags.keys().copied().collect();
        kinds.sort_unstable();
        kinds.into_iter().map(move |k| (k, self.tags[&k].as_slice()))
    }
}

/// The dense `sectors * 96`-byte Q-subchannel stream for an optical image. One 96-byte slice per
/// sector, indexed by sector address; a sector that was never written stays all-zero.
#[derive(Debug, Default, Clone)]
pub struct SubchannelStore {
    bytes: Vec<u8>,
}

const SUBCHANNEL_SECTOR_SIZE: usize = 96;

impl SubchannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, address: u32, data: &[u8; SUBCHANNEL_SECTOR_SIZE]) {
        let offset = address as usize * SUBCHANNEL_SECTOR_SIZE;
        let needed = offset + SUBCHANNEL_SECTOR_SIZE;
        if self.bytes.len() < needed {
            self.bytes.resize(needed, 0);
        }
        self.bytes[offset..needed].copy_from_slice(data);
    }

    pub fn get(&self, address: u32) -> [u8; SUBCHANNEL_SECTOR_SIZE] {
        let offset = address as usize * SUBCHANNEL_SECTOR_SIZE;
        let mut out = [0u8; SUBCHANNEL_SECTOR_SIZE];
        if offset + SUBCHANNEL_SECTOR_SIZE <= self.bytes.len() {
            out.copy_from_slice(&self.bytes[offset..offset + SUBCHANNEL_SECTOR_SIZE]);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

const SUBHEADER_RECORD_SIZE: usize = 8;

/// The dense `sectors * 8`-byte Mode 2 subheader stream, always populated for every Mode 2 sector
/// regardless of whether its suffix verified (§4.6: "always copied into a packed
/// `mode2Subheaders` stream at offset `sectorAddress*8`").
#[derive(Debug, Default, Clone)]
pub struct SubheaderStore {
    bytes: Vec<u8>,
}

impl SubheaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, address: u32, subheader: &[u8; SUBHEADER_RECORD_SIZE]) {
        let offset = address as usize * SUBHEADER_RECORD_SIZE;
        let needed = offset + SUBHEADER_RECORD_SIZE;
        if self.bytes.len() < needed {
            self.bytes.resize(needed, 0);
        }
        self.bytes[offset..needed].copy_from_slice(subheader);
    }

    pub fn get(&self, address: u32) -> [u8; SUBHEADER_RECORD_SIZE] {
        let offset = address as usize * SUBHEADER_RECORD_SIZE;
        let mut out = [0u8; SUBHEADER_RECORD_SIZE];
        if offset + SUBHEADER_RECORD_SIZE <= self.bytes.len() {
            out.copy_from_slice(&self.bytes[offset..offset + SUBHEADER_RECORD_SIZE]);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// A contiguous run of sector addresses a dump-hardware entry covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpHardwareExtent {
    pub start: u64,
    pub end: u64,
}

/// One dump-device/software descriptor. Field order is the literal order given in §3/§9: resolving
/// Open Question 1, this crate does not reproduce the suspected read/position off-by-one in the
/// original implementation's OS-tag handling — see `DESIGN.md`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpHardwareEntry {
    pub manufacturer: String,
    pub model: String,
    pub revision: String,
    pub firmware: String,
    pub serial: String,
    pub software_name: String,
    pub software_version: String,
    pub software_operating_system: String,
    pub extents: Vec<DumpHardwareExtent>,
}

impl DumpHardwareEntry {
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&pack_nul_terminated(&self.manufacturer));
        out.extend_from_slice(&pack_nul_terminated(&self.model));
        out.extend_from_slice(&pack_nul_terminated(&self.revision));
        out.extend_from_slice(&pack_nul_terminated(&self.firmware));
        out.extend_from_slice(&pack_nul_terminated(&self.serial));
        out.extend_from_slice(&pack_nul_terminated(&self.software_name));
        out.extend_from_slice(&pack_nul_terminated(&self.software_version));
        out.extend_from_slice(&pack_nul_terminated(&self.software_operating_system));
        out.extend_from_slice(&(self.extents.len() as u32).to_le_bytes());
        for extent in &self.extents {
            out.extend_from_slice(&extent.start.to_le_bytes());
            out.extend_from_slice(&extent.end.to_le_bytes());
        }
    }

    pub(crate) fn read_from(reader: &mut impl std::io::Read) -> Result<Self> {
        let manufacturer = read_nul_terminated(reader)?;
        let model = read_nul_terminated(reader)?;
        let revision = read_nul_terminated(reader)?;
        let firmware = read_nul_terminated(reader)?;
        let serial = read_nul_terminated(reader)?;
        let software_name = read_nul_terminated(reader)?;
        let software_version = read_nul_terminated(reader)?;
        let software_operating_system = read_nul_terminated(reader)?;
        let mut count_buf = [0u8; 4];
        reader.read_exact(&mut count_buf)?;
        let count = u32::from_le_bytes(count_buf) as usize;
        let mut extents = Vec::with_capacity(count);
        for _ in 0..count {
            let mut start_buf = [0u8; 8];
            let mut end_buf = [0u8; 8];
            reader.read_exact(&mut start_buf)?;
            reader.read_exact(&mut end_buf)?;
            extents.push(DumpHardwareExtent { start: u64::from_le_bytes(start_buf), end: u64::from_le_bytes(end_buf) });
        }
        Ok(Self {
            manufacturer,
            model,
            revision,
            firmware,
            serial,
            software_name,
            software_version,
            software_operating_system,
            extents,
        })
    }
}

/// The variable-length list of [`DumpHardwareEntry`] values carried by a `DumpHardwareBlock`.
#[derive(Debug, Clone, Default)]
pub struct DumpHardwareList {
    pub entries: Vec<DumpHardwareEntry>,
}

impl DumpHardwareList {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for entry in &self.entries {
            entry.write_to(&mut out);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = std::io::Cursor::new(bytes);
        Self::read_from(&mut cursor)
    }

    /// Read directly from a stream, consuming exactly its own bytes and no more — used when
    /// rebuilding a [`DumpHardwareBlock`](crate::format::BlockType::DumpHardwareBlock) whose total
    /// byte length isn't recorded anywhere (§4.9: the list is self-delimiting, not length-prefixed
    /// at the block level).
    pub(crate) fn read_from(reader: &mut impl std::io::Read) -> Result<Self> {
        let mut count_buf = [0u8; 4];
        reader.read_exact(&mut count_buf)?;
        let count = u32::from_le_bytes(count_buf) as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(DumpHardwareEntry::read_from(reader)?);
        }
        Ok(Self { entries })
    }
}

/// A dense `sectors * record_size`-byte stream for the verbatim Apple Profile/Sony/Priam tag
/// region `WriteSectorLong` stores for non-CD long-sector media. Resolving Open Question 2: this
/// crate does not implement the source's Apple tag conversion table, so the tag bytes are copied
/// byte-for-byte rather than reinterpreted — see `DESIGN.md`. `record_size` (12, 20, or 24) is
/// fixed by the length of the first sector written.
#[derive(Debug, Default, Clone)]
pub struct TailTagStore {
    record_size: usize,
    bytes: Vec<u8>,
}

impl TailTagStore {
    pub fn new(record_size: usize) -> Self {
        Self { record_size, bytes: Vec::new() }
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn set(&mut self, address: u32, tag: &[u8]) {
        let offset = address as usize * self.record_size;
        let needed = offset + self.record_size;
        if self.bytes.len() < needed {
            self.bytes.resize(needed, 0);
        }
        self.bytes[offset..needed].copy_from_slice(tag);
    }

    pub fn get(&self, address: u32) -> Vec<u8> {
        let offset = address as usize * self.record_size;
        let mut out = vec![0u8; self.record_size];
        if offset + self.record_size <= self.bytes.len() {
            out.copy_from_slice(&self.bytes[offset..offset + self.record_size]);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn from_bytes(bytes: Vec<u8>, record_size: usize) -> Self {
        Self { record_size, bytes }
    }
}

/// The ten free-form provenance strings of a `MetadataBlock`, packed into a UTF-16LE pool
/// referenced by the fixed [`MetadataBlockHeader`] offset/length pairs (§4.9).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub creator: Option<String>,
    pub comments: Option<String>,
    pub media_title: Option<String>,
    pub media_manufacturer: Option<String>,
    pub media_model: Option<String>,
    pub media_serial_number: Option<String>,
    pub media_barcode: Option<String>,
    pub drive_manufacturer: Option<String>,
    pub drive_model: Option<String>,
    pub drive_serial_number: Option<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        [
            &self.creator,
            &self.comments,
            &self.media_title,
            &self.media_manufacturer,
            &self.media_model,
            &self.media_serial_number,
            &self.media_barcode,
            &self.drive_manufacturer,
            &self.drive_model,
            &self.drive_serial_number,
        ]
        .iter()
        .all(|field| field.is_none())
    }

    /// Pack into a `(header, pool)` pair ready to be written as a `MetadataBlock`'s header record
    /// followed by its UTF-16LE string pool.
    pub fn to_block(&self) -> (MetadataBlockHeader, Vec<u8>) {
        let mut pool = Vec::new();
        let mut push = |field: &Option<String>| -> (u32, u32) {
            match field {
                Some(s) => {
                    let offset = pool.len() as u32;
                    let encoded = encode_utf16le(s);
                    let length = encoded.len() as u32;
                    pool.extend_from_slice(&encoded);
                    (offset, length)
                }
                None => (0, 0),
            }
        };

        let (creator_offset, creator_length) = push(&self.creator);
        let (comments_offset, comments_length) = push(&self.comments);
        let (media_title_offset, media_title_length) = push(&self.media_title);
        let (media_manufacturer_offset, media_manufacturer_length) = push(&self.media_manufacturer);
        let (media_model_offset, media_model_length) = push(&self.media_model);
        let (media_serial_number_offset, media_serial_number_length) = push(&self.media_serial_number);
        let (media_barcode_offset, media_barcode_length) = push(&self.media_barcode);
        let (drive_manufacturer_offset, drive_manufacturer_length) = push(&self.drive_manufacturer);
        let (drive_model_offset, drive_model_length) = push(&self.drive_model);
        let (drive_serial_number_offset, drive_serial_number_length) = push(&self.drive_serial_number);

        let header = MetadataBlockHeader {
            creator_offset,
            creator_length,
            comments_offset,
            comments_length,
            media_title_offset,
            media_title_length,
            media_manufacturer_offset,
            media_manufacturer_length,
            media_model_offset,
            media_model_length,
            media_serial_number_offset,
            media_serial_number_length,
            media_barcode_offset,
            media_barcode_length,
            drive_manufacturer_offset,
            drive_manufacturer_length,
            drive_model_offset,
            drive_model_length,
            drive_serial_number_offset,
            drive_serial_number_length,
        };
        (header, pool)
    }

    pub fn from_block(header: &MetadataBlockHeader, pool: &[u8]) -> Self {
        let field = |offset: u32, length: u32| -> Option<String> {
            if length == 0 {
                return None;
            }
            let start = offset as usize;
            let end = start + length as usize;
            pool.get(start..end).map(decode_utf16le)
        };

        Self {
            creator: field(header.creator_offset, header.creator_length),
            comments: field(header.comments_offset, header.comments_length),
            media_title: field(header.media_title_offset, header.media_title_length),
            media_manufacturer: field(header.media_manufacturer_offset, header.media_manufacturer_length),
            media_model: field(header.media_model_offset, header.media_model_length),
            media_serial_number: field(header.media_serial_number_offset, header.media_serial_number_length),
            media_barcode: field(header.media_barcode_offset, header.media_barcode_length),
            drive_manufacturer: field(header.drive_manufacturer_offset, header.drive_manufacturer_length),
            drive_model: field(header.drive_model_offset, header.drive_model_length),
            drive_serial_number: field(header.drive_serial_number_offset, header.drive_serial_number_length),
        }
    }
}
