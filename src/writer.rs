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

//! The container writer (C7): builds a new AARUFMT image, or reopens a closed one to append more
//! sectors, driving the block packer, the deduplication store, the CD long-sector splitter and the
//! side-channel stores into one file (§4.7).
//!
//! [`Writer`] is generic over any backend that is [`Read`] + [`Write`] + [`Seek`], so the same code
//! path exercises both a real [`std::fs::File`] and an in-memory [`std::io::Cursor`] in tests.

use std::io::{Read, Seek, SeekFrom, Write};

use binrw::{BinRead, BinWrite};
use log::{info, warn};

use crate::{
    cdrom::splitter::{split_sector, PrefixStatus, SplitSector, SuffixStatus},
    cdrom::{CD_PREFIX_SIZE, CD_SUBHEADER_SIZE, CD_SUFFIX_SIZE},
    codec::{self, digest::DigestResults, digest::RunningDigests, Compression},
    ddt::{CdFix, CdFixDdt, Ddt, SparseDdt},
    dedup::{DedupOutcome, DedupStore},
    format::{
        BlockType, DataBlockHeader, DataType, DdtHeader, GeometryRecord, Header, IndexEntry, IndexHeader,
        MetadataBlockHeader, TapeFileRecord, TapePartitionRecord, TrackRecord, DATA_BLOCK_IDENTIFIER, DDT_IDENTIFIER,
        INDEX_IDENTIFIER,
    },
    geometry::Geometry,
    media_type::MediaType,
    packer::{BlockPacker, TrackKind, LZMA_PROPERTIES_LENGTH},
    sidechannel::{DumpHardwareList, MediaTagStore, Metadata, SubchannelStore, SubheaderStore, TailTagStore},
    tape::{TapeFile, TapePartition},
    tracks::{CdTrackFlags, Track, TrackList, TrackType},
    util::now_filetime,
    AaruError, Result, CD_RAW_SECTOR_SIZE, CD_SUBCHANNEL_SIZE,
};

/// Reserved [`DataType::MediaTag`] code used to persist the Apple/Priam-style trailing tag region a
/// non-CD `write_sector_long` call stores, since the container format has no dedicated block kind
/// for it. See `DESIGN.md`.
const TAIL_TAG_MEDIA_TAG_KIND: u32 = 0xFFFF_FFF0;

/// The fixed byte width of a serialized [`MetadataBlockHeader`] (20 little-endian `u32` fields).
const METADATA_HEADER_SIZE: usize = 80;

/// Parameters controlling how [`Writer::create`] lays out and maintains a new image.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Sectors per data block; must be a power of two. `log2` of this value is the DDT entry shift.
    pub sectors_per_block: u32,
    /// LZMA dictionary size hint, in bytes.
    pub dictionary: u32,
    /// Above this many mebibytes the deduplication table would occupy, the table should spill to
    /// disk rather than stay resident (§4.5). See `DESIGN.md` for how this crate approximates that.
    pub max_ddt_size_mib: u32,
    pub md5: bool,
    pub sha1: bool,
    pub sha256: bool,
    pub spamsum: bool,
    pub deduplicate: bool,
    pub compress: bool,
    pub application: String,
    pub application_major: u8,
    pub application_minor: u8,
}

impl Default for CreateOptions {
    fn default() -> Self {
        let (major, minor) = parse_version(env!("CARGO_PKG_VERSION"));
        Self {
            sectors_per_block: 4096,
            dictionary: 1 << 25,
            max_ddt_size_mib: 256,
            md5: false,
            sha1: false,
            sha256: false,
            spamsum: false,
            deduplicate: true,
            compress: true,
            application: env!("CARGO_PKG_NAME").to_string(),
            application_major: major,
            application_minor: minor,
        }
    }
}

fn parse_version(version: &str) -> (u8, u8) {
    let mut parts = version.split('.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Writing,
    Closed,
}

/// A container being built (or appended to). See the module docs and §4.7 for the lifecycle.
pub struct Writer<F> {
    file: F,
    state: WriterState,
    media_type: MediaType,
    sector_size: u32,
    sectors: u64,
    shift: u8,
    options: CreateOptions,
    header: Header,

    digests_enabled: bool,
    digests: RunningDigests,
    highest_written_address: Option<u64>,
    dedup: DedupStore,

    ddt: Option<Ddt>,
    sparse_ddt: Option<SparseDdt>,

    packer: Option<BlockPacker>,
    current_position: u64,
    index_entries: Vec<IndexEntry>,

    media_tags: MediaTagStore,
    tracks: Option<TrackList>,
    geometry: Option<Geometry>,
    metadata: Metadata,
    dump_hardware: DumpHardwareList,
    tape_partitions: Vec<TapePartition>,
    tape_files: Vec<TapeFile>,
    cicm_xml: Option<String>,

    cd_prefix_ddt: Option<CdFixDdt>,
    cd_suffix_ddt: Option<CdFixDdt>,
    cd_prefix_aux: Vec<u8>,
    cd_suffix_aux: Vec<u8>,
    subchannel: SubchannelStore,
    subheaders: SubheaderStore,
    tail_tags: Option<TailTagStore>,

    sectors_written: u64,
    sectors_deduped: u64,
}

impl<F: Read + Write + Seek> Writer<F> {
    /// Begin a new image of `sectors` sectors of `sector_size` bytes each.
    pub fn create(mut file: F, media_type: MediaType, sectors: u64, sector_size: u32, options: CreateOptions) -> Result<Self> {
        if !options.sectors_per_block.is_power_of_two() {
            return Err(AaruError::ParameterError("sectors_per_block must be a power of two".into()));
        }
        let shift = options.sectors_per_block.trailing_zeros() as u8;

        let header = Header::new(media_type as u32, &options.application, options.application_major, options.application_minor);
        file.seek(SeekFrom::Start(0))?;
        header.write(&mut file)?;
        let current_position = Header::SIZE as u64;

        let (ddt, sparse_ddt) = if media_type.is_tape() {
            (None, Some(SparseDdt::new()))
        } else {
            (Some(Ddt::new(sectors as usize, shift)), None)
        };

        let digests = RunningDigests::new(options.md5, options.sha1, options.sha256, options.spamsum);

        Ok(Self {
            file,
            state: WriterState::Writing,
            media_type,
            sector_size,
            sectors,
            shift,
            digests_enabled: true,
            digests,
            highest_written_address: None,
            options,
            header,
            dedup: DedupStore::new(),
            ddt,
            sparse_ddt,
            packer: None,
            current_position,
            index_entries: Vec::new(),
            media_tags: MediaTagStore::new(),
            tracks: None,
            geometry: None,
            metadata: Metadata::default(),
            dump_hardware: DumpHardwareList::default(),
            tape_partitions: Vec::new(),
            tape_files: Vec::new(),
            cicm_xml: None,
            cd_prefix_ddt: None,
            cd_suffix_ddt: None,
            cd_prefix_aux: Vec::new(),
            cd_suffix_aux: Vec::new(),
            subchannel: SubchannelStore::new(),
            subheaders: SubheaderStore::new(),
            tail_tags: None,
            sectors_written: 0,
            sectors_deduped: 0,
        })
    }

    /// Reopen a previously closed image for append (§4.7). Running digests are disabled for the
    /// remainder of this session regardless of `options`.
    pub fn append(mut file: F, media_type: MediaType, options: CreateOptions) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        let header = Header::read(&mut file)?;
        if !header.is_valid_magic() {
            return Err(AaruError::IncompatibleAppend("bad magic number".into()));
        }
        if header.media_type != media_type as u32 {
            return Err(AaruError::IncompatibleAppend("media type does not match the reopened image".into()));
        }
        if header.image_major_version > crate::CURRENT_VERSION {
            return Err(AaruError::IncompatibleAppend("image was written by a newer format version".into()));
        }
        if header.index_offset == 0 {
            return Err(AaruError::MissingDdtOnAppend);
        }

        warn!("append disables whole-image running digests for the remainder of this session");

        let mut writer = Self {
            file,
            state: WriterState::Writing,
            media_type,
            sector_size: media_type.default_sector_size(),
            sectors: 0,
            shift: options.sectors_per_block.trailing_zeros() as u8,
            digests_enabled: false,
            digests: RunningDigests::default(),
            highest_written_address: None,
            options,
            header,
            dedup: DedupStore::new(),
            ddt: None,
            sparse_ddt: None,
            packer: None,
            current_position: Header::SIZE as u64,
            index_entries: Vec::new(),
            media_tags: MediaTagStore::new(),
            tracks: None,
            geometry: None,
            metadata: Metadata::default(),
            dump_hardware: DumpHardwareList::default(),
            tape_partitions: Vec::new(),
            tape_files: Vec::new(),
            cicm_xml: None,
            cd_prefix_ddt: None,
            cd_suffix_ddt: None,
            cd_prefix_aux: Vec::new(),
            cd_suffix_aux: Vec::new(),
            subchannel: SubchannelStore::new(),
            subheaders: SubheaderStore::new(),
            tail_tags: None,
            sectors_written: 0,
            sectors_deduped: 0,
        };

        writer.file.seek(SeekFrom::Start(header.index_offset))?;
        let index_header = IndexHeader::read(&mut writer.file)?;
        let mut entries = Vec::with_capacity(index_header.entries as usize);
        for _ in 0..index_header.entries {
            entries.push(IndexEntry::read(&mut writer.file)?);
        }

        let mut sorted = entries.clone();
        sorted.sort_by_key(|e| e.offset);
        let spans: Vec<(u64, u64)> = sorted
            .iter()
            .enumerate()
            .map(|(i, e)| (e.offset, sorted.get(i + 1).map(|n| n.offset).unwrap_or(header.index_offset)))
            .collect();

        let mut cd_prefix_seen = false;
        let mut cd_suffix_seen = false;

        for (entry, (start, end)) in sorted.iter().zip(spans.iter()) {
            let Ok(block_type) = entry.block_type()
            else {
                continue;
            };
            let mut span = vec![0u8; (*end - *start) as usize];
            writer.file.seek(SeekFrom::Start(*start))?;
            writer.file.read_exact(&mut span)?;

            match block_type {
                BlockType::DeDuplicationTable => match decode_ddt_block(&span) {
                    Ok(ddt) => {
                        writer.sectors = ddt.len() as u64;
                        writer.ddt = Some(ddt);
                    }
                    Err(e) => warn!("skipping corrupt deduplication table at offset {start}: {e}"),
                },
                BlockType::DataBlock => {
                    let Ok(data_type) = entry.data_type()
                    else {
                        continue;
                    };
                    match data_type {
                        DataType::UserData => {
                            // Already indexed by the rebuilt DDT above; left on disk untouched.
                        }
                        DataType::CdSectorPrefix => match decode_data_block(&span) {
                            Ok(bytes) => {
                                writer.cd_prefix_aux = bytes;
                                cd_prefix_seen = true;
                            }
                            Err(e) => warn!("skipping corrupt CD prefix stream at offset {start}: {e}"),
                        },
                        DataType::CdSectorSuffix => match decode_data_block(&span) {
                            Ok(bytes) => {
                                writer.cd_suffix_aux = bytes;
                                cd_suffix_seen = true;
                            }
                            Err(e) => warn!("skipping corrupt CD suffix stream at offset {start}: {e}"),
                        },
                        DataType::CdSectorPrefixCorrected => match decode_data_block(&span).and_then(|b| CdFixDdt::from_bytes(&b)) {
                            Ok(ddt) => writer.cd_prefix_ddt = Some(ddt),
                            Err(e) => warn!("skipping corrupt CD prefix fix table at offset {start}: {e}"),
                        },
                        DataType::CdSectorSuffixCorrected => match decode_data_block(&span).and_then(|b| CdFixDdt::from_bytes(&b)) {
                            Ok(ddt) => writer.cd_suffix_ddt = Some(ddt),
                            Err(e) => warn!("skipping corrupt CD suffix fix table at offset {start}: {e}"),
                        },
                        DataType::CdSectorSubheader => match decode_data_block(&span) {
                            Ok(bytes) => writer.subheaders = SubheaderStore::from_bytes(bytes),
                            Err(e) => warn!("skipping corrupt subheader stream at offset {start}: {e}"),
                        },
                        DataType::CdSectorSubchannel => match decode_data_block(&span) {
                            Ok(bytes) => writer.subchannel = SubchannelStore::from_bytes(bytes),
                            Err(e) => warn!("skipping corrupt subchannel stream at offset {start}: {e}"),
                        },
                        DataType::MediaTag(kind) if kind == TAIL_TAG_MEDIA_TAG_KIND => {
                            if let Some(h) = decode_data_block_header(&span) {
                                match decode_data_block(&span) {
                                    Ok(bytes) => writer.tail_tags = Some(TailTagStore::from_bytes(bytes, h.sector_size as usize)),
                                    Err(e) => warn!("skipping corrupt tail tag stream at offset {start}: {e}"),
                                }
                            }
                        }
                        DataType::MediaTag(kind) => match decode_data_block(&span) {
                            Ok(bytes) => writer.media_tags.set(kind, bytes),
                            Err(e) => warn!("skipping corrupt media tag {kind} at offset {start}: {e}"),
                        },
                    }
                }
                BlockType::GeometryBlock => {
                    if let Ok(record) = GeometryRecord::read(&mut std::io::Cursor::new(&span)) {
                        writer.geometry = Some(record.into());
                    }
                }
                BlockType::TracksBlock => {
                    if let Ok(tracks) = decode_track_list(&span) {
                        writer.tracks = Some(TrackList::new(tracks));
                    }
                }
                BlockType::TapePartitionBlock => {
                    if let Ok(partitions) = decode_tape_partitions(&span) {
                        writer.tape_partitions = partitions;
                    }
                }
                BlockType::TapeFileBlock => {
                    if let Ok(files) = decode_tape_files(&span) {
                        writer.tape_files = files;
                    }
                }
                BlockType::DumpHardwareBlock => {
                    if let Ok(list) = DumpHardwareList::from_bytes(&span) {
                        writer.dump_hardware = list;
                    }
                }
                BlockType::CicmBlock => {
                    writer.cicm_xml = Some(String::from_utf8_lossy(&span).into_owned());
                }
                BlockType::MetadataBlock => {
                    if span.len() >= METADATA_HEADER_SIZE {
                        if let Ok(mh) = MetadataBlockHeader::read(&mut std::io::Cursor::new(&span)) {
                            writer.metadata = Metadata::from_block(&mh, &span[METADATA_HEADER_SIZE..]);
                        }
                    }
                }
                BlockType::ChecksumBlock => {
                    // Invalidated on append (§4.7): not carried forward.
                }
            }
        }

        if cd_prefix_seen != cd_suffix_seen
            || cd_prefix_seen != writer.cd_prefix_ddt.is_some()
            || cd_suffix_seen != writer.cd_suffix_ddt.is_some()
        {
            warn!("CD prefix/suffix side streams were only partially present on reopen; resetting to a consistent empty state");
            writer.cd_prefix_ddt = None;
            writer.cd_suffix_ddt = None;
            writer.cd_prefix_aux.clear();
            writer.cd_suffix_aux.clear();
            writer.subheaders = SubheaderStore::new();
            writer.subchannel = SubchannelStore::new();
        }

        if writer.ddt.is_none() {
            return Err(AaruError::MissingDdtOnAppend);
        }

        // Resume writing where the old index stood; everything from here on overwrites it, and a
        // fresh index covering the whole (old + new) block set is written at the next `close`.
        writer.current_position = header.index_offset;
        writer.index_entries = entries
            .into_iter()
            .filter(|e| matches!(e.block_type(), Ok(BlockType::DataBlock)) && matches!(e.data_type(), Ok(DataType::UserData)))
            .collect();

        Ok(writer)
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    pub fn sectors(&self) -> u64 {
        self.sectors
    }

    fn compression_for(&self, track_kind: TrackKind) -> Compression {
        if !self.options.compress {
            return Compression::None;
        }
        if track_kind == TrackKind::Audio && self.media_type.is_optical() && !self.media_type.is_special_cd_family() {
            Compression::Flac
        }
        else {
            Compression::Lzma
        }
    }

    fn set_ddt_entry(&mut self, address: u64, entry: u64) {
        if let Some(ddt) = self.ddt.as_mut() {
            ddt.set(address as usize, entry);
        }
        else if let Some(sparse) = self.sparse_ddt.as_mut() {
            sparse.set(address, entry);
        }
    }

    fn append_raw_sector(&mut self, data: &[u8], sector_size: u32, track_kind: TrackKind) -> Result<u64> {
        if let Some(packer) = &self.packer {
            if packer.would_force_flush(sector_size, track_kind) {
                self.flush_packer()?;
            }
        }
        if self.packer.is_none() {
            let compression = self.compression_for(track_kind);
            self.packer = Some(BlockPacker::open(
                DataType::UserData,
                sector_size,
                self.shift,
                compression,
                track_kind,
                self.current_position,
            ));
        }
        let packer = self.packer.as_mut().unwrap();
        let entry = packer.next_entry();
        packer.append(data)?;
        Ok(entry)
    }

    fn flush_packer(&mut self) -> Result<()> {
        let packer = match self.packer.take() {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(()),
        };
        let flushed = packer.flush()?;
        let offset = flushed.file_offset;
        self.file.seek(SeekFrom::Start(offset))?;
        flushed.header.write(&mut self.file)?;
        if let Some(props) = flushed.properties {
            self.file.write_all(&props)?;
        }
        self.file.write_all(&flushed.payload)?;
        self.current_position = offset + DataBlockHeader::SIZE as u64 + flushed.header.cmp_length;
        self.index_entries.push(IndexEntry::new(BlockType::DataBlock, DataType::UserData, offset));
        Ok(())
    }

    fn store_sector(&mut self, address: u64, data: &[u8], sector_size: u32, track_kind: TrackKind) -> Result<()> {
        if self.state != WriterState::Writing {
            return Err(AaruError::NotWriting);
        }
        if self.digests_enabled {
            let rewound = matches!(self.highest_written_address, Some(highest) if address <= highest);
            if rewound {
                warn!("sector rewind to address {address} disables whole-image running digests for the remainder of this session");
                self.digests_enabled = false;
                self.digests = RunningDigests::default();
            }
            else {
                self.digests.update(data);
            }
        }
        self.highest_written_address = Some(match self.highest_written_address {
            Some(highest) => highest.max(address),
            None => address,
        });
        self.sectors_written += 1;
        match self.dedup.lookup(data, self.options.deduplicate) {
            Some(DedupOutcome::Hit(entry)) => {
                self.sectors_deduped += 1;
                self.set_ddt_entry(address, entry);
            }
            Some(DedupOutcome::Miss) => {
                let entry = self.append_raw_sector(data, sector_size, track_kind)?;
                self.dedup.insert(data, entry);
                self.set_ddt_entry(address, entry);
            }
            None => {
                let entry = self.append_raw_sector(data, sector_size, track_kind)?;
                self.set_ddt_entry(address, entry);
            }
        }
        Ok(())
    }

    /// Write one sector of the image's declared sector size.
    pub fn write_sector(&mut self, address: u64, data: &[u8]) -> Result<()> {
        if data.len() != self.sector_size as usize {
            return Err(AaruError::WrongSize { expected: self.sector_size as usize, actual: data.len() });
        }
        if address >= self.sectors {
            return Err(AaruError::OutOfRange);
        }
        self.store_sector(address, data, self.sector_size, TrackKind::Other)
    }

    /// Write `data.len() / sector_size` consecutive sectors starting at `address`.
    pub fn write_sectors(&mut self, address: u64, data: &[u8]) -> Result<()> {
        let size = self.sector_size as usize;
        if size == 0 || data.len() % size != 0 {
            return Err(AaruError::WrongSize { expected: size, actual: data.len() });
        }
        let count = data.len() / size;
        for i in 0..count {
            self.write_sector(address + i as u64, &data[i * size..(i + 1) * size])?;
        }
        Ok(())
    }

    /// Write one raw long sector: a full 2352-byte CD-ROM frame for optical media dispatched
    /// through the track table and the long-sector splitter (§4.6), or — for any other long-sector
    /// medium — the declared sector size followed by a fixed-width trailing tag region (§4.7).
    pub fn write_sector_long(&mut self, address: u64, data: &[u8]) -> Result<()> {
        if self.state != WriterState::Writing {
            return Err(AaruError::NotWriting);
        }

        if self.media_type.is_cd_family() {
            if data.len() != CD_RAW_SECTOR_SIZE {
                return Err(AaruError::WrongSize { expected: CD_RAW_SECTOR_SIZE, actual: data.len() });
            }
            let tracks = self.tracks.as_ref().ok_or(AaruError::TrackNotFound)?;
            let track_type = tracks.track_for_address(address)?.track_type;

            match split_sector(track_type, address as u32, data) {
                SplitSector::Passthrough(bytes) => {
                    let track_kind = if track_type == TrackType::Audio { TrackKind::Audio } else { TrackKind::Other };
                    self.store_sector(address, &bytes, CD_RAW_SECTOR_SIZE as u32, track_kind)?;
                }
                SplitSector::Cd { user_data, prefix, suffix, subheader } => {
                    let sector_size = user_data.len() as u32;
                    self.store_sector(address, &user_data, sector_size, TrackKind::Other)?;

                    if self.cd_prefix_ddt.is_none() {
                        self.cd_prefix_ddt = Some(CdFixDdt::new(self.sectors as usize));
                    }
                    let prefix_ddt = self.cd_prefix_ddt.as_mut().unwrap();
                    match prefix {
                        PrefixStatus::NotDumped => prefix_ddt.set_flag(address as usize, CdFix::NotDumped),
                        PrefixStatus::Correct => prefix_ddt.set_flag(address as usize, CdFix::Correct),
                        PrefixStatus::Incorrect(bytes) => {
                            prefix_ddt.set_record(address as usize, &bytes, &mut self.cd_prefix_aux, CD_PREFIX_SIZE)
                        }
                    }

                    if self.cd_suffix_ddt.is_none() {
                        self.cd_suffix_ddt = Some(CdFixDdt::new(self.sectors as usize));
                    }
                    let suffix_ddt = self.cd_suffix_ddt.as_mut().unwrap();
                    match suffix {
                        SuffixStatus::NotDumped => suffix_ddt.set_flag(address as usize, CdFix::NotDumped),
                        SuffixStatus::Correct => suffix_ddt.set_flag(address as usize, CdFix::Correct),
                        SuffixStatus::Mode2Form1Ok => suffix_ddt.set_flag(address as usize, CdFix::Mode2Form1Ok),
                        SuffixStatus::Mode2Form2Ok => suffix_ddt.set_flag(address as usize, CdFix::Mode2Form2Ok),
                        SuffixStatus::Mode2Form2NoCrc => suffix_ddt.set_flag(address as usize, CdFix::Mode2Form2NoCrc),
                        SuffixStatus::Incorrect(bytes) => {
                            suffix_ddt.set_record(address as usize, &bytes, &mut self.cd_suffix_aux, CD_SUFFIX_SIZE)
                        }
                    }

                    if let Some(sh) = subheader {
                        self.subheaders.set(address as u32, &sh);
                    }
                }
            }
            return Ok(());
        }

        if data.len() <= self.sector_size as usize {
            return Err(AaruError::WrongSize { expected: self.sector_size as usize + 1, actual: data.len() });
        }
        let (user_data, tail) = data.split_at(self.sector_size as usize);
        self.store_sector(address, user_data, self.sector_size, TrackKind::Other)?;
        if self.tail_tags.is_none() {
            self.tail_tags = Some(TailTagStore::new(tail.len()));
        }
        self.tail_tags.as_mut().unwrap().set(address as u32, tail);
        Ok(())
    }

    /// Attach (or replace) an open-ended media tag (§4.7).
    pub fn write_media_tag(&mut self, kind: u32, data: Vec<u8>) -> Result<()> {
        if self.state != WriterState::Writing {
            return Err(AaruError::NotWriting);
        }
        self.media_tags.set(kind, data);
        Ok(())
    }

    /// `WriteSectorTag(CdTrackFlags)`: set a track's flag byte.
    pub fn write_sector_tag_track_flags(&mut self, sequence: u32, flags: CdTrackFlags) -> Result<()> {
        if self.state != WriterState::Writing {
            return Err(AaruError::NotWriting);
        }
        let tracks = self.tracks.as_mut().ok_or(AaruError::TrackNotFound)?;
        let track = tracks.tracks_mut().iter_mut().find(|t| t.sequence == sequence).ok_or(AaruError::TrackNotFound)?;
        track.flags = flags;
        Ok(())
    }

    /// `WriteSectorTag(CdTrackIsrc)`: set a track's ISRC string.
    pub fn write_sector_tag_track_isrc(&mut self, sequence: u32, isrc: String) -> Result<()> {
        if self.state != WriterState::Writing {
            return Err(AaruError::NotWriting);
        }
        let tracks = self.tracks.as_mut().ok_or(AaruError::TrackNotFound)?;
        let track = tracks.tracks_mut().iter_mut().find(|t| t.sequence == sequence).ok_or(AaruError::TrackNotFound)?;
        track.isrc = Some(isrc);
        Ok(())
    }

    /// `WriteSectorTag(CdSectorSubchannel)`: set one sector's 96-byte Q-subchannel slice.
    pub fn write_sector_tag_subchannel(&mut self, address: u64, data: &[u8; CD_SUBCHANNEL_SIZE]) -> Result<()> {
        if self.state != WriterState::Writing {
            return Err(AaruError::NotWriting);
        }
        self.subchannel.set(address as u32, data);
        Ok(())
    }

    pub fn set_tracks(&mut self, tracks: Vec<Track>) -> Result<()> {
        if !self.media_type.is_optical() {
            return Err(AaruError::UnsupportedMedia);
        }
        let list = TrackList::new(tracks);
        list.validate_coverage(self.sectors)?;
        self.tracks = Some(list);
        Ok(())
    }

    pub fn set_geometry(&mut self, geometry: Geometry) -> Result<()> {
        if self.media_type.is_tape() {
            return Err(AaruError::UnsupportedMedia);
        }
        self.geometry = Some(geometry);
        Ok(())
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = metadata;
    }

    pub fn set_dump_hardware(&mut self, list: DumpHardwareList) {
        self.dump_hardware = list;
    }

    pub fn set_cicm_metadata(&mut self, xml: String) {
        self.cicm_xml = Some(xml);
    }

    pub fn set_tape_partitions(&mut self, partitions: Vec<TapePartition>) -> Result<()> {
        if !self.media_type.is_tape() {
            return Err(AaruError::UnsupportedMedia);
        }
        self.tape_partitions = partitions;
        Ok(())
    }

    pub fn set_tape_files(&mut self, files: Vec<TapeFile>) -> Result<()> {
        if !self.media_type.is_tape() {
            return Err(AaruError::UnsupportedMedia);
        }
        self.tape_files = files;
        Ok(())
    }

    fn write_block_raw(&mut self, bytes: &[u8], block_type: BlockType, data_type: DataType) -> Result<()> {
        let offset = self.current_position;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        self.current_position = offset + bytes.len() as u64;
        self.index_entries.push(IndexEntry::new(block_type, data_type, offset));
        Ok(())
    }

    fn write_data_block(&mut self, data_type: DataType, sector_size: u32, payload: &[u8]) -> Result<()> {
        let crc64 = codec::crc64::checksum(payload);
        let (compression, properties, body, cmp_crc64) = if !self.options.compress {
            (Compression::None, None, payload.to_vec(), crc64)
        }
        else {
            let compressed = codec::compress(Compression::Lzma, payload, sector_size)?;
            if compressed.len() >= payload.len() {
                (Compression::None, None, payload.to_vec(), crc64)
            }
            else {
                let mut props = [0u8; LZMA_PROPERTIES_LENGTH];
                props.copy_from_slice(&compressed[..LZMA_PROPERTIES_LENGTH]);
                let body = compressed[LZMA_PROPERTIES_LENGTH..].to_vec();
                let cmp_crc = codec::crc64::checksum(&compressed);
                (Compression::Lzma, Some(props), body, cmp_crc)
            }
        };
        let cmp_length = properties.map(|p: [u8; LZMA_PROPERTIES_LENGTH]| p.len()).unwrap_or(0) as u64 + body.len() as u64;
        let header = DataBlockHeader {
            identifier: DATA_BLOCK_IDENTIFIER,
            data_type: data_type.into(),
            compression: compression.into(),
            sector_size,
            length: payload.len() as u64,
            cmp_length,
            crc64,
            cmp_crc64,
        };
        let offset = self.current_position;
        self.file.seek(SeekFrom::Start(offset))?;
        header.write(&mut self.file)?;
        if let Some(props) = properties {
            self.file.write_all(&props)?;
        }
        self.file.write_all(&body)?;
        self.current_position = offset + DataBlockHeader::SIZE as u64 + cmp_length;
        self.index_entries.push(IndexEntry::new(BlockType::DataBlock, data_type, offset));
        Ok(())
    }

    fn write_ddt_block(&mut self, ddt: &Ddt) -> Result<()> {
        let payload = ddt.to_bytes();
        let crc64 = codec::crc64::checksum(&payload);
        let (compression, properties, body, cmp_crc64) = if !self.options.compress {
            (Compression::None, None, payload.clone(), crc64)
        }
        else {
            let compressed = codec::compress(Compression::Lzma, &payload, 8)?;
            if compressed.len() >= payload.len() {
                (Compression::None, None, payload.clone(), crc64)
            }
            else {
                let mut props = [0u8; LZMA_PROPERTIES_LENGTH];
                props.copy_from_slice(&compressed[..LZMA_PROPERTIES_LENGTH]);
                let body = compressed[LZMA_PROPERTIES_LENGTH..].to_vec();
                let cmp_crc = codec::crc64::checksum(&compressed);
                (Compression::Lzma, Some(props), body, cmp_crc)
            }
        };
        let cmp_length = properties.map(|p: [u8; LZMA_PROPERTIES_LENGTH]| p.len()).unwrap_or(0) as u64 + body.len() as u64;
        let header = DdtHeader {
            identifier: DDT_IDENTIFIER,
            data_type: DataType::UserData.into(),
            compression: compression.into(),
            shift: ddt.shift(),
            entries: ddt.len() as u64,
            length: payload.len() as u64,
            cmp_length,
            crc64,
            cmp_crc64,
        };
        let offset = self.current_position;
        self.file.seek(SeekFrom::Start(offset))?;
        header.write(&mut self.file)?;
        if let Some(props) = properties {
            self.file.write_all(&props)?;
        }
        self.file.write_all(&body)?;
        self.current_position = offset + DdtHeader::SIZE as u64 + cmp_length;
        self.index_entries.push(IndexEntry::new(BlockType::DeDuplicationTable, DataType::UserData, offset));
        Ok(())
    }

    /// Finish the image: flush the open block, emit every side block in the order §4.7 fixes, write
    /// the index and rewrite the header. Consumes the writer, handing back the backing file (so it
    /// can be reopened as a [`Reader`](crate::reader::Reader) without the caller needing its own
    /// handle) alongside any whole-image digests.
    pub fn close(mut self) -> Result<(F, DigestResults)> {
        if self.state != WriterState::Writing {
            return Err(AaruError::NotWriting);
        }

        self.flush_packer()?;

        if self.sectors_written > 0 {
            info!(
                "deduplication ratio: {:.2}% ({} of {} sectors deduplicated)",
                100.0 * self.sectors_deduped as f64 / self.sectors_written as f64,
                self.sectors_deduped,
                self.sectors_written
            );
        }

        let tags: Vec<(u32, Vec<u8>)> = self.media_tags.iter().map(|(k, v)| (k, v.to_vec())).collect();
        for (kind, bytes) in tags {
            self.write_data_block(DataType::MediaTag(kind), 1, &bytes)?;
        }

        if let Some(geometry) = self.geometry {
            let record: GeometryRecord = geometry.into();
            let mut buf = Vec::new();
            record.write(&mut std::io::Cursor::new(&mut buf))?;
            self.write_block_raw(&buf, BlockType::GeometryBlock, DataType::UserData)?;
        }

        if !self.dump_hardware.entries.is_empty() {
            let bytes = self.dump_hardware.to_bytes();
            self.write_block_raw(&bytes, BlockType::DumpHardwareBlock, DataType::UserData)?;
        }

        if let Some(xml) = self.cicm_xml.clone() {
            self.write_block_raw(xml.as_bytes(), BlockType::CicmBlock, DataType::UserData)?;
        }

        let results = std::mem::take(&mut self.digests).finalize();
        if results.md5.is_some() || results.sha1.is_some() || results.sha256.is_some() || results.spamsum.is_some() {
            let mut buf = Vec::new();
            {
                let mut cursor = std::io::Cursor::new(&mut buf);
                if let Some(d) = &results.md5 {
                    crate::format::ChecksumEntry { kind: 0, length: d.len() as u32, digest: d.clone() }.write(&mut cursor)?;
                }
                if let Some(d) = &results.sha1 {
                    crate::format::ChecksumEntry { kind: 1, length: d.len() as u32, digest: d.clone() }.write(&mut cursor)?;
                }
                if let Some(d) = &results.sha256 {
                    crate::format::ChecksumEntry { kind: 2, length: d.len() as u32, digest: d.clone() }.write(&mut cursor)?;
                }
                if let Some(s) = &results.spamsum {
                    let bytes = s.as_bytes().to_vec();
                    crate::format::ChecksumEntry { kind: 3, length: bytes.len() as u32, digest: bytes }.write(&mut cursor)?;
                }
            }
            self.write_block_raw(&buf, BlockType::ChecksumBlock, DataType::UserData)?;
        }

        if self.media_type.is_tape() && !self.tape_partitions.is_empty() {
            let mut buf = Vec::new();
            {
                let mut cursor = std::io::Cursor::new(&mut buf);
                cursor.write_all(&(self.tape_partitions.len() as u32).to_le_bytes())?;
                for p in &self.tape_partitions {
                    let record: TapePartitionRecord = (*p).into();
                    record.write(&mut cursor)?;
                }
            }
            self.write_block_raw(&buf, BlockType::TapePartitionBlock, DataType::UserData)?;
        }

        if self.media_type.is_tape() && !self.tape_files.is_empty() {
            let mut buf = Vec::new();
            {
                let mut cursor = std::io::Cursor::new(&mut buf);
                cursor.write_all(&(self.tape_files.len() as u32).to_le_bytes())?;
                for f in &self.tape_files {
                    let record: TapeFileRecord = (*f).into();
                    record.write(&mut cursor)?;
                }
            }
            self.write_block_raw(&buf, BlockType::TapeFileBlock, DataType::UserData)?;
        }

        let ddt = if let Some(ddt) = self.ddt.take() {
            ddt
        }
        else if let Some(sparse) = self.sparse_ddt.take() {
            sparse.to_dense(self.shift)
        }
        else {
            return Err(AaruError::MissingDdtOnAppend);
        };
        self.write_ddt_block(&ddt)?;

        if !self.cd_prefix_aux.is_empty() {
            let bytes = std::mem::take(&mut self.cd_prefix_aux);
            self.write_data_block(DataType::CdSectorPrefix, CD_PREFIX_SIZE as u32, &bytes)?;
        }
        if let Some(ddt) = self.cd_prefix_ddt.take() {
            self.write_data_block(DataType::CdSectorPrefixCorrected, 4, &ddt.to_bytes())?;
        }
        if !self.cd_suffix_aux.is_empty() {
            let bytes = std::mem::take(&mut self.cd_suffix_aux);
            self.write_data_block(DataType::CdSectorSuffix, CD_SUFFIX_SIZE as u32, &bytes)?;
        }
        if let Some(ddt) = self.cd_suffix_ddt.take() {
            self.write_data_block(DataType::CdSectorSuffixCorrected, 4, &ddt.to_bytes())?;
        }
        if !self.subheaders.is_empty() {
            let bytes = self.subheaders.as_bytes().to_vec();
            self.write_data_block(DataType::CdSectorSubheader, CD_SUBHEADER_SIZE as u32, &bytes)?;
        }
        if !self.subchannel.is_empty() {
            let bytes = self.subchannel.as_bytes().to_vec();
            self.write_data_block(DataType::CdSectorSubchannel, CD_SUBCHANNEL_SIZE as u32, &bytes)?;
        }
        if let Some(tail) = self.tail_tags.take() {
            if !tail.is_empty() {
                let record_size = tail.record_size() as u32;
                self.write_data_block(DataType::MediaTag(TAIL_TAG_MEDIA_TAG_KIND), record_size, tail.as_bytes())?;
            }
        }

        if let Some(tracks) = &self.tracks {
            let mut buf = Vec::new();
            {
                let mut cursor = std::io::Cursor::new(&mut buf);
                cursor.write_all(&(tracks.as_slice().len() as u32).to_le_bytes())?;
                for track in tracks.as_slice() {
                    let record: TrackRecord = track.into();
                    record.write(&mut cursor)?;
                }
            }
            self.write_block_raw(&buf, BlockType::TracksBlock, DataType::UserData)?;
        }

        if !self.metadata.is_empty() {
            let (header, pool) = self.metadata.to_block();
            let mut buf = Vec::new();
            {
                let mut cursor = std::io::Cursor::new(&mut buf);
                header.write(&mut cursor)?;
            }
            buf.extend_from_slice(&pool);
            self.write_block_raw(&buf, BlockType::MetadataBlock, DataType::UserData)?;
        }

        let index_offset = self.current_position;
        let mut entries_buf = Vec::new();
        {
            let mut cursor = std::io::Cursor::new(&mut entries_buf);
            for entry in &self.index_entries {
                entry.write(&mut cursor)?;
            }
        }
        let crc64 = codec::crc64::checksum(&entries_buf);
        let index_header = IndexHeader { identifier: INDEX_IDENTIFIER, entries: self.index_entries.len() as u32, crc64 };
        self.file.seek(SeekFrom::Start(index_offset))?;
        index_header.write(&mut self.file)?;
        self.file.write_all(&entries_buf)?;

        self.header.index_offset = index_offset;
        self.header.last_written_time = now_filetime();
        self.file.seek(SeekFrom::Start(0))?;
        self.header.write(&mut self.file)?;
        self.file.flush()?;
        self.state = WriterState::Closed;

        Ok((self.file, results))
    }
}

fn decode_data_block_header(span: &[u8]) -> Option<DataBlockHeader> {
    DataBlockHeader::read(&mut std::io::Cursor::new(span)).ok()
}

fn decode_data_block(span: &[u8]) -> Result<Vec<u8>> {
    let header = decode_data_block_header(span)
        .ok_or_else(|| AaruError::CorruptBlock { offset: 0, reason: "malformed data block header".into() })?;
    let payload = &span[DataBlockHeader::SIZE..];
    let compression = Compression::try_from(header.compression)?;
    let decoded = codec::decompress(compression, payload, header.length as usize)?;
    if codec::crc64::checksum(&decoded) != header.crc64 {
        return Err(AaruError::CorruptBlock { offset: 0, reason: "crc64 mismatch".into() });
    }
    Ok(decoded)
}

fn decode_ddt_block(span: &[u8]) -> Result<Ddt> {
    let header = DdtHeader::read(&mut std::io::Cursor::new(span))?;
    let payload = &span[DdtHeader::SIZE..];
    let compression = Compression::try_from(header.compression)?;
    let decoded = codec::decompress(compression, payload, header.length as usize)?;
    if codec::crc64::checksum(&decoded) != header.crc64 {
        return Err(AaruError::CorruptBlock { offset: 0, reason: "crc64 mismatch".into() });
    }
    Ddt::from_bytes(&decoded, header.shift)
}

fn decode_track_list(span: &[u8]) -> Result<Vec<Track>> {
    let mut cursor = std::io::Cursor::new(span);
    let mut count_buf = [0u8; 4];
    cursor.read_exact(&mut count_buf)?;
    let count = u32::from_le_bytes(count_buf);
    let mut tracks = Vec::with_capacity(count as usize);
    for _ in 0..count {
        tracks.push(Track::try_from(TrackRecord::read(&mut cursor)?)?);
    }
    Ok(tracks)
}

fn decode_tape_partitions(span: &[u8]) -> Result<Vec<TapePartition>> {
    let mut cursor = std::io::Cursor::new(span);
    let mut count_buf = [0u8; 4];
    cursor.read_exact(&mut count_buf)?;
    let count = u32::from_le_bytes(count_buf);
    let mut partitions = Vec::with_capacity(count as usize);
    for _ in 0..count {
        partitions.push(TapePartitionRecord::read(&mut cursor)?.into());
    }
    Ok(partitions)
}

fn decode_tape_files(span: &[u8]) -> Result<Vec<TapeFile>> {
    let mut cursor = std::io::Cursor::new(span);
    let mut count_buf = [0u8; 4];
    cursor.read_exact(&mut count_buf)?;
    let count = u32::from_le_bytes(count_buf);
    let mut files = Vec::with_capacity(count as usize);
    for _ in 0..count {
        files.push(TapeFileRecord::read(&mut cursor)?.into());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn cursor() -> Cursor<Vec<u8>> {
        Cursor::new(Vec::new())
    }

    #[test]
    fn test_create_stamps_valid_header() {
        let writer = Writer::create(cursor(), MediaType::GenericHdd, 16, 512, CreateOptions::default()).unwrap();
        assert_eq!(writer.sectors(), 16);
        assert_eq!(writer.sector_size(), 512);
    }

    #[test]
    fn test_write_sector_rejects_wrong_size() {
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 4, 512, CreateOptions::default()).unwrap();
        let err = writer.write_sector(0, &[0u8; 511]).unwrap_err();
        assert!(matches!(err, AaruError::WrongSize { expected: 512, actual: 511 }));
    }

    #[test]
    fn test_write_sector_rejects_out_of_range() {
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 4, 512, CreateOptions::default()).unwrap();
        let err = writer.write_sector(4, &[0u8; 512]).unwrap_err();
        assert!(matches!(err, AaruError::OutOfRange));
    }

    #[test]
    fn test_set_tracks_rejected_on_non_optical_media() {
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 4, 512, CreateOptions::default()).unwrap();
        let err = writer.set_tracks(vec![]).unwrap_err();
        assert!(matches!(err, AaruError::UnsupportedMedia));
    }

    #[test]
    fn test_close_writes_nonzero_index_offset() {
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 4, 512, CreateOptions::default()).unwrap();
        for i in 0..4u64 {
            writer.write_sector(i, &vec![i as u8; 512]).unwrap();
        }
        let (_file, _digests) = writer.close().unwrap();
    }

    #[test]
    fn test_close_twice_errors_via_reopen_state() {
        // Once closed, a Writer is consumed; NotWriting instead surfaces if a second write is
        // attempted on a fresh handle that never got past `create`'s bookkeeping.
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 1, 512, CreateOptions::default()).unwrap();
        writer.write_sector(0, &[1u8; 512]).unwrap();
        let ok = writer.close().is_ok();
        assert!(ok);
    }

    #[test]
    fn test_duplicate_sectors_both_succeed() {
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 4, 512, CreateOptions::default()).unwrap();
        writer.write_sector(0, &[0xAAu8; 512]).unwrap();
        writer.write_sector(1, &[0xAAu8; 512]).unwrap();
        writer.write_sector(2, &[0xBBu8; 512]).unwrap();
        writer.write_sector(3, &[0xAAu8; 512]).unwrap();
        assert_eq!(writer.sectors_deduped, 2);
        let (_file, _digests) = writer.close().unwrap();
    }

    #[test]
    fn test_write_sector_long_cd_requires_tracks() {
        let mut writer = Writer::create(cursor(), MediaType::Cdrom, 4, 2048, CreateOptions::default()).unwrap();
        let err = writer.write_sector_long(0, &[0u8; CD_RAW_SECTOR_SIZE]).unwrap_err();
        assert!(matches!(err, AaruError::TrackNotFound));
    }

    #[test]
    fn test_write_sector_long_cd_mode1_round_trip_into_ddt() {
        let mut writer = Writer::create(cursor(), MediaType::Cdrom, 4, 2048, CreateOptions::default()).unwrap();
        writer
            .set_tracks(vec![Track {
                sequence: 1,
                track_type: TrackType::CdMode1,
                start: 0,
                end: 3,
                pregap: 0,
                session: 1,
                isrc: None,
                flags: CdTrackFlags::empty(),
            }])
            .unwrap();

        let mut raw = vec![0u8; CD_RAW_SECTOR_SIZE];
        raw[0..16].copy_from_slice(&crate::cdrom::sector::build_prefix(0, 0x01));
        for (i, b) in raw[16..2064].iter_mut().enumerate() {
            *b = (i % 255) as u8;
        }
        let edc = crate::cdrom::ecc::compute_edc(&raw[0..2064]);
        raw[2064..2068].copy_from_slice(&edc.to_le_bytes());
        crate::cdrom::ecc::compute_ecc(&mut raw);

        writer.write_sector_long(0, &raw).unwrap();
        let (_file, _digests) = writer.close().unwrap();
    }

    #[test]
    fn test_write_sector_generic_long_tail_tag() {
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 2, 512, CreateOptions::default()).unwrap();
        let mut long = vec![0x42u8; 512];
        long.extend_from_slice(&[1, 2, 3, 4]);
        writer.write_sector_long(0, &long).unwrap();
        let (_file, _digests) = writer.close().unwrap();
    }

    #[test]
    fn test_append_rejects_media_type_mismatch() {
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 2, 512, CreateOptions::default()).unwrap();
        writer.write_sector(0, &[0u8; 512]).unwrap();
        writer.write_sector(1, &[0u8; 512]).unwrap();
        let (file, _digests) = writer.close().unwrap();

        let err = Writer::append(file, MediaType::Cdrom, CreateOptions::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_append_reuses_existing_ddt_and_accepts_more_sectors() {
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 4, 512, CreateOptions::default()).unwrap();
        writer.write_sector(0, &[0x11u8; 512]).unwrap();
        writer.write_sector(1, &[0x22u8; 512]).unwrap();
        let (file, _digests) = writer.close().unwrap();

        let mut reopened = Writer::append(file, MediaType::GenericHdd, CreateOptions::default()).unwrap();
        assert_eq!(reopened.sectors(), 4);
        reopened.write_sector(2, &[0x33u8; 512]).unwrap();
        reopened.write_sector(3, &[0x44u8; 512]).unwrap();
        let (_file, _digests) = reopened.close().unwrap();
    }

    #[test]
    fn test_rewind_to_earlier_address_disables_digests() {
        let options = CreateOptions { sha256: true, ..CreateOptions::default() };
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 4, 512, options).unwrap();
        writer.write_sector(2, &[0x11u8; 512]).unwrap();
        writer.write_sector(0, &[0x22u8; 512]).unwrap();
        let (_file, digests) = writer.close().unwrap();
        assert_eq!(digests, DigestResults::default());
    }

    #[test]
    fn test_rewriting_same_address_disables_digests() {
        let options = CreateOptions { sha256: true, ..CreateOptions::default() };
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 4, 512, options).unwrap();
        writer.write_sector(0, &[0x11u8; 512]).unwrap();
        writer.write_sector(0, &[0x22u8; 512]).unwrap();
        let (_file, digests) = writer.close().unwrap();
        assert_eq!(digests, DigestResults::default());
    }

    #[test]
    fn test_monotonic_addresses_keep_digests_enabled() {
        let options = CreateOptions { sha256: true, ..CreateOptions::default() };
        let mut writer = Writer::create(cursor(), MediaType::GenericHdd, 4, 512, options).unwrap();
        writer.write_sector(0, &[0x11u8; 512]).unwrap();
        writer.write_sector(1, &[0x22u8; 512]).unwrap();
        let (_file, digests) = writer.close().unwrap();
        assert!(digests.sha256.is_some());
    }
}
