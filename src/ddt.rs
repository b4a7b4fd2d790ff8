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

//! The Deduplication Table (C5): the array mapping a logical sector or tape block address to a
//! packed `(block offset << shift) | intra-block index` pointer, plus the parallel, narrower
//! encoding used for CD prefix/suffix correctness (§3, §4.5).
//!
//! Three shapes live here:
//! - [`Ddt`], the dense `u64`-per-sector array used for `UserData` on every non-tape medium.
//! - [`SparseDdt`], the `BTreeMap`-backed map used while writing a tape image, whose logical
//!   block numbering is sparse; it is materialized into a dense [`Ddt`] at `Close` (§4.5).
//! - [`CdFixDdt`], the `u32`-per-sector array recording whether a CD sector's prefix/suffix was
//!   reconstructible, or else a 1-based index into an auxiliary byte stream (§3 "DDT entry
//!   encoding").
//!
//! This module does not know about compression or file I/O; [`Writer`](crate::writer::Writer)
//! and [`Reader`](crate::reader::Reader) serialize these shapes to/from a [`DdtHeader`](crate::format::DdtHeader)
//! payload using [`crate::codec`].

use std::collections::BTreeMap;

use crate::{AaruError, Result};

/// Reserved [`CdFixDdt`] entry: the sector was never dumped (all-zero input, §4.6).
pub const CD_DFIX_NOT_DUMPED: u32 = 0;
/// Reserved [`CdFixDdt`] entry: the prefix/suffix matched its deterministic/checksummed form and
/// no bytes were stored.
pub const CD_DFIX_CORRECT: u32 = 1;
/// Reserved [`CdFixDdt`] entry: a Mode 2 Form 1 suffix passed ECC/EDC verification.
pub const CD_DFIX_MODE2_FORM1_OK: u32 = 2;
/// Reserved [`CdFixDdt`] entry: a Mode 2 Form 2 suffix's EDC matched the stored value.
pub const CD_DFIX_MODE2_FORM2_OK: u32 = 3;
/// Reserved [`CdFixDdt`] entry: a Mode 2 Form 2 suffix stored an all-zero (absent) EDC.
pub const CD_DFIX_MODE2_FORM2_NO_CRC: u32 = 4;
/// The first non-reserved entry value; `entry - CD_DFIX_INDEX_BASE + 1` is the 1-based record
/// index into the auxiliary stream.
const CD_DFIX_INDEX_BASE: u32 = 5;
/// Isolates the index portion of a [`CdFixDdt`] entry from any future high reserved bits.
pub const CD_DFIX_MASK: u32 = 0x7FFF_FFFF;

/// A decoded [`CdFixDdt`] entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CdFix {
    NotDumped,
    Correct,
    Mode2Form1Ok,
    Mode2Form2Ok,
    Mode2Form2NoCrc,
    /// A 1-based record index into the auxiliary prefix/suffix byte stream.
    Index(u32),
}

impl From<CdFix> for u32 {
    fn from(value: CdFix) -> Self {
        match value {
            CdFix::NotDumped => CD_DFIX_NOT_DUMPED,
            CdFix::Correct => CD_DFIX_CORRECT,
            CdFix::Mode2Form1Ok => CD_DFIX_MODE2_FORM1_OK,
            CdFix::Mode2Form2Ok => CD_DFIX_MODE2_FORM2_OK,
            CdFix::Mode2Form2NoCrc => CD_DFIX_MODE2_FORM2_NO_CRC,
            CdFix::Index(idx) => CD_DFIX_INDEX_BASE + (idx - 1),
        }
    }
}

impl From<u32> for CdFix {
    fn from(value: u32) -> Self {
        match value & CD_DFIX_MASK {
            CD_DFIX_NOT_DUMPED => CdFix::NotDumped,
            CD_DFIX_CORRECT => CdFix::Correct,
            CD_DFIX_MODE2_FORM1_OK => CdFix::Mode2Form1Ok,
            CD_DFIX_MODE2_FORM2_OK => CdFix::Mode2Form2Ok,
            CD_DFIX_MODE2_FORM2_NO_CRC => CdFix::Mode2Form2NoCrc,
            masked => CdFix::Index(masked - CD_DFIX_INDEX_BASE + 1),
        }
    }
}

/// The dense, sector-indexed Deduplication Table used for `UserData` on every non-tape medium.
///
/// `entries[i] == 0` means sector `i` was never written (§4.5). Grows on demand so a writer can
/// set entries out of order without pre-sizing, but [`Writer`] always pre-sizes to the media's
/// declared sector count.
#[derive(Clone, Debug, Default)]
pub struct Ddt {
    entries: Vec<u64>,
    shift: u8,
}

impl Ddt {
    pub fn new(sectors: usize, shift: u8) -> Self {
        Self {
            entries: vec![0; sectors],
            shift,
        }
    }

    pub fn shift(&self) -> u8 {
        self.shift
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> u64 {
        self.entries.get(index).copied().unwrap_or(0)
    }

    pub fn set(&mut self, index: usize, entry: u64) {
        if index >= self.entries.len() {
            self.entries.resize(index + 1, 0);
        }
        self.entries[index] = entry;
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.entries
    }

    /// Pack a `(block file offset, intra-block sector index)` pair into one DDT entry.
    pub fn encode_entry(block_offset: u64, intra_index: u32, shift: u8) -> u64 {
        (block_offset << shift) | intra_index as u64
    }

    /// The inverse of [`encode_entry`](Self::encode_entry): `(block file offset, intra-block index)`.
    pub fn decode_entry(entry: u64, shift: u8) -> (u64, u32) {
        let mask = (1u64 << shift) - 1;
        (entry >> shift, (entry & mask) as u32)
    }

    /// Serialize to the little-endian `u64`-per-entry byte layout stored uncompressed or LZMA'd
    /// in a `DeDuplicationTable` block.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 8);
        for entry in &self.entries {
            out.extend_from_slice(&entry.to_le_bytes());
        }
        out
    }

    /// The inverse of [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8], shift: u8) -> Result<Self> {
        if bytes.len() % 8 != 0 {
            return Err(AaruError::BinaryFormat("DDT payload is not a multiple of 8 bytes".into()));
        }
        let entries = bytes
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Ok(Self { entries, shift })
    }
}

/// The sparse, `BTreeMap`-backed Deduplication Table used while writing a tape image, whose
/// logical block numbering may have large gaps (§4.5, §8 boundary case "sparse block numbers").
#[derive(Clone, Debug, Default)]
pub struct SparseDdt {
    map: BTreeMap<u64, u64>,
}

impl SparseDdt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, block: u64, entry: u64) {
        self.map.insert(block, entry);
    }

    pub fn get(&self, block: u64) -> u64 {
        self.map.get(&block).copied().unwrap_or(0)
    }

    pub fn max_block(&self) -> Option<u64> {
        self.map.keys().next_back().copied()
    }

    /// Materialize into a dense [`Ddt`] of length `max_block + 1`, per §3: "entries in a DDT
    /// equals the media's sector count, except tape images, where the DDT is created from a map
    /// ... whose maximum key defines length."
    pub fn to_dense(&self, shift: u8) -> Ddt {
        let len = self.max_block().map(|m| m + 1).unwrap_or(0);
        let mut dense = Ddt::new(len as usize, shift);
        for (&block, &entry) in &self.map {
            dense.set(block as usize, entry);
        }
        dense
    }
}

/// The narrower DDT used for CD prefix/suffix correctness, one `u32` per sector addressed by
/// [`CdFix`] (§3 "DDT entry encoding", §4.6).
#[derive(Clone, Debug, Default)]
pub struct CdFixDdt {
    entries: Vec<u32>,
}

impl CdFixDdt {
    pub fn new(sectors: usize) -> Self {
        Self {
            entries: vec![CD_DFIX_NOT_DUMPED; sectors],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> CdFix {
        CdFix::from(self.entries.get(index).copied().unwrap_or(CD_DFIX_NOT_DUMPED))
    }

    fn ensure(&mut self, index: usize) {
        if index >= self.entries.len() {
            self.entries.resize(index + 1, CD_DFIX_NOT_DUMPED);
        }
    }

    pub fn set_flag(&mut self, index: usize, fix: CdFix) {
        self.ensure(index);
        self.entries[index] = fix.into();
    }

    /// Store `record` (one `record_size`-byte slice) for sector `index` in `aux`, overwriting the
    /// sector's existing slot in place if it already held an index rather than appending a
    /// duplicate (§4.6: "the existing slot is overwritten in place rather than appending a
    /// duplicate").
    pub fn set_record(&mut self, index: usize, record: &[u8], aux: &mut Vec<u8>, record_size: usize) {
        self.ensure(index);
        match CdFix::from(self.entries[index]) {
            CdFix::Index(existing) => {
                let start = (existing as usize - 1) * record_size;
                aux[start..start + record_size].copy_from_slice(record);
            }
            _ => {
                aux.extend_from_slice(record);
                let new_index = (aux.len() / record_size) as u32;
                self.entries[index] = CdFix::Index(new_index).into();
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 4);
        for entry in &self.entries {
            out.extend_from_slice(&entry.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(AaruError::BinaryFormat(
                "CD fix DDT payload is not a multiple of 4 bytes".into(),
            ));
        }
        let entries = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Ok(Self { entries })
    }
}
