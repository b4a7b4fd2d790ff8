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

//! The CD track table: one [`TracksBlock`](crate::format::BlockType::TracksBlock) per optical
//! image, consulted by the block packer's codec-selection rule (§4.3) and the long-sector
//! splitter (§4.6) to dispatch each sector address to the right handling.

use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{format::TrackRecord, AaruError, Result};

/// The sector format carried by a track, the key the packer and splitter dispatch on.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrackType {
    Audio = 0,
    /// Plain 2048/2336/2352-byte data track with no per-sector ECC/EDC framing recognized here.
    Data = 1,
    CdMode1 = 2,
    CdMode2Formless = 3,
    CdMode2Form1 = 4,
    CdMode2Form2 = 5,
}

impl TrackType {
    /// True for any of the three Mode 2 variants, which share prefix handling in the splitter.
    pub fn is_mode2(&self) -> bool {
        matches!(
            self,
            TrackType::CdMode2Formless | TrackType::CdMode2Form1 | TrackType::CdMode2Form2
        )
    }
}

impl From<TrackType> for u8 {
    fn from(value: TrackType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for TrackType {
    type Error = AaruError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => TrackType::Audio,
            1 => TrackType::Data,
            2 => TrackType::CdMode1,
            3 => TrackType::CdMode2Formless,
            4 => TrackType::CdMode2Form1,
            5 => TrackType::CdMode2Form2,
            other => return Err(AaruError::BinaryFormat(format!("unknown track type {other}"))),
        })
    }
}

bitflags! {
    /// The per-track flag byte stored alongside each [`TrackRecord`] and updated by
    /// `WriteSectorTag(CdTrackFlags)` (§4.7).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct CdTrackFlags: u8 {
        const FOUR_CHANNEL  = 0b0000_0001;
        const DATA          = 0b0000_0010;
        const COPY_PERMITTED = 0b0000_0100;
        const PRE_EMPHASIS  = 0b0000_1000;
    }
}

/// One CD track: its sequence number, sector format, address range and optional ISRC.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    pub sequence: u32,
    pub track_type: TrackType,
    pub start: u64,
    pub end: u64,
    pub pregap: u64,
    pub session: u32,
    pub isrc: Option<String>,
    pub flags: CdTrackFlags,
}

impl Track {
    /// True if `address` falls within `[start, end]` inclusive.
    pub fn covers(&self, address: u64) -> bool {
        address >= self.start && address <= self.end
    }
}

impl From<&Track> for TrackRecord {
    fn from(track: &Track) -> Self {
        let mut isrc = [0u8; 12];
        if let Some(code) = &track.isrc {
            let bytes = code.as_bytes();
            let len = bytes.len().min(12);
            isrc[..len].copy_from_slice(&bytes[..len]);
        }
        TrackRecord {
            sequence: track.sequence,
            track_type: track.track_type.into(),
            start: track.start,
            end: track.end,
            pregap: track.pregap,
            session: track.session,
            isrc,
            flags: track.flags.bits(),
        }
    }
}

impl TryFrom<TrackRecord> for Track {
    type Error = AaruError;

    fn try_from(record: TrackRecord) -> Result<Self> {
        let isrc_end = record.isrc.iter().position(|&b| b == 0).unwrap_or(12);
        let isrc = if isrc_end == 0 {
            None
        }
        else {
            Some(String::from_utf8_lossy(&record.isrc[..isrc_end]).into_owned())
        };
        Ok(Track {
            sequence: record.sequence,
            track_type: TrackType::try_from(record.track_type)?,
            start: record.start,
            end: record.end,
            pregap: record.pregap,
            session: record.session,
            isrc,
            flags: CdTrackFlags::from_bits_truncate(record.flags),
        })
    }
}

/// The ordered set of tracks on an optical image, indexed by address for the splitter and packer.
#[derive(Clone, Debug, Default)]
pub struct TrackList {
    tracks: Vec<Track>,
}

impl TrackList {
    pub fn new(mut tracks: Vec<Track>) -> Self {
        tracks.sort_by_key(|t| t.start);
        Self { tracks }
    }

    pub fn as_slice(&self) -> &[Track] {
        &self.tracks
    }

    /// Mutable access for `WriteSectorTag`, which updates a track's flags or ISRC in place without
    /// disturbing address-range ordering.
    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn into_vec(self) -> Vec<Track> {
        self.tracks
    }

    /// The track covering `address`, or [`AaruError::TrackNotFound`] if none does.
    pub fn track_for_address(&self, address: u64) -> Result<&Track> {
        self.tracks
            .iter()
            .find(|t| t.covers(address))
            .ok_or(AaruError::TrackNotFound)
    }

    /// Validate the invariant that tracks cover `[0, sectors)` without overlap (§8 invariant 5).
    pub fn validate_coverage(&self, sectors: u64) -> Result<()> {
        if self.tracks.is_empty() {
            return Err(AaruError::ParameterError("no tracks defined for optical media".into()));
        }
        let mut expected_start = 0u64;
        for track in &self.tracks {
            if track.start != expected_start {
                return Err(AaruError::ParameterError(format!(
                    "track {} starts at {} but {} was expected (gap or overlap)",
                    track.sequence, track.start, expected_start
                )));
            }
            expected_start = track.end + 1;
        }
        if expected_start != sectors {
            return Err(AaruError::ParameterError(format!(
                "tracks cover [0, {expected_start}) but image has {sectors} sectors"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(seq: u32, start: u64, end: u64, kind: TrackType) -> Track {
        Track {
            sequence: seq,
            track_type: kind,
            start,
            end,
            pregap: 0,
            session: 1,
            isrc: None,
            flags: CdTrackFlags::empty(),
        }
    }

    #[test]
    fn test_track_record_round_trip() {
        let mut t = track(1, 0, 149, TrackType::CdMode1);
        t.isrc = Some("USRC17607839".to_string());
        t.flags = CdTrackFlags::DATA | CdTrackFlags::COPY_PERMITTED;
        let record: TrackRecord = (&t).into();
        let back = Track::try_from(record).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn test_coverage_contiguous() {
        let list = TrackList::new(vec![
            track(1, 0, 149, TrackType::CdMode1),
            track(2, 150, 299, TrackType::Audio),
        ]);
        assert!(list.validate_coverage(300).is_ok());
        assert_eq!(list.track_for_address(200).unwrap().sequence, 2);
    }

    #[test]
    fn test_coverage_gap_rejected() {
        let list = TrackList::new(vec![track(1, 0, 100, TrackType::CdMode1), track(2, 150, 200, TrackType::Audio)]);
        assert!(list.validate_coverage(201).is_err());
    }

    #[test]
    fn test_track_not_found() {
        let list = TrackList::new(vec![track(1, 0, 10, TrackType::CdMode1)]);
        assert!(matches!(list.track_for_address(50), Err(AaruError::TrackNotFound)));
    }
}
