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

//! The media type enumerant stored in a container's [`Header`](crate::format::Header) and
//! consulted by the block packer's codec-selection rule and the CD-ROM long-sector splitter.

use strum::{Display, EnumIter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The physical medium a container holds an image of.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MediaType {
    #[default]
    GenericHdd = 0,
    Floppy160 = 10,
    Floppy180 = 11,
    Floppy320 = 12,
    Floppy360 = 13,
    Floppy720 = 14,
    Floppy1200 = 15,
    Floppy1440 = 16,
    Floppy2880 = 17,
    Cdrom = 30,
    CdromXa = 31,
    JaguarCd = 32,
    VideoNow = 33,
    VideoNowColor = 34,
    VideoNowXp = 35,
    Dvd = 40,
    DvdRam = 41,
    BluRay = 50,
    Lto = 60,
    Dat = 61,
    Qic = 62,
    Exabyte = 63,
    Ait = 64,
}

impl MediaType {
    /// True for any medium read with Red Book / Yellow Book long-sector semantics — the media
    /// types the CD-ROM long-sector splitter is invoked for.
    pub fn is_optical(&self) -> bool {
        matches!(
            self,
            MediaType::Cdrom
                | MediaType::CdromXa
                | MediaType::JaguarCd
                | MediaType::VideoNow
                | MediaType::VideoNowColor
                | MediaType::VideoNowXp
                | MediaType::Dvd
                | MediaType::DvdRam
                | MediaType::BluRay
        )
    }

    /// True for a CD-family medium specifically (as opposed to DVD/BD), the distinction the
    /// packer's audio/FLAC codec-selection rule and the long-sector splitter both key on.
    pub fn is_cd_family(&self) -> bool {
        matches!(
            self,
            MediaType::Cdrom
                | MediaType::CdromXa
                | MediaType::JaguarCd
                | MediaType::VideoNow
                | MediaType::VideoNowColor
                | MediaType::VideoNowXp
        )
    }

    /// True for the "special" CD-family members (game/video formats layered on the Red Book)
    /// that the packer's codec rule excludes from FLAC even for audio-flagged blocks, since
    /// their audio framing does not follow the Red Book layout FLAC assumes.
    pub fn is_special_cd_family(&self) -> bool {
        matches!(
            self,
            MediaType::JaguarCd | MediaType::VideoNow | MediaType::VideoNowColor | MediaType::VideoNowXp
        )
    }

    /// True for a sequential tape medium, routed to the sparse `BTreeMap`-backed [`Ddt`](crate::ddt::Ddt)
    /// variant and the [`tape`](crate::tape) partition/file side streams rather than the dense
    /// fixed-size DDT used for random-access media.
    pub fn is_tape(&self) -> bool {
        matches!(
            self,
            MediaType::Lto | MediaType::Dat | MediaType::Qic | MediaType::Exabyte | MediaType::Ait
        )
    }

    /// The sector size a container for this media type defaults to when not otherwise specified.
    pub fn default_sector_size(&self) -> u32 {
        match self {
            MediaType::GenericHdd => 512,
            MediaType::Floppy160
            | MediaType::Floppy180
            | MediaType::Floppy320
            | MediaType::Floppy360
            | MediaType::Floppy720
            | MediaType::Floppy1200
            | MediaType::Floppy1440
            | MediaType::Floppy2880 => 512,
            MediaType::Cdrom | MediaType::CdromXa | MediaType::JaguarCd => 2048,
            MediaType::VideoNow | MediaType::VideoNowColor | MediaType::VideoNowXp => 2048,
            MediaType::Dvd | MediaType::DvdRam => 2048,
            MediaType::BluRay => 2048,
            MediaType::Lto | MediaType::Dat | MediaType::Qic | MediaType::Exabyte | MediaType::Ait => 512,
        }
    }
}

impl TryFrom<u32> for MediaType {
    type Error = crate::AaruError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use strum::IntoEnumIterator;
        MediaType::iter()
            .find(|m| *m as u32 == value)
            .ok_or(crate::AaruError::UnsupportedMedia)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_discriminants() {
        use strum::IntoEnumIterator;
        for media in MediaType::iter() {
            let value = media as u32;
            assert_eq!(MediaType::try_from(value).unwrap(), media);
        }
    }

    #[test]
    fn test_optical_tape_disjoint() {
        use strum::IntoEnumIterator;
        for media in MediaType::iter() {
            assert!(!(media.is_optical() && media.is_tape()));
        }
    }

    #[test]
    fn test_special_cd_family_subset_of_cd_family() {
        use strum::IntoEnumIterator;
        for media in MediaType::iter() {
            if media.is_special_cd_family() {
                assert!(media.is_cd_family());
            }
        }
    }
}
