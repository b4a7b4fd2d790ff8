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

//! A CD-ROM Mode 2 Form 2 track with a correct prefix but a never-written (all-zero) EDC trailer,
//! which real Form 2 sectors frequently have since the field is optional. The splitter must
//! classify that as `Mode2Form2NoCrc` rather than `Incorrect`, storing no auxiliary suffix bytes,
//! and `reconstruct_sector` must hand back the original frame byte for byte.

use std::io::Cursor;

use aaruformat::{
    cdrom::{ecc::compute_edc, sector::build_prefix},
    media_type::MediaType,
    tracks::{CdTrackFlags, Track, TrackType},
    writer::{CreateOptions, Writer},
    Reader, CD_RAW_SECTOR_SIZE,
};

const MODE2: u8 = 0x02;

fn form2_sector_with_empty_edc(address: u32) -> Vec<u8> {
    let mut raw = vec![0u8; CD_RAW_SECTOR_SIZE];
    raw[0..16].copy_from_slice(&build_prefix(address, MODE2));
    // Subheader: mark Form 2 at both mirrored offsets (byte 2 and byte 6 of the 8-byte subheader).
    raw[18] = 0x20;
    raw[22] = 0x20;
    for (i, b) in raw[24..2348].iter_mut().enumerate() {
        *b = ((address as usize + i) % 251) as u8;
    }
    // Leave raw[2348..2352] (the stored EDC) all zero: this sector was never checksummed.
    raw
}

fn form2_sector_with_edc(address: u32) -> Vec<u8> {
    let mut raw = vec![0u8; CD_RAW_SECTOR_SIZE];
    raw[0..16].copy_from_slice(&build_prefix(address, MODE2));
    raw[18] = 0x20;
    raw[22] = 0x20;
    for (i, b) in raw[24..2348].iter_mut().enumerate() {
        *b = ((address as usize + i + 7) % 251) as u8;
    }
    let edc = compute_edc(&raw[16..2348]);
    raw[2348..2352].copy_from_slice(&edc.to_le_bytes());
    raw
}

#[test]
fn cdrom_mode2_form2_empty_edc_round_trips_exactly() {
    const SECTORS: u64 = 4;

    let mut writer = Writer::create(Cursor::new(Vec::new()), MediaType::Cdrom, SECTORS, 2324, CreateOptions::default()).unwrap();
    writer
        .set_tracks(vec![Track {
            sequence: 1,
            track_type: TrackType::CdMode2Form2,
            start: 0,
            end: SECTORS - 1,
            pregap: 0,
            session: 1,
            isrc: None,
            flags: CdTrackFlags::empty(),
        }])
        .unwrap();

    let no_crc = form2_sector_with_empty_edc(0);
    let with_crc = form2_sector_with_edc(1);
    writer.write_sector_long(0, &no_crc).unwrap();
    writer.write_sector_long(1, &with_crc).unwrap();

    let (file, _digests) = writer.close().unwrap();

    let mut reader = Reader::open(file).unwrap();
    assert_eq!(reader.read_sector_long(0).unwrap(), no_crc, "empty-EDC Form 2 sector must reconstruct exactly");
    assert_eq!(reader.read_sector_long(1).unwrap(), with_crc, "checksummed Form 2 sector must reconstruct exactly");
}
