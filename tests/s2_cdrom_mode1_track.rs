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

//! A single-track CD-ROM Mode 1 image where every sector's sync/header/EDC/ECC is correct. The
//! long-sector splitter should classify every one of them `Correct`/`Correct`, storing no
//! auxiliary prefix/suffix bytes, and the reconstructed frame should equal the original exactly.

use std::io::Cursor;

use aaruformat::{
    cdrom::{ecc, sector::build_prefix},
    media_type::MediaType,
    tracks::{CdTrackFlags, Track, TrackType},
    writer::{CreateOptions, Writer},
    Reader, CD_RAW_SECTOR_SIZE,
};

fn correct_mode1_sector(address: u32) -> Vec<u8> {
    let mut raw = vec![0u8; CD_RAW_SECTOR_SIZE];
    raw[0..16].copy_from_slice(&build_prefix(address, 0x01));
    for (i, b) in raw[16..2064].iter_mut().enumerate() {
        *b = ((address as usize + i) % 255) as u8;
    }
    let edc = ecc::compute_edc(&raw[0..2064]);
    raw[2064..2068].copy_from_slice(&edc.to_le_bytes());
    ecc::compute_ecc(&mut raw);
    raw
}

#[test]
fn cdrom_single_mode1_track_reconstructs_every_sampled_sector() {
    const SECTORS: u64 = 150;

    let mut writer = Writer::create(Cursor::new(Vec::new()), MediaType::Cdrom, SECTORS, 2048, CreateOptions::default()).unwrap();
    writer
        .set_tracks(vec![Track {
            sequence: 1,
            track_type: TrackType::CdMode1,
            start: 0,
            end: SECTORS - 1,
            pregap: 0,
            session: 1,
            isrc: None,
            flags: CdTrackFlags::empty(),
        }])
        .unwrap();

    let mut originals = Vec::new();
    for address in 0..SECTORS as u32 {
        let raw = correct_mode1_sector(address);
        writer.write_sector_long(address as u64, &raw).unwrap();
        originals.push(raw);
    }
    let (file, _digests) = writer.close().unwrap();

    let mut reader = Reader::open(file).unwrap();
    assert_eq!(reader.sectors(), SECTORS);

    for &address in &[0u64, 1, 74, 149] {
        let back = reader.read_sector_long(address).unwrap();
        assert_eq!(back, originals[address as usize], "sector {address} did not reconstruct exactly");
    }
}
