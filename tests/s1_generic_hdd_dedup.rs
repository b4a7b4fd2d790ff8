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

//! A tiny generic hard-disk image: one all-zero sector, seven identical 0xAA sectors, written
//! uncompressed with deduplication on. The deduplicated sectors must all read back identical to
//! what was written, and the never-written-sector path never comes into play since every address
//! is written.

use std::io::Cursor;

use aaruformat::{
    media_type::MediaType,
    writer::{CreateOptions, Writer},
    Reader,
};

#[test]
fn generic_hdd_small_image_round_trips_with_dedup() {
    let options = CreateOptions {
        sectors_per_block: 4,
        compress: false,
        deduplicate: true,
        ..CreateOptions::default()
    };

    let mut writer = Writer::create(Cursor::new(Vec::new()), MediaType::GenericHdd, 8, 512, options).unwrap();
    writer.write_sector(0, &[0x00u8; 512]).unwrap();
    for i in 1..8u64 {
        writer.write_sector(i, &[0xAAu8; 512]).unwrap();
    }
    let (file, _digests) = writer.close().unwrap();

    let mut reader = Reader::open(file).unwrap();
    assert_eq!(reader.sectors(), 8);
    assert_eq!(reader.sector_size(), 512);
    assert_eq!(reader.read_sector(0).unwrap(), vec![0x00u8; 512]);
    for i in 1..8u64 {
        assert_eq!(reader.read_sector(i).unwrap(), vec![0xAAu8; 512], "sector {i} should dedupe to the same content");
    }
}
