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

//! A tape image written with a handful of widely separated block addresses. The sparse DDT the
//! writer accumulates for tape media must materialize, on close, into a dense table sized to the
//! highest block actually written, with every untouched address in between reading back as a
//! zero sector and the partition/file tables surviving the round trip.

use std::io::Cursor;

use aaruformat::{
    media_type::MediaType,
    tape::{TapeFile, TapePartition},
    writer::{CreateOptions, Writer},
    Reader,
};

#[test]
fn tape_sparse_writes_materialize_dense_and_preserve_layout() {
    const SECTOR_SIZE: u32 = 512;
    const HIGHEST_BLOCK: u64 = 1_000;

    let mut writer = Writer::create(
        Cursor::new(Vec::new()),
        MediaType::Lto,
        HIGHEST_BLOCK + 1,
        SECTOR_SIZE,
        CreateOptions::default(),
    )
    .unwrap();

    writer.write_sector(0, &[0x11u8; SECTOR_SIZE as usize]).unwrap();
    writer.write_sector(10, &[0x22u8; SECTOR_SIZE as usize]).unwrap();
    writer.write_sector(HIGHEST_BLOCK, &[0x33u8; SECTOR_SIZE as usize]).unwrap();

    writer
        .set_tape_partitions(vec![TapePartition { number: 0, first_block: 0, last_block: HIGHEST_BLOCK }])
        .unwrap();
    writer
        .set_tape_files(vec![TapeFile { partition: 0, file_number: 0, first_block: 0, last_block: HIGHEST_BLOCK }])
        .unwrap();

    let (file, _digests) = writer.close().unwrap();

    let mut reader = Reader::open(file).unwrap();
    assert_eq!(reader.sectors(), HIGHEST_BLOCK + 1);
    assert_eq!(reader.read_sector(0).unwrap(), vec![0x11u8; SECTOR_SIZE as usize]);
    assert_eq!(reader.read_sector(10).unwrap(), vec![0x22u8; SECTOR_SIZE as usize]);
    assert_eq!(reader.read_sector(HIGHEST_BLOCK).unwrap(), vec![0x33u8; SECTOR_SIZE as usize]);
    assert_eq!(reader.read_sector(5).unwrap(), vec![0u8; SECTOR_SIZE as usize], "untouched block must read back zeroed");
    assert_eq!(reader.read_sector(999).unwrap(), vec![0u8; SECTOR_SIZE as usize], "untouched block must read back zeroed");

    let partitions = reader.tape_partitions();
    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0].first_block, 0);
    assert_eq!(partitions[0].last_block, HIGHEST_BLOCK);

    let files = reader.tape_files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].first_block, 0);
    assert_eq!(files[0].last_block, HIGHEST_BLOCK);
}
