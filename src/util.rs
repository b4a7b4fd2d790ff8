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

//! Small, self-contained helpers shared by the format, codec and cdrom modules:
//! Windows filetime conversion, BCD encode/decode for CD minute/second/frame
//! fields, and length-prefixed string packing for the side-channel stores.

use std::time::{SystemTime, UNIX_EPOCH};

/// 100-ns ticks between the Windows epoch (1601-01-01) and the Unix epoch (1970-01-01).
const FILETIME_UNIX_EPOCH_DIFF: i64 = 116_444_736_000_000_000;

/// Convert a [SystemTime] to a 64-bit signed Windows filetime (100-ns ticks since 1601-01-01 UTC).
pub fn system_time_to_filetime(time: SystemTime) -> i64 {
    let unix_ticks = match time.duration_since(UNIX_EPOCH) {
        Ok(dur) => dur.as_nanos() as i64 / 100,
        Err(e) => -(e.duration().as_nanos() as i64 / 100),
    };
    unix_ticks + FILETIME_UNIX_EPOCH_DIFF
}

/// Convert a 64-bit signed Windows filetime back to a [SystemTime].
pub fn filetime_to_system_time(filetime: i64) -> SystemTime {
    let unix_ticks = filetime - FILETIME_UNIX_EPOCH_DIFF;
    let nanos = unix_ticks * 100;
    if nanos >= 0 {
        UNIX_EPOCH + std::time::Duration::from_nanos(nanos as u64)
    }
    else {
        UNIX_EPOCH - std::time::Duration::from_nanos((-nanos) as u64)
    }
}

/// Return the current time as a Windows filetime.
pub fn now_filetime() -> i64 {
    system_time_to_filetime(SystemTime::now())
}

/// Encode a byte as two BCD (binary-coded decimal) digits.
pub fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Decode two BCD digits back to a byte. Returns `None` if either nibble is not a valid decimal digit.
pub fn from_bcd(value: u8) -> Option<u8> {
    let hi = value >> 4;
    let lo = value & 0x0F;
    if hi > 9 || lo > 9 {
        None
    }
    else {
        Some(hi * 10 + lo)
    }
}

/// Convert a zero-based logical CD sector address to the BCD-encoded minute/second/frame tuple
/// stored in a sector prefix, per the Red Book `address + 150` convention.
pub fn lba_to_bcd_msf(address: u32) -> (u8, u8, u8) {
    let msf_address = address + 150;
    let frame = (msf_address % 75) as u8;
    let second = ((msf_address / 75) % 60) as u8;
    let minute = (msf_address / 75 / 60) as u8;
    (to_bcd(minute), to_bcd(second), to_bcd(frame))
}

/// Inverse of [lba_to_bcd_msf]. Returns `None` if any BCD field is invalid.
pub fn bcd_msf_to_lba(minute: u8, second: u8, frame: u8) -> Option<u32> {
    let m = from_bcd(minute)? as u32;
    let s = from_bcd(second)? as u32;
    let f = from_bcd(frame)? as u32;
    let msf_address = m * 75 * 60 + s * 75 + f;
    msf_address.checked_sub(150)
}

/// Encode a `&str` as UTF-16LE bytes with no terminator, for packing into the metadata string pool.
pub fn encode_utf16le(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Decode a UTF-16LE byte slice back to a `String`. Malformed surrogate pairs are replaced with
/// `U+FFFD`, matching [char::decode_utf16]'s lossy behavior.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Pack a length-prefixed, NUL-terminated string (as used by the dump-hardware descriptor string
/// fields): a little-endian `u32` length (including the trailing NUL) followed by the bytes.
pub fn pack_nul_terminated(s: &str) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    let mut out = Vec::with_capacity(4 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&bytes);
    out
}

/// Read a length-prefixed, NUL-terminated string written by [pack_nul_terminated] from `reader`,
/// advancing it past the field. Returns an empty string if `len` is zero.
pub fn read_nul_terminated<R: std::io::Read>(reader: &mut R) -> std::io::Result<String> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len == 0 {
        return Ok(String::new());
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    if buf.last() == Some(&0) {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd_round_trip() {
        for v in 0..100u8 {
            assert_eq!(from_bcd(to_bcd(v)), Some(v));
        }
    }

    #[test]
    fn test_lba_msf_round_trip() {
        for lba in [0u32, 1, 74, 75, 149, 4799, 100_000] {
            let (m, s, f) = lba_to_bcd_msf(lba);
            assert_eq!(bcd_msf_to_lba(m, s, f), Some(lba));
        }
    }

    #[test]
    fn test_utf16le_round_trip() {
        let s = "AaruFormat disc";
        let bytes = encode_utf16le(s);
        assert_eq!(decode_utf16le(&bytes), s);
    }

    #[test]
    fn test_filetime_round_trip() {
        let now = SystemTime::now();
        let ft = system_time_to_filetime(now);
        let back = filetime_to_system_time(ft);
        let delta = back
            .duration_since(now)
            .unwrap_or_else(|e| e.duration())
            .as_micros();
        assert!(delta < 1);
    }

    #[test]
    fn test_pack_nul_terminated() {
        let packed = pack_nul_terminated("hello");
        let mut cursor = std::io::Cursor::new(&packed[..]);
        let s = read_nul_terminated(&mut cursor).unwrap();
        assert_eq!(s, "hello");
    }
}
