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

//! EDC (error detection code) and P/Q ECC (Reed-Solomon error correction) for raw CD-ROM Mode 1
//! and Mode 2 Form 1 sectors (§4.6).
//!
//! EDC is the CRC-32/CD-ROM-EDC algorithm (a reflected CRC-32 with polynomial `0x8001_801B`),
//! computed over the track-form-dependent span named in §4.6 and stored little-endian.
//!
//! P/Q ECC is the Reed-Solomon product code defined by ECMA-130: two interleaved codewords ("P"
//! and "Q") computed over GF(256) with the generator polynomial `x^8 + x^4 + x^3 + x^2 + 1`
//! (`0x11D`). The sector's four address bytes are zeroed for the duration of the computation (they
//! are reconstructed from the sector address rather than protected by ECC) and restored
//! afterwards.

use std::sync::OnceLock;

use crc::{Crc, CRC_32_CD_ROM_EDC};

use crate::CD_RAW_SECTOR_SIZE;

/// The CRC-32 variant the Red Book defines for the EDC field: a reflected CRC-32 with polynomial
/// `0x8001_801B`, computed over a track-form-dependent span of the sector and stored little-endian.
const EDC_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_CD_ROM_EDC);

/// Compute the EDC over `span`, the track-form-dependent byte range named in §4.6 (sync+header+data
/// for Mode 1, subheader+data for Mode 2 Form 1/Form 2).
pub fn compute_edc(span: &[u8]) -> u32 {
    EDC_CRC.checksum(span)
}

/// Byte size of the P-parity field.
pub const ECC_P_SIZE: usize = 172;
/// Byte size of the Q-parity field.
pub const ECC_Q_SIZE: usize = 104;

/// Absolute offset of the P-parity field within a raw 2352-byte sector (shared by Mode 1 and Mode
/// 2 Form 1, which place the field identically).
const P_OFFSET: usize = 0x81C;
/// Absolute offset of the Q-parity field within a raw 2352-byte sector.
const Q_OFFSET: usize = 0x8C8;
/// The byte length of the span P-parity is computed over (address..Q start, exclusive of Q).
const P_SPAN: usize = P_OFFSET - 0x0C;
/// The byte length of the span Q-parity is computed over: address through the end of the
/// just-computed P field (Q's codewords cover P's bytes too).
const Q_SPAN: usize = Q_OFFSET - 0x0C;

fn gf_tables() -> &'static ([u8; 256], [u8; 256]) {
    static TABLES: OnceLock<([u8; 256], [u8; 256])> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut f_lut = [0u8; 256];
        let mut b_lut = [0u8; 256];
        for i in 0..256usize {
            let j = ((i << 1) ^ (if i & 0x80 != 0 { 0x11D } else { 0 })) & 0xFF;
            f_lut[i] = j as u8;
            b_lut[(j ^ i) & 0xFF] = i as u8;
        }
        (f_lut, b_lut)
    })
}

/// One Reed-Solomon parity pass: `major_count` codewords, each summing `minor_count` symbols taken
/// from `src` at stride `minor_inc` (wrapping modulo `src.len()`), writing two parity bytes per
/// codeword into `dest` (the "P-like" byte at `dest[major]`, the "Q-like" byte at
/// `dest[major + major_count]`).
fn ecc_computeblock(
    src: &[u8],
    major_count: usize,
    minor_count: usize,
    major_mult: usize,
    minor_inc: usize,
    dest: &mut [u8],
    f_lut: &[u8; 256],
    b_lut: &[u8; 256],
) {
    let size = src.len();
    for major in 0..major_count {
        let mut index = (major >> 1) * major_mult + (major & 1);
        let mut ecc_a: u8 = 0;
        let mut ecc_b: u8 = 0;
        for _ in 0..minor_count {
            let temp = src[index];
            index += minor_inc;
            if index >= size {
                index -= size;
            }
            ecc_a ^= temp;
            ecc_b ^= temp;
            ecc_a = f_lut[ecc_a as usize];
        }
        ecc_a = b_lut[(f_lut[ecc_a as usize] ^ ecc_b) as usize];
        dest[major] = ecc_a;
        dest[major + major_count] = ecc_a ^ ecc_b;
    }
}

/// Compute and write the P/Q parity fields of a raw 2352-byte CD sector in place. The four address
/// bytes at offset 12 are zeroed for the computation and restored before returning.
pub fn compute_ecc(sector: &mut [u8]) {
    debug_assert_eq!(sector.len(), CD_RAW_SECTOR_SIZE);
    let (f_lut, b_lut) = gf_tables();

    let mut saved_address = [0u8; 4];
    saved_address.copy_from_slice(&sector[12..16]);
    sector[12..16].fill(0);

    let p_src: Vec<u8> = sector[0x0C..0x0C + P_SPAN].to_vec();
    let mut p_out = [0u8; ECC_P_SIZE];
    ecc_computeblock(&p_src, 86, 24, 2, 86, &mut p_out, f_lut, b_lut);
    sector[P_OFFSET..P_OFFSET + ECC_P_SIZE].copy_from_slice(&p_out);

    let q_src: Vec<u8> = sector[0x0C..0x0C + Q_SPAN].to_vec();
    let mut q_out = [0u8; ECC_Q_SIZE];
    ecc_computeblock(&q_src, 52, 43, 86, 88, &mut q_out, f_lut, b_lut);
    sector[Q_OFFSET..Q_OFFSET + ECC_Q_SIZE].copy_from_slice(&q_out);

    sector[12..16].copy_from_slice(&saved_address);
}

/// True if the stored P/Q parity in `sector` matches what [`compute_ecc`] would produce for its
/// current address+data contents.
pub fn verify_ecc(sector: &[u8]) -> bool {
    debug_assert_eq!(sector.len(), CD_RAW_SECTOR_SIZE);
    let stored = sector[P_OFFSET..CD_RAW_SECTOR_SIZE].to_vec();
    let mut scratch = sector.to_vec();
    compute_ecc(&mut scratch);
    scratch[P_OFFSET..CD_RAW_SECTOR_SIZE] == stored[..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sector() -> [u8; CD_RAW_SECTOR_SIZE] {
        let mut sector = [0u8; CD_RAW_SECTOR_SIZE];
        for (i, b) in sector.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        sector
    }

    #[test]
    fn test_compute_then_verify() {
        let mut sector = sample_sector();
        compute_ecc(&mut sector);
        assert!(verify_ecc(&sector));
    }

    #[test]
    fn test_corrupted_data_fails_verification() {
        let mut sector = sample_sector();
        compute_ecc(&mut sector);
        sector[100] ^= 0xFF;
        assert!(!verify_ecc(&sector));
    }

    #[test]
    fn test_address_bytes_excluded_from_ecc() {
        let mut sector = sample_sector();
        compute_ecc(&mut sector);
        sector[12] = 0x99;
        sector[13] = 0x42;
        assert!(verify_ecc(&sector));
    }

    #[test]
    fn test_all_zero_sector_has_zero_parity() {
        let mut sector = [0u8; CD_RAW_SECTOR_SIZE];
        compute_ecc(&mut sector);
        assert!(sector[P_OFFSET..].iter().all(|&b| b == 0));
        assert!(verify_ecc(&sector));
    }

    #[test]
    fn test_edc_matches_known_all_zero_checksum() {
        // A CRC-32/CD-ROM-EDC over an all-zero span is always zero, since the algorithm has a
        // zero initial register and XOR-out.
        assert_eq!(compute_edc(&[0u8; 2064]), 0);
    }

    #[test]
    fn test_edc_detects_single_bit_flip() {
        let mut span = [0u8; 2064];
        let original = compute_edc(&span);
        span[500] ^= 0x01;
        assert_ne!(compute_edc(&span), original);
    }
}
