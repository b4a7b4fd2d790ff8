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

//! The 16-byte CD-ROM sector prefix: a fixed sync pattern, the sector's address encoded as a BCD
//! minute/second/frame, and a one-byte mode marker (§4.6).

use crate::util::{bcd_msf_to_lba, lba_to_bcd_msf};

/// The fixed 12-byte Red Book sync pattern every raw CD sector begins with.
pub const SYNC_PATTERN: [u8; 12] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// Build the 16-byte prefix (sync + BCD MSF + mode) for a sector at `address`.
pub fn build_prefix(address: u32, mode: u8) -> [u8; 16] {
    let mut prefix = [0u8; 16];
    prefix[..12].copy_from_slice(&SYNC_PATTERN);
    let (m, s, f) = lba_to_bcd_msf(address);
    prefix[12] = m;
    prefix[13] = s;
    prefix[14] = f;
    prefix[15] = mode;
    prefix
}

/// True if `prefix` matches the deterministic function of `address` and `mode` (§4.6: "Prefix
/// correctness = sync pattern ... mode byte `0x0F == expected` ... BCD minute/second/frame ...
/// equals sectorAddress + 150").
pub fn verify_prefix(prefix: &[u8; 16], address: u32, mode: u8) -> bool {
    if prefix[..12] != SYNC_PATTERN {
        return false;
    }
    if prefix[15] & 0x0F != mode & 0x0F {
        return false;
    }
    match bcd_msf_to_lba(prefix[12], prefix[13], prefix[14]) {
        Some(decoded) => decoded == address,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_then_verify() {
        for address in [0u32, 1, 149, 4799, 100_000] {
            let prefix = build_prefix(address, 1);
            assert!(verify_prefix(&prefix, address, 1));
            assert!(!verify_prefix(&prefix, address + 1, 1));
            assert!(!verify_prefix(&prefix, address, 2));
        }
    }

    #[test]
    fn test_all_zero_never_verifies() {
        let prefix = [0u8; 16];
        assert!(!verify_prefix(&prefix, 0, 1));
    }
}
