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

//! The CD-ROM long-sector codec (C6): splits a raw 2352-byte sector into its sync/header prefix,
//! user-data payload, and EDC/ECC suffix, storing only the bytes that cannot be reconstructed from
//! the sector address (§4.6).
//!
//! - [`sector`] — the sync pattern, prefix build/verify, and BCD MSF helpers.
//! - [`ecc`] — the EDC (CRC-32 variant) and P/Q Reed-Solomon parity used to verify and, on
//!   mismatch, reconstruct the suffix.
//! - [`splitter`] — orchestrates the two above per [`TrackType`](crate::tracks::TrackType) into
//!   the [`splitter::SplitSector`] a [`Writer`](crate::writer::Writer) stores.

pub mod ecc;
pub mod sector;
pub mod splitter;

/// Fixed record size of a stored CD sector prefix (sync + MSF + mode).
pub const CD_PREFIX_SIZE: usize = 16;
/// Fixed record size of a stored CD sector suffix (EDC + zero + P + Q, or the Mode 2 equivalent
/// padded to the same size for uniform addressing — see [`splitter`] module docs).
pub const CD_SUFFIX_SIZE: usize = 288;
/// Fixed record size of a stored CD-ROM XA Mode 2 subheader.
pub const CD_SUBHEADER_SIZE: usize = 8;

pub use splitter::{reconstruct_sector, split_sector, SplitSector};
