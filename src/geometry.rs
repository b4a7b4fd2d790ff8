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

//! The C/H/S geometry a [`GeometryBlock`](crate::format::GeometryRecord) describes for block
//! media. Optional: set only through [`Writer::set_geometry`](crate::writer::Writer::set_geometry)
//! and absent from images that never call it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::format::GeometryRecord;

/// Cylinder/head/sectors-per-track geometry for block media.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Geometry {
    pub cylinders: u32,
    pub heads: u32,
    pub sectors_per_track: u32,
}

impl From<Geometry> for GeometryRecord {
    fn from(value: Geometry) -> Self {
        GeometryRecord {
            cylinders: value.cylinders,
            heads: value.heads,
            sectors_per_track: value.sectors_per_track,
        }
    }
}

impl From<GeometryRecord> for Geometry {
    fn from(value: GeometryRecord) -> Self {
        Geometry {
            cylinders: value.cylinders,
            heads: value.heads,
            sectors_per_track: value.sectors_per_track,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_record_round_trip() {
        let geometry = Geometry {
            cylinders: 1024,
            heads: 16,
            sectors_per_track: 63,
        };
        let record: GeometryRecord = geometry.into();
        let back: Geometry = record.into();
        assert_eq!(geometry, back);
    }
}
