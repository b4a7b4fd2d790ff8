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

//! Tape partition and file tables (`TapePartitionBlock` / `TapeFileBlock`): the ordered,
//! fixed-size records a tape image's [`Writer::set_tape_partitions`](crate::writer::Writer::set_tape_partitions)
//! / [`Writer::set_tape_files`](crate::writer::Writer::set_tape_files) calls attach to the image.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::format::{TapeFileRecord, TapePartitionRecord};

/// One tape partition: an inclusive logical-block range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TapePartition {
    pub number: u32,
    pub first_block: u64,
    pub last_block: u64,
}

impl From<TapePartition> for TapePartitionRecord {
    fn from(value: TapePartition) -> Self {
        TapePartitionRecord {
            number: value.number,
            first_block: value.first_block,
            last_block: value.last_block,
        }
    }
}

impl From<TapePartitionRecord> for TapePartition {
    fn from(value: TapePartitionRecord) -> Self {
        TapePartition {
            number: value.number,
            first_block: value.first_block,
            last_block: value.last_block,
        }
    }
}

/// One tape file: an inclusive logical-block range within a partition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TapeFile {
    pub partition: u32,
    pub file_number: u32,
    pub first_block: u64,
    pub last_block: u64,
}

impl From<TapeFile> for TapeFileRecord {
    fn from(value: TapeFile) -> Self {
        TapeFileRecord {
            partition: value.partition,
            file_number: value.file_number,
            first_block: value.first_block,
            last_block: value.last_block,
        }
    }
}

impl From<TapeFileRecord> for TapeFile {
    fn from(value: TapeFileRecord) -> Self {
        TapeFile {
            partition: value.partition,
            file_number: value.file_number,
            first_block: value.first_block,
            last_block: value.last_block,
        }
    }
}
