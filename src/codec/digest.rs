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

//! The whole-image running digests a [`Writer`](crate::writer::Writer) can compute as sectors are
//! written (`CreateOptions::md5`/`sha1`/`sha256`/`spamsum`). Content-addressed deduplication in
//! [`dedup`](crate::dedup) always uses SHA-256 regardless of which of these are enabled; these
//! digests exist purely to be reported alongside the image for independent verification and are
//! permanently disabled the moment a container is reopened for append (§4.7).

use md5::{Digest as Md5DigestTrait, Md5};
use sha1::Sha1;
use sha2::Sha256;

/// Running whole-image digests, one per algorithm the caller opted into via [`CreateOptions`](crate::writer::CreateOptions).
///
/// MD5/SHA-1/SHA-256 are hashed incrementally as sectors stream in. SpamSum (`ssdeep`) has no
/// incremental API in the crate this is built on, so when enabled its input is buffered in
/// memory and hashed once at [`finalize`](Self::finalize); this is a deliberate memory/streaming
/// trade-off, acceptable because SpamSum is opt-in and off by default.
#[derive(Default)]
pub struct RunningDigests {
    md5: Option<Md5>,
    sha1: Option<Sha1>,
    sha256: Option<Sha256>,
    spamsum_buffer: Option<Vec<u8>>,
}

impl RunningDigests {
    pub fn new(md5: bool, sha1: bool, sha256: bool, spamsum: bool) -> Self {
        Self {
            md5: md5.then(Md5::new),
            sha1: sha1.then(Sha1::new),
            sha256: sha256.then(Sha256::new),
            spamsum_buffer: spamsum.then(Vec::new),
        }
    }

    /// True if at least one digest is active.
    pub fn is_active(&self) -> bool {
        self.md5.is_some() || self.sha1.is_some() || self.sha256.is_some() || self.spamsum_buffer.is_some()
    }

    /// Feed `bytes` into every active digest, in sector-write order.
    pub fn update(&mut self, bytes: &[u8]) {
        if let Some(d) = self.md5.as_mut() {
            d.update(bytes);
        }
        if let Some(d) = self.sha1.as_mut() {
            d.update(bytes);
        }
        if let Some(d) = self.sha256.as_mut() {
            d.update(bytes);
        }
        if let Some(buf) = self.spamsum_buffer.as_mut() {
            buf.extend_from_slice(bytes);
        }
    }

    /// Consume the accumulator, returning each active digest's final value.
    pub fn finalize(self) -> DigestResults {
        DigestResults {
            md5: self.md5.map(|d| d.finalize().to_vec()),
            sha1: self.sha1.map(|d| d.finalize().to_vec()),
            sha256: self.sha256.map(|d| d.finalize().to_vec()),
            spamsum: self.spamsum_buffer.map(|buf| ssdeep::hash(&buf).unwrap_or_default()),
        }
    }
}

/// The finalized whole-image digests, stored as a [`ChecksumBlock`](crate::format::ChecksumEntry)
/// sequence and returned from [`Reader::digests`](crate::reader::Reader::digests).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestResults {
    pub md5: Option<Vec<u8>>,
    pub sha1: Option<Vec<u8>>,
    pub sha256: Option<Vec<u8>>,
    pub spamsum: Option<String>,
}

/// Compute the SHA-256 of `data`, the fixed hash used by [`DedupStore`](crate::dedup::DedupStore)
/// for content addressing regardless of which whole-image digests are enabled.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_stable() {
        let a = sha256(b"hello world");
        let b = sha256(b"hello world");
        assert_eq!(a, b);
        assert_ne!(a, sha256(b"hello worlds"));
    }

    #[test]
    fn test_running_digests_selective_activation() {
        let mut digests = RunningDigests::new(true, false, true, false);
        digests.update(b"some sector bytes");
        let results = digests.finalize();
        assert!(results.md5.is_some());
        assert!(results.sha1.is_none());
        assert!(results.sha256.is_some());
        assert!(results.spamsum.is_none());
    }

    #[test]
    fn test_no_digests_inactive() {
        let digests = RunningDigests::new(false, false, false, false);
        assert!(!digests.is_active());
    }
}
