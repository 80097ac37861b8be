//! Synthetic traffic generation and consumption
//!
//! The download side produces exactly the requested number of random bytes
//! as a lazy stream of bounded segments. Nothing is generated until the
//! consumer polls, so a slow socket pauses generation instead of buffering.
//! The upload side counts an inbound stream and throws the bytes away.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use rand::RngCore;
use std::convert::Infallible;
use std::fmt;

/// Size of each generated segment
pub const SEGMENT_SIZE: usize = 64 * 1024;

/// Download size used when the request does not name one
pub const DEFAULT_DOWNLOAD_SIZE: u64 = 20 * crate::defaults::MEBIBYTE;

/// Byte count a download request actually gets: the default when absent,
/// and never less than one byte.
pub fn effective_download_size(requested: Option<u64>) -> u64 {
    requested.unwrap_or(DEFAULT_DOWNLOAD_SIZE).max(1)
}

/// Splits a total length into segment lengths that add up to it exactly
#[derive(Debug, Clone)]
pub struct SegmentPlan {
    remaining: u64,
    segment: usize,
}

impl SegmentPlan {
    pub fn new(total: u64, segment: usize) -> Self {
        Self {
            remaining: total,
            segment: segment.max(1),
        }
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for SegmentPlan {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let len = self.remaining.min(self.segment as u64) as usize;
        self.remaining -= len as u64;
        Some(len)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.remaining.div_ceil(self.segment as u64);
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        (count, Some(count))
    }
}

/// `len` bytes from the thread-local CSPRNG
pub fn random_bytes(len: usize) -> Bytes {
    let mut buf = vec![0u8; len];
    rand::rng().fill_bytes(&mut buf);
    Bytes::from(buf)
}

/// A single random buffer of `size` bytes, filled segment by segment
pub fn random_payload(size: u64) -> Bytes {
    let mut buf = vec![0u8; size as usize];
    let mut rng = rand::rng();
    for chunk in buf.chunks_mut(SEGMENT_SIZE) {
        rng.fill_bytes(chunk);
    }
    Bytes::from(buf)
}

/// Stream of exactly `length` random bytes in segments of at most
/// [`SEGMENT_SIZE`]. A length of zero yields an empty stream.
pub fn generate_stream(length: u64) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream::iter(SegmentPlan::new(length, SEGMENT_SIZE)).map(|len| Ok(random_bytes(len)))
}

/// An inbound stream failed before it ended
#[derive(Debug)]
pub struct StreamAborted<E> {
    /// Bytes read before the failure
    pub received: u64,
    pub source: E,
}

impl<E: fmt::Display> fmt::Display for StreamAborted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream aborted after {} bytes: {}", self.received, self.source)
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for StreamAborted<E> {}

/// Read `stream` to its end, discarding the data, and return the number of
/// bytes seen. A stream error ends counting and carries the partial count.
pub async fn count_stream<S, B, E>(stream: S) -> Result<u64, StreamAborted<E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut received: u64 = 0;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(data) => received += data.as_ref().len() as u64,
            Err(source) => return Err(StreamAborted { received, source }),
        }
    }

    Ok(received)
}
