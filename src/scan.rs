//! Scan buffer and frame scanner.
//!
//! Bytes arrive from the pipe in fixed-size chunks and are staged here until a
//! frame terminator (the JPEG end-of-image marker, 0xFF 0xD9) is found. The
//! terminator may straddle a chunk boundary, so each scan starts a few bytes
//! before the freshly written chunk. Completed frames are copied out into a
//! caller-owned buffer and the remaining staged bytes are compacted to the
//! front for the next call.
//!
//! The scanner trusts the producer stream: it looks for the terminator only
//! and never checks that the extracted bytes form a well-formed JPEG.

use crate::error::{Result, SourceError};

/// Fixed staging capacity. A single frame larger than this (plus look-back)
/// cannot be extracted and is reported as `OversizedFrame`.
pub const SCAN_CAPACITY: usize = 2 * 1024 * 1024;

/// Fixed read size requested from the pipe per iteration.
pub const CHUNK_SIZE: usize = 256;

/// How far before the newly written chunk each scan starts, so a terminator
/// split across two reads is still seen. Tied to chunk headroom, not to any
/// property of the JPEG payload; anything >= the terminator length works.
const LOOKBACK: usize = 9;

const _: () = assert!(LOOKBACK >= 1, "look-back must cover a split terminator");

const TERMINATOR: [u8; 2] = [0xFF, 0xD9];

/// Bounded byte staging area with a write cursor marking the end of bytes not
/// yet resolved into a complete frame.
pub struct ScanBuffer {
    buf: Box<[u8]>,
    cursor: usize,
    /// Terminator already known to sit inside the staged leftover, found while
    /// compacting after the previous extraction. Lets back-to-back frames that
    /// arrived in one chunk come out on consecutive calls without re-reading.
    pending: Option<usize>,
}

impl ScanBuffer {
    pub fn new() -> Self {
        Self::with_capacity(SCAN_CAPACITY)
    }

    /// Smaller capacities are used by tests to exercise the overflow path.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            cursor: 0,
            pending: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of staged, unresolved bytes.
    pub fn staged(&self) -> usize {
        self.cursor
    }

    /// Terminator found in the leftover of a previous extraction, if any.
    pub fn take_pending(&mut self) -> Option<usize> {
        self.pending.take()
    }

    /// Window for the next chunk read, placed at the write cursor.
    ///
    /// Fails with `OversizedFrame` when a full chunk no longer fits, meaning
    /// the staged bytes grew past capacity without a terminator. The buffer is
    /// reset before returning so the stream stays usable from the next frame
    /// boundary the producer emits.
    pub fn stage_mut(&mut self) -> Result<&mut [u8]> {
        if self.cursor + CHUNK_SIZE > self.buf.len() {
            let needed = self.cursor + CHUNK_SIZE;
            let capacity = self.buf.len();
            self.reset();
            return Err(SourceError::OversizedFrame { needed, capacity });
        }
        Ok(&mut self.buf[self.cursor..self.cursor + CHUNK_SIZE])
    }

    /// Records that `len` bytes were written into `stage_mut()` and scans for
    /// the terminator, starting `LOOKBACK` bytes before the chunk (or at the
    /// start of the buffer when fewer are staged). Returns the offset of the
    /// terminator's final byte when found; the cursor always advances past the
    /// chunk.
    pub fn commit(&mut self, len: usize) -> Option<usize> {
        debug_assert!(len <= CHUNK_SIZE);
        let scan_from = self.cursor.saturating_sub(LOOKBACK);
        self.cursor += len;
        find_terminator(&self.buf[..self.cursor], scan_from)
    }

    /// Copies the frame `[0, end]` into `dest` and compacts the remaining
    /// staged bytes down to index 0. Returns the frame length (`end + 1`).
    ///
    /// A destination smaller than the frame is `OversizedFrame`; the staged
    /// bytes are discarded so the next producer frame starts clean.
    pub fn extract(&mut self, end: usize, dest: &mut [u8]) -> Result<usize> {
        debug_assert!(end < self.cursor);
        let frame_len = end + 1;
        if frame_len > dest.len() {
            let capacity = dest.len();
            self.reset();
            return Err(SourceError::OversizedFrame {
                needed: frame_len,
                capacity,
            });
        }

        dest[..frame_len].copy_from_slice(&self.buf[..frame_len]);
        self.buf.copy_within(frame_len..self.cursor, 0);
        self.cursor -= frame_len;

        // The leftover may already hold the next complete frame (small frames
        // packed into one chunk). Remember its terminator for the next call.
        self.pending = find_terminator(&self.buf[..self.cursor], 0);

        Ok(frame_len)
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.pending = None;
    }
}

impl Default for ScanBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the offset of the terminator's final byte (the 0xD9), scanning
/// `hay[from..]`.
fn find_terminator(hay: &[u8], from: usize) -> Option<usize> {
    hay[from..]
        .windows(2)
        .position(|w| w == TERMINATOR)
        .map(|p| from + p + 1)
}
