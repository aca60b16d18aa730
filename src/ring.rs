//! Fixed-capacity byte ring buffer with two access modes
//!
//! `RingBuffer` is the exclusive-access ("linear") mode: block-copy
//! operations on `&mut self`, for callers that already hold exclusivity.
//! `SharedRing` wraps it in a lock and holds that lock for the entire
//! duration of each multi-byte operation, so a concurrent observer can
//! never see a partially updated head/tail pair. `SharedRing::lock`
//! exposes the guard so code inside the critical section can compose
//! with the linear variants.

use crate::error::{Error, Result};
use parking_lot::{Mutex, MutexGuard};

/// Fixed-capacity circular byte queue
///
/// One storage slot is sacrificed to disambiguate full from empty:
/// a buffer built with `with_capacity(cap)` owns `cap + 1` slots and
/// holds at most `cap` bytes.
///
/// # Invariants
///
/// - `head` and `tail` are always in `[0, storage.len())`
/// - empty ⇔ `head == tail`
/// - full ⇔ `(tail + 1) % storage.len() == head`
pub struct RingBuffer {
    storage: Box<[u8]>,
    /// Index of the next byte to read
    head: usize,
    /// Index of the next free slot to write
    tail: usize,
}

impl RingBuffer {
    /// Create an empty ring buffer that can hold `cap` bytes
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            storage: vec![0u8; cap + 1].into_boxed_slice(),
            head: 0,
            tail: 0,
        }
    }

    /// Size of the backing storage (`cap + 1`)
    #[inline]
    fn size(&self) -> usize {
        self.storage.len()
    }

    /// Maximum number of bytes the buffer can hold
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        (self.tail + 1) % self.size() == self.head
    }

    /// Number of bytes that can still be written
    #[inline]
    pub fn free_space(&self) -> usize {
        if self.head <= self.tail {
            self.size() - (self.tail - self.head) - 1
        } else {
            self.head - self.tail - 1
        }
    }

    /// Number of bytes currently stored
    #[inline]
    pub fn len(&self) -> usize {
        self.capacity() - self.free_space()
    }

    fn push_byte(&mut self, byte: u8) -> Result<()> {
        if self.is_full() {
            return Err(Error::Full);
        }
        self.storage[self.tail] = byte;
        self.tail = (self.tail + 1) % self.size();
        Ok(())
    }

    fn pop_byte(&mut self) -> Result<u8> {
        if self.is_empty() {
            return Err(Error::Empty);
        }
        let byte = self.storage[self.head];
        self.head = (self.head + 1) % self.size();
        Ok(byte)
    }

    /// Write `data` as at-most-two contiguous block copies
    ///
    /// The copy is split at the physical end of the backing array when
    /// the write wraps. Fails with `Error::Full` and no mutation when
    /// fewer than `data.len()` bytes of free space exist.
    ///
    /// Caller must hold exclusive access; `&mut self` enforces that at
    /// compile time.
    pub fn write_linear(&mut self, data: &[u8]) -> Result<()> {
        if self.free_space() < data.len() {
            return Err(Error::Full);
        }
        let size = self.size();
        let first = data.len().min(size - self.tail);
        self.storage[self.tail..self.tail + first].copy_from_slice(&data[..first]);
        self.tail = (self.tail + first) % size;
        let rest = &data[first..];
        if !rest.is_empty() {
            // Wrapped: second copy starts at the physical beginning
            self.storage[..rest.len()].copy_from_slice(rest);
            self.tail = rest.len();
        }
        Ok(())
    }

    /// Read exactly `dest.len()` bytes as at-most-two block copies
    ///
    /// Fails with `Error::Empty` and no mutation when fewer than
    /// `dest.len()` bytes are stored.
    pub fn read_linear(&mut self, dest: &mut [u8]) -> Result<()> {
        if self.len() < dest.len() {
            return Err(Error::Empty);
        }
        let size = self.size();
        let first = dest.len().min(size - self.head);
        dest[..first].copy_from_slice(&self.storage[self.head..self.head + first]);
        self.head = (self.head + first) % size;
        let rest = dest.len() - first;
        if rest > 0 {
            dest[first..].copy_from_slice(&self.storage[..rest]);
            self.head = rest;
        }
        Ok(())
    }

    /// Drain every stored byte into `dest`, returning the count
    ///
    /// Never fails: an empty buffer yields 0. Sizing `dest` to
    /// `capacity()` guarantees a complete drain.
    pub fn flush_linear(&mut self, dest: &mut [u8]) -> usize {
        let n = self.len().min(dest.len());
        // Cannot fail: at least n bytes are stored
        let _ = self.read_linear(&mut dest[..n]);
        n
    }
}

/// Lock-guarded ring buffer for use across execution contexts
///
/// The concurrency-safe counterpart of `RingBuffer`: each multi-byte
/// operation takes the lock for its whole duration, with release
/// guaranteed on every exit path by the RAII guard. Failure checks
/// happen up front under the same lock, so a failed call leaves the
/// buffer untouched.
pub struct SharedRing {
    inner: Mutex<RingBuffer>,
}

impl SharedRing {
    /// Create an empty shared ring that can hold `cap` bytes
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(RingBuffer::with_capacity(cap)),
        }
    }

    /// Write all of `data`, byte by byte, under the lock
    ///
    /// Fails with `Error::Full` and no mutation when free space is
    /// insufficient for the whole span.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let mut ring = self.inner.lock();
        if ring.free_space() < data.len() {
            return Err(Error::Full);
        }
        for &byte in data {
            ring.push_byte(byte)?;
        }
        Ok(())
    }

    /// Read exactly `dest.len()` bytes, byte by byte, under the lock
    ///
    /// Fails with `Error::Empty` and no mutation when fewer bytes are
    /// stored than requested.
    pub fn read(&self, dest: &mut [u8]) -> Result<()> {
        let mut ring = self.inner.lock();
        if ring.len() < dest.len() {
            return Err(Error::Empty);
        }
        for slot in dest.iter_mut() {
            *slot = ring.pop_byte()?;
        }
        Ok(())
    }

    /// Drain every stored byte into `dest`, returning the count
    ///
    /// Never fails; an empty buffer yields 0.
    pub fn flush(&self, dest: &mut [u8]) -> usize {
        let mut ring = self.inner.lock();
        let n = ring.len().min(dest.len());
        for slot in dest.iter_mut().take(n) {
            // Cannot fail: at least n bytes are stored
            *slot = ring.pop_byte().unwrap_or(0);
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().is_full()
    }

    pub fn free_space(&self) -> usize {
        self.inner.lock().free_space()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Enter the critical section explicitly
    ///
    /// The guard derefs to `RingBuffer`, so callers that need several
    /// operations under one lock acquisition use the linear variants
    /// through it.
    pub fn lock(&self) -> MutexGuard<'_, RingBuffer> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_full_laws() {
        let mut rb = RingBuffer::with_capacity(7);
        assert!(rb.is_empty());
        assert!(!rb.is_full());
        assert_eq!(rb.free_space(), 7);

        rb.write_linear(&[0u8; 7]).unwrap();
        assert!(rb.is_full());
        assert!(!rb.is_empty());
        assert_eq!(rb.free_space(), 0);
        assert_eq!(rb.len(), 7);
    }

    #[test]
    fn test_free_space_identity() {
        let mut rb = RingBuffer::with_capacity(7);
        for step in 0..20 {
            rb.write_linear(&[step as u8, step as u8]).unwrap();
            assert_eq!(rb.free_space() + rb.len(), 7);
            let mut one = [0u8];
            rb.read_linear(&mut one).unwrap();
            assert_eq!(rb.free_space() + rb.len(), 7);
        }
    }

    #[test]
    fn test_fifo_order_linear() {
        let mut rb = RingBuffer::with_capacity(15);
        rb.write_linear(b"hello").unwrap();
        rb.write_linear(b" world").unwrap();
        let mut out = [0u8; 11];
        rb.read_linear(&mut out).unwrap();
        assert_eq!(&out, b"hello world");
    }

    #[test]
    fn test_fifo_order_shared() {
        let ring = SharedRing::with_capacity(15);
        ring.write(b"hello").unwrap();
        ring.write(b" world").unwrap();
        let mut out = [0u8; 11];
        ring.read(&mut out).unwrap();
        assert_eq!(&out, b"hello world");
    }

    #[test]
    fn test_failed_write_leaves_state_untouched() {
        let mut rb = RingBuffer::with_capacity(7);
        rb.write_linear(b"abcde").unwrap();
        assert!(matches!(rb.write_linear(b"xyz"), Err(Error::Full)));
        assert_eq!(rb.free_space(), 2);

        let mut out = [0u8; 7];
        let n = rb.flush_linear(&mut out);
        assert_eq!(&out[..n], b"abcde");
    }

    #[test]
    fn test_failed_shared_write_leaves_state_untouched() {
        let ring = SharedRing::with_capacity(7);
        ring.write(b"abcde").unwrap();
        assert!(matches!(ring.write(b"xyz"), Err(Error::Full)));
        assert_eq!(ring.free_space(), 2);

        let mut out = [0u8; 7];
        let n = ring.flush(&mut out);
        assert_eq!(&out[..n], b"abcde");
    }

    #[test]
    fn test_failed_read_leaves_state_untouched() {
        let ring = SharedRing::with_capacity(7);
        ring.write(b"ab").unwrap();
        let mut out = [0u8; 5];
        assert!(matches!(ring.read(&mut out), Err(Error::Empty)));
        let mut two = [0u8; 2];
        ring.read(&mut two).unwrap();
        assert_eq!(&two, b"ab");
    }

    #[test]
    fn test_flush_round_trip() {
        let mut rb = RingBuffer::with_capacity(31);
        rb.write_linear(b"round trip payload").unwrap();
        let mut out = [0u8; 31];
        let n = rb.flush_linear(&mut out);
        assert_eq!(n, 18);
        assert_eq!(&out[..n], b"round trip payload");
        assert!(rb.is_empty());

        // Empty flush succeeds with zero length
        assert_eq!(rb.flush_linear(&mut out), 0);
    }

    // Capacity 8 (7 usable): write 5, read 3, write 5 forces the tail to
    // wrap past the array end. Linear and safe paths must agree byte for
    // byte afterwards.
    #[test]
    fn test_wraparound_linear_and_safe_agree() {
        let mut linear = RingBuffer::with_capacity(7);
        linear.write_linear(&[1, 2, 3, 4, 5]).unwrap();
        let mut skip = [0u8; 3];
        linear.read_linear(&mut skip).unwrap();
        linear.write_linear(&[6, 7, 8, 9, 10]).unwrap();

        let shared = SharedRing::with_capacity(7);
        shared.write(&[1, 2, 3, 4, 5]).unwrap();
        shared.read(&mut skip).unwrap();
        shared.write(&[6, 7, 8, 9, 10]).unwrap();

        let mut from_linear = [0u8; 7];
        let n1 = linear.flush_linear(&mut from_linear);
        let mut from_shared = [0u8; 7];
        let n2 = shared.flush(&mut from_shared);

        assert_eq!(n1, 7);
        assert_eq!(n2, 7);
        assert_eq!(from_linear, from_shared);
        assert_eq!(&from_linear, &[4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_read_linear_wraps_split_copy() {
        let mut rb = RingBuffer::with_capacity(7);
        rb.write_linear(&[1, 2, 3, 4, 5, 6]).unwrap();
        let mut skip = [0u8; 5];
        rb.read_linear(&mut skip).unwrap();
        // head near the physical end; this write and read both wrap
        rb.write_linear(&[7, 8, 9, 10]).unwrap();
        let mut out = [0u8; 5];
        rb.read_linear(&mut out).unwrap();
        assert_eq!(&out, &[6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_lock_composes_with_linear_variants() {
        let ring = SharedRing::with_capacity(7);
        {
            let mut guard = ring.lock();
            guard.write_linear(b"abc").unwrap();
            guard.write_linear(b"de").unwrap();
        }
        let mut out = [0u8; 5];
        ring.read(&mut out).unwrap();
        assert_eq!(&out, b"abcde");
    }
}
