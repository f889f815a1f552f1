//! Thread-safe byte FIFO connecting the serial producer to the frame decoder.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::{Buf, BytesMut};

use crate::error::{AimmsError, Result};

/// A byte FIFO guarded by a single mutex.
///
/// One producer appends, one consumer reads and drops. The backing store is
/// contiguous, so [`read`](Self::read) is a straight copy and
/// [`drop_front`](Self::drop_front) is a head-pointer advance. A condition
/// variable signalled on every append lets the consumer sleep until a
/// watermark of bytes has arrived instead of polling.
///
/// The buffer is not capped: the sensor streams unconditionally, so a stalled
/// consumer grows the buffer rather than dropping link bytes.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    data: Mutex<BytesMut>,
    grew: Condvar,
}

impl ByteBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, BytesMut> {
        // A poisoned lock only means a panicking thread held it; the byte
        // FIFO itself is still structurally valid.
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a single byte.
    pub fn push(&self, byte: u8) {
        self.extend(&[byte]);
    }

    /// Append a slice of bytes, preserving their order.
    pub fn extend(&self, bytes: &[u8]) {
        let mut data = self.locked();
        data.extend_from_slice(bytes);
        drop(data);
        self.grew.notify_all();
    }

    /// Current number of buffered bytes.
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    /// True when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }

    /// Copy out the bytes `[start, end)` without consuming them.
    pub fn read(&self, start: usize, end: usize) -> Result<Vec<u8>> {
        let data = self.locked();
        if start > end || end > data.len() {
            return Err(AimmsError::OutOfBounds {
                start,
                end,
                len: data.len(),
            });
        }
        Ok(data[start..end].to_vec())
    }

    /// Remove the leading `count` bytes. A count of zero is a no-op.
    pub fn drop_front(&self, count: usize) -> Result<()> {
        let mut data = self.locked();
        if count > data.len() {
            return Err(AimmsError::OutOfBounds {
                start: 0,
                end: count,
                len: data.len(),
            });
        }
        data.advance(count);
        Ok(())
    }

    /// Block until at least `need` bytes are buffered or `timeout` elapses.
    ///
    /// Returns the buffered length on wakeup. Spurious wakeups are absorbed;
    /// the lock is never held by the caller afterwards.
    pub fn wait_for(&self, need: usize, timeout: Duration) -> usize {
        let deadline = std::time::Instant::now() + timeout;
        let mut data = self.locked();
        while data.len() < need {
            let now = std::time::Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = self
                .grew
                .wait_timeout(data, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            data = guard;
        }
        data.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::Arc;

    #[test]
    fn fifo_order_preserved() {
        let buffer = ByteBuffer::new();
        buffer.push(1);
        buffer.extend(&[2, 3, 4]);
        buffer.push(5);

        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.read(0, 5).unwrap(), vec![1, 2, 3, 4, 5]);
        // Reading does not consume.
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn drop_front_advances_head() {
        let buffer = ByteBuffer::new();
        buffer.extend(&[1, 2, 3, 4, 5]);

        buffer.drop_front(2).unwrap();
        assert_eq!(buffer.read(0, 3).unwrap(), vec![3, 4, 5]);

        buffer.drop_front(0).unwrap();
        assert_eq!(buffer.len(), 3);

        buffer.drop_front(3).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn out_of_bounds_reads_fail() {
        let buffer = ByteBuffer::new();
        buffer.extend(&[1, 2, 3]);

        assert!(buffer.read(0, 4).is_err());
        assert!(buffer.read(2, 1).is_err());
        assert!(buffer.drop_front(4).is_err());
        // Failed operations leave the contents alone.
        assert_eq!(buffer.read(0, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn wait_for_times_out_when_starved() {
        let buffer = ByteBuffer::new();
        buffer.push(1);
        let len = buffer.wait_for(10, Duration::from_millis(20));
        assert_eq!(len, 1);
    }

    #[test]
    fn wait_for_wakes_on_append() {
        let buffer = Arc::new(ByteBuffer::new());
        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for b in 0..4u8 {
                    buffer.push(b);
                    std::thread::sleep(Duration::from_millis(1));
                }
            })
        };
        let len = buffer.wait_for(4, Duration::from_secs(5));
        assert!(len >= 4);
        producer.join().unwrap();
    }
}
