//! The decode loop: drives the framer over the byte buffer and publishes
//! packets to the output queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};

use crate::buffer::ByteBuffer;
use crate::error::FrameError;
use crate::framer::Framer;
use crate::packet::Packet;

/// Byte count the buffer must reach before the framer runs.
///
/// Parsing hysteresis only, not a correctness device: it amortises repeated
/// underrun returns while the link trickles bytes in.
pub const DEFAULT_WATERMARK: usize = 500;

/// Minimum decode loop period while the buffer is idle.
pub const DEFAULT_LOOP_DELAY: Duration = Duration::from_millis(10);

/// Process-wide cancellation flag.
///
/// Set once, observed by every loop at its next iteration boundary. Clones
/// share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) has been called anywhere.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receiving side of the decoded packet queue.
///
/// Unbounded FIFO; packets arrive in the order their frames appeared in the
/// byte stream.
pub struct PacketQueue(mpsc::Receiver<Packet>);

impl PacketQueue {
    /// Pop the oldest packet without blocking.
    pub fn try_pop(&self) -> Option<Packet> {
        self.0.try_recv().ok()
    }
}

/// The consumer loop: waits for buffered bytes, frames them, and publishes
/// decoded packets.
pub struct StreamDecoder {
    buffer: Arc<ByteBuffer>,
    framer: Framer,
    out: mpsc::Sender<Packet>,
    watermark: usize,
    loop_delay: Duration,
    cancel: CancellationToken,
}

impl StreamDecoder {
    /// Create a decoder over `buffer` with default tuning, returning it with
    /// the queue its packets will arrive on.
    pub fn new(buffer: Arc<ByteBuffer>, cancel: CancellationToken) -> (Self, PacketQueue) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                buffer,
                framer: Framer::new(),
                out: tx,
                watermark: DEFAULT_WATERMARK,
                loop_delay: DEFAULT_LOOP_DELAY,
                cancel,
            },
            PacketQueue(rx),
        )
    }

    /// Set the parse watermark. A watermark of 1 parses as soon as any byte
    /// arrives, which is what tests and low-rate links want.
    pub fn set_watermark(&mut self, watermark: usize) {
        self.watermark = watermark;
    }

    /// Set the minimum idle loop period.
    pub fn set_loop_delay(&mut self, delay: Duration) {
        self.loop_delay = delay;
    }

    /// Run the decode loop until cancellation.
    ///
    /// Each iteration either emits a packet, drops one byte to resync, or
    /// sleeps on the buffer's condition variable for at most the loop delay.
    /// An in-flight framer call always finishes before the loop exits; the
    /// buffer lock is never held while sleeping.
    pub fn run(mut self) {
        while !self.cancel.is_cancelled() {
            if self.buffer.len() < self.watermark {
                self.buffer.wait_for(self.watermark, self.loop_delay);
                continue;
            }
            match self.framer.poll(&self.buffer) {
                Ok(Some(packet)) => {
                    if self.out.send(packet).is_err() {
                        // Nobody is listening for packets any more.
                        debug!("packet queue closed; stopping the decoder");
                        self.cancel.cancel();
                    }
                }
                Ok(None) => {
                    // Underrun past the watermark: a frame longer than what
                    // has arrived. Wake as soon as the producer appends.
                    let have = self.buffer.len();
                    self.buffer.wait_for(have + 1, self.loop_delay);
                }
                Err(FrameError::ChecksumMismatch { expected, computed }) => {
                    warn!(
                        "dropped a bad packet: checksum {computed:#06X} != footer {expected:#06X}"
                    );
                    let _ = self.buffer.drop_front(1);
                }
                Err(FrameError::Misaligned(_)) => {
                    let _ = self.buffer.drop_front(1);
                }
            }
        }
    }

    /// Start [`run`](Self::run) on its own named OS thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("stream-decoder".to_string())
            .spawn(move || self.run())
    }
}
