//! Append-only JSON-lines recorder for decoded packets.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error};

use crate::decoder::CancellationToken;
use crate::error::Result;
use crate::packet::Packet;

/// Writes one JSON object per decoded packet, newline-delimited, to a file
/// opened in append mode.
///
/// Writing happens on a dedicated thread fed by an unbounded queue, so
/// [`record`](Self::record) never blocks the caller on disk I/O. A write
/// failure cancels the shared token and stops the thread.
pub struct PacketRecorder {
    tx: mpsc::Sender<Packet>,
    handle: JoinHandle<()>,
}

impl PacketRecorder {
    /// Open (or create) `path` for appending and start the writer thread.
    pub fn create(path: impl AsRef<Path>, cancel: CancellationToken) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!("recording packets to {}", path.display());

        let (tx, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("packet-recorder".to_string())
            .spawn(move || Self::dump(file, rx, cancel))?;
        Ok(Self { tx, handle })
    }

    fn dump(mut file: File, rx: mpsc::Receiver<Packet>, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            let packet = match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(packet) => packet,
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            };
            let line = match serde_json::to_string(&packet) {
                Ok(line) => line,
                Err(e) => {
                    error!("could not serialize a {} packet: {e}", packet.packet_type());
                    continue;
                }
            };
            if let Err(e) = writeln!(file, "{line}") {
                error!("packet log write failed: {e}");
                cancel.cancel();
                break;
            }
        }
    }

    /// Queue a packet for recording. Never blocks; silently drops the packet
    /// only if the writer thread has already stopped.
    pub fn record(&self, packet: &Packet) {
        let _ = self.tx.send(packet.clone());
    }

    /// Flush the queue and stop the writer thread.
    pub fn close(self) {
        let Self { tx, handle } = self;
        drop(tx);
        let _ = handle.join();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::schema::PacketType;
    use crate::testutil;

    #[test]
    fn records_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packets.jsonl");

        let cancel = CancellationToken::new();
        let recorder = PacketRecorder::create(&path, cancel).unwrap();
        recorder.record(&testutil::sample_packet(PacketType::Met));
        recorder.record(&testutil::sample_packet(PacketType::Purge));
        recorder.close();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "met");
        assert_eq!(first["good_checksum"], true);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["type"], "purge");
        assert_eq!(second["flow"], -321);
    }

    #[test]
    fn appends_across_recorders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packets.jsonl");

        for _ in 0..2 {
            let recorder = PacketRecorder::create(&path, CancellationToken::new()).unwrap();
            recorder.record(&testutil::sample_packet(PacketType::Temp));
            recorder.close();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
