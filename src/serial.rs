//! Serial producer: reads the sensor link and feeds the byte buffer.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::io::AsyncReadExt;
use tokio_serial::SerialPortBuilderExt;

use crate::buffer::ByteBuffer;
use crate::decoder::CancellationToken;
use crate::error::Result;

/// Link rate of the AIMMS-30 serial output (8N1, no flow control).
pub const DEFAULT_BAUD: u32 = 115_200;

/// How long a read may block before the cancellation flag is re-checked.
const READ_POLL: Duration = Duration::from_millis(100);

/// Open `device` and append everything it sends to `buffer`, in arrival
/// order, until the token is cancelled.
///
/// The sensor streams unconditionally; there is no backpressure to apply on
/// the link. A link failure cancels the token so the rest of the pipeline
/// shuts down with the producer.
pub async fn produce(
    device: &str,
    baud: u32,
    buffer: Arc<ByteBuffer>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut link = match tokio_serial::new(device, baud).open_native_async() {
        Ok(link) => link,
        Err(e) => {
            cancel.cancel();
            return Err(e.into());
        }
    };
    info!("listening on {device} at {baud} baud");

    let mut chunk = [0u8; 256];
    while !cancel.is_cancelled() {
        match tokio::time::timeout(READ_POLL, link.read(&mut chunk)).await {
            // Timed out with nothing to read; re-check cancellation.
            Err(_) => continue,
            Ok(Ok(0)) => {
                warn!("serial link {device} closed");
                cancel.cancel();
                break;
            }
            Ok(Ok(n)) => buffer.extend(&chunk[..n]),
            Ok(Err(e)) => {
                cancel.cancel();
                return Err(e.into());
            }
        }
    }
    Ok(())
}
