/*! AIMMS-30 serial listener daemon.

Reads the sensor's serial stream, decodes telemetry frames, keeps the latest
packet of each type, optionally appends every packet to a JSON-lines file,
and serves the state over HTTP.

```text
$ aimms-serve /dev/ttyUSB0 --http 0.0.0.0:8000 --log flight.jsonl
$ curl http://localhost:8000/aimms/met
```
*/
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use aimms30::decoder::{CancellationToken, PacketQueue, StreamDecoder};
use aimms30::recorder::PacketRecorder;
use aimms30::state::StateSnapshot;
use aimms30::{serial, server, ByteBuffer};

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    #[arg(help = "Serial device the sensor is attached to")]
    serial: String,

    #[arg(long, default_value_t = serial::DEFAULT_BAUD, help = "Serial baud rate")]
    baud: u32,

    #[arg(long = "http", default_value = "0.0.0.0:8000", help = "HTTP listen address")]
    http: SocketAddr,

    #[arg(
        long = "log",
        short = 'l',
        help = "Append each decoded packet to this JSON-lines file"
    )]
    log: Option<PathBuf>,

    #[arg(long, default_value_t = 500, help = "Bytes to buffer before parsing")]
    watermark: usize,

    #[arg(short = 'v', action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,

    #[arg(short = 'd', long, help = "Print every decoded packet to the console")]
    debug: bool,
}

fn sink_loop(
    queue: PacketQueue,
    state: Arc<StateSnapshot>,
    recorder: Option<PacketRecorder>,
    print: bool,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        match queue.try_pop() {
            Some(packet) => {
                if let Some(recorder) = &recorder {
                    recorder.record(&packet);
                }
                if print {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&packet).unwrap_or_default()
                    );
                }
                state.update(packet);
            }
            None => std::thread::sleep(Duration::from_millis(10)),
        }
    }
    if let Some(recorder) = recorder {
        recorder.close();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    env_logger::Builder::new()
        .filter_level(match opt.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .parse_default_env()
        .init();

    let cancel = CancellationToken::new();
    let buffer = Arc::new(ByteBuffer::new());
    let state = Arc::new(StateSnapshot::new());

    let (mut decoder, queue) = StreamDecoder::new(Arc::clone(&buffer), cancel.clone());
    decoder.set_watermark(opt.watermark);
    let decoder_thread = decoder.spawn()?;

    let recorder = match &opt.log {
        Some(path) => Some(PacketRecorder::create(path, cancel.clone())?),
        None => None,
    };

    let sink_thread = {
        let state = Arc::clone(&state);
        let cancel = cancel.clone();
        let print = opt.debug;
        std::thread::Builder::new()
            .name("packet-sink".to_string())
            .spawn(move || sink_loop(queue, state, recorder, print, cancel))?
    };

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted; shutting down");
            }
            cancel.cancel();
        }
    });

    let producer = tokio::spawn({
        let buffer = Arc::clone(&buffer);
        let cancel = cancel.clone();
        let device = opt.serial.clone();
        let baud = opt.baud;
        async move { serial::produce(&device, baud, buffer, cancel).await }
    });

    // Serves until the token is cancelled, by ctrl-c or by a failing thread.
    let served = server::serve(opt.http, Arc::clone(&state), cancel.clone()).await;
    cancel.cancel();

    if let Err(e) = producer.await? {
        error!("serial producer failed: {e}");
    }
    decoder_thread.join().ok();
    sink_thread.join().ok();
    served?;
    Ok(())
}
