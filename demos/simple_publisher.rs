// Simple RTMP Publisher
//
// Connects to an RTMP server, negotiates a stream and pushes synthetic
// video payloads at roughly 30 fps for a few seconds.
//
// Usage:
//   cargo run --example simple_publisher -- rtmp://localhost/live [seconds]

use rtmp::{
    ClientConfig, ConnectionState, Frame, PublisherError, PublisherListener, PublisherOutput,
    PublisherState, Result, RtmpPublisher, StreamTarget,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use log::{error, info, warn};

struct LoggingListener;

impl PublisherListener for LoggingListener {
    fn on_state(&self, state: &PublisherState) {
        info!("Publisher state: {}", state);
    }

    fn on_connection_state(&self, state: &ConnectionState) {
        info!("Connection state: {}", state);
    }

    fn on_output(&self, output: &PublisherOutput) {
        log::debug!("Sent {} bytes at {} ms", output.bytes.len(), output.timestamp);
    }

    fn on_error(&self, error: &PublisherError) {
        error!("Publisher error: {}", error.message);
    }
}

/// A fake AVC NAL unit payload: keyframe every 30 frames
fn synthetic_frame(index: u32) -> Vec<u8> {
    let keyframe = index % 30 == 0;
    let mut payload = vec![if keyframe { 0x17 } else { 0x27 }, 0x01, 0x00, 0x00, 0x00];
    payload.extend((0..if keyframe { 2048 } else { 256 }).map(|i| (i + index) as u8));
    payload
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let url = args.get(1).map(|s| s.as_str()).unwrap_or("rtmp://127.0.0.1/live");
    let seconds: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(5);

    let target = StreamTarget::parse(url)?;
    let config = ClientConfig::builder()
        .chunk_size(4096)
        .build()?;

    let publisher = RtmpPublisher::with_config(config)?;
    publisher.add_listener(Arc::new(LoggingListener));

    info!("Publishing to {} for {} s", target, seconds);
    let sink = publisher.initialize(target)?;

    let frame_interval = Duration::from_millis(33);
    let total = (seconds * 1000 / 33) as u32;
    let mut ticker = tokio::time::interval(frame_interval);

    for index in 0..total {
        ticker.tick().await;
        if publisher.state().is_error() {
            break;
        }
        if let Err(e) = sink.push(Frame::new(synthetic_frame(index), index * 33)) {
            warn!("Dropped frame {}: {}", index, e);
        }
    }

    publisher.stop().await;
    info!("Final state: {}", publisher.state());
    Ok(())
}
