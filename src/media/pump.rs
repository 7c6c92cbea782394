use crate::media::Frame;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Default number of frames buffered between encoder and writer
pub const DEFAULT_PUMP_CAPACITY: usize = 80;

/// Bounded, ordered hand-off between the encoder and the network writer.
///
/// A full pump rejects new frames instead of blocking the producer. The
/// consumer side suspends in [`FramePump::dequeue`] until a frame arrives
/// or the pump is shut down.
pub struct FramePump {
    /// Producer side, cloned into every sink
    sender: mpsc::Sender<Frame>,

    /// Consumer side
    receiver: mpsc::Receiver<Frame>,

    /// Shutdown flag
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl FramePump {
    /// Create new pump. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        FramePump {
            sender,
            receiver,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Producer handle for the encoder
    pub fn sink(&self) -> FrameSink {
        FrameSink {
            sender: self.sender.clone(),
            shutdown: self.shutdown_rx.clone(),
        }
    }

    /// Enqueue a frame without waiting
    pub fn enqueue(&self, frame: Frame) -> Result<()> {
        try_enqueue(&self.sender, &self.shutdown_rx, frame)
    }

    /// Next frame in enqueue order, or `None` once the pump is shut down.
    /// Frames still buffered at shutdown are discarded.
    pub async fn dequeue(&mut self) -> Option<Frame> {
        if *self.shutdown_rx.borrow() {
            return None;
        }

        let shutdown = &mut self.shutdown_rx;
        tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => None,
            frame = self.receiver.recv() => frame,
        }
    }

    /// Stop the pump; wakes a pending `dequeue` and fails later enqueues
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Frames currently buffered
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

/// Cloneable producer handle of a [`FramePump`]. Plain synchronous calls,
/// usable from encoder threads outside the runtime.
#[derive(Clone)]
pub struct FrameSink {
    sender: mpsc::Sender<Frame>,
    shutdown: watch::Receiver<bool>,
}

impl FrameSink {
    /// Hand a frame to the writer. Fails with a queue error when the pump
    /// is full or gone; the frame is then dropped.
    pub fn push(&self, frame: Frame) -> Result<()> {
        try_enqueue(&self.sender, &self.shutdown, frame)
    }

    /// Whether frames can still be pushed
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow() || self.sender.is_closed()
    }

    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn try_enqueue(sender: &mpsc::Sender<Frame>, shutdown: &watch::Receiver<bool>, frame: Frame) -> Result<()> {
    if *shutdown.borrow() {
        return Err(Error::queue("Frame pump is shut down"));
    }

    sender.try_send(frame).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => Error::queue(format!(
            "Frame pump full ({} frames), frame dropped",
            sender.max_capacity()
        )),
        mpsc::error::TrySendError::Closed(_) => Error::queue("Frame pump closed"),
    })
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn frame(n: u8) -> Frame {
        Frame::new(vec![n; 4], n as u32 * 33)
    }

    #[tokio::test]
    async fn test_frames_in_enqueue_order() {
        let mut pump = FramePump::new(8);
        let sink = pump.sink();

        for n in 0..5 {
            sink.push(frame(n)).unwrap();
        }
        assert_eq!(pump.len(), 5);

        for n in 0..5 {
            assert_eq!(pump.dequeue().await, Some(frame(n)));
        }
        assert!(pump.is_empty());
    }

    #[tokio::test]
    async fn test_full_pump_rejects() {
        let pump = FramePump::new(2);

        pump.enqueue(frame(1)).unwrap();
        pump.enqueue(frame(2)).unwrap();
        let err = pump.enqueue(frame(3)).unwrap_err();

        assert!(matches!(err, Error::Queue(_)));
        assert_eq!(pump.len(), 2);
        assert_eq!(pump.capacity(), 2);
    }

    #[tokio::test]
    async fn test_dequeue_suspends_when_empty() {
        let mut pump = FramePump::new(4);
        assert!(timeout(Duration::from_millis(50), pump.dequeue()).await.is_err());
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_push() {
        let mut pump = FramePump::new(4);
        let sink = pump.sink();

        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sink.push(frame(9)).unwrap();
        });

        assert_eq!(pump.dequeue().await, Some(frame(9)));
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_wakes_consumer() {
        let mut pump = FramePump::new(4);
        let sink = pump.sink();
        sink.push(frame(1)).unwrap();

        assert!(!pump.is_shutdown());
        pump.shutdown();
        assert!(pump.is_shutdown());

        assert_eq!(pump.dequeue().await, None);
        assert!(sink.is_closed());
        assert!(matches!(sink.push(frame(2)), Err(Error::Queue(_))));
    }

    #[tokio::test]
    async fn test_sink_fails_after_pump_dropped() {
        let pump = FramePump::new(4);
        let sink = pump.sink();
        drop(pump);

        assert!(sink.push(frame(1)).is_err());
    }

    #[test]
    fn test_push_outside_runtime() {
        let pump = FramePump::new(DEFAULT_PUMP_CAPACITY);
        let sink = pump.sink();

        std::thread::spawn(move || sink.push(frame(1)))
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(pump.len(), 1);
    }
}
