use crate::frame::Frame;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::time::Duration;

/// The peer went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

impl fmt::Display for Disconnected {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("transport disconnected")
    }
}

impl std::error::Error for Disconnected {}

/// Carries batches of frames between a [`Container`](../container/struct.Container.html) and
/// its peer.
///
/// A batch is the unit of arrival: every frame in a batch is applied to endpoint state before
/// any resulting event is dispatched.
pub trait Transport: Send + 'static {
    /// Write a batch of frames to the peer.
    fn send(&mut self, frames: Vec<Frame>) -> Result<(), Disconnected>;

    /// Wait up to `timeout` (forever if `None`) for the next batch from the peer. Returns
    /// `Ok(None)` if the timeout elapsed.
    fn recv(&mut self, timeout: Option<Duration>) -> Result<Option<Vec<Frame>>, Disconnected>;
}

/// One end of an in-memory [`pipe`](fn.pipe.html).
pub struct MemoryTransport {
    tx: Sender<Vec<Frame>>,
    rx: Receiver<Vec<Frame>>,
}

/// Create a connected pair of in-memory transports. Frames sent on one end arrive on the other.
pub fn pipe() -> (MemoryTransport, MemoryTransport) {
    let (a_tx, b_rx) = crossbeam_channel::unbounded();
    let (b_tx, a_rx) = crossbeam_channel::unbounded();
    (
        MemoryTransport { tx: a_tx, rx: a_rx },
        MemoryTransport { tx: b_tx, rx: b_rx },
    )
}

impl Transport for MemoryTransport {
    fn send(&mut self, frames: Vec<Frame>) -> Result<(), Disconnected> {
        self.tx.send(frames).map_err(|_| Disconnected)
    }

    fn recv(&mut self, timeout: Option<Duration>) -> Result<Option<Vec<Frame>>, Disconnected> {
        match timeout {
            None => self.rx.recv().map(Some).map_err(|_| Disconnected),
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(frames) => Ok(Some(frames)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(Disconnected),
            },
        }
    }
}
