use bytes::Bytes;
use std::sync::{Arc, Mutex};

/// Terminal outcome of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Accepted,
    Rejected,
    Released,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Outgoing,
    Incoming,
}

/// Handle to one message transfer, tracked until settlement.
///
/// Clones share state with the container, so a `Delivery` returned from a send or handed to a
/// handler observes disposition updates from the peer as they are processed. Local updates made
/// through [`update`](#method.update) and [`settle`](#method.settle) are written to the peer the
/// next time the connection pumps its container.
#[derive(Clone, Debug)]
pub struct Delivery {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
struct Inner {
    id: u32,
    tag: Bytes,
    link: u32,
    direction: Direction,
    local_state: Option<Disposition>,
    remote_state: Option<Disposition>,
    locally_settled: bool,
    remotely_settled: bool,
    dirty: bool,
}

impl Delivery {
    pub(crate) fn new(
        id: u32,
        tag: Bytes,
        link: u32,
        direction: Direction,
        remotely_settled: bool,
    ) -> Delivery {
        Delivery {
            inner: Arc::new(Mutex::new(Inner {
                id,
                tag,
                link,
                direction,
                local_state: None,
                remote_state: None,
                locally_settled: false,
                remotely_settled,
                dirty: false,
            })),
        }
    }

    pub fn id(&self) -> u32 {
        self.inner.lock().unwrap().id
    }

    pub fn tag(&self) -> Bytes {
        self.inner.lock().unwrap().tag.clone()
    }

    /// Local handle of the link this delivery travels on.
    pub fn link_handle(&self) -> u32 {
        self.inner.lock().unwrap().link
    }

    /// True once the peer has settled this delivery.
    pub fn settled(&self) -> bool {
        self.inner.lock().unwrap().remotely_settled
    }

    pub fn remote_state(&self) -> Option<Disposition> {
        self.inner.lock().unwrap().remote_state
    }

    pub fn local_state(&self) -> Option<Disposition> {
        self.inner.lock().unwrap().local_state
    }

    pub fn is_locally_settled(&self) -> bool {
        self.inner.lock().unwrap().locally_settled
    }

    /// Record a local disposition for this delivery.
    pub fn update(&self, state: Disposition) {
        let mut inner = self.inner.lock().unwrap();
        if inner.locally_settled {
            return;
        }
        inner.local_state = Some(state);
        inner.dirty = true;
    }

    /// Settle this delivery locally.
    pub fn settle(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.locally_settled {
            return;
        }
        inner.locally_settled = true;
        inner.dirty = true;
    }

    pub(crate) fn direction(&self) -> Direction {
        self.inner.lock().unwrap().direction
    }

    pub(crate) fn apply_remote(&self, state: Option<Disposition>, settled: bool) {
        let mut inner = self.inner.lock().unwrap();
        if state.is_some() {
            inner.remote_state = state;
        }
        inner.remotely_settled |= settled;
    }

    /// Returns the local state to write to the peer if it changed since the last call.
    pub(crate) fn take_pending_disposition(&self) -> Option<(Option<Disposition>, bool)> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.dirty {
            return None;
        }
        inner.dirty = false;
        Some((inner.local_state, inner.locally_settled))
    }
}
