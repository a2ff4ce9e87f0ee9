//! Performatives exchanged between the container and its peer.
//!
//! Frames travel through a [`Transport`](../transport/trait.Transport.html) as plain Rust values;
//! turning them into bytes (and the session layer, which is implicit here - one session per
//! connection) belongs to whatever sits on the far side of the transport.

use crate::delivery::Disposition;
use crate::endpoint::Condition;
use crate::message::Message;
use bytes::Bytes;
use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderSettleMode {
    Unsettled,
    Settled,
    Mixed,
}

impl Default for SenderSettleMode {
    fn default() -> SenderSettleMode {
        SenderSettleMode::Mixed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverSettleMode {
    First,
    Second,
}

impl Default for ReceiverSettleMode {
    fn default() -> ReceiverSettleMode {
        ReceiverSettleMode::First
    }
}

/// Source or target of a link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Terminus {
    pub address: Option<String>,
    pub dynamic: bool,
    /// Message selector filter (sources only).
    pub selector: Option<String>,
}

impl Terminus {
    pub fn with_address<T: Into<String>>(address: T) -> Terminus {
        Terminus {
            address: Some(address.into()),
            ..Terminus::default()
        }
    }

    pub fn dynamic() -> Terminus {
        Terminus {
            dynamic: true,
            ..Terminus::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open {
        container_id: String,
        hostname: Option<String>,
        properties: IndexMap<String, String>,
    },
    Close {
        error: Option<Condition>,
    },
    Attach {
        name: String,
        handle: u32,
        role: Role,
        source: Option<Terminus>,
        target: Option<Terminus>,
        snd_settle_mode: SenderSettleMode,
        rcv_settle_mode: ReceiverSettleMode,
    },
    Flow {
        handle: u32,
        delivery_count: u32,
        link_credit: u32,
    },
    Transfer {
        handle: u32,
        delivery_id: u32,
        delivery_tag: Bytes,
        settled: bool,
        message: Message,
    },
    /// `role` is the role of the frame's *sender* with respect to the delivery.
    Disposition {
        role: Role,
        delivery_id: u32,
        settled: bool,
        state: Option<Disposition>,
    },
    Detach {
        handle: u32,
        closed: bool,
        error: Option<Condition>,
    },
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Frame::Open { container_id, .. } => write!(f, "open(container_id={})", container_id),
            Frame::Close { error } => write!(f, "close(error={:?})", error),
            Frame::Attach {
                name, handle, role, ..
            } => write!(f, "attach(name={}, handle={}, role={:?})", name, handle, role),
            Frame::Flow {
                handle,
                delivery_count,
                link_credit,
            } => write!(
                f,
                "flow(handle={}, delivery_count={}, link_credit={})",
                handle, delivery_count, link_credit
            ),
            Frame::Transfer {
                handle,
                delivery_id,
                settled,
                ..
            } => write!(
                f,
                "transfer(handle={}, delivery_id={}, settled={})",
                handle, delivery_id, settled
            ),
            Frame::Disposition {
                role,
                delivery_id,
                settled,
                state,
            } => write!(
                f,
                "disposition(role={:?}, delivery_id={}, settled={}, state={:?})",
                role, delivery_id, settled, state
            ),
            Frame::Detach {
                handle,
                closed,
                error,
            } => write!(
                f,
                "detach(handle={}, closed={}, error={:?})",
                handle, closed, error
            ),
        }
    }
}
