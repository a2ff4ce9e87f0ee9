use crate::delivery::Delivery;
use crate::message::Message;

/// Something the peer did, queued by frame processing and dispatched to handlers afterwards.
/// Link events carry the local link handle.
pub(crate) enum Event {
    ConnectionRemoteOpen,
    ConnectionRemoteClose,
    LinkRemoteOpen(u32),
    LinkRemoteClose(u32),
    LinkFlow(u32),
    Message(u32, Message, Delivery),
    Settled(u32, Delivery),
    Disconnected,
}
