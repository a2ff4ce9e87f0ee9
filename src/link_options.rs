use crate::container::Link;
use crate::frame::{ReceiverSettleMode, SenderSettleMode};

/// Configuration applied to a link before it is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOption {
    /// Messages are sent pre-settled; the peer never reports an outcome.
    AtMostOnce,

    /// Messages are sent unsettled and the receiver settles first.
    AtLeastOnce,

    /// Attach a message selector filter to the source of a receiver. Ignored for senders.
    Selector(String),
}

impl LinkOption {
    pub(crate) fn apply(&self, link: &mut Link) {
        match self {
            LinkOption::AtMostOnce => link.snd_settle_mode = SenderSettleMode::Settled,
            LinkOption::AtLeastOnce => {
                link.snd_settle_mode = SenderSettleMode::Unsettled;
                link.rcv_settle_mode = ReceiverSettleMode::First;
            }
            LinkOption::Selector(selector) => {
                if link.is_receiver() {
                    link.source.selector = Some(selector.clone());
                }
            }
        }
    }
}
