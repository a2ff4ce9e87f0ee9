use super::Handler;
use crate::delivery::Delivery;
use crate::endpoint::{Condition, EndpointState, State};
use crate::frame::{ReceiverSettleMode, Role, SenderSettleMode, Terminus};
use crate::message::Message;
use std::collections::VecDeque;

/// Container-side view of one sender or receiver link.
pub struct Link {
    name: String,
    handle: u32,
    role: Role,
    state: EndpointState,
    pub(crate) source: Terminus,
    pub(crate) target: Terminus,
    pub(crate) snd_settle_mode: SenderSettleMode,
    pub(crate) rcv_settle_mode: ReceiverSettleMode,
    remote_handle: Option<u32>,
    remote_source: Option<Terminus>,
    remote_target: Option<Terminus>,
    remote_condition: Option<Condition>,

    // For senders, credit granted by the peer; for receivers, credit we have granted and the
    // peer has not yet used.
    credit: u32,
    delivery_count: u32,
    flow_pending: bool,

    // Sender only: messages waiting for credit.
    outgoing: VecDeque<(Message, Delivery)>,

    pub(super) attach_sent: bool,
    pub(super) detach_sent: bool,
    pub(super) released: bool,
    pub(super) handler: Option<Box<dyn Handler>>,
}

impl Link {
    pub(crate) fn new(
        name: String,
        handle: u32,
        role: Role,
        source: Terminus,
        target: Terminus,
    ) -> Link {
        Link {
            name,
            handle,
            role,
            state: EndpointState::default(),
            source,
            target,
            snd_settle_mode: SenderSettleMode::default(),
            rcv_settle_mode: ReceiverSettleMode::default(),
            remote_handle: None,
            remote_source: None,
            remote_target: None,
            remote_condition: None,
            credit: 0,
            delivery_count: 0,
            flow_pending: false,
            outgoing: VecDeque::new(),
            attach_sent: false,
            detach_sent: false,
            released: false,
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_sender(&self) -> bool {
        self.role == Role::Sender
    }

    pub fn is_receiver(&self) -> bool {
        self.role == Role::Receiver
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    pub fn source(&self) -> &Terminus {
        &self.source
    }

    pub fn target(&self) -> &Terminus {
        &self.target
    }

    pub fn remote_source(&self) -> Option<&Terminus> {
        self.remote_source.as_ref()
    }

    pub fn remote_target(&self) -> Option<&Terminus> {
        self.remote_target.as_ref()
    }

    pub fn remote_condition(&self) -> Option<&Condition> {
        self.remote_condition.as_ref()
    }

    /// The address this link is attached to from our side: the target for senders, the source
    /// for receivers.
    pub fn address(&self) -> Option<&str> {
        match self.role {
            Role::Sender => self.target.address.as_deref(),
            Role::Receiver => self.source.address.as_deref(),
        }
    }

    pub fn credit(&self) -> u32 {
        self.credit
    }

    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    /// Number of messages waiting for credit (senders only).
    pub fn queued(&self) -> usize {
        self.outgoing.len()
    }

    /// Grant the peer `credit` more messages (receivers only).
    pub fn flow(&mut self, credit: u32) {
        if !self.is_receiver() || credit == 0 {
            return;
        }
        self.credit = self.credit.saturating_add(credit);
        self.flow_pending = true;
    }

    /// Request a local close. The detach frame goes out the next time the container pumps.
    pub fn close(&mut self) {
        self.state.set_local(State::Closed);
    }

    pub(crate) fn open(&mut self) {
        self.state.set_local(State::Active);
    }

    pub(crate) fn remote_handle(&self) -> Option<u32> {
        self.remote_handle
    }

    pub(crate) fn remote_attached(
        &mut self,
        remote_handle: u32,
        source: Option<Terminus>,
        target: Option<Terminus>,
    ) -> bool {
        self.remote_handle = Some(remote_handle);
        self.remote_source = source;
        self.remote_target = target;
        self.state.set_remote(State::Active)
    }

    pub(crate) fn remote_detached(&mut self, condition: Option<Condition>) -> bool {
        if condition.is_some() {
            self.remote_condition = condition;
        }
        self.state.set_remote(State::Closed)
    }

    // Sender: the peer's view of delivery count plus its link credit bounds what we may send.
    pub(crate) fn remote_flow(&mut self, delivery_count: u32, link_credit: u32) {
        if self.is_sender() {
            let limit = u64::from(delivery_count) + u64::from(link_credit);
            let credit = limit.saturating_sub(u64::from(self.delivery_count));
            self.credit = credit.min(u64::from(u32::max_value())) as u32;
        }
    }

    pub(crate) fn enqueue(&mut self, message: Message, delivery: Delivery) {
        self.outgoing.push_back((message, delivery));
    }

    /// Next message the sender may transfer, consuming one unit of credit.
    pub(crate) fn next_transfer(&mut self) -> Option<(Message, Delivery)> {
        if self.credit == 0 {
            return None;
        }
        let next = self.outgoing.pop_front()?;
        self.credit -= 1;
        self.delivery_count = self.delivery_count.saturating_add(1);
        Some(next)
    }

    pub(crate) fn transfer_received(&mut self) {
        self.credit = self.credit.saturating_sub(1);
        self.delivery_count = self.delivery_count.saturating_add(1);
    }

    pub(crate) fn take_flow(&mut self) -> Option<(u32, u32)> {
        if !self.flow_pending {
            return None;
        }
        self.flow_pending = false;
        Some((self.delivery_count, self.credit))
    }

    pub(crate) fn is_presettled(&self) -> bool {
        self.snd_settle_mode == SenderSettleMode::Settled
    }
}
